//! Hysteresis edge linking.
//!
//! Interior pixels whose suppressed magnitude reaches the high threshold
//! seed an edge. Each seed grows through 8-connected neighbors whose
//! magnitude reaches the low threshold. The grown set does not depend on
//! the order seeds are visited in, so seeds are processed in parallel:
//! every pixel carries an [`AtomicBool`] and whichever flood fill claims
//! it first continues from it.

use std::sync::atomic::{AtomicBool, Ordering};

use image::Luma;
use log::debug;

use crate::parallel::{ExecutionStrategy, for_each_item};
use crate::types::{
    FloatImage, GrayImage, MAX_BRIGHTNESS, MIN_SIDE, PipelineError, check_dimensions,
    neighbor_index,
};

/// Offsets of the 8 neighbors of a pixel.
const NEIGHBORS: [(isize, isize); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Link strong and connected weak pixels of `suppressed` into a binary
/// edge mask.
///
/// A pixel is on ([`MAX_BRIGHTNESS`]) iff it is an interior pixel with
/// magnitude `>= high`, or it has magnitude `>= low` and is 8-connected to
/// such a pixel through other pixels with magnitude `>= low`. Border
/// pixels can be reached but never seed.
///
/// This is step 4 in the pipeline, after non-maximum suppression.
///
/// # Errors
///
/// Returns [`PipelineError::Configuration`] unless `low < high`, and
/// [`PipelineError::Dimension`] if either side is shorter than 3.
pub fn link_edges(
    suppressed: &FloatImage,
    high: u16,
    low: u16,
    strategy: ExecutionStrategy,
) -> Result<GrayImage, PipelineError> {
    if low >= high {
        return Err(PipelineError::Configuration(format!(
            "low threshold ({low}) must be less than high threshold ({high})"
        )));
    }
    let (width, height) = suppressed.dimensions();
    check_dimensions(width, height, MIN_SIDE)?;

    let (w, h) = (width as usize, height as usize);
    let magnitude: &[f32] = suppressed;
    let (high, low) = (f32::from(high), f32::from(low));

    let seeds: Vec<usize> = (1..h - 1)
        .flat_map(|y| (1..w - 1).map(move |x| y * w + x))
        .filter(|&i| magnitude[i] >= high)
        .collect();

    let claimed: Vec<AtomicBool> = (0..w * h).map(|_| AtomicBool::new(false)).collect();
    let claim = |i: usize| {
        claimed[i]
            .compare_exchange(false, true, Ordering::Relaxed, Ordering::Relaxed)
            .is_ok()
    };

    for_each_item(strategy, &seeds, |&seed| {
        // Already part of an edge grown from an earlier seed.
        if !claim(seed) {
            return;
        }
        let mut stack = vec![seed];
        while let Some(i) = stack.pop() {
            let (x, y) = (i % w, i / w);
            for (dx, dy) in NEIGHBORS {
                let Some(n) = neighbor_index(x, y, dx, dy, w, h) else {
                    continue;
                };
                if magnitude[n] >= low && claim(n) {
                    stack.push(n);
                }
            }
        }
    })?;

    let edges = GrayImage::from_fn(width, height, |x, y| {
        let i = y as usize * w + x as usize;
        if claimed[i].load(Ordering::Relaxed) {
            Luma([MAX_BRIGHTNESS])
        } else {
            Luma([0])
        }
    });

    debug!(
        "hysteresis: {} seeds, {} edge pixels",
        seeds.len(),
        edges.pixels().filter(|p| p.0[0] == MAX_BRIGHTNESS).count()
    );
    Ok(edges)
}
