//! Whole-volume statistics over a wrapper's scalar view.
//!
//! These are the only operations that visit every voxel. They are split along
//! z planes with rayon and their results are cached by the wrapper.

use rayon::prelude::*;

use crate::storage::VoxelStorage;

/// Frequency table over the scalar view, with `bin_count` equal-width bins
/// spanning `[min, max]`. The last bin is closed on the right.
#[derive(Clone, Debug, PartialEq)]
pub struct ScalarImageHistogram {
    min: f64,
    max: f64,
    counts: Vec<u64>,
}

impl ScalarImageHistogram {
    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn bin_count(&self) -> usize {
        self.counts.len()
    }

    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    pub fn bin_width(&self) -> f64 {
        (self.max - self.min) / self.counts.len() as f64
    }

    /// Number of samples binned.
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    pub fn max_frequency(&self) -> u64 {
        self.counts.iter().copied().max().unwrap_or(0)
    }

    pub fn bin_range(&self, bin: usize) -> (f64, f64) {
        let w = self.bin_width();
        (self.min + w * bin as f64, self.min + w * (bin + 1) as f64)
    }

    pub fn bin_of(&self, value: f64) -> usize {
        bin_index(value, self.min, self.max, self.counts.len())
    }
}

#[inline]
fn bin_index(value: f64, min: f64, max: f64, bins: usize) -> usize {
    if max <= min {
        return 0;
    }
    let t = (value - min) / (max - min);
    ((t * bins as f64).floor().max(0.0) as usize).min(bins - 1)
}

fn plane_indices(size: [usize; 3], z: usize) -> impl Iterator<Item = [usize; 3]> {
    (0..size[1]).flat_map(move |y| (0..size[0]).map(move |x| [x, y, z]))
}

/// Minimum and maximum of the current scalar representation.
pub(crate) fn scalar_extrema<S: VoxelStorage>(storage: &S) -> (f64, f64) {
    let size = storage.size();
    (0..size[2])
        .into_par_iter()
        .map(|z| {
            plane_indices(size, z)
                .map(|i| storage.scalar(i))
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                    (lo.min(v), hi.max(v))
                })
        })
        .reduce(
            || (f64::INFINITY, f64::NEG_INFINITY),
            |a, b| (a.0.min(b.0), a.1.max(b.1)),
        )
}

/// Histogram of the scalar representation over `range`. A bin count of zero
/// is treated as one bin.
pub(crate) fn histogram<S: VoxelStorage>(
    storage: &S,
    bins: usize,
    (min, max): (f64, f64),
) -> ScalarImageHistogram {
    let bins = bins.max(1);
    let size = storage.size();
    let counts = (0..size[2])
        .into_par_iter()
        .map(|z| {
            let mut counts = vec![0u64; bins];
            for i in plane_indices(size, z) {
                counts[bin_index(storage.scalar(i), min, max, bins)] += 1;
            }
            counts
        })
        .reduce(
            || vec![0u64; bins],
            |mut a, b| {
                a.iter_mut().zip(b).for_each(|(a, b)| *a += b);
                a
            },
        );
    ScalarImageHistogram { min, max, counts }
}

/// Largest gradient magnitude of the scalar view, using central differences
/// (one-sided at the borders) scaled by the voxel spacing.
pub(crate) fn gradient_magnitude_upper_limit<S: VoxelStorage>(storage: &S, spacing: [f64; 3]) -> f64 {
    let size = storage.size();
    let derivative = |index: [usize; 3], axis: usize| -> f64 {
        let n = size[axis];
        if n < 2 {
            return 0.0;
        }
        let i = index[axis];
        let (lo, hi) = (i.saturating_sub(1), (i + 1).min(n - 1));
        let (mut a, mut b) = (index, index);
        a[axis] = lo;
        b[axis] = hi;
        (storage.scalar(b) - storage.scalar(a)) / ((hi - lo) as f64 * spacing[axis])
    };
    (0..size[2])
        .into_par_iter()
        .map(|z| {
            plane_indices(size, z)
                .map(|i| (0..3).map(|a| derivative(i, a).powi(2)).sum::<f64>().sqrt())
                .fold(0.0, f64::max)
        })
        .reduce(|| 0.0, f64::max)
}
