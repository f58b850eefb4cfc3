//! Per-wrapper cache slots.
//!
//! Every slot holds an `Arc` that is swapped out whole; a computed value is
//! never mutated in place, so a reader holding an old `Arc` keeps a complete,
//! if stale, result.

use std::collections::HashMap;
use std::sync::Arc;

use image::RgbaImage;

use crate::common_format::CommonFormatImage;
use crate::enums::{ExportChannel, ScalarRepresentation};
use crate::statistics::ScalarImageHistogram;

/// RGBA cross-section handed to the renderer.
pub type DisplaySlice = Arc<RgbaImage>;

#[derive(Default)]
pub(crate) struct WrapperCaches {
    pub(crate) slices: [Option<DisplaySlice>; 3],
    pub(crate) common_format: [Option<Arc<CommonFormatImage>>; 4],
    pub(crate) histograms: HashMap<(ScalarRepresentation, usize), Arc<ScalarImageHistogram>>,
    /// Extrema over all stored components.
    pub(crate) raw_extrema: Option<(f64, f64)>,
    /// Extrema of the current scalar representation.
    pub(crate) scalar_extrema: Option<(f64, f64)>,
    pub(crate) gradient_limit: Option<f64>,
}

impl WrapperCaches {
    pub(crate) fn invalidate_slices(&mut self) {
        self.slices = Default::default();
    }

    pub(crate) fn invalidate_slice(&mut self, plane: usize) {
        self.slices[plane] = None;
    }

    pub(crate) fn invalidate_preview(&mut self, image_axis: usize) {
        let channel = match image_axis {
            0 => ExportChannel::PreviewX,
            1 => ExportChannel::PreviewY,
            _ => ExportChannel::PreviewZ,
        };
        self.common_format[channel.index()] = None;
    }

    /// Everything derived from the scalar view: slices, common format,
    /// histograms, scalar extrema and the gradient bound.
    pub(crate) fn invalidate_representation(&mut self) {
        self.invalidate_slices();
        self.common_format = Default::default();
        self.histograms.clear();
        self.scalar_extrema = None;
        self.gradient_limit = None;
    }

    /// Drop everything, e.g. after the buffer was replaced.
    pub(crate) fn clear(&mut self) {
        *self = Self::default();
    }
}
