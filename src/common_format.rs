//! Re-typed copies of a wrapper's scalar view for downstream pipelines that
//! must not care which numeric type the wrapper stores.

use ndarray::{Array3, Axis};
use rayon::prelude::*;

use crate::enums::{ExportChannel, ScalarRepresentation};
use crate::geometry::ImageRegion;
use crate::storage::VoxelStorage;

/// The single scalar type every wrapper exports to.
pub type CommonFormatPixel = f32;

#[derive(Clone, Debug, PartialEq)]
pub struct CommonFormatImage {
    channel: ExportChannel,
    representation: ScalarRepresentation,
    region: ImageRegion,
    data: Array3<CommonFormatPixel>,
}

impl CommonFormatImage {
    pub fn channel(&self) -> ExportChannel {
        self.channel
    }

    /// Scalar representation the values were derived with.
    pub fn representation(&self) -> ScalarRepresentation {
        self.representation
    }

    /// Part of the wrapper's buffered region this image covers.
    pub fn region(&self) -> ImageRegion {
        self.region
    }

    /// Values laid out `(depth, height, width)` relative to the region.
    pub fn data(&self) -> &Array3<CommonFormatPixel> {
        &self.data
    }

    /// Value at an `[x, y, z]` index of the full image, `None` outside the
    /// region.
    pub fn value(&self, index: [usize; 3]) -> Option<CommonFormatPixel> {
        let r = &self.region;
        let local: Option<Vec<usize>> = (0..3)
            .map(|a| {
                index[a]
                    .checked_sub(r.index[a])
                    .filter(|&i| i < r.size[a])
            })
            .collect();
        let local = local?;
        Some(self.data[[local[2], local[1], local[0]]])
    }
}

/// Convert the storage's current scalar view for `channel`. Preview channels
/// cover the plane through `slice_index` orthogonal to their image axis.
pub(crate) fn convert<S: VoxelStorage>(
    storage: &S,
    channel: ExportChannel,
    slice_index: [usize; 3],
) -> CommonFormatImage {
    let size = storage.size();
    let region = match channel.preview_axis() {
        None => ImageRegion::new([0; 3], size),
        Some(axis) => {
            let mut index = [0; 3];
            let mut extent = size;
            index[axis] = slice_index[axis];
            extent[axis] = 1;
            ImageRegion::new(index, extent)
        }
    };

    let [nx, ny, nz] = region.size;
    let mut data = Array3::<CommonFormatPixel>::zeros((nz, ny, nx));
    data.axis_iter_mut(Axis(0))
        .into_par_iter()
        .enumerate()
        .for_each(|(z, mut plane)| {
            for ((y, x), out) in plane.indexed_iter_mut() {
                let index = [
                    region.index[0] + x,
                    region.index[1] + y,
                    region.index[2] + z,
                ];
                *out = storage.scalar(index) as CommonFormatPixel;
            }
        });

    CommonFormatImage {
        channel,
        representation: storage.representation(),
        region,
        data,
    }
}
