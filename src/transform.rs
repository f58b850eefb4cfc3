//! Image to display-plane coordinate transforms.
//!
//! A display plane sees the volume through a signed axis permutation: display
//! axis 0 runs along the slice columns, display axis 1 along the rows and
//! display axis 2 is the depth the plane slices along. Applying a transform is
//! an index remap and never touches voxel data.

use crate::enums::DisplayAxis;
use crate::error::{Result, WrapperError};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageCoordinateTransform {
    /// `axes[d]` is the image axis feeding display axis `d`.
    axes: [usize; 3],
    /// Whether display axis `d` traverses its image axis backwards.
    flips: [bool; 3],
}

impl Default for ImageCoordinateTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl ImageCoordinateTransform {
    /// Build a transform, rejecting anything that is not a permutation.
    pub fn new(axes: [usize; 3], flips: [bool; 3]) -> Result<Self> {
        let mut seen = [false; 3];
        for &axis in &axes {
            if axis > 2 || seen[axis] {
                return Err(WrapperError::InconsistentTransform(format!(
                    "axes {axes:?} are not a permutation of the image axes"
                )));
            }
            seen[axis] = true;
        }
        Ok(Self { axes, flips })
    }

    pub fn identity() -> Self {
        Self {
            axes: [0, 1, 2],
            flips: [false; 3],
        }
    }

    /// Default transform of a display plane: axial slices along z, coronal
    /// along y and sagittal along x, all traversed in the positive direction.
    pub fn default_for(axis: DisplayAxis) -> Self {
        let axes = match axis {
            DisplayAxis::Axial => [0, 1, 2],
            DisplayAxis::Coronal => [0, 2, 1],
            DisplayAxis::Sagittal => [1, 2, 0],
        };
        Self {
            axes,
            flips: [false; 3],
        }
    }

    pub fn axes(&self) -> [usize; 3] {
        self.axes
    }

    pub fn flips(&self) -> [bool; 3] {
        self.flips
    }

    /// Image axis orthogonal to the display plane.
    pub fn slice_axis(&self) -> usize {
        self.axes[2]
    }

    /// Extent of the volume as seen in display space.
    pub fn display_size(&self, image_size: [usize; 3]) -> [usize; 3] {
        [
            image_size[self.axes[0]],
            image_size[self.axes[1]],
            image_size[self.axes[2]],
        ]
    }

    /// Map an image index to display space.
    pub fn to_display(&self, image: [usize; 3], image_size: [usize; 3]) -> [usize; 3] {
        let mut out = [0; 3];
        for d in 0..3 {
            let a = self.axes[d];
            out[d] = if self.flips[d] {
                image_size[a] - 1 - image[a]
            } else {
                image[a]
            };
        }
        out
    }

    /// Map a display index back to image space.
    pub fn to_image(&self, display: [usize; 3], image_size: [usize; 3]) -> [usize; 3] {
        let mut out = [0; 3];
        for d in 0..3 {
            let a = self.axes[d];
            out[a] = if self.flips[d] {
                image_size[a] - 1 - display[d]
            } else {
                display[d]
            };
        }
        out
    }
}

/// Check that three plane transforms slice along distinct image axes.
pub fn check_consistent(transforms: &[ImageCoordinateTransform; 3]) -> Result<()> {
    let mut seen = [false; 3];
    for t in transforms {
        let axis = t.slice_axis();
        if seen[axis] {
            return Err(WrapperError::InconsistentTransform(format!(
                "image axis {axis} is sliced by more than one display plane"
            )));
        }
        seen[axis] = true;
    }
    Ok(())
}

pub fn default_transforms() -> [ImageCoordinateTransform; 3] {
    DisplayAxis::ALL.map(ImageCoordinateTransform::default_for)
}
