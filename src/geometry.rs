//! Physical frame of a volume: direction cosines, spacing and origin.
//!
//! Physical space follows the loader's (LPS) convention. NIFTI coordinates
//! are RAS, i.e. the first two physical axes with their sign flipped.

use nalgebra::{Matrix3, Matrix4, Vector3};

use crate::enums::DisplayAxis;
use crate::error::{Result, WrapperError};
use crate::transform::ImageCoordinateTransform;

/// Axis-aligned block of voxels, `index` and `size` both `[x, y, z]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageRegion {
    pub index: [usize; 3],
    pub size: [usize; 3],
}

impl ImageRegion {
    pub fn new(index: [usize; 3], size: [usize; 3]) -> Self {
        Self { index, size }
    }

    pub fn number_of_voxels(&self) -> usize {
        self.size.iter().product()
    }

    pub fn contains(&self, index: [i64; 3]) -> bool {
        (0..3).all(|a| {
            let lo = self.index[a] as i64;
            index[a] >= lo && index[a] < lo + self.size[a] as i64
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ImageGeometry {
    direction: Matrix3<f64>,
    spacing: Vector3<f64>,
    origin: Vector3<f64>,
    index_to_physical: Matrix3<f64>,
    physical_to_index: Matrix3<f64>,
}

impl Default for ImageGeometry {
    fn default() -> Self {
        Self {
            direction: Matrix3::identity(),
            spacing: Vector3::repeat(1.0),
            origin: Vector3::zeros(),
            index_to_physical: Matrix3::identity(),
            physical_to_index: Matrix3::identity(),
        }
    }
}

impl ImageGeometry {
    /// Column `i` of `direction` is the physical direction of image axis `i`.
    pub fn new(direction: Matrix3<f64>, spacing: Vector3<f64>, origin: Vector3<f64>) -> Result<Self> {
        if spacing.iter().any(|s| !s.is_finite() || *s <= 0.0) {
            return Err(WrapperError::InvalidGeometry(format!(
                "spacing {:?} must be positive",
                spacing.as_slice()
            )));
        }
        let index_to_physical = direction * Matrix3::from_diagonal(&spacing);
        let physical_to_index = index_to_physical.try_inverse().ok_or_else(|| {
            WrapperError::InvalidGeometry("direction matrix is singular".to_string())
        })?;
        Ok(Self {
            direction,
            spacing,
            origin,
            index_to_physical,
            physical_to_index,
        })
    }

    /// Convenience constructor from plain arrays. `direction` is row-major.
    pub fn from_arrays(direction: [[f64; 3]; 3], spacing: [f64; 3], origin: [f64; 3]) -> Result<Self> {
        let direction = Matrix3::from_fn(|r, c| direction[r][c]);
        Self::new(direction, Vector3::from(spacing), Vector3::from(origin))
    }

    /// Identity direction with the given spacing and origin.
    pub fn with_spacing(spacing: [f64; 3], origin: [f64; 3]) -> Result<Self> {
        Self::new(Matrix3::identity(), Vector3::from(spacing), Vector3::from(origin))
    }

    pub fn direction(&self) -> &Matrix3<f64> {
        &self.direction
    }

    pub fn spacing(&self) -> [f64; 3] {
        self.spacing.into()
    }

    pub fn origin(&self) -> [f64; 3] {
        self.origin.into()
    }

    pub fn voxel_index_to_position(&self, index: [f64; 3]) -> [f64; 3] {
        (self.origin + self.index_to_physical * Vector3::from(index)).into()
    }

    pub fn position_to_voxel_index(&self, position: [f64; 3]) -> [f64; 3] {
        (self.physical_to_index * (Vector3::from(position) - self.origin)).into()
    }

    /// Voxel to RAS matrix in the NIFTI s-form layout.
    pub fn nifti_sform(&self) -> Matrix4<f64> {
        let mut sform = Matrix4::identity();
        for r in 0..3 {
            let sign = if r < 2 { -1.0 } else { 1.0 };
            for c in 0..3 {
                sform[(r, c)] = sign * self.index_to_physical[(r, c)];
            }
            sform[(r, 3)] = sign * self.origin[r];
        }
        sform
    }

    pub fn voxel_index_to_nifti(&self, index: [f64; 3]) -> [f64; 3] {
        let [x, y, z] = self.voxel_index_to_position(index);
        [-x, -y, z]
    }

    pub fn nifti_to_voxel_index(&self, nifti: [f64; 3]) -> [f64; 3] {
        self.position_to_voxel_index([-nifti[0], -nifti[1], nifti[2]])
    }

    /// Display transforms that present the volume in anatomical order no
    /// matter how the image axes are stored.
    ///
    /// Each image axis is assigned the physical axis its direction cosine is
    /// most aligned with (greedily, so oblique volumes still yield a
    /// permutation). An identity direction reproduces the default transforms.
    pub fn display_transforms(&self) -> Result<[ImageCoordinateTransform; 3]> {
        let mut image_of_physical = [usize::MAX; 3];
        let mut flip_of_physical = [false; 3];
        for image_axis in 0..3 {
            let column = self.direction.column(image_axis);
            let physical = (0..3)
                .filter(|&p| image_of_physical[p] == usize::MAX)
                .max_by(|&a, &b| column[a].abs().total_cmp(&column[b].abs()))
                .ok_or_else(|| {
                    WrapperError::InvalidGeometry("direction matrix is degenerate".to_string())
                })?;
            image_of_physical[physical] = image_axis;
            flip_of_physical[physical] = column[physical] < 0.0;
        }

        let mut transforms = [ImageCoordinateTransform::identity(); 3];
        for axis in DisplayAxis::ALL {
            let anatomical = ImageCoordinateTransform::default_for(axis).axes();
            transforms[axis.index()] = ImageCoordinateTransform::new(
                anatomical.map(|p| image_of_physical[p]),
                anatomical.map(|p| flip_of_physical[p]),
            )?;
        }
        Ok(transforms)
    }
}
