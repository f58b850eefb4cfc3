//! Typed voxel buffers behind the type-erased wrapper.
//!
//! Buffers are stored `(depth, height, width[, component])`, i.e. `[z, y, x]`,
//! while every index crossing this module's API is `[x, y, z]`.

use ndarray::{Array3, Array4, s};
use rayon::prelude::*;

use crate::enums::ScalarRepresentation;
use crate::error::{Result, WrapperError};
use crate::pixel::{PixelKind, VoxelComponent};

/// Read access to a voxel buffer through its current scalar view.
///
/// Index arguments are not bounds-checked here; the wrapper validates them
/// against [`VoxelStorage::size`] first.
pub trait VoxelStorage: Send + Sync {
    /// Whether the buffer holds exactly one component per voxel by type.
    const IS_SCALAR: bool;

    fn pixel_kind(&self) -> PixelKind;

    /// Extent as `[x, y, z]`.
    fn size(&self) -> [usize; 3];

    fn components(&self) -> usize;

    /// Voxel value under the current scalar representation.
    fn scalar(&self, index: [usize; 3]) -> f64;

    fn component(&self, index: [usize; 3], component: usize) -> f64;

    fn representation(&self) -> ScalarRepresentation;

    fn set_representation(&mut self, representation: ScalarRepresentation) -> Result<()>;

    /// Minimum and maximum over every stored component.
    fn raw_extrema(&self) -> (f64, f64);
}

fn check_extent(shape: &[usize]) -> Result<()> {
    if shape.iter().any(|&n| n == 0) {
        return Err(WrapperError::InvalidBuffer(format!(
            "buffer of shape {shape:?} is empty"
        )));
    }
    Ok(())
}

fn fold_extrema<'a, T: VoxelComponent>(values: impl ParallelIterator<Item = &'a T>) -> (f64, f64) {
    values
        .map(|v| v.to_f64())
        .fold(
            || (f64::INFINITY, f64::NEG_INFINITY),
            |(lo, hi), v| (lo.min(v), hi.max(v)),
        )
        .reduce(
            || (f64::INFINITY, f64::NEG_INFINITY),
            |a, b| (a.0.min(b.0), a.1.max(b.1)),
        )
}

/// Single-component buffer.
pub struct ScalarStorage<T> {
    data: Array3<T>,
}

impl<T: VoxelComponent> ScalarStorage<T> {
    /// `data` is laid out `(depth, height, width)`.
    pub fn new(data: Array3<T>) -> Result<Self> {
        check_extent(data.shape())?;
        Ok(Self { data })
    }

    pub fn data(&self) -> &Array3<T> {
        &self.data
    }
}

impl<T: VoxelComponent> VoxelStorage for ScalarStorage<T> {
    const IS_SCALAR: bool = true;

    fn pixel_kind(&self) -> PixelKind {
        T::KIND
    }

    fn size(&self) -> [usize; 3] {
        let (z, y, x) = self.data.dim();
        [x, y, z]
    }

    fn components(&self) -> usize {
        1
    }

    #[inline]
    fn scalar(&self, [x, y, z]: [usize; 3]) -> f64 {
        self.data[[z, y, x]].to_f64()
    }

    #[inline]
    fn component(&self, index: [usize; 3], _component: usize) -> f64 {
        self.scalar(index)
    }

    fn representation(&self) -> ScalarRepresentation {
        ScalarRepresentation::Component(0)
    }

    fn set_representation(&mut self, representation: ScalarRepresentation) -> Result<()> {
        match representation {
            ScalarRepresentation::Component(k) if k > 0 => {
                Err(WrapperError::InvalidComponent { component: k, count: 1 })
            }
            _ => Ok(()),
        }
    }

    fn raw_extrema(&self) -> (f64, f64) {
        fold_extrema(self.data.view().into_par_iter())
    }
}

/// Multi-component buffer with a selectable scalar view.
pub struct VectorStorage<T> {
    data: Array4<T>,
    representation: ScalarRepresentation,
}

impl<T: VoxelComponent> VectorStorage<T> {
    /// `data` is laid out `(depth, height, width, component)`.
    pub fn new(data: Array4<T>) -> Result<Self> {
        check_extent(data.shape())?;
        Ok(Self {
            data,
            representation: ScalarRepresentation::default(),
        })
    }

    pub fn data(&self) -> &Array4<T> {
        &self.data
    }
}

impl<T: VoxelComponent> VoxelStorage for VectorStorage<T> {
    const IS_SCALAR: bool = false;

    fn pixel_kind(&self) -> PixelKind {
        T::KIND
    }

    fn size(&self) -> [usize; 3] {
        let (z, y, x, _) = self.data.dim();
        [x, y, z]
    }

    fn components(&self) -> usize {
        self.data.dim().3
    }

    #[inline]
    fn scalar(&self, [x, y, z]: [usize; 3]) -> f64 {
        let lane = self.data.slice(s![z, y, x, ..]);
        self.representation.reduce(lane.iter().map(|v| v.to_f64()))
    }

    #[inline]
    fn component(&self, [x, y, z]: [usize; 3], component: usize) -> f64 {
        self.data[[z, y, x, component]].to_f64()
    }

    fn representation(&self) -> ScalarRepresentation {
        self.representation
    }

    fn set_representation(&mut self, representation: ScalarRepresentation) -> Result<()> {
        if let ScalarRepresentation::Component(k) = representation {
            let count = self.components();
            if k >= count {
                return Err(WrapperError::InvalidComponent { component: k, count });
            }
        }
        self.representation = representation;
        Ok(())
    }

    fn raw_extrema(&self) -> (f64, f64) {
        fold_extrema(self.data.view().into_par_iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rgb() -> VectorStorage<u8> {
        let data = Array4::from_shape_fn((2, 2, 2, 3), |(z, y, x, c)| (x + 2 * y + 4 * z + c) as u8);
        VectorStorage::new(data).unwrap()
    }

    #[test]
    fn scalar_indexes_xyz() {
        let data = Array3::from_shape_fn((2, 3, 4), |(z, y, x)| (100 * z + 10 * y + x) as i16);
        let storage = ScalarStorage::new(data).unwrap();
        assert_eq!(storage.size(), [4, 3, 2]);
        assert_eq!(storage.scalar([3, 2, 1]), 123.0);
        assert_eq!(storage.raw_extrema(), (0.0, 123.0));
    }

    #[test]
    fn empty_buffer_rejected() {
        let data = Array3::<u8>::zeros((0, 3, 3));
        assert!(matches!(ScalarStorage::new(data), Err(WrapperError::InvalidBuffer(_))));
    }

    #[test]
    fn vector_representations() {
        let mut storage = rgb();
        // voxel (1, 1, 1) holds [7, 8, 9]
        storage.set_representation(ScalarRepresentation::Component(2)).unwrap();
        assert_eq!(storage.scalar([1, 1, 1]), 9.0);
        storage.set_representation(ScalarRepresentation::Max).unwrap();
        assert_eq!(storage.scalar([1, 1, 1]), 9.0);
        storage.set_representation(ScalarRepresentation::Average).unwrap();
        assert_eq!(storage.scalar([1, 1, 1]), 8.0);
        storage.set_representation(ScalarRepresentation::Magnitude).unwrap();
        assert_eq!(storage.scalar([1, 1, 1]), (49.0f64 + 64.0 + 81.0).sqrt());
        assert_eq!(storage.raw_extrema(), (0.0, 9.0));
    }

    #[test]
    fn component_out_of_range() {
        let mut storage = rgb();
        let err = storage.set_representation(ScalarRepresentation::Component(3));
        assert!(matches!(
            err,
            Err(WrapperError::InvalidComponent { component: 3, count: 3 })
        ));
        assert_eq!(storage.representation(), ScalarRepresentation::Magnitude);
    }
}
