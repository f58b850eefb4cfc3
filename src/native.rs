//! Decoded buffers handed over by a loader, and the factory that picks the
//! concrete wrapper for their pixel type.

use ndarray::{Array3, Array4};

use crate::display::DisplayMappingPolicy;
use crate::error::{Result, WrapperError};
use crate::geometry::ImageGeometry;
use crate::intensity::NativeIntensityMapping;
use crate::pixel::{PixelKind, VoxelComponent};
use crate::storage::{ScalarStorage, VectorStorage};
use crate::wrapper::{ImageWrapper, TypedImageWrapper};

/// A decoded image as produced by the native image I/O collaborator.
///
/// `bytes` holds the voxels x-fastest with components interleaved, in the
/// machine's byte order.
#[derive(Clone, Debug)]
pub struct NativeImage {
    pub pixel_kind: PixelKind,
    /// Extent as `[x, y, z]`.
    pub size: [usize; 3],
    pub components: usize,
    pub geometry: ImageGeometry,
    pub native_mapping: NativeIntensityMapping,
    pub bytes: Vec<u8>,
}

impl NativeImage {
    /// Pack typed voxels into a native image.
    pub fn from_voxels<T: VoxelComponent>(
        size: [usize; 3],
        components: usize,
        voxels: &[T],
        geometry: ImageGeometry,
    ) -> Self {
        Self {
            pixel_kind: T::KIND,
            size,
            components,
            geometry,
            native_mapping: NativeIntensityMapping::Identity,
            bytes: bytemuck::cast_slice(voxels).to_vec(),
        }
    }

    pub fn with_native_mapping(mut self, mapping: NativeIntensityMapping) -> Self {
        self.native_mapping = mapping;
        self
    }

    /// Build the wrapper matching `pixel_kind`. Single-component images get a
    /// scalar wrapper, anything else a vector wrapper.
    pub fn into_wrapper(self, display_mapping: DisplayMappingPolicy) -> Result<Box<dyn ImageWrapper>> {
        match self.pixel_kind {
            PixelKind::U8 => self.build::<u8>(display_mapping),
            PixelKind::I8 => self.build::<i8>(display_mapping),
            PixelKind::U16 => self.build::<u16>(display_mapping),
            PixelKind::I16 => self.build::<i16>(display_mapping),
            PixelKind::U32 => self.build::<u32>(display_mapping),
            PixelKind::I32 => self.build::<i32>(display_mapping),
            PixelKind::F16 => self.build::<half::f16>(display_mapping),
            PixelKind::F32 => self.build::<f32>(display_mapping),
            PixelKind::F64 => self.build::<f64>(display_mapping),
        }
    }

    fn build<T: VoxelComponent>(self, display_mapping: DisplayMappingPolicy) -> Result<Box<dyn ImageWrapper>> {
        let [nx, ny, nz] = self.size;
        let expected = nx * ny * nz * self.components * size_of::<T>();
        if self.components == 0 || self.bytes.len() != expected {
            return Err(WrapperError::InvalidBuffer(format!(
                "{} bytes do not hold {:?} voxels of {} {:?} component(s)",
                self.bytes.len(),
                self.size,
                self.components,
                self.pixel_kind
            )));
        }
        // copied, since a Vec<u8> makes no alignment promise for T
        let mut voxels = vec![T::zeroed(); nx * ny * nz * self.components];
        bytemuck::cast_slice_mut::<T, u8>(&mut voxels).copy_from_slice(&self.bytes);
        let shape_error = |e: ndarray::ShapeError| WrapperError::InvalidBuffer(e.to_string());

        if self.components == 1 {
            let data = Array3::from_shape_vec((nz, ny, nx), voxels).map_err(shape_error)?;
            let wrapper = TypedImageWrapper::new(
                ScalarStorage::new(data)?,
                self.geometry,
                self.native_mapping,
                display_mapping,
            )?;
            Ok(Box::new(wrapper))
        } else {
            let data = Array4::from_shape_vec((nz, ny, nx, self.components), voxels).map_err(shape_error)?;
            let wrapper = TypedImageWrapper::new(
                VectorStorage::new(data)?,
                self.geometry,
                self.native_mapping,
                display_mapping,
            )?;
            Ok(Box::new(wrapper))
        }
    }
}
