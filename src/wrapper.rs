//! The type-erased image wrapper.
//!
//! [`ImageWrapper`] is the only interface the rest of the application sees.
//! [`TypedImageWrapper`] implements it once per storage kind; which one backs
//! a given wrapper is decided when the buffer is handed over by a loader.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use image::imageops::{self, FilterType};
use image::{ImageBuffer, Rgba, RgbaImage};
use log::{debug, info, trace};
use nalgebra::Matrix4;
use ndarray::{Array3, Array4};
use rayon::prelude::*;
use web_time::Instant;

use crate::cache::{DisplaySlice, WrapperCaches};
use crate::colormap::ColorMap;
use crate::common_format::{self, CommonFormatImage};
use crate::display::{DisplayMappingPolicy, apply_layer_alpha};
use crate::enums::{DisplayAxis, ExportChannel, ScalarRepresentation};
use crate::error::{Result, WrapperError};
use crate::geometry::{ImageGeometry, ImageRegion};
use crate::intensity::{IntensityCurve, NativeIntensityMapping};
use crate::labels::ColorLabelTable;
use crate::pixel::{PixelKind, VoxelComponent};
use crate::statistics::{self, ScalarImageHistogram};
use crate::storage::{ScalarStorage, VectorStorage, VoxelStorage};
use crate::transform::{self, ImageCoordinateTransform};

static NEXT_UNIQUE_ID: AtomicU64 = AtomicU64::new(1);

/// Uniform access to a volume regardless of how its voxels are stored.
///
/// Indices are `[x, y, z]` voxel indices. Every query on a wrapper without a
/// buffer fails with [`WrapperError::NotInitialized`].
pub trait ImageWrapper: Send {
    /// Identifier that no other wrapper in this process ever had.
    fn unique_id(&self) -> u64;

    /// Bumped by every change observers may need to redraw for.
    fn version(&self) -> u64;

    fn is_initialized(&self) -> bool;

    fn is_scalar(&self) -> bool;

    fn pixel_kind(&self) -> Result<PixelKind>;

    fn size(&self) -> Result<[usize; 3]>;

    fn buffered_region(&self) -> Result<ImageRegion>;

    fn number_of_voxels(&self) -> Result<usize>;

    fn number_of_components(&self) -> Result<usize>;

    fn geometry(&self) -> &ImageGeometry;

    /// Replace direction, spacing and origin and re-derive the display
    /// transforms from the new direction cosines.
    fn set_image_geometry(&mut self, geometry: ImageGeometry) -> Result<()>;

    fn slice_index(&self) -> Result<[usize; 3]>;

    /// Move the cursor. Components beyond the image are clamped to the last
    /// voxel rather than rejected.
    fn set_slice_index(&mut self, index: [usize; 3]) -> Result<()>;

    fn image_to_display_transform(&self, axis: DisplayAxis) -> ImageCoordinateTransform;

    /// Replace one plane's transform. Consistency with the other two planes
    /// is only checked when a slice is extracted.
    fn set_image_to_display_transform(&mut self, axis: DisplayAxis, transform: ImageCoordinateTransform);

    fn set_image_to_display_transforms(&mut self, transforms: [ImageCoordinateTransform; 3]) -> Result<()>;

    fn set_image_to_display_transforms_to_default(&mut self);

    /// Image axis the given display plane slices along.
    fn display_slice_image_axis(&self, axis: DisplayAxis) -> usize;

    /// RGBA cross-section through the current slice index. Cached until
    /// something it depends on changes.
    fn display_slice(&mut self, axis: DisplayAxis) -> Result<DisplaySlice>;

    /// Single voxel under the current scalar representation. Not meant for
    /// iterating over the volume.
    fn voxel_as_f64(&self, index: [usize; 3]) -> Result<f64>;

    /// Nearest voxel to a continuous index.
    fn voxel_as_f64_at(&self, continuous_index: [f64; 3]) -> Result<f64>;

    fn voxel_components_as_f64(&self, index: [usize; 3]) -> Result<Vec<f64>>;

    fn voxel_mapped_to_native(&self, index: [usize; 3]) -> Result<f64>;

    fn voxel_mapped_to_native_at(&self, continuous_index: [f64; 3]) -> Result<f64>;

    /// Minimum over all stored components, not mapped to native units.
    fn image_min_as_f64(&mut self) -> Result<f64>;

    /// Maximum over all stored components, not mapped to native units.
    fn image_max_as_f64(&mut self) -> Result<f64>;

    /// Stored minimum mapped to native units afterwards.
    fn image_min_native(&mut self) -> Result<f64>;

    /// Stored maximum mapped to native units afterwards.
    fn image_max_native(&mut self) -> Result<f64>;

    fn image_scale_factor(&self) -> f64;

    fn gradient_magnitude_upper_limit(&mut self) -> Result<f64>;

    fn gradient_magnitude_upper_limit_native(&mut self) -> Result<f64>;

    /// Histogram of the scalar representation binned over its stored range.
    fn histogram(&mut self, bins: usize) -> Result<Arc<ScalarImageHistogram>>;

    fn common_format_image(&mut self, channel: ExportChannel) -> Result<Arc<CommonFormatImage>>;

    fn scalar_representation(&self) -> Result<ScalarRepresentation>;

    fn set_scalar_representation(&mut self, representation: ScalarRepresentation) -> Result<()>;

    fn native_mapping(&self) -> &NativeIntensityMapping;

    fn display_mapping(&self) -> &DisplayMappingPolicy;

    /// `None` for wrappers without a curve, e.g. label images.
    fn intensity_curve(&self) -> Option<&IntensityCurve>;

    fn set_intensity_curve(&mut self, curve: Option<IntensityCurve>) -> Result<()>;

    fn color_map(&self) -> Option<&ColorMap>;

    fn set_color_map(&mut self, color_map: ColorMap) -> Result<()>;

    fn alpha(&self) -> u8;

    fn set_alpha(&mut self, alpha: u8);

    fn is_visible(&self) -> bool;

    fn set_visible(&mut self, visible: bool);

    fn toggle_visibility(&mut self) {
        let visible = self.is_visible();
        self.set_visible(!visible);
    }

    fn file_name(&self) -> &str;

    fn set_file_name(&mut self, file_name: &str);

    fn nickname(&self) -> &str;

    fn set_nickname(&mut self, nickname: &str);

    /// Physical position of a voxel index.
    ///
    /// The coordinate transforms are pure geometry: indices outside the
    /// buffered region are converted like any other and never fail with
    /// [`WrapperError::OutOfBounds`]. They only need a loaded buffer.
    fn transform_voxel_index_to_position(&self, index: [usize; 3]) -> Result<[f64; 3]>;

    fn transform_voxel_index_to_nifti_coordinates(&self, index: [f64; 3]) -> Result<[f64; 3]>;

    fn transform_nifti_coordinates_to_voxel_index(&self, nifti: [f64; 3]) -> Result<[f64; 3]>;

    fn nifti_sform(&self) -> Result<Matrix4<f64>>;

    /// Display color of the voxel where the three planes intersect.
    fn voxel_under_cursor_appearance(&mut self) -> Result<Rgba<u8>>;

    /// Native values shown to the user for the voxel under the cursor.
    ///
    /// Vector images displayed as RGB report every component. Otherwise the
    /// single value of the scalar view is reported: the selected component,
    /// or the magnitude, maximum or average.
    fn voxel_under_cursor_displayed_value(&self) -> Result<Vec<f64>>;

    /// Axial display slice shrunk to at most `max_dim` pixels on its longest
    /// side. A `max_dim` of zero is treated as one.
    fn thumbnail(&mut self, max_dim: u32) -> Result<RgbaImage>;

    fn write_thumbnail(&mut self, path: &Path, max_dim: u32) -> Result<()> {
        self.thumbnail(max_dim)?.save(path)?;
        Ok(())
    }

    /// Drop the buffer and every cache.
    fn reset(&mut self);
}

/// [`ImageWrapper`] over one concrete storage kind.
pub struct TypedImageWrapper<S> {
    id: u64,
    storage: Option<S>,
    geometry: ImageGeometry,
    native_mapping: NativeIntensityMapping,
    display_mapping: DisplayMappingPolicy,
    transforms: [ImageCoordinateTransform; 3],
    slice_index: [usize; 3],
    alpha: u8,
    visible: bool,
    file_name: String,
    nickname: String,
    version: u64,
    caches: WrapperCaches,
}

pub type ScalarImageWrapper<T> = TypedImageWrapper<ScalarStorage<T>>;
pub type VectorImageWrapper<T> = TypedImageWrapper<VectorStorage<T>>;
pub type LabelImageWrapper = ScalarImageWrapper<u16>;

impl<S: VoxelStorage> TypedImageWrapper<S> {
    /// A wrapper without a buffer.
    pub fn empty(display_mapping: DisplayMappingPolicy) -> Self {
        Self {
            id: NEXT_UNIQUE_ID.fetch_add(1, Ordering::Relaxed),
            storage: None,
            geometry: ImageGeometry::default(),
            native_mapping: NativeIntensityMapping::Identity,
            display_mapping,
            transforms: transform::default_transforms(),
            slice_index: [0; 3],
            alpha: 255,
            visible: true,
            file_name: String::new(),
            nickname: String::new(),
            version: 0,
            caches: WrapperCaches::default(),
        }
    }

    /// Fails with [`WrapperError::InvalidComponent`] when `storage` has fewer
    /// components than `display_mapping` reads, e.g. RGB display of a
    /// two-component image.
    pub fn new(
        storage: S,
        geometry: ImageGeometry,
        native_mapping: NativeIntensityMapping,
        display_mapping: DisplayMappingPolicy,
    ) -> Result<Self> {
        let mut wrapper = Self::empty(display_mapping);
        wrapper.replace_buffer(storage, geometry, native_mapping)?;
        Ok(wrapper)
    }

    /// Install a new buffer, e.g. on reload. The cursor moves to the center
    /// of the volume and every cache is dropped.
    pub fn replace_buffer(
        &mut self,
        storage: S,
        geometry: ImageGeometry,
        native_mapping: NativeIntensityMapping,
    ) -> Result<()> {
        let required = self.display_mapping.required_components();
        if storage.components() < required {
            return Err(WrapperError::InvalidComponent {
                component: required - 1,
                count: storage.components(),
            });
        }
        let transforms = geometry.display_transforms()?;
        let size = storage.size();
        info!(
            "wrapper {}: loaded {:?} buffer of size {:?} with {} component(s)",
            self.id,
            storage.pixel_kind(),
            size,
            storage.components()
        );
        self.storage = Some(storage);
        self.geometry = geometry;
        self.native_mapping = native_mapping;
        self.transforms = transforms;
        self.slice_index = size.map(|n| n / 2);
        self.caches.clear();
        self.touch();
        Ok(())
    }

    /// Typed access for the few callers that need the raw buffer.
    pub fn storage(&self) -> Option<&S> {
        self.storage.as_ref()
    }

    fn touch(&mut self) {
        self.version += 1;
    }

    fn storage_or_err(&self) -> Result<&S> {
        self.storage.as_ref().ok_or(WrapperError::NotInitialized)
    }

    fn checked(&self, index: [usize; 3]) -> Result<&S> {
        let storage = self.storage_or_err()?;
        let size = storage.size();
        if (0..3).any(|a| index[a] >= size[a]) {
            return Err(WrapperError::OutOfBounds {
                index: index.map(|i| i as i64),
                size,
            });
        }
        Ok(storage)
    }

    fn nearest_voxel(&self, continuous_index: [f64; 3]) -> Result<[usize; 3]> {
        let size = self.storage_or_err()?.size();
        let rounded = continuous_index.map(|c| if c.is_finite() { c.round() as i64 } else { i64::MIN });
        if !ImageRegion::new([0; 3], size).contains(rounded) {
            return Err(WrapperError::OutOfBounds { index: rounded, size });
        }
        Ok(rounded.map(|i| i as usize))
    }

    fn raw_extrema(&mut self) -> Result<(f64, f64)> {
        let storage = self.storage_or_err()?;
        if let Some(extrema) = self.caches.raw_extrema {
            return Ok(extrema);
        }
        let start = Instant::now();
        let extrema = storage.raw_extrema();
        debug!("wrapper {}: image extrema {:?} in {:?}", self.id, extrema, start.elapsed());
        self.caches.raw_extrema = Some(extrema);
        Ok(extrema)
    }

    fn scalar_extrema(&mut self) -> Result<(f64, f64)> {
        if S::IS_SCALAR {
            return self.raw_extrema();
        }
        let storage = self.storage_or_err()?;
        if let Some(extrema) = self.caches.scalar_extrema {
            return Ok(extrema);
        }
        let start = Instant::now();
        let extrema = statistics::scalar_extrema(storage);
        debug!(
            "wrapper {}: {:?} extrema {:?} in {:?}",
            self.id,
            storage.representation(),
            extrema,
            start.elapsed()
        );
        self.caches.scalar_extrema = Some(extrema);
        Ok(extrema)
    }

    /// Range the display mapping normalizes against.
    fn display_range(&mut self) -> Result<(f64, f64)> {
        if self.display_mapping.is_label() {
            self.storage_or_err()?;
            return Ok((0.0, 0.0));
        }
        if self.display_mapping.is_rgb() {
            return self.raw_extrema();
        }
        self.scalar_extrema()
    }

    fn compute_slice(&self, plane: usize, range: (f64, f64)) -> Result<RgbaImage> {
        let storage = self.storage_or_err()?;
        let t = self.transforms[plane];
        let size = storage.size();
        let [width, height, _] = t.display_size(size);
        let slice_axis = t.slice_axis();
        let depth = self.slice_index[slice_axis];
        let (alpha, visible) = (self.alpha, self.visible);
        let mapping = &self.display_mapping;

        let pixel_data: Vec<u8> = (0..height)
            .into_par_iter()
            .flat_map_iter(|v| {
                (0..width).flat_map(move |u| {
                    let mut index = t.to_image([u, v, 0], size);
                    index[slice_axis] = depth;
                    let color = mapping.map_voxel(storage, index, range);
                    apply_layer_alpha(color, alpha, visible).0
                })
            })
            .collect();

        ImageBuffer::from_raw(width as u32, height as u32, pixel_data).ok_or_else(|| {
            WrapperError::InvalidBuffer(format!("display slice of {width}x{height} is inconsistent"))
        })
    }

    fn invalidate_display(&mut self) {
        self.caches.invalidate_slices();
        self.touch();
    }
}

impl<T: VoxelComponent> ScalarImageWrapper<T> {
    /// Continuous grayscale wrapper over `data` laid out `(depth, height, width)`.
    pub fn from_array(data: Array3<T>, geometry: ImageGeometry) -> Result<Self> {
        Self::new(
            ScalarStorage::new(data)?,
            geometry,
            NativeIntensityMapping::Identity,
            DisplayMappingPolicy::default(),
        )
    }
}

impl LabelImageWrapper {
    /// Segmentation wrapper colored through a shared label table.
    pub fn labels(data: Array3<u16>, geometry: ImageGeometry, table: Arc<ColorLabelTable>) -> Result<Self> {
        Self::new(
            ScalarStorage::new(data)?,
            geometry,
            NativeIntensityMapping::Identity,
            DisplayMappingPolicy::label(table),
        )
    }
}

impl<T: VoxelComponent> VectorImageWrapper<T> {
    /// Continuous wrapper over `data` laid out `(depth, height, width, component)`.
    pub fn from_array(data: Array4<T>, geometry: ImageGeometry) -> Result<Self> {
        Self::new(
            VectorStorage::new(data)?,
            geometry,
            NativeIntensityMapping::Identity,
            DisplayMappingPolicy::default(),
        )
    }

    /// Wrapper displaying the first three components as red, green and blue.
    pub fn rgb(data: Array4<T>, geometry: ImageGeometry) -> Result<Self> {
        Self::new(
            VectorStorage::new(data)?,
            geometry,
            NativeIntensityMapping::Identity,
            DisplayMappingPolicy::rgb(),
        )
    }
}

impl<S: VoxelStorage> ImageWrapper for TypedImageWrapper<S> {
    fn unique_id(&self) -> u64 {
        self.id
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn is_initialized(&self) -> bool {
        self.storage.is_some()
    }

    fn is_scalar(&self) -> bool {
        S::IS_SCALAR
    }

    fn pixel_kind(&self) -> Result<PixelKind> {
        Ok(self.storage_or_err()?.pixel_kind())
    }

    fn size(&self) -> Result<[usize; 3]> {
        Ok(self.storage_or_err()?.size())
    }

    fn buffered_region(&self) -> Result<ImageRegion> {
        Ok(ImageRegion::new([0; 3], self.size()?))
    }

    fn number_of_voxels(&self) -> Result<usize> {
        Ok(self.buffered_region()?.number_of_voxels())
    }

    fn number_of_components(&self) -> Result<usize> {
        Ok(self.storage_or_err()?.components())
    }

    fn geometry(&self) -> &ImageGeometry {
        &self.geometry
    }

    fn set_image_geometry(&mut self, geometry: ImageGeometry) -> Result<()> {
        self.storage_or_err()?;
        self.transforms = geometry.display_transforms()?;
        self.geometry = geometry;
        self.caches.gradient_limit = None;
        self.invalidate_display();
        Ok(())
    }

    fn slice_index(&self) -> Result<[usize; 3]> {
        self.storage_or_err()?;
        Ok(self.slice_index)
    }

    fn set_slice_index(&mut self, index: [usize; 3]) -> Result<()> {
        let size = self.storage_or_err()?.size();
        let clamped: [usize; 3] = std::array::from_fn(|a| index[a].min(size[a] - 1));
        let changed: [bool; 3] = std::array::from_fn(|a| clamped[a] != self.slice_index[a]);
        if !changed.contains(&true) {
            return Ok(());
        }
        for plane in 0..3 {
            if changed[self.transforms[plane].slice_axis()] {
                self.caches.invalidate_slice(plane);
            }
        }
        for axis in (0..3).filter(|&a| changed[a]) {
            self.caches.invalidate_preview(axis);
        }
        self.slice_index = clamped;
        self.touch();
        Ok(())
    }

    fn image_to_display_transform(&self, axis: DisplayAxis) -> ImageCoordinateTransform {
        self.transforms[axis.index()]
    }

    fn set_image_to_display_transform(&mut self, axis: DisplayAxis, transform: ImageCoordinateTransform) {
        self.transforms[axis.index()] = transform;
        self.caches.invalidate_slice(axis.index());
        self.touch();
    }

    fn set_image_to_display_transforms(&mut self, transforms: [ImageCoordinateTransform; 3]) -> Result<()> {
        transform::check_consistent(&transforms)?;
        self.transforms = transforms;
        self.invalidate_display();
        Ok(())
    }

    fn set_image_to_display_transforms_to_default(&mut self) {
        self.transforms = transform::default_transforms();
        self.invalidate_display();
    }

    fn display_slice_image_axis(&self, axis: DisplayAxis) -> usize {
        self.transforms[axis.index()].slice_axis()
    }

    fn display_slice(&mut self, axis: DisplayAxis) -> Result<DisplaySlice> {
        self.storage_or_err()?;
        transform::check_consistent(&self.transforms)?;
        let plane = axis.index();
        if let Some(slice) = &self.caches.slices[plane] {
            return Ok(Arc::clone(slice));
        }
        let range = self.display_range()?;
        let slice = Arc::new(self.compute_slice(plane, range)?);
        trace!(
            "wrapper {}: recomputed {:?} slice at {:?}",
            self.id, axis, self.slice_index
        );
        self.caches.slices[plane] = Some(Arc::clone(&slice));
        Ok(slice)
    }

    fn voxel_as_f64(&self, index: [usize; 3]) -> Result<f64> {
        Ok(self.checked(index)?.scalar(index))
    }

    fn voxel_as_f64_at(&self, continuous_index: [f64; 3]) -> Result<f64> {
        self.voxel_as_f64(self.nearest_voxel(continuous_index)?)
    }

    fn voxel_components_as_f64(&self, index: [usize; 3]) -> Result<Vec<f64>> {
        let storage = self.checked(index)?;
        Ok((0..storage.components())
            .map(|c| storage.component(index, c))
            .collect())
    }

    fn voxel_mapped_to_native(&self, index: [usize; 3]) -> Result<f64> {
        Ok(self.native_mapping.map(self.voxel_as_f64(index)?))
    }

    fn voxel_mapped_to_native_at(&self, continuous_index: [f64; 3]) -> Result<f64> {
        self.voxel_mapped_to_native(self.nearest_voxel(continuous_index)?)
    }

    fn image_min_as_f64(&mut self) -> Result<f64> {
        Ok(self.raw_extrema()?.0)
    }

    fn image_max_as_f64(&mut self) -> Result<f64> {
        Ok(self.raw_extrema()?.1)
    }

    fn image_min_native(&mut self) -> Result<f64> {
        let raw = self.raw_extrema()?;
        Ok(self.native_mapping.map_range(raw).0)
    }

    fn image_max_native(&mut self) -> Result<f64> {
        let raw = self.raw_extrema()?;
        Ok(self.native_mapping.map_range(raw).1)
    }

    fn image_scale_factor(&self) -> f64 {
        self.native_mapping.scale()
    }

    fn gradient_magnitude_upper_limit(&mut self) -> Result<f64> {
        let storage = self.storage_or_err()?;
        if let Some(limit) = self.caches.gradient_limit {
            return Ok(limit);
        }
        let start = Instant::now();
        let limit = statistics::gradient_magnitude_upper_limit(storage, self.geometry.spacing());
        debug!(
            "wrapper {}: gradient magnitude bound {} in {:?}",
            self.id,
            limit,
            start.elapsed()
        );
        self.caches.gradient_limit = Some(limit);
        Ok(limit)
    }

    fn gradient_magnitude_upper_limit_native(&mut self) -> Result<f64> {
        Ok(self.gradient_magnitude_upper_limit()? * self.native_mapping.scale().abs())
    }

    fn histogram(&mut self, bins: usize) -> Result<Arc<ScalarImageHistogram>> {
        let range = self.scalar_extrema()?;
        let storage = self.storage_or_err()?;
        let key = (storage.representation(), bins);
        if let Some(histogram) = self.caches.histograms.get(&key) {
            return Ok(Arc::clone(histogram));
        }
        let start = Instant::now();
        let histogram = Arc::new(statistics::histogram(storage, bins, range));
        debug!(
            "wrapper {}: {}-bin histogram of {:?} in {:?}",
            self.id,
            bins,
            key.0,
            start.elapsed()
        );
        self.caches.histograms.insert(key, Arc::clone(&histogram));
        Ok(histogram)
    }

    fn common_format_image(&mut self, channel: ExportChannel) -> Result<Arc<CommonFormatImage>> {
        let storage = self.storage_or_err()?;
        let slot = channel.index();
        if let Some(image) = &self.caches.common_format[slot] {
            return Ok(Arc::clone(image));
        }
        let start = Instant::now();
        let image = Arc::new(common_format::convert(storage, channel, self.slice_index));
        debug!(
            "wrapper {}: common format {:?} ({:?}) in {:?}",
            self.id,
            channel,
            image.representation(),
            start.elapsed()
        );
        self.caches.common_format[slot] = Some(Arc::clone(&image));
        Ok(image)
    }

    fn scalar_representation(&self) -> Result<ScalarRepresentation> {
        Ok(self.storage_or_err()?.representation())
    }

    fn set_scalar_representation(&mut self, representation: ScalarRepresentation) -> Result<()> {
        let storage = self.storage.as_mut().ok_or(WrapperError::NotInitialized)?;
        let previous = storage.representation();
        storage.set_representation(representation)?;
        if storage.representation() != previous {
            self.caches.invalidate_representation();
            self.touch();
        }
        Ok(())
    }

    fn native_mapping(&self) -> &NativeIntensityMapping {
        &self.native_mapping
    }

    fn display_mapping(&self) -> &DisplayMappingPolicy {
        &self.display_mapping
    }

    fn intensity_curve(&self) -> Option<&IntensityCurve> {
        self.display_mapping.intensity_curve()
    }

    fn set_intensity_curve(&mut self, curve: Option<IntensityCurve>) -> Result<()> {
        self.display_mapping.set_intensity_curve(curve)?;
        self.invalidate_display();
        Ok(())
    }

    fn color_map(&self) -> Option<&ColorMap> {
        self.display_mapping.color_map()
    }

    fn set_color_map(&mut self, color_map: ColorMap) -> Result<()> {
        self.display_mapping.set_color_map(color_map)?;
        self.invalidate_display();
        Ok(())
    }

    fn alpha(&self) -> u8 {
        self.alpha
    }

    fn set_alpha(&mut self, alpha: u8) {
        if alpha != self.alpha {
            self.alpha = alpha;
            self.invalidate_display();
        }
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn set_visible(&mut self, visible: bool) {
        if visible != self.visible {
            self.visible = visible;
            self.invalidate_display();
        }
    }

    fn file_name(&self) -> &str {
        &self.file_name
    }

    fn set_file_name(&mut self, file_name: &str) {
        self.file_name = file_name.to_string();
        self.touch();
    }

    fn nickname(&self) -> &str {
        &self.nickname
    }

    fn set_nickname(&mut self, nickname: &str) {
        self.nickname = nickname.to_string();
        self.touch();
    }

    fn transform_voxel_index_to_position(&self, index: [usize; 3]) -> Result<[f64; 3]> {
        self.storage_or_err()?;
        Ok(self.geometry.voxel_index_to_position(index.map(|i| i as f64)))
    }

    fn transform_voxel_index_to_nifti_coordinates(&self, index: [f64; 3]) -> Result<[f64; 3]> {
        self.storage_or_err()?;
        Ok(self.geometry.voxel_index_to_nifti(index))
    }

    fn transform_nifti_coordinates_to_voxel_index(&self, nifti: [f64; 3]) -> Result<[f64; 3]> {
        self.storage_or_err()?;
        Ok(self.geometry.nifti_to_voxel_index(nifti))
    }

    fn nifti_sform(&self) -> Result<Matrix4<f64>> {
        self.storage_or_err()?;
        Ok(self.geometry.nifti_sform())
    }

    fn voxel_under_cursor_appearance(&mut self) -> Result<Rgba<u8>> {
        let range = self.display_range()?;
        let storage = self.checked(self.slice_index)?;
        let color = self.display_mapping.map_voxel(storage, self.slice_index, range);
        Ok(apply_layer_alpha(color, self.alpha, self.visible))
    }

    fn voxel_under_cursor_displayed_value(&self) -> Result<Vec<f64>> {
        if self.display_mapping.is_rgb() {
            return Ok(self
                .voxel_components_as_f64(self.slice_index)?
                .into_iter()
                .map(|v| self.native_mapping.map(v))
                .collect());
        }
        Ok(vec![self.voxel_mapped_to_native(self.slice_index)?])
    }

    fn thumbnail(&mut self, max_dim: u32) -> Result<RgbaImage> {
        let slice = self.display_slice(DisplayAxis::Axial)?;
        let max_dim = max_dim.max(1);
        let (width, height) = slice.dimensions();
        let longest = width.max(height);
        if longest <= max_dim {
            return Ok(RgbaImage::clone(&slice));
        }
        let scaled = |n: u32| ((n as u64 * max_dim as u64) / longest as u64).max(1) as u32;
        Ok(imageops::resize(
            &*slice,
            scaled(width),
            scaled(height),
            FilterType::Triangle,
        ))
    }

    fn reset(&mut self) {
        if self.storage.take().is_some() {
            debug!("wrapper {}: released buffer", self.id);
        }
        self.caches.clear();
        self.slice_index = [0; 3];
        self.touch();
    }
}
