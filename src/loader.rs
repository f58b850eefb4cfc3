//! The native image I/O collaborator: turns files on disk into a
//! [`NativeImage`] the wrapper layer can take over.

use std::path::{Path, PathBuf};
use std::fs;

use dicom::{
    object::{FileDicomObject, InMemDicomObject, open_file},
    pixeldata::{ConvertOptions, PixelDecoder, VoiLutOption},
};
use dicom_dictionary_std::tags;
use log::{info, warn};
use nalgebra::{Matrix3, Vector3};
use ndarray::{Array2, s};

use crate::display::DisplayMappingPolicy;
use crate::enums::SortBy;
use crate::error::LoaderError;
use crate::geometry::ImageGeometry;
use crate::native::NativeImage;
use crate::wrapper::ImageWrapper;

/// Anything that can decode an image into a [`NativeImage`].
pub trait NativeImageSource {
    fn read_native(&self) -> Result<NativeImage, LoaderError>;

    /// Decode and wrap in one step.
    fn load_wrapper(&self, display_mapping: DisplayMappingPolicy) -> Result<Box<dyn ImageWrapper>, LoaderError> {
        Ok(self.read_native()?.into_wrapper(display_mapping)?)
    }
}

struct DecodedSlice {
    order: Option<f32>,
    position: Option<Vector3<f64>>,
    image: Array2<u16>,
}

/// Reads a single-frame DICOM series into one 16-bit volume.
pub struct DicomSeriesLoader {
    paths: Vec<PathBuf>,
    sort_by: SortBy,
}

impl DicomSeriesLoader {
    pub fn from_file_paths(paths: &[impl AsRef<Path>], sort_by: SortBy) -> Self {
        Self {
            paths: paths.iter().map(|p| p.as_ref().to_path_buf()).collect(),
            sort_by,
        }
    }

    /// Every `.dcm` file in `path`.
    pub fn from_directory(path: impl AsRef<Path>, sort_by: SortBy) -> Result<Self, LoaderError> {
        let paths: Vec<_> = fs::read_dir(path.as_ref())?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension()
                    .and_then(|s| s.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("dcm"))
            })
            .collect();

        if paths.is_empty() {
            return Err(LoaderError::NoValidImages);
        }

        Ok(Self { paths, sort_by })
    }

    /// Build a native image from already opened DICOM objects.
    ///
    /// # Errors
    ///
    /// Returns error if no valid images found, slice dimensions differ or the
    /// spacing cannot be read
    pub fn load_from_dicom_objects(
        dicom_objects: &[FileDicomObject<InMemDicomObject>],
        sort_by: &SortBy,
    ) -> Result<NativeImage, LoaderError> {
        let mut slices: Vec<_> = dicom_objects
            .iter()
            .filter_map(|dicom_object| Self::decode_slice(dicom_object, sort_by))
            .collect();

        if slices.is_empty() {
            return Err(LoaderError::NoValidImages);
        }

        Self::sort_slices(&mut slices, sort_by);
        Self::validate_dimensions(&slices)?;

        let spacing = Self::get_spacing(dicom_objects).ok_or(LoaderError::MissingSpacing)?;
        let orientation = dicom_objects.iter().find_map(Self::get_orientation);
        let geometry = Self::build_geometry(&slices, spacing, orientation)?;

        let (height, width) = slices[0].image.dim();
        let voxels = Self::build_voxels(&slices);
        info!(
            "loaded DICOM series of {} slices ({}x{})",
            slices.len(),
            width,
            height
        );
        Ok(NativeImage::from_voxels(
            [width, height, slices.len()],
            1,
            &voxels,
            geometry,
        ))
    }

    fn decode_slice(
        dicom_object: &FileDicomObject<InMemDicomObject>,
        sort_by: &SortBy,
    ) -> Option<DecodedSlice> {
        let order = Self::get_sort_order(dicom_object, sort_by)?;
        let pixel_data = dicom_object.decode_pixel_data().ok()?;
        let options = ConvertOptions::new().with_voi_lut(VoiLutOption::First);
        let image = pixel_data
            .to_ndarray_with_options::<u16>(&options)
            .ok()
            .map(|arr| arr.slice_move(s![0, .., .., 0]))?;
        Some(DecodedSlice {
            order,
            position: Self::get_position(dicom_object),
            image,
        })
    }

    fn get_sort_order(
        dicom_object: &FileDicomObject<InMemDicomObject>,
        sort_by: &SortBy,
    ) -> Option<Option<f32>> {
        match sort_by {
            SortBy::ImagePositionPatient => {
                let pos = dicom_object
                    .element(tags::IMAGE_POSITION_PATIENT)
                    .ok()?
                    .to_multi_float32()
                    .ok()?;
                Some(pos.get(2).copied())
            }
            SortBy::TablePosition => {
                let pos = dicom_object
                    .element(tags::TABLE_POSITION)
                    .ok()?
                    .to_float32()
                    .ok();
                Some(pos)
            }
            SortBy::InstanceNumber => {
                let num = dicom_object
                    .element(tags::INSTANCE_NUMBER)
                    .ok()?
                    .to_int::<i32>()
                    .ok()
                    .map(|n| n as f32);
                Some(num)
            }
            SortBy::None => Some(Some(0.0)),
        }
    }

    fn get_position(dicom_object: &FileDicomObject<InMemDicomObject>) -> Option<Vector3<f64>> {
        let pos = dicom_object
            .element(tags::IMAGE_POSITION_PATIENT)
            .ok()?
            .to_multi_float64()
            .ok()?;
        (pos.len() == 3).then(|| Vector3::new(pos[0], pos[1], pos[2]))
    }

    fn get_orientation(
        dicom_object: &FileDicomObject<InMemDicomObject>,
    ) -> Option<(Vector3<f64>, Vector3<f64>)> {
        let cosines = dicom_object
            .element(tags::IMAGE_ORIENTATION_PATIENT)
            .ok()?
            .to_multi_float64()
            .ok()?;
        (cosines.len() == 6).then(|| {
            (
                Vector3::new(cosines[0], cosines[1], cosines[2]),
                Vector3::new(cosines[3], cosines[4], cosines[5]),
            )
        })
    }

    fn sort_slices(slices: &mut [DecodedSlice], sort_by: &SortBy) {
        if !matches!(sort_by, SortBy::None) {
            slices.sort_by(|a, b| {
                a.order
                    .partial_cmp(&b.order)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        }

        if matches!(sort_by, SortBy::ImagePositionPatient) {
            slices.reverse();
        }
    }

    fn validate_dimensions(slices: &[DecodedSlice]) -> Result<(), LoaderError> {
        let first_dim = slices[0].image.dim();
        if slices.iter().any(|slice| slice.image.dim() != first_dim) {
            return Err(LoaderError::InconsistentDimensions);
        }
        Ok(())
    }

    /// Voxels x-fastest, slice after slice.
    fn build_voxels(slices: &[DecodedSlice]) -> Vec<u16> {
        slices
            .iter()
            .flat_map(|slice| slice.image.iter().copied())
            .collect()
    }

    /// Frame of the sorted slices. Unusable spacing is reported as missing;
    /// a degenerate orientation falls back to an axis-aligned frame.
    fn build_geometry(
        slices: &[DecodedSlice],
        spacing: [f64; 3],
        orientation: Option<(Vector3<f64>, Vector3<f64>)>,
    ) -> Result<ImageGeometry, LoaderError> {
        if spacing.iter().any(|s| !s.is_finite() || *s <= 0.0) {
            return Err(LoaderError::MissingSpacing);
        }
        let (row, col) = orientation.unwrap_or((Vector3::x(), Vector3::y()));
        let first = slices[0].position;
        let last = slices[slices.len() - 1].position;
        let normal = match (first, last) {
            (Some(a), Some(b)) if (b - a).norm() > f64::EPSILON => (b - a).normalize(),
            _ => row.cross(&col),
        };
        let direction = Matrix3::from_columns(&[row, col, normal]);
        let origin = first.unwrap_or_else(Vector3::zeros);

        match ImageGeometry::new(direction, Vector3::from(spacing), origin) {
            Ok(geometry) => Ok(geometry),
            Err(e) => {
                warn!("slice orientation unusable, falling back to an axis-aligned frame: {e}");
                Ok(ImageGeometry::with_spacing(spacing, origin.into())?)
            }
        }
    }

    /// Column, row and slice spacing.
    fn get_spacing(dicom_objects: &[FileDicomObject<InMemDicomObject>]) -> Option<[f64; 3]> {
        dicom_objects.iter().find_map(|dicom_object| {
            let pixel_spacing = dicom_object
                .element(tags::PIXEL_SPACING)
                .ok()?
                .to_multi_float64()
                .ok()?;

            let slice_thickness = dicom_object
                .element(tags::SLICE_THICKNESS)
                .ok()?
                .to_float64()
                .ok()?;

            Some([*pixel_spacing.get(1)?, *pixel_spacing.first()?, slice_thickness])
        })
    }
}

impl NativeImageSource for DicomSeriesLoader {
    fn read_native(&self) -> Result<NativeImage, LoaderError> {
        let objects: Result<Vec<_>, _> = self.paths.iter().map(open_file).collect();
        Self::load_from_dicom_objects(&objects?, &self.sort_by)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slice(order: f32, z: f64, fill: u16) -> DecodedSlice {
        DecodedSlice {
            order: Some(order),
            position: Some(Vector3::new(0.0, 0.0, z)),
            image: Array2::from_shape_fn((2, 3), |(y, x)| fill + (3 * y + x) as u16),
        }
    }

    #[test]
    fn image_position_sorts_descending() {
        let mut slices = vec![slice(1.0, 1.0, 10), slice(3.0, 3.0, 30), slice(2.0, 2.0, 20)];
        DicomSeriesLoader::sort_slices(&mut slices, &SortBy::ImagePositionPatient);
        let orders: Vec<_> = slices.iter().map(|s| s.order.unwrap()).collect();
        assert_eq!(orders, vec![3.0, 2.0, 1.0]);
    }

    #[test]
    fn instance_number_sorts_ascending() {
        let mut slices = vec![slice(2.0, 0.0, 0), slice(1.0, 0.0, 0)];
        DicomSeriesLoader::sort_slices(&mut slices, &SortBy::InstanceNumber);
        assert_eq!(slices[0].order, Some(1.0));
    }

    #[test]
    fn mismatched_slices_rejected() {
        let mut odd = slice(0.0, 0.0, 0);
        odd.image = Array2::zeros((3, 3));
        let slices = vec![slice(1.0, 1.0, 0), odd];
        assert!(matches!(
            DicomSeriesLoader::validate_dimensions(&slices),
            Err(LoaderError::InconsistentDimensions)
        ));
    }

    #[test]
    fn voxels_are_x_fastest() {
        let slices = vec![slice(0.0, 0.0, 0), slice(1.0, 1.0, 100)];
        let voxels = DicomSeriesLoader::build_voxels(&slices);
        assert_eq!(&voxels[..6], &[0, 1, 2, 3, 4, 5]);
        assert_eq!(voxels[6], 100);
    }

    #[test]
    fn geometry_follows_slice_positions() {
        let slices = vec![slice(0.0, 5.0, 0), slice(1.0, 1.0, 0)];
        let geometry = DicomSeriesLoader::build_geometry(&slices, [0.5, 0.5, 4.0], None).unwrap();
        assert_eq!(geometry.origin(), [0.0, 0.0, 5.0]);
        assert_eq!(geometry.voxel_index_to_position([0.0, 0.0, 1.0]), [0.0, 0.0, 1.0]);
        // slices stacked downwards put the sagittal plane's rows upside down
        let transforms = geometry.display_transforms().unwrap();
        assert_eq!(transforms[0].slice_axis(), 2);
        assert!(transforms[2].flips()[1]);
    }

    #[test]
    fn zero_slice_thickness_is_missing_spacing() {
        let slices = vec![slice(0.0, 0.0, 0), slice(1.0, 0.0, 0)];
        assert!(matches!(
            DicomSeriesLoader::build_geometry(&slices, [0.5, 0.5, 0.0], None),
            Err(LoaderError::MissingSpacing)
        ));
        assert!(matches!(
            DicomSeriesLoader::build_geometry(&slices, [f64::NAN, 0.5, 1.0], None),
            Err(LoaderError::MissingSpacing)
        ));
    }

    #[test]
    fn collinear_orientation_falls_back_to_axis_aligned() {
        let slices = vec![slice(0.0, 0.0, 0)];
        let orientation = Some((Vector3::x(), Vector3::x()));
        let geometry = DicomSeriesLoader::build_geometry(&slices, [1.0, 2.0, 3.0], orientation).unwrap();
        assert_eq!(geometry.spacing(), [1.0, 2.0, 3.0]);
        assert_eq!(geometry.direction(), &Matrix3::<f64>::identity());
    }
}
