//! # Volume wrapper library
//!
//! This crate puts a uniform, type-erased API over 3-D medical images of any
//! voxel type so that a segmentation front end can treat every loaded layer
//! (grayscale, multi-component and label images alike) the same way.
//!
//! Each layer is an [`ImageWrapper`]. Behind it sits a [`TypedImageWrapper`]
//! over one concrete voxel buffer; the buffer is chosen once, from the
//! [`PixelKind`] tag of the decoded [`NativeImage`] a loader hands over.
//! A wrapper knows how to:
//!  - Cut the Axial, Coronal and Sagittal display slices at its cursor and
//!    color them through a continuous intensity curve and color map, or a
//!    label table
//!  - Report voxel values, both stored and mapped to native intensities
//!  - Compute extrema, histograms and a gradient-magnitude bound of its
//!    current scalar view
//!  - Convert voxel, physical and NIFTI coordinates into one another
//!  - Export its data in one common scalar type for numeric pipelines
//!
//! Everything derived from the voxel data is computed lazily and cached until
//! an input it depends on changes. Whole-volume computations are split along z
//! planes with rayon.
//!
//! # Examples
//!
//! ## Displaying the center of a DICOM series
//!
//! Read all DICOM files from the dicom/ directory, sort them by
//! InstanceNumber and grab the coronal slice through the center of the volume.
//!
//! ```no_run
//! # use volume_wrapper::{DicomSeriesLoader, DisplayAxis, DisplayMappingPolicy, NativeImageSource, SortBy};
//! let loader = DicomSeriesLoader::from_directory("dicom", SortBy::InstanceNumber)
//!     .expect("should have found files in directory");
//! let mut wrapper = loader
//!     .load_wrapper(DisplayMappingPolicy::default())
//!     .expect("should have loaded the series");
//! let slice = wrapper
//!     .display_slice(DisplayAxis::Coronal)
//!     .expect("should have returned slice at center of volume");
//! slice.save("result.png").expect("should have written the slice");
//! ```

mod cache;
pub mod colormap;
pub mod common_format;
pub mod display;
pub mod enums;
pub mod error;
pub mod geometry;
pub mod intensity;
pub mod labels;
pub mod loader;
pub mod native;
pub mod pixel;
pub mod settings;
mod statistics;
pub mod storage;
pub mod transform;
pub mod wrapper;

pub use cache::DisplaySlice;
pub use colormap::{ColorMap, ColorMapPreset};
pub use common_format::{CommonFormatImage, CommonFormatPixel};
pub use display::DisplayMappingPolicy;
pub use enums::{DisplayAxis, ExportChannel, ScalarRepresentation, SortBy};
pub use error::{LoaderError, Result, WrapperError};
pub use geometry::{ImageGeometry, ImageRegion};
pub use intensity::{IntensityCurve, NativeIntensityMapping};
pub use labels::{ColorLabel, ColorLabelTable};
pub use loader::{DicomSeriesLoader, NativeImageSource};
pub use native::NativeImage;
pub use pixel::{PixelKind, VoxelComponent};
pub use settings::{LayerSettings, SettingsRegistry};
pub use statistics::ScalarImageHistogram;
pub use storage::{ScalarStorage, VectorStorage, VoxelStorage};
pub use transform::ImageCoordinateTransform;
pub use wrapper::{
    ImageWrapper, LabelImageWrapper, ScalarImageWrapper, TypedImageWrapper, VectorImageWrapper,
};
