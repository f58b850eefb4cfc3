use thiserror::Error;

/// Errors raised by the image wrapper layer.
///
/// All of these are local precondition violations reported to the immediate
/// caller. Slice-index clamping and label-table fallback are normalization,
/// not errors, and never show up here.
#[derive(Debug, Error)]
pub enum WrapperError {
    #[error("Image wrapper holds no data")]
    NotInitialized,

    #[error("Voxel index {index:?} is outside the buffered region of size {size:?}")]
    OutOfBounds { index: [i64; 3], size: [usize; 3] },

    #[error("Component {component} is out of range for an image with {count} components")]
    InvalidComponent { component: usize, count: usize },

    #[error("Inconsistent image to display transforms: {0}")]
    InconsistentTransform(String),

    #[error("Invalid image geometry: {0}")]
    InvalidGeometry(String),

    #[error("Invalid voxel buffer: {0}")]
    InvalidBuffer(String),

    #[error("Invalid intensity curve: {0}")]
    InvalidCurve(String),

    #[error("Operation not supported by this display mapping: {0}")]
    UnsupportedMapping(&'static str),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, WrapperError>;

/// Errors raised by the native image loader collaborator.
#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("No valid DICOM images found")]
    NoValidImages,

    #[error("Inconsistent image dimensions")]
    InconsistentDimensions,

    #[error("Missing spacing information")]
    MissingSpacing,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("DICOM error: {0}")]
    Dicom(#[from] dicom::object::ReadError),

    #[error("Settings error: {0}")]
    Settings(#[from] serde_json::Error),

    #[error("Wrapper error: {0}")]
    Wrapper(#[from] WrapperError),
}
