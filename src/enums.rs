use serde::{Deserialize, Serialize};

/// One of the three orthogonal display planes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DisplayAxis {
    Axial,
    Coronal,
    Sagittal,
}

impl DisplayAxis {
    pub const ALL: [DisplayAxis; 3] = [
        DisplayAxis::Axial,
        DisplayAxis::Coronal,
        DisplayAxis::Sagittal,
    ];

    pub fn index(self) -> usize {
        match self {
            DisplayAxis::Axial => 0,
            DisplayAxis::Coronal => 1,
            DisplayAxis::Sagittal => 2,
        }
    }
}

/// How a single scalar is derived from a multi-component voxel.
///
/// Scalar images ignore this and always report their only component.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarRepresentation {
    Component(usize),
    #[default]
    Magnitude,
    Max,
    Average,
}

impl ScalarRepresentation {
    /// Reduce the components of one voxel to a scalar.
    ///
    /// `Component(k)` must already have been validated against the
    /// component count.
    #[inline]
    pub fn reduce(self, mut components: impl Iterator<Item = f64>) -> f64 {
        match self {
            ScalarRepresentation::Component(k) => components.nth(k).unwrap_or(0.0),
            ScalarRepresentation::Magnitude => components.map(|c| c * c).sum::<f64>().sqrt(),
            ScalarRepresentation::Max => components.fold(f64::NEG_INFINITY, f64::max),
            ScalarRepresentation::Average => {
                let (sum, n) = components.fold((0.0, 0usize), |(s, n), c| (s + c, n + 1));
                if n == 0 { 0.0 } else { sum / n as f64 }
            }
        }
    }
}

/// Export channels of the common-format representation. One channel covers
/// the whole volume, the other three cover a single plane orthogonal to image
/// axis x, y or z at the current slice index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExportChannel {
    WholeImage,
    PreviewX,
    PreviewY,
    PreviewZ,
}

impl ExportChannel {
    pub const ALL: [ExportChannel; 4] = [
        ExportChannel::WholeImage,
        ExportChannel::PreviewX,
        ExportChannel::PreviewY,
        ExportChannel::PreviewZ,
    ];

    pub fn index(self) -> usize {
        match self {
            ExportChannel::WholeImage => 0,
            ExportChannel::PreviewX => 1,
            ExportChannel::PreviewY => 2,
            ExportChannel::PreviewZ => 3,
        }
    }

    /// Image axis a preview channel is sliced along, `None` for the whole image.
    pub fn preview_axis(self) -> Option<usize> {
        match self {
            ExportChannel::WholeImage => None,
            ExportChannel::PreviewX => Some(0),
            ExportChannel::PreviewY => Some(1),
            ExportChannel::PreviewZ => Some(2),
        }
    }
}

/// Key the slices of a DICOM series are ordered by.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortBy {
    #[default]
    ImagePositionPatient,
    TablePosition,
    InstanceNumber,
    None,
}
