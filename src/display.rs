use std::sync::Arc;

use image::Rgba;

use crate::colormap::ColorMap;
use crate::error::{Result, WrapperError};
use crate::intensity::IntensityCurve;
use crate::labels::ColorLabelTable;
use crate::storage::VoxelStorage;

/// Turns a sample into a display color. The variant is chosen when the
/// wrapper is built and never changes afterwards.
#[derive(Clone, Debug)]
pub enum DisplayMappingPolicy {
    /// value → normalized to the image range → intensity curve → color map
    Continuous {
        curve: Option<IntensityCurve>,
        color_map: ColorMap,
    },
    /// value → label table lookup
    Label(Arc<ColorLabelTable>),
    /// first three components → red, green and blue, each normalized to the
    /// range of all stored components
    Rgb,
}

impl Default for DisplayMappingPolicy {
    fn default() -> Self {
        Self::Continuous {
            curve: Some(IntensityCurve::identity()),
            color_map: ColorMap::default(),
        }
    }
}

impl DisplayMappingPolicy {
    pub fn continuous(curve: Option<IntensityCurve>, color_map: ColorMap) -> Self {
        Self::Continuous { curve, color_map }
    }

    pub fn label(table: Arc<ColorLabelTable>) -> Self {
        Self::Label(table)
    }

    pub fn rgb() -> Self {
        Self::Rgb
    }

    pub fn is_label(&self) -> bool {
        matches!(self, Self::Label(_))
    }

    pub fn is_rgb(&self) -> bool {
        matches!(self, Self::Rgb)
    }

    /// Whether values go through an intensity curve and a color map.
    pub fn is_continuous(&self) -> bool {
        matches!(self, Self::Continuous { .. })
    }

    /// Components a voxel must have to be displayed with this policy.
    pub fn required_components(&self) -> usize {
        if self.is_rgb() { 3 } else { 1 }
    }

    pub fn intensity_curve(&self) -> Option<&IntensityCurve> {
        match self {
            Self::Continuous { curve, .. } => curve.as_ref(),
            Self::Label(_) | Self::Rgb => None,
        }
    }

    pub fn color_map(&self) -> Option<&ColorMap> {
        match self {
            Self::Continuous { color_map, .. } => Some(color_map),
            Self::Label(_) | Self::Rgb => None,
        }
    }

    pub fn label_table(&self) -> Option<&Arc<ColorLabelTable>> {
        match self {
            Self::Label(table) => Some(table),
            Self::Continuous { .. } | Self::Rgb => None,
        }
    }

    pub fn set_intensity_curve(&mut self, new_curve: Option<IntensityCurve>) -> Result<()> {
        match self {
            Self::Continuous { curve, .. } => {
                *curve = new_curve;
                Ok(())
            }
            Self::Label(_) => Err(WrapperError::UnsupportedMapping(
                "label images have no intensity curve",
            )),
            Self::Rgb => Err(WrapperError::UnsupportedMapping(
                "RGB display has no intensity curve",
            )),
        }
    }

    pub fn set_color_map(&mut self, new_map: ColorMap) -> Result<()> {
        match self {
            Self::Continuous { color_map, .. } => {
                *color_map = new_map;
                Ok(())
            }
            Self::Label(_) => Err(WrapperError::UnsupportedMapping(
                "label images are colored by their label table",
            )),
            Self::Rgb => Err(WrapperError::UnsupportedMapping(
                "RGB display takes its colors from the voxel components",
            )),
        }
    }

    /// Map a stored scalar to RGBA. `range` is the stored min/max the
    /// continuous pipeline normalizes against; label lookup ignores it. The
    /// RGB policy shows a lone scalar as gray.
    pub fn map_value(&self, value: f64, range: (f64, f64)) -> Rgba<u8> {
        match self {
            Self::Continuous { curve, color_map } => {
                let t = normalize(value, range);
                let t = match curve {
                    Some(curve) => curve.evaluate(t),
                    None => t,
                };
                color_map.map(t)
            }
            Self::Label(table) => table.color_of(value),
            Self::Rgb => {
                let g = to_channel(normalize(value, range));
                Rgba([g, g, g, 255])
            }
        }
    }

    /// Map red, green and blue samples to an opaque pixel.
    pub fn map_rgb(&self, rgb: [f64; 3], range: (f64, f64)) -> Rgba<u8> {
        let [r, g, b] = rgb.map(|v| to_channel(normalize(v, range)));
        Rgba([r, g, b, 255])
    }

    /// Color of the voxel at `index`, reading whichever samples the policy
    /// needs from `storage`.
    #[inline]
    pub(crate) fn map_voxel<S: VoxelStorage>(&self, storage: &S, index: [usize; 3], range: (f64, f64)) -> Rgba<u8> {
        match self {
            Self::Rgb => self.map_rgb([0, 1, 2].map(|c| storage.component(index, c)), range),
            _ => self.map_value(storage.scalar(index), range),
        }
    }
}

/// Position of `value` in `[min, max]` as a number in `[0, 1]`.
///
/// Flat ranges and NaN give 0; values at or beyond the ends (infinities
/// included) give the nearest end.
fn normalize(value: f64, (min, max): (f64, f64)) -> f64 {
    if value.is_nan() || min.is_nan() || max.is_nan() || max <= min || value <= min {
        return 0.0;
    }
    if value >= max {
        return 1.0;
    }
    let t = (value - min) / (max - min);
    if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) }
}

fn to_channel(t: f64) -> u8 {
    (t * 255.0).round() as u8
}

/// Fold a layer's opacity and visibility into a mapped pixel.
#[inline]
pub fn apply_layer_alpha(pixel: Rgba<u8>, alpha: u8, visible: bool) -> Rgba<u8> {
    let Rgba([r, g, b, a]) = pixel;
    let a = if visible {
        ((a as u16 * alpha as u16 + 127) / 255) as u8
    } else {
        0
    };
    Rgba([r, g, b, a])
}
