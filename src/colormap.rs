use image::Rgba;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColorMapPreset {
    #[default]
    Grayscale,
    Hot,
    Cool,
    Jet,
}

#[derive(Clone, Debug, PartialEq)]
struct ColorMapPoint {
    t: f64,
    color: [u8; 4],
}

/// Maps a value in `[0, 1]` to RGBA by interpolating between control points.
#[derive(Clone, Debug, PartialEq)]
pub struct ColorMap {
    points: Vec<ColorMapPoint>,
    preset: Option<ColorMapPreset>,
}

impl Default for ColorMap {
    fn default() -> Self {
        Self::from_preset(ColorMapPreset::Grayscale)
    }
}

impl ColorMap {
    pub fn from_preset(preset: ColorMapPreset) -> Self {
        let stops: &[(f64, [u8; 4])] = match preset {
            ColorMapPreset::Grayscale => &[(0.0, [0, 0, 0, 255]), (1.0, [255, 255, 255, 255])],
            ColorMapPreset::Hot => &[
                (0.0, [0, 0, 0, 255]),
                (1.0 / 3.0, [255, 0, 0, 255]),
                (2.0 / 3.0, [255, 255, 0, 255]),
                (1.0, [255, 255, 255, 255]),
            ],
            ColorMapPreset::Cool => &[(0.0, [0, 255, 255, 255]), (1.0, [255, 0, 255, 255])],
            ColorMapPreset::Jet => &[
                (0.0, [0, 0, 128, 255]),
                (0.125, [0, 0, 255, 255]),
                (0.375, [0, 255, 255, 255]),
                (0.625, [255, 255, 0, 255]),
                (0.875, [255, 0, 0, 255]),
                (1.0, [128, 0, 0, 255]),
            ],
        };
        Self {
            points: stops
                .iter()
                .map(|&(t, color)| ColorMapPoint { t, color })
                .collect(),
            preset: Some(preset),
        }
    }

    /// Linear blend between two colors.
    pub fn two_color(low: Rgba<u8>, high: Rgba<u8>) -> Self {
        Self {
            points: vec![
                ColorMapPoint { t: 0.0, color: low.0 },
                ColorMapPoint { t: 1.0, color: high.0 },
            ],
            preset: None,
        }
    }

    /// Preset this map was built from, `None` for custom maps.
    pub fn preset(&self) -> Option<ColorMapPreset> {
        self.preset
    }

    pub fn map(&self, t: f64) -> Rgba<u8> {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let first = &self.points[0];
        let last = &self.points[self.points.len() - 1];
        if t <= first.t {
            return Rgba(first.color);
        }
        if t >= last.t {
            return Rgba(last.color);
        }
        let seg = self.points.partition_point(|p| p.t <= t);
        let (a, b) = (&self.points[seg - 1], &self.points[seg]);
        let f = (t - a.t) / (b.t - a.t);
        let mut out = [0u8; 4];
        for (c, o) in out.iter_mut().enumerate() {
            let (ca, cb) = (a.color[c] as f64, b.color[c] as f64);
            *o = (ca + (cb - ca) * f).round().clamp(0.0, 255.0) as u8;
        }
        Rgba(out)
    }
}
