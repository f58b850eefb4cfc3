use serde::{Deserialize, Serialize};

use crate::error::{Result, WrapperError};

/// Conversion from stored values to the units shown to the user, e.g. to undo
/// a fixed-point encoding applied when the image was loaded.
///
/// Extrema are computed on stored values and mapped afterwards, which is only
/// equivalent to mapping first because every variant here is affine.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum NativeIntensityMapping {
    #[default]
    Identity,
    Linear { scale: f64, shift: f64 },
}

impl NativeIntensityMapping {
    #[inline]
    pub fn map(&self, stored: f64) -> f64 {
        match *self {
            NativeIntensityMapping::Identity => stored,
            NativeIntensityMapping::Linear { scale, shift } => stored * scale + shift,
        }
    }

    pub fn unmap(&self, native: f64) -> f64 {
        match *self {
            NativeIntensityMapping::Identity => native,
            NativeIntensityMapping::Linear { scale, shift } => (native - shift) / scale,
        }
    }

    pub fn scale(&self) -> f64 {
        match *self {
            NativeIntensityMapping::Identity => 1.0,
            NativeIntensityMapping::Linear { scale, .. } => scale,
        }
    }

    /// Map a stored range, keeping `lo <= hi` when the scale is negative.
    pub fn map_range(&self, (lo, hi): (f64, f64)) -> (f64, f64) {
        let (a, b) = (self.map(lo), self.map(hi));
        (a.min(b), a.max(b))
    }
}

/// Piecewise-linear reparameterization of the normalized intensity range.
///
/// Both coordinates of every control point live in `[0, 1]`: the input is the
/// voxel value normalized to the image range, the output feeds the color map.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IntensityCurve {
    points: Vec<[f64; 2]>,
}

impl Default for IntensityCurve {
    fn default() -> Self {
        Self::identity()
    }
}

impl IntensityCurve {
    pub fn identity() -> Self {
        Self {
            points: vec![[0.0, 0.0], [1.0, 1.0]],
        }
    }

    /// Linear ramp from 0 at `lower` to 1 at `upper`, flat outside.
    pub fn window(lower: f64, upper: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&lower) || !(0.0..=1.0).contains(&upper) || lower >= upper {
            return Err(WrapperError::InvalidCurve(format!(
                "window [{lower}, {upper}] must be an increasing sub-range of [0, 1]"
            )));
        }
        let mut points = vec![[lower, 0.0], [upper, 1.0]];
        if lower > 0.0 {
            points.insert(0, [0.0, 0.0]);
        }
        if upper < 1.0 {
            points.push([1.0, 1.0]);
        }
        Ok(Self { points })
    }

    pub fn from_control_points(points: Vec<[f64; 2]>) -> Result<Self> {
        if points.len() < 2 {
            return Err(WrapperError::InvalidCurve(
                "an intensity curve needs at least two control points".to_string(),
            ));
        }
        let in_unit = |v: f64| (0.0..=1.0).contains(&v);
        if points.iter().any(|p| !in_unit(p[0]) || !in_unit(p[1]))
            || points.windows(2).any(|w| w[0][0] >= w[1][0])
        {
            return Err(WrapperError::InvalidCurve(
                "intensity curve control points must increase within [0, 1]".to_string(),
            ));
        }
        Ok(Self { points })
    }

    pub fn control_points(&self) -> &[[f64; 2]] {
        &self.points
    }

    pub fn is_monotone(&self) -> bool {
        self.points.windows(2).all(|w| w[0][1] <= w[1][1])
    }

    /// Curve output at `t`. Inputs left of the first point, and NaN, give the
    /// first output; inputs right of the last point give the last output.
    pub fn evaluate(&self, t: f64) -> f64 {
        let first = self.points[0];
        let last = self.points[self.points.len() - 1];
        if t.is_nan() || t <= first[0] {
            return first[1];
        }
        if t >= last[0] {
            return last[1];
        }
        let seg = self.points.partition_point(|p| p[0] <= t);
        let [x0, y0] = self.points[seg - 1];
        let [x1, y1] = self.points[seg];
        y0 + (t - x0) / (x1 - x0) * (y1 - y0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_mapping_and_inverse() {
        let m = NativeIntensityMapping::Linear { scale: 0.5, shift: -10.0 };
        assert_eq!(m.map(40.0), 10.0);
        assert_eq!(m.unmap(10.0), 40.0);
        assert_eq!(m.scale(), 0.5);
    }

    #[test]
    fn negative_scale_keeps_range_ordered() {
        let m = NativeIntensityMapping::Linear { scale: -2.0, shift: 0.0 };
        assert_eq!(m.map_range((1.0, 3.0)), (-6.0, -2.0));
    }

    #[test]
    fn identity_curve_passes_through() {
        let c = IntensityCurve::identity();
        assert_eq!(c.evaluate(42.0 / 63.0), 42.0 / 63.0);
        assert_eq!(c.evaluate(-1.0), 0.0);
        assert_eq!(c.evaluate(2.0), 1.0);
    }

    #[test]
    fn window_clamps_outside() {
        let c = IntensityCurve::window(0.25, 0.75).unwrap();
        assert_eq!(c.evaluate(0.1), 0.0);
        assert!((c.evaluate(0.5) - 0.5).abs() < 1e-12);
        assert_eq!(c.evaluate(0.9), 1.0);
        assert!(c.is_monotone());
    }

    #[test]
    fn nan_input_gives_first_output() {
        let c = IntensityCurve::from_control_points(vec![[0.0, 0.2], [0.5, 0.4], [1.0, 1.0]]).unwrap();
        assert_eq!(c.evaluate(f64::NAN), 0.2);
        assert_eq!(c.evaluate(f64::INFINITY), 1.0);
        assert_eq!(c.evaluate(f64::NEG_INFINITY), 0.2);
    }

    #[test]
    fn rejects_unsorted_points() {
        assert!(matches!(
            IntensityCurve::from_control_points(vec![[0.5, 0.0], [0.2, 1.0]]),
            Err(WrapperError::InvalidCurve(_))
        ));
        assert!(matches!(IntensityCurve::window(0.6, 0.4), Err(WrapperError::InvalidCurve(_))));
        let curve = IntensityCurve::from_control_points(vec![[0.0, 1.0], [1.0, 0.0]]).unwrap();
        assert!(!curve.is_monotone());
    }
}
