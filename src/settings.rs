//! Per-file display settings saved between sessions.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::colormap::{ColorMap, ColorMapPreset};
use crate::error::{LoaderError, Result};
use crate::intensity::IntensityCurve;
use crate::wrapper::ImageWrapper;

/// Stored settings of one layer.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LayerSettings {
    /// Control points of the intensity curve; `None` is the identity curve.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intensity_curve: Option<Vec<[f64; 2]>>,
    #[serde(default)]
    pub color_map: ColorMapPreset,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alpha: Option<u8>,
}

/// Settings keyed by file name.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SettingsRegistry {
    entries: HashMap<String, LayerSettings>,
}

impl SettingsRegistry {
    pub fn from_json(json: &str) -> std::result::Result<Self, LoaderError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> std::result::Result<Self, LoaderError> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    pub fn to_json(&self) -> std::result::Result<String, LoaderError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn get(&self, file_name: &str) -> Option<&LayerSettings> {
        self.entries.get(file_name)
    }

    pub fn insert(&mut self, file_name: impl Into<String>, settings: LayerSettings) {
        self.entries.insert(file_name.into(), settings);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Capture the current settings of `wrapper` under its file name.
    ///
    /// A color map built from control points rather than a preset is stored
    /// as the default preset.
    pub fn record(&mut self, wrapper: &dyn ImageWrapper) {
        let settings = LayerSettings {
            intensity_curve: wrapper
                .intensity_curve()
                .map(|curve| curve.control_points().to_vec()),
            color_map: wrapper
                .color_map()
                .and_then(ColorMap::preset)
                .unwrap_or_default(),
            alpha: Some(wrapper.alpha()),
        };
        self.insert(wrapper.file_name(), settings);
    }

    /// Push the entry matching the wrapper's file name into it.
    ///
    /// Returns whether an entry was found. Label and RGB wrappers only take the
    /// alpha.
    pub fn apply(&self, wrapper: &mut dyn ImageWrapper) -> Result<bool> {
        let Some(settings) = self.entries.get(wrapper.file_name()) else {
            return Ok(false);
        };
        debug!("applying saved settings to {}", wrapper.file_name());

        if wrapper.display_mapping().is_continuous() {
            let curve = settings
                .intensity_curve
                .clone()
                .map(IntensityCurve::from_control_points)
                .transpose()?;
            wrapper.set_intensity_curve(curve)?;
            wrapper.set_color_map(ColorMap::from_preset(settings.color_map))?;
        }
        if let Some(alpha) = settings.alpha {
            wrapper.set_alpha(alpha);
        }
        Ok(true)
    }
}
