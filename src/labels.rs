use image::Rgba;

/// Number of labels a table can address.
pub const MAX_COLOR_LABELS: usize = 1 << 16;

/// Color returned for labels the table does not define.
pub const BACKGROUND: Rgba<u8> = Rgba([0, 0, 0, 0]);

#[derive(Clone, Debug, PartialEq)]
pub struct ColorLabel {
    pub color: [u8; 3],
    pub alpha: u8,
    pub visible: bool,
    pub description: String,
}

impl ColorLabel {
    pub fn new(color: [u8; 3], description: impl Into<String>) -> Self {
        Self {
            color,
            alpha: 255,
            visible: true,
            description: description.into(),
        }
    }

    pub fn rgba(&self) -> Rgba<u8> {
        let [r, g, b] = self.color;
        Rgba([r, g, b, self.alpha])
    }
}

/// Lookup table from label value to color, shared between label wrappers.
#[derive(Clone, Debug)]
pub struct ColorLabelTable {
    labels: Vec<Option<ColorLabel>>,
}

impl Default for ColorLabelTable {
    fn default() -> Self {
        Self::with_default_labels()
    }
}

impl ColorLabelTable {
    /// A table with only the transparent clear label.
    pub fn empty() -> Self {
        let mut labels = vec![None; MAX_COLOR_LABELS];
        labels[0] = Some(ColorLabel {
            color: [0, 0, 0],
            alpha: 0,
            visible: false,
            description: "Clear Label".to_string(),
        });
        Self { labels }
    }

    pub fn with_default_labels() -> Self {
        const DEFAULTS: [([u8; 3], &str); 6] = [
            ([255, 0, 0], "Label 1"),
            ([0, 255, 0], "Label 2"),
            ([0, 0, 255], "Label 3"),
            ([255, 255, 0], "Label 4"),
            ([0, 255, 255], "Label 5"),
            ([255, 0, 255], "Label 6"),
        ];
        let mut table = Self::empty();
        for (i, (color, name)) in DEFAULTS.into_iter().enumerate() {
            table.set_label(i as u16 + 1, ColorLabel::new(color, name));
        }
        table
    }

    pub fn set_label(&mut self, value: u16, label: ColorLabel) {
        self.labels[value as usize] = Some(label);
    }

    pub fn remove_label(&mut self, value: u16) {
        if value != 0 {
            self.labels[value as usize] = None;
        }
    }

    pub fn label(&self, value: u16) -> Option<&ColorLabel> {
        self.labels[value as usize].as_ref()
    }

    pub fn defined_labels(&self) -> impl Iterator<Item = (u16, &ColorLabel)> {
        self.labels
            .iter()
            .enumerate()
            .filter_map(|(i, l)| l.as_ref().map(|l| (i as u16, l)))
    }

    /// Color for a stored voxel value. Values that are not a defined, visible
    /// label fall back to [`BACKGROUND`].
    pub fn color_of(&self, value: f64) -> Rgba<u8> {
        let rounded = value.round();
        if !(0.0..MAX_COLOR_LABELS as f64).contains(&rounded) {
            return BACKGROUND;
        }
        match &self.labels[rounded as usize] {
            Some(label) if label.visible => label.rgba(),
            _ => BACKGROUND,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_labels_resolve() {
        let table = ColorLabelTable::default();
        assert_eq!(table.color_of(1.0), Rgba([255, 0, 0, 255]));
        assert_eq!(table.color_of(3.2), Rgba([0, 0, 255, 255]));
        assert_eq!(table.defined_labels().count(), 7);
    }

    #[test]
    fn unexpected_values_fall_back_to_background() {
        let table = ColorLabelTable::default();
        assert_eq!(table.color_of(0.0), BACKGROUND);
        assert_eq!(table.color_of(7.0), BACKGROUND);
        assert_eq!(table.color_of(-4.0), BACKGROUND);
        assert_eq!(table.color_of(1e9), BACKGROUND);
        assert_eq!(table.color_of(f64::NAN), BACKGROUND);
    }

    #[test]
    fn hidden_label_is_background() {
        let mut table = ColorLabelTable::default();
        let mut label = table.label(2).cloned().unwrap();
        label.visible = false;
        table.set_label(2, label);
        assert_eq!(table.color_of(2.0), BACKGROUND);
        table.remove_label(1);
        assert_eq!(table.color_of(1.0), BACKGROUND);
    }
}
