use gloo_storage::Storage;
use serde::{Deserialize, Serialize};

use crate::viewport::PanMode;

const STORAGE_KEY: &str = "hexworld_settings";

/// User preferences kept in local storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub pan_mode: PanMode,
    /// Paint segments from their SVG markup instead of the WebP raster.
    pub detailed_svg: bool,
}

pub fn load() -> Settings {
    gloo_storage::LocalStorage::get(STORAGE_KEY).unwrap_or_default()
}

pub fn save(settings: &Settings) {
    if let Err(err) = gloo_storage::LocalStorage::set(STORAGE_KEY, settings) {
        tracing::warn!(%err, "could not persist settings");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_continuous_raster() {
        let settings = Settings::default();
        assert_eq!(settings.pan_mode, PanMode::Continuous);
        assert!(!settings.detailed_svg);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let settings: Settings = serde_json::from_str(r#"{"detailed_svg":true}"#).expect("parse");
        assert_eq!(settings.pan_mode, PanMode::Continuous);
        assert!(settings.detailed_svg);

        let settings: Settings = serde_json::from_str(r#"{"pan_mode":"Discrete","unknown":1}"#).expect("parse");
        assert_eq!(settings.pan_mode, PanMode::Discrete);
        assert!(!settings.detailed_svg);
    }
}
