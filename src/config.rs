//! Runtime settings
//!
//! Every section is optional in a settings file; missing fields take the
//! defaults from their module.

use serde::{Deserialize, Serialize};

use crate::controller::FrameConfig;
use crate::forces::ForceConfig;
use crate::layout::{DEFAULT_HEIGHT, DEFAULT_WIDTH};
use crate::model::ModelConfig;

/// Size of the drawing area
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
        }
    }
}

/// All tunables for one simulation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub viewport: Viewport,
    pub forces: ForceConfig,
    pub model: ModelConfig,
    pub frame: FrameConfig,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forces::{DEFAULT_FRICTION, DEFAULT_REST_LENGTH};

    #[test]
    fn empty_document_uses_defaults() {
        let settings: Settings = serde_yaml::from_str("{}").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.viewport.width, 800.0);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let yaml = r#"
viewport:
  width: 1200
forces:
  spring_constant: 0.1
model:
  seed: 7
"#;
        let settings: Settings = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(settings.viewport.width, 1200.0);
        assert_eq!(settings.viewport.height, DEFAULT_HEIGHT);
        assert_eq!(settings.forces.spring_constant, 0.1);
        assert_eq!(settings.forces.rest_length, DEFAULT_REST_LENGTH);
        assert_eq!(settings.forces.friction, DEFAULT_FRICTION);
        assert_eq!(settings.model.seed, 7);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let result: Result<Settings, _> = serde_json::from_str(r#"{"forces": {"gravity": 1}}"#);
        assert!(result.is_err());

        let result: Result<Settings, _> = serde_json::from_str(r#"{"physics": {}}"#);
        assert!(result.is_err());
    }
}
