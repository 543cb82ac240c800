use crate::error::Result;
use serde::Deserialize;

/// Server settings, taken from the editor's `initializationOptions`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub use_choice_of_games_style_guide: bool,
    pub startup_file_name: String,
    pub scene_file_extension: String,
    pub image_check_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            use_choice_of_games_style_guide: true,
            startup_file_name: "startup.txt".to_string(),
            scene_file_extension: "txt".to_string(),
            image_check_timeout_ms: 2000,
        }
    }
}

/// The subset of settings the validator cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationOptions {
    pub style_guide: bool,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self { style_guide: true }
    }
}

impl Config {
    pub fn from_initialization_options(options: Option<serde_json::Value>) -> Result<Self> {
        match options {
            None | Some(serde_json::Value::Null) => Ok(Self::default()),
            Some(value) => Ok(serde_json::from_value(value)?),
        }
    }

    pub fn validation_options(&self) -> ValidationOptions {
        ValidationOptions {
            style_guide: self.use_choice_of_games_style_guide,
        }
    }

    pub fn is_startup_file(&self, file_name: &str) -> bool {
        file_name.eq_ignore_ascii_case(&self.startup_file_name)
    }

    pub fn scene_file_pattern(&self) -> String {
        format!("*.{}", self.scene_file_extension)
    }
}
