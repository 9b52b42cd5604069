//! Preferences of the drag and drop display, stored as TOML.
//!
//! ```
//! use dnd_display::enums::DropType;
//! use dnd_display::settings::DisplaySettings;
//!
//! let settings = DisplaySettings::from_toml_str("drop_type = \"all\"\naccumulate = true")
//!     .expect("valid settings");
//! assert_eq!(settings.drop_type, DropType::All);
//! assert!(settings.accumulate);
//! assert!(settings.automatically_add_children);
//! ```

use crate::enums::{DropType, InterpolationType, WindowLayout};

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;
use web_time::Duration;

pub const DEFAULT_THUMBNAIL_EDGE_TRIM: f64 = 0.05;
pub const DEFAULT_DOUBLE_CLICK_INTERVAL_MS: u64 = 400;
pub const DEFAULT_DISPLAY_INTERACTOR_CONFIG: &str = "dnd-display";
pub const DEFAULT_TOOL_INTERACTOR_CONFIG: &str = "dnd-display-tool";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid settings file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Settings could not be serialized: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Thumbnail edge trim must be in [0, 0.5), got {0}")]
    InvalidEdgeTrim(f64),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DisplaySettings {
    pub drop_type: DropType,
    /// Layout viewers switch to when datasets are dropped into them.
    pub default_window_layout: WindowLayout,
    /// Add dropped datasets to what the viewer already shows instead of replacing it.
    pub accumulate: bool,
    /// Show the visible children of a dataset along with it.
    pub automatically_add_children: bool,
    pub interpolation: InterpolationType,
    pub remember_settings_per_window_layout: bool,
    /// Fraction of slices skipped at each end when spreading thumbnails.
    pub thumbnail_edge_trim: f64,
    /// Continue a multiple drop at the first viewer after passing the last one.
    pub wrap_multiple_drop: bool,
    pub double_click_interval_ms: u64,
    /// Event config of the display interactors of the viewers.
    pub display_interactor_config: String,
    /// Event config the display interactors switch to while a tool is active.
    pub tool_interactor_config: String,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            drop_type: DropType::Single,
            default_window_layout: WindowLayout::Coronal,
            accumulate: false,
            automatically_add_children: true,
            interpolation: InterpolationType::Cubic,
            remember_settings_per_window_layout: true,
            thumbnail_edge_trim: DEFAULT_THUMBNAIL_EDGE_TRIM,
            wrap_multiple_drop: true,
            double_click_interval_ms: DEFAULT_DOUBLE_CLICK_INTERVAL_MS,
            display_interactor_config: DEFAULT_DISPLAY_INTERACTOR_CONFIG.to_owned(),
            tool_interactor_config: DEFAULT_TOOL_INTERACTOR_CONFIG.to_owned(),
        }
    }
}

impl DisplaySettings {
    pub fn from_toml_str(content: &str) -> Result<Self, SettingsError> {
        let settings: Self = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> Result<String, SettingsError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn save_to_path(&self, path: impl AsRef<Path>) -> Result<(), SettingsError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if !(0.0..0.5).contains(&self.thumbnail_edge_trim) {
            return Err(SettingsError::InvalidEdgeTrim(self.thumbnail_edge_trim));
        }
        Ok(())
    }

    pub fn double_click_interval(&self) -> Duration {
        Duration::from_millis(self.double_click_interval_ms)
    }
}
