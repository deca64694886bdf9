//! Engine configuration and rule profiles.

use crate::dwell::DwellConfig;
use crate::head_mouse::HeadMouseConfig;
use crate::mode::InteractionMode;
use crate::smoothing::SmoothingConfig;
use crate::toggle::ToggleConfig;
use crate::trigger::{TriggerRule, DEFAULT_GLOBAL_COOLDOWN_MS};

/// A named rule set with its global cooldown.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub id: String,
    pub name: String,
    pub global_cooldown_ms: u64,
    pub rules: Vec<TriggerRule>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            id: "default".to_string(),
            name: "Default".to_string(),
            global_cooldown_ms: DEFAULT_GLOBAL_COOLDOWN_MS,
            rules: Vec::new(),
        }
    }
}

impl Profile {
    pub fn new(id: impl Into<String>, rules: Vec<TriggerRule>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            rules,
            ..Self::default()
        }
    }

    pub fn with_global_cooldown(mut self, global_cooldown_ms: u64) -> Self {
        self.global_cooldown_ms = global_cooldown_ms;
        self
    }
}

/// Everything the coordinator needs at startup.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub mode: InteractionMode,
    pub smoothing: SmoothingConfig,
    pub dwell: DwellConfig,
    pub toggle: ToggleConfig,
    pub head_mouse: HeadMouseConfig,
    /// Screen size in pixels for the head-mouse cursor.
    pub screen_size: (f32, f32),
    pub profile: Profile,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mode: InteractionMode::default(),
            smoothing: SmoothingConfig::default(),
            dwell: DwellConfig::default(),
            toggle: ToggleConfig::default(),
            head_mouse: HeadMouseConfig::default(),
            screen_size: (1080.0, 2400.0),
            profile: Profile::default(),
        }
    }
}
