//! Casting engine settings
//!
//! Timing and geometry knobs for the casting lifecycle, the targeting
//! protocol and projectiles. Stored as RON next to the executable and
//! falling back to defaults when missing or unreadable.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default settings file name
pub const SETTINGS_FILE: &str = "magic_settings.ron";

/// Tunable casting settings
#[derive(Resource, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MagicSettings {
    /// Period of the central tick dispatcher in milliseconds
    pub tick_ms: u64,
    /// Channel time every spell pays before circle scaling
    pub base_channel_ms: u64,
    /// Extra channel time per circle
    pub channel_per_circle_ms: u64,
    /// Largest fraction of the channel time magery can remove
    pub max_skill_reduction: f32,
    /// Length of the post-channel target window in seconds
    pub target_window_secs: f32,
    /// Lifetime of an armed generic targeting request in seconds
    pub targeting_timeout_secs: f32,
    /// Distance from the channel anchor that counts as moving
    pub movement_threshold: f32,
    /// Collision radius used when raycasting for entities
    pub entity_hit_radius: f32,
    /// Maximum reach of target clicks
    pub max_target_distance: f32,
    /// Radius in which incantations are heard
    pub incantation_radius: f32,
    /// Distance a projectile advances per tick
    pub projectile_step: f32,
    /// Radius in which a projectile hits a living entity
    pub projectile_hit_radius: f32,
    /// Maximum projectile travel before it fizzles
    pub projectile_range: f32,
}

impl Default for MagicSettings {
    fn default() -> Self {
        Self {
            tick_ms: 100,
            base_channel_ms: 1000,
            channel_per_circle_ms: 500,
            max_skill_reduction: 0.3,
            target_window_secs: 5.0,
            targeting_timeout_secs: 10.0,
            movement_threshold: 0.5,
            entity_hit_radius: 1.2,
            max_target_distance: 20.0,
            incantation_radius: 15.0,
            projectile_step: 1.0,
            projectile_hit_radius: 0.8,
            projectile_range: 30.0,
        }
    }
}

impl MagicSettings {
    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(1))
    }

    pub fn target_window(&self) -> Duration {
        Duration::from_secs_f32(self.target_window_secs.max(0.0))
    }

    pub fn targeting_timeout(&self) -> Duration {
        Duration::from_secs_f32(self.targeting_timeout_secs.max(0.0))
    }

    /// Load settings from `path`, or return defaults if it is missing or invalid
    pub fn load(path: &Path) -> Self {
        if path.exists() {
            match fs::read_to_string(path) {
                Ok(contents) => match ron::from_str(&contents) {
                    Ok(settings) => {
                        info!("Loaded magic settings from {:?}", path);
                        settings
                    }
                    Err(e) => {
                        warn!("Failed to parse magic settings file: {}", e);
                        Self::default()
                    }
                },
                Err(e) => {
                    warn!("Failed to read magic settings file: {}", e);
                    Self::default()
                }
            }
        } else {
            info!("No magic settings file found, using defaults");
            Self::default()
        }
    }

    /// Save settings to `path`
    pub fn save(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let contents = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?;
        fs::write(path, contents)?;
        info!("Saved magic settings to {:?}", path);
        Ok(())
    }
}

/// Where the active settings were loaded from (and are saved back to)
#[derive(Resource, Clone, Debug)]
pub struct SettingsPath(pub PathBuf);

/// Plugin that loads [`MagicSettings`] and persists edits made at runtime
pub struct SettingsPlugin {
    pub path: PathBuf,
}

impl Default for SettingsPlugin {
    fn default() -> Self {
        Self {
            path: PathBuf::from(SETTINGS_FILE),
        }
    }
}

impl Plugin for SettingsPlugin {
    fn build(&self, app: &mut App) {
        let settings = MagicSettings::load(&self.path);
        app.insert_resource(settings)
            .insert_resource(SettingsPath(self.path.clone()))
            .add_systems(Update, save_settings_on_change);
    }
}

/// Save settings whenever something edits the resource
fn save_settings_on_change(settings: Res<MagicSettings>, path: Res<SettingsPath>) {
    if settings.is_changed() && !settings.is_added() {
        if let Err(e) = settings.save(&path.0) {
            error!("Failed to save magic settings: {}", e);
        }
    }
}
