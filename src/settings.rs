//! Spin settings and preferences
//!
//! Persisted in LocalStorage and turned into a `RunConfig` for each spin.

use serde::{Deserialize, Serialize};

use crate::reel::RunConfig;

/// Spin speed presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SpeedPreset {
    Relaxed,
    #[default]
    Normal,
    Turbo,
}

impl SpeedPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpeedPreset::Relaxed => "Relaxed",
            SpeedPreset::Normal => "Normal",
            SpeedPreset::Turbo => "Turbo",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "relaxed" | "slow" => Some(SpeedPreset::Relaxed),
            "normal" => Some(SpeedPreset::Normal),
            "turbo" | "fast" => Some(SpeedPreset::Turbo),
            _ => None,
        }
    }

    /// Cruise speed multiplier
    pub fn speed_scale(&self) -> f64 {
        match self {
            SpeedPreset::Relaxed => 0.75,
            SpeedPreset::Normal => 1.0,
            SpeedPreset::Turbo => 1.6,
        }
    }

    /// Duration multiplier for acceleration, stagger and shuffle spins
    pub fn time_scale(&self) -> f64 {
        match self {
            SpeedPreset::Relaxed => 1.3,
            SpeedPreset::Normal => 1.0,
            SpeedPreset::Turbo => 0.5,
        }
    }
}

/// Maximum spins in a lock-in sequence
pub const MAX_SPIN_COUNT: u32 = 5;

/// Spin settings/preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpinSettings {
    pub speed: SpeedPreset,
    /// Spins per reveal; all but the last are shuffle spins
    pub spin_count: u32,
    /// Pause between spins (ms)
    pub pause_between_spins_ms: f64,
    /// Row of the viewport where winners come to rest
    pub reveal_row: u32,
    /// Motion blur while spinning
    pub motion_blur: bool,
    /// Reduced motion (single spin, no blur)
    pub reduced_motion: bool,
}

impl Default for SpinSettings {
    fn default() -> Self {
        Self {
            speed: SpeedPreset::Normal,
            spin_count: 3,
            pause_between_spins_ms: 350.0,
            reveal_row: 1,
            motion_blur: true,
            reduced_motion: false,
        }
    }
}

impl SpinSettings {
    /// Create settings from a speed preset
    pub fn from_preset(preset: SpeedPreset) -> Self {
        Self {
            speed: preset,
            ..Self::default()
        }
    }

    /// Spins actually performed (respects reduced_motion)
    pub fn effective_spin_count(&self) -> u32 {
        if self.reduced_motion {
            1
        } else {
            self.spin_count.clamp(1, MAX_SPIN_COUNT)
        }
    }

    /// Effective motion blur (respects reduced_motion)
    pub fn effective_motion_blur(&self) -> bool {
        self.motion_blur && !self.reduced_motion
    }

    /// Build the run tunables for reels of `item_height`
    pub fn run_config(&self, item_height: f64, seed: u64) -> RunConfig {
        let base = RunConfig::default();
        let speed = self.speed.speed_scale();
        let time = self.speed.time_scale();

        RunConfig {
            acceleration_ms: base.acceleration_ms * time,
            cruise_speed: base.cruise_speed * speed,
            // Keep the braking distance proportional to cruise speed
            deceleration: base.deceleration * speed,
            stagger_ms: base.stagger_ms * time,
            intermediate_duration_ms: base.intermediate_duration_ms * time,
            reveal_offset: self.reveal_row as f64 * item_height.max(0.0),
            max_blur: if self.effective_motion_blur() {
                base.max_blur
            } else {
                0.0
            },
            min_extra_cycles: if self.reduced_motion { 1 } else { base.min_extra_cycles },
            seed,
            ..base
        }
    }

    /// LocalStorage key
    #[allow(dead_code)]
    const STORAGE_KEY: &'static str = "loadout_reels_settings";

    /// Load settings from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY) {
                if let Ok(settings) = serde_json::from_str(&json) {
                    log::info!("Loaded settings from LocalStorage");
                    return settings;
                }
            }
        }

        log::info!("Using default settings");
        Self::default()
    }

    /// Save settings to LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn save(&self) {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(json) = serde_json::to_string(self) {
                let _ = storage.set_item(Self::STORAGE_KEY, &json);
                log::info!("Settings saved");
            }
        }
    }

    /// Native stubs
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        Self::default()
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn save(&self) {
        // No-op for native
    }
}
