//! Recently revealed loadouts
//!
//! Persisted to LocalStorage, keeps the last 10 terminal runs (newest first).

use serde::{Deserialize, Serialize};

use crate::reel::RunSummary;
use crate::{ReelId, SlotIndex};

/// Maximum number of entries to keep
pub const MAX_HISTORY: usize = 10;

/// A single revealed loadout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Revealed slot per reel, ordered by reel id
    pub slots: Vec<(ReelId, SlotIndex)>,
    /// Unix timestamp (ms) of the reveal
    pub timestamp: f64,
    /// Whether the reels had to be forced to their result
    #[serde(default)]
    pub forced: bool,
}

/// Reveal history
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SpinHistory {
    pub entries: Vec<HistoryEntry>,
}

impl SpinHistory {
    /// LocalStorage key (used only in wasm32)
    #[allow(dead_code)]
    const STORAGE_KEY: &'static str = "loadout_reels_history";

    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Record a completed run; intermediate runs are ignored
    ///
    /// Returns whether an entry was added.
    pub fn record(&mut self, summary: &RunSummary, timestamp: f64) -> bool {
        if !summary.terminal {
            return false;
        }

        let mut slots: Vec<(ReelId, SlotIndex)> = summary
            .revealed_slots
            .iter()
            .map(|(&id, &slot)| (id, slot))
            .collect();
        slots.sort_by_key(|&(id, _)| id);

        self.entries.insert(
            0,
            HistoryEntry {
                slots,
                timestamp,
                forced: summary.forced || summary.timed_out,
            },
        );
        self.entries.truncate(MAX_HISTORY);
        true
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Most recent entry (if any)
    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.first()
    }

    /// How many of the kept entries revealed `slot` on `reel`
    pub fn times_revealed(&self, reel: ReelId, slot: SlotIndex) -> usize {
        self.entries
            .iter()
            .filter(|e| e.slots.contains(&(reel, slot)))
            .count()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Load history from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY) {
                if let Ok(history) = serde_json::from_str::<SpinHistory>(&json) {
                    log::info!("Loaded {} history entries", history.entries.len());
                    return history;
                }
            }
        }

        log::info!("No history found, starting fresh");
        Self::new()
    }

    /// Save history to LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn save(&self) {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(json) = serde_json::to_string(self) {
                let _ = storage.set_item(Self::STORAGE_KEY, &json);
                log::info!("History saved ({} entries)", self.entries.len());
            }
        }
    }

    /// Native stubs
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        Self::new()
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn save(&self) {
        // No-op for native
    }
}

/// Format a timestamp as a relative date string
#[cfg(target_arch = "wasm32")]
pub fn format_age(timestamp: f64) -> String {
    let mins = ((js_sys::Date::now() - timestamp) / 60_000.0).max(0.0);
    let hours = mins / 60.0;
    let days = hours / 24.0;

    if days >= 1.0 {
        let days = days.floor() as i32;
        if days == 1 {
            "Yesterday".to_string()
        } else {
            format!("{} days ago", days)
        }
    } else if hours >= 1.0 {
        format!("{}h ago", hours.floor() as i32)
    } else if mins >= 1.0 {
        format!("{}m ago", mins.floor() as i32)
    } else {
        "Just now".to_string()
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub fn format_age(_timestamp: f64) -> String {
    "N/A".to_string()
}
