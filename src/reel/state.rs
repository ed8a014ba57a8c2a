//! Reel state and per-run configuration
//!
//! A `ReelState` lives for as long as its column is on screen and is re-armed
//! by every run; `RunConfig` is supplied fresh for each run.

use serde::{Deserialize, Serialize};

use crate::error::SpinError;
use crate::{ReelId, SlotIndex, wrap_offset};

/// Motion phase of a single reel, in the only order it may advance
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ReelPhase {
    /// Waiting for its stagger delay (or no run yet)
    Idle,
    /// Ramping up to cruise speed
    Accelerating,
    /// Running at cruise speed
    Cruising,
    /// Physics-based approach to the target
    Braking,
    /// Final few pixels before the snap
    Settling,
    /// At rest
    Stopped,
}

impl ReelPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReelPhase::Idle => "idle",
            ReelPhase::Accelerating => "accelerating",
            ReelPhase::Cruising => "cruising",
            ReelPhase::Braking => "braking",
            ReelPhase::Settling => "settling",
            ReelPhase::Stopped => "stopped",
        }
    }
}

/// Strip layout of a reel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReelGeometry {
    /// Height of a single item (px)
    pub item_height: f64,
    /// Number of items in the strip
    pub item_count: u32,
}

impl ReelGeometry {
    pub fn new(item_height: f64, item_count: u32) -> Self {
        Self {
            item_height,
            item_count,
        }
    }

    /// Scroll distance of one full loop
    #[inline]
    pub fn cycle_length(&self) -> f64 {
        self.item_height * self.item_count as f64
    }

    /// Positive finite item height, at least one item, and a finite loop length
    pub fn is_valid(&self) -> bool {
        self.item_height.is_finite()
            && self.item_height > 0.0
            && self.item_count > 0
            && self.cycle_length().is_finite()
    }

    /// Slot resting at `reveal_offset` when the strip is scrolled to `offset`
    pub fn slot_at(&self, offset: f64, reveal_offset: f64) -> SlotIndex {
        if !self.is_valid() {
            return 0;
        }
        let cycle = self.cycle_length();
        let row = wrap_offset(offset + reveal_offset, cycle) / self.item_height;
        (row.round() as u64 % self.item_count as u64) as SlotIndex
    }
}

/// Whether a run keeps the unwrapped position from the previous run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PositionMode {
    /// Carry position forward (seamless multi-spin sequences)
    #[default]
    Continue,
    /// Start the run from position 0 (fresh single spin)
    Reset,
}

/// Tunables for one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Acceleration window (ms)
    pub acceleration_ms: f64,
    /// Launch speed floor (px/s)
    pub min_speed: f64,
    /// Cruise speed (px/s)
    pub cruise_speed: f64,
    /// Cruise jitter as a fraction of cruise speed
    pub cruise_jitter: f64,
    /// Braking deceleration (px/s²)
    pub deceleration: f64,
    /// Start delay per reel index (ms)
    pub stagger_ms: f64,
    /// Full loops every reel completes before landing
    pub min_extra_cycles: u32,
    /// Viewport offset of the reveal row (px)
    pub reveal_offset: f64,
    /// Local duration of an intermediate run (ms)
    pub intermediate_duration_ms: f64,
    /// Tail fraction of an intermediate run spent slowing down (0 disables)
    pub intermediate_slowdown: f64,
    /// Per-tick delta-time clamp (ms)
    pub max_dt_ms: f64,
    /// Wall-clock bound after which the run is forced to completion (ms)
    pub safety_timeout_ms: f64,
    pub position_mode: PositionMode,
    /// Blur intensity at cruise speed
    pub max_blur: f64,
    /// Jitter RNG seed
    pub seed: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            acceleration_ms: 500.0,
            min_speed: 400.0,
            cruise_speed: 3000.0,
            cruise_jitter: 0.08,
            deceleration: 4000.0,
            stagger_ms: 180.0,
            min_extra_cycles: 3,
            reveal_offset: 0.0,
            intermediate_duration_ms: 1200.0,
            intermediate_slowdown: 0.3,
            max_dt_ms: 50.0,
            safety_timeout_ms: 12_000.0,
            position_mode: PositionMode::Continue,
            max_blur: 6.0,
            seed: 0,
        }
    }
}

impl RunConfig {
    /// Reject values that would make the run meaningless
    ///
    /// A zero deceleration is accepted but freezes terminal reels: braking
    /// starts on the first tick with nothing to brake from, so the reels hold
    /// still until `safety_timeout_ms` snaps them onto their targets.
    pub fn validate(&self) -> Result<(), SpinError> {
        let non_negative = [
            ("acceleration_ms", self.acceleration_ms),
            ("min_speed", self.min_speed),
            ("cruise_jitter", self.cruise_jitter),
            ("deceleration", self.deceleration),
            ("stagger_ms", self.stagger_ms),
            ("reveal_offset", self.reveal_offset),
            ("intermediate_duration_ms", self.intermediate_duration_ms),
            ("intermediate_slowdown", self.intermediate_slowdown),
            ("max_blur", self.max_blur),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(SpinError::InvalidConfig(format!(
                    "{name} must be finite and non-negative, got {value}"
                )));
            }
        }

        let positive = [
            ("cruise_speed", self.cruise_speed),
            ("max_dt_ms", self.max_dt_ms),
            ("safety_timeout_ms", self.safety_timeout_ms),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(SpinError::InvalidConfig(format!(
                    "{name} must be finite and positive, got {value}"
                )));
            }
        }

        if self.cruise_jitter >= 1.0 {
            return Err(SpinError::InvalidConfig(format!(
                "cruise_jitter must be below 1, got {}",
                self.cruise_jitter
            )));
        }
        if self.intermediate_slowdown > 1.0 {
            return Err(SpinError::InvalidConfig(format!(
                "intermediate_slowdown must be at most 1, got {}",
                self.intermediate_slowdown
            )));
        }
        Ok(())
    }

    /// Stagger delay for the reel at `index` within the run
    #[inline]
    pub fn stagger_for(&self, index: usize) -> f64 {
        index as f64 * self.stagger_ms
    }
}

/// Mutable motion record of one reel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReelState {
    pub id: ReelId,
    /// Stagger key: position within the current run
    pub index: usize,
    pub geometry: ReelGeometry,
    /// Scroll distance since an arbitrary epoch; never decreases within a run
    pub unwrapped_position: f64,
    /// Current speed (px/s), never negative
    pub velocity: f64,
    pub phase: ReelPhase,
    /// Landing position for terminal runs
    pub target_position: Option<f64>,
    /// Remaining distance when braking began
    pub braking_distance_locked: Option<f64>,
    /// Velocity at which this run's acceleration starts
    pub launch_velocity: f64,
    /// Position at run start (for travelled-fraction progress)
    pub run_start_position: f64,
    /// Most recent finite position
    pub last_valid_position: f64,
}

impl ReelState {
    pub fn new(id: ReelId, index: usize, geometry: ReelGeometry) -> Self {
        Self {
            id,
            index,
            geometry,
            unwrapped_position: 0.0,
            velocity: 0.0,
            phase: ReelPhase::Idle,
            target_position: None,
            braking_distance_locked: None,
            launch_velocity: 0.0,
            run_start_position: 0.0,
            last_valid_position: 0.0,
        }
    }

    #[inline]
    pub fn cycle_length(&self) -> f64 {
        self.geometry.cycle_length()
    }

    /// Visible offset in [0, cycle_length)
    #[inline]
    pub fn visual_offset(&self) -> f64 {
        wrap_offset(self.unwrapped_position, self.cycle_length())
    }

    /// Distance left to the target (terminal runs only), never negative
    pub fn remaining(&self) -> Option<f64> {
        self.target_position
            .map(|target| (target - self.unwrapped_position).max(0.0))
    }

    #[inline]
    pub fn is_stopped(&self) -> bool {
        self.phase == ReelPhase::Stopped
    }

    /// Move to `next` if it does not go backward; returns whether the phase changed
    pub fn advance_phase(&mut self, next: ReelPhase) -> bool {
        if next < self.phase {
            log::warn!(
                "Reel {}: ignored phase regression {} -> {}",
                self.id,
                self.phase.as_str(),
                next.as_str()
            );
            return false;
        }
        if next != self.phase {
            log::debug!(
                "Reel {}: {} -> {}",
                self.id,
                self.phase.as_str(),
                next.as_str()
            );
            self.phase = next;
            return true;
        }
        false
    }

    /// Prepare for a new run
    pub fn arm(&mut self, config: &RunConfig) {
        if config.position_mode == PositionMode::Reset {
            self.unwrapped_position = 0.0;
            self.velocity = 0.0;
        }
        if !self.unwrapped_position.is_finite() {
            self.unwrapped_position = self.last_valid_position;
        }
        if !self.velocity.is_finite() || self.velocity < 0.0 {
            self.velocity = 0.0;
        }
        self.phase = ReelPhase::Idle;
        self.target_position = None;
        self.braking_distance_locked = None;
        self.launch_velocity = self.velocity.max(config.min_speed).min(config.cruise_speed);
        self.run_start_position = self.unwrapped_position;
        self.last_valid_position = self.unwrapped_position;
    }

    /// Snap to rest: on the target when there is one, otherwise in place
    pub fn settle(&mut self) {
        if let Some(target) = self.target_position.filter(|t| t.is_finite()) {
            // Never pull a reel backward past where it already is
            self.unwrapped_position = self.unwrapped_position.max(target);
        }
        self.velocity = 0.0;
        self.phase = ReelPhase::Stopped;
        self.last_valid_position = self.unwrapped_position;
    }

    /// Whether position and velocity are both finite
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.unwrapped_position.is_finite() && self.velocity.is_finite()
    }

    /// Recover from a non-finite position or velocity
    ///
    /// Falls back to the target, then the last finite position, then 0.
    pub fn recover(&mut self) {
        let fallback = self
            .target_position
            .filter(|t| t.is_finite())
            .or(Some(self.last_valid_position).filter(|p| p.is_finite()))
            .unwrap_or(0.0);
        self.unwrapped_position = fallback;
        self.velocity = 0.0;
        self.phase = ReelPhase::Stopped;
        self.last_valid_position = fallback;
    }
}
