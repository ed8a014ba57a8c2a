//! Loadout Reels - slot-style reel animation engine
//!
//! Core modules:
//! - `reel`: Reel physics (phase engine, target resolver, frame coordinator)
//! - `render`: Render adapter contract and the DOM implementation
//! - `settings`: User-facing spin preferences
//! - `history`: Recently revealed loadouts

pub mod error;
pub mod history;
pub mod reel;
pub mod render;
pub mod settings;

pub use error::SpinError;
pub use history::SpinHistory;
pub use settings::{SpeedPreset, SpinSettings};

/// Identifies a reel (column) registered with the coordinator
pub type ReelId = u32;

/// Index of an item within a reel's strip
pub type SlotIndex = u32;

/// Engine constants
pub mod consts {
    /// Position tolerance (px) for considering a reel landed on its target
    pub const POSITION_EPSILON: f64 = 0.5;
    /// Velocity (px/s) at or below which a reel may come to rest
    pub const SETTLE_VELOCITY_EPSILON: f64 = 10.0;
    /// Remaining distance (px) below which braking hands over to settling
    pub const SETTLE_DISTANCE: f64 = 10.0;
    /// Settling approach rate (1/s): velocity = remaining * gain
    pub const SETTLE_GAIN: f64 = 12.0;
    /// Floor for braking velocity so the approach never stalls
    pub const MIN_APPROACH_SPEED: f64 = 24.0;
    /// Smallest distance fed into the braking law
    pub const BRAKE_DISTANCE_EPSILON: f64 = 0.01;

    /// Braking decay under 100 px remaining
    pub const BRAKE_DECAY_NEAR: f64 = 0.92;
    /// Braking decay under 50 px remaining
    pub const BRAKE_DECAY_CLOSE: f64 = 0.85;

    /// Cruise velocity smoothing per tick toward the jittered target
    pub const CRUISE_SMOOTHING: f64 = 0.2;
    /// Speed fraction reached at the end of an intermediate run's cosmetic slowdown
    pub const INTERMEDIATE_TAIL_SPEED_FRACTION: f64 = 0.35;

    /// Frame time used by the native demo (60 Hz)
    pub const DEMO_FRAME_MS: f64 = 1000.0 / 60.0;
}

/// Wrap an unwrapped position into the visible offset range [0, cycle)
#[inline]
pub fn wrap_offset(position: f64, cycle: f64) -> f64 {
    if !(cycle > 0.0) || !cycle.is_finite() || !position.is_finite() {
        return 0.0;
    }
    let wrapped = position.rem_euclid(cycle);
    // rem_euclid can round up to exactly `cycle` for tiny negative inputs
    if wrapped >= cycle { 0.0 } else { wrapped }
}

/// Shortest distance between two offsets on a loop of length `cycle`
#[inline]
pub fn circular_distance(a: f64, b: f64, cycle: f64) -> f64 {
    let d = wrap_offset(a - b, cycle);
    d.min(cycle - d)
}
