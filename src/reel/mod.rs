//! Reel motion engine
//!
//! All motion logic lives here. It never touches the DOM or the clock:
//! - Time arrives as explicit millisecond timestamps
//! - Jitter comes from a seeded RNG only
//! - Positions only ever move forward within a run

pub mod coordinator;
pub mod easing;
pub mod phase;
pub mod sequence;
pub mod state;
pub mod target;

pub use coordinator::{Coordinator, RunHandle, RunStatus, RunSummary, TickFrame};
pub use phase::{PhaseDescriptor, advance_reel, determine_phase, integrate, update_velocity};
pub use sequence::{SequenceStatus, SpinSequence};
pub use state::{PositionMode, ReelGeometry, ReelPhase, ReelState, RunConfig};
pub use target::{
    resolve_landing, resolve_target, resolve_targets, shared_baseline, winner_remainder,
};
