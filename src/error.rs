//! Input errors rejected at run start
//!
//! Numeric corruption and timeouts are not errors: they degrade to a valid
//! stopped state and are reported in the run summary instead.

use crate::{ReelId, SlotIndex};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SpinError {
    #[error("reel {0} is not registered")]
    UnknownReel(ReelId),

    #[error("a run needs at least one reel")]
    EmptyRun,

    #[error("reel {reel} has invalid geometry ({item_count} items of {item_height}px)")]
    InvalidGeometry {
        reel: ReelId,
        item_height: f64,
        item_count: u32,
    },

    #[error("winner slot {slot} is out of range for reel {reel} ({item_count} items)")]
    SlotOutOfRange {
        reel: ReelId,
        slot: SlotIndex,
        item_count: u32,
    },

    #[error("terminal run has no winner for reel {0}")]
    MissingWinner(ReelId),

    #[error("winner given for reel {0}, which is not part of the run")]
    UnexpectedWinner(ReelId),

    #[error("invalid run config: {0}")]
    InvalidConfig(String),

    #[error("run {0} is still in progress")]
    RunInProgress(u64),
}
