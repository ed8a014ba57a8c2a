//! Target resolver
//!
//! Finds the landing position for a terminal run: far enough ahead that the
//! reel visibly loops, strictly forward of where it is, and wrapping onto the
//! offset that puts the winning slot in the reveal row.

use std::collections::HashMap;

use super::state::{ReelGeometry, ReelState, RunConfig};
use crate::error::SpinError;
use crate::{ReelId, SlotIndex, wrap_offset};

/// Wrapped offset at which `slot` sits in the reveal row
pub fn winner_remainder(slot: SlotIndex, geometry: &ReelGeometry, reveal_offset: f64) -> f64 {
    wrap_offset(
        slot as f64 * geometry.item_height - reveal_offset,
        geometry.cycle_length(),
    )
}

/// First position at least `min_extra_cycles` loops past `current` whose
/// wrapped offset is `desired_remainder`
///
/// The result is always strictly greater than `current`. `cycle_length` must
/// be positive and finite; callers validate geometry first.
pub fn resolve_target(
    current: f64,
    desired_remainder: f64,
    cycle_length: f64,
    min_extra_cycles: u32,
) -> f64 {
    let baseline = current + min_extra_cycles as f64 * cycle_length;
    let mut adjustment = desired_remainder - wrap_offset(baseline, cycle_length);
    if adjustment < 0.0 {
        adjustment += cycle_length;
    }
    if adjustment >= cycle_length {
        adjustment -= cycle_length;
    }

    let mut target = baseline + adjustment;
    if target <= current {
        target += cycle_length;
    }
    target
}

/// Common starting point for reels that must land together
pub fn shared_baseline(reels: &[&ReelState]) -> f64 {
    if reels.is_empty() {
        return 0.0;
    }
    let sum: f64 = reels.iter().map(|r| r.unwrapped_position).sum();
    sum / reels.len() as f64
}

/// Validate a winner against its reel and resolve the landing position from `baseline`
pub fn resolve_landing(
    reel: &ReelState,
    slot: SlotIndex,
    baseline: f64,
    config: &RunConfig,
) -> Result<f64, SpinError> {
    if !reel.geometry.is_valid() {
        return Err(SpinError::InvalidGeometry {
            reel: reel.id,
            item_height: reel.geometry.item_height,
            item_count: reel.geometry.item_count,
        });
    }
    if slot >= reel.geometry.item_count {
        return Err(SpinError::SlotOutOfRange {
            reel: reel.id,
            slot,
            item_count: reel.geometry.item_count,
        });
    }

    let cycle = reel.cycle_length();
    let desired = winner_remainder(slot, &reel.geometry, config.reveal_offset);
    let mut target = resolve_target(baseline, desired, cycle, config.min_extra_cycles);

    // A reel ahead of the baseline still owes its full loops; whole cycles keep the alignment
    let required = reel.unwrapped_position + config.min_extra_cycles as f64 * cycle;
    if target < required || target <= reel.unwrapped_position {
        let deficit = (required - target).max(0.0);
        let cycles = (deficit / cycle).ceil().max(1.0);
        target += cycles * cycle;
    }
    Ok(target)
}

/// Resolve every reel of a terminal run from one shared baseline
pub fn resolve_targets(
    reels: &[&ReelState],
    winners: &HashMap<ReelId, SlotIndex>,
    config: &RunConfig,
) -> Result<HashMap<ReelId, f64>, SpinError> {
    let baseline = shared_baseline(reels);
    let mut targets = HashMap::with_capacity(reels.len());
    for reel in reels {
        let slot = *winners
            .get(&reel.id)
            .ok_or(SpinError::MissingWinner(reel.id))?;
        let target = resolve_landing(reel, slot, baseline, config)?;
        targets.insert(reel.id, target);
    }
    Ok(targets)
}
