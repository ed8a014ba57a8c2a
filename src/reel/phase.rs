//! Phase engine
//!
//! Maps a reel's local clock and motion state to a phase, then derives the
//! velocity for that phase. Position integration happens in `integrate`,
//! which is also where a terminal reel snaps onto its target.

use rand::Rng;

use super::easing::{clamp01, ease_out_cubic, ease_out_quad, lerp};
use super::state::{ReelPhase, ReelState, RunConfig};
use crate::consts::*;

/// Phase decision for a single tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseDescriptor {
    pub name: ReelPhase,
    /// Progress through the phase, in [0, 1]
    pub progress: f64,
    /// Remaining distance to the target (terminal runs only)
    pub distance_to_target: Option<f64>,
}

impl PhaseDescriptor {
    fn new(name: ReelPhase, progress: f64, distance_to_target: Option<f64>) -> Self {
        Self {
            name,
            progress: clamp01(progress),
            distance_to_target,
        }
    }
}

/// Distance needed to stop from `velocity` at a constant `deceleration`: v² / 2a
///
/// Infinite when the reel cannot decelerate at all.
pub fn stopping_distance(velocity: f64, deceleration: f64) -> f64 {
    if !(deceleration > 0.0) || !deceleration.is_finite() {
        return f64::INFINITY;
    }
    velocity * velocity / (2.0 * deceleration)
}

/// Braking law: v = sqrt(2 · a · d) with extra decay near the target
///
/// The result never exceeds `previous`, so braking only ever slows the reel.
pub fn braking_velocity(remaining: f64, deceleration: f64, previous: f64) -> f64 {
    let distance = remaining.max(BRAKE_DISTANCE_EPSILON);
    let mut v = (2.0 * deceleration.max(0.0) * distance).sqrt();
    if remaining < 50.0 {
        v *= BRAKE_DECAY_CLOSE;
    } else if remaining < 100.0 {
        v *= BRAKE_DECAY_NEAR;
    }
    v.max(MIN_APPROACH_SPEED).min(previous.max(0.0))
}

/// Decide the phase for a reel whose local clock reads `local_elapsed_ms`
pub fn determine_phase(
    local_elapsed_ms: f64,
    reel: &ReelState,
    config: &RunConfig,
    is_terminal: bool,
) -> PhaseDescriptor {
    if reel.is_stopped() {
        return PhaseDescriptor::new(ReelPhase::Stopped, 1.0, reel.remaining());
    }

    let local = local_elapsed_ms.max(0.0);

    if is_terminal {
        if let Some(remaining) = reel.remaining() {
            if remaining <= POSITION_EPSILON && reel.velocity <= SETTLE_VELOCITY_EPSILON {
                return PhaseDescriptor::new(ReelPhase::Stopped, 1.0, Some(remaining));
            }

            let already_braking = matches!(reel.phase, ReelPhase::Braking | ReelPhase::Settling);
            if already_braking
                || remaining <= stopping_distance(reel.velocity, config.deceleration)
            {
                let locked = reel.braking_distance_locked.unwrap_or(remaining);
                let progress = if locked > 0.0 {
                    1.0 - remaining / locked
                } else {
                    1.0
                };
                let name = if remaining <= SETTLE_DISTANCE {
                    ReelPhase::Settling
                } else {
                    ReelPhase::Braking
                };
                return PhaseDescriptor::new(name, progress, Some(remaining));
            }

            // The first tick past the window still reports Accelerating (progress
            // clamps to 1) so the reel enters Cruising at exactly cruise speed
            if reel.phase <= ReelPhase::Accelerating {
                return PhaseDescriptor::new(
                    ReelPhase::Accelerating,
                    acceleration_progress(local, config),
                    Some(remaining),
                );
            }

            let total = reel
                .target_position
                .map(|t| t - reel.run_start_position)
                .unwrap_or(0.0);
            let travelled = if total > 0.0 { 1.0 - remaining / total } else { 1.0 };
            return PhaseDescriptor::new(ReelPhase::Cruising, travelled, Some(remaining));
        }
    }

    // Intermediate run: free-running for a fixed local duration
    if local >= config.intermediate_duration_ms {
        return PhaseDescriptor::new(ReelPhase::Stopped, 1.0, None);
    }
    if reel.phase <= ReelPhase::Accelerating {
        return PhaseDescriptor::new(
            ReelPhase::Accelerating,
            acceleration_progress(local, config),
            None,
        );
    }
    let progress = if config.intermediate_duration_ms > 0.0 {
        local / config.intermediate_duration_ms
    } else {
        1.0
    };
    PhaseDescriptor::new(ReelPhase::Cruising, progress, None)
}

fn acceleration_progress(local: f64, config: &RunConfig) -> f64 {
    if config.acceleration_ms > 0.0 {
        local / config.acceleration_ms
    } else {
        1.0
    }
}

/// Apply the velocity law for `descriptor` and advance the reel's phase
pub fn update_velocity<R: Rng + ?Sized>(
    reel: &mut ReelState,
    descriptor: &PhaseDescriptor,
    config: &RunConfig,
    rng: &mut R,
) {
    let is_terminal = reel.target_position.is_some();

    match descriptor.name {
        ReelPhase::Idle => {}

        ReelPhase::Accelerating => {
            if descriptor.progress >= 1.0 {
                reel.velocity = config.cruise_speed;
                reel.advance_phase(ReelPhase::Cruising);
            } else {
                let eased = ease_out_quad(descriptor.progress);
                reel.velocity = lerp(reel.launch_velocity, config.cruise_speed, eased);
                reel.advance_phase(ReelPhase::Accelerating);
            }
        }

        ReelPhase::Cruising => {
            let jitter = if config.cruise_jitter > 0.0 {
                config.cruise_jitter * rng.random_range(-1.0..=1.0)
            } else {
                0.0
            };
            let mut target_speed = config.cruise_speed * (1.0 + jitter);

            // Cosmetic slowdown at the tail of an intermediate run
            if !is_terminal && config.intermediate_slowdown > 0.0 {
                let tail_start = 1.0 - config.intermediate_slowdown;
                if descriptor.progress > tail_start {
                    let q = (descriptor.progress - tail_start) / config.intermediate_slowdown;
                    target_speed *=
                        lerp(1.0, INTERMEDIATE_TAIL_SPEED_FRACTION, ease_out_cubic(q));
                }
            }

            reel.velocity += (target_speed - reel.velocity) * CRUISE_SMOOTHING;
            reel.advance_phase(ReelPhase::Cruising);
        }

        ReelPhase::Braking => {
            let remaining = descriptor.distance_to_target.unwrap_or(0.0);
            if reel.braking_distance_locked.is_none() {
                reel.braking_distance_locked = Some(remaining);
            }
            reel.velocity = braking_velocity(remaining, config.deceleration, reel.velocity);
            reel.advance_phase(ReelPhase::Braking);
        }

        ReelPhase::Settling => {
            let remaining = descriptor.distance_to_target.unwrap_or(0.0);
            if reel.braking_distance_locked.is_none() {
                reel.braking_distance_locked = Some(remaining);
            }
            reel.velocity = (remaining * SETTLE_GAIN).min(reel.velocity.max(0.0));
            reel.advance_phase(ReelPhase::Settling);
        }

        ReelPhase::Stopped => reel.settle(),
    }
}

/// Integrate position forward by `dt_ms`
///
/// The step is never negative and never carries a terminal reel past its
/// target; once the reel is close and slow enough it snaps exactly.
pub fn integrate(reel: &mut ReelState, dt_ms: f64) {
    if reel.is_stopped() || reel.phase == ReelPhase::Idle {
        return;
    }

    let mut step = (reel.velocity * dt_ms.max(0.0) / 1000.0).max(0.0);
    if let Some(remaining) = reel.remaining() {
        step = step.min(remaining);
    }
    reel.unwrapped_position += step;
    if reel.unwrapped_position.is_finite() {
        reel.last_valid_position = reel.unwrapped_position;
    }

    if let Some(remaining) = reel.remaining() {
        if remaining <= POSITION_EPSILON && reel.velocity <= SETTLE_VELOCITY_EPSILON {
            reel.settle();
        }
    }
}

/// One full engine step for a reel: phase, velocity, position
pub fn advance_reel<R: Rng + ?Sized>(
    reel: &mut ReelState,
    local_elapsed_ms: f64,
    dt_ms: f64,
    config: &RunConfig,
    rng: &mut R,
) -> PhaseDescriptor {
    let is_terminal = reel.target_position.is_some();
    let descriptor = determine_phase(local_elapsed_ms, reel, config, is_terminal);
    update_velocity(reel, &descriptor, config, rng);
    integrate(reel, dt_ms);
    descriptor
}
