//! Multi-spin lock-in sequence
//!
//! Runs `spins - 1` intermediate runs ("still randomizing") and then one
//! terminal run that lands on the winners, all against the same reels so the
//! strip never jumps between spins.

use std::collections::HashMap;

use super::coordinator::{Coordinator, RunHandle, RunStatus, RunSummary};
use super::state::{PositionMode, RunConfig};
use crate::error::SpinError;
use crate::{ReelId, SlotIndex};

/// Where a sequence currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceStatus {
    /// Not started yet
    Ready,
    /// Spin `spin` of `of` is running (1-based)
    Spinning { spin: u32, of: u32 },
    /// Waiting between spins
    Pausing,
    Finished,
}

pub struct SpinSequence {
    reels: Vec<ReelId>,
    winners: HashMap<ReelId, SlotIndex>,
    spins: u32,
    config: RunConfig,
    pause_ms: f64,
    completed_spins: u32,
    current: Option<RunHandle>,
    resume_at: Option<f64>,
    summary: Option<RunSummary>,
    status: SequenceStatus,
}

impl SpinSequence {
    /// `spins` is clamped to at least 1; the last spin is always terminal
    pub fn new(
        reels: Vec<ReelId>,
        winners: HashMap<ReelId, SlotIndex>,
        spins: u32,
        config: RunConfig,
        pause_ms: f64,
    ) -> Self {
        Self {
            reels,
            winners,
            spins: spins.max(1),
            config,
            pause_ms: if pause_ms.is_finite() { pause_ms.max(0.0) } else { 0.0 },
            completed_spins: 0,
            current: None,
            resume_at: None,
            summary: None,
            status: SequenceStatus::Ready,
        }
    }

    pub fn status(&self) -> SequenceStatus {
        self.status
    }

    /// Summary of the final run, once finished
    pub fn summary(&self) -> Option<&RunSummary> {
        self.summary.as_ref()
    }

    pub fn is_finished(&self) -> bool {
        self.status == SequenceStatus::Finished
    }

    /// Validate the winners and start the first spin
    pub fn start(&mut self, coordinator: &mut Coordinator, now_ms: f64) -> Result<(), SpinError> {
        if self.status != SequenceStatus::Ready {
            return Ok(());
        }
        self.check_winners(coordinator)?;
        self.start_spin(coordinator, now_ms)
    }

    /// Advance the coordinator and move between spins
    pub fn tick(&mut self, coordinator: &mut Coordinator, now_ms: f64) -> SequenceStatus {
        match self.status {
            SequenceStatus::Ready | SequenceStatus::Finished => {}

            SequenceStatus::Spinning { .. } => {
                if coordinator.tick(now_ms) == RunStatus::Completed {
                    self.on_spin_complete(coordinator, now_ms);
                }
            }

            SequenceStatus::Pausing => {
                let due = self.resume_at.is_none_or(|at| now_ms >= at);
                if due {
                    if let Err(err) = self.start_spin(coordinator, now_ms) {
                        log::error!("Spin sequence aborted: {err}");
                        self.status = SequenceStatus::Finished;
                    }
                }
            }
        }
        self.status
    }

    /// Jump straight to the final result: land every reel on its winner now
    pub fn skip_to_result(
        &mut self,
        coordinator: &mut Coordinator,
        now_ms: f64,
    ) -> Result<(), SpinError> {
        if self.is_finished() {
            return Ok(());
        }
        if let Some(handle) = self.current.take() {
            coordinator.force_stop(handle);
        }
        self.check_winners(coordinator)?;
        self.completed_spins = self.spins - 1;
        self.start_spin(coordinator, now_ms)?;
        if let Some(handle) = self.current {
            coordinator.force_stop(handle);
        }
        self.on_spin_complete(coordinator, now_ms);
        Ok(())
    }

    /// Stop wherever the reels are and end the sequence
    pub fn cancel(&mut self, coordinator: &mut Coordinator) {
        if let Some(handle) = self.current.take() {
            coordinator.force_stop(handle);
            self.summary = coordinator.last_summary().cloned();
        }
        self.status = SequenceStatus::Finished;
    }

    fn check_winners(&self, coordinator: &Coordinator) -> Result<(), SpinError> {
        for &id in &self.reels {
            let reel = coordinator.reel(id).ok_or(SpinError::UnknownReel(id))?;
            let slot = *self.winners.get(&id).ok_or(SpinError::MissingWinner(id))?;
            if slot >= reel.geometry.item_count {
                return Err(SpinError::SlotOutOfRange {
                    reel: id,
                    slot,
                    item_count: reel.geometry.item_count,
                });
            }
        }
        Ok(())
    }

    fn start_spin(&mut self, coordinator: &mut Coordinator, now_ms: f64) -> Result<(), SpinError> {
        let spin = self.completed_spins + 1;
        let terminal = spin == self.spins;

        let mut config = self.config.clone();
        config.seed = config.seed.wrapping_add(spin as u64);
        if spin > 1 {
            config.position_mode = PositionMode::Continue;
        }

        let winners = terminal.then_some(&self.winners);
        let handle = coordinator.start_run(&self.reels, config, winners, now_ms)?;
        log::debug!(
            "Spin {spin}/{} started ({})",
            self.spins,
            if terminal { "final" } else { "shuffle" }
        );

        self.current = Some(handle);
        self.resume_at = None;
        self.status = SequenceStatus::Spinning {
            spin,
            of: self.spins,
        };
        Ok(())
    }

    fn on_spin_complete(&mut self, coordinator: &Coordinator, now_ms: f64) {
        self.current = None;
        self.completed_spins += 1;
        if self.completed_spins >= self.spins {
            self.summary = coordinator.last_summary().cloned();
            self.status = SequenceStatus::Finished;
            log::info!("Spin sequence finished after {} spins", self.completed_spins);
        } else {
            self.resume_at = Some(now_ms + self.pause_ms);
            self.status = SequenceStatus::Pausing;
        }
    }
}
