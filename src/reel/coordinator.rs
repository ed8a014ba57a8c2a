//! Animation coordinator
//!
//! Owns every reel and drives one run at a time from host animation frames.
//! A run is `NotStarted → Running → Completed`; completion happens when all
//! reels stop, when the safety timeout fires, or on `force_stop`.

use std::collections::{HashMap, HashSet};

use rand::SeedableRng;
use rand_pcg::Pcg32;

use super::phase::advance_reel;
use super::state::{ReelGeometry, ReelPhase, ReelState, RunConfig};
use super::target::resolve_targets;
use crate::error::SpinError;
use crate::render::{RenderAdapter, blur_intensity};
use crate::{ReelId, SlotIndex};

/// Lifecycle of the current (or most recent) run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    NotStarted,
    Running,
    Completed,
}

/// Identifies a started run; used for cancellation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunHandle {
    pub run_id: u64,
}

/// Per-reel visual update emitted each tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickFrame {
    pub reel_id: ReelId,
    /// Wrapped offset in [0, cycle_length)
    pub offset: f64,
    pub velocity: f64,
    pub phase: ReelPhase,
}

/// Outcome of a completed run
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub run_id: u64,
    /// Whether the run had fixed landing positions
    pub terminal: bool,
    pub final_offsets: HashMap<ReelId, f64>,
    /// Slot resting in the reveal row of each reel
    pub revealed_slots: HashMap<ReelId, SlotIndex>,
    /// Safety timeout forced the remaining reels
    pub timed_out: bool,
    /// `force_stop` ended the run
    pub forced: bool,
    /// Reels recovered from non-finite motion
    pub corrupted_reels: Vec<ReelId>,
    /// Wall-clock duration of the run (ms)
    pub duration_ms: f64,
}

struct ActiveRun {
    id: u64,
    /// Reels in stagger order
    reels: Vec<ReelId>,
    config: RunConfig,
    terminal: bool,
    started_at: f64,
    last_tick: f64,
    rng: Pcg32,
    corrupted: Vec<ReelId>,
}

type TickListener = Box<dyn FnMut(&TickFrame)>;
type CompleteListener = Box<dyn FnMut(&RunSummary)>;

/// Drives reel runs one frame at a time
pub struct Coordinator {
    reels: Vec<ReelState>,
    run: Option<ActiveRun>,
    status: RunStatus,
    last_summary: Option<RunSummary>,
    next_run_id: u64,
    renderer: Option<Box<dyn RenderAdapter>>,
    tick_listeners: Vec<TickListener>,
    complete_listeners: Vec<CompleteListener>,
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl Coordinator {
    pub fn new() -> Self {
        Self {
            reels: Vec::new(),
            run: None,
            status: RunStatus::NotStarted,
            last_summary: None,
            next_run_id: 1,
            renderer: None,
            tick_listeners: Vec::new(),
            complete_listeners: Vec::new(),
        }
    }

    /// Register a reel, or replace the geometry of an existing one
    ///
    /// Geometry is validated when a run starts, not here.
    pub fn insert_reel(&mut self, id: ReelId, geometry: ReelGeometry) -> Result<(), SpinError> {
        if let Some(run) = &self.run {
            if run.reels.contains(&id) {
                return Err(SpinError::RunInProgress(run.id));
            }
        }
        if let Some(reel) = self.reels.iter_mut().find(|r| r.id == id) {
            reel.geometry = geometry;
        } else {
            let index = self.reels.len();
            self.reels.push(ReelState::new(id, index, geometry));
        }
        Ok(())
    }

    pub fn set_render_adapter(&mut self, renderer: Box<dyn RenderAdapter>) {
        self.renderer = Some(renderer);
    }

    /// Subscribe to per-reel frame updates
    pub fn on_tick(&mut self, listener: impl FnMut(&TickFrame) + 'static) {
        self.tick_listeners.push(Box::new(listener));
    }

    /// Subscribe to run completion; called exactly once per run
    pub fn on_complete(&mut self, listener: impl FnMut(&RunSummary) + 'static) {
        self.complete_listeners.push(Box::new(listener));
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn is_running(&self) -> bool {
        self.status == RunStatus::Running
    }

    /// Handle of the run in progress
    pub fn active_handle(&self) -> Option<RunHandle> {
        self.run.as_ref().map(|run| RunHandle { run_id: run.id })
    }

    pub fn last_summary(&self) -> Option<&RunSummary> {
        self.last_summary.as_ref()
    }

    pub fn reel(&self, id: ReelId) -> Option<&ReelState> {
        self.reels.iter().find(|r| r.id == id)
    }

    pub fn reels(&self) -> &[ReelState] {
        &self.reels
    }

    /// Start a run over `reel_ids` (in stagger order)
    ///
    /// `winners = None` starts an intermediate run with no fixed landing.
    /// Nothing changes when the input is rejected.
    pub fn start_run(
        &mut self,
        reel_ids: &[ReelId],
        config: RunConfig,
        winners: Option<&HashMap<ReelId, SlotIndex>>,
        now_ms: f64,
    ) -> Result<RunHandle, SpinError> {
        if let Some(run) = &self.run {
            return Err(SpinError::RunInProgress(run.id));
        }
        config.validate()?;
        if !now_ms.is_finite() {
            return Err(SpinError::InvalidConfig(format!(
                "start time must be finite, got {now_ms}"
            )));
        }
        if reel_ids.is_empty() {
            return Err(SpinError::EmptyRun);
        }

        let mut seen = HashSet::with_capacity(reel_ids.len());
        let mut armed = Vec::with_capacity(reel_ids.len());
        for (order, &id) in reel_ids.iter().enumerate() {
            if !seen.insert(id) {
                return Err(SpinError::InvalidConfig(format!("reel {id} listed twice")));
            }
            let reel = self
                .reels
                .iter()
                .find(|r| r.id == id)
                .ok_or(SpinError::UnknownReel(id))?;
            if !reel.geometry.is_valid() {
                return Err(SpinError::InvalidGeometry {
                    reel: id,
                    item_height: reel.geometry.item_height,
                    item_count: reel.geometry.item_count,
                });
            }
            let mut reel = reel.clone();
            reel.index = order;
            reel.arm(&config);
            armed.push(reel);
        }

        if let Some(winners) = winners {
            if let Some(stray) = winners.keys().find(|id| !seen.contains(*id)) {
                return Err(SpinError::UnexpectedWinner(*stray));
            }
            let refs: Vec<&ReelState> = armed.iter().collect();
            let targets = resolve_targets(&refs, winners, &config)?;
            for reel in &mut armed {
                reel.target_position = targets.get(&reel.id).copied();
            }
        }

        let run_id = self.next_run_id;
        self.next_run_id += 1;

        // Input is valid: commit the armed reels
        for reel in armed {
            if let Some(slot) = self.reels.iter_mut().find(|r| r.id == reel.id) {
                *slot = reel;
            }
        }

        let terminal = winners.is_some();
        log::info!(
            "Run {} started: {} reels, {}",
            run_id,
            reel_ids.len(),
            if terminal { "terminal" } else { "intermediate" }
        );

        self.run = Some(ActiveRun {
            id: run_id,
            reels: reel_ids.to_vec(),
            rng: Pcg32::seed_from_u64(config.seed.wrapping_add(run_id)),
            config,
            terminal,
            started_at: now_ms,
            last_tick: now_ms,
            corrupted: Vec::new(),
        });
        self.status = RunStatus::Running;
        self.emit_frames(reel_ids);

        Ok(RunHandle { run_id })
    }

    /// Advance the active run to `now_ms`
    pub fn tick(&mut self, now_ms: f64) -> RunStatus {
        let Some(run) = self.run.as_mut() else {
            return self.status;
        };

        let dt = if now_ms.is_finite() {
            (now_ms - run.last_tick).clamp(0.0, run.config.max_dt_ms)
        } else {
            0.0
        };
        if now_ms.is_finite() && now_ms > run.last_tick {
            run.last_tick = now_ms;
        }
        let elapsed = run.last_tick - run.started_at;

        if elapsed >= run.config.safety_timeout_ms {
            log::warn!(
                "Run {} hit the {}ms safety timeout; forcing remaining reels",
                run.id,
                run.config.safety_timeout_ms
            );
            self.finish(true, false);
            return self.status;
        }

        let mut moved = Vec::with_capacity(run.reels.len());
        for &id in &run.reels {
            let Some(reel) = self.reels.iter_mut().find(|r| r.id == id) else {
                continue;
            };
            if reel.is_stopped() {
                continue;
            }
            let stagger = run.config.stagger_for(reel.index);
            if elapsed < stagger {
                continue;
            }

            if reel.is_finite() {
                advance_reel(reel, elapsed - stagger, dt, &run.config, &mut run.rng);
            }
            if !reel.is_finite() {
                log::error!(
                    "Reel {} produced non-finite motion (position {}, velocity {}); forcing stop",
                    reel.id,
                    reel.unwrapped_position,
                    reel.velocity
                );
                reel.recover();
                run.corrupted.push(id);
            }
            moved.push(id);
        }

        let all_stopped = run.reels.iter().all(|id| {
            self.reels
                .iter()
                .find(|r| r.id == *id)
                .is_none_or(|r| r.is_stopped())
        });

        self.emit_frames(&moved);

        if all_stopped {
            self.finish(false, false);
        }
        self.status
    }

    /// Cancel a run, snapping every reel to rest
    ///
    /// Terminal reels snap onto their targets. Safe to call repeatedly or with
    /// a stale handle; returns whether this call ended the run.
    pub fn force_stop(&mut self, handle: RunHandle) -> bool {
        match &self.run {
            Some(run) if run.id == handle.run_id => {
                log::info!("Run {} force-stopped", run.id);
                self.finish(false, true);
                true
            }
            _ => false,
        }
    }

    /// Settle every reel of the active run and publish the summary
    fn finish(&mut self, timed_out: bool, forced: bool) {
        let Some(run) = self.run.take() else {
            return;
        };

        let mut snapped = Vec::new();
        for &id in &run.reels {
            if let Some(reel) = self.reels.iter_mut().find(|r| r.id == id) {
                if !reel.is_stopped() {
                    reel.settle();
                    snapped.push(id);
                }
            }
        }
        self.emit_frames_with(&snapped, &run.config);

        let mut final_offsets = HashMap::with_capacity(run.reels.len());
        let mut revealed_slots = HashMap::with_capacity(run.reels.len());
        for &id in &run.reels {
            if let Some(reel) = self.reels.iter().find(|r| r.id == id) {
                let offset = reel.visual_offset();
                final_offsets.insert(id, offset);
                revealed_slots.insert(id, reel.geometry.slot_at(offset, run.config.reveal_offset));
            }
        }

        let summary = RunSummary {
            run_id: run.id,
            terminal: run.terminal,
            final_offsets,
            revealed_slots,
            timed_out,
            forced,
            corrupted_reels: run.corrupted,
            duration_ms: run.last_tick - run.started_at,
        };
        log::info!(
            "Run {} completed in {:.0}ms{}",
            summary.run_id,
            summary.duration_ms,
            if timed_out { " (timed out)" } else { "" }
        );

        self.status = RunStatus::Completed;
        for listener in &mut self.complete_listeners {
            listener(&summary);
        }
        self.last_summary = Some(summary);
    }

    fn emit_frames(&mut self, ids: &[ReelId]) {
        let Some(config) = self.run.as_ref().map(|run| run.config.clone()) else {
            return;
        };
        self.emit_frames_with(ids, &config);
    }

    fn emit_frames_with(&mut self, ids: &[ReelId], config: &RunConfig) {
        for &id in ids {
            let Some(reel) = self.reels.iter().find(|r| r.id == id) else {
                continue;
            };
            let frame = TickFrame {
                reel_id: id,
                offset: reel.visual_offset(),
                velocity: reel.velocity,
                phase: reel.phase,
            };
            if let Some(renderer) = self.renderer.as_mut() {
                let blur = blur_intensity(frame.velocity, config.cruise_speed, config.max_blur);
                renderer.set_offset(id, frame.offset, blur);
            }
            for listener in &mut self.tick_listeners {
                listener(&frame);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circular_distance;
    use crate::reel::state::PositionMode;
    use crate::reel::target::winner_remainder;
    use proptest::prelude::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    const FRAME: f64 = 1000.0 / 60.0;

    fn coordinator(count: u32, geometry: ReelGeometry) -> Coordinator {
        let mut c = Coordinator::new();
        for id in 0..count {
            c.insert_reel(id, geometry).unwrap();
        }
        c
    }

    fn winners(slots: &[SlotIndex]) -> HashMap<ReelId, SlotIndex> {
        slots
            .iter()
            .enumerate()
            .map(|(id, &slot)| (id as ReelId, slot))
            .collect()
    }

    /// Tick at a fixed frame time until the run completes; returns the end time
    fn run_to_completion(c: &mut Coordinator, start: f64, dt: f64) -> f64 {
        let mut now = start;
        for _ in 0..100_000 {
            now += dt;
            if c.tick(now) == RunStatus::Completed {
                return now;
            }
        }
        panic!("run never completed");
    }

    #[test]
    fn test_terminal_run_lands_on_winners() {
        let geometry = ReelGeometry::new(80.0, 41);
        let mut c = coordinator(3, geometry);
        let config = RunConfig {
            reveal_offset: 80.0,
            ..Default::default()
        };
        let w = winners(&[20, 5, 40]);
        c.start_run(&[0, 1, 2], config.clone(), Some(&w), 0.0).unwrap();
        assert_eq!(c.status(), RunStatus::Running);

        run_to_completion(&mut c, 0.0, FRAME);

        let summary = c.last_summary().unwrap();
        assert!(summary.terminal);
        assert!(!summary.timed_out);
        assert!(!summary.forced);
        assert_eq!(summary.revealed_slots, w);
        for (&id, &slot) in &w {
            let expected = winner_remainder(slot, &geometry, config.reveal_offset);
            let offset = summary.final_offsets[&id];
            assert!(circular_distance(offset, expected, geometry.cycle_length()) <= 1.0);
            let reel = c.reel(id).unwrap();
            assert!(reel.is_stopped());
            assert_eq!(reel.velocity, 0.0);
            assert_eq!(Some(reel.unwrapped_position), reel.target_position);
        }
    }

    #[test]
    fn test_positions_never_decrease() {
        let mut c = coordinator(4, ReelGeometry::new(64.0, 30));
        let w = winners(&[1, 2, 3, 29]);
        c.start_run(&[0, 1, 2, 3], RunConfig::default(), Some(&w), 1000.0)
            .unwrap();

        let mut last: Vec<f64> = c.reels().iter().map(|r| r.unwrapped_position).collect();
        let mut now = 1000.0;
        // Uneven frame pacing, including a stall and a backward clock
        let pacing = [16.0, 33.0, 7.0, 250.0, 16.0, -5.0, 16.0, 1.0];
        let mut i = 0;
        while c.tick(now) == RunStatus::Running {
            for (reel, prev) in c.reels().iter().zip(last.iter_mut()) {
                assert!(reel.unwrapped_position >= *prev);
                assert!(reel.velocity >= 0.0);
                *prev = reel.unwrapped_position;
            }
            now += pacing[i % pacing.len()];
            i += 1;
            assert!(i < 100_000);
        }
    }

    #[test]
    fn test_stagger_holds_later_reels() {
        let mut c = coordinator(3, ReelGeometry::new(80.0, 20));
        let config = RunConfig {
            stagger_ms: 200.0,
            ..Default::default()
        };
        c.start_run(&[0, 1, 2], config, Some(&winners(&[0, 0, 0])), 0.0)
            .unwrap();
        c.tick(100.0);
        assert!(c.reel(0).unwrap().unwrapped_position > 0.0);
        assert_eq!(c.reel(1).unwrap().phase, ReelPhase::Idle);
        assert_eq!(c.reel(2).unwrap().unwrapped_position, 0.0);

        c.tick(150.0);
        c.tick(200.0);
        c.tick(216.0);
        assert_ne!(c.reel(1).unwrap().phase, ReelPhase::Idle);
        assert_eq!(c.reel(2).unwrap().phase, ReelPhase::Idle);
    }

    #[test]
    fn test_reels_lock_in_order() {
        let mut c = coordinator(3, ReelGeometry::new(80.0, 24));
        let config = RunConfig {
            cruise_jitter: 0.0,
            ..Default::default()
        };
        c.start_run(&[0, 1, 2], config, Some(&winners(&[3, 3, 3])), 0.0)
            .unwrap();

        let mut stopped_at: HashMap<ReelId, f64> = HashMap::new();
        let mut now = 0.0;
        while c.status() == RunStatus::Running {
            now += FRAME;
            c.tick(now);
            for reel in c.reels() {
                if reel.is_stopped() {
                    stopped_at.entry(reel.id).or_insert(now);
                }
            }
        }
        assert!(stopped_at[&0] < stopped_at[&1]);
        assert!(stopped_at[&1] < stopped_at[&2]);
    }

    #[test]
    fn test_intermediate_run_stops_anywhere() {
        let mut c = coordinator(2, ReelGeometry::new(80.0, 41));
        let config = RunConfig::default();
        c.start_run(&[0, 1], config.clone(), None, 0.0).unwrap();
        let end = run_to_completion(&mut c, 0.0, FRAME);

        let summary = c.last_summary().unwrap();
        assert!(!summary.terminal);
        assert!(!summary.timed_out);
        // Last reel starts one stagger late and runs for the full duration
        assert!(end >= config.intermediate_duration_ms + config.stagger_ms);
        for reel in c.reels() {
            assert!(reel.is_stopped());
            assert_eq!(reel.velocity, 0.0);
            assert!(reel.target_position.is_none());
            assert!(reel.unwrapped_position > 0.0);
        }
    }

    #[test]
    fn test_start_run_rejects_bad_input() {
        let mut c = coordinator(2, ReelGeometry::new(80.0, 10));
        c.insert_reel(9, ReelGeometry::new(-1.0, 10)).unwrap();
        let config = RunConfig::default();

        assert_eq!(
            c.start_run(&[], config.clone(), None, 0.0),
            Err(SpinError::EmptyRun)
        );
        assert_eq!(
            c.start_run(&[5], config.clone(), None, 0.0),
            Err(SpinError::UnknownReel(5))
        );
        assert!(matches!(
            c.start_run(&[9], config.clone(), None, 0.0),
            Err(SpinError::InvalidGeometry { reel: 9, .. })
        ));
        assert!(matches!(
            c.start_run(&[0, 0], config.clone(), None, 0.0),
            Err(SpinError::InvalidConfig(_))
        ));
        assert!(matches!(
            c.start_run(&[0], config.clone(), Some(&winners(&[10])), 0.0),
            Err(SpinError::SlotOutOfRange { reel: 0, slot: 10, .. })
        ));
        assert_eq!(
            c.start_run(&[0], config.clone(), Some(&winners(&[1, 1])), 0.0),
            Err(SpinError::UnexpectedWinner(1))
        );
        assert_eq!(
            c.start_run(&[0, 1], config.clone(), Some(&winners(&[1])), 0.0),
            Err(SpinError::MissingWinner(1))
        );
        c.insert_reel(8, ReelGeometry::new(1e300, u32::MAX)).unwrap();
        let huge_winner: HashMap<ReelId, SlotIndex> = [(8, 7)].into_iter().collect();
        assert!(matches!(
            c.start_run(&[8], config.clone(), Some(&huge_winner), 0.0),
            Err(SpinError::InvalidGeometry { reel: 8, .. })
        ));
        let bad = RunConfig {
            cruise_speed: f64::NAN,
            ..Default::default()
        };
        assert!(c.start_run(&[0], bad, None, 0.0).is_err());

        // Nothing started
        assert_eq!(c.status(), RunStatus::NotStarted);
        assert_eq!(c.reel(0).unwrap().phase, ReelPhase::Idle);

        let handle = c.start_run(&[0, 1], config.clone(), None, 0.0).unwrap();
        assert_eq!(
            c.start_run(&[0, 1], config, None, 10.0),
            Err(SpinError::RunInProgress(handle.run_id))
        );
        assert_eq!(
            c.insert_reel(0, ReelGeometry::new(10.0, 10)),
            Err(SpinError::RunInProgress(handle.run_id))
        );
    }

    #[test]
    fn test_force_stop_is_idempotent() {
        let geometry = ReelGeometry::new(80.0, 41);
        let mut c = coordinator(3, geometry);
        let completions = Rc::new(RefCell::new(0));
        let counter = completions.clone();
        c.on_complete(move |_| *counter.borrow_mut() += 1);

        let w = winners(&[7, 8, 9]);
        let handle = c
            .start_run(&[0, 1, 2], RunConfig::default(), Some(&w), 0.0)
            .unwrap();
        for i in 1..20 {
            c.tick(i as f64 * FRAME);
        }

        assert!(c.force_stop(handle));
        let once: Vec<(f64, f64, ReelPhase)> = c
            .reels()
            .iter()
            .map(|r| (r.unwrapped_position, r.velocity, r.phase))
            .collect();
        let summary = c.last_summary().unwrap().clone();

        assert!(!c.force_stop(handle));
        let twice: Vec<(f64, f64, ReelPhase)> = c
            .reels()
            .iter()
            .map(|r| (r.unwrapped_position, r.velocity, r.phase))
            .collect();

        assert_eq!(once, twice);
        assert_eq!(c.last_summary(), Some(&summary));
        assert_eq!(*completions.borrow(), 1);
        assert!(summary.forced);
        assert_eq!(summary.revealed_slots, w);
        assert_eq!(c.status(), RunStatus::Completed);
        // Ticking a completed run is a no-op
        assert_eq!(c.tick(10_000.0), RunStatus::Completed);
    }

    #[test]
    fn test_force_stop_ignores_stale_handle() {
        let mut c = coordinator(1, ReelGeometry::new(80.0, 41));
        let first = c.start_run(&[0], RunConfig::default(), None, 0.0).unwrap();
        run_to_completion(&mut c, 0.0, FRAME);
        let second = c.start_run(&[0], RunConfig::default(), None, 5000.0).unwrap();
        assert!(!c.force_stop(first));
        assert_eq!(c.status(), RunStatus::Running);
        assert!(c.force_stop(second));
    }

    #[test]
    fn test_zero_deceleration_completes_by_timeout() {
        let geometry = ReelGeometry::new(80.0, 41);
        let mut c = coordinator(2, geometry);
        let config = RunConfig {
            deceleration: 0.0,
            safety_timeout_ms: 5000.0,
            ..Default::default()
        };
        let w = winners(&[11, 12]);
        c.start_run(&[0, 1], config.clone(), Some(&w), 0.0).unwrap();
        // Nothing to brake from: the reels hold still until the timeout
        for i in 1..=60 {
            c.tick(i as f64 * FRAME);
        }
        assert!(c.reels().iter().all(|r| r.unwrapped_position == 0.0));
        let end = run_to_completion(&mut c, 60.0 * FRAME, FRAME);

        assert!(end <= config.safety_timeout_ms + FRAME);
        let summary = c.last_summary().unwrap();
        assert!(summary.timed_out);
        // Forced reels still land on their winners
        assert_eq!(summary.revealed_slots, w);
    }

    #[test]
    fn test_non_finite_reel_is_isolated() {
        let geometry = ReelGeometry::new(80.0, 41);
        let mut c = coordinator(2, geometry);
        let w = winners(&[3, 4]);
        c.start_run(&[0, 1], RunConfig::default(), Some(&w), 0.0).unwrap();
        c.tick(FRAME);
        c.tick(2.0 * FRAME);

        c.reels[0].velocity = f64::NAN;
        c.tick(3.0 * FRAME);

        let reel = c.reel(0).unwrap();
        assert!(reel.is_stopped());
        assert_eq!(Some(reel.unwrapped_position), reel.target_position);
        assert!(!c.reel(1).unwrap().is_stopped());
        assert_eq!(c.status(), RunStatus::Running);

        run_to_completion(&mut c, 3.0 * FRAME, FRAME);
        let summary = c.last_summary().unwrap();
        assert_eq!(summary.corrupted_reels, vec![0]);
        assert_eq!(summary.revealed_slots, w);
    }

    #[test]
    fn test_position_modes_across_runs() {
        let mut c = coordinator(1, ReelGeometry::new(80.0, 41));
        c.start_run(&[0], RunConfig::default(), Some(&winners(&[6])), 0.0)
            .unwrap();
        let end = run_to_completion(&mut c, 0.0, FRAME);
        let landed = c.reel(0).unwrap().unwrapped_position;
        assert!(landed > 0.0);

        // Continue: the next run starts where the last one landed
        c.start_run(&[0], RunConfig::default(), Some(&winners(&[9])), end)
            .unwrap();
        assert_eq!(c.reel(0).unwrap().unwrapped_position, landed);
        let end = run_to_completion(&mut c, end, FRAME);
        assert!(c.reel(0).unwrap().unwrapped_position > landed);

        // Reset: fresh spin from zero
        let reset = RunConfig {
            position_mode: PositionMode::Reset,
            ..Default::default()
        };
        c.start_run(&[0], reset, Some(&winners(&[9])), end).unwrap();
        assert_eq!(c.reel(0).unwrap().unwrapped_position, 0.0);
        run_to_completion(&mut c, end, FRAME);
        assert_eq!(c.last_summary().unwrap().revealed_slots[&0], 9);
    }

    #[test]
    fn test_cruise_starts_at_full_speed_with_uneven_frames() {
        let mut c = coordinator(1, ReelGeometry::new(80.0, 41));
        let config = RunConfig {
            cruise_jitter: 0.0,
            stagger_ms: 0.0,
            ..Default::default()
        };
        let frames = Rc::new(RefCell::new(Vec::new()));
        let sink = frames.clone();
        c.on_tick(move |frame| sink.borrow_mut().push(*frame));

        c.start_run(&[0], config.clone(), Some(&winners(&[7])), 0.0)
            .unwrap();
        // 40 ms frames never land exactly on the 500 ms window
        run_to_completion(&mut c, 0.0, 40.0);

        let frames = frames.borrow();
        let first_cruise = frames
            .iter()
            .find(|f| f.phase == ReelPhase::Cruising)
            .unwrap();
        assert_eq!(first_cruise.velocity, config.cruise_speed);
        assert!(!c.last_summary().unwrap().timed_out);
    }

    #[test]
    fn test_large_frame_gap_is_clamped() {
        let mut c = coordinator(1, ReelGeometry::new(80.0, 41));
        let config = RunConfig::default();
        c.start_run(&[0], config.clone(), Some(&winners(&[0])), 0.0)
            .unwrap();
        for i in 1..=40 {
            c.tick(i as f64 * FRAME);
        }
        let before = c.reel(0).unwrap().unwrapped_position;
        // Tab was hidden for three seconds
        c.tick(40.0 * FRAME + 3000.0);
        let after = c.reel(0).unwrap().unwrapped_position;
        let max_step =
            config.cruise_speed * (1.0 + config.cruise_jitter) * config.max_dt_ms / 1000.0;
        assert!(after - before <= max_step + 1e-9);
    }

    #[test]
    fn test_listeners_and_renderer_receive_frames() {
        use crate::render::RecordingAdapter;

        struct Shared(Rc<RefCell<RecordingAdapter>>);
        impl RenderAdapter for Shared {
            fn set_offset(&mut self, reel: ReelId, offset_px: f64, blur: f64) {
                self.0.borrow_mut().set_offset(reel, offset_px, blur);
            }
        }

        let geometry = ReelGeometry::new(80.0, 41);
        let mut c = coordinator(2, geometry);
        let painted = Rc::new(RefCell::new(RecordingAdapter::new()));
        c.set_render_adapter(Box::new(Shared(painted.clone())));

        let frames = Rc::new(RefCell::new(Vec::new()));
        let sink = frames.clone();
        c.on_tick(move |frame| sink.borrow_mut().push(*frame));

        let finals = Rc::new(RefCell::new(None));
        let finals_sink = finals.clone();
        c.on_complete(move |summary| {
            *finals_sink.borrow_mut() = Some(summary.final_offsets.clone());
        });

        c.start_run(&[0, 1], RunConfig::default(), Some(&winners(&[2, 3])), 0.0)
            .unwrap();
        run_to_completion(&mut c, 0.0, FRAME);

        let frames = frames.borrow();
        assert!(frames.iter().any(|f| f.reel_id == 0));
        assert!(frames.iter().any(|f| f.reel_id == 1));
        assert!(frames.iter().all(|f| f.offset >= 0.0 && f.offset < geometry.cycle_length()));

        let finals = finals.borrow().clone().unwrap();
        let painted = painted.borrow();
        assert_eq!(painted.last_offset(0), Some(finals[&0]));
        assert_eq!(painted.last_offset(1), Some(finals[&1]));
        assert!(painted.frames.iter().all(|&(_, _, blur)| (0.0..=6.0).contains(&blur)));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        #[test]
        fn prop_every_run_lands_on_its_winners(
            item_height in 40.0f64..120.0,
            item_count in 3u32..50,
            seeds in proptest::collection::vec(any::<u32>(), 1..5),
            reveal in 0.0f64..200.0,
            dt in 4.0f64..40.0,
            seed in any::<u64>(),
        ) {
            let geometry = ReelGeometry::new(item_height, item_count);
            let mut c = coordinator(seeds.len() as u32, geometry);
            let slots: Vec<SlotIndex> = seeds.iter().map(|s| s % item_count).collect();
            let w = winners(&slots);
            let ids: Vec<ReelId> = (0..slots.len() as ReelId).collect();
            let config = RunConfig { reveal_offset: reveal, seed, ..Default::default() };
            c.start_run(&ids, config.clone(), Some(&w), 0.0).unwrap();

            let end = run_to_completion(&mut c, 0.0, dt);
            prop_assert!(end <= config.safety_timeout_ms + dt);

            let summary = c.last_summary().unwrap();
            prop_assert!(!summary.timed_out);
            prop_assert!(summary.corrupted_reels.is_empty());
            for (&id, &slot) in &w {
                let expected = winner_remainder(slot, &geometry, reveal);
                let offset = summary.final_offsets[&id];
                prop_assert!(circular_distance(offset, expected, geometry.cycle_length()) <= 1.0);
            }
        }
    }
}
