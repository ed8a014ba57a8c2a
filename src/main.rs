//! Loadout Reels entry point
//!
//! Handles platform-specific initialization and runs the reel loop.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_app {
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::rc::Rc;

    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg32;
    use wasm_bindgen::prelude::*;
    use web_sys::{Document, KeyboardEvent, MouseEvent};

    use loadout_reels::history::format_age;
    use loadout_reels::reel::{Coordinator, ReelGeometry, SequenceStatus, SpinSequence};
    use loadout_reels::render::DomReelAdapter;
    use loadout_reels::{ReelId, SlotIndex, SpeedPreset, SpinHistory, SpinSettings};

    /// Used when a reel element carries no `data-item-height`
    const DEFAULT_ITEM_HEIGHT: f64 = 80.0;
    /// Upper bound on `#reel-{id}` elements probed at startup
    const MAX_REELS: ReelId = 16;

    /// App instance holding all state
    struct App {
        coordinator: Coordinator,
        sequence: Option<SpinSequence>,
        settings: SpinSettings,
        history: Rc<RefCell<SpinHistory>>,
        reels: Vec<ReelId>,
        item_height: f64,
        rng: Pcg32,
        // One-shot inputs, consumed by the next frame
        spin_requested: bool,
        skip_requested: bool,
        cancel_requested: bool,
        last_status: Option<SequenceStatus>,
    }

    impl App {
        fn new(seed: u64) -> Self {
            Self {
                coordinator: Coordinator::new(),
                sequence: None,
                settings: SpinSettings::load(),
                history: Rc::new(RefCell::new(SpinHistory::load())),
                reels: Vec::new(),
                item_height: DEFAULT_ITEM_HEIGHT,
                rng: Pcg32::seed_from_u64(seed),
                spin_requested: false,
                skip_requested: false,
                cancel_requested: false,
                last_status: None,
            }
        }

        /// Register every `#reel-{id}` element found in the page
        fn discover_reels(&mut self, document: &Document) {
            for id in 0..MAX_REELS {
                let Some(el) = document.get_element_by_id(&format!("reel-{id}")) else {
                    break;
                };
                let strip = el.query_selector(".reel-strip").ok().flatten();
                let item_count = strip.map(|s| s.child_element_count()).unwrap_or(0);
                let item_height = el
                    .get_attribute("data-item-height")
                    .and_then(|h| h.parse::<f64>().ok())
                    .unwrap_or(DEFAULT_ITEM_HEIGHT);

                match self
                    .coordinator
                    .insert_reel(id, ReelGeometry::new(item_height, item_count))
                {
                    Ok(()) => {
                        self.reels.push(id);
                        self.item_height = item_height;
                        log::info!("Reel {id}: {item_count} items @ {item_height}px");
                    }
                    Err(err) => log::warn!("Skipping reel {id}: {err}"),
                }
            }
        }

        /// Pick a winner per reel; the item catalog lives in the page
        fn pick_winners(&mut self) -> HashMap<ReelId, SlotIndex> {
            let mut winners = HashMap::new();
            for &id in &self.reels {
                if let Some(reel) = self.coordinator.reel(id) {
                    let count = reel.geometry.item_count.max(1);
                    winners.insert(id, self.rng.random_range(0..count));
                }
            }
            winners
        }

        fn is_spinning(&self) -> bool {
            self.sequence.as_ref().is_some_and(|s| !s.is_finished())
        }

        fn start_sequence(&mut self, now: f64) {
            if self.reels.is_empty() {
                log::warn!("No reels to spin");
                return;
            }
            let winners = self.pick_winners();
            let seed = self.rng.random::<u64>();
            let config = self.settings.run_config(self.item_height, seed);
            let mut sequence = SpinSequence::new(
                self.reels.clone(),
                winners,
                self.settings.effective_spin_count(),
                config,
                self.settings.pause_between_spins_ms,
            );
            match sequence.start(&mut self.coordinator, now) {
                Ok(()) => self.sequence = Some(sequence),
                Err(err) => log::error!("Failed to start spin: {err}"),
            }
        }

        fn update(&mut self, now: f64) {
            if self.cancel_requested {
                if let Some(seq) = self.sequence.as_mut() {
                    seq.cancel(&mut self.coordinator);
                    log::info!("Spin cancelled");
                }
            } else if self.skip_requested {
                if let Some(seq) = self.sequence.as_mut() {
                    if let Err(err) = seq.skip_to_result(&mut self.coordinator, now) {
                        log::error!("Skip failed: {err}");
                    }
                }
            } else if self.spin_requested && !self.is_spinning() {
                self.start_sequence(now);
            }
            self.spin_requested = false;
            self.skip_requested = false;
            self.cancel_requested = false;

            if let Some(seq) = self.sequence.as_mut() {
                seq.tick(&mut self.coordinator, now);
            }
        }

        fn cycle_speed(&mut self) {
            self.settings.speed = match self.settings.speed {
                SpeedPreset::Relaxed => SpeedPreset::Normal,
                SpeedPreset::Normal => SpeedPreset::Turbo,
                SpeedPreset::Turbo => SpeedPreset::Relaxed,
            };
            self.settings.save();
            log::info!("Speed: {}", self.settings.speed.as_str());
        }

        /// Update status, result and history elements in DOM
        fn update_hud(&mut self, document: &Document) {
            let status = self.sequence.as_ref().map(|s| s.status());
            if status == self.last_status {
                return;
            }
            self.last_status = status;

            let text = match status {
                None | Some(SequenceStatus::Ready) => "Ready".to_string(),
                Some(SequenceStatus::Spinning { spin, of }) => format!("Spinning {spin}/{of}"),
                Some(SequenceStatus::Pausing) => "Shuffling...".to_string(),
                Some(SequenceStatus::Finished) => "Locked in".to_string(),
            };
            if let Some(el) = document.get_element_by_id("spin-status") {
                el.set_text_content(Some(&text));
            }
            if let Some(el) = document.get_element_by_id("speed-value") {
                el.set_text_content(Some(self.settings.speed.as_str()));
            }

            if status != Some(SequenceStatus::Finished) {
                return;
            }
            if let Some(el) = document.get_element_by_id("history-list") {
                let history = self.history.borrow();
                let html: String = history
                    .entries
                    .iter()
                    .map(|entry| {
                        let slots: Vec<String> =
                            entry.slots.iter().map(|(_, slot)| slot.to_string()).collect();
                        format!(
                            "<li><span class=\"slots\">{}</span><span class=\"age\">{}</span></li>",
                            slots.join(" / "),
                            format_age(entry.timestamp)
                        )
                    })
                    .collect();
                el.set_inner_html(&html);
            }
        }
    }

    pub fn run() {
        console_error_panic_hook::set_once();
        let _ = console_log::init_with_level(log::Level::Info);

        log::info!("Loadout Reels starting...");

        let Some(window) = web_sys::window() else {
            log::error!("No window");
            return;
        };
        let Some(document) = window.document() else {
            log::error!("No document");
            return;
        };

        let seed = js_sys::Date::now() as u64;
        let mut app = App::new(seed);
        app.discover_reels(&document);
        app.coordinator
            .set_render_adapter(Box::new(DomReelAdapter::new(&app.reels)));

        let history = app.history.clone();
        app.coordinator.on_complete(move |summary| {
            let mut history = history.borrow_mut();
            if history.record(summary, js_sys::Date::now()) {
                history.save();
            }
        });

        log::info!("{} reels ready, seed {}", app.reels.len(), seed);

        let app = Rc::new(RefCell::new(app));
        setup_spin_button(app.clone(), &document);
        setup_keyboard(app.clone(), &window);
        request_animation_frame(app);
    }

    fn setup_spin_button(app: Rc<RefCell<App>>, document: &Document) {
        if let Some(btn) = document.get_element_by_id("spin-btn") {
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: MouseEvent| {
                let mut a = app.borrow_mut();
                if a.is_spinning() {
                    a.skip_requested = true;
                } else {
                    a.spin_requested = true;
                }
            });
            let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn setup_keyboard(app: Rc<RefCell<App>>, window: &web_sys::Window) {
        let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
            let mut a = app.borrow_mut();
            match event.key().as_str() {
                " " | "Enter" => {
                    event.prevent_default();
                    if a.is_spinning() {
                        a.skip_requested = true;
                    } else {
                        a.spin_requested = true;
                    }
                }
                "Escape" => a.cancel_requested = true,
                "t" | "T" => a.cycle_speed(),
                "m" | "M" => {
                    a.settings.reduced_motion = !a.settings.reduced_motion;
                    a.settings.save();
                    log::info!("Reduced motion: {}", a.settings.reduced_motion);
                }
                _ => {}
            }
        });
        let _ = window
            .add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn request_animation_frame(app: Rc<RefCell<App>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::once(move |time: f64| {
            app_loop(app, time);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn app_loop(app: Rc<RefCell<App>>, time: f64) {
        {
            let mut a = app.borrow_mut();
            a.update(time);
            if let Some(document) = web_sys::window().and_then(|w| w.document()) {
                a.update_hud(&document);
            }
        }

        request_animation_frame(app);
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() {
    wasm_app::run();
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use std::cell::Cell;
    use std::collections::HashMap;
    use std::rc::Rc;

    use loadout_reels::consts::DEMO_FRAME_MS;
    use loadout_reels::reel::{Coordinator, ReelGeometry, SpinSequence};
    use loadout_reels::render::RecordingAdapter;
    use loadout_reels::{ReelId, SlotIndex, SpinHistory, SpinSettings};
    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg32;

    const ITEM_HEIGHT: f64 = 80.0;
    const ITEM_COUNT: u32 = 41;
    const REELS: [ReelId; 3] = [0, 1, 2];
    // Headless runs give up after a simulated minute
    const DEMO_LIMIT_MS: f64 = 60_000.0;

    env_logger::init();
    log::info!("Loadout Reels (native) starting...");
    log::info!("Native mode runs a headless spin - run with `trunk serve` for the web version");

    let seed = std::env::args()
        .nth(1)
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or_else(|| {
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_millis() as u64)
                .unwrap_or(0)
        });
    let mut rng = Pcg32::seed_from_u64(seed);

    let mut coordinator = Coordinator::new();
    for id in REELS {
        if let Err(err) = coordinator.insert_reel(id, ReelGeometry::new(ITEM_HEIGHT, ITEM_COUNT)) {
            log::error!("Failed to add reel {id}: {err}");
            return;
        }
    }
    coordinator.set_render_adapter(Box::new(RecordingAdapter::new()));

    let frames = Rc::new(Cell::new(0usize));
    {
        let frames = frames.clone();
        coordinator.on_tick(move |_| frames.set(frames.get() + 1));
    }

    let winners: HashMap<ReelId, SlotIndex> = REELS
        .iter()
        .map(|&id| (id, rng.random_range(0..ITEM_COUNT)))
        .collect();

    let settings = SpinSettings::load();
    let config = settings.run_config(ITEM_HEIGHT, seed);
    let mut sequence = SpinSequence::new(
        REELS.to_vec(),
        winners.clone(),
        settings.effective_spin_count(),
        config,
        settings.pause_between_spins_ms,
    );

    let mut now = 0.0;
    if let Err(err) = sequence.start(&mut coordinator, now) {
        log::error!("Failed to start spin: {err}");
        return;
    }
    while !sequence.is_finished() && now < DEMO_LIMIT_MS {
        now += DEMO_FRAME_MS;
        sequence.tick(&mut coordinator, now);
    }

    let Some(summary) = sequence.summary() else {
        log::error!("Spin did not finish within {DEMO_LIMIT_MS}ms");
        return;
    };

    let mut history = SpinHistory::load();
    if history.record(summary, now) {
        if let Some(entry) = history.latest() {
            log::info!("Recorded reveal {:?} (forced: {})", entry.slots, entry.forced);
        }
    }

    let mut revealed: Vec<_> = summary.revealed_slots.iter().collect();
    revealed.sort();
    for (id, slot) in revealed {
        let wanted = winners.get(id).copied().unwrap_or_default();
        log::info!("Reel {id}: slot {slot} (wanted {wanted})");
    }
    log::info!(
        "Finished in {:.0}ms over {} frame updates (seed {seed}, timed out: {})",
        now,
        frames.get(),
        summary.timed_out
    );
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}
