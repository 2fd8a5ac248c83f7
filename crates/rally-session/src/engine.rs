use rally_audio::features::extract_band_features;
use rally_audio::snapshot::SnapshotSource;
use rally_audio::HitClassifier;
use rally_core::store::KeyValueStore;
use rally_core::{DetectionConfig, Settings};

use crate::debounce::debounce;
use crate::scores::ScoreAggregator;
use crate::session::{SessionController, SessionEvent};

/// Read-only detector state exposed to the UI layer.
///
/// Published as a whole after each tick, so observers never see a partial
/// update.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DetectorState {
    /// A session is running and hits are being counted.
    pub is_active: bool,
    /// The capture resource is held and producing snapshots.
    pub is_listening: bool,
    /// Display level, clamped to [0, 1]. Updates even while inactive.
    pub audio_level: f32,
    /// Hits counted in the current run. Monotonic until reset or restart.
    pub hit_count: u32,
    /// Timestamp of the last accepted hit, in engine milliseconds.
    pub last_hit_ms: u64,
    /// Seconds left before the inactivity timeout, while armed.
    pub time_remaining_secs: Option<f64>,
    /// Whole seconds left on the auto-restart countdown, while pending.
    pub auto_restart_countdown: Option<u32>,
}

/// The detection pipeline, assembled: capture → features → classifier →
/// debounce → session → scores.
///
/// Everything is driven by `tick(now_ms)` on one logical thread; the
/// surrounding application calls `start`/`stop`/`reset` between ticks and
/// reads [`DetectorState`] snapshots. Time is caller-supplied milliseconds
/// from any monotonic origin.
pub struct RallyEngine<S: SnapshotSource> {
    source: S,
    store: Box<dyn KeyValueStore>,
    config: DetectionConfig,
    classifier: HitClassifier,
    controller: SessionController,
    aggregator: ScoreAggregator,
    state: DetectorState,
}

impl<S: SnapshotSource> RallyEngine<S> {
    /// Assemble an engine over a snapshot source and an injected store.
    #[must_use]
    pub fn new(source: S, store: Box<dyn KeyValueStore>) -> Self {
        Self {
            source,
            store,
            config: DetectionConfig::default(),
            classifier: HitClassifier::new(),
            controller: SessionController::new(0.0),
            aggregator: ScoreAggregator::new(),
            state: DetectorState::default(),
        }
    }

    /// Begin a counting session.
    ///
    /// Acquires the capture resource (reusing an already-open handle),
    /// snapshots the persisted settings into this run's immutable
    /// [`DetectionConfig`], and resets the detection state. On capture
    /// failure nothing is mutated and `false` is returned; the caller
    /// surfaces the problem to the user, there is no automatic retry.
    pub fn start(&mut self, now_ms: u64) -> bool {
        if self.controller.is_active() {
            return true;
        }

        if let Err(err) = self.source.open() {
            log::error!("could not start detection: {err}");
            return false;
        }

        let settings = Settings::load(&*self.store);
        self.config = DetectionConfig::from_settings(&settings);
        self.classifier.reset();
        self.controller = SessionController::new(settings.session_timeout_secs);
        self.controller.start(now_ms);

        self.state.is_active = true;
        self.state.is_listening = true;
        self.state.hit_count = 0;
        log::info!(
            "session started (sensitivity {}%, min interval {}ms, timeout {}s)",
            settings.sensitivity,
            settings.min_hit_interval_ms,
            settings.session_timeout_secs
        );
        true
    }

    /// Run one scheduler tick: pull a snapshot, update the display level,
    /// classify, and advance the session timers.
    pub fn tick(&mut self, now_ms: u64) {
        if let Some(snapshot) = self.source.poll() {
            let features = extract_band_features(&snapshot, &self.config);
            self.classifier.observe(features.current_level);
            self.state.audio_level = features.normalized_level.clamp(0.0, 1.0);

            // While inactive the classifier only feeds the display level.
            if self.controller.is_active()
                && debounce(now_ms, self.state.last_hit_ms, self.config.min_hit_interval_ms)
                && self.classifier.classify(&features, self.config.sensitivity)
            {
                self.controller.on_hit(now_ms);
                self.state.hit_count += 1;
                self.state.last_hit_ms = now_ms;
            }
        }

        match self.controller.tick(now_ms) {
            Some(SessionEvent::Finalized(done)) => {
                self.aggregator
                    .finalize(&mut *self.store, done.score, done.duration_secs);
            }
            Some(SessionEvent::Restarted) => {
                // A fresh session calibrates from scratch, as a manual
                // start would.
                self.classifier.reset();
                self.state.hit_count = 0;
            }
            None => {}
        }

        self.state.is_active = self.controller.is_active();
        self.state.is_listening = self.source.is_open();
        self.state.time_remaining_secs = self.controller.time_remaining(now_ms);
        self.state.auto_restart_countdown = self.controller.auto_restart_countdown(now_ms);
    }

    /// Stop the session on user request, finalizing it with measured
    /// elapsed time. The capture resource stays open for the next start;
    /// idle stops are no-ops.
    pub fn stop(&mut self, now_ms: u64) {
        if let Some(done) = self.controller.stop(now_ms) {
            self.aggregator
                .finalize(&mut *self.store, done.score, done.duration_secs);
        }
        self.state.is_active = false;
        self.state.time_remaining_secs = None;
        self.state.auto_restart_countdown = None;
    }

    /// Clear the counter and all timers without finalizing or persisting.
    pub fn reset(&mut self) {
        self.controller.reset();
        self.state.is_active = false;
        self.state.hit_count = 0;
        self.state.last_hit_ms = 0;
        self.state.time_remaining_secs = None;
        self.state.auto_restart_countdown = None;
    }

    /// Release the capture resource. Idempotent; also runs on drop via the
    /// source itself.
    pub fn close(&mut self) {
        self.source.close();
        self.state.is_listening = false;
    }

    /// Current observable state.
    #[must_use]
    pub fn state(&self) -> &DetectorState {
        &self.state
    }

    /// This run's finalized sessions, most recent first.
    #[must_use]
    pub fn recent_sessions(&self) -> &[rally_core::ScoreRecord] {
        self.aggregator.recent()
    }
}
