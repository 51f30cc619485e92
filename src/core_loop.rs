//! Core loop / state (C9): ticks the pipeline, dispatches user input, and
//! serves snapshots to `StatusSink`. Owns every piece of mutable state;
//! every other component in this crate is a pure function of its inputs.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Select};
use log::{debug, info, trace, warn};

use crate::audio_source::AudioEvent;
use crate::baseline::AdaptiveBaseline;
use crate::classifier::{classify, ClassifierThresholds};
use crate::config::Config;
use crate::controller::{
    apply_success, begin_manual_hold, decide_auto, decide_manual, shift_target, ControllerState,
    Mode,
};
use crate::error::AgcError;
use crate::history::HistoryWindow;
use crate::input::UserEvent;
use crate::level::{measure_level, FrameAssembler};
use crate::normalize::Normalizer;
use crate::persist;
use crate::renderer::{set_volume_with_retry, RendererControl, RendererHandle};
use crate::spectrum::SpectralAnalyzer;
use crate::status::{Snapshot, StatusSink};

const SELECT_TIMEOUT: Duration = Duration::from_millis(100);
const DEGRADED_DURATION: Duration = Duration::from_secs(5);
const CONSECUTIVE_FAILURES_BEFORE_REDISCOVER: u32 = 3;

pub struct CoreLoop {
    config: Config,
    assembler: FrameAssembler,
    normalizer: Normalizer,
    analyzer: SpectralAnalyzer,
    thresholds: ClassifierThresholds,
    history: HistoryWindow,
    state: ControllerState,
    baseline: AdaptiveBaseline,
    renderer: Arc<dyn RendererControl>,
    renderer_handle: RendererHandle,
    audio_events: Receiver<AudioEvent>,
    user_events: Receiver<UserEvent>,
    status_sink: Box<dyn StatusSink>,
    runtime: tokio::runtime::Runtime,
    /// Set by the `UserInput` backend when a `Quit` was raised by an
    /// operating-environment interrupt (Ctrl+C) rather than a deliberate
    /// `q`/Esc keypress, so `run()` can propagate `AgcError::Interrupted`
    /// and exit 130 instead of a normal 0, per the CLI's documented exit
    /// codes.
    interrupted: Arc<AtomicBool>,
}

impl CoreLoop {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Config,
        renderer: Arc<dyn RendererControl>,
        renderer_handle: RendererHandle,
        initial_volume: u8,
        audio_events: Receiver<AudioEvent>,
        user_events: Receiver<UserEvent>,
        status_sink: Box<dyn StatusSink>,
        interrupted: Arc<AtomicBool>,
    ) -> Result<Self, AgcError> {
        let window_len = config.window_len();
        let mut state = ControllerState::new(
            initial_volume,
            config.volume_baseline_max,
            config.volume_max,
            config.volume_min,
            config.target_db,
            config.threshold_loud,
            config.threshold_quiet,
            -65.0,
            0.4,
            config.step,
        );

        if config.persist {
            if let Some(baseline) = persist::load(&config.state_file) {
                info!("restored adaptive baseline from {}", config.state_file);
                baseline.apply(&mut state);
            }
        }

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .map_err(|e| AgcError::InvalidConfig(format!("failed to start runtime: {e}")))?;

        Ok(Self {
            thresholds: ClassifierThresholds {
                dialogue: config.dialogue_threshold,
                music: config.music_threshold,
            },
            analyzer: SpectralAnalyzer::new(config.sample_rate as f32, window_len),
            normalizer: Normalizer::default(),
            assembler: FrameAssembler::new(window_len),
            history: HistoryWindow::new(config.history_len),
            baseline: AdaptiveBaseline::new(),
            config,
            state,
            renderer,
            renderer_handle,
            audio_events,
            user_events,
            status_sink,
            runtime,
            interrupted,
        })
    }

    /// Runs until a `Quit` event is received or the audio source
    /// disconnects. Never issues `set_volume` after returning. Returns
    /// `Err(AgcError::Interrupted)` if the stop was raised by a Ctrl+C
    /// interrupt rather than a deliberate quit, so `main` can exit 130.
    pub fn run(mut self) -> Result<(), AgcError> {
        loop {
            let mut sel = Select::new();
            let audio_idx = sel.recv(&self.audio_events);
            let user_idx = sel.recv(&self.user_events);

            match sel.select_timeout(SELECT_TIMEOUT) {
                Ok(op) if op.index() == audio_idx => match op.recv(&self.audio_events) {
                    Ok(AudioEvent::Chunk(chunk)) => {
                        self.drain_user_events();
                        let windows = self.assembler.push(&chunk);
                        for window in windows {
                            self.process_window(&window);
                            self.drain_user_events();
                        }
                    }
                    Ok(AudioEvent::Overflow) => {
                        let dropped = self.assembler.flush();
                        warn!("audio overflow: dropped {dropped} buffered samples");
                    }
                    Err(_) => {
                        info!("audio source disconnected, shutting down");
                        break;
                    }
                },
                Ok(op) if op.index() == user_idx => {
                    if let Ok(event) = op.recv(&self.user_events) {
                        if self.handle_user_event(event) {
                            break;
                        }
                    }
                }
                Ok(_) => unreachable!("select only registers two operations"),
                Err(_) => {
                    // Timed out with nothing ready; still worth refreshing
                    // the status line so `pause_remaining_s` counts down.
                }
            }

            self.publish_snapshot();
        }

        self.shutdown();
        if self.interrupted.load(Ordering::Relaxed) {
            Err(AgcError::Interrupted)
        } else {
            Ok(())
        }
    }

    fn drain_user_events(&mut self) {
        while let Ok(event) = self.user_events.try_recv() {
            // A `Quit` seen here will be caught by the next `select` too,
            // but handling it immediately avoids classifying another
            // window after the user already asked to stop.
            self.handle_user_event(event);
        }
    }

    /// Returns `true` if the loop should stop.
    fn handle_user_event(&mut self, event: UserEvent) -> bool {
        let now = Instant::now();
        match event {
            UserEvent::Quit => return true,
            UserEvent::VolumeUp | UserEvent::VolumeDown => {
                let direction = if event == UserEvent::VolumeUp { 1 } else { -1 };
                // The manual-hold window and the adaptive baseline both
                // key off the keypress itself, not off whether the
                // clamped volume actually moved (e.g. already pinned at
                // `hard_min`/`hard_max`) or whether the renderer
                // acknowledged the command.
                begin_manual_hold(&mut self.state, now);
                let decision = decide_manual(&self.state, direction);
                let volume_after = match decision.new_volume {
                    Some(new_volume) if self.issue_command(new_volume, now, false) => {
                        Some(new_volume)
                    }
                    _ => self.state.current_volume,
                };
                if self.config.adaptive {
                    if let Some(volume_after) = volume_after {
                        let smoothed_db = self.history.smoothed().db;
                        self.baseline.on_manual_adjustment(
                            direction,
                            volume_after,
                            smoothed_db,
                            &mut self.state,
                        );
                    }
                }
            }
            UserEvent::BaselineUp => shift_target(&mut self.state, 1.0),
            UserEvent::BaselineDown => shift_target(&mut self.state, -1.0),
        }
        false
    }

    fn process_window(&mut self, window: &[f32]) {
        let level = measure_level(window);
        let normalized = self.normalizer.normalize(window, level.rms);
        let bands = self.analyzer.analyze(&normalized);
        let result = classify(&bands, &self.thresholds);
        trace!(
            "window: db={:.1} label={:?} confidence={:.2} dialogue={:.2} music={:.2}",
            level.db_fs,
            result.label,
            result.confidence,
            result.dialogue_score,
            result.music_score,
        );
        self.history.push(level.db_fs, result);

        let smoothed = self.history.smoothed();
        let now = Instant::now();
        let decision = decide_auto(&self.state, &smoothed, now);
        if let Some(new_volume) = decision.new_volume {
            debug!(
                "auto: smoothed db={:.1} label={:?} confidence={:.2} -> volume {new_volume}",
                smoothed.db, smoothed.label, smoothed.confidence,
            );
            self.issue_command(new_volume, now, true);
        }
    }

    /// Issues a command through the renderer with the standard retry
    /// schedule. Returns `true` on success. On repeated failure, marks the
    /// controller degraded and attempts rediscovery after three
    /// consecutive failures, per the error taxonomy.
    fn issue_command(&mut self, new_volume: u8, now: Instant, is_auto: bool) -> bool {
        let result = self.runtime.block_on(set_volume_with_retry(
            self.renderer.as_ref(),
            &self.renderer_handle,
            new_volume,
        ));

        match result {
            Ok(()) => {
                apply_success(&mut self.state, new_volume, now, is_auto);
                true
            }
            Err(e) => {
                warn!("renderer command failed: {e}");
                self.state.consecutive_failures += 1;
                self.state.degraded_until = Some(now + DEGRADED_DURATION);
                if self.state.consecutive_failures >= CONSECUTIVE_FAILURES_BEFORE_REDISCOVER {
                    match self.runtime.block_on(self.renderer.discover(&self.config.device)) {
                        Ok(handle) => {
                            info!("renderer rediscovered after repeated failures");
                            self.renderer_handle = handle;
                            self.state.consecutive_failures = 0;
                        }
                        Err(_) => warn!("renderer still unreachable after rediscovery attempt"),
                    }
                }
                false
            }
        }
    }

    fn publish_snapshot(&mut self) {
        let now = Instant::now();
        let smoothed = self.history.smoothed();
        let pause_remaining_s = self
            .state
            .manual_pause_until
            .map(|until| until.saturating_duration_since(now).as_secs_f32())
            .unwrap_or(0.0);

        self.status_sink.publish(Snapshot {
            volume: self.state.current_volume,
            baseline_max: self.state.baseline_max,
            db: smoothed.db,
            label: smoothed.label,
            confidence: smoothed.confidence,
            mode: self.state.mode(now),
            pause_remaining_s,
            target_db: self.state.target_db,
        });
    }

    fn shutdown(&mut self) {
        self.publish_snapshot();
        if self.config.persist {
            let baseline = persist::PersistedBaseline::from_state(&self.state);
            if let Err(e) = persist::save(&self.config.state_file, &baseline) {
                warn!("failed to persist adaptive baseline: {e}");
            }
        }
    }
}
