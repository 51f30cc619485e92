//! Volume controller (C8) and the `ControllerState` it owns exclusively.
//!
//! The decision function is a pure function of state plus the smoothed
//! classifier output — it never performs I/O. The core loop (C9) applies
//! the resulting command through `RendererControl` and folds the outcome
//! back into the state.

use std::time::{Duration, Instant};

use crate::classifier::AudioLabel;
use crate::history::Smoothed;

const DIALOGUE_MULT_BASE: f32 = 2.0;
const DIALOGUE_MULT_MAX: f32 = 3.5;
const MUSIC_MULT_BASE: f32 = 0.8;
const MUSIC_MULT_MAX: f32 = 1.2;
const MANUAL_PAUSE: Duration = Duration::from_secs(10);
const MANUAL_STEP: i32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Auto,
    ManualHold,
}

/// All controller state, mutated only by the core loop or user-input
/// handlers. Created at startup from CLI defaults (or a persisted
/// baseline), destroyed at shutdown after issuing no further commands.
#[derive(Debug, Clone)]
pub struct ControllerState {
    pub current_volume: Option<u8>,
    pub baseline_max: u8,
    pub hard_max: u8,
    pub hard_min: u8,
    pub target_db: f32,
    pub threshold_loud: f32,
    pub threshold_quiet: f32,
    pub silence_threshold: f32,
    pub last_adjust_at: Option<Instant>,
    pub manual_pause_until: Option<Instant>,
    pub min_adjust_interval: Duration,
    pub step: u8,
    pub last_manual_volume: Option<u8>,
    pub last_manual_db: Option<f32>,
    pub degraded_until: Option<Instant>,
    pub consecutive_failures: u32,
}

impl ControllerState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        initial_volume: u8,
        baseline_max: u8,
        hard_max: u8,
        hard_min: u8,
        target_db: f32,
        threshold_loud: f32,
        threshold_quiet: f32,
        silence_threshold: f32,
        min_adjust_interval_secs: f32,
        step: u8,
    ) -> Self {
        Self {
            current_volume: Some(initial_volume),
            baseline_max,
            hard_max,
            hard_min,
            target_db,
            threshold_loud,
            threshold_quiet,
            silence_threshold,
            last_adjust_at: None,
            manual_pause_until: None,
            min_adjust_interval: Duration::from_secs_f32(min_adjust_interval_secs),
            step,
            last_manual_volume: None,
            last_manual_db: None,
            degraded_until: None,
            consecutive_failures: 0,
        }
    }

    pub fn mode(&self, now: Instant) -> Mode {
        match self.manual_pause_until {
            Some(until) if now < until => Mode::ManualHold,
            _ => Mode::Auto,
        }
    }

    fn degraded(&self, now: Instant) -> bool {
        matches!(self.degraded_until, Some(until) if now < until)
    }
}

/// What the controller wants to do this tick. `None` means no command is
/// issued (redundant sets are never requested).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub new_volume: Option<u8>,
}

impl Decision {
    const NONE: Decision = Decision { new_volume: None };
}

/// Automatic decision for one tick, given the smoothed classifier output.
/// Pure: same inputs always produce the same decision.
pub fn decide_auto(state: &ControllerState, smoothed: &Smoothed, now: Instant) -> Decision {
    if state.mode(now) == Mode::ManualHold {
        return Decision::NONE;
    }
    if state.degraded(now) {
        return Decision::NONE;
    }

    // 1. Silence guard.
    if smoothed.db <= state.silence_threshold {
        return Decision::NONE;
    }

    // 2. Rate limit.
    if let Some(last) = state.last_adjust_at {
        if now.duration_since(last) < state.min_adjust_interval {
            return Decision::NONE;
        }
    }

    let Some(v) = state.current_volume else {
        return Decision::NONE;
    };

    let step = state.step as i32;
    let delta = match smoothed.label {
        AudioLabel::Dialogue => {
            let multiplier = (DIALOGUE_MULT_BASE + (smoothed.confidence - 0.25) * 3.0)
                .clamp(1.0, DIALOGUE_MULT_MAX);
            if smoothed.db < state.threshold_quiet {
                (step as f32 * multiplier).round() as i32
            } else if smoothed.db < state.target_db {
                step
            } else {
                0
            }
        }
        AudioLabel::Music => {
            let multiplier = (MUSIC_MULT_BASE + (smoothed.confidence - 0.5) * 1.5)
                .clamp(0.5, MUSIC_MULT_MAX);
            if smoothed.db > state.threshold_loud {
                -((step as f32 * multiplier).round() as i32)
            } else if smoothed.db > state.target_db + 3.0 {
                -step
            } else {
                0
            }
        }
        AudioLabel::Unknown => {
            if smoothed.db > state.threshold_loud {
                -step
            } else if smoothed.db < state.threshold_quiet {
                step
            } else {
                0
            }
        }
    };

    if delta == 0 {
        return Decision::NONE;
    }

    let cap = match smoothed.label {
        AudioLabel::Music => state.hard_max as i32,
        _ => state.baseline_max as i32,
    };

    let proposed = (v as i32 + delta).clamp(state.hard_min as i32, cap);
    if proposed == v as i32 {
        return Decision::NONE;
    }

    Decision {
        new_volume: Some(proposed as u8),
    }
}

/// Direction of a manual key press, `+1` for Up, `-1` for Down.
pub fn decide_manual(state: &ControllerState, direction: i8) -> Decision {
    let Some(v) = state.current_volume else {
        return Decision::NONE;
    };
    let delta = MANUAL_STEP * direction as i32;
    let proposed = (v as i32 + delta).clamp(state.hard_min as i32, state.hard_max as i32);
    if proposed == v as i32 {
        return Decision::NONE;
    }
    Decision {
        new_volume: Some(proposed as u8),
    }
}

/// Records a successful command's effects on state. Call only after
/// `RendererControl::set_volume` has returned `Ok`.
pub fn apply_success(state: &mut ControllerState, new_volume: u8, now: Instant, is_auto: bool) {
    state.current_volume = Some(new_volume);
    if is_auto {
        state.last_adjust_at = Some(now);
    }
    state.consecutive_failures = 0;
    state.degraded_until = None;
}

/// Opens (or extends) the manual-hold window after a manual key press.
pub fn begin_manual_hold(state: &mut ControllerState, now: Instant) {
    state.manual_pause_until = Some(now + MANUAL_PAUSE);
}

/// Shifts `target_db` and the paired thresholds by `delta_db`, used by the
/// manual `+`/`-` keys.
pub fn shift_target(state: &mut ControllerState, delta_db: f32) {
    state.target_db += delta_db;
    state.threshold_loud += delta_db;
    state.threshold_quiet += delta_db;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_state() -> ControllerState {
        ControllerState::new(50, 70, 80, 20, -20.0, -15.0, -35.0, -65.0, 0.4, 5)
    }

    fn smoothed(label: AudioLabel, db: f32, confidence: f32) -> Smoothed {
        Smoothed { db, label, confidence }
    }

    #[test]
    fn silence_never_issues_a_command() {
        let state = base_state();
        let now = Instant::now();
        let decision = decide_auto(&state, &smoothed(AudioLabel::Unknown, -80.0, 0.0), now);
        assert_eq!(decision.new_volume, None);
    }

    #[test]
    fn rate_limit_blocks_a_second_command_too_soon() {
        let mut state = base_state();
        let t0 = Instant::now();
        state.last_adjust_at = Some(t0);
        let decision = decide_auto(&state, &smoothed(AudioLabel::Dialogue, -40.0, 0.8), t0);
        assert_eq!(decision.new_volume, None);
    }

    #[test]
    fn dialogue_below_quiet_threshold_raises_by_multiplier() {
        let state = base_state();
        let now = Instant::now();
        let decision = decide_auto(&state, &smoothed(AudioLabel::Dialogue, -40.0, 0.8), now);
        let new_volume = decision.new_volume.expect("expected a raise");
        assert!(new_volume > 50);
        assert!(new_volume as u32 <= state.baseline_max as u32);
    }

    #[test]
    fn automatic_increase_never_exceeds_baseline_max() {
        let mut state = base_state();
        state.current_volume = Some(69);
        let now = Instant::now();
        let decision = decide_auto(&state, &smoothed(AudioLabel::Dialogue, -60.0, 1.0), now);
        let new_volume = decision.new_volume.unwrap();
        assert!(new_volume as u8 <= state.baseline_max);
    }

    #[test]
    fn automatic_decrease_never_crosses_hard_min() {
        let mut state = base_state();
        state.current_volume = Some(21);
        let now = Instant::now();
        let decision = decide_auto(&state, &smoothed(AudioLabel::Music, -5.0, 1.0), now);
        let new_volume = decision.new_volume.unwrap();
        assert!(new_volume >= state.hard_min);
    }

    #[test]
    fn manual_hold_suppresses_auto_commands() {
        let mut state = base_state();
        let now = Instant::now();
        begin_manual_hold(&mut state, now);
        let decision = decide_auto(&state, &smoothed(AudioLabel::Dialogue, -40.0, 0.9), now);
        assert_eq!(decision.new_volume, None);
    }

    #[test]
    fn manual_command_may_exceed_baseline_max_but_not_hard_max() {
        let mut state = base_state();
        state.current_volume = Some(79);
        let decision = decide_manual(&state, 1);
        let new_volume = decision.new_volume.unwrap();
        assert!(new_volume > state.baseline_max);
        assert!(new_volume <= state.hard_max);
    }

    #[test]
    fn zero_delta_never_issues_a_redundant_set() {
        let mut state = base_state();
        state.current_volume = Some(80);
        let decision = decide_manual(&state, 1);
        assert_eq!(decision.new_volume, None);
    }
}
