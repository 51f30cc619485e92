//! Adaptive baseline (C7): nudges `target_db` and the paired loud/quiet
//! thresholds toward what the user actually wants, learned only from
//! manual volume corrections and never persisted beyond an optional
//! on-disk dump (see `persist`). This is a conservative reconstruction of
//! a loosely specified rule: two *successive* manual nudges in the same
//! direction, made while the signal was already on that side of
//! `target_db`, are read as "the target itself is wrong" rather than
//! "the controller under/overshot once."

use crate::controller::ControllerState;

const STEP_DB: f32 = 1.0;
const MIN_TARGET_DB: f32 = -50.0;
const MAX_TARGET_DB: f32 = -10.0;

#[derive(Debug, Default)]
pub struct AdaptiveBaseline {
    last_direction: Option<i8>,
}

impl AdaptiveBaseline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Call once per manual `Up`/`Down` event, after the command has been
    /// clamped and issued. `direction` is `+1` for Up, `-1` for Down.
    pub fn on_manual_adjustment(
        &mut self,
        direction: i8,
        volume_after: u8,
        smoothed_db: f32,
        state: &mut ControllerState,
    ) {
        let consistent = self.last_direction == Some(direction);
        self.last_direction = Some(direction);

        state.last_manual_volume = Some(volume_after);
        state.last_manual_db = Some(smoothed_db);

        if !consistent {
            return;
        }

        if direction > 0 && smoothed_db >= state.target_db {
            self.nudge(state, STEP_DB);
        } else if direction < 0 && smoothed_db <= state.target_db {
            self.nudge(state, -STEP_DB);
        }
    }

    fn nudge(&self, state: &mut ControllerState, delta: f32) {
        let loud_gap = state.threshold_loud - state.target_db;
        let quiet_gap = state.target_db - state.threshold_quiet;

        state.target_db = (state.target_db + delta).clamp(MIN_TARGET_DB, MAX_TARGET_DB);
        state.threshold_loud = state.target_db + loud_gap;
        state.threshold_quiet = state.target_db - quiet_gap;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::ControllerState;

    fn state() -> ControllerState {
        ControllerState::new(
            50,
            70,
            80,
            20,
            -20.0,
            -15.0,
            -35.0,
            -65.0,
            0.4,
            5,
        )
    }

    #[test]
    fn single_manual_event_does_not_move_target() {
        let mut state = state();
        let mut baseline = AdaptiveBaseline::new();
        baseline.on_manual_adjustment(1, 75, -10.0, &mut state);
        assert_eq!(state.target_db, -20.0);
    }

    #[test]
    fn two_consistent_ups_while_loud_raise_target() {
        let mut state = state();
        let mut baseline = AdaptiveBaseline::new();
        baseline.on_manual_adjustment(1, 75, -10.0, &mut state);
        baseline.on_manual_adjustment(1, 77, -10.0, &mut state);
        assert_eq!(state.target_db, -19.0);
    }

    #[test]
    fn threshold_gap_is_preserved_across_a_nudge() {
        let mut state = state();
        let loud_gap = state.threshold_loud - state.target_db;
        let quiet_gap = state.target_db - state.threshold_quiet;
        let mut baseline = AdaptiveBaseline::new();
        baseline.on_manual_adjustment(1, 75, -10.0, &mut state);
        baseline.on_manual_adjustment(1, 77, -10.0, &mut state);
        assert_eq!(state.threshold_loud - state.target_db, loud_gap);
        assert_eq!(state.target_db - state.threshold_quiet, quiet_gap);
    }

    #[test]
    fn target_db_never_leaves_its_bounds() {
        let mut state = state();
        state.target_db = MAX_TARGET_DB;
        let mut baseline = AdaptiveBaseline::new();
        baseline.on_manual_adjustment(1, 75, -5.0, &mut state);
        baseline.on_manual_adjustment(1, 77, -5.0, &mut state);
        assert!(state.target_db <= MAX_TARGET_DB);
    }

    #[test]
    fn alternating_directions_never_nudge() {
        let mut state = state();
        let mut baseline = AdaptiveBaseline::new();
        baseline.on_manual_adjustment(1, 75, -10.0, &mut state);
        baseline.on_manual_adjustment(-1, 73, -10.0, &mut state);
        assert_eq!(state.target_db, -20.0);
    }
}
