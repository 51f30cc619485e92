//! Optional baseline persistence (A7). The core adaptive-baseline
//! behavior (C7) is in-memory only; this is the "optional: dump current
//! adaptive baselines to a config file on exit" allowance, not a change
//! to that behavior's starting point across runs.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::controller::ControllerState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedBaseline {
    pub target_db: f32,
    pub threshold_loud: f32,
    pub threshold_quiet: f32,
    pub baseline_max: u8,
}

impl PersistedBaseline {
    pub fn from_state(state: &ControllerState) -> Self {
        Self {
            target_db: state.target_db,
            threshold_loud: state.threshold_loud,
            threshold_quiet: state.threshold_quiet,
            baseline_max: state.baseline_max,
        }
    }

    pub fn apply(&self, state: &mut ControllerState) {
        state.target_db = self.target_db;
        state.threshold_loud = self.threshold_loud;
        state.threshold_quiet = self.threshold_quiet;
        state.baseline_max = self.baseline_max;
    }
}

/// Best-effort load; any failure (missing file, bad JSON) is treated as
/// "nothing to restore" rather than an error, since this state is purely
/// an optimization of the in-memory baseline's starting point.
pub fn load(path: &str) -> Option<PersistedBaseline> {
    let data = fs::read_to_string(Path::new(path)).ok()?;
    serde_json::from_str(&data).ok()
}

/// Best-effort save; failures are logged by the caller, not propagated,
/// since the core loop must shut down cleanly regardless.
pub fn save(path: &str, baseline: &PersistedBaseline) -> std::io::Result<()> {
    let data = serde_json::to_string_pretty(baseline)?;
    fs::write(path, data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_loads_as_none() {
        assert!(load("/nonexistent/path/agc-state.json").is_none());
    }

    #[test]
    fn round_trips_through_json() {
        let baseline = PersistedBaseline {
            target_db: -18.0,
            threshold_loud: -13.0,
            threshold_quiet: -33.0,
            baseline_max: 70,
        };
        let json = serde_json::to_string(&baseline).unwrap();
        let back: PersistedBaseline = serde_json::from_str(&json).unwrap();
        assert_eq!(back.target_db, baseline.target_db);
        assert_eq!(back.baseline_max, baseline.baseline_max);
    }
}
