//! Pre-gain normalizer (C3): scales a window to a target RMS for analysis
//! only. Never mutates the signal that reaches the level meter — the mic
//! may sit a few meters from the source, and classification features are
//! scale-sensitive, so a controlled, capped pre-gain keeps the classifier
//! fed with a consistent level without amplifying noise floor into
//! spurious high-band energy.

const EPSILON: f32 = 1e-10;

pub const DEFAULT_TARGET_RMS: f32 = 0.15;
pub const DEFAULT_MAX_GAIN: f32 = 20.0;

#[derive(Debug, Clone, Copy)]
pub struct Normalizer {
    target_rms: f32,
    max_gain: f32,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self {
            target_rms: DEFAULT_TARGET_RMS,
            max_gain: DEFAULT_MAX_GAIN,
        }
    }
}

impl Normalizer {
    pub fn new(target_rms: f32, max_gain: f32) -> Self {
        Self {
            target_rms,
            max_gain,
        }
    }

    /// Gain that would be applied to a window with the given measured RMS.
    /// Always in `[0, max_gain]`.
    pub fn gain_for(&self, rms: f32) -> f32 {
        (self.target_rms / rms.max(EPSILON)).clamp(0.0, self.max_gain)
    }

    /// Returns a gained copy of `window`, leaving `window` itself untouched.
    pub fn normalize(&self, window: &[f32], rms: f32) -> Vec<f32> {
        let gain = self.gain_for(rms);
        window.iter().map(|&x| x * gain).collect()
    }
}
