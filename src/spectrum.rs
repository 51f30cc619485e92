//! Spectral analyzer (C4): a real FFT of the normalized window reduced to
//! fixed-band energy sums, plus the mean/stddev of the half-spectrum used
//! for `spectral_variation`.
//!
//! A Hann window is applied before the FFT and used consistently across
//! every call (the choice between Hann and no window is left open by the
//! requirements; this module picks Hann, as the window function itself
//! trades spectral leakage for a slightly wider main lobe — acceptable
//! here since band sums, not bin-level precision, drive the classifier).

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

const EPSILON: f32 = 1e-10;

/// Fixed frequency bands, in Hz, as half-open intervals `[lo, hi)`.
#[derive(Debug, Clone, Copy)]
pub struct Band {
    pub name: &'static str,
    pub lo: f32,
    pub hi: f32,
}

pub const BANDS: [Band; 6] = [
    Band { name: "bass", lo: 20.0, hi: 200.0 },
    Band { name: "voice_fund", lo: 200.0, hi: 500.0 },
    Band { name: "voice_formants", lo: 500.0, hi: 2000.0 },
    Band { name: "voice_harmonics", lo: 2000.0, hi: 4000.0 },
    Band { name: "high_mid", lo: 4000.0, hi: 8000.0 },
    Band { name: "high", lo: 8000.0, hi: f32::INFINITY },
];

#[derive(Debug, Clone, Copy, Default)]
pub struct SpectrumBands {
    pub total: f32,
    pub bass: f32,
    pub voice_fund: f32,
    pub voice_formants: f32,
    pub voice_harmonics: f32,
    pub high_mid: f32,
    pub high: f32,
    pub mean: f32,
    pub stddev: f32,
}

impl SpectrumBands {
    /// `voice_formants / total`.
    pub fn voice_formants_ratio(&self) -> f32 {
        self.voice_formants / self.total.max(EPSILON)
    }

    /// `(voice_fund + voice_formants + voice_harmonics) / total`.
    pub fn voice_energy_ratio(&self) -> f32 {
        self.voice_energy().sum() / self.total.max(EPSILON)
    }

    pub fn bass_ratio(&self) -> f32 {
        self.bass / self.total.max(EPSILON)
    }

    pub fn high_ratio(&self) -> f32 {
        self.high / self.total.max(EPSILON)
    }

    /// `bass / max(voice energy, ε)`.
    pub fn bass_to_voice(&self) -> f32 {
        self.bass / self.voice_energy().sum().max(EPSILON)
    }

    /// `min(1, (bass + high) / max(voice energy, ε))`. The source's ratio
    /// of this name isn't strictly bounded by 1; this spec clamps it.
    pub fn background_music_ratio(&self) -> f32 {
        ((self.bass + self.high) / self.voice_energy().sum().max(EPSILON)).min(1.0)
    }

    /// `stddev(spectrum) / max(mean(spectrum), ε)`.
    pub fn spectral_variation(&self) -> f32 {
        self.stddev / self.mean.max(EPSILON)
    }

    fn voice_energy(&self) -> VoiceEnergy {
        VoiceEnergy {
            fund: self.voice_fund,
            formants: self.voice_formants,
            harmonics: self.voice_harmonics,
        }
    }
}

struct VoiceEnergy {
    fund: f32,
    formants: f32,
    harmonics: f32,
}

impl VoiceEnergy {
    fn sum(&self) -> f32 {
        self.fund + self.formants + self.harmonics
    }
}

pub struct SpectralAnalyzer {
    sample_rate: f32,
    window_len: usize,
    fft: Arc<dyn Fft<f32>>,
    hann: Vec<f32>,
}

impl SpectralAnalyzer {
    pub fn new(sample_rate: f32, window_len: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(window_len);
        Self {
            sample_rate,
            window_len,
            fft,
            hann: hann_window(window_len),
        }
    }

    /// Runs the FFT on a normalized window and reduces it to `SpectrumBands`.
    /// `samples` is padded with zeros or truncated to `window_len`.
    pub fn analyze(&self, samples: &[f32]) -> SpectrumBands {
        let mut buffer: Vec<Complex<f32>> = (0..self.window_len)
            .map(|i| {
                let x = samples.get(i).copied().unwrap_or(0.0);
                Complex::new(x * self.hann[i], 0.0)
            })
            .collect();

        self.fft.process(&mut buffer);

        let half = self.window_len / 2;
        let magnitudes: Vec<f32> = buffer[..half]
            .iter()
            .map(|c| c.norm() * 2.0 / self.window_len as f32)
            .collect();

        let bin_width = self.sample_rate / self.window_len as f32;
        let mut bands = SpectrumBands {
            total: magnitudes.iter().sum(),
            ..Default::default()
        };

        for (i, &mag) in magnitudes.iter().enumerate() {
            let freq = i as f32 * bin_width;
            if let Some(band) = BANDS.iter().find(|b| freq >= b.lo && freq < b.hi) {
                match band.name {
                    "bass" => bands.bass += mag,
                    "voice_fund" => bands.voice_fund += mag,
                    "voice_formants" => bands.voice_formants += mag,
                    "voice_harmonics" => bands.voice_harmonics += mag,
                    "high_mid" => bands.high_mid += mag,
                    "high" => bands.high += mag,
                    _ => unreachable!(),
                }
            }
        }

        let n = magnitudes.len().max(1) as f32;
        bands.mean = magnitudes.iter().sum::<f32>() / n;
        let variance = magnitudes
            .iter()
            .map(|&m| (m - bands.mean).powi(2))
            .sum::<f32>()
            / n;
        bands.stddev = variance.sqrt();

        bands
    }
}

fn hann_window(size: usize) -> Vec<f32> {
    if size <= 1 {
        return vec![1.0; size];
    }
    (0..size)
        .map(|i| {
            let phase = 2.0 * std::f32::consts::PI * i as f32 / (size - 1) as f32;
            0.5 * (1.0 - phase.cos())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, sample_rate: f32, len: usize, amplitude: f32) -> Vec<f32> {
        (0..len)
            .map(|i| amplitude * (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate).sin())
            .collect()
    }

    #[test]
    fn pure_tone_in_voice_formants_band_dominates_that_band() {
        let sr = 44_100.0;
        let len = 2048;
        let analyzer = SpectralAnalyzer::new(sr, len);
        let samples = sine(1000.0, sr, len, 0.2);
        let bands = analyzer.analyze(&samples);
        assert!(bands.voice_formants > bands.bass);
        assert!(bands.voice_formants > bands.high);
        assert!(bands.voice_formants_ratio() > 0.5);
    }

    #[test]
    fn silence_yields_zero_total_and_safe_ratios() {
        let analyzer = SpectralAnalyzer::new(44_100.0, 1024);
        let bands = analyzer.analyze(&vec![0.0; 1024]);
        assert_eq!(bands.total, 0.0);
        // No division by zero: ratios must stay finite.
        assert!(bands.voice_formants_ratio().is_finite());
        assert!(bands.background_music_ratio().is_finite());
        assert!(bands.bass_to_voice().is_finite());
    }

    #[test]
    fn background_music_ratio_is_clamped_to_one() {
        let sr = 44_100.0;
        let len = 2048;
        let analyzer = SpectralAnalyzer::new(sr, len);
        // Heavy bass, negligible voice energy.
        let samples = sine(80.0, sr, len, 0.5);
        let bands = analyzer.analyze(&samples);
        assert!(bands.background_music_ratio() <= 1.0);
    }
}
