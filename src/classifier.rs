//! Spectral classifier (C5): scores dialogue vs. music from band features
//! and emits a label, confidence, and the scores that produced it.
//!
//! The scoring rules are heuristic, not learned — each rule nudges one or
//! both accumulators based on a single feature threshold observed to
//! correlate with dialogue or music in practice (formant concentration,
//! bass-to-voice ratio, spectral variation, high-band presence). Dialogue
//! is treated as safety-critical: once asserted it wins ties against
//! music, because intelligibility outranks ambience.

use crate::spectrum::SpectrumBands;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioLabel {
    Dialogue,
    Music,
    Unknown,
}

#[derive(Debug, Clone, Copy)]
pub struct AudioTypeResult {
    pub label: AudioLabel,
    pub confidence: f32,
    pub features: SpectrumBands,
    pub dialogue_score: f32,
    pub music_score: f32,
}

#[derive(Debug, Clone, Copy)]
pub struct ClassifierThresholds {
    pub dialogue: f32,
    pub music: f32,
}

impl Default for ClassifierThresholds {
    fn default() -> Self {
        Self {
            dialogue: crate::config::DEFAULT_DIALOGUE_THRESHOLD,
            music: crate::config::DEFAULT_MUSIC_THRESHOLD,
        }
    }
}

pub fn classify(bands: &SpectrumBands, thresholds: &ClassifierThresholds) -> AudioTypeResult {
    let voice_formants_ratio = bands.voice_formants_ratio();
    let voice_energy_ratio = bands.voice_energy_ratio();
    let bass_to_voice = bands.bass_to_voice();
    let background_music_ratio = bands.background_music_ratio();
    let spectral_variation = bands.spectral_variation();
    let high_ratio = bands.high_ratio();

    let mut dialogue = 0.0f32;
    let mut music = 0.0f32;

    // 1. Formants with low background.
    if voice_formants_ratio > 0.08 && background_music_ratio < 0.20 {
        dialogue += 0.35;
    } else if voice_formants_ratio > 0.05 {
        dialogue += 0.20;
    }

    // 2. Voice energy.
    if voice_energy_ratio > 0.45 {
        dialogue += 0.25;
    } else if voice_energy_ratio > 0.30 {
        dialogue += 0.15;
    }

    // 3. Bass-to-voice.
    if bass_to_voice < 0.5 {
        dialogue += 0.15;
    }
    if bass_to_voice > 1.5 {
        music += 0.25;
    }

    // 4. Background-music presence.
    if background_music_ratio > 0.40 {
        music += 0.30;
    }

    // 5. Spectral variation.
    if spectral_variation < 0.8 {
        dialogue += 0.10;
    }
    if spectral_variation > 1.5 {
        music += 0.15;
    }

    // 6. High-band presence.
    if high_ratio > 0.15 {
        music += 0.10;
    }

    let dialogue = dialogue.clamp(0.0, 1.0);
    let music = music.clamp(0.0, 1.0);

    let (label, confidence) = if dialogue >= thresholds.dialogue && dialogue > music {
        (AudioLabel::Dialogue, dialogue)
    } else if music >= thresholds.music && music > dialogue {
        (AudioLabel::Music, music)
    } else {
        (AudioLabel::Unknown, dialogue.max(music))
    };

    AudioTypeResult {
        label,
        confidence,
        features: *bands,
        dialogue_score: dialogue,
        music_score: music,
    }
}
