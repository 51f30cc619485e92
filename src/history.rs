//! History / smoother (C6): bounded ring buffers of recent dB readings and
//! classifier results, reduced to a smoothed level and a predominant label.

use std::collections::VecDeque;

use crate::classifier::{AudioLabel, AudioTypeResult};

fn min_samples(label: AudioLabel) -> usize {
    match label {
        AudioLabel::Dialogue => 2,
        AudioLabel::Music => 3,
        AudioLabel::Unknown => 1,
    }
}

pub struct HistoryWindow {
    capacity: usize,
    db_ring: VecDeque<f32>,
    result_ring: VecDeque<AudioTypeResult>,
}

#[derive(Debug, Clone, Copy)]
pub struct Smoothed {
    pub db: f32,
    pub label: AudioLabel,
    pub confidence: f32,
}

impl HistoryWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            db_ring: VecDeque::with_capacity(capacity),
            result_ring: VecDeque::with_capacity(capacity),
        }
    }

    /// Appends a new reading, evicting the oldest if the ring is full.
    /// Never reallocates beyond `capacity`.
    pub fn push(&mut self, db: f32, result: AudioTypeResult) {
        if self.db_ring.len() == self.capacity {
            self.db_ring.pop_front();
        }
        self.db_ring.push_back(db);

        if self.result_ring.len() == self.capacity {
            self.result_ring.pop_front();
        }
        self.result_ring.push_back(result);
    }

    pub fn smoothed(&self) -> Smoothed {
        let db = if self.db_ring.is_empty() {
            0.0
        } else {
            self.db_ring.iter().sum::<f32>() / self.db_ring.len() as f32
        };

        let (label, confidence) = self.predominant_label();

        Smoothed { db, label, confidence }
    }

    fn predominant_label(&self) -> (AudioLabel, f32) {
        let labels = [AudioLabel::Dialogue, AudioLabel::Music, AudioLabel::Unknown];

        let mut best: Option<(AudioLabel, f32, f32)> = None; // (label, weighted_count, confidence_sum)
        let mut counts = [0usize; 3];

        for (idx, &label) in labels.iter().enumerate() {
            let mut weighted_count = 0.0f32;
            let mut confidence_sum = 0.0f32;
            let mut count = 0usize;
            for entry in &self.result_ring {
                if entry.label == label {
                    weighted_count += entry.confidence;
                    confidence_sum += entry.confidence;
                    count += 1;
                }
            }
            counts[idx] = count;
            if count >= min_samples(label) {
                let better = match &best {
                    None => true,
                    Some((_, best_weighted, _)) => weighted_count > *best_weighted,
                };
                if better {
                    best = Some((label, weighted_count, confidence_sum));
                }
            }
        }

        match best {
            Some((label, _, confidence_sum)) => {
                let count = counts[labels.iter().position(|&l| l == label).unwrap()];
                let confidence = if count > 0 {
                    confidence_sum / count as f32
                } else {
                    0.0
                };
                (label, confidence)
            }
            None => (AudioLabel::Unknown, 0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(label: AudioLabel, confidence: f32) -> AudioTypeResult {
        AudioTypeResult {
            label,
            confidence,
            features: crate::spectrum::SpectrumBands::default(),
            dialogue_score: if label == AudioLabel::Dialogue { confidence } else { 0.0 },
            music_score: if label == AudioLabel::Music { confidence } else { 0.0 },
        }
    }

    #[test]
    fn ring_never_grows_past_capacity() {
        let mut h = HistoryWindow::new(3);
        for i in 0..10 {
            h.push(i as f32, result(AudioLabel::Unknown, 0.5));
        }
        assert_eq!(h.db_ring.len(), 3);
        assert_eq!(h.result_ring.len(), 3);
    }

    #[test]
    fn smoothed_db_is_mean_of_ring() {
        let mut h = HistoryWindow::new(4);
        for db in [-10.0, -20.0, -30.0, -40.0] {
            h.push(db, result(AudioLabel::Unknown, 0.2));
        }
        assert_eq!(h.smoothed().db, -25.0);
    }

    #[test]
    fn dialogue_needs_at_least_two_samples() {
        let mut h = HistoryWindow::new(5);
        h.push(-20.0, result(AudioLabel::Dialogue, 0.9));
        // Only one dialogue sample: falls back to Unknown.
        assert_eq!(h.smoothed().label, AudioLabel::Unknown);

        h.push(-20.0, result(AudioLabel::Dialogue, 0.9));
        assert_eq!(h.smoothed().label, AudioLabel::Dialogue);
    }

    #[test]
    fn music_needs_at_least_three_samples() {
        let mut h = HistoryWindow::new(5);
        h.push(-20.0, result(AudioLabel::Music, 0.7));
        h.push(-20.0, result(AudioLabel::Music, 0.7));
        assert_eq!(h.smoothed().label, AudioLabel::Unknown);
        h.push(-20.0, result(AudioLabel::Music, 0.7));
        assert_eq!(h.smoothed().label, AudioLabel::Music);
    }

    #[test]
    fn smoothed_confidence_is_mean_of_winning_label_entries() {
        let mut h = HistoryWindow::new(5);
        h.push(-20.0, result(AudioLabel::Dialogue, 0.6));
        h.push(-20.0, result(AudioLabel::Dialogue, 0.8));
        let smoothed = h.smoothed();
        assert_eq!(smoothed.label, AudioLabel::Dialogue);
        assert!((smoothed.confidence - 0.7).abs() < 1e-6);
    }
}
