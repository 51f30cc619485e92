//! `StatusSink`: consumer of periodic controller snapshots, published at
//! no more than 10 Hz by the core loop.

use std::io::Write;
use std::time::{Duration, Instant};

use crate::classifier::AudioLabel;
use crate::controller::Mode;

#[derive(Debug, Clone, Copy)]
pub struct Snapshot {
    pub volume: Option<u8>,
    pub baseline_max: u8,
    pub db: f32,
    pub label: AudioLabel,
    pub confidence: f32,
    pub mode: Mode,
    pub pause_remaining_s: f32,
    pub target_db: f32,
}

pub trait StatusSink: Send {
    fn publish(&mut self, snapshot: Snapshot);
}

/// Renders the snapshot as a single refreshed terminal line, rate-limited
/// to 10 Hz independent of tick rate.
pub struct ConsoleStatusSink {
    last_published: Option<Instant>,
    min_interval: Duration,
}

impl ConsoleStatusSink {
    pub fn new() -> Self {
        Self {
            last_published: None,
            min_interval: Duration::from_millis(100),
        }
    }
}

impl Default for ConsoleStatusSink {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusSink for ConsoleStatusSink {
    fn publish(&mut self, snapshot: Snapshot) {
        let now = Instant::now();
        if let Some(last) = self.last_published {
            if now.duration_since(last) < self.min_interval {
                return;
            }
        }
        self.last_published = Some(now);

        let label = match snapshot.label {
            AudioLabel::Dialogue => "dialogue",
            AudioLabel::Music => "music",
            AudioLabel::Unknown => "unknown",
        };
        let mode = match snapshot.mode {
            Mode::Auto => "auto",
            Mode::ManualHold => "manual",
        };
        let volume = snapshot
            .volume
            .map(|v| v.to_string())
            .unwrap_or_else(|| "?".to_string());

        print!(
            "\rvol={volume:>3} (max {:>3}) db={:>6.1} label={label:<8} conf={:.2} mode={mode:<6} pause={:>4.1}s target={:.1}  ",
            snapshot.baseline_max, snapshot.db, snapshot.confidence, snapshot.pause_remaining_s, snapshot.target_db,
        );
        let _ = std::io::stdout().flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> Snapshot {
        Snapshot {
            volume: Some(50),
            baseline_max: 70,
            db: -20.0,
            label: AudioLabel::Dialogue,
            confidence: 0.8,
            mode: Mode::Auto,
            pause_remaining_s: 0.0,
            target_db: -20.0,
        }
    }

    #[test]
    fn rate_limits_to_configured_interval() {
        let mut sink = ConsoleStatusSink::new();
        sink.publish(snapshot());
        let first = sink.last_published;
        sink.publish(snapshot());
        assert_eq!(sink.last_published, first);
    }
}
