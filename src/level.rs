//! Frame assembly (C1) and level metering (C2).

const EPSILON: f32 = 1e-10;
const DB_FLOOR: f32 = -100.0;

/// Groups arbitrary-length PCM chunks from an `AudioSource` into
/// fixed-duration windows of exactly `window_len` samples. Partial
/// remainders are retained between calls; no sample is delivered twice
/// and no window is dropped unless the caller explicitly discards one
/// (see [`FrameAssembler::flush`]).
pub struct FrameAssembler {
    window_len: usize,
    buffer: Vec<f32>,
}

impl FrameAssembler {
    pub fn new(window_len: usize) -> Self {
        Self {
            window_len,
            buffer: Vec::with_capacity(window_len * 2),
        }
    }

    /// Appends a chunk and drains as many complete windows as are now
    /// available. Returns them in capture order.
    pub fn push(&mut self, chunk: &[f32]) -> Vec<Vec<f32>> {
        self.buffer.extend_from_slice(chunk);

        let mut windows = Vec::new();
        while self.buffer.len() >= self.window_len {
            let window: Vec<f32> = self.buffer.drain(..self.window_len).collect();
            windows.push(window);
        }
        windows
    }

    /// Discards any partial remainder, e.g. after the `AudioSource`
    /// signals an overflow. Returns the number of samples discarded so
    /// the caller can report an `AudioOverflow` gap event.
    pub fn flush(&mut self) -> usize {
        let dropped = self.buffer.len();
        self.buffer.clear();
        dropped
    }
}

/// RMS and dBFS for one window. Pure, deterministic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Level {
    pub rms: f32,
    pub db_fs: f32,
}

pub fn measure_level(window: &[f32]) -> Level {
    if window.is_empty() {
        return Level {
            rms: 0.0,
            db_fs: DB_FLOOR,
        };
    }
    let mean_sq: f32 = window.iter().map(|&x| x * x).sum::<f32>() / window.len() as f32;
    let rms = mean_sq.sqrt();
    let db_fs = (20.0 * rms.max(EPSILON).log10()).max(DB_FLOOR);
    Level { rms, db_fs }
}
