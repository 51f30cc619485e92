//! CLI surface and validated startup configuration.

use clap::Parser;

use crate::error::AgcError;

#[derive(Parser, Debug, Clone)]
#[command(name = "agc")]
#[command(about = "Automatic gain control loop for a network media renderer")]
pub struct Args {
    /// Renderer device name to discover on startup.
    #[arg(long, default_value = "AceituTele")]
    pub device: String,

    /// Audio input device index to capture from (default device if unset).
    #[arg(long)]
    pub device_index: Option<usize>,

    /// Lower bound volume commands may never cross.
    #[arg(long = "volume-min", default_value_t = 20)]
    pub volume_min: u8,

    /// Upper bound any command (manual or automatic) may never cross.
    #[arg(long = "volume-max", default_value_t = 80)]
    pub volume_max: u8,

    /// Upper bound that automatic increases must not cross.
    #[arg(long = "volume-baseline-max", default_value_t = 70)]
    pub volume_baseline_max: u8,

    /// dB level above which the auto controller treats audio as loud.
    #[arg(long = "threshold-loud", default_value_t = -15.0)]
    pub threshold_loud: f32,

    /// dB level below which the auto controller treats audio as quiet.
    #[arg(long = "threshold-quiet", default_value_t = -35.0)]
    pub threshold_quiet: f32,

    /// Target dBFS the controller tries to hold dialogue at.
    #[arg(long = "target-db", default_value_t = -20.0)]
    pub target_db: f32,

    /// Volume step size used by automatic and manual commands.
    #[arg(long, default_value_t = 5)]
    pub step: u8,

    /// Window duration, in seconds, analyzed per tick.
    #[arg(long = "chunk-duration", default_value_t = 0.4)]
    pub chunk_duration: f32,

    /// Number of recent windows kept by the history/smoother.
    #[arg(long = "history-len", default_value_t = 5)]
    pub history_len: usize,

    /// Disable the adaptive baseline learned from manual corrections.
    #[arg(long = "no-adaptive")]
    pub no_adaptive: bool,

    /// Disable loading/saving the adaptive baseline across runs.
    #[arg(long = "no-persist")]
    pub no_persist: bool,

    /// Path used to persist the adaptive baseline between runs.
    #[arg(long = "state-file", default_value = "agc-state.json")]
    pub state_file: String,

    /// Print enumerated audio input devices and exit.
    #[arg(long = "list-devices")]
    pub list_devices: bool,
}

/// Validated, immutable snapshot of startup parameters. Constructed once
/// from [`Args`]; invalid combinations are rejected before any thread
/// starts, per the `InvalidConfig` error kind.
#[derive(Debug, Clone)]
pub struct Config {
    pub device: String,
    pub device_index: Option<usize>,
    pub sample_rate: u32,
    pub chunk_duration: f32,
    pub volume_min: u8,
    pub volume_max: u8,
    pub volume_baseline_max: u8,
    pub threshold_loud: f32,
    pub threshold_quiet: f32,
    pub target_db: f32,
    pub step: u8,
    pub history_len: usize,
    pub adaptive: bool,
    pub persist: bool,
    pub state_file: String,
    pub dialogue_threshold: f32,
    pub music_threshold: f32,
}

pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;
pub const DEFAULT_DIALOGUE_THRESHOLD: f32 = 0.15;
pub const DEFAULT_MUSIC_THRESHOLD: f32 = 0.35;

impl Config {
    pub fn from_args(args: &Args) -> Result<Self, AgcError> {
        if args.volume_min > 100 || args.volume_max > 100 || args.volume_baseline_max > 100 {
            return Err(AgcError::InvalidConfig(
                "volume bounds must be within 0..=100".into(),
            ));
        }
        if args.volume_min > args.volume_baseline_max {
            return Err(AgcError::InvalidConfig(
                "volume-min must not exceed volume-baseline-max".into(),
            ));
        }
        if args.volume_baseline_max > args.volume_max {
            return Err(AgcError::InvalidConfig(
                "volume-baseline-max must not exceed volume-max".into(),
            ));
        }
        if args.threshold_quiet >= args.threshold_loud {
            return Err(AgcError::InvalidConfig(
                "threshold-quiet must be below threshold-loud".into(),
            ));
        }
        if !(1..=10).contains(&args.step) {
            return Err(AgcError::InvalidConfig(
                "step must be in 1..=10".into(),
            ));
        }
        if !(0.25..=1.0).contains(&args.chunk_duration) {
            return Err(AgcError::InvalidConfig(
                "chunk-duration must be within [0.25, 1.0] seconds".into(),
            ));
        }
        if args.history_len == 0 {
            return Err(AgcError::InvalidConfig(
                "history-len must be at least 1".into(),
            ));
        }

        Ok(Self {
            device: args.device.clone(),
            device_index: args.device_index,
            sample_rate: DEFAULT_SAMPLE_RATE,
            chunk_duration: args.chunk_duration,
            volume_min: args.volume_min,
            volume_max: args.volume_max,
            volume_baseline_max: args.volume_baseline_max,
            threshold_loud: args.threshold_loud,
            threshold_quiet: args.threshold_quiet,
            target_db: args.target_db,
            step: args.step,
            history_len: args.history_len,
            adaptive: !args.no_adaptive,
            persist: !args.no_persist,
            state_file: args.state_file.clone(),
            dialogue_threshold: DEFAULT_DIALOGUE_THRESHOLD,
            music_threshold: DEFAULT_MUSIC_THRESHOLD,
        })
    }

    /// Window length in samples for the configured sample rate and chunk duration.
    pub fn window_len(&self) -> usize {
        (self.sample_rate as f32 * self.chunk_duration).round() as usize
    }
}
