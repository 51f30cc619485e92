//! Error taxonomy for the AGC loop.
//!
//! Kinds, not payload-heavy types: every variant maps to one of the local
//! actions and exit codes described in the design notes (transient faults
//! are retried/degraded, configuration and device-loss faults are fatal).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgcError {
    #[error("renderer unreachable (attempt {attempt})")]
    RendererUnreachable { attempt: u32 },

    #[error("renderer disconnected after repeated failures")]
    RendererDisconnected,

    #[error("renderer not found: {0}")]
    RendererNotFound(String),

    #[error("audio input overflowed, {dropped_samples} samples dropped")]
    AudioOverflow { dropped_samples: usize },

    #[error("audio device lost")]
    AudioDeviceLost,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("interrupted")]
    Interrupted,
}

impl AgcError {
    /// Process exit code this error should produce when fatal, mirroring
    /// the CLI's documented exit codes.
    pub fn exit_code(&self) -> i32 {
        match self {
            AgcError::InvalidConfig(_) => 2,
            AgcError::RendererNotFound(_) => 3,
            AgcError::AudioDeviceLost => 4,
            AgcError::Interrupted => 130,
            // Transient/non-fatal kinds don't terminate the process; callers
            // that need an exit code for one anyway get a generic failure.
            _ => 1,
        }
    }

    /// Whether this error is safe to treat as a local, recoverable event
    /// (logged and surfaced to `StatusSink`) rather than a reason to exit.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AgcError::InvalidConfig(_) | AgcError::AudioDeviceLost | AgcError::Interrupted
        )
    }
}
