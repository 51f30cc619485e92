//! `RendererControl`: the capability interface for the renderer transport.
//! The actual network protocol (and any CLI-tool fallback) is an external
//! collaborator per the scope notes — this module defines the trait every
//! such backend implements, a retrying wrapper the core loop drives
//! commands through, and `NullRenderer`, a loopback stand-in used by
//! tests and by the reference binary when no real transport is wired up.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use log::{info, warn};
use tokio::time::timeout;

use crate::error::AgcError;

const RENDERER_TIMEOUT: Duration = Duration::from_secs(2);
const BACKOFF: [Duration; 2] = [Duration::from_millis(100), Duration::from_millis(400)];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RendererHandle(pub String);

#[async_trait]
pub trait RendererControl: Send + Sync {
    async fn discover(&self, name: &str) -> Result<RendererHandle, AgcError>;
    async fn get_volume(&self, handle: &RendererHandle) -> Result<u8, AgcError>;
    /// Idempotent: implementations may coalesce repeated identical values.
    async fn set_volume(&self, handle: &RendererHandle, volume: u8) -> Result<(), AgcError>;
    async fn close(&self, handle: RendererHandle);
}

/// Issues `set_volume`, retrying transient failures with the backoff
/// schedule from the error taxonomy (100 ms, 400 ms) before giving up for
/// this tick. Never holds a lock across the call.
pub async fn set_volume_with_retry(
    renderer: &dyn RendererControl,
    handle: &RendererHandle,
    volume: u8,
) -> Result<(), AgcError> {
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        let outcome = timeout(RENDERER_TIMEOUT, renderer.set_volume(handle, volume)).await;
        match outcome {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(e)) => warn!("set_volume attempt {attempt} failed: {e}"),
            Err(_) => warn!("set_volume attempt {attempt} timed out"),
        }
        match BACKOFF.get((attempt - 1) as usize) {
            Some(delay) => tokio::time::sleep(*delay).await,
            None => return Err(AgcError::RendererUnreachable { attempt }),
        }
    }
}

/// Loopback renderer: logs commands and reports them back from
/// `get_volume`, without any real transport. Used for tests and as the
/// default when no renderer backend is configured.
pub struct NullRenderer {
    last_volume: Mutex<Option<u8>>,
}

impl NullRenderer {
    pub fn new() -> Self {
        Self {
            last_volume: Mutex::new(None),
        }
    }
}

impl Default for NullRenderer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RendererControl for NullRenderer {
    async fn discover(&self, name: &str) -> Result<RendererHandle, AgcError> {
        info!("discovered renderer '{name}' (loopback)");
        Ok(RendererHandle(name.to_string()))
    }

    async fn get_volume(&self, _handle: &RendererHandle) -> Result<u8, AgcError> {
        Ok(self.last_volume.lock().unwrap().unwrap_or(50))
    }

    async fn set_volume(&self, handle: &RendererHandle, volume: u8) -> Result<(), AgcError> {
        let mut last = self.last_volume.lock().unwrap();
        if *last == Some(volume) {
            return Ok(());
        }
        info!("{}: volume -> {volume}", handle.0);
        *last = Some(volume);
        Ok(())
    }

    async fn close(&self, handle: RendererHandle) {
        info!("closing renderer handle {}", handle.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_volume_succeeds_first_try() {
        let renderer = NullRenderer::new();
        let handle = renderer.discover("test").await.unwrap();
        set_volume_with_retry(&renderer, &handle, 42).await.unwrap();
        assert_eq!(renderer.get_volume(&handle).await.unwrap(), 42);
    }

    #[tokio::test]
    async fn repeated_identical_set_is_a_no_op() {
        let renderer = NullRenderer::new();
        let handle = renderer.discover("test").await.unwrap();
        renderer.set_volume(&handle, 30).await.unwrap();
        renderer.set_volume(&handle, 30).await.unwrap();
        assert_eq!(renderer.get_volume(&handle).await.unwrap(), 30);
    }

    struct FlakyRenderer {
        failures_left: Mutex<u32>,
    }

    #[async_trait]
    impl RendererControl for FlakyRenderer {
        async fn discover(&self, name: &str) -> Result<RendererHandle, AgcError> {
            Ok(RendererHandle(name.to_string()))
        }
        async fn get_volume(&self, _handle: &RendererHandle) -> Result<u8, AgcError> {
            Ok(0)
        }
        async fn set_volume(&self, _handle: &RendererHandle, _volume: u8) -> Result<(), AgcError> {
            let mut left = self.failures_left.lock().unwrap();
            if *left > 0 {
                *left -= 1;
                return Err(AgcError::RendererUnreachable { attempt: 0 });
            }
            Ok(())
        }
        async fn close(&self, _handle: RendererHandle) {}
    }

    #[tokio::test]
    async fn retries_transient_failures_before_succeeding() {
        let renderer = FlakyRenderer {
            failures_left: Mutex::new(2),
        };
        let handle = RendererHandle("x".into());
        set_volume_with_retry(&renderer, &handle, 10).await.unwrap();
    }

    #[tokio::test]
    async fn gives_up_after_exhausting_the_backoff_schedule() {
        let renderer = FlakyRenderer {
            failures_left: Mutex::new(10),
        };
        let handle = RendererHandle("x".into());
        let result = set_volume_with_retry(&renderer, &handle, 10).await;
        assert!(matches!(result, Err(AgcError::RendererUnreachable { .. })));
    }
}
