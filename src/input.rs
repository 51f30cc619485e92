//! `UserInput`: keyboard event source. Platform-specific key capture is
//! out of scope; this module defines the event set every backend produces
//! plus a real terminal backend over `crossterm`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver};
use crossterm::event::{self, Event, KeyCode};
use crossterm::terminal;
use log::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserEvent {
    VolumeUp,
    VolumeDown,
    BaselineUp,
    BaselineDown,
    Quit,
}

pub trait UserInput: Send {
    fn events(&self) -> Receiver<UserEvent>;
}

fn key_to_event(code: KeyCode) -> Option<UserEvent> {
    match code {
        KeyCode::Up => Some(UserEvent::VolumeUp),
        KeyCode::Down => Some(UserEvent::VolumeDown),
        KeyCode::Char('+') | KeyCode::Char('=') => Some(UserEvent::BaselineUp),
        KeyCode::Char('-') | KeyCode::Char('_') => Some(UserEvent::BaselineDown),
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => Some(UserEvent::Quit),
        KeyCode::Char('c') => None, // handled via crossterm's own Ctrl+C modifier check
        _ => None,
    }
}

/// Raw-mode terminal keyboard backend. Spawns a dedicated polling thread
/// and restores the terminal mode when dropped.
pub struct CrosstermUserInput {
    receiver: Receiver<UserEvent>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl CrosstermUserInput {
    /// `interrupted` is set to `true` right before a Ctrl+C-triggered
    /// `Quit` is sent, distinguishing it from a deliberate `q`/Esc quit so
    /// the core loop can exit 130 instead of 0 (terminal raw mode leaves
    /// `ISIG` disabled, so Ctrl+C arrives here as an ordinary key event
    /// rather than as a process signal).
    pub fn new(interrupted: Arc<AtomicBool>) -> std::io::Result<Self> {
        terminal::enable_raw_mode()?;

        let (sender, receiver) = bounded(32);
        let stop = Arc::new(AtomicBool::new(false));
        let stop_thread = Arc::clone(&stop);

        let handle = std::thread::spawn(move || {
            while !stop_thread.load(Ordering::Relaxed) {
                match event::poll(Duration::from_millis(100)) {
                    Ok(true) => {
                        if let Ok(Event::Key(key)) = event::read() {
                            let is_ctrl_c = key.code == KeyCode::Char('c')
                                && key
                                    .modifiers
                                    .contains(crossterm::event::KeyModifiers::CONTROL);
                            let mapped = if is_ctrl_c {
                                interrupted.store(true, Ordering::Relaxed);
                                Some(UserEvent::Quit)
                            } else {
                                key_to_event(key.code)
                            };
                            if let Some(ev) = mapped {
                                if sender.send(ev).is_err() {
                                    break;
                                }
                            }
                        }
                    }
                    Ok(false) => {}
                    Err(e) => {
                        warn!("terminal input poll failed: {e}");
                        break;
                    }
                }
            }
        });

        Ok(Self {
            receiver,
            stop,
            handle: Some(handle),
        })
    }
}

impl UserInput for CrosstermUserInput {
    fn events(&self) -> Receiver<UserEvent> {
        self.receiver.clone()
    }
}

impl Drop for CrosstermUserInput {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        let _ = terminal::disable_raw_mode();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arrow_keys_map_to_volume_events() {
        assert_eq!(key_to_event(KeyCode::Up), Some(UserEvent::VolumeUp));
        assert_eq!(key_to_event(KeyCode::Down), Some(UserEvent::VolumeDown));
    }

    #[test]
    fn plus_minus_map_to_baseline_events() {
        assert_eq!(key_to_event(KeyCode::Char('+')), Some(UserEvent::BaselineUp));
        assert_eq!(key_to_event(KeyCode::Char('-')), Some(UserEvent::BaselineDown));
    }

    #[test]
    fn q_and_escape_map_to_quit() {
        assert_eq!(key_to_event(KeyCode::Char('q')), Some(UserEvent::Quit));
        assert_eq!(key_to_event(KeyCode::Esc), Some(UserEvent::Quit));
    }

    #[test]
    fn unmapped_keys_are_ignored() {
        assert_eq!(key_to_event(KeyCode::Char('z')), None);
    }
}
