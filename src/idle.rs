//! Network-idle detection from page lifecycle events
//!
//! Chrome reports `networkIdle` for a frame once it has had zero in-flight
//! connections for 500ms. The watcher only accepts that signal for the main
//! frame and only after the frame has started a fresh document (`init`), so
//! a late idle report from the previous `about:blank` document is ignored.

use crate::{Error, Result};
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

/// Lifecycle event name Chrome emits when a new document starts loading
pub const EVENT_INIT: &str = "init";
/// Lifecycle event name for zero connections during the quiet window
pub const EVENT_NETWORK_IDLE: &str = "networkIdle";

/// A page lifecycle notification for one frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleEvent {
    pub frame_id: String,
    pub name: String,
}

impl LifecycleEvent {
    pub fn new(frame_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            frame_id: frame_id.into(),
            name: name.into(),
        }
    }
}

/// Tracks lifecycle events for one frame until it goes idle
#[derive(Debug)]
pub struct IdleWatcher {
    frame_id: String,
    started: bool,
}

impl IdleWatcher {
    pub fn new(frame_id: impl Into<String>) -> Self {
        Self {
            frame_id: frame_id.into(),
            started: false,
        }
    }

    /// Feed one event. Returns `true` once the watched frame is idle.
    pub fn observe(&mut self, event: &LifecycleEvent) -> bool {
        if event.frame_id != self.frame_id {
            return false;
        }
        match event.name.as_str() {
            EVENT_INIT => {
                self.started = true;
                false
            }
            EVENT_NETWORK_IDLE => self.started,
            _ => false,
        }
    }

    /// Block until the frame is idle or `timeout` elapses
    ///
    /// A timeout too large to represent as a deadline waits without one.
    pub fn wait(mut self, events: &Receiver<LifecycleEvent>, timeout: Duration) -> Result<()> {
        let deadline = Instant::now().checked_add(timeout);
        let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);

        loop {
            let next = match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        return Err(Error::LoadTimeout(timeout_ms));
                    }
                    events.recv_timeout(remaining)
                }
                None => events.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };
            match next {
                Ok(event) => {
                    log::trace!("lifecycle {} on frame {}", event.name, event.frame_id);
                    if self.observe(&event) {
                        return Ok(());
                    }
                }
                Err(RecvTimeoutError::Timeout) => return Err(Error::LoadTimeout(timeout_ms)),
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(Error::Load("lifecycle event stream closed".into()))
                }
            }
        }
    }
}
