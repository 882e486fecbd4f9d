//! State machine for the live decode channel.

use shared::{error::ViewerError, protocol::ControlNotification};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveState {
    Idle,
    Decoding,
    /// Terminal. Reconnecting means building a new interpreter.
    Disconnected,
}

/// One frame as delivered by whatever transport carries the live channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveFrame {
    Text(String),
    Binary(Vec<u8>),
    Closed { reason: Option<String> },
}

#[derive(Debug, Clone, PartialEq)]
pub enum LiveOutcome {
    Started { label: String },
    Progress { fraction: f32 },
    ImageCompleted { pixels: Vec<u8> },
    Rejected(ViewerError),
    Disconnected(ViewerError),
    /// Frame arrived after disconnect.
    Ignored,
}

#[derive(Debug)]
pub struct LiveInterpreter {
    state: LiveState,
    progress: f32,
}

impl Default for LiveInterpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl LiveInterpreter {
    pub fn new() -> Self {
        Self {
            state: LiveState::Idle,
            progress: 0.0,
        }
    }

    pub fn state(&self) -> LiveState {
        self.state
    }

    /// Current decode progress in `[0, 1]`.
    pub fn progress(&self) -> f32 {
        self.progress
    }

    pub fn progress_percent(&self) -> f32 {
        self.progress * 100.0
    }

    pub fn handle(&mut self, frame: LiveFrame) -> LiveOutcome {
        if self.state == LiveState::Disconnected {
            return LiveOutcome::Ignored;
        }

        match frame {
            LiveFrame::Text(text) => self.handle_control(&text),
            LiveFrame::Binary(pixels) => {
                if self.state == LiveState::Idle {
                    debug!(
                        bytes = pixels.len(),
                        "live: image payload without decode_start"
                    );
                }
                // re-arms the meter for the next decode; not a completion marker
                self.progress = 0.0;
                self.state = LiveState::Idle;
                LiveOutcome::ImageCompleted { pixels }
            }
            LiveFrame::Closed { reason } => {
                info!(reason = reason.as_deref().unwrap_or(""), "live: channel closed");
                self.state = LiveState::Disconnected;
                LiveOutcome::Disconnected(ViewerError::ChannelClosed { reason })
            }
        }
    }

    fn handle_control(&mut self, text: &str) -> LiveOutcome {
        match ControlNotification::parse(text) {
            Ok(ControlNotification::DecodeStarted { label }) => {
                info!(label = %label, "live: decode started");
                self.state = LiveState::Decoding;
                LiveOutcome::Started { label }
            }
            Ok(ControlNotification::DecodeProgress { fraction }) => {
                if self.state == LiveState::Idle {
                    debug!("live: progress without decode_start, assuming decode in flight");
                    self.state = LiveState::Decoding;
                }
                self.progress = fraction.clamp(0.0, 1.0);
                LiveOutcome::Progress {
                    fraction: self.progress,
                }
            }
            Err(err) => {
                warn!("live: ignoring control message: {err}");
                LiveOutcome::Rejected(err)
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/live_tests.rs"]
mod tests;
