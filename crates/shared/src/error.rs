use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    UnknownMode,
    InvalidMode,
    MalformedControlMessage,
    ShortPixelPayload,
    HistoryFetchFailed,
    PixelFetchFailed,
    ChannelClosed,
}

/// Failures of the viewing pipeline.
///
/// Everything except [`ViewerError::ChannelClosed`] is contained to the single
/// image or history entry it concerns.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ViewerError {
    #[error("unknown mode {0:?}")]
    UnknownMode(String),
    #[error("mode {mode:?} has invalid dimensions {width}x{height}")]
    InvalidMode { mode: String, width: u32, height: u32 },
    #[error("malformed control message {raw:?}: {reason}")]
    MalformedControlMessage { raw: String, reason: String },
    #[error("short pixel payload: {received} of {expected} pixels")]
    ShortPixelPayload { received: usize, expected: usize },
    #[error("history listing failed: {0}")]
    HistoryFetchFailed(String),
    #[error("pixel fetch failed for image {id}: {reason}")]
    PixelFetchFailed { id: i64, reason: String },
    #[error(
        "live channel closed: {}",
        .reason.as_deref().unwrap_or("no reason given")
    )]
    ChannelClosed { reason: Option<String> },
}

impl ViewerError {
    pub fn malformed(raw: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedControlMessage {
            raw: raw.into(),
            reason: reason.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::UnknownMode(_) => ErrorCode::UnknownMode,
            Self::InvalidMode { .. } => ErrorCode::InvalidMode,
            Self::MalformedControlMessage { .. } => ErrorCode::MalformedControlMessage,
            Self::ShortPixelPayload { .. } => ErrorCode::ShortPixelPayload,
            Self::HistoryFetchFailed(_) => ErrorCode::HistoryFetchFailed,
            Self::PixelFetchFailed { .. } => ErrorCode::PixelFetchFailed,
            Self::ChannelClosed { .. } => ErrorCode::ChannelClosed,
        }
    }

    /// Only a closed live channel is reported beyond the pipeline.
    pub fn escalates(&self) -> bool {
        matches!(self, Self::ChannelClosed { .. })
    }
}
