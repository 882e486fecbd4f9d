use std::{collections::BTreeMap, fmt};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    domain::{ImageId, ModeName},
    error::ViewerError,
};

pub const DECODE_START_TAG: &str = "decode_start";
pub const DECODE_PROGRESS_TAG: &str = "decode_progress";

/// Text frame on the live channel, `"<tag>:<value>"`.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlNotification {
    DecodeStarted { label: String },
    DecodeProgress { fraction: f32 },
}

impl ControlNotification {
    /// Parses one text frame. A bare `decode_start` without separator is a
    /// start with an empty label.
    pub fn parse(raw: &str) -> Result<Self, ViewerError> {
        let (tag, value) = match raw.split_once(':') {
            Some((tag, value)) => (tag, Some(value)),
            None => (raw, None),
        };

        match tag.trim() {
            DECODE_START_TAG => Ok(Self::DecodeStarted {
                label: value.unwrap_or_default().trim().to_string(),
            }),
            DECODE_PROGRESS_TAG => {
                let value = value.ok_or_else(|| ViewerError::malformed(raw, "missing value"))?;
                let fraction = value
                    .trim()
                    .parse::<f32>()
                    .map_err(|err| ViewerError::malformed(raw, err.to_string()))?;
                if !fraction.is_finite() {
                    return Err(ViewerError::malformed(raw, "progress is not finite"));
                }
                Ok(Self::DecodeProgress { fraction })
            }
            other => Err(ViewerError::malformed(
                raw,
                format!("unrecognized tag {other:?}"),
            )),
        }
    }
}

impl fmt::Display for ControlNotification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DecodeStarted { label } => write!(f, "{DECODE_START_TAG}:{label}"),
            Self::DecodeProgress { fraction } => write!(f, "{DECODE_PROGRESS_TAG}:{fraction}"),
        }
    }
}

/// One stored image as returned by the listing query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: ImageId,
    pub mode: ModeName,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub timestamp: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn cursor(&self) -> HistoryCursor {
        HistoryCursor(self.timestamp.timestamp())
    }
}

/// Ordering key for "everything older than this". Seconds since the epoch of
/// the oldest entry already loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HistoryCursor(pub i64);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListImagesQuery {
    pub limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub mode: ModeName,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub timestamp: DateTime<Utc>,
}

/// Body of the listing response. The decoder answers with an object keyed by
/// image id; a plain array of entries is accepted as well.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ImageListing {
    Keyed(BTreeMap<String, ImageRecord>),
    Ordered(Vec<HistoryEntry>),
}

impl ImageListing {
    /// Flattens the listing newest-first: timestamp descending, id descending
    /// on ties.
    pub fn into_entries(self) -> Result<Vec<HistoryEntry>, ViewerError> {
        let mut entries = match self {
            Self::Keyed(records) => records
                .into_iter()
                .map(|(key, record)| {
                    let id = key.trim().parse::<i64>().map_err(|err| {
                        ViewerError::HistoryFetchFailed(format!("invalid image id {key:?}: {err}"))
                    })?;
                    Ok(HistoryEntry {
                        id: ImageId(id),
                        mode: record.mode,
                        timestamp: record.timestamp,
                    })
                })
                .collect::<Result<Vec<_>, ViewerError>>()?,
            Self::Ordered(entries) => entries,
        };
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        Ok(entries)
    }
}
