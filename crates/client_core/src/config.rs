use std::time::Duration;

use anyhow::{anyhow, Result};
use shared::domain::ModeName;

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8080";
pub const DEFAULT_SESSION_MODE: &str = "Martin1";
pub const DEFAULT_PAGE_SIZE: u32 = 15;
pub const MAX_PAGE_SIZE: u32 = 100;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq)]
pub struct ViewerConfig {
    pub server_url: String,
    /// Mode of every image on the live channel; binary frames carry no mode
    /// tag of their own.
    pub session_mode: ModeName,
    pub page_size: u32,
    pub request_timeout: Duration,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.into(),
            session_mode: DEFAULT_SESSION_MODE.into(),
            page_size: DEFAULT_PAGE_SIZE,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl ViewerConfig {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            ..Self::default()
        }
    }

    pub fn effective_page_size(&self) -> u32 {
        self.page_size.clamp(1, MAX_PAGE_SIZE)
    }

    /// Server URL without trailing slash.
    pub fn base_url(&self) -> &str {
        self.server_url.trim().trim_end_matches('/')
    }

    pub fn events_url(&self) -> Result<String> {
        let base = self.base_url();
        let ws_url = if base.starts_with("https://") {
            base.replacen("https://", "wss://", 1)
        } else if base.starts_with("http://") {
            base.replacen("http://", "ws://", 1)
        } else {
            return Err(anyhow!("server_url must start with http:// or https://"));
        };
        Ok(format!("{ws_url}/events"))
    }

    pub fn images_url(&self) -> String {
        format!("{}/images", self.base_url())
    }

    pub fn image_url(&self, id: i64) -> String {
        format!("{}/image/{id}", self.base_url())
    }
}
