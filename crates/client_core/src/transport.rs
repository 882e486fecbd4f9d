//! Network collaborators: the websocket carrying the live channel and the HTTP
//! history endpoints.

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::{stream::SplitStream, StreamExt};
use reqwest::Client;
use shared::{
    domain::ImageId,
    protocol::{HistoryEntry, ImageListing, ListImagesQuery},
};
use tokio::{net::TcpStream, task::JoinHandle};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info};

use crate::{config::ViewerConfig, live::LiveFrame, pager::PageRequest};

#[async_trait]
pub trait HistorySource: Send + Sync {
    /// One page, newest first.
    async fn list_images(&self, request: PageRequest) -> Result<Vec<HistoryEntry>>;
    async fn fetch_pixels(&self, id: ImageId) -> Result<Vec<u8>>;
}

pub struct HttpHistorySource {
    http: Client,
    config: ViewerConfig,
}

impl HttpHistorySource {
    pub fn new(config: &ViewerConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .context("failed to build http client")?;
        Ok(Self {
            http,
            config: config.clone(),
        })
    }
}

#[async_trait]
impl HistorySource for HttpHistorySource {
    async fn list_images(&self, request: PageRequest) -> Result<Vec<HistoryEntry>> {
        let listing: ImageListing = self
            .http
            .get(self.config.images_url())
            .query(&ListImagesQuery {
                limit: request.limit,
                before: request.before.map(|cursor| cursor.0),
            })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("invalid image listing")?;
        Ok(listing.into_entries()?)
    }

    async fn fetch_pixels(&self, id: ImageId) -> Result<Vec<u8>> {
        let bytes = self
            .http
            .get(self.config.image_url(id.0))
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        Ok(bytes.to_vec())
    }
}

/// Maps one websocket message onto a live frame. Control frames other than
/// close carry nothing for the viewer.
pub fn frame_from_message(message: Message) -> Option<LiveFrame> {
    match message {
        Message::Text(text) => Some(LiveFrame::Text(text)),
        Message::Binary(bytes) => Some(LiveFrame::Binary(bytes)),
        Message::Close(frame) => Some(LiveFrame::Closed {
            reason: frame
                .map(|frame| frame.reason.to_string())
                .filter(|reason| !reason.is_empty()),
        }),
        Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => None,
    }
}

pub type LiveReader = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// Opens the websocket at `<server>/events`. Nothing is read until the reader
/// is handed to [`spawn_live_reader`].
pub async fn connect_live(config: &ViewerConfig) -> Result<LiveReader> {
    let ws_url = config.events_url()?;
    let (ws_stream, _) = connect_async(&ws_url)
        .await
        .with_context(|| format!("failed to connect websocket: {ws_url}"))?;
    info!(url = %ws_url, "live: connected");
    let (_, ws_reader) = ws_stream.split();
    Ok(ws_reader)
}

/// Forwards frames in arrival order until the channel closes or `deliver`
/// reports the receiver is gone. The last frame delivered is always a
/// [`LiveFrame::Closed`].
pub fn spawn_live_reader<F>(mut ws_reader: LiveReader, mut deliver: F) -> JoinHandle<()>
where
    F: FnMut(LiveFrame) -> bool + Send + 'static,
{
    tokio::spawn(async move {
        while let Some(message) = ws_reader.next().await {
            let frame = match message {
                Ok(message) => match frame_from_message(message) {
                    Some(frame) => frame,
                    None => continue,
                },
                Err(err) => LiveFrame::Closed {
                    reason: Some(format!("websocket receive failed: {err}")),
                },
            };
            let closed = matches!(frame, LiveFrame::Closed { .. });
            if !deliver(frame) || closed {
                return;
            }
        }
        debug!("live: websocket stream ended without close frame");
        deliver(LiveFrame::Closed { reason: None });
    })
}
