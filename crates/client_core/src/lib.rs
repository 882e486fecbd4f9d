use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::{
    domain::{Dimensions, ModeName},
    error::ViewerError,
    modes::ModeRegistry,
    protocol::HistoryEntry,
};
use tokio::{
    sync::{broadcast, mpsc, oneshot, Mutex},
    task::JoinHandle,
};
use tracing::{debug, warn};

pub mod config;
pub mod live;
pub mod pager;
pub mod pixels;
pub mod surfaces;
pub mod transport;
pub mod viewer;

pub use config::ViewerConfig;
pub use live::{LiveFrame, LiveState};
pub use pixels::RasterBuffer;
pub use surfaces::{Placement, Surface, SurfaceHandle, SurfaceOrigin, SurfaceStatus};
pub use transport::{HistorySource, HttpHistorySource};
pub use viewer::{DisplaySnapshot, Viewer};

use pager::PageRequest;
use viewer::PixelRequest;

const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// What a presentation layer needs to keep its picture of the display list
/// current.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    DecodeStarted {
        label: String,
    },
    /// Progress in `[0, 1]`; drops back to 0 when an image completes.
    ProgressChanged {
        fraction: f32,
    },
    SurfaceAllocated {
        handle: SurfaceHandle,
        placement: Placement,
        origin: SurfaceOrigin,
        mode: ModeName,
        /// `None` for a mode the registry does not know.
        dimensions: Option<Dimensions>,
        timestamp: DateTime<Utc>,
    },
    SurfaceRendered {
        handle: SurfaceHandle,
        raster: Arc<RasterBuffer>,
    },
    SurfaceFailed {
        handle: SurfaceHandle,
        error: ViewerError,
    },
    HistoryPageLoaded {
        entries: usize,
        exhausted: bool,
    },
    LiveDisconnected(ViewerError),
    Error(ViewerError),
}

#[async_trait]
pub trait ViewerHandle: Send + Sync {
    async fn connect_live(&self) -> Result<()>;
    fn feed_live_frame(&self, frame: LiveFrame) -> Result<()>;
    fn load_next_page(&self) -> Result<()>;
    fn evict_surface(&self, handle: SurfaceHandle) -> Result<()>;
    async fn snapshot(&self) -> Result<DisplaySnapshot>;
    fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent>;
}

enum LoopMessage {
    LiveConnecting,
    Live(LiveFrame),
    LoadNextPage,
    PageLoaded {
        request: PageRequest,
        result: std::result::Result<Vec<HistoryEntry>, ViewerError>,
    },
    PixelsLoaded {
        request: PixelRequest,
        result: std::result::Result<Vec<u8>, ViewerError>,
    },
    Evict(SurfaceHandle),
    Snapshot(oneshot::Sender<DisplaySnapshot>),
    Shutdown,
}

/// Async shell around [`Viewer`]. One task owns the viewer and applies live
/// frames, page listings and pixel responses one at a time; fetches run as
/// their own tasks and report back through the same queue.
///
/// Must be created inside a Tokio runtime.
pub struct ViewerClient {
    config: ViewerConfig,
    loop_tx: mpsc::UnboundedSender<LoopMessage>,
    events: broadcast::Sender<ClientEvent>,
    live_task: Mutex<Option<JoinHandle<()>>>,
}

impl ViewerClient {
    pub fn spawn(config: ViewerConfig, registry: ModeRegistry) -> Result<Arc<Self>> {
        let source = Arc::new(HttpHistorySource::new(&config)?);
        Ok(Self::spawn_with_source(config, registry, source))
    }

    pub fn spawn_with_source(
        config: ViewerConfig,
        registry: ModeRegistry,
        source: Arc<dyn HistorySource>,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (loop_tx, loop_rx) = mpsc::unbounded_channel();
        let viewer = Viewer::new(registry, &config);
        tokio::spawn(run_event_loop(
            viewer,
            loop_rx,
            loop_tx.clone(),
            source,
            events.clone(),
        ));
        Arc::new(Self {
            config,
            loop_tx,
            events,
            live_task: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    fn enqueue(&self, message: LoopMessage) -> Result<()> {
        self.loop_tx
            .send(message)
            .map_err(|_| anyhow!("viewer event loop has stopped"))
    }
}

impl Drop for ViewerClient {
    fn drop(&mut self) {
        let _ = self.loop_tx.send(LoopMessage::Shutdown);
    }
}

#[async_trait]
impl ViewerHandle for ViewerClient {
    async fn connect_live(&self) -> Result<()> {
        let mut live_task = self.live_task.lock().await;
        if live_task.as_ref().is_some_and(|task| !task.is_finished()) {
            return Err(anyhow!("live channel is already connected"));
        }
        // a failed connect leaves the interpreter as it was
        let reader = transport::connect_live(&self.config).await?;
        self.enqueue(LoopMessage::LiveConnecting)?;
        let loop_tx = self.loop_tx.clone();
        let task = transport::spawn_live_reader(reader, move |frame| {
            loop_tx.send(LoopMessage::Live(frame)).is_ok()
        });
        *live_task = Some(task);
        Ok(())
    }

    fn feed_live_frame(&self, frame: LiveFrame) -> Result<()> {
        self.enqueue(LoopMessage::Live(frame))
    }

    fn load_next_page(&self) -> Result<()> {
        self.enqueue(LoopMessage::LoadNextPage)
    }

    fn evict_surface(&self, handle: SurfaceHandle) -> Result<()> {
        self.enqueue(LoopMessage::Evict(handle))
    }

    async fn snapshot(&self) -> Result<DisplaySnapshot> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.enqueue(LoopMessage::Snapshot(reply_tx))?;
        reply_rx
            .await
            .map_err(|_| anyhow!("viewer event loop dropped snapshot request"))
    }

    fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }
}

async fn run_event_loop(
    mut viewer: Viewer,
    mut inbox: mpsc::UnboundedReceiver<LoopMessage>,
    outbox: mpsc::UnboundedSender<LoopMessage>,
    source: Arc<dyn HistorySource>,
    events: broadcast::Sender<ClientEvent>,
) {
    while let Some(message) = inbox.recv().await {
        match message {
            LoopMessage::LiveConnecting => viewer.restart_live(),
            LoopMessage::Live(frame) => publish(&events, viewer.handle_live(frame, Utc::now())),
            LoopMessage::LoadNextPage => {
                if let Some(request) = viewer.request_page() {
                    spawn_page_fetch(request, &source, &outbox);
                }
            }
            LoopMessage::PageLoaded { request, result } => {
                let outcome = viewer.page_loaded(request, result);
                publish(&events, outcome.events);
                for fetch in outcome.fetches {
                    spawn_pixel_fetch(fetch, &source, &outbox);
                }
            }
            LoopMessage::PixelsLoaded { request, result } => {
                publish(&events, viewer.pixels_loaded(request, result));
            }
            LoopMessage::Evict(handle) => {
                if !viewer.evict(handle) {
                    debug!(handle = handle.0, "viewer: evict for unknown surface");
                }
            }
            LoopMessage::Snapshot(reply) => {
                let _ = reply.send(viewer.snapshot());
            }
            LoopMessage::Shutdown => break,
        }
    }
    debug!("viewer: event loop stopped");
}

fn publish(events: &broadcast::Sender<ClientEvent>, batch: Vec<ClientEvent>) {
    for event in batch {
        let _ = events.send(event);
    }
}

fn spawn_page_fetch(
    request: PageRequest,
    source: &Arc<dyn HistorySource>,
    outbox: &mpsc::UnboundedSender<LoopMessage>,
) {
    let source = Arc::clone(source);
    let outbox = outbox.clone();
    tokio::spawn(async move {
        let result = source.list_images(request).await.map_err(|err| {
            err.downcast::<ViewerError>()
                .unwrap_or_else(|err| ViewerError::HistoryFetchFailed(format!("{err:#}")))
        });
        if outbox
            .send(LoopMessage::PageLoaded { request, result })
            .is_err()
        {
            warn!("history: page arrived after viewer shut down");
        }
    });
}

fn spawn_pixel_fetch(
    request: PixelRequest,
    source: &Arc<dyn HistorySource>,
    outbox: &mpsc::UnboundedSender<LoopMessage>,
) {
    let source = Arc::clone(source);
    let outbox = outbox.clone();
    tokio::spawn(async move {
        let result = source
            .fetch_pixels(request.id)
            .await
            .map_err(|err| ViewerError::PixelFetchFailed {
                id: request.id.0,
                reason: format!("{err:#}"),
            });
        let _ = outbox.send(LoopMessage::PixelsLoaded { request, result });
    });
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
