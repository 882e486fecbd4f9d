//! Synchronous core shared by the live stream and the history pager.
//!
//! Every input is applied to completion before the next one, so the display
//! list needs no locking. I/O lives in [`crate::ViewerClient`]; this type only
//! says what to fetch next and what changed.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use shared::{
    domain::{ImageId, ModeName},
    error::ViewerError,
    modes::ModeRegistry,
    protocol::HistoryEntry,
};
use tracing::{debug, info, warn};

use crate::{
    config::ViewerConfig,
    live::{LiveFrame, LiveInterpreter, LiveOutcome, LiveState},
    pager::{HistoryPager, PageRequest},
    pixels,
    surfaces::{Placement, Surface, SurfaceHandle, SurfaceManager, SurfaceOrigin, WriteOutcome},
    ClientEvent,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRequest {
    pub handle: SurfaceHandle,
    pub id: ImageId,
}

#[derive(Debug, Default)]
pub struct PageOutcome {
    pub fetches: Vec<PixelRequest>,
    pub events: Vec<ClientEvent>,
}

#[derive(Debug, Clone)]
pub struct DisplaySnapshot {
    pub live_state: LiveState,
    pub progress: f32,
    pub history_exhausted: bool,
    /// Front first.
    pub surfaces: Vec<Surface>,
}

#[derive(Debug)]
pub struct Viewer {
    registry: ModeRegistry,
    session_mode: ModeName,
    live: LiveInterpreter,
    pager: HistoryPager,
    surfaces: SurfaceManager,
}

impl Viewer {
    pub fn new(registry: ModeRegistry, config: &ViewerConfig) -> Self {
        if !registry.contains(&config.session_mode) {
            warn!(
                mode = %config.session_mode,
                "viewer: session mode is not registered, live images will be dropped"
            );
        }
        Self {
            registry,
            session_mode: config.session_mode.clone(),
            live: LiveInterpreter::new(),
            pager: HistoryPager::new(config.effective_page_size()),
            surfaces: SurfaceManager::new(),
        }
    }

    pub fn live_state(&self) -> LiveState {
        self.live.state()
    }

    pub fn progress(&self) -> f32 {
        self.live.progress()
    }

    pub fn surfaces(&self) -> &SurfaceManager {
        &self.surfaces
    }

    pub fn pager(&self) -> &HistoryPager {
        &self.pager
    }

    pub fn snapshot(&self) -> DisplaySnapshot {
        DisplaySnapshot {
            live_state: self.live.state(),
            progress: self.live.progress(),
            history_exhausted: self.pager.is_exhausted(),
            surfaces: self.surfaces.iter().cloned().collect(),
        }
    }

    /// Drops a disconnected interpreter ahead of a new live connection.
    pub fn restart_live(&mut self) {
        if self.live.state() != LiveState::Idle {
            debug!(state = ?self.live.state(), "live: resetting interpreter");
        }
        self.live = LiveInterpreter::new();
    }

    pub fn handle_live(&mut self, frame: LiveFrame, now: DateTime<Utc>) -> Vec<ClientEvent> {
        match self.live.handle(frame) {
            LiveOutcome::Started { label } => vec![ClientEvent::DecodeStarted { label }],
            LiveOutcome::Progress { fraction } => vec![ClientEvent::ProgressChanged { fraction }],
            LiveOutcome::ImageCompleted { pixels } => {
                let mut events = vec![ClientEvent::ProgressChanged {
                    fraction: self.live.progress(),
                }];
                self.render_live_image(&pixels, now, &mut events);
                events
            }
            LiveOutcome::Rejected(err) => vec![ClientEvent::Error(err)],
            LiveOutcome::Disconnected(err) => vec![ClientEvent::LiveDisconnected(err)],
            LiveOutcome::Ignored => Vec::new(),
        }
    }

    fn render_live_image(&mut self, pixels: &[u8], now: DateTime<Utc>, events: &mut Vec<ClientEvent>) {
        let dimensions = match self.registry.lookup(&self.session_mode) {
            Ok(dimensions) => dimensions,
            Err(err) => {
                warn!("live: cannot render image: {err}");
                let mode = self.session_mode.clone();
                events.extend(self.allocate_failed(mode, now, SurfaceOrigin::Live, Placement::Front, err));
                return;
            }
        };

        let conversion = pixels::convert(pixels, dimensions);
        if let Some(err) = conversion.shortfall() {
            warn!("live: {err}");
            events.push(ClientEvent::Error(err));
        }

        let handle = self.surfaces.allocate(
            self.session_mode.clone(),
            Some(dimensions),
            now,
            SurfaceOrigin::Live,
            Placement::Front,
        );
        info!(
            handle = handle.0,
            mode = %self.session_mode,
            pixels = conversion.pixels_written,
            "live: image received"
        );
        events.push(ClientEvent::SurfaceAllocated {
            handle,
            placement: Placement::Front,
            origin: SurfaceOrigin::Live,
            mode: self.session_mode.clone(),
            dimensions: Some(dimensions),
            timestamp: now,
        });

        let raster = Arc::new(conversion.raster);
        self.surfaces.write(handle, Arc::clone(&raster));
        events.push(ClientEvent::SurfaceRendered { handle, raster });
    }

    pub fn request_page(&mut self) -> Option<PageRequest> {
        let request = self.pager.begin_page();
        if request.is_none() {
            debug!(
                exhausted = self.pager.is_exhausted(),
                in_flight = self.pager.is_in_flight(),
                "history: page request skipped"
            );
        }
        request
    }

    /// Keeps a slot in the display list for an image that cannot be rendered.
    fn allocate_failed(
        &mut self,
        mode: ModeName,
        timestamp: DateTime<Utc>,
        origin: SurfaceOrigin,
        placement: Placement,
        err: ViewerError,
    ) -> [ClientEvent; 2] {
        let handle = self
            .surfaces
            .allocate(mode.clone(), None, timestamp, origin, placement);
        self.surfaces.mark_failed(handle, err.to_string());
        [
            ClientEvent::SurfaceAllocated {
                handle,
                placement,
                origin,
                mode,
                dimensions: None,
                timestamp,
            },
            ClientEvent::SurfaceFailed { handle, error: err },
        ]
    }

    /// Allocates a back surface for every entry of the page, in page order,
    /// before any pixels are asked for. Entries in an unknown mode get a
    /// failed placeholder and no fetch.
    pub fn page_loaded(
        &mut self,
        request: PageRequest,
        result: Result<Vec<HistoryEntry>, ViewerError>,
    ) -> PageOutcome {
        let entries = match result {
            Ok(entries) => entries,
            Err(err) => {
                warn!("history: {err}");
                self.pager.fail_page(request);
                return PageOutcome {
                    fetches: Vec::new(),
                    events: vec![ClientEvent::Error(err)],
                };
            }
        };

        let mut outcome = PageOutcome::default();
        let fresh = self.pager.complete_page(request, entries);
        let loaded = fresh.len();
        for entry in fresh {
            let origin = SurfaceOrigin::History(entry.id);
            let dimensions = match self.registry.lookup(&entry.mode) {
                Ok(dimensions) => dimensions,
                Err(err) => {
                    warn!(image_id = entry.id.0, "history: cannot render entry: {err}");
                    outcome.events.extend(self.allocate_failed(
                        entry.mode,
                        entry.timestamp,
                        origin,
                        Placement::Back,
                        err,
                    ));
                    continue;
                }
            };
            let handle = self.surfaces.allocate(
                entry.mode.clone(),
                Some(dimensions),
                entry.timestamp,
                origin,
                Placement::Back,
            );
            outcome.events.push(ClientEvent::SurfaceAllocated {
                handle,
                placement: Placement::Back,
                origin,
                mode: entry.mode,
                dimensions: Some(dimensions),
                timestamp: entry.timestamp,
            });
            outcome.fetches.push(PixelRequest {
                handle,
                id: entry.id,
            });
        }

        info!(
            entries = loaded,
            before = request.before.map(|cursor| cursor.0),
            exhausted = self.pager.is_exhausted(),
            "history: page loaded"
        );
        outcome.events.push(ClientEvent::HistoryPageLoaded {
            entries: loaded,
            exhausted: self.pager.is_exhausted(),
        });
        outcome
    }

    pub fn pixels_loaded(
        &mut self,
        request: PixelRequest,
        result: Result<Vec<u8>, ViewerError>,
    ) -> Vec<ClientEvent> {
        let Some(dimensions) = self
            .surfaces
            .get(request.handle)
            .and_then(|surface| surface.dimensions)
        else {
            debug!(
                handle = request.handle.0,
                image_id = request.id.0,
                "history: pixels arrived for evicted surface"
            );
            return Vec::new();
        };

        let pixels = match result {
            Ok(pixels) => pixels,
            Err(err) => {
                warn!(image_id = request.id.0, "history: {err}");
                self.surfaces.mark_failed(request.handle, err.to_string());
                return vec![ClientEvent::SurfaceFailed {
                    handle: request.handle,
                    error: err,
                }];
            }
        };

        let mut events = Vec::new();
        let conversion = pixels::convert(&pixels, dimensions);
        if let Some(err) = conversion.shortfall() {
            warn!(image_id = request.id.0, "history: {err}");
            events.push(ClientEvent::Error(err));
        }
        let raster = Arc::new(conversion.raster);
        if self.surfaces.write(request.handle, Arc::clone(&raster)) == WriteOutcome::Written {
            events.push(ClientEvent::SurfaceRendered {
                handle: request.handle,
                raster,
            });
        }
        events
    }

    pub fn evict(&mut self, handle: SurfaceHandle) -> bool {
        self.surfaces.evict(handle).is_some()
    }
}

#[cfg(test)]
#[path = "tests/viewer_tests.rs"]
mod tests;
