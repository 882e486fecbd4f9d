//! Ordered display list of render surfaces.
//!
//! Position is decided once, at allocation: live images go to the front,
//! history pages to the back. Nothing is reordered afterwards, so pixel data
//! may arrive in any order without disturbing the layout.

use std::{
    collections::{HashMap, VecDeque},
    fmt,
    sync::Arc,
};

use chrono::{DateTime, Utc};
use shared::domain::{Dimensions, ImageId, ModeName};
use tracing::debug;

use crate::pixels::RasterBuffer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceHandle(pub u64);

impl fmt::Display for SurfaceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Front,
    Back,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceOrigin {
    Live,
    History(ImageId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceStatus {
    /// Allocated, pixels not arrived yet.
    Pending,
    Ready,
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct Surface {
    pub handle: SurfaceHandle,
    pub mode: ModeName,
    /// `None` when the mode is not registered; such a surface is allocated
    /// already failed and never receives a raster.
    pub dimensions: Option<Dimensions>,
    pub timestamp: DateTime<Utc>,
    pub origin: SurfaceOrigin,
    pub status: SurfaceStatus,
    pub raster: Option<Arc<RasterBuffer>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    /// The handle was evicted or never existed.
    Discarded,
}

#[derive(Debug, Default)]
pub struct SurfaceManager {
    next_handle: u64,
    order: VecDeque<SurfaceHandle>,
    surfaces: HashMap<SurfaceHandle, Surface>,
}

impl SurfaceManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(
        &mut self,
        mode: ModeName,
        dimensions: Option<Dimensions>,
        timestamp: DateTime<Utc>,
        origin: SurfaceOrigin,
        placement: Placement,
    ) -> SurfaceHandle {
        self.next_handle += 1;
        let handle = SurfaceHandle(self.next_handle);
        match placement {
            Placement::Front => self.order.push_front(handle),
            Placement::Back => self.order.push_back(handle),
        }
        self.surfaces.insert(
            handle,
            Surface {
                handle,
                mode,
                dimensions,
                timestamp,
                origin,
                status: SurfaceStatus::Pending,
                raster: None,
            },
        );
        handle
    }

    /// Replaces the raster shown by `handle`. Writing twice keeps the last one.
    pub fn write(&mut self, handle: SurfaceHandle, raster: Arc<RasterBuffer>) -> WriteOutcome {
        let Some(surface) = self.surfaces.get_mut(&handle) else {
            debug!(handle = handle.0, "surfaces: dropping write to evicted handle");
            return WriteOutcome::Discarded;
        };
        surface.raster = Some(raster);
        surface.status = SurfaceStatus::Ready;
        WriteOutcome::Written
    }

    /// Keeps the surface in place, blank, flagged as failed.
    pub fn mark_failed(&mut self, handle: SurfaceHandle, reason: impl Into<String>) -> WriteOutcome {
        let Some(surface) = self.surfaces.get_mut(&handle) else {
            return WriteOutcome::Discarded;
        };
        surface.status = SurfaceStatus::Failed(reason.into());
        WriteOutcome::Written
    }

    pub fn evict(&mut self, handle: SurfaceHandle) -> Option<Surface> {
        let surface = self.surfaces.remove(&handle)?;
        self.order.retain(|candidate| *candidate != handle);
        Some(surface)
    }

    pub fn get(&self, handle: SurfaceHandle) -> Option<&Surface> {
        self.surfaces.get(&handle)
    }

    /// Surfaces in display order, front first.
    pub fn iter(&self) -> impl Iterator<Item = &Surface> {
        self.order
            .iter()
            .filter_map(|handle| self.surfaces.get(handle))
    }

    pub fn handles(&self) -> Vec<SurfaceHandle> {
        self.order.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
#[path = "tests/surfaces_tests.rs"]
mod tests;
