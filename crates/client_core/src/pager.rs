//! Cursor bookkeeping for backward history paging.

use std::collections::HashSet;

use shared::{
    domain::ImageId,
    protocol::{HistoryCursor, HistoryEntry},
};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub before: Option<HistoryCursor>,
    pub limit: u32,
}

#[derive(Debug)]
pub struct HistoryPager {
    page_size: u32,
    cursor: Option<HistoryCursor>,
    in_flight: Option<PageRequest>,
    exhausted: bool,
    seen: HashSet<ImageId>,
    pages_loaded: usize,
}

impl HistoryPager {
    pub fn new(page_size: u32) -> Self {
        Self {
            page_size: page_size.max(1),
            cursor: None,
            in_flight: None,
            exhausted: false,
            seen: HashSet::new(),
            pages_loaded: 0,
        }
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn cursor(&self) -> Option<HistoryCursor> {
        self.cursor
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn pages_loaded(&self) -> usize {
        self.pages_loaded
    }

    /// Next request to issue, or `None` while one is outstanding or history
    /// has run out.
    pub fn begin_page(&mut self) -> Option<PageRequest> {
        if self.exhausted || self.in_flight.is_some() {
            return None;
        }
        let request = PageRequest {
            before: self.cursor,
            limit: self.page_size,
        };
        self.in_flight = Some(request);
        Some(request)
    }

    /// Accepts a newest-first page. Returns the entries not shown before, in
    /// page order, and moves the cursor to the oldest timestamp seen.
    pub fn complete_page(&mut self, request: PageRequest, entries: Vec<HistoryEntry>) -> Vec<HistoryEntry> {
        if self.in_flight != Some(request) {
            debug!("history: dropping page for a request that is no longer current");
            return Vec::new();
        }
        self.in_flight = None;
        self.pages_loaded += 1;

        if entries.len() < self.page_size as usize {
            self.exhausted = true;
        }
        let previous_cursor = self.cursor;
        if let Some(oldest) = entries.iter().map(HistoryEntry::cursor).min() {
            self.cursor = Some(match self.cursor {
                Some(current) => current.min(oldest),
                None => oldest,
            });
        }

        let received = entries.len();
        let fresh: Vec<HistoryEntry> = entries
            .into_iter()
            .filter(|entry| self.seen.insert(entry.id))
            .collect();
        if fresh.len() != received {
            debug!(
                skipped = received - fresh.len(),
                "history: skipped entries already on display"
            );
        }
        // a server filtering with `<=` would hand back this page forever
        if !self.exhausted && fresh.is_empty() && self.cursor == previous_cursor {
            warn!(
                cursor = self.cursor.map(|cursor| cursor.0),
                "history: page brought nothing new, treating history as exhausted"
            );
            self.exhausted = true;
        }
        fresh
    }

    /// Frees the request slot; the cursor stays put so the same page can be
    /// asked for again.
    pub fn fail_page(&mut self, request: PageRequest) {
        if self.in_flight == Some(request) {
            self.in_flight = None;
        }
    }
}

#[cfg(test)]
#[path = "tests/pager_tests.rs"]
mod tests;
