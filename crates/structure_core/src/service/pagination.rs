//! Batched permission scan and page slicing.
//!
//! # Invariants
//! - A scan stops once it holds `offset + max(count_window, limit)` kept
//!   rows, or when a batch comes back short. A zero limit scans to the end.
//! - `total_results` never exceeds `count_window`.
//! - An offset at or past the kept rows yields an empty page.

use serde::{Deserialize, Serialize};

/// One page of results plus the look-ahead count reported to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginatedList<T> {
    pub items: Vec<T>,
    /// Kept rows available from the offset, capped at the count window.
    pub total_results: usize,
}

impl<T> PaginatedList<T> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }
}

impl<T> Default for PaginatedList<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            total_results: 0,
        }
    }
}

/// Scan limits for a permission-filtered page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub batch_size: u32,
    pub count_window: u32,
    /// `0` means every kept row after `offset`.
    pub limit: u32,
    pub offset: u32,
}

impl PageWindow {
    fn scan_target(&self) -> usize {
        if self.limit == 0 {
            return usize::MAX;
        }
        self.offset as usize + self.count_window.max(self.limit) as usize
    }
}

/// Fetches rows in batches, keeps those passing `keep`, and slices a page.
///
/// `fetch(offset, limit)` must return rows in a stable order.
pub fn scan_page<T, E>(
    window: PageWindow,
    mut fetch: impl FnMut(u32, u32) -> Result<Vec<T>, E>,
    mut keep: impl FnMut(Vec<T>) -> Result<Vec<T>, E>,
) -> Result<PaginatedList<T>, E> {
    let batch_size = window.batch_size.max(1);
    let mut kept: Vec<T> = Vec::new();
    let mut internal_offset: u32 = 0;

    loop {
        let batch = fetch(internal_offset, batch_size)?;
        let short_batch = batch.len() < batch_size as usize;
        kept.extend(keep(batch)?);

        if kept.len() >= window.scan_target() || short_batch {
            break;
        }
        internal_offset = internal_offset.saturating_add(batch_size);
    }

    Ok(slice_page(kept, window.offset, window.limit, window.count_window))
}

/// Slices `[offset, offset + limit)` out of already-filtered rows.
pub fn slice_page<T>(rows: Vec<T>, offset: u32, limit: u32, count_window: u32) -> PaginatedList<T> {
    let offset = offset as usize;
    let available = rows.len().saturating_sub(offset);
    let total_results = available.min(count_window as usize);

    let take = if limit == 0 { available } else { limit as usize };
    let items = rows.into_iter().skip(offset).take(take).collect();

    PaginatedList {
        items,
        total_results,
    }
}
