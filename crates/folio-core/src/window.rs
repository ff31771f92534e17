//! View window calculation.
//!
//! Only a small slice of the visible set is ever materialized for display.
//! Two mutually exclusive modes, chosen once at startup from the dataset size:
//!
//! - **Paged**: fixed-size pages, page index clamped into `[1, max(1, pages)]`
//! - **Virtual**: fixed row height and viewport height; the slice covers the
//!   rows in view plus a buffer of rows on each side
//!
//! Both calculators are pure functions of the visible set's length and the
//! position. They never filter or sort.

use crate::types::ItemId;
use serde::{Deserialize, Serialize};

/// Datasets larger than this use virtual mode.
pub const DEFAULT_VIRTUAL_THRESHOLD: usize = 200;
/// Rows per page in paged mode.
pub const DEFAULT_PAGE_SIZE: usize = 25;
/// Row height in pixels in virtual mode.
pub const DEFAULT_ROW_HEIGHT: u32 = 48;
/// Viewport height in pixels in virtual mode.
pub const DEFAULT_VIEWPORT_HEIGHT: u32 = 720;
/// Extra rows materialized above and below the viewport.
pub const DEFAULT_BUFFER_ROWS: usize = 5;

/// Geometry of a virtually scrolled list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualLayout {
    pub row_height: u32,
    pub viewport_height: u32,
    pub buffer_rows: usize,
}

impl VirtualLayout {
    /// Create a layout; a zero row height is raised to one pixel.
    pub fn new(row_height: u32, viewport_height: u32, buffer_rows: usize) -> Self {
        VirtualLayout {
            row_height: row_height.max(1),
            viewport_height,
            buffer_rows,
        }
    }

    /// Total scrollable height of a list of `total` rows.
    pub fn content_height(&self, total: usize) -> u64 {
        total as u64 * u64::from(self.row_height)
    }

    /// Largest useful scroll offset for a list of `total` rows.
    pub fn max_offset(&self, total: usize) -> u64 {
        self.content_height(total)
            .saturating_sub(u64::from(self.viewport_height))
    }
}

impl Default for VirtualLayout {
    fn default() -> Self {
        VirtualLayout::new(DEFAULT_ROW_HEIGHT, DEFAULT_VIEWPORT_HEIGHT, DEFAULT_BUFFER_ROWS)
    }
}

/// How the visible set is windowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViewMode {
    Paged { page_size: usize },
    Virtual(VirtualLayout),
}

impl ViewMode {
    /// Paged mode; a zero page size is raised to one.
    pub fn paged(page_size: usize) -> Self {
        ViewMode::Paged {
            page_size: page_size.max(1),
        }
    }

    /// Pick the mode for a dataset of `item_count` records.
    pub fn select(item_count: usize, threshold: usize, page_size: usize, layout: VirtualLayout) -> Self {
        if item_count > threshold {
            ViewMode::Virtual(layout)
        } else {
            ViewMode::paged(page_size)
        }
    }

    pub fn is_virtual(&self) -> bool {
        matches!(self, ViewMode::Virtual(_))
    }
}

impl Default for ViewMode {
    fn default() -> Self {
        ViewMode::paged(DEFAULT_PAGE_SIZE)
    }
}

/// Half-open slice `[start, end)` of a visible set of `total` rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WindowRange {
    pub start: usize,
    pub end: usize,
    pub total: usize,
}

impl WindowRange {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Page bookkeeping for paged windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    /// Current 1-based page, after clamping
    pub page: usize,
    /// Number of pages (zero for an empty visible set)
    pub page_count: usize,
    pub page_size: usize,
}

/// The materialized window handed to the renderer.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Window {
    /// Index of the first item within the visible set
    pub start: usize,
    /// Size of the whole visible set
    pub total: usize,
    /// Items to render, in visible-set order
    pub items: Vec<ItemId>,
    /// Page bookkeeping (paged mode only)
    pub page: Option<PageInfo>,
    /// Scrollable height in pixels (virtual mode only)
    pub content_height: Option<u64>,
}

/// Number of pages needed for `total` rows.
pub fn page_count(total: usize, page_size: usize) -> usize {
    let page_size = page_size.max(1);
    (total + page_size - 1) / page_size
}

/// Clamp a requested page into `[1, max(1, page_count)]`.
pub fn clamp_page(page: usize, total: usize, page_size: usize) -> usize {
    page.clamp(1, page_count(total, page_size).max(1))
}

/// Slice for a page of a paged list.
pub fn paged_range(total: usize, page: usize, page_size: usize) -> (WindowRange, PageInfo) {
    let page_size = page_size.max(1);
    let page = clamp_page(page, total, page_size);
    let start = ((page - 1) * page_size).min(total);
    let end = (page * page_size).min(total);

    (
        WindowRange { start, end, total },
        PageInfo {
            page,
            page_count: page_count(total, page_size),
            page_size,
        },
    )
}

/// Slice for a scroll offset of a virtual list.
///
/// Covers `[floor(offset / row) - buffer, ceil((offset + viewport) / row) + buffer)`
/// clamped to `[0, total)`.
pub fn virtual_range(total: usize, offset: u64, layout: &VirtualLayout) -> WindowRange {
    let row = u64::from(layout.row_height.max(1));
    let buffer = layout.buffer_rows as u64;

    let first_visible = offset / row;
    let last_visible = offset
        .saturating_add(u64::from(layout.viewport_height))
        .saturating_add(row - 1)
        / row;

    let start = first_visible.saturating_sub(buffer).min(total as u64) as usize;
    let end = last_visible
        .saturating_add(buffer)
        .min(total as u64)
        .max(start as u64) as usize;

    WindowRange { start, end, total }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_count() {
        assert_eq!(page_count(0, 25), 0);
        assert_eq!(page_count(1, 25), 1);
        assert_eq!(page_count(25, 25), 1);
        assert_eq!(page_count(26, 25), 2);
        assert_eq!(page_count(5, 0), 5);
    }

    #[test]
    fn test_clamp_page() {
        // 2 pages exist, page 5 clamps to 2
        assert_eq!(clamp_page(5, 40, 25), 2);
        assert_eq!(clamp_page(0, 40, 25), 1);
        assert_eq!(clamp_page(3, 0, 25), 1);
    }

    #[test]
    fn test_paged_range() {
        let (range, info) = paged_range(60, 3, 25);
        assert_eq!(range, WindowRange { start: 50, end: 60, total: 60 });
        assert_eq!(info.page, 3);
        assert_eq!(info.page_count, 3);

        let (range, _) = paged_range(0, 1, 25);
        assert!(range.is_empty());
    }

    #[test]
    fn test_pages_cover_visible_set() {
        let total = 103;
        let size = 10;
        let mut covered = Vec::new();
        for page in 1..=page_count(total, size) {
            let (range, _) = paged_range(total, page, size);
            assert!(range.len() <= size);
            covered.extend(range.start..range.end);
        }
        covered.dedup();
        assert_eq!(covered, (0..total).collect::<Vec<_>>());
    }

    #[test]
    fn test_virtual_range() {
        let layout = VirtualLayout::new(50, 500, 5);

        // top of the list: rows 0..10 in view, buffer only below
        assert_eq!(virtual_range(1000, 0, &layout), WindowRange { start: 0, end: 15, total: 1000 });

        // offset 1025: rows 20..31 in view
        assert_eq!(
            virtual_range(1000, 1025, &layout),
            WindowRange { start: 15, end: 36, total: 1000 }
        );

        // bottom of a short list
        assert_eq!(virtual_range(12, 400, &layout), WindowRange { start: 3, end: 12, total: 12 });

        // scrolled past the end
        let range = virtual_range(10, 100_000, &layout);
        assert!(range.is_empty());
        assert_eq!(range.start, 10);

        assert!(virtual_range(0, 0, &layout).is_empty());
    }

    #[test]
    fn test_virtual_range_huge_offset() {
        let layout = VirtualLayout::new(48, 720, 5);
        let range = virtual_range(10, u64::MAX, &layout);
        assert_eq!(range, WindowRange { start: 10, end: 10, total: 10 });
    }

    #[test]
    fn test_virtual_start_monotonic() {
        let layout = VirtualLayout::new(37, 300, 5);
        let mut last = 0;
        for offset in (0..20_000).step_by(13) {
            let range = virtual_range(400, offset, &layout);
            assert!(range.start >= last);
            assert!(range.end <= 400);
            last = range.start;
        }
    }

    #[test]
    fn test_mode_selection() {
        let layout = VirtualLayout::default();
        assert_eq!(ViewMode::select(200, 200, 25, layout), ViewMode::paged(25));
        assert_eq!(ViewMode::select(201, 200, 25, layout), ViewMode::Virtual(layout));
        assert!(ViewMode::select(5000, DEFAULT_VIRTUAL_THRESHOLD, 25, layout).is_virtual());
    }

    #[test]
    fn test_layout_geometry() {
        let layout = VirtualLayout::new(0, 100, 2);
        assert_eq!(layout.row_height, 1);

        let layout = VirtualLayout::new(40, 400, 5);
        assert_eq!(layout.content_height(30), 1200);
        assert_eq!(layout.max_offset(30), 800);
        assert_eq!(layout.max_offset(5), 0);
    }
}
