//! Page-number pagination
//!
//! Requested page numbers come straight from the `?page=` query string and
//! are never an error: anything unusable falls back to page 1, and numbers
//! past the end clamp to the last page.

use serde::Serialize;
use std::num::IntErrorKind;

/// Default number of items per page
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Resolves raw page requests against a total item count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    per_page: i64,
}

impl Default for Paginator {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl Paginator {
    /// A page size below 1 is treated as 1
    pub fn new(per_page: i64) -> Self {
        Self {
            per_page: per_page.max(1),
        }
    }

    pub fn per_page(&self) -> i64 {
        self.per_page
    }

    /// Number of pages for `total` items. An empty collection has one page.
    pub fn num_pages(&self, total: i64) -> i64 {
        if total <= 0 {
            1
        } else {
            (total + self.per_page - 1) / self.per_page
        }
    }

    /// Resolve a raw page request to a concrete window
    pub fn window(&self, total: i64, requested: Option<&str>) -> PageWindow {
        let num_pages = self.num_pages(total);
        let number = requested
            .and_then(|raw| parse_page_number(raw, num_pages))
            .map(|n| n.clamp(1, num_pages))
            .unwrap_or(1);

        PageWindow {
            number,
            num_pages,
            total: total.max(0),
            offset: (number - 1) * self.per_page,
            limit: self.per_page,
        }
    }

    /// Paginate an in-memory collection
    pub fn paginate<T>(&self, items: Vec<T>, requested: Option<&str>) -> Page<T> {
        let window = self.window(items.len() as i64, requested);
        let items = items
            .into_iter()
            .skip(window.offset as usize)
            .take(window.limit as usize)
            .collect();
        Page::new(items, window)
    }
}

/// Integers too wide for `i64` are still out of range, not garbage
fn parse_page_number(raw: &str, num_pages: i64) -> Option<i64> {
    match raw.trim().parse::<i64>() {
        Ok(n) => Some(n),
        Err(e) => match e.kind() {
            IntErrorKind::PosOverflow => Some(num_pages),
            IntErrorKind::NegOverflow => Some(1),
            _ => None,
        },
    }
}

/// A resolved page: which slice of the collection to load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub number: i64,
    pub num_pages: i64,
    pub total: i64,
    pub offset: i64,
    pub limit: i64,
}

/// One page of items plus navigation data for templates
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: i64,
    pub num_pages: i64,
    pub total: i64,
    pub has_next: bool,
    pub has_previous: bool,
    pub next_page_number: Option<i64>,
    pub previous_page_number: Option<i64>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, window: PageWindow) -> Self {
        let has_next = window.number < window.num_pages;
        let has_previous = window.number > 1;
        Self {
            items,
            number: window.number,
            num_pages: window.num_pages,
            total: window.total,
            has_next,
            has_previous,
            next_page_number: has_next.then_some(window.number + 1),
            previous_page_number: has_previous.then_some(window.number - 1),
        }
    }
}

/// Paginate `items` with the given page size and raw page request
pub fn paginate<T>(items: Vec<T>, per_page: i64, requested: Option<&str>) -> Page<T> {
    Paginator::new(per_page).paginate(items, requested)
}
