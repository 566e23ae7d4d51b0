//! Page-number pagination.
//!
//! Out-of-range requests are clamped instead of rejected: anything that is
//! not an integer lands on the first page, anything outside `1..=num_pages`
//! lands on the last one. An empty listing still has one (empty) page.

use serde::Serialize;

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    /// One-based page number.
    pub number: u64,
    /// Total number of pages, at least 1.
    pub num_pages: u64,
    /// Total number of items across all pages.
    pub count: u64,
    pub has_previous: bool,
    pub has_next: bool,
    pub previous_page_number: Option<u64>,
    pub next_page_number: Option<u64>,
    /// Items on this page.
    pub items: Vec<T>,
}

impl<T> Page<T> {
    /// Build a page from a resolved page number and its items.
    #[must_use]
    pub fn new(number: u64, num_pages: u64, count: u64, items: Vec<T>) -> Self {
        let has_previous = number > 1;
        let has_next = number < num_pages;
        Self {
            number,
            num_pages,
            count,
            has_previous,
            has_next,
            previous_page_number: has_previous.then(|| number - 1),
            next_page_number: has_next.then(|| number + 1),
            items,
        }
    }

    /// Convert the items, keeping the page bookkeeping.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            number: self.number,
            num_pages: self.num_pages,
            count: self.count,
            has_previous: self.has_previous,
            has_next: self.has_next,
            previous_page_number: self.previous_page_number,
            next_page_number: self.next_page_number,
            items: self.items.into_iter().map(f).collect(),
        }
    }
}

/// Number of pages needed for `count` items.
#[must_use]
pub const fn num_pages(count: u64, per_page: u64) -> u64 {
    if count == 0 {
        1
    } else {
        count.div_ceil(per_page)
    }
}

/// Resolve a raw `page` query value against a listing of `count` items.
///
/// Returns the one-based page number and the number of pages.
#[must_use]
pub fn resolve(page_param: Option<&str>, count: u64, per_page: u64) -> (u64, u64) {
    let per_page = per_page.max(1);
    let num_pages = num_pages(count, per_page);

    let number = match page_param.map(str::trim).map(str::parse::<i64>) {
        None | Some(Err(_)) => 1,
        Some(Ok(n)) => u64::try_from(n)
            .ok()
            .filter(|n| (1..=num_pages).contains(n))
            .unwrap_or(num_pages),
    };

    (number, num_pages)
}
