//! Cursor-following fetch-all helper
//!
//! Every list endpoint the deployer touches (certificates, distributions,
//! functions, origin access controls, hosted zones) is drained through
//! [`get_all`] so that no reconciler has to reason about cursors.

use crate::error::Result;
use std::future::Future;

/// One page of a cursor-paginated listing.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Opaque cursor for the next page. `None` or empty ends the walk.
    pub next: Option<String>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, next: Option<String>) -> Self {
        Self { items, next }
    }

    pub fn last(items: Vec<T>) -> Self {
        Self { items, next: None }
    }
}

/// Fetch every page and concatenate the items, first page first.
///
/// `fetch` receives the cursor returned by the previous page (`None` for the
/// first call) and the 1-based page number, which callers use for logging.
/// The first error aborts the walk and is returned as-is.
pub async fn get_all<T, F, Fut>(mut fetch: F) -> Result<Vec<T>>
where
    F: FnMut(Option<String>, usize) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    let mut items = Vec::new();
    let mut cursor: Option<String> = None;
    let mut page_number = 1;

    loop {
        let page = fetch(cursor.take(), page_number).await?;
        items.extend(page.items);

        match page.next {
            Some(next) if !next.is_empty() => {
                cursor = Some(next);
                page_number += 1;
            }
            _ => break,
        }
    }

    Ok(items)
}
