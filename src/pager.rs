//! Cursor pagination over the object listing.
//!
//! A pager walks one full listing: it starts at [`START_CURSOR`] and stops
//! once the catalog returns an empty cursor. The crawler builds a fresh pager
//! for every pass, which is what makes the scan repeat forever.

use std::sync::Arc;

use crate::catalog::{CatalogError, ProvenanceCatalog};

/// Cursor that starts a listing.
pub const START_CURSOR: &str = "0";

/// Objects requested per page.
pub const PAGE_SIZE: usize = 500;

/// Lazy, single-pass sequence of object id pages.
pub struct ObjectPager<C: ProvenanceCatalog + ?Sized> {
    catalog: Arc<C>,
    cursor: Option<String>,
    pages_fetched: usize,
}

impl<C: ProvenanceCatalog + ?Sized> ObjectPager<C> {
    /// Create a pager positioned at the start of the listing.
    pub fn new(catalog: Arc<C>) -> Self {
        Self {
            catalog,
            cursor: Some(START_CURSOR.to_string()),
            pages_fetched: 0,
        }
    }

    /// Fetch the next page, or `None` once the listing is exhausted.
    ///
    /// An empty page in the middle of a listing is returned as an empty
    /// vector; the pass only ends when the cursor does.
    pub async fn next_page(&mut self) -> Result<Option<Vec<String>>, CatalogError> {
        let Some(cursor) = self.cursor.take() else {
            return Ok(None);
        };

        let page = match self.catalog.list_objects(&cursor, PAGE_SIZE).await {
            Ok(page) => page,
            Err(e) => {
                // Leave the cursor in place; the caller decides whether to retry.
                self.cursor = Some(cursor);
                return Err(e);
            }
        };

        self.pages_fetched += 1;
        tracing::debug!(
            cursor = %cursor,
            ids = page.ids.len(),
            has_next = page.next_cursor.is_some(),
            "Fetched object page"
        );

        self.cursor = page.next_cursor;
        Ok(Some(page.ids))
    }

    /// Rewind to the start of the listing.
    pub fn restart(&mut self) {
        self.cursor = Some(START_CURSOR.to_string());
        self.pages_fetched = 0;
    }

    /// Whether the listing has been fully consumed.
    pub fn is_exhausted(&self) -> bool {
        self.cursor.is_none()
    }

    /// Pages fetched since the last restart.
    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }
}
