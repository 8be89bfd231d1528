pub mod sheets;

pub use sheets::*;

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{CellUpdate, PendingRow};

/// Seam to the row-oriented persistent store.
///
/// Reads and writes are header-addressed; callers build a header-to-column
/// map once per batch from `header_row` and never rely on column positions
/// beyond that.
#[async_trait]
pub trait RowStore: Send + Sync {
    /// First row of the worksheet, used to map header names to columns
    async fn header_row(&self) -> Result<Vec<String>>;

    /// Up to `max_rows` rows that have a transcript but no audit result yet,
    /// in sheet order
    async fn read_pending(&self, max_rows: usize) -> Result<Vec<PendingRow>>;

    /// Write a batch of header-addressed cell updates. The header map is
    /// built once per batch run from `header_row` and passed back in, so a
    /// run never re-reads the header mid-flight.
    async fn write_batch(
        &self,
        header_map: &HashMap<String, usize>,
        updates: &[CellUpdate],
    ) -> Result<()>;

    /// Append a freshly transcribed call as a new row
    async fn append_transcript(&self, transcript: &str, source: &str) -> Result<()>;
}
