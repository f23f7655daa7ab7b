//! In-process [`TabularStore`].
//!
//! Backs `--dry-run`: rows collected during the run stay in memory and are
//! logged instead of being sent anywhere. Tests use it as the store double.

use super::{StoreError, TabularStore};

#[derive(Debug, Default)]
pub struct MemoryStore {
    pub rows: Vec<Vec<String>>,
    /// Number of `append_rows` calls, to check batching.
    pub batch_appends: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already has its header row.
    #[cfg(test)]
    pub fn with_header() -> Self {
        Self {
            rows: vec![crate::config::HEADER_ROW.iter().map(|h| h.to_string()).collect()],
            batch_appends: 0,
        }
    }
}

impl TabularStore for MemoryStore {
    async fn read_all_rows(&mut self) -> Result<Vec<Vec<String>>, StoreError> {
        Ok(self.rows.clone())
    }

    async fn append_row(&mut self, row: Vec<String>) -> Result<(), StoreError> {
        self.rows.push(row);
        Ok(())
    }

    async fn append_rows(&mut self, rows: Vec<Vec<String>>) -> Result<(), StoreError> {
        self.batch_appends += 1;
        self.rows.extend(rows);
        Ok(())
    }
}
