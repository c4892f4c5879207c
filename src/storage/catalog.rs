//! Registry of page sources by table.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::common::{Error, Result, TableId};
use crate::storage::PageSource;

/// Maps table ids to the sources that store them.
#[derive(Default)]
pub struct Catalog {
    sources: RwLock<HashMap<TableId, Arc<dyn PageSource>>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source under its own table id.
    ///
    /// Returns the source it replaced, if any.
    pub fn add_table(&self, source: Arc<dyn PageSource>) -> Option<Arc<dyn PageSource>> {
        let table = source.table_id();
        self.sources.write().insert(table, source)
    }

    pub fn remove_table(&self, table: TableId) -> Option<Arc<dyn PageSource>> {
        self.sources.write().remove(&table)
    }

    /// Look up the source of `table`.
    ///
    /// # Errors
    /// - `Error::UnknownTable` if nothing is registered for it
    pub fn source(&self, table: TableId) -> Result<Arc<dyn PageSource>> {
        self.sources
            .read()
            .get(&table)
            .cloned()
            .ok_or(Error::UnknownTable(table))
    }

    /// Registered table ids, ascending.
    pub fn table_ids(&self) -> Vec<TableId> {
        let mut ids: Vec<TableId> = self.sources.read().keys().copied().collect();
        ids.sort();
        ids
    }
}

impl fmt::Debug for Catalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Catalog")
            .field("tables", &self.table_ids())
            .finish()
    }
}
