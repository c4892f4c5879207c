//! Table and page identifier types.

use std::fmt;

/// Identifies a table, and with it the page source that stores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableId(pub u32);

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Table({})", self.0)
    }
}

/// Identifies a page: a table plus a page number within that table.
///
/// Page numbers are dense per table, so page `n` of a file-backed table
/// lives at offset `n × page_size`.
///
/// # Example
/// ```
/// use lockpool::{PageId, TableId};
///
/// let pid = PageId::new(TableId(3), 7);
/// assert_eq!(pid.table, TableId(3));
/// assert_eq!(pid.page_no, 7);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId {
    pub table: TableId,
    pub page_no: u32,
}

impl PageId {
    /// Create a new PageId.
    #[inline]
    pub fn new(table: TableId, page_no: u32) -> Self {
        PageId { table, page_no }
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Page({}/{})", self.table.0, self.page_no)
    }
}
