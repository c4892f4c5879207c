//! Records and their locations.

use std::fmt;

use crate::common::PageId;

/// Location of a stored record: its page and slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId {
    pub page: PageId,
    pub slot: u16,
}

impl RecordId {
    #[inline]
    pub fn new(page: PageId, slot: u16) -> Self {
        Self { page, slot }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.page, self.slot)
    }
}

/// An opaque record.
///
/// `id` is `None` until the record is stored; page sources set it on insert
/// and require it on delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub id: Option<RecordId>,
    pub data: Vec<u8>,
}

impl Record {
    /// A record that has not been stored yet.
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            id: None,
            data: data.into(),
        }
    }

    /// A record already stored at `id`.
    pub fn stored(id: RecordId, data: impl Into<Vec<u8>>) -> Self {
        Self {
            id: Some(id),
            data: data.into(),
        }
    }
}
