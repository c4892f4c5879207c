//! Page - the raw unit of storage.
//!
//! A [`Page`] is a byte buffer of the page size that was in effect when it
//! was created (see [`page_size`](crate::common::config::page_size)). The
//! buffer pool never interprets page bytes; page sources do.

use crate::common::config::page_size;

use super::page_header::PageHeader;

/// A page of data.
///
/// # Clone Implementation
/// `Page` does NOT implement `Clone`: copying a page is expensive and should
/// be explicit. Use [`Page::duplicate`] or [`Page::copy_from`].
///
/// # Example
/// ```
/// use lockpool::Page;
///
/// let mut page = Page::with_size(64);
/// page.as_mut_slice()[0] = 0xFF;
/// assert_eq!(page.as_slice()[0], 0xFF);
/// ```
#[derive(Debug, PartialEq, Eq)]
pub struct Page {
    data: Box<[u8]>,
}

impl Page {
    /// Create a new zeroed page of the current page size.
    #[inline]
    pub fn new() -> Self {
        Self::with_size(page_size())
    }

    /// Create a new zeroed page of a specific size.
    pub fn with_size(size: usize) -> Self {
        Self {
            data: vec![0u8; size].into_boxed_slice(),
        }
    }

    /// Wrap existing bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            data: bytes.into_boxed_slice(),
        }
    }

    /// Get immutable slice of page data.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Get mutable slice of page data.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Size of this page in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Zero out the entire page.
    pub fn reset(&mut self) {
        self.data.fill(0);
    }

    /// Explicit copy of this page.
    pub fn duplicate(&self) -> Self {
        Self {
            data: self.data.clone(),
        }
    }

    /// Overwrite this page's bytes with `other`'s.
    ///
    /// # Panics
    /// Panics if the pages differ in size.
    pub fn copy_from(&mut self, other: &Page) {
        self.data.copy_from_slice(&other.data);
    }

    /// Read the page header, or `None` if the type byte is unknown.
    pub fn header(&self) -> Option<PageHeader> {
        PageHeader::from_bytes(&self.data)
    }

    /// Write a page header.
    pub fn set_header(&mut self, header: &PageHeader) {
        header.write_to(&mut self.data);
    }

    /// Compute and store checksum in the header.
    ///
    /// Call this after all modifications to the page are complete.
    pub fn update_checksum(&mut self) {
        let checksum = PageHeader::compute_checksum(&self.data);
        self.data[PageHeader::OFFSET_CHECKSUM..PageHeader::OFFSET_CHECKSUM + 4]
            .copy_from_slice(&checksum.to_le_bytes());
    }

    /// Verify the page checksum is valid.
    pub fn verify_checksum(&self) -> bool {
        self.header()
            .is_some_and(|header| header.verify_checksum(&self.data))
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_with_size() {
        let page = Page::with_size(128);
        assert_eq!(page.len(), 128);
        assert!(page.as_slice().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_page_read_write() {
        let mut page = Page::with_size(256);

        page.as_mut_slice()[0] = 0xFF;
        page.as_mut_slice()[255] = 0xCD;

        assert_eq!(page.as_slice()[0], 0xFF);
        assert_eq!(page.as_slice()[255], 0xCD);
    }

    #[test]
    fn test_page_reset() {
        let mut page = Page::with_size(64);
        page.as_mut_slice()[10] = 0xAB;

        page.reset();

        assert_eq!(page.as_slice()[10], 0);
    }

    #[test]
    fn test_duplicate_is_independent() {
        let mut page = Page::with_size(64);
        page.as_mut_slice()[0] = 0xAB;

        let copy = page.duplicate();
        page.as_mut_slice()[0] = 0x01;

        assert_eq!(copy.as_slice()[0], 0xAB);
        assert_eq!(page.as_slice()[0], 0x01);
    }

    #[test]
    fn test_copy_from() {
        let mut src = Page::with_size(64);
        src.as_mut_slice()[3] = 7;
        let mut dst = Page::with_size(64);

        dst.copy_from(&src);
        assert_eq!(dst, src);
    }

    #[test]
    fn test_checksum_roundtrip() {
        let mut page = Page::with_size(128);
        page.set_header(&PageHeader::heap(4));
        page.as_mut_slice()[50] = 9;
        page.update_checksum();
        assert!(page.verify_checksum());

        page.as_mut_slice()[50] = 10;
        assert!(!page.verify_checksum());
    }
}
