//! Heap page format: fixed-size record slots behind an occupancy bitmap.

use super::page::Page;
use super::page_header::{PageHeader, PageType};

/// Geometry of a heap page for one record size.
///
/// # Layout
/// ```text
/// ┌────────────┬──────────────────┬────────┬────────┬─────┬────────┐
/// │ PageHeader │ occupancy bitmap │ slot 0 │ slot 1 │ ... │ slot N │
/// │  7 bytes   │  ceil(N/8) bytes │        │        │     │        │
/// └────────────┴──────────────────┴────────┴────────┴─────┴────────┘
/// ```
///
/// Each slot costs `record_size` bytes plus one bitmap bit, so
/// `N = floor((page_size - 7) * 8 / (record_size * 8 + 1))`.
/// The record size and every slot number fit in a `u16`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapPageLayout {
    record_size: usize,
    slot_count: usize,
}

impl HeapPageLayout {
    /// Compute the layout.
    ///
    /// Returns `None` if not even one record fits, or if the record size or
    /// a slot number would not fit the `u16` fields that store them.
    pub fn new(page_size: usize, record_size: usize) -> Option<Self> {
        if record_size == 0 || record_size > u16::MAX as usize || page_size <= PageHeader::SIZE {
            return None;
        }
        let slot_count = (page_size - PageHeader::SIZE) * 8 / (record_size * 8 + 1);
        if slot_count == 0 || slot_count > u16::MAX as usize + 1 {
            return None;
        }
        Some(Self {
            record_size,
            slot_count,
        })
    }

    #[inline]
    pub fn record_size(&self) -> usize {
        self.record_size
    }

    #[inline]
    pub fn slot_count(&self) -> usize {
        self.slot_count
    }

    #[inline]
    fn bitmap_len(&self) -> usize {
        self.slot_count.div_ceil(8)
    }

    #[inline]
    fn slot_offset(&self, slot: usize) -> usize {
        PageHeader::SIZE + self.bitmap_len() + slot * self.record_size
    }

    /// Turn an empty page into a heap page with no records.
    pub fn init(&self, page: &mut Page) {
        page.reset();
        page.set_header(&PageHeader::heap(self.record_size as u16));
    }

    /// Whether the page has been initialized as a heap page.
    pub fn is_initialized(&self, page: &Page) -> bool {
        page.header()
            .is_some_and(|header| header.page_type == PageType::Heap)
    }

    pub fn is_used(&self, page: &Page, slot: usize) -> bool {
        if slot >= self.slot_count {
            return false;
        }
        let byte = page.as_slice()[PageHeader::SIZE + slot / 8];
        byte & (1 << (slot % 8)) != 0
    }

    fn set_used(&self, page: &mut Page, slot: usize, used: bool) {
        let byte = &mut page.as_mut_slice()[PageHeader::SIZE + slot / 8];
        if used {
            *byte |= 1 << (slot % 8);
        } else {
            *byte &= !(1 << (slot % 8));
        }
    }

    /// First unused slot, if any.
    pub fn free_slot(&self, page: &Page) -> Option<usize> {
        (0..self.slot_count).find(|&slot| !self.is_used(page, slot))
    }

    pub fn used_count(&self, page: &Page) -> usize {
        (0..self.slot_count)
            .filter(|&slot| self.is_used(page, slot))
            .count()
    }

    /// Bytes of the record in `slot`, if the slot is used.
    pub fn read<'a>(&self, page: &'a Page, slot: usize) -> Option<&'a [u8]> {
        if !self.is_used(page, slot) {
            return None;
        }
        let offset = self.slot_offset(slot);
        Some(&page.as_slice()[offset..offset + self.record_size])
    }

    /// Store `data` in `slot` and mark it used.
    ///
    /// # Panics
    /// Panics if `slot` is out of range or `data` is not `record_size` long.
    pub fn write(&self, page: &mut Page, slot: usize, data: &[u8]) {
        assert!(slot < self.slot_count, "slot out of range");
        assert_eq!(data.len(), self.record_size, "record size mismatch");

        let offset = self.slot_offset(slot);
        page.as_mut_slice()[offset..offset + self.record_size].copy_from_slice(data);
        self.set_used(page, slot, true);
    }

    /// Mark `slot` unused and zero its bytes. Returns false if it was unused.
    pub fn clear(&self, page: &mut Page, slot: usize) -> bool {
        if !self.is_used(page, slot) {
            return false;
        }
        let offset = self.slot_offset(slot);
        page.as_mut_slice()[offset..offset + self.record_size].fill(0);
        self.set_used(page, slot, false);
        true
    }

    /// All used slots and their bytes, in slot order.
    pub fn records(&self, page: &Page) -> Vec<(usize, Vec<u8>)> {
        (0..self.slot_count)
            .filter_map(|slot| self.read(page, slot).map(|data| (slot, data.to_vec())))
            .collect()
    }
}
