//! Page header and type definitions.
//!
//! Every stored page starts with a [`PageHeader`] containing metadata:
//! - [`PageType`] discriminator
//! - CRC32 checksum for integrity
//! - Record size of the heap page that follows

/// Type of page stored on disk.
///
/// Uses `#[repr(u8)]` to guarantee a 1-byte representation for serialization.
#[repr(u8)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum PageType {
    /// Never written. An all-zero page reads back as `Empty`.
    #[default]
    Empty = 0,
    /// Heap page of fixed-size record slots.
    Heap = 1,
}

impl PageType {
    /// Convert from u8, returning `None` for unknown values.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(PageType::Empty),
            1 => Some(PageType::Heap),
            _ => None,
        }
    }
}

/// Metadata stored at the beginning of every page.
///
/// # Layout (7 bytes)
/// ```text
/// Offset  Size  Field
/// ------  ----  -----
/// 0       1     page_type (PageType as u8)
/// 1       4     checksum (CRC32, little-endian)
/// 5       2     record_size (little-endian)
/// ```
///
/// # Checksum
/// The checksum is computed over the entire page with the checksum field
/// itself set to zero. This allows verification without special handling.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PageHeader {
    /// Type of this page.
    pub page_type: PageType,
    /// CRC32 checksum of the page contents.
    pub checksum: u32,
    /// Size of one record slot in bytes.
    pub record_size: u16,
}

impl PageHeader {
    /// Size of the header in bytes.
    pub const SIZE: usize = 7;

    /// Offset of each field within the header.
    pub const OFFSET_PAGE_TYPE: usize = 0;
    pub const OFFSET_CHECKSUM: usize = 1;
    pub const OFFSET_RECORD_SIZE: usize = 5;

    /// Create a heap page header. The checksum starts at zero.
    pub fn heap(record_size: u16) -> Self {
        Self {
            page_type: PageType::Heap,
            checksum: 0,
            record_size,
        }
    }

    /// Parse the header at the start of `data`.
    ///
    /// `None` for an unknown type byte, which callers treat as corruption.
    ///
    /// # Panics
    /// Panics if `data` is shorter than [`PageHeader::SIZE`].
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        assert!(data.len() >= Self::SIZE, "page shorter than its header");

        Some(Self {
            page_type: PageType::from_u8(data[Self::OFFSET_PAGE_TYPE])?,
            checksum: u32::from_le_bytes(field(data, Self::OFFSET_CHECKSUM)),
            record_size: u16::from_le_bytes(field(data, Self::OFFSET_RECORD_SIZE)),
        })
    }

    /// Serialize into the first [`PageHeader::SIZE`] bytes of `data`.
    pub fn write_to(&self, data: &mut [u8]) {
        assert!(data.len() >= Self::SIZE, "page shorter than its header");

        data[Self::OFFSET_PAGE_TYPE] = self.page_type as u8;
        put(data, Self::OFFSET_CHECKSUM, &self.checksum.to_le_bytes());
        put(data, Self::OFFSET_RECORD_SIZE, &self.record_size.to_le_bytes());
    }

    /// CRC32 of a whole page, with the checksum field read as zeros.
    pub fn compute_checksum(page_data: &[u8]) -> u32 {
        let (head, rest) = page_data.split_at(Self::OFFSET_CHECKSUM);
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(head);
        hasher.update(&0u32.to_le_bytes());
        hasher.update(&rest[4..]);
        hasher.finalize()
    }

    pub fn verify_checksum(&self, page_data: &[u8]) -> bool {
        Self::compute_checksum(page_data) == self.checksum
    }
}

fn field<const N: usize>(data: &[u8], at: usize) -> [u8; N] {
    std::array::from_fn(|i| data[at + i])
}

fn put(data: &mut [u8], at: usize, bytes: &[u8]) {
    data[at..at + bytes.len()].copy_from_slice(bytes);
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_PAGE: usize = 256;

    #[test]
    fn test_page_type_from_u8() {
        assert_eq!(PageType::from_u8(0), Some(PageType::Empty));
        assert_eq!(PageType::from_u8(1), Some(PageType::Heap));
        assert_eq!(PageType::from_u8(255), None);
    }

    #[test]
    fn test_zeroed_bytes_are_empty_header() {
        let buffer = [0u8; PageHeader::SIZE];
        assert_eq!(PageHeader::from_bytes(&buffer), Some(PageHeader::default()));
    }

    #[test]
    fn test_page_header_byte_layout() {
        let header = PageHeader {
            page_type: PageType::Heap,
            checksum: 0x04030201,
            record_size: 0x0201,
        };

        let mut buffer = [0u8; PageHeader::SIZE];
        header.write_to(&mut buffer);

        assert_eq!(buffer[0], 1); // PageType::Heap
        assert_eq!(buffer[1], 0x01); // checksum byte 0 (LSB)
        assert_eq!(buffer[4], 0x04); // checksum byte 3 (MSB)
        assert_eq!(buffer[5], 0x01); // record_size LSB
        assert_eq!(buffer[6], 0x02);

        assert_eq!(PageHeader::from_bytes(&buffer), Some(header));
    }

    #[test]
    fn test_checksum_ignores_checksum_field() {
        let mut page_data = [0u8; TEST_PAGE];
        page_data[100] = 0xAB;

        let checksum1 = PageHeader::compute_checksum(&page_data);
        page_data[1..5].copy_from_slice(&[0xFF; 4]);
        let checksum2 = PageHeader::compute_checksum(&page_data);

        assert_eq!(checksum1, checksum2);
    }

    #[test]
    fn test_checksum_verify() {
        let mut page_data = [0u8; TEST_PAGE];
        page_data[100] = 0xAB;

        let header = PageHeader {
            checksum: PageHeader::compute_checksum(&page_data),
            ..PageHeader::heap(8)
        };
        assert!(header.verify_checksum(&page_data));

        // Corrupt the page
        page_data[100] = 0xFF;
        assert!(!header.verify_checksum(&page_data));
    }
}
