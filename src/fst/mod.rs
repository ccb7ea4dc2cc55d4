//! name table and allocation table codec
//!
//! # Name table
//!
//! ```text
//! main table   count x { sub_table_offset: u32, first_file_id: u16, parent: u16 }
//! sub-tables   per directory, records until a zero length byte:
//!                file       len (0x01..=0x7F) | name
//!                directory  0x80 + len | name | 0xF000 | id (u16)
//! ```
//!
//! entry `i` of the main table describes directory `i`. the root entry keeps
//! the number of directories in its parent slot; other entries store
//! `0xF000 | parent`. sub-table offsets are relative to the start of the name
//! table.
//!
//! # Allocation table
//!
//! one `{ start: u32, end: u32 }` pair per allocation id. overlays take ids
//! `0..k`, tree files follow from the root's first file id.

mod decode;
mod encode;

pub use decode::{decode, DecodedTables};
pub use encode::{alloc_table_len, allocate, encode_alloc_table, encode_name_table, BuilderState};

/// size of a main-table entry
pub const MAIN_ENTRY_SIZE: usize = 8;

/// size of an allocation-table entry
pub const ALLOC_ENTRY_SIZE: usize = 8;

/// length byte flag marking a directory record
pub const DIR_FLAG: u8 = 0x80;

/// high nibble of every encoded directory id
pub const DIR_ID_TAG: u16 = 0xF000;

/// mask for the 12-bit directory id
pub const DIR_ID_MASK: u16 = 0x0FFF;

/// fixed-size per-directory descriptor at the head of the name table
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MainEntry {
    /// sub-table offset relative to the name table start
    pub offset: u32,
    /// allocation id of the directory's first file
    pub first_id: u16,
    /// directory count for the root, `0xF000 | parent` otherwise
    pub parent: u16,
}

impl MainEntry {
    /// read an entry from the first 8 bytes of `bytes`
    pub fn read(bytes: &[u8]) -> Self {
        Self {
            offset: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            first_id: u16::from_le_bytes([bytes[4], bytes[5]]),
            parent: u16::from_le_bytes([bytes[6], bytes[7]]),
        }
    }

    pub fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.offset.to_le_bytes());
        out.extend_from_slice(&self.first_id.to_le_bytes());
        out.extend_from_slice(&self.parent.to_le_bytes());
    }
}
