use std::fmt;
use std::path::Path;

use crate::error::Result;
use crate::image::sys::OVERLAY_DIR;
use crate::image::ImageReader;
use crate::types::{overlay_file_name, ByteRange};

/// what a listed allocation entry holds
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryKind {
    Overlay,
    File,
}

impl EntryKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            EntryKind::Overlay => "overlay",
            EntryKind::File => "file",
        }
    }
}

/// one allocation entry with the path it extracts to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEntry {
    /// allocation id
    pub id: u32,
    pub path: String,
    pub range: ByteRange,
    pub kind: EntryKind,
}

/// list every allocation entry of an image in id order: overlays first, then
/// the files of the tree
pub fn list(image: &Path) -> Result<Vec<ListEntry>> {
    let mut reader = ImageReader::open(image)?;
    let tables = reader.tables()?;

    let mut entries = Vec::with_capacity(tables.overlays.len() + tables.tree.file_count());
    for (i, range) in tables.overlays.iter().enumerate() {
        entries.push(ListEntry {
            id: i as u32,
            path: format!("{}/{}", OVERLAY_DIR, overlay_file_name(i)),
            range: *range,
            kind: EntryKind::Overlay,
        });
    }

    for record in tables.tree.files() {
        entries.push(ListEntry {
            id: record.id,
            path: record.path,
            range: record.range,
            kind: EntryKind::File,
        });
    }

    Ok(entries)
}

impl fmt::Display for ListEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:5} {:7} {} {:>9}    {}",
            self.id,
            self.kind.type_name(),
            self.range,
            self.range.len(),
            self.path
        )
    }
}
