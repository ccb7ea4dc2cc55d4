use std::fmt;

/// half-open byte range `[start, end)` of absolute image offsets
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ByteRange {
    pub start: u32,
    pub end: u32,
}

impl ByteRange {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// number of bytes covered; zero for inverted ranges
    pub fn len(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}..{:#010x}", self.start, self.end)
    }
}

/// a file of the virtual tree with its absolute location in the image
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileRecord {
    /// path relative to the virtual root, `/`-separated
    pub path: String,
    /// allocation table index
    pub id: u32,
    pub range: ByteRange,
}

impl FileRecord {
    pub fn new(path: impl Into<String>, id: u32, range: ByteRange) -> Self {
        Self {
            path: path.into(),
            id,
            range,
        }
    }

    pub fn size(&self) -> u32 {
        self.range.len()
    }
}

impl fmt::Display for FileRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:>10}    {}", self.range, self.size(), self.path)
    }
}

/// name of the extracted file for overlay `index`
pub fn overlay_file_name(index: usize) -> String {
    format!("overlay_{:04}.bin", index)
}
