use std::path::Path;

use log::debug;

use crate::error::{Error, Result};
use crate::fs::ImageFile;
use crate::fst::{decode, DecodedTables};
use crate::header::{Header, Region, HEADER_SIZE};
use crate::image::sys::banner_len;
use crate::types::ByteRange;

/// an existing image with its parsed header
pub struct ImageReader {
    file: ImageFile,
    header: Header,
}

impl ImageReader {
    pub fn open(path: &Path) -> Result<Self> {
        let mut file = ImageFile::open(path)?;
        if file.len() < HEADER_SIZE as u64 {
            return Err(Error::TruncatedInput {
                what: "image header",
                needed: HEADER_SIZE as u64,
                available: file.len(),
            });
        }
        let header = Header::parse(&file.read_at("header", 0, HEADER_SIZE as u64)?)?;
        debug!(
            "opened {}: {:?} ({}), {:#x} bytes",
            path.display(),
            header.title(),
            header.game_code(),
            file.len()
        );
        Ok(Self { file, header })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    /// image length in bytes
    pub fn len(&self) -> u64 {
        self.file.len()
    }

    pub fn is_empty(&self) -> bool {
        self.file.is_empty()
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn read_region(&mut self, what: &str, region: Region) -> Result<Vec<u8>> {
        self.file.read_at(what, region.offset as u64, region.size as u64)
    }

    pub fn read_range(&mut self, what: &str, range: ByteRange) -> Result<Vec<u8>> {
        self.check_range(what, range)?;
        self.file
            .read_at(what, range.start as u64, range.len() as u64)
    }

    /// fail unless `range` is well-formed and inside the image
    pub fn check_range(&self, what: &str, range: ByteRange) -> Result<()> {
        self.file
            .check_range(what, range.start as u64, range.end as u64)
    }

    /// slice out and decode the name and allocation tables
    pub fn tables(&mut self) -> Result<DecodedTables> {
        let fnt = self.read_region("name table", self.header.fnt())?;
        let fat = self.read_region("allocation table", self.header.fat())?;
        decode(&fnt, &fat)
    }

    /// icon/title banner, if the header points at one
    pub fn banner(&mut self) -> Result<Option<Vec<u8>>> {
        let offset = self.header.icon_title_offset() as u64;
        if offset == 0 {
            return Ok(None);
        }
        let version = self.file.read_at("banner version", offset, 2)?;
        let len = banner_len(u16::from_le_bytes([version[0], version[1]]));
        self.file.read_at("banner", offset, len as u64).map(Some)
    }
}
