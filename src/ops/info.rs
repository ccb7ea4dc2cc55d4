//! image summary

use std::fmt;
use std::path::Path;

use crate::error::Result;
use crate::header::Header;
use crate::image::ImageReader;

/// decoded header plus table statistics
#[derive(Debug)]
pub struct ImageInfo {
    pub header: Header,
    pub image_size: u64,
    pub directories: usize,
    pub files: usize,
    pub overlays: usize,
    /// bytes covered by tree files
    pub file_bytes: u64,
    pub has_banner: bool,
}

/// read an image's header and decode its tables
pub fn info(image: &Path) -> Result<ImageInfo> {
    let mut reader = ImageReader::open(image)?;
    let tables = reader.tables()?;
    let header = reader.header().clone();

    let file_bytes = tables
        .tree
        .files()
        .iter()
        .map(|record| record.size() as u64)
        .sum();

    Ok(ImageInfo {
        has_banner: header.icon_title_offset() != 0,
        header,
        image_size: reader.len(),
        directories: tables.tree.directory_count(),
        files: tables.tree.file_count(),
        overlays: tables.overlays.len(),
        file_bytes,
    })
}

impl fmt::Display for ImageInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let h = &self.header;
        writeln!(f, "title:          {}", h.title())?;
        writeln!(f, "game code:      {}", h.game_code())?;
        writeln!(f, "maker code:     {}", h.maker_code())?;
        writeln!(f, "unit code:      {:#04x}", h.unit_code())?;
        writeln!(f, "version:        {}", h.version())?;
        match h.capacity() {
            Some(cap) => writeln!(f, "capacity:       {:#x} (class {})", cap, h.capacity_class())?,
            None => writeln!(f, "capacity:       invalid (class {})", h.capacity_class())?,
        }
        writeln!(f, "image size:     {:#x}", self.image_size)?;

        for (name, exe) in [("arm9", h.arm9()), ("arm7", h.arm7())] {
            writeln!(
                f,
                "{}:           offset {:#x} size {:#x} entry {:#010x} load {:#010x}",
                name, exe.rom_offset, exe.size, exe.entry_address, exe.load_address
            )?;
        }
        for (name, region) in [
            ("arm9 overlays", h.arm9_overlay()),
            ("arm7 overlays", h.arm7_overlay()),
            ("name table", h.fnt()),
            ("alloc table", h.fat()),
        ] {
            writeln!(f, "{:15} offset {:#x} size {:#x}", format!("{}:", name), region.offset, region.size)?;
        }
        if self.has_banner {
            writeln!(f, "banner:         offset {:#x}", h.icon_title_offset())?;
        } else {
            writeln!(f, "banner:         none")?;
        }

        writeln!(f, "directories:    {}", self.directories)?;
        writeln!(f, "files:          {} ({} bytes)", self.files, self.file_bytes)?;
        write!(f, "overlays:       {}", self.overlays)
    }
}
