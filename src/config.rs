use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, IoResultExt, Result};

/// placement rules used when assembling an image, stored as layout.toml
///
/// the executable alignment differs between format revisions, so every
/// boundary is configurable and should be checked against a known-good image.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Layout {
    /// bytes reserved for the header before the first executable
    pub header_region: u32,
    /// boundary after the first executable
    pub arm9_align: u32,
    /// boundary after the first executable's overlay table and each overlay binary
    pub overlay_align: u32,
    /// boundary before the second executable
    pub arm7_align: u32,
    /// boundary before the second executable's overlay table and the name/allocation tables
    pub table_align: u32,
    /// boundary before the icon/title banner
    pub banner_align: u32,
    /// boundary before every file payload
    pub file_align: u32,
    /// byte used for all padding outside the header region
    pub fill: u8,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            header_region: 0x4000,
            arm9_align: 0x10,
            overlay_align: 0x100,
            arm7_align: 0x1000,
            table_align: 4,
            banner_align: 0x200,
            file_align: 4,
            fill: 0xFF,
        }
    }
}

impl Layout {
    /// load layout from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).with_path(path)?;
        let layout: Layout = toml::from_str(&content)?;
        layout.validate()?;
        Ok(layout)
    }

    /// save layout to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).with_path(path)?;
        Ok(())
    }

    /// every alignment must be non-zero and the header must fit its region
    pub fn validate(&self) -> Result<()> {
        let aligns = [
            ("arm9_align", self.arm9_align),
            ("overlay_align", self.overlay_align),
            ("arm7_align", self.arm7_align),
            ("table_align", self.table_align),
            ("banner_align", self.banner_align),
            ("file_align", self.file_align),
        ];
        for (name, value) in aligns {
            if value == 0 {
                return Err(Error::InvalidLayout(format!("{} must be non-zero", name)));
            }
        }
        if (self.header_region as usize) < crate::header::HEADER_SIZE {
            return Err(Error::InvalidLayout(format!(
                "header_region {:#x} is smaller than the header",
                self.header_region
            )));
        }
        Ok(())
    }
}

/// round `value` up to the next multiple of `align`
pub fn align_up(value: u64, align: u32) -> u64 {
    let align = align.max(1) as u64;
    value.div_ceil(align) * align
}
