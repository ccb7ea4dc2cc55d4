use std::path::Path;

use log::{debug, warn};

use crate::error::{Error, Result};
use crate::fs::{read_optional, read_required};
use crate::header::{Header, HEADER_SIZE};
use crate::types::overlay_file_name;

pub const SYS_DIR: &str = "sys";
pub const FILES_DIR: &str = "files";
pub const OVERLAY_DIR: &str = "overlay";
pub const LAYOUT_FILE: &str = "layout.toml";

pub const HEADER_FILE: &str = "header.bin";
pub const ARM9_FILE: &str = "arm9.bin";
pub const ARM9_OVERLAY_FILE: &str = "arm9_overlay.bin";
pub const ARM7_FILE: &str = "arm7.bin";
pub const ARM7_OVERLAY_FILE: &str = "arm7_overlay.bin";
pub const BANNER_FILE: &str = "banner.bin";

/// banner length for a banner version half-word
pub fn banner_len(version: u16) -> usize {
    match version {
        0x0002 => 0x940,
        0x0003 => 0xA40,
        0x0103 => 0x23C0,
        _ => 0x840,
    }
}

/// everything in an extracted directory except the file tree
#[derive(Clone, Debug)]
pub struct SysFiles {
    pub header: Header,
    pub arm9: Vec<u8>,
    /// overlay table of the first executable
    pub arm9_overlay: Vec<u8>,
    pub arm7: Vec<u8>,
    /// overlay table of the second executable, empty when absent
    pub arm7_overlay: Vec<u8>,
    pub banner: Option<Vec<u8>>,
    /// overlay binaries in allocation id order
    pub overlays: Vec<Vec<u8>>,
}

impl SysFiles {
    /// load `sys/` and `overlay/` from an extracted directory
    pub fn load(root: &Path) -> Result<Self> {
        let sys = root.join(SYS_DIR);

        let header_path = sys.join(HEADER_FILE);
        let raw = read_required(&header_path)?;
        if raw.len() > HEADER_SIZE {
            warn!(
                "{} is {:#x} bytes, using the first {:#x}",
                header_path.display(),
                raw.len(),
                HEADER_SIZE
            );
        }
        let header = Header::parse(&raw)?;

        let arm7_overlay = match read_optional(&sys.join(ARM7_OVERLAY_FILE))? {
            Some(bytes) => bytes,
            None => {
                debug!("no {}, omitting region", ARM7_OVERLAY_FILE);
                Vec::new()
            }
        };

        Ok(Self {
            header,
            arm9: read_required(&sys.join(ARM9_FILE))?,
            arm9_overlay: read_required(&sys.join(ARM9_OVERLAY_FILE))?,
            arm7: read_required(&sys.join(ARM7_FILE))?,
            arm7_overlay,
            banner: read_optional(&sys.join(BANNER_FILE))?,
            overlays: load_overlays(&root.join(OVERLAY_DIR))?,
        })
    }
}

/// read `overlay_0000.bin`, `overlay_0001.bin`, ... until the first gap
///
/// files past a gap cannot be given contiguous ids and are an error.
fn load_overlays(dir: &Path) -> Result<Vec<Vec<u8>>> {
    if !dir.is_dir() {
        debug!("no overlay directory, building without overlays");
        return Ok(Vec::new());
    }

    let mut overlays = Vec::new();
    while let Some(bytes) = read_optional(&dir.join(overlay_file_name(overlays.len())))? {
        overlays.push(bytes);
    }

    let listed = crate::fs::list_dir(dir)?;
    if listed.files.len() > overlays.len() {
        return Err(Error::MissingRequiredInput(
            dir.join(overlay_file_name(overlays.len())),
        ));
    }
    Ok(overlays)
}
