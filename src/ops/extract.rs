use std::fs;
use std::path::Path;

use log::{debug, info};

use crate::error::{Error, IoResultExt, Result};
use crate::fs::write_file;
use crate::header::Region;
use crate::image::sys::{
    ARM7_FILE, ARM7_OVERLAY_FILE, ARM9_FILE, ARM9_OVERLAY_FILE, BANNER_FILE, FILES_DIR,
    HEADER_FILE, OVERLAY_DIR, SYS_DIR,
};
use crate::image::ImageReader;
use crate::types::overlay_file_name;

/// extract options
#[derive(Clone, Debug, Default)]
pub struct ExtractOptions {
    /// extract into a directory that already has content
    pub force: bool,
}

/// summary of a finished extraction
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExtractStats {
    pub directories: usize,
    pub files: usize,
    pub overlays: usize,
    pub bytes_written: u64,
}

/// extract an image into `sys/`, `overlay/` and `files/` under `target`
///
/// every range is checked against the image before the first write.
pub fn extract(image: &Path, target: &Path, opts: &ExtractOptions) -> Result<ExtractStats> {
    let mut reader = ImageReader::open(image)?;
    let header = reader.header().clone();

    if target.exists() && !opts.force {
        let is_empty = target.read_dir().with_path(target)?.next().is_none();
        if !is_empty {
            return Err(Error::TargetNotEmpty(target.to_path_buf()));
        }
    }

    let tables = reader.tables()?;

    // system regions are small, so read them before touching the target
    let arm9 = header.arm9();
    let arm7 = header.arm7();
    let sys_regions = [
        (
            ARM9_FILE,
            reader.read_region("arm9", Region::new(arm9.rom_offset, arm9.size))?,
        ),
        (
            ARM9_OVERLAY_FILE,
            reader.read_region("arm9 overlay table", header.arm9_overlay())?,
        ),
        (
            ARM7_FILE,
            reader.read_region("arm7", Region::new(arm7.rom_offset, arm7.size))?,
        ),
        (
            ARM7_OVERLAY_FILE,
            reader.read_region("arm7 overlay table", header.arm7_overlay())?,
        ),
    ];
    let banner = reader.banner()?;

    for (i, range) in tables.overlays.iter().enumerate() {
        reader.check_range(&overlay_file_name(i), *range)?;
    }
    let files = tables.tree.files();
    for record in &files {
        reader.check_range(&record.path, record.range)?;
    }

    let mut stats = ExtractStats::default();

    let sys = target.join(SYS_DIR);
    write_file(&sys.join(HEADER_FILE), header.raw_bytes())?;
    for (name, bytes) in &sys_regions {
        if *name == ARM7_OVERLAY_FILE && bytes.is_empty() {
            continue;
        }
        write_file(&sys.join(name), bytes)?;
        stats.bytes_written += bytes.len() as u64;
    }
    if let Some(banner) = &banner {
        write_file(&sys.join(BANNER_FILE), banner)?;
        stats.bytes_written += banner.len() as u64;
    }

    let overlay_dir = target.join(OVERLAY_DIR);
    for (i, range) in tables.overlays.iter().enumerate() {
        let name = overlay_file_name(i);
        let data = reader.read_range(&name, *range)?;
        write_file(&overlay_dir.join(&name), &data)?;
        stats.overlays += 1;
        stats.bytes_written += data.len() as u64;
    }

    let files_root = target.join(FILES_DIR);
    fs::create_dir_all(&files_root).with_path(&files_root)?;
    for dir in tables.tree.directory_paths() {
        let path = files_root.join(&dir);
        fs::create_dir_all(&path).with_path(&path)?;
        stats.directories += 1;
    }

    for record in &files {
        let data = reader.read_range(&record.path, record.range)?;
        debug!("writing {} ({} bytes)", record.path, data.len());
        write_file(&files_root.join(&record.path), &data)?;
        stats.files += 1;
        stats.bytes_written += data.len() as u64;
    }

    info!(
        "extracted {} to {} ({} files, {} overlays)",
        image.display(),
        target.display(),
        stats.files,
        stats.overlays
    );
    Ok(stats)
}
