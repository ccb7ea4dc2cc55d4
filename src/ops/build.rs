use std::fs;
use std::path::Path;

use log::{debug, info};

use crate::config::Layout;
use crate::error::{Error, IoResultExt, Result};
use crate::fs::{scan_tree, write_file};
use crate::image::sys::{FILES_DIR, LAYOUT_FILE};
use crate::image::{assemble, SysFiles};

/// summary of a finished build
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BuildStats {
    pub directories: usize,
    pub files: usize,
    pub overlays: usize,
    pub image_size: u64,
}

/// pick the layout for a build: an explicit file, else `layout.toml` in the
/// extracted directory, else the defaults
pub fn resolve_layout(source: &Path, explicit: Option<&Path>) -> Result<Layout> {
    if let Some(path) = explicit {
        return Layout::load(path);
    }
    let candidate = source.join(LAYOUT_FILE);
    if candidate.is_file() {
        debug!("using layout from {}", candidate.display());
        return Layout::load(&candidate);
    }
    Ok(Layout::default())
}

/// build an image from an extracted directory
///
/// nothing is written unless the whole image assembles.
pub fn build(source: &Path, output: &Path, layout: &Layout) -> Result<BuildStats> {
    let sys = SysFiles::load(source)?;

    let files_root = source.join(FILES_DIR);
    if !files_root.is_dir() {
        return Err(Error::MissingRequiredInput(files_root));
    }
    let mut tree = scan_tree(&files_root)?;

    let assembled = assemble(&sys, &mut tree, layout, |record| {
        let path = files_root.join(&record.path);
        debug!("adding {} at {}", record.path, record.range);
        fs::read(&path).with_path(&path)
    })?;

    write_file(output, &assembled.bytes)?;

    let stats = BuildStats {
        directories: tree.directory_count(),
        files: assembled.files.len(),
        overlays: assembled.overlays.len(),
        image_size: assembled.bytes.len() as u64,
    };
    info!(
        "built {} ({} files, {} overlays, {:#x} bytes)",
        output.display(),
        stats.files,
        stats.overlays,
        stats.image_size
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::HEADER_SIZE;
    use crate::image::sys::{
        ARM7_FILE, ARM9_FILE, ARM9_OVERLAY_FILE, HEADER_FILE, OVERLAY_DIR, SYS_DIR,
    };
    use crate::image::ImageReader;
    use tempfile::tempdir;

    fn extracted_dir(root: &Path) {
        let sys = root.join(SYS_DIR);
        fs::create_dir_all(&sys).unwrap();
        fs::write(sys.join(HEADER_FILE), [0u8; HEADER_SIZE]).unwrap();
        fs::write(sys.join(ARM9_FILE), [9u8; 0x40]).unwrap();
        fs::write(sys.join(ARM9_OVERLAY_FILE), [1u8; 0x20]).unwrap();
        fs::write(sys.join(ARM7_FILE), [7u8; 0x40]).unwrap();

        let files = root.join(FILES_DIR);
        fs::create_dir_all(files.join("data")).unwrap();
        fs::write(files.join("readme.txt"), b"hello").unwrap();
        fs::write(files.join("data/level.bin"), [0x5Au8; 9]).unwrap();
    }

    #[test]
    fn test_build_writes_image() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("src");
        extracted_dir(&source);
        let output = dir.path().join("out/game.nds");

        let stats = build(&source, &output, &Layout::default()).unwrap();
        assert_eq!(stats.files, 2);
        assert_eq!(stats.directories, 2);
        assert_eq!(stats.overlays, 0);
        assert_eq!(stats.image_size, 0x20000);

        let mut reader = ImageReader::open(&output).unwrap();
        let files = reader.tables().unwrap().tree.files();
        assert_eq!(files[0].path, "readme.txt");
        assert_eq!(reader.read_range("readme", files[0].range).unwrap(), b"hello");
        assert_eq!(files[1].path, "data/level.bin");
    }

    #[test]
    fn test_build_missing_files_dir() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("src");
        extracted_dir(&source);
        fs::remove_dir_all(source.join(FILES_DIR)).unwrap();
        let output = dir.path().join("game.nds");

        assert!(matches!(
            build(&source, &output, &Layout::default()),
            Err(Error::MissingRequiredInput(_))
        ));
        assert!(!output.exists());
    }

    #[test]
    fn test_build_with_overlays() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("src");
        extracted_dir(&source);
        let overlay = source.join(OVERLAY_DIR);
        fs::create_dir_all(&overlay).unwrap();
        fs::write(overlay.join("overlay_0000.bin"), [0xA0u8; 0x10]).unwrap();
        let output = dir.path().join("game.nds");

        let stats = build(&source, &output, &Layout::default()).unwrap();
        assert_eq!(stats.overlays, 1);

        let mut reader = ImageReader::open(&output).unwrap();
        let tables = reader.tables().unwrap();
        assert_eq!(tables.first_file_id, 1);
        assert_eq!(
            reader.read_range("overlay", tables.overlays[0]).unwrap(),
            vec![0xA0u8; 0x10]
        );
    }

    #[test]
    fn test_resolve_layout_prefers_explicit() {
        let dir = tempdir().unwrap();
        let in_tree = Layout {
            arm9_align: 0x18,
            ..Layout::default()
        };
        in_tree.save(&dir.path().join(LAYOUT_FILE)).unwrap();
        let explicit_path = dir.path().join("other.toml");
        let explicit = Layout {
            arm9_align: 0x20,
            ..Layout::default()
        };
        explicit.save(&explicit_path).unwrap();

        assert_eq!(resolve_layout(dir.path(), None).unwrap(), in_tree);
        assert_eq!(
            resolve_layout(dir.path(), Some(&explicit_path)).unwrap(),
            explicit
        );
        assert_eq!(
            resolve_layout(&dir.path().join("nowhere"), None).unwrap(),
            Layout::default()
        );
    }
}
