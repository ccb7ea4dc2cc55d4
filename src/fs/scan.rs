use std::path::{Path, PathBuf};

use log::{debug, warn};
use walkdir::WalkDir;

use crate::error::{Error, IoResultExt, Result};
use crate::types::{ByteRange, DirectoryTree, ROOT_ID};

/// a directory found on disk whose id is not assigned yet
struct Pending {
    parent: u16,
    name: String,
    path: PathBuf,
}

/// immediate children of a directory, split by kind, each sorted by name
#[derive(Debug, Default)]
pub struct Listing {
    /// (name, size)
    pub files: Vec<(String, u64)>,
    /// (name, path)
    pub dirs: Vec<(String, PathBuf)>,
}

/// walk a directory on disk into a tree
///
/// directory ids are handed out in pre-order (a directory before its
/// subdirectories, siblings by name), matching the order the name table and
/// payloads are written in. each file's range holds `0..size` until layout.
pub fn scan_tree(root: &Path) -> Result<DirectoryTree> {
    let mut tree = DirectoryTree::new();
    let mut stack = Vec::new();

    let listing = list_dir(root)?;
    add_listing(&mut tree, ROOT_ID, root, listing, &mut stack)?;

    while let Some(pending) = stack.pop() {
        let id = tree.add_child(pending.parent, pending.name)?;
        let listing = list_dir(&pending.path)?;
        add_listing(&mut tree, id, &pending.path, listing, &mut stack)?;
    }

    debug!(
        "scanned {}: {} directories, {} files",
        root.display(),
        tree.directory_count(),
        tree.file_count()
    );
    Ok(tree)
}

fn add_listing(
    tree: &mut DirectoryTree,
    id: u16,
    dir: &Path,
    listing: Listing,
    stack: &mut Vec<Pending>,
) -> Result<()> {
    for (name, size) in listing.files {
        if size > u32::MAX as u64 {
            return Err(Error::FileTooLarge(dir.join(&name)));
        }
        tree.add_file(id, name, ByteRange::new(0, size as u32))?;
    }

    // reversed so the first subdirectory is popped first
    for (name, path) in listing.dirs.into_iter().rev() {
        stack.push(Pending {
            parent: id,
            name,
            path,
        });
    }
    Ok(())
}

/// list the immediate children of `dir`, ordered byte-wise by name
///
/// entries that are neither regular files nor directories are skipped.
pub fn list_dir(dir: &Path) -> Result<Listing> {
    let mut listing = Listing::default();

    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::from).with_path(dir)?;
        let path = entry.path().to_path_buf();
        let name = entry
            .file_name()
            .to_str()
            .ok_or_else(|| Error::InvalidEntryName(path.display().to_string()))?
            .to_string();

        let file_type = entry.file_type();
        if file_type.is_dir() {
            listing.dirs.push((name, path));
        } else if file_type.is_file() {
            let size = entry
                .metadata()
                .map_err(std::io::Error::from)
                .with_path(&path)?
                .len();
            listing.files.push((name, size));
        } else {
            warn!("skipping {}: not a regular file or directory", path.display());
        }
    }

    Ok(listing)
}
