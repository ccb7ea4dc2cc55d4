use std::path::PathBuf;

use crate::config::align_up;
use crate::error::{Error, Result};
use crate::fst::{MainEntry, ALLOC_ENTRY_SIZE, DIR_FLAG, DIR_ID_TAG, MAIN_ENTRY_SIZE};
use crate::types::{
    join_path, validate_entry_name, ByteRange, DirectoryNode, DirectoryTree, MAX_DIRECTORIES,
};

/// running values threaded through the traversal while laying out files
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BuilderState {
    /// allocation id the next file receives
    pub next_file_id: u32,
    /// image offset the next payload starts at
    pub offset: u64,
}

impl BuilderState {
    pub fn new(offset: u64) -> Self {
        Self {
            next_file_id: 0,
            offset,
        }
    }
}

/// serialize the name table: main table in id order, then every sub-table in
/// traversal order
///
/// file ids start at `first_file_id`, leaving lower ids to overlays.
pub fn encode_name_table(tree: &DirectoryTree, first_file_id: u16) -> Result<Vec<u8>> {
    let count = tree.directory_count();
    if count > MAX_DIRECTORIES {
        return Err(Error::TooManyDirectories(MAX_DIRECTORIES));
    }
    let total_ids = first_file_id as usize + tree.file_count();
    if total_ids > u16::MAX as usize {
        return Err(Error::TooManyFiles(u16::MAX as usize));
    }

    let order = tree.walk_ids();

    // pass 1: main-table entries, sized from each sub-table
    let mut main = vec![MainEntry::default(); count];
    let mut sub_offset = count * MAIN_ENTRY_SIZE;
    let mut file_id = first_file_id as usize;
    for &id in &order {
        let node = dir_node(tree, id)?;
        main[id as usize] = MainEntry {
            offset: sub_offset as u32,
            first_id: file_id as u16,
            parent: if node.is_root() {
                count as u16
            } else {
                DIR_ID_TAG | node.parent
            },
        };
        sub_offset += sub_table_len(tree, node)?;
        file_id += node.files.len();
    }

    // pass 2: sub-tables in the same order
    let mut out = Vec::with_capacity(sub_offset);
    for entry in &main {
        entry.write(&mut out);
    }
    for &id in &order {
        let node = dir_node(tree, id)?;
        debug_assert_eq!(out.len(), main[id as usize].offset as usize);

        for file in &node.files {
            push_name(&mut out, &file.name, 0)?;
        }
        for &child_id in &node.children {
            let child = dir_node(tree, child_id)?;
            push_name(&mut out, &child.name, DIR_FLAG)?;
            out.extend_from_slice(&(DIR_ID_TAG | child_id).to_le_bytes());
        }
        out.push(0);
    }

    Ok(out)
}

/// assign every file an image range, in traversal order
///
/// each payload starts at `state.offset`; the offset then advances past the
/// payload rounded up to `align`. ranges are read as sizes on input, and
/// files take ids from `state.next_file_id` on.
pub fn allocate(tree: &mut DirectoryTree, state: &mut BuilderState, align: u32) -> Result<()> {
    for id in tree.walk_ids() {
        let prefix = tree.path_of(id);
        let node = tree
            .get_mut(id)
            .ok_or_else(|| Error::malformed(0, format!("directory {} missing", id)))?;

        for file in &mut node.files {
            let size = file.range.len() as u64;
            let start = state.offset;
            let end = start + size;
            if end > u32::MAX as u64 {
                return Err(Error::FileTooLarge(PathBuf::from(join_path(
                    &prefix, &file.name,
                ))));
            }

            file.id = state.next_file_id;
            file.range = ByteRange::new(start as u32, end as u32);
            state.offset = align_up(end, align);
            state.next_file_id += 1;
        }
    }
    Ok(())
}

/// number of bytes the allocation table will occupy
pub fn alloc_table_len(overlay_count: usize, file_count: usize) -> usize {
    (overlay_count + file_count) * ALLOC_ENTRY_SIZE
}

/// serialize the allocation table: overlay entries, then tree files in
/// traversal order
pub fn encode_alloc_table(overlays: &[ByteRange], tree: &DirectoryTree) -> Vec<u8> {
    let mut out = Vec::with_capacity(alloc_table_len(overlays.len(), tree.file_count()));
    let files = tree.walk().flat_map(|n| n.files.iter().map(|f| f.range));
    for range in overlays.iter().copied().chain(files) {
        out.extend_from_slice(&range.start.to_le_bytes());
        out.extend_from_slice(&range.end.to_le_bytes());
    }
    out
}

fn dir_node(tree: &DirectoryTree, id: u16) -> Result<&DirectoryNode> {
    tree.get(id)
        .ok_or_else(|| Error::malformed(0, format!("directory {} missing", id)))
}

fn sub_table_len(tree: &DirectoryTree, node: &DirectoryNode) -> Result<usize> {
    let mut len = 1;
    for file in &node.files {
        len += 1 + file.name.len();
    }
    for &child_id in &node.children {
        len += 3 + dir_node(tree, child_id)?.name.len();
    }
    Ok(len)
}

fn push_name(out: &mut Vec<u8>, name: &str, flag: u8) -> Result<()> {
    validate_entry_name(name)?;
    out.push(flag | name.len() as u8);
    out.extend_from_slice(name.as_bytes());
    Ok(())
}
