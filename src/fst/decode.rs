use std::collections::HashSet;

use log::warn;

use crate::error::{Error, Result};
use crate::fst::{MainEntry, ALLOC_ENTRY_SIZE, DIR_FLAG, DIR_ID_MASK, DIR_ID_TAG, MAIN_ENTRY_SIZE};
use crate::types::{
    validate_entry_name, ByteRange, DirectoryNode, DirectoryTree, FileEntry, MAX_DIRECTORIES,
    ROOT_ID,
};

/// result of decoding a name table and allocation table
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedTables {
    /// directories and files with their absolute ranges
    pub tree: DirectoryTree,
    /// first allocation id used by tree files; lower ids are overlays
    pub first_file_id: u16,
    /// overlay ranges, indexed by allocation id
    pub overlays: Vec<ByteRange>,
}

/// decode raw name-table and allocation-table bytes
pub fn decode(fnt: &[u8], fat: &[u8]) -> Result<DecodedTables> {
    let entries = read_main_table(fnt)?;
    let count = entries.len();

    let mut nodes: Vec<DirectoryNode> = (0..count)
        .map(|i| DirectoryNode::new(i as u16, ROOT_ID, ""))
        .collect();
    let mut claimed = vec![false; count];

    for (dir, entry) in entries.iter().enumerate() {
        let mut pos = entry.offset as usize;
        let mut file_id = entry.first_id as usize;
        let mut names = HashSet::new();

        loop {
            let len = *fnt.get(pos).ok_or_else(|| {
                Error::malformed(pos, format!("sub-table of directory {} lacks a terminator", dir))
            })?;

            match len {
                0 => break,
                DIR_FLAG => {
                    return Err(Error::malformed(pos, "reserved length byte 0x80"));
                }
                1..=0x7F => {
                    let name = read_name(fnt, pos + 1, len as usize)?;
                    claim_name(&mut names, &name, pos)?;
                    let range = alloc_entry(fat, file_id)?;
                    nodes[dir].files.push(FileEntry::new(name, file_id as u32, range));
                    file_id += 1;
                    pos += 1 + len as usize;
                }
                _ => {
                    let name_len = (len - DIR_FLAG) as usize;
                    let name = read_name(fnt, pos + 1, name_len)?;
                    claim_name(&mut names, &name, pos)?;
                    let id_pos = pos + 1 + name_len;
                    let raw = fnt
                        .get(id_pos..id_pos + 2)
                        .map(|b| u16::from_le_bytes([b[0], b[1]]))
                        .ok_or_else(|| Error::malformed(id_pos, "directory record truncated"))?;
                    if raw & !DIR_ID_MASK != DIR_ID_TAG {
                        return Err(Error::malformed(
                            id_pos,
                            format!("directory id {:#06x} lacks the 0xF tag", raw),
                        ));
                    }

                    let child = (raw & DIR_ID_MASK) as usize;
                    if child == ROOT_ID as usize || child >= count {
                        return Err(Error::malformed(
                            id_pos,
                            format!("directory id {} out of range 1..{}", child, count),
                        ));
                    }
                    if claimed[child] {
                        return Err(Error::malformed(
                            id_pos,
                            format!("directory id {} referenced twice", child),
                        ));
                    }
                    claimed[child] = true;

                    nodes[child].name = name;
                    nodes[child].parent = dir as u16;
                    nodes[dir].children.push(child as u16);
                    pos = id_pos + 2;
                }
            }
        }
    }

    check_reachable(&nodes)?;

    for (dir, entry) in entries.iter().enumerate().skip(1) {
        let recorded = entry.parent & DIR_ID_MASK;
        if recorded != nodes[dir].parent {
            warn!(
                "directory {} records parent {} but is referenced from {}",
                dir, recorded, nodes[dir].parent
            );
        }
    }

    let first_file_id = entries[ROOT_ID as usize].first_id;
    let overlays = (0..first_file_id as usize)
        .map(|id| alloc_entry(fat, id))
        .collect::<Result<Vec<_>>>()?;

    Ok(DecodedTables {
        tree: DirectoryTree::from_nodes(nodes),
        first_file_id,
        overlays,
    })
}

/// read the main table; its length comes from the root entry's parent slot
fn read_main_table(fnt: &[u8]) -> Result<Vec<MainEntry>> {
    if fnt.len() < MAIN_ENTRY_SIZE {
        return Err(Error::TruncatedInput {
            what: "name table",
            needed: MAIN_ENTRY_SIZE as u64,
            available: fnt.len() as u64,
        });
    }

    let count = u16::from_le_bytes([fnt[6], fnt[7]]) as usize;
    if count == 0 || count > MAX_DIRECTORIES {
        return Err(Error::malformed(
            6,
            format!("directory count {} outside 1..={}", count, MAX_DIRECTORIES),
        ));
    }
    if count * MAIN_ENTRY_SIZE > fnt.len() {
        return Err(Error::malformed(
            0,
            format!("main table of {} entries exceeds the name table", count),
        ));
    }

    Ok(fnt[..count * MAIN_ENTRY_SIZE]
        .chunks_exact(MAIN_ENTRY_SIZE)
        .map(MainEntry::read)
        .collect())
}

fn read_name(fnt: &[u8], pos: usize, len: usize) -> Result<String> {
    let bytes = fnt
        .get(pos..pos + len)
        .ok_or_else(|| Error::malformed(pos, "name runs past the end of the table"))?;

    let name = match std::str::from_utf8(bytes) {
        Ok(name) => name.to_string(),
        Err(_) => {
            let lossy = String::from_utf8_lossy(bytes).into_owned();
            warn!("name at {:#x} is not utf-8, decoded as {:?}", pos, lossy);
            lossy
        }
    };

    validate_entry_name(&name).map_err(|e| Error::malformed(pos, e.to_string()))?;
    Ok(name)
}

/// names within one sub-table must be unique across files and directories
fn claim_name(names: &mut HashSet<String>, name: &str, pos: usize) -> Result<()> {
    if !names.insert(name.to_string()) {
        return Err(Error::malformed(pos, format!("duplicate entry name {:?}", name)));
    }
    Ok(())
}

fn alloc_entry(fat: &[u8], id: usize) -> Result<ByteRange> {
    let at = id * ALLOC_ENTRY_SIZE;
    let bytes = fat
        .get(at..at + ALLOC_ENTRY_SIZE)
        .ok_or_else(|| Error::OffsetOutOfRange {
            what: format!("allocation entry {}", id),
            start: at as u64,
            end: (at + ALLOC_ENTRY_SIZE) as u64,
            len: fat.len() as u64,
        })?;
    Ok(ByteRange::new(
        u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
        u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
    ))
}

/// every directory must hang off the root exactly once
fn check_reachable(nodes: &[DirectoryNode]) -> Result<()> {
    let mut seen = vec![false; nodes.len()];
    let mut stack = vec![ROOT_ID];
    while let Some(id) = stack.pop() {
        seen[id as usize] = true;
        stack.extend(nodes[id as usize].children.iter().copied());
    }

    match seen.iter().position(|s| !s) {
        Some(id) => Err(Error::malformed(
            id * MAIN_ENTRY_SIZE,
            format!("directory {} is unreachable from the root", id),
        )),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push_u32(out: &mut Vec<u8>, v: u32) {
        out.extend_from_slice(&v.to_le_bytes());
    }

    fn push_u16(out: &mut Vec<u8>, v: u16) {
        out.extend_from_slice(&v.to_le_bytes());
    }

    /// root holds file "A" and directory "B"; "B" holds file "C"
    fn minimal_fnt() -> Vec<u8> {
        let mut fnt = Vec::new();
        // root: sub-table at 16, first id 0, two directories
        push_u32(&mut fnt, 16);
        push_u16(&mut fnt, 0);
        push_u16(&mut fnt, 2);
        // B: sub-table at 23, first id 1, parent root
        push_u32(&mut fnt, 23);
        push_u16(&mut fnt, 1);
        push_u16(&mut fnt, 0xF000);
        // root sub-table
        fnt.extend_from_slice(&[0x01, b'A', 0x81, b'B', 0x01, 0xF0, 0x00]);
        // B sub-table
        fnt.extend_from_slice(&[0x01, b'C', 0x00]);
        fnt
    }

    fn minimal_fat() -> Vec<u8> {
        let mut fat = Vec::new();
        push_u32(&mut fat, 0x200);
        push_u32(&mut fat, 0x201);
        push_u32(&mut fat, 0x204);
        push_u32(&mut fat, 0x208);
        fat
    }

    #[test]
    fn test_decode_minimal() {
        let decoded = decode(&minimal_fnt(), &minimal_fat()).unwrap();
        let files = decoded.tree.files();

        assert_eq!(files.len(), 2);
        assert_eq!(files[0].path, "A");
        assert_eq!(files[0].range, ByteRange::new(0x200, 0x201));
        assert_eq!(files[0].size(), 1);
        assert_eq!(files[1].path, "B/C");
        assert_eq!(files[1].range, ByteRange::new(0x204, 0x208));
        assert_eq!(files[1].size(), 4);

        assert_eq!(decoded.first_file_id, 0);
        assert!(decoded.overlays.is_empty());
    }

    #[test]
    fn test_decode_ids_dense() {
        let decoded = decode(&minimal_fnt(), &minimal_fat()).unwrap();
        let tree = &decoded.tree;

        assert_eq!(tree.directory_count(), 2);
        let mut ids = tree.walk_ids();
        ids.sort();
        assert_eq!(ids, vec![0, 1]);
        assert_eq!(tree.get(1).unwrap().name, "B");
        assert_eq!(tree.get(1).unwrap().parent, ROOT_ID);
    }

    #[test]
    fn test_decode_records_allocation_ids() {
        let decoded = decode(&minimal_fnt(), &minimal_fat()).unwrap();
        let ids: Vec<u32> = decoded.tree.files().iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![0, 1]);
    }

    /// single root directory with the given sub-table records
    fn root_only_fnt(records: &[u8]) -> Vec<u8> {
        let mut fnt = Vec::new();
        push_u32(&mut fnt, 8);
        push_u16(&mut fnt, 0);
        push_u16(&mut fnt, 1);
        fnt.extend_from_slice(records);
        fnt
    }

    fn zero_fat(entries: usize) -> Vec<u8> {
        vec![0u8; entries * ALLOC_ENTRY_SIZE]
    }

    #[test]
    fn test_decode_rejects_duplicate_file_names() {
        let fnt = root_only_fnt(&[0x01, b'X', 0x01, b'X', 0x00]);
        assert!(matches!(
            decode(&fnt, &zero_fat(2)),
            Err(Error::MalformedNameTable { offset: 10, .. })
        ));
    }

    #[test]
    fn test_decode_rejects_names_colliding_after_lossy_decoding() {
        // two distinct Shift-JIS names that both decode to U+FFFD U+FFFD
        let fnt = root_only_fnt(&[0x02, 0x82, 0xA0, 0x02, 0x82, 0xA2, 0x00]);
        assert!(matches!(
            decode(&fnt, &zero_fat(2)),
            Err(Error::MalformedNameTable { .. })
        ));
    }

    #[test]
    fn test_decode_rejects_file_and_directory_with_same_name() {
        let mut fnt = minimal_fnt();
        // rename root's file "A" to "B", the name of its subdirectory
        fnt[17] = b'B';
        assert!(matches!(
            decode(&fnt, &minimal_fat()),
            Err(Error::MalformedNameTable { offset: 18, .. })
        ));
    }

    #[test]
    fn test_decode_overlay_boundary() {
        // two overlays before the tree files
        let mut fnt = Vec::new();
        push_u32(&mut fnt, 8);
        push_u16(&mut fnt, 2);
        push_u16(&mut fnt, 1);
        fnt.extend_from_slice(&[0x01, b'F', 0x00]);

        let mut fat = Vec::new();
        for (start, end) in [(0x4100, 0x4180), (0x4200, 0x4210), (0x9000, 0x9004)] {
            push_u32(&mut fat, start);
            push_u32(&mut fat, end);
        }

        let decoded = decode(&fnt, &fat).unwrap();
        assert_eq!(decoded.first_file_id, 2);
        assert_eq!(
            decoded.overlays,
            vec![ByteRange::new(0x4100, 0x4180), ByteRange::new(0x4200, 0x4210)]
        );
        let files = decoded.tree.files();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].range, ByteRange::new(0x9000, 0x9004));
    }

    #[test]
    fn test_decode_missing_terminator() {
        let mut fnt = minimal_fnt();
        fnt.pop();
        assert!(matches!(
            decode(&fnt, &minimal_fat()),
            Err(Error::MalformedNameTable { .. })
        ));
    }

    #[test]
    fn test_decode_reserved_length() {
        let mut fnt = minimal_fnt();
        // replace B's file record with a bare 0x80
        fnt[23] = 0x80;
        assert!(matches!(
            decode(&fnt, &minimal_fat()),
            Err(Error::MalformedNameTable { offset: 23, .. })
        ));
    }

    #[test]
    fn test_decode_directory_id_out_of_range() {
        let mut fnt = minimal_fnt();
        // root's record for B points at id 5
        fnt[20] = 0x05;
        assert!(matches!(
            decode(&fnt, &minimal_fat()),
            Err(Error::MalformedNameTable { .. })
        ));
    }

    #[test]
    fn test_decode_unreachable_directory() {
        let mut fnt = minimal_fnt();
        // turn the root's directory record into a 3-byte file record, so
        // directory 1 is never referenced
        fnt[18] = 0x03;
        fnt[21] = 0x01;

        match decode(&fnt, &minimal_fat()) {
            Err(Error::MalformedNameTable { offset: 8, .. }) => {}
            other => panic!("expected malformed name table, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_fat_too_short() {
        let fat = minimal_fat();
        assert!(matches!(
            decode(&minimal_fnt(), &fat[..8]),
            Err(Error::OffsetOutOfRange { .. })
        ));
    }

    #[test]
    fn test_decode_truncated_main_table() {
        assert!(matches!(
            decode(&[0u8; 4], &[]),
            Err(Error::TruncatedInput { .. })
        ));
    }

    #[test]
    fn test_decode_rejects_traversal_names() {
        let mut fnt = Vec::new();
        push_u32(&mut fnt, 8);
        push_u16(&mut fnt, 0);
        push_u16(&mut fnt, 1);
        fnt.extend_from_slice(&[0x02, b'.', b'.', 0x00]);

        let mut fat = Vec::new();
        push_u32(&mut fat, 0);
        push_u32(&mut fat, 0);

        assert!(matches!(
            decode(&fnt, &fat),
            Err(Error::MalformedNameTable { .. })
        ));
    }
}
