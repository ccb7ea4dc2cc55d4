use log::{debug, warn};

use crate::config::{align_up, Layout};
use crate::error::{Error, Result};
use crate::fst::{alloc_table_len, allocate, encode_alloc_table, encode_name_table, BuilderState};
use crate::header::{Header, Region};
use crate::image::sys::SysFiles;
use crate::image::writer::ImageWriter;
use crate::types::{overlay_file_name, ByteRange, DirectoryTree, FileRecord};

/// an assembled image and where its parts ended up
#[derive(Debug)]
pub struct Assembled {
    pub bytes: Vec<u8>,
    /// header as written into the image
    pub header: Header,
    /// overlay ranges in allocation id order
    pub overlays: Vec<ByteRange>,
    /// tree files with their final ranges, in allocation order
    pub files: Vec<FileRecord>,
}

/// lay out a complete image
///
/// region order: header, arm9, arm9 overlay table, overlay binaries, arm7,
/// arm7 overlay table, banner, name table, allocation table, file payloads.
/// `tree` holds file sizes on input and final ranges on return; `read_payload`
/// is called once per file in allocation order.
pub fn assemble<F>(
    sys: &SysFiles,
    tree: &mut DirectoryTree,
    layout: &Layout,
    mut read_payload: F,
) -> Result<Assembled>
where
    F: FnMut(&FileRecord) -> Result<Vec<u8>>,
{
    layout.validate()?;

    let mut header = sys.header.clone();
    let mut w = ImageWriter::new(layout.fill);

    // header is written last, once every offset is known
    w.pad_to(layout.header_region as u64, 0x00);

    let arm9 = w.place("arm9", &sys.arm9)?;
    w.align(layout.arm9_align);

    let arm9_overlay = place_optional(&mut w, "arm9 overlay table", &sys.arm9_overlay)?;
    w.align(layout.overlay_align);

    let mut overlays = Vec::with_capacity(sys.overlays.len());
    for (i, blob) in sys.overlays.iter().enumerate() {
        let region = w.place(&overlay_file_name(i), blob)?;
        overlays.push(ByteRange::new(region.offset, region.offset + region.size));
        w.align(layout.overlay_align);
    }
    if overlays.len() > u16::MAX as usize {
        return Err(Error::TooManyFiles(u16::MAX as usize));
    }

    w.align(layout.arm7_align);
    let arm7 = w.place("arm7", &sys.arm7)?;
    w.align(layout.table_align);

    let arm7_overlay = place_optional(&mut w, "arm7 overlay table", &sys.arm7_overlay)?;
    w.align(layout.table_align);

    let banner_offset = match &sys.banner {
        Some(banner) => {
            w.align(layout.banner_align);
            let region = w.place("banner", banner)?;
            w.align(layout.table_align);
            region.offset
        }
        None => 0,
    };

    let fnt = encode_name_table(tree, overlays.len() as u16)?;
    let fnt_region = w.place("name table", &fnt)?;
    w.align(layout.table_align);

    // payloads start right after the allocation table
    let fat_end = w.position() + alloc_table_len(overlays.len(), tree.file_count()) as u64;
    let mut state = BuilderState::new(align_up(fat_end, layout.file_align));
    state.next_file_id = overlays.len() as u32;
    allocate(tree, &mut state, layout.file_align)?;

    let fat = encode_alloc_table(&overlays, tree);
    let fat_region = w.place("allocation table", &fat)?;

    let files = tree.files();
    for record in &files {
        w.align(layout.file_align);
        if w.position() != record.range.start as u64 {
            return Err(Error::LayoutMismatch {
                what: record.path.clone(),
                expected: record.range.start as u64,
                actual: w.position(),
            });
        }

        let data = read_payload(record)?;
        if data.len() as u64 != record.size() as u64 {
            return Err(Error::LayoutMismatch {
                what: record.path.clone(),
                expected: record.size() as u64,
                actual: data.len() as u64,
            });
        }
        w.place(&record.path, &data)?;
    }

    header.set_arm9_offset(arm9.offset);
    header.set_arm9_size(arm9.size);
    header.set_arm9_overlay(arm9_overlay);
    header.set_arm7_offset(arm7.offset);
    header.set_arm7_size(arm7.size);
    header.set_arm7_overlay(arm7_overlay);
    header.set_icon_title_offset(banner_offset);
    header.set_fnt(fnt_region);
    header.set_fat(fat_region);
    w.write_at(0, header.raw_bytes());

    let used = w.position();
    match header.capacity() {
        Some(capacity) if used <= capacity => w.pad_to(capacity, layout.fill),
        Some(capacity) => warn!(
            "image is {:#x} bytes, larger than the declared capacity {:#x}; leaving it unpadded",
            used, capacity
        ),
        None => warn!(
            "capacity class {:#x} is out of range; leaving image unpadded",
            header.capacity_class()
        ),
    }
    debug!("image content ends at {:#x}, total {:#x}", used, w.position());

    Ok(Assembled {
        bytes: w.into_bytes(),
        header,
        overlays,
        files,
    })
}

/// place a region only when it has content; empty regions get offset 0
fn place_optional(w: &mut ImageWriter, what: &str, bytes: &[u8]) -> Result<Region> {
    if bytes.is_empty() {
        return Ok(Region::default());
    }
    w.place(what, bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fst::decode;
    use crate::header::{field, HEADER_SIZE};
    use crate::types::ROOT_ID;
    use std::collections::HashMap;

    fn sys_files(overlays: Vec<Vec<u8>>) -> SysFiles {
        let mut raw = vec![0u8; HEADER_SIZE];
        raw[..4].copy_from_slice(b"TEST");
        raw[field::CAPACITY] = 0; // 128 KiB
        SysFiles {
            header: Header::parse(&raw).unwrap(),
            arm9: vec![0x99; 0x123],
            arm9_overlay: vec![0x01; 0x20],
            arm7: vec![0x77; 0x50],
            arm7_overlay: vec![],
            banner: None,
            overlays,
        }
    }

    fn sample_tree() -> (DirectoryTree, HashMap<String, Vec<u8>>) {
        let mut contents = HashMap::new();
        contents.insert("A".to_string(), vec![0x41]);
        contents.insert("B/C".to_string(), vec![0x43; 7]);
        contents.insert("B/D".to_string(), vec![]);

        let mut tree = DirectoryTree::new();
        tree.add_file(ROOT_ID, "A", ByteRange::new(0, 1)).unwrap();
        let b = tree.add_child(ROOT_ID, "B").unwrap();
        tree.add_file(b, "C", ByteRange::new(0, 7)).unwrap();
        tree.add_file(b, "D", ByteRange::new(0, 0)).unwrap();
        (tree, contents)
    }

    fn build(overlays: Vec<Vec<u8>>) -> (Assembled, HashMap<String, Vec<u8>>) {
        let (mut tree, contents) = sample_tree();
        let assembled = assemble(&sys_files(overlays), &mut tree, &Layout::default(), |r| {
            Ok(contents[&r.path].clone())
        })
        .unwrap();
        (assembled, contents)
    }

    #[test]
    fn test_assemble_places_regions() {
        let (assembled, _) = build(vec![]);
        let header = &assembled.header;

        assert_eq!(header.arm9().rom_offset, 0x4000);
        assert_eq!(header.arm9().size, 0x123);
        // arm9 ends at 0x4123, padded to 0x4130
        assert_eq!(header.arm9_overlay(), Region::new(0x4130, 0x20));
        assert_eq!(header.arm7().rom_offset, 0x5000);
        assert_eq!(header.arm7_overlay(), Region::default());
        assert_eq!(header.fnt().offset, 0x5050);
        assert_eq!(header.icon_title_offset(), 0);
        assert_eq!(assembled.bytes.len(), 0x20000);
        assert_eq!(&assembled.bytes[..HEADER_SIZE], &header.raw_bytes()[..]);
        assert!(assembled.bytes[HEADER_SIZE..0x4000].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_payloads_match_ranges() {
        let (assembled, contents) = build(vec![]);

        for record in &assembled.files {
            assert_eq!(record.range.start % 4, 0, "{} unaligned", record.path);
            let start = record.range.start as usize;
            let end = record.range.end as usize;
            assert_eq!(&assembled.bytes[start..end], &contents[&record.path][..]);
        }
    }

    #[test]
    fn test_tables_decode_from_image() {
        let (assembled, _) = build(vec![vec![0xAA; 0x30], vec![0xBB; 0x101]]);
        let header = &assembled.header;
        let bytes = &assembled.bytes;

        let fnt = &bytes[header.fnt().offset as usize..header.fnt().end() as usize];
        let fat = &bytes[header.fat().offset as usize..header.fat().end() as usize];
        let decoded = decode(fnt, fat).unwrap();

        assert_eq!(decoded.first_file_id, 2);
        assert_eq!(decoded.overlays, assembled.overlays);
        assert_eq!(decoded.tree.files(), assembled.files);
    }

    #[test]
    fn test_overlays_aligned() {
        let (assembled, _) = build(vec![vec![0xAA; 0x30], vec![0xBB; 0x101], vec![0xCC; 1]]);

        assert_eq!(assembled.overlays.len(), 3);
        for (i, range) in assembled.overlays.iter().enumerate() {
            assert_eq!(range.start % 0x100, 0, "overlay {} unaligned", i);
        }
        assert_eq!(assembled.overlays[0].start, 0x4200);
        assert_eq!(assembled.overlays[1].start, 0x4300);
        assert_eq!(assembled.overlays[2].start, 0x4500);
        assert_eq!(&assembled.bytes[0x4300..0x4401], &[0xBB; 0x101][..]);
    }

    #[test]
    fn test_payload_size_change_detected() {
        let (mut tree, _) = sample_tree();
        let err = assemble(&sys_files(vec![]), &mut tree, &Layout::default(), |_| {
            Ok(vec![0; 3])
        })
        .unwrap_err();

        assert!(matches!(err, Error::LayoutMismatch { .. }));
    }

    #[test]
    fn test_oversized_image_left_unpadded() {
        let mut sys = sys_files(vec![]);
        sys.arm7 = vec![0x77; 0x20000];
        let (mut tree, contents) = sample_tree();

        let assembled = assemble(&sys, &mut tree, &Layout::default(), |r| {
            Ok(contents[&r.path].clone())
        })
        .unwrap();
        assert!(assembled.bytes.len() > 0x20000);
        assert_eq!(assembled.bytes.len() as u32, assembled.files.last().unwrap().range.end);
    }
}
