//! fixed 512-byte cartridge header
//!
//! the header is kept as its raw bytes; getters decode fields in place and
//! setters patch a single little-endian field, so bytes that are not modelled
//! here (logo, checksums, debug fields) pass through a rebuild untouched.

use std::fmt;

use crate::error::{Error, Result};

/// size of the header in bytes
pub const HEADER_SIZE: usize = 0x200;

/// byte offsets of header fields
pub mod field {
    pub const TITLE: usize = 0x00;
    pub const GAME_CODE: usize = 0x0C;
    pub const MAKER_CODE: usize = 0x10;
    pub const UNIT_CODE: usize = 0x12;
    pub const ENCRYPTION_SEED: usize = 0x13;
    pub const CAPACITY: usize = 0x14;
    pub const VERSION: usize = 0x1E;
    pub const AUTOSTART: usize = 0x1F;
    pub const ARM9_ROM_OFFSET: usize = 0x20;
    pub const ARM9_ENTRY: usize = 0x24;
    pub const ARM9_RAM: usize = 0x28;
    pub const ARM9_SIZE: usize = 0x2C;
    pub const ARM7_ROM_OFFSET: usize = 0x30;
    pub const ARM7_ENTRY: usize = 0x34;
    pub const ARM7_RAM: usize = 0x38;
    pub const ARM7_SIZE: usize = 0x3C;
    pub const FNT_OFFSET: usize = 0x40;
    pub const FNT_SIZE: usize = 0x44;
    pub const FAT_OFFSET: usize = 0x48;
    pub const FAT_SIZE: usize = 0x4C;
    pub const ARM9_OVERLAY_OFFSET: usize = 0x50;
    pub const ARM9_OVERLAY_SIZE: usize = 0x54;
    pub const ARM7_OVERLAY_OFFSET: usize = 0x58;
    pub const ARM7_OVERLAY_SIZE: usize = 0x5C;
    pub const COMMAND_PORT_NORMAL: usize = 0x60;
    pub const COMMAND_PORT_KEY1: usize = 0x64;
    pub const ICON_TITLE_OFFSET: usize = 0x68;
    pub const SECURE_CHECKSUM: usize = 0x6C;
    pub const SECURE_LOADING_TIMEOUT: usize = 0x6E;
    pub const ARM9_AUTOLOAD: usize = 0x70;
    pub const ARM7_AUTOLOAD: usize = 0x74;
    pub const SECURE_AREA_DISABLE: usize = 0x78;
    pub const SIZE_USED: usize = 0x80;
    pub const HEADER_SIZE: usize = 0x84;
}

/// location of a region inside the image
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Region {
    pub offset: u32,
    pub size: u32,
}

impl Region {
    pub fn new(offset: u32, size: u32) -> Self {
        Self { offset, size }
    }

    /// exclusive end offset
    pub fn end(&self) -> u64 {
        self.offset as u64 + self.size as u64
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }
}

/// one of the two processor executables
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Executable {
    pub rom_offset: u32,
    pub entry_address: u32,
    pub load_address: u32,
    pub size: u32,
}

#[derive(Clone, PartialEq, Eq)]
pub struct Header {
    raw: [u8; HEADER_SIZE],
}

impl Header {
    /// parse the header from the first 512 bytes of `bytes`
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(Error::TruncatedInput {
                what: "header",
                needed: HEADER_SIZE as u64,
                available: bytes.len() as u64,
            });
        }
        let mut raw = [0u8; HEADER_SIZE];
        raw.copy_from_slice(&bytes[..HEADER_SIZE]);
        Ok(Self { raw })
    }

    /// raw header bytes, including any fields patched by setters
    pub fn raw_bytes(&self) -> &[u8; HEADER_SIZE] {
        &self.raw
    }

    fn u8_at(&self, offset: usize) -> u8 {
        self.raw[offset]
    }

    fn u16_at(&self, offset: usize) -> u16 {
        u16::from_le_bytes([self.raw[offset], self.raw[offset + 1]])
    }

    fn u32_at(&self, offset: usize) -> u32 {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(&self.raw[offset..offset + 4]);
        u32::from_le_bytes(buf)
    }

    fn u64_at(&self, offset: usize) -> u64 {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&self.raw[offset..offset + 8]);
        u64::from_le_bytes(buf)
    }

    fn set_u32(&mut self, offset: usize, value: u32) {
        self.raw[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }

    fn text(&self, offset: usize, len: usize) -> String {
        let bytes = &self.raw[offset..offset + len];
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(len);
        String::from_utf8_lossy(&bytes[..end]).into_owned()
    }

    pub fn title(&self) -> String {
        self.text(field::TITLE, 12)
    }

    pub fn game_code(&self) -> String {
        self.text(field::GAME_CODE, 4)
    }

    pub fn maker_code(&self) -> String {
        self.text(field::MAKER_CODE, 2)
    }

    pub fn unit_code(&self) -> u8 {
        self.u8_at(field::UNIT_CODE)
    }

    pub fn encryption_seed(&self) -> u8 {
        self.u8_at(field::ENCRYPTION_SEED)
    }

    /// raw capacity class byte
    pub fn capacity_class(&self) -> u8 {
        self.u8_at(field::CAPACITY)
    }

    /// declared cartridge capacity in bytes (`0x20000 << class`)
    ///
    /// `None` when the capacity would not fit the image's 32-bit address space.
    pub fn capacity(&self) -> Option<u64> {
        let class = self.capacity_class() as u32;
        if class > 14 {
            return None;
        }
        Some(0x20000u64 << class)
    }

    pub fn version(&self) -> u8 {
        self.u8_at(field::VERSION)
    }

    pub fn autostart(&self) -> u8 {
        self.u8_at(field::AUTOSTART)
    }

    pub fn arm9(&self) -> Executable {
        Executable {
            rom_offset: self.u32_at(field::ARM9_ROM_OFFSET),
            entry_address: self.u32_at(field::ARM9_ENTRY),
            load_address: self.u32_at(field::ARM9_RAM),
            size: self.u32_at(field::ARM9_SIZE),
        }
    }

    pub fn arm7(&self) -> Executable {
        Executable {
            rom_offset: self.u32_at(field::ARM7_ROM_OFFSET),
            entry_address: self.u32_at(field::ARM7_ENTRY),
            load_address: self.u32_at(field::ARM7_RAM),
            size: self.u32_at(field::ARM7_SIZE),
        }
    }

    /// name table location
    pub fn fnt(&self) -> Region {
        Region::new(self.u32_at(field::FNT_OFFSET), self.u32_at(field::FNT_SIZE))
    }

    /// allocation table location
    pub fn fat(&self) -> Region {
        Region::new(self.u32_at(field::FAT_OFFSET), self.u32_at(field::FAT_SIZE))
    }

    pub fn arm9_overlay(&self) -> Region {
        Region::new(
            self.u32_at(field::ARM9_OVERLAY_OFFSET),
            self.u32_at(field::ARM9_OVERLAY_SIZE),
        )
    }

    pub fn arm7_overlay(&self) -> Region {
        Region::new(
            self.u32_at(field::ARM7_OVERLAY_OFFSET),
            self.u32_at(field::ARM7_OVERLAY_SIZE),
        )
    }

    pub fn command_port_normal(&self) -> u32 {
        self.u32_at(field::COMMAND_PORT_NORMAL)
    }

    pub fn command_port_key1(&self) -> u32 {
        self.u32_at(field::COMMAND_PORT_KEY1)
    }

    pub fn icon_title_offset(&self) -> u32 {
        self.u32_at(field::ICON_TITLE_OFFSET)
    }

    pub fn secure_checksum(&self) -> u16 {
        self.u16_at(field::SECURE_CHECKSUM)
    }

    pub fn secure_loading_timeout(&self) -> u16 {
        self.u16_at(field::SECURE_LOADING_TIMEOUT)
    }

    pub fn arm9_autoload(&self) -> u32 {
        self.u32_at(field::ARM9_AUTOLOAD)
    }

    pub fn arm7_autoload(&self) -> u32 {
        self.u32_at(field::ARM7_AUTOLOAD)
    }

    pub fn secure_area_disable(&self) -> u64 {
        self.u64_at(field::SECURE_AREA_DISABLE)
    }

    pub fn size_used(&self) -> u32 {
        self.u32_at(field::SIZE_USED)
    }

    pub fn header_size(&self) -> u32 {
        self.u32_at(field::HEADER_SIZE)
    }

    pub fn set_arm9_offset(&mut self, value: u32) {
        self.set_u32(field::ARM9_ROM_OFFSET, value);
    }

    pub fn set_arm9_size(&mut self, value: u32) {
        self.set_u32(field::ARM9_SIZE, value);
    }

    pub fn set_arm7_offset(&mut self, value: u32) {
        self.set_u32(field::ARM7_ROM_OFFSET, value);
    }

    pub fn set_arm7_size(&mut self, value: u32) {
        self.set_u32(field::ARM7_SIZE, value);
    }

    pub fn set_fnt(&mut self, region: Region) {
        self.set_u32(field::FNT_OFFSET, region.offset);
        self.set_u32(field::FNT_SIZE, region.size);
    }

    pub fn set_fat(&mut self, region: Region) {
        self.set_u32(field::FAT_OFFSET, region.offset);
        self.set_u32(field::FAT_SIZE, region.size);
    }

    pub fn set_arm9_overlay(&mut self, region: Region) {
        self.set_u32(field::ARM9_OVERLAY_OFFSET, region.offset);
        self.set_u32(field::ARM9_OVERLAY_SIZE, region.size);
    }

    pub fn set_arm7_overlay(&mut self, region: Region) {
        self.set_u32(field::ARM7_OVERLAY_OFFSET, region.offset);
        self.set_u32(field::ARM7_OVERLAY_SIZE, region.size);
    }

    pub fn set_icon_title_offset(&mut self, value: u32) {
        self.set_u32(field::ICON_TITLE_OFFSET, value);
    }
}

impl fmt::Debug for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Header")
            .field("title", &self.title())
            .field("game_code", &self.game_code())
            .field("maker_code", &self.maker_code())
            .field("arm9", &self.arm9())
            .field("arm7", &self.arm7())
            .field("fnt", &self.fnt())
            .field("fat", &self.fat())
            .finish_non_exhaustive()
    }
}
