use log::debug;

use crate::config::align_up;
use crate::error::{Error, Result};
use crate::header::Region;

/// growing image buffer with aligned placement
pub struct ImageWriter {
    buf: Vec<u8>,
    fill: u8,
}

impl ImageWriter {
    /// `fill` pads every gap left by `align`
    pub fn new(fill: u8) -> Self {
        Self {
            buf: Vec::new(),
            fill,
        }
    }

    /// current end of the image
    pub fn position(&self) -> u64 {
        self.buf.len() as u64
    }

    /// pad with the fill byte up to the next multiple of `alignment`
    pub fn align(&mut self, alignment: u32) {
        let target = align_up(self.position(), alignment);
        self.pad_to(target, self.fill);
    }

    /// pad with `byte` until the image is `len` bytes long
    pub fn pad_to(&mut self, len: u64, byte: u8) {
        if len > self.position() {
            self.buf.resize(len as usize, byte);
        }
    }

    /// append `bytes` at the current position
    pub fn place(&mut self, what: &str, bytes: &[u8]) -> Result<Region> {
        let offset = self.position();
        let end = offset + bytes.len() as u64;
        if end > u32::MAX as u64 {
            return Err(Error::FileTooLarge(what.into()));
        }
        self.buf.extend_from_slice(bytes);
        debug!("placed {} at {:#x} ({:#x} bytes)", what, offset, bytes.len());
        Ok(Region::new(offset as u32, bytes.len() as u32))
    }

    /// overwrite already placed bytes
    pub fn write_at(&mut self, offset: usize, bytes: &[u8]) {
        self.buf[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_place_and_align() {
        let mut w = ImageWriter::new(0xFF);
        let a = w.place("a", &[1, 2, 3]).unwrap();
        w.align(4);
        let b = w.place("b", &[9]).unwrap();

        assert_eq!(a, Region::new(0, 3));
        assert_eq!(b, Region::new(4, 1));
        assert_eq!(w.into_bytes(), vec![1, 2, 3, 0xFF, 9]);
    }

    #[test]
    fn test_align_noop_when_aligned() {
        let mut w = ImageWriter::new(0xFF);
        w.place("a", &[0; 8]).unwrap();
        w.align(4);
        assert_eq!(w.position(), 8);
    }

    #[test]
    fn test_pad_to_uses_given_byte() {
        let mut w = ImageWriter::new(0xFF);
        w.pad_to(4, 0x00);
        w.align(8);
        assert_eq!(w.into_bytes(), vec![0, 0, 0, 0, 0xFF, 0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn test_write_at() {
        let mut w = ImageWriter::new(0);
        w.pad_to(6, 0);
        w.write_at(2, &[7, 7]);
        assert_eq!(w.into_bytes(), vec![0, 0, 7, 7, 0, 0]);
    }
}
