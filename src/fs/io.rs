use std::fs::{self, File};
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::error::{Error, IoResultExt, Result};

/// a cartridge image opened for ranged reads
pub struct ImageFile {
    file: File,
    path: PathBuf,
    len: u64,
}

impl ImageFile {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).with_path(path)?;
        let len = file.metadata().with_path(path)?.len();
        Ok(Self {
            file,
            path: path.to_path_buf(),
            len,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// image length in bytes
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// fail unless `start..end` lies inside the image
    pub fn check_range(&self, what: &str, start: u64, end: u64) -> Result<()> {
        if start > end || end > self.len {
            return Err(Error::OffsetOutOfRange {
                what: what.to_string(),
                start,
                end,
                len: self.len,
            });
        }
        Ok(())
    }

    /// read `len` bytes at `offset`
    pub fn read_at(&mut self, what: &str, offset: u64, len: u64) -> Result<Vec<u8>> {
        self.check_range(what, offset, offset + len)?;
        self.file
            .seek(SeekFrom::Start(offset))
            .with_path(&self.path)?;
        let mut buf = vec![0u8; len as usize];
        self.file.read_exact(&mut buf).with_path(&self.path)?;
        Ok(buf)
    }
}

/// write a buffer to `path`, creating parent directories
pub fn write_file(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_path(parent)?;
    }
    fs::write(path, data).with_path(path)
}

/// read a file the build cannot do without
pub fn read_required(path: &Path) -> Result<Vec<u8>> {
    if !path.is_file() {
        return Err(Error::MissingRequiredInput(path.to_path_buf()));
    }
    fs::read(path).with_path(path)
}

/// read a file that may be absent
pub fn read_optional(path: &Path) -> Result<Option<Vec<u8>>> {
    if !path.is_file() {
        return Ok(None);
    }
    fs::read(path).with_path(path).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_read_at() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("image.nds");
        fs::write(&path, (0u8..32).collect::<Vec<_>>()).unwrap();

        let mut image = ImageFile::open(&path).unwrap();
        assert_eq!(image.len(), 32);
        assert_eq!(image.read_at("slice", 4, 3).unwrap(), vec![4, 5, 6]);
        assert!(image.read_at("empty", 32, 0).unwrap().is_empty());
    }

    #[test]
    fn test_read_at_out_of_range() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("image.nds");
        fs::write(&path, [0u8; 16]).unwrap();

        let mut image = ImageFile::open(&path).unwrap();
        assert!(matches!(
            image.read_at("file", 10, 8),
            Err(Error::OffsetOutOfRange { start: 10, end: 18, len: 16, .. })
        ));
    }

    #[test]
    fn test_write_file_creates_parents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a/b/c.bin");

        write_file(&path, b"abc").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"abc");
    }

    #[test]
    fn test_read_required_missing() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            read_required(&dir.path().join("missing.bin")),
            Err(Error::MissingRequiredInput(_))
        ));
        assert!(read_optional(&dir.path().join("missing.bin")).unwrap().is_none());
    }
}
