//! ndsfs - cartridge image filesystem tool
//!
//! extracts handheld cartridge images into a plain directory tree and builds
//! them back, byte for byte.
//!
//! # Image layout
//!
//! - **Header**: 512 bytes at offset 0 describing where everything else lives
//! - **Executables**: two processor binaries (arm9, arm7), each with an
//!   overlay table
//! - **Overlays**: loadable binaries allocated like files but kept outside the
//!   directory tree, at allocation ids `0..K`
//! - **Name table**: directory topology and names, one sub-table per directory
//! - **Allocation table**: `(start, end)` byte ranges, one per allocation id
//!
//! Directory ids and file ids are assigned by one pre-order walk (a
//! directory, its files, then its subdirectories), and the same walk orders
//! the sub-tables and the file payloads.
//!
//! # Extracted directory
//!
//! ```text
//! sys/header.bin  sys/arm9.bin  sys/arm9_overlay.bin  sys/arm7.bin
//! sys/arm7_overlay.bin (optional)  sys/banner.bin (optional)
//! overlay/overlay_0000.bin ...     (optional)
//! files/...
//! layout.toml                      (optional)
//! ```
//!
//! # Example usage
//!
//! ```no_run
//! use ndsfs::{ops, Layout};
//! use std::path::Path;
//!
//! // unpack an image
//! ops::extract(Path::new("game.nds"), Path::new("game"), &ops::ExtractOptions::default()).unwrap();
//!
//! // and pack it again
//! ops::build(Path::new("game"), Path::new("rebuilt.nds"), &Layout::default()).unwrap();
//! ```

mod config;
mod error;

pub mod fs;
pub mod fst;
pub mod header;
pub mod image;
pub mod ops;
pub mod types;

pub use config::{align_up, Layout};
pub use error::{Error, IoResultExt, Result};
pub use header::{Executable, Header, Region, HEADER_SIZE};
pub use types::{ByteRange, DirectoryNode, DirectoryTree, FileEntry, FileRecord};
