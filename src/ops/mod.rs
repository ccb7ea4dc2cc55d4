//! high-level operations on images and extracted directories

mod build;
mod extract;
mod info;
mod list;

pub use build::{build, resolve_layout, BuildStats};
pub use extract::{extract, ExtractOptions, ExtractStats};
pub use info::{info, ImageInfo};
pub use list::{list, EntryKind, ListEntry};
