mod record;
mod tree;

pub use record::{overlay_file_name, ByteRange, FileRecord};
pub use tree::{
    validate_entry_name, DirectoryNode, DirectoryTree, FileEntry, Walk, MAX_DIRECTORIES,
    MAX_NAME_LEN, ROOT_ID,
};

pub(crate) use tree::join_path;
