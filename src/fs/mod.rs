pub mod io;
pub mod scan;

pub use io::{read_optional, read_required, write_file, ImageFile};
pub use scan::{list_dir, scan_tree, Listing};
