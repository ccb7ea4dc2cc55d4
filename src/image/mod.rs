//! image assembly and image reading

mod assemble;
mod reader;
pub mod sys;
mod writer;

pub use assemble::{assemble, Assembled};
pub use reader::ImageReader;
pub use sys::SysFiles;
pub use writer::ImageWriter;
