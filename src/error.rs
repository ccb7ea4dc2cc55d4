use std::path::PathBuf;

/// error type for image operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("truncated input: {what} needs {needed} bytes, only {available} available")]
    TruncatedInput {
        what: &'static str,
        needed: u64,
        available: u64,
    },

    #[error("malformed name table at offset {offset:#x}: {reason}")]
    MalformedNameTable { offset: usize, reason: String },

    #[error("{what} range {start:#x}..{end:#x} lies outside the image ({len:#x} bytes)")]
    OffsetOutOfRange {
        what: String,
        start: u64,
        end: u64,
        len: u64,
    },

    #[error("file too large for a 32-bit image offset: {0}")]
    FileTooLarge(PathBuf),

    #[error("name longer than 127 bytes: {0}")]
    NameTooLong(String),

    #[error("too many directories: the 12-bit directory id space holds at most {0}")]
    TooManyDirectories(usize),

    #[error("too many files: allocation ids exceed {0}")]
    TooManyFiles(usize),

    #[error("required input missing: {0}")]
    MissingRequiredInput(PathBuf),

    #[error("invalid entry name: {0}")]
    InvalidEntryName(String),

    #[error("duplicate entry name: {0}")]
    DuplicateEntryName(String),

    #[error("layout mismatch for {what}: expected {expected:#x}, got {actual:#x}")]
    LayoutMismatch {
        what: String,
        expected: u64,
        actual: u64,
    },

    #[error("extraction target not empty: {0}")]
    TargetNotEmpty(PathBuf),

    #[error("invalid layout: {0}")]
    InvalidLayout(String),

    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("config serialization error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn malformed(offset: usize, reason: impl Into<String>) -> Self {
        Error::MalformedNameTable {
            offset,
            reason: reason.into(),
        }
    }
}

/// helper to wrap io errors with path context
pub trait IoResultExt<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|source| Error::Io {
            path: path.into(),
            source,
        })
    }
}
