use std::fmt;

/// Errors that can occur while compressing or extracting an archive.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in minor versions without breaking existing code. Always include a
/// catch-all `_ =>` arm when matching.
#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    /// A path argument is empty, or the archive would overwrite its own source.
    InvalidArgument { reason: String },

    /// Source path passed to a compress call does not exist.
    PathNotFound { path: String },

    /// Archive passed to an extract call does not exist.
    ArchiveNotFound { path: String },

    /// I/O failure while reading a source or writing the archive.
    Compression { path: String, source: std::io::Error },

    /// I/O failure while reading the archive or writing an extracted entry.
    Extraction { entry: String, source: std::io::Error },

    /// Entry name is not usable as a filesystem path.
    InvalidFilename { entry: String, reason: String },

    /// Entry resolves to a location outside the destination directory.
    PathEscape { entry: String, detail: String },

    /// File already exists and the overwrite policy is `Error`.
    AlreadyExists { entry: String },

    /// Zip format error.
    Zip(zip::result::ZipError),

    /// IO error outside of a specific entry (e.g. creating the destination root).
    Io(std::io::Error),

    /// Path jail error.
    Jail(path_jail::JailError),
}

/// The four failure classes a caller needs to tell apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad path argument; the caller can fix the call.
    InvalidArgument,
    /// Missing source path or archive; the caller can fix the call.
    NotFound,
    /// Environmental failure while writing an archive.
    Compression,
    /// Environmental failure while reading an archive or writing its entries.
    Extraction,
}

/// Symbolic code reported to command dispatchers, one per failed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    FileNotExist,
    CompressFileError,
    FilePathError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FileNotExist => "FILE_NOT_EXIST",
            Self::CompressFileError => "COMPRESS_FILE_ERROR",
            Self::FilePathError => "FILE_PATH_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Error {
    pub(crate) fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// Reduce the error to one of the four failure classes.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            Self::PathNotFound { .. } | Self::ArchiveNotFound { .. } => ErrorKind::NotFound,
            Self::Compression { .. } => ErrorKind::Compression,
            Self::Extraction { .. }
            | Self::InvalidFilename { .. }
            | Self::PathEscape { .. }
            | Self::AlreadyExists { .. }
            | Self::Zip(_)
            | Self::Io(_)
            | Self::Jail(_) => ErrorKind::Extraction,
        }
    }

    /// True when retrying with different arguments can succeed.
    pub fn is_caller_fixable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::InvalidArgument | ErrorKind::NotFound
        )
    }

    /// The symbolic code a command dispatcher reports for this failure.
    ///
    /// A missing archive on `unzip` reports `COMPRESS_FILE_ERROR`, not
    /// `FILE_NOT_EXIST`; only a missing compression source does.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::PathNotFound { .. } => ErrorCode::FileNotExist,
            Self::InvalidArgument { .. } => ErrorCode::FilePathError,
            _ => ErrorCode::CompressFileError,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument { reason } => write!(f, "invalid argument: {}", reason),
            Self::PathNotFound { path } => write!(f, "source path '{}' does not exist", path),
            Self::ArchiveNotFound { path } => write!(f, "archive '{}' does not exist", path),
            Self::Compression { path, source } => {
                write!(f, "failed to compress '{}': {}", path, source)
            }
            Self::Extraction { entry, source } => {
                write!(f, "failed to extract '{}': {}", entry, source)
            }
            Self::InvalidFilename { entry, reason } => {
                write!(f, "invalid filename '{}': {}", entry, reason)
            }
            Self::PathEscape { entry, detail } => {
                write!(f, "path '{}' escapes destination: {}", entry, detail)
            }
            Self::AlreadyExists { entry } => {
                write!(f, "file '{}' already exists", entry)
            }
            Self::Zip(e) => write!(f, "zip format error: {}", e),
            Self::Io(e) => write!(f, "I/O error: {}", e),
            Self::Jail(e) => write!(f, "path validation error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Compression { source, .. } => Some(source),
            Self::Extraction { source, .. } => Some(source),
            Self::Zip(e) => Some(e),
            Self::Io(e) => Some(e),
            Self::Jail(e) => Some(e),
            _ => None,
        }
    }
}

// Automatic conversions for ease of use
impl From<zip::result::ZipError> for Error {
    fn from(e: zip::result::ZipError) -> Self {
        Self::Zip(e)
    }
}
impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
impl From<path_jail::JailError> for Error {
    fn from(e: path_jail::JailError) -> Self {
        Self::Jail(e)
    }
}
