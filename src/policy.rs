//! Path validation and entry naming.
//!
//! Everything that knows about the host path separator lives here. The
//! archiver and extractor only ever see `/`-separated entry names on one
//! side and `Path` values on the other.

use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

use path_jail::Jail;

use crate::error::Error;

/// Separator used inside entry names, independent of the host.
pub const ENTRY_SEPARATOR: char = '/';

// ============================================================================
// Argument validation
// ============================================================================

/// Reject empty path arguments.
pub fn validate_non_empty(path: &Path) -> Result<(), Error> {
    if path.as_os_str().is_empty() {
        return Err(Error::invalid_argument("path is empty"));
    }
    Ok(())
}

/// Fail with [`Error::PathNotFound`] when nothing exists at `path`.
pub fn validate_exists(path: &Path) -> Result<(), Error> {
    if !path.exists() {
        return Err(Error::PathNotFound {
            path: path.display().to_string(),
        });
    }
    Ok(())
}

/// Refuse to write an archive over the single file it is built from.
///
/// The comparison is textual: two spellings of the same file are not caught.
pub fn validate_not_self_overwrite(source: &Path, archive: &Path) -> Result<(), Error> {
    if source.is_file() && source.as_os_str() == archive.as_os_str() {
        return Err(Error::invalid_argument(format!(
            "archive '{}' would overwrite its own source",
            archive.display()
        )));
    }
    Ok(())
}

// ============================================================================
// Entry naming
// ============================================================================

/// Prefix that seeds the walk of `source`.
///
/// A directory nests everything under `<baseName>/`; a single file lands at
/// the archive root, so the prefix is empty.
pub fn root_entry_prefix(source: &Path) -> Result<String, Error> {
    if !source.is_dir() {
        return Ok(String::new());
    }
    let base = base_name(source)?;
    Ok(child_prefix("", &base))
}

/// Extend `prefix` with a directory component.
pub fn child_prefix(prefix: &str, name: &str) -> String {
    format!("{}{}{}", prefix, name, ENTRY_SEPARATOR)
}

/// Name of a file entry directly under `prefix`.
pub fn file_entry_name(prefix: &str, name: &str) -> String {
    format!("{}{}", prefix, name)
}

/// Final component of `path` as UTF-8.
///
/// Paths without a final component (`.`, `dir/..`) are resolved first so that
/// the archive still gets a meaningful top-level folder.
pub fn base_name(path: &Path) -> Result<String, Error> {
    let resolved;
    let name = match path.file_name() {
        Some(name) => name,
        None => {
            resolved = path.canonicalize().map_err(|e| Error::Compression {
                path: path.display().to_string(),
                source: e,
            })?;
            resolved.file_name().ok_or_else(|| {
                Error::invalid_argument(format!("'{}' has no base name", path.display()))
            })?
        }
    };
    utf8_component(name, path)
}

/// Entry names are strings; refuse names that cannot be represented.
fn utf8_component(name: &OsStr, path: &Path) -> Result<String, Error> {
    name.to_str().map(str::to_owned).ok_or_else(|| Error::Compression {
        path: path.display().to_string(),
        source: std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "file name is not valid UTF-8",
        ),
    })
}

/// Convert a `/`-separated entry name into a relative host path.
///
/// Empty and `.` components are dropped and `..` is folded lexically.
/// Callers must reject escaping names before relying on the result.
pub fn entry_relative_path(name: &str) -> PathBuf {
    let mut path = PathBuf::new();
    for component in name.split(ENTRY_SEPARATOR) {
        match component {
            "" | "." => {}
            ".." => {
                path.pop();
            }
            normal => path.push(normal),
        }
    }
    path
}

/// Reject names no filesystem can hold. Returns the reason on failure.
///
/// Only empty names and embedded NUL are refused. Length limits and reserved
/// characters are left to the filesystem, which reports them per entry.
pub fn validate_filename(name: &str) -> Result<(), &'static str> {
    if name.is_empty() {
        return Err("empty filename");
    }
    if name.contains('\0') {
        return Err("contains NUL byte");
    }
    Ok(())
}

// ============================================================================
// Destination containment
// ============================================================================

/// Maps entry names onto paths below an extraction root.
pub struct DestinationPolicy {
    root: PathBuf,
    jail: Jail,
}

impl DestinationPolicy {
    /// The root must already exist.
    pub fn new(root: &Path) -> Result<Self, Error> {
        let jail = Jail::new(root)?;
        Ok(Self {
            root: root.to_path_buf(),
            jail,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Host path for `entry_name`, or an error if the name is unusable or
    /// would land outside the root.
    pub fn resolve(&self, entry_name: &str) -> Result<PathBuf, Error> {
        validate_filename(entry_name).map_err(|reason| Error::InvalidFilename {
            entry: entry_name.to_string(),
            reason: reason.to_string(),
        })?;

        if Path::new(entry_name)
            .components()
            .any(|c| matches!(c, Component::RootDir | Component::Prefix(_)))
        {
            return Err(Error::PathEscape {
                entry: entry_name.to_string(),
                detail: "absolute path".to_string(),
            });
        }

        // The jail resolves symlinks, so only its verdict is used; the path
        // itself is rebuilt relative to the root.
        self.jail
            .join(entry_name)
            .map_err(|e| Error::PathEscape {
                entry: entry_name.to_string(),
                detail: e.to_string(),
            })?;

        Ok(self.root.join(entry_relative_path(entry_name)))
    }
}
