//! Archive entries as produced by the tree walk.

use std::path::PathBuf;

/// Whether an entry is a directory marker or a file with payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    /// Zero-length entry whose name ends with `/`.
    Directory,
}

/// One entry to be written into an archive.
///
/// The payload is not held here; it is streamed from `source` when the
/// entry is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Archive-relative name, always `/`-separated.
    pub name: String,
    pub kind: EntryKind,
    /// Filesystem node the entry was produced from.
    pub source: PathBuf,
}

impl ArchiveEntry {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}
