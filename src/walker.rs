//! Pre-order tree walk that turns a filesystem subtree into archive entries.
//!
//! The walk keeps an explicit stack instead of recursing, so tree depth is
//! bounded by heap rather than call stack. Entries are produced lazily; only
//! the pending siblings of the current path are held in memory.
//!
//! A directory with children gets **no entry of its own**. It exists in the
//! archive only through the names of its descendants. Empty directories are
//! the only directories recorded explicitly, as `<prefix><name>/`. Consumers
//! that expect an explicit entry for every directory will not find one.
//!
//! Children are visited in the order the filesystem lists them. That order
//! is not sorted and may differ between platforms.
//!
//! Symlinks are followed. A directory link that points back at one of its own
//! ancestors ends the walk with [`Error::Compression`].

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::entry::{ArchiveEntry, EntryKind};
use crate::error::Error;
use crate::policy;

struct Pending {
    path: PathBuf,
    prefix: String,
    /// Canonical paths of the directories above `path`.
    ancestors: Rc<Vec<PathBuf>>,
}

/// Iterator over the entries for one source path.
///
/// # Example
///
/// ```no_run
/// use treezip::EntryWalker;
///
/// for entry in EntryWalker::new("proj")? {
///     println!("{}", entry?.name);
/// }
/// # Ok::<(), treezip::Error>(())
/// ```
pub struct EntryWalker {
    stack: Vec<Pending>,
}

impl EntryWalker {
    /// Walk `source` under the prefix [`policy::root_entry_prefix`] picks for it.
    pub fn new<P: AsRef<Path>>(source: P) -> Result<Self, Error> {
        let source = source.as_ref();
        let prefix = policy::root_entry_prefix(source)?;
        Ok(Self::with_prefix(source, prefix))
    }

    /// Walk `source` under an explicit prefix.
    pub fn with_prefix<P: Into<PathBuf>>(source: P, prefix: String) -> Self {
        Self {
            stack: vec![Pending {
                path: source.into(),
                prefix,
                ancestors: Rc::default(),
            }],
        }
    }

    fn visit(&mut self, pending: Pending) -> Result<Option<ArchiveEntry>, Error> {
        let Pending {
            path,
            prefix,
            ancestors,
        } = pending;

        if !path.is_dir() {
            let name = policy::base_name(&path)?;
            return Ok(Some(ArchiveEntry {
                name: policy::file_entry_name(&prefix, &name),
                kind: EntryKind::File,
                source: path,
            }));
        }

        let canonical = path.canonicalize().map_err(|e| Error::Compression {
            path: path.display().to_string(),
            source: e,
        })?;
        if ancestors.contains(&canonical) {
            return Err(Error::Compression {
                path: path.display().to_string(),
                source: io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "symlink cycle: directory contains itself",
                ),
            });
        }

        let children = list_children(&path)?;
        if children.is_empty() {
            return Ok(Some(ArchiveEntry {
                name: prefix,
                kind: EntryKind::Directory,
                source: path,
            }));
        }

        let mut below = Vec::with_capacity(ancestors.len() + 1);
        below.extend(ancestors.iter().cloned());
        below.push(canonical);
        let below = Rc::new(below);

        // Reversed so the first listed child is popped first.
        for child in children.into_iter().rev() {
            let child_prefix = if child.is_dir() {
                let name = policy::base_name(&child)?;
                policy::child_prefix(&prefix, &name)
            } else {
                prefix.clone()
            };
            self.stack.push(Pending {
                path: child,
                prefix: child_prefix,
                ancestors: Rc::clone(&below),
            });
        }
        Ok(None)
    }
}

impl Iterator for EntryWalker {
    type Item = Result<ArchiveEntry, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(pending) = self.stack.pop() {
            match self.visit(pending) {
                Ok(Some(entry)) => return Some(Ok(entry)),
                Ok(None) => continue,
                Err(e) => {
                    // A failed walk is over; don't yield anything after the error.
                    self.stack.clear();
                    return Some(Err(e));
                }
            }
        }
        None
    }
}

fn list_children(dir: &Path) -> Result<Vec<PathBuf>, Error> {
    let read_error = |e: io::Error| Error::Compression {
        path: dir.display().to_string(),
        source: e,
    };

    let mut children = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_error)? {
        children.push(entry.map_err(read_error)?.path());
    }
    Ok(children)
}
