//! Directory-aware zip creation and extraction.
//!
//! [`Archiver`] walks files and directory trees into a zip archive;
//! [`Extractor`] turns an archive back into a directory tree, creating
//! missing parent directories as it goes. Payloads are streamed through a
//! small fixed buffer in both directions.
//!
//! ```no_run
//! treezip::zip("/data/proj", "/backup/proj.zip")?;
//! treezip::unzip("/backup/proj.zip", "/restore")?;
//! // /restore/proj/... now mirrors /data/proj
//! # Ok::<(), treezip::Error>(())
//! ```

mod archiver;
mod entry;
mod error;
mod extractor;
pub mod policy;
mod walker;

pub use archiver::{Archiver, Compression, CompressionReport, BUFFER_LEN};
pub use entry::{ArchiveEntry, EntryKind};
pub use error::{Error, ErrorCode, ErrorKind};
pub use extractor::{ExtractionReport, Extractor, OverwritePolicy};
pub use walker::EntryWalker;

use std::path::Path;

/// Archive a single file or directory with default settings.
pub fn zip<S: AsRef<Path>, D: AsRef<Path>>(
    source: S,
    archive: D,
) -> Result<CompressionReport, Error> {
    Archiver::new(archive).compress(source)
}

/// Archive several files or directories side by side with default settings.
pub fn zip_files<S: AsRef<Path>, D: AsRef<Path>>(
    sources: &[S],
    archive: D,
) -> Result<CompressionReport, Error> {
    Archiver::new(archive).compress_many(sources)
}

/// Extract a zip file with default settings.
pub fn unzip<A: AsRef<Path>, D: AsRef<Path>>(
    archive: A,
    destination: D,
) -> Result<ExtractionReport, Error> {
    Extractor::new(destination).extract_file(archive)
}
