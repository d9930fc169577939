use std::fs;
use std::io::{Read, Seek, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::entry::{ArchiveEntry, EntryKind};
use crate::error::Error;
use crate::policy;
use crate::walker::EntryWalker;

/// Size of the buffer file payloads are streamed through, in both directions.
pub const BUFFER_LEN: usize = 2048;

/// How file payloads are stored in the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    /// No compression.
    Stored,
    /// Deflate at the given level, or the codec default when `None`.
    Deflated { level: Option<i64> },
}

impl Default for Compression {
    fn default() -> Self {
        Self::Deflated { level: None }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CompressionReport {
    pub files_added: usize,
    /// Explicit directory entries, i.e. empty directories.
    pub dirs_added: usize,
    pub bytes_read: u64,
}

/// Writes one or more filesystem trees into a zip archive.
///
/// # Partial output
///
/// Validation happens before the archive file is created, so a bad argument
/// or missing source leaves nothing behind. Once writing has started, any
/// I/O failure aborts the call and the partially written archive is left
/// where it is.
///
/// # Example
///
/// ```no_run
/// use treezip::Archiver;
///
/// let report = Archiver::new("/tmp/out/proj.zip").compress("/home/me/proj")?;
/// println!("{} files", report.files_added);
/// # Ok::<(), treezip::Error>(())
/// ```
pub struct Archiver {
    archive: PathBuf,
    compression: Compression,
}

impl Archiver {
    /// Target the archive at `archive`. Missing parent directories are
    /// created when the archive is written.
    pub fn new<P: AsRef<Path>>(archive: P) -> Self {
        Self {
            archive: archive.as_ref().to_path_buf(),
            compression: Compression::default(),
        }
    }

    pub fn compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Archive a single file or directory.
    ///
    /// A file is stored at the archive root under its own name. A directory
    /// is stored under one top-level folder named after it.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] for an empty path, or when `source` is a
    ///   file and the archive path is identical to it
    /// - [`Error::PathNotFound`] if `source` does not exist (no archive is created)
    /// - [`Error::Compression`] for any I/O failure once writing has begun
    pub fn compress<P: AsRef<Path>>(&self, source: P) -> Result<CompressionReport, Error> {
        let source = source.as_ref();
        policy::validate_non_empty(source)?;
        policy::validate_non_empty(&self.archive)?;
        policy::validate_exists(source)?;
        policy::validate_not_self_overwrite(source, &self.archive)?;

        let walker = EntryWalker::new(source)?;
        self.write(vec![walker])
    }

    /// Archive several sources side by side at the archive root.
    ///
    /// Every source is walked with its own root prefix. No merging is done:
    /// if two sources produce the same entry name the codec rejects the
    /// second one and the call fails with [`Error::Compression`].
    ///
    /// # Errors
    ///
    /// All sources are checked before the archive is created. An empty or
    /// missing source is reported as [`Error::InvalidArgument`].
    pub fn compress_many<P: AsRef<Path>>(
        &self,
        sources: &[P],
    ) -> Result<CompressionReport, Error> {
        policy::validate_non_empty(&self.archive)?;

        let mut walkers = Vec::with_capacity(sources.len());
        for source in sources {
            let source = source.as_ref();
            policy::validate_non_empty(source)?;
            policy::validate_exists(source).map_err(|e| Error::invalid_argument(e.to_string()))?;
            policy::validate_not_self_overwrite(source, &self.archive)?;
            walkers.push(EntryWalker::new(source)?);
        }

        self.write(walkers)
    }

    fn write(&self, walkers: Vec<EntryWalker>) -> Result<CompressionReport, Error> {
        let mut zip = self.create()?;
        let mut report = CompressionReport::default();

        if let Err(e) = self.write_entries(&mut zip, walkers, &mut report) {
            warn!(
                archive = %self.archive.display(),
                error = %e,
                "compression aborted, partial archive left in place"
            );
            return Err(e);
        }

        zip.finish().map_err(|e| self.codec_error(e))?;

        info!(
            archive = %self.archive.display(),
            files = report.files_added,
            dirs = report.dirs_added,
            bytes = report.bytes_read,
            "archive written"
        );
        Ok(report)
    }

    fn create(&self) -> Result<ZipWriter<fs::File>, Error> {
        if let Some(parent) = self.archive.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| self.archive_error(e))?;
            }
        }
        let file = fs::File::create(&self.archive).map_err(|e| self.archive_error(e))?;
        Ok(ZipWriter::new(file))
    }

    fn write_entries<W: Write + Seek>(
        &self,
        zip: &mut ZipWriter<W>,
        walkers: Vec<EntryWalker>,
        report: &mut CompressionReport,
    ) -> Result<(), Error> {
        let options = self.options();
        let mut buffer = [0u8; BUFFER_LEN];

        for walker in walkers {
            for entry in walker {
                let entry = entry?;
                self.write_entry(zip, &entry, options, &mut buffer, report)?;
            }
        }
        Ok(())
    }

    fn write_entry<W: Write + Seek>(
        &self,
        zip: &mut ZipWriter<W>,
        entry: &ArchiveEntry,
        options: SimpleFileOptions,
        buffer: &mut [u8],
        report: &mut CompressionReport,
    ) -> Result<(), Error> {
        match entry.kind {
            EntryKind::Directory => {
                debug!(entry = %entry.name, "adding directory");
                zip.add_directory(entry.name.as_str(), options)
                    .map_err(|e| self.codec_error(e))?;
                report.dirs_added += 1;
            }
            EntryKind::File => {
                debug!(entry = %entry.name, "adding file");
                let source_error = |e: std::io::Error| Error::Compression {
                    path: entry.source.display().to_string(),
                    source: e,
                };

                let mut input = fs::File::open(&entry.source).map_err(source_error)?;
                zip.start_file(entry.name.as_str(), options)
                    .map_err(|e| self.codec_error(e))?;

                loop {
                    let n = match input.read(buffer) {
                        Ok(0) => break,
                        Ok(n) => n,
                        Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                        Err(e) => return Err(source_error(e)),
                    };
                    zip.write_all(&buffer[..n])
                        .map_err(|e| self.archive_error(e))?;
                    report.bytes_read += n as u64;
                }
                report.files_added += 1;
            }
        }
        Ok(())
    }

    fn options(&self) -> SimpleFileOptions {
        match self.compression {
            Compression::Stored => {
                SimpleFileOptions::default().compression_method(CompressionMethod::Stored)
            }
            Compression::Deflated { level } => SimpleFileOptions::default()
                .compression_method(CompressionMethod::Deflated)
                .compression_level(level),
        }
    }

    fn archive_error(&self, e: std::io::Error) -> Error {
        Error::Compression {
            path: self.archive.display().to_string(),
            source: e,
        }
    }

    fn codec_error(&self, e: zip::result::ZipError) -> Error {
        let source = match e {
            zip::result::ZipError::Io(io) => io,
            other => std::io::Error::other(other),
        };
        self.archive_error(source)
    }
}
