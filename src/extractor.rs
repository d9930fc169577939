use std::fs;
use std::io::{Read, Seek, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::archiver::BUFFER_LEN;
use crate::error::Error;
use crate::policy::{self, DestinationPolicy};

/// What to do when a file already exists at the extraction path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OverwritePolicy {
    /// Truncate and rewrite existing files.
    #[default]
    Overwrite,
    /// Skip files that already exist. Useful for resuming a failed extraction.
    Skip,
    /// Fail extraction if file exists.
    Error,
}

#[derive(Debug, Clone, Default)]
pub struct ExtractionReport {
    pub files_extracted: usize,
    pub dirs_created: usize,
    pub bytes_written: u64,
    pub entries_skipped: usize,
}

/// Materializes a zip archive under a destination directory.
///
/// Entries are processed one at a time in archive order, sizes taken from the
/// central directory, so archives whose local headers defer sizes to a
/// trailing data descriptor extract like any other. Parent directories are
/// created on demand, so archives that carry no explicit directory entries
/// still extract into the right tree.
///
/// Entry names are only rejected when they cannot be placed under the
/// destination: empty names, names containing NUL, absolute names, and names
/// whose `..` components climb out of the root.
///
/// **Extraction is not transactional.** If entry N fails, entries before it
/// stay on disk. Re-running with [`OverwritePolicy::Skip`] picks up where a
/// failed run stopped.
pub struct Extractor {
    destination: PathBuf,
    overwrite: OverwritePolicy,
}

impl Extractor {
    /// Extract into `destination`, which is created (with any missing
    /// ancestors) when extraction starts.
    pub fn new<P: AsRef<Path>>(destination: P) -> Self {
        Self {
            destination: destination.as_ref().to_path_buf(),
            overwrite: OverwritePolicy::default(),
        }
    }

    pub fn overwrite(mut self, policy: OverwritePolicy) -> Self {
        self.overwrite = policy;
        self
    }

    /// Extract the archive at `archive`.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] if either path is empty
    /// - [`Error::ArchiveNotFound`] if `archive` does not exist; nothing is
    ///   created in that case
    /// - [`Error::Extraction`] if an entry cannot be read or written
    pub fn extract_file<P: AsRef<Path>>(&self, archive: P) -> Result<ExtractionReport, Error> {
        let archive = archive.as_ref();
        policy::validate_non_empty(archive)?;
        policy::validate_non_empty(&self.destination)?;
        if !archive.is_file() {
            return Err(Error::ArchiveNotFound {
                path: archive.display().to_string(),
            });
        }

        let file = fs::File::open(archive).map_err(|e| Error::Extraction {
            entry: archive.display().to_string(),
            source: e,
        })?;
        self.extract(std::io::BufReader::new(file))
    }

    /// Extract from any seekable source holding a zip archive.
    pub fn extract<R: Read + Seek>(&self, reader: R) -> Result<ExtractionReport, Error> {
        policy::validate_non_empty(&self.destination)?;
        let mut archive = zip::ZipArchive::new(reader)?;
        fs::create_dir_all(&self.destination)?;
        let jail = DestinationPolicy::new(&self.destination)?;

        let mut report = ExtractionReport::default();
        let mut buffer = [0u8; BUFFER_LEN];

        let result = self.extract_entries(&mut archive, &jail, &mut buffer, &mut report);
        match result {
            Ok(()) => {
                info!(
                    destination = %self.destination.display(),
                    files = report.files_extracted,
                    dirs = report.dirs_created,
                    bytes = report.bytes_written,
                    "archive extracted"
                );
                Ok(report)
            }
            Err(e) => {
                warn!(
                    destination = %self.destination.display(),
                    extracted = report.files_extracted,
                    error = %e,
                    "extraction aborted, already extracted entries left in place"
                );
                Err(e)
            }
        }
    }

    fn extract_entries<R: Read + Seek>(
        &self,
        archive: &mut zip::ZipArchive<R>,
        jail: &DestinationPolicy,
        buffer: &mut [u8],
        report: &mut ExtractionReport,
    ) -> Result<(), Error> {
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            let name = entry.name().to_string();
            let target = jail.resolve(&name)?;

            if entry.is_dir() {
                debug!(entry = %name, "creating directory");
                if !target.is_dir() {
                    fs::create_dir_all(&target).map_err(|e| entry_error(&name, e))?;
                    report.dirs_created += 1;
                }
                continue;
            }

            // Archives need not carry an entry for every parent directory.
            if let Some(parent) = target.parent() {
                if !parent.is_dir() {
                    fs::create_dir_all(parent).map_err(|e| entry_error(&name, e))?;
                }
            }

            let Some(mut output) = self.open_output(&name, &target)? else {
                debug!(entry = %name, "skipping existing file");
                report.entries_skipped += 1;
                continue;
            };

            debug!(entry = %name, "writing file");
            loop {
                let n = match entry.read(buffer) {
                    Ok(0) => break,
                    Ok(n) => n,
                    Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                    Err(e) => return Err(entry_error(&name, e)),
                };
                output
                    .write_all(&buffer[..n])
                    .map_err(|e| entry_error(&name, e))?;
                report.bytes_written += n as u64;
            }
            output.flush().map_err(|e| entry_error(&name, e))?;
            report.files_extracted += 1;
        }
        Ok(())
    }

    /// Open the output file according to the overwrite policy.
    /// `None` means the entry should be skipped.
    fn open_output(&self, name: &str, target: &Path) -> Result<Option<fs::File>, Error> {
        let opened = match self.overwrite {
            OverwritePolicy::Overwrite => fs::File::create(target),
            // create_new(true) is atomic: fails if file exists (no TOCTOU)
            OverwritePolicy::Skip | OverwritePolicy::Error => fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(target),
        };

        match opened {
            Ok(file) => Ok(Some(file)),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => match self.overwrite {
                OverwritePolicy::Skip => Ok(None),
                _ => Err(Error::AlreadyExists {
                    entry: target.display().to_string(),
                }),
            },
            Err(e) => Err(entry_error(name, e)),
        }
    }
}

fn entry_error(entry: &str, source: std::io::Error) -> Error {
    Error::Extraction {
        entry: entry.to_string(),
        source,
    }
}
