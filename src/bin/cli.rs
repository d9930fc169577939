//! treezip CLI - directory-aware zip and unzip
//!
//! # Examples
//!
//! ```bash
//! # Archive a directory; everything lands under proj/ inside the archive
//! treezip zip ./proj /tmp/out/proj.zip
//!
//! # Archive several sources side by side
//! treezip zip-files notes.txt ./assets ./docs -o bundle.zip
//!
//! # Extract, creating the destination if needed
//! treezip unzip bundle.zip -d /tmp/restore
//!
//! # Generate shell completions
//! treezip --completions bash > ~/.bash_completion.d/treezip
//! ```

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use treezip::{Archiver, Compression, Error, Extractor, OverwritePolicy};

#[derive(Parser)]
#[command(
    name = "treezip",
    about = "Directory-aware zip archive creation and extraction",
    version,
    after_help = "EXAMPLES:
    treezip zip ./proj proj.zip
    treezip zip-files a.txt ./dir -o bundle.zip
    treezip unzip bundle.zip -d /tmp/out"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Generate shell completions for the specified shell
    #[arg(long, value_enum)]
    completions: Option<Shell>,

    /// Quiet mode - only show errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Verbose mode - log each entry
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Archive one file or directory
    Zip {
        /// File or directory to archive
        source: PathBuf,
        /// Archive to create (parent directories are created)
        archive: PathBuf,
        #[command(flatten)]
        compression: CompressionArgs,
    },
    /// Archive several files or directories side by side
    ZipFiles {
        /// Files or directories to archive
        #[arg(required = true)]
        sources: Vec<PathBuf>,
        /// Archive to create (parent directories are created)
        #[arg(short, long)]
        output: PathBuf,
        #[command(flatten)]
        compression: CompressionArgs,
    },
    /// Extract an archive into a directory
    Unzip {
        /// Archive to extract
        archive: PathBuf,
        /// Destination directory (created if missing)
        #[arg(short, long, default_value = ".")]
        dest: PathBuf,
        /// What to do if file already exists
        #[arg(long, value_enum, default_value_t = OverwriteMode::Overwrite)]
        overwrite: OverwriteMode,
    },
}

#[derive(clap::Args)]
struct CompressionArgs {
    /// Store entries without compression
    #[arg(long, conflicts_with = "level")]
    store: bool,

    /// Deflate level (codec default when omitted)
    #[arg(long)]
    level: Option<i64>,
}

impl CompressionArgs {
    fn compression(&self) -> Compression {
        if self.store {
            Compression::Stored
        } else {
            Compression::Deflated { level: self.level }
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum OverwriteMode {
    /// Overwrite existing files
    Overwrite,
    /// Skip existing files
    Skip,
    /// Error if file exists
    Error,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Handle completions generation
    if let Some(shell) = cli.completions {
        generate(shell, &mut Cli::command(), "treezip", &mut io::stdout());
        return ExitCode::SUCCESS;
    }

    init_logging(&cli);

    let Some(command) = cli.command else {
        let _ = Cli::command().print_help();
        return ExitCode::FAILURE;
    };

    if let Err(e) = run(command, cli.quiet) {
        eprintln!("error[{}]: {}", e.code(), e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn init_logging(cli: &Cli) {
    let default = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn run(command: Command, quiet: bool) -> Result<(), Error> {
    match command {
        Command::Zip {
            source,
            archive,
            compression,
        } => {
            let report = Archiver::new(&archive)
                .compression(compression.compression())
                .compress(&source)?;
            if !quiet {
                println!(
                    "Added {} files, {} empty directories ({}) to {}",
                    report.files_added,
                    report.dirs_added,
                    format_bytes(report.bytes_read),
                    archive.display()
                );
            }
        }
        Command::ZipFiles {
            sources,
            output,
            compression,
        } => {
            let report = Archiver::new(&output)
                .compression(compression.compression())
                .compress_many(&sources)?;
            if !quiet {
                println!(
                    "Added {} files, {} empty directories ({}) from {} sources to {}",
                    report.files_added,
                    report.dirs_added,
                    format_bytes(report.bytes_read),
                    sources.len(),
                    output.display()
                );
            }
        }
        Command::Unzip {
            archive,
            dest,
            overwrite,
        } => {
            let overwrite = match overwrite {
                OverwriteMode::Overwrite => OverwritePolicy::Overwrite,
                OverwriteMode::Skip => OverwritePolicy::Skip,
                OverwriteMode::Error => OverwritePolicy::Error,
            };
            let report = Extractor::new(&dest)
                .overwrite(overwrite)
                .extract_file(&archive)?;
            if !quiet {
                println!(
                    "Extracted {} files ({}) to {}",
                    report.files_extracted,
                    format_bytes(report.bytes_written),
                    dest.display()
                );
                if report.entries_skipped > 0 {
                    println!("Skipped {} entries", report.entries_skipped);
                }
            }
        }
    }
    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes >= 1024 * 1024 * 1024 {
        format!("{:.1}G", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    } else if bytes >= 1024 * 1024 {
        format!("{:.1}M", bytes as f64 / (1024.0 * 1024.0))
    } else if bytes >= 1024 {
        format!("{:.1}K", bytes as f64 / 1024.0)
    } else {
        format!("{}B", bytes)
    }
}
