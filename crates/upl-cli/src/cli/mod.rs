//! CLI for the upl uploader.

mod commands;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::{Path, PathBuf};
use upl_core::config::{self, UplConfig};
use upl_core::logging::DEFAULT_DIRECTIVE;

use commands::{run_checksum, run_completions, run_purge, run_status, run_upload};

/// Top-level CLI for the upl uploader.
#[derive(Debug, Parser)]
#[command(name = "upl", version)]
#[command(about = "upl: resumable, concurrent file uploader", long_about = None)]
pub struct Cli {
    /// Read configuration from this file instead of ~/.config/upl/config.toml.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Debug-level logging.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Errors only.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Upload files and directories.
    Upload(UploadArgs),

    /// List unfinished chunked uploads that can be resumed.
    Status,

    /// Delete resume records older than the configured age.
    Purge {
        /// Override `resume_max_age_hours` (0 removes everything).
        #[arg(long, value_name = "N")]
        max_age_hours: Option<u64>,
    },

    /// Compute SHA-256 of a file.
    Checksum {
        /// Path to the file.
        path: String,
    },

    /// Print shell completions to stdout.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Options of `upl upload`. Every option left unset keeps the config value.
#[derive(Debug, Args)]
pub struct UploadArgs {
    /// Files or directories to upload.
    #[arg(required_unless_present = "dir", value_name = "PATH")]
    pub paths: Vec<PathBuf>,

    /// Upload every file below this directory.
    #[arg(short, long, value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Server-side target directory.
    #[arg(short, long, visible_alias = "upload-path", value_name = "SUBDIR")]
    pub subdir: Option<String>,

    /// Keep each file's directory below the scan root under the target directory.
    #[arg(long)]
    pub preserve_structure: bool,

    /// Upload endpoint.
    #[arg(long)]
    pub url: Option<String>,

    /// Security key sent with every request.
    #[arg(long)]
    pub key: Option<String>,

    /// Maximum concurrent uploads.
    #[arg(short, long, value_name = "N")]
    pub parallel: Option<usize>,

    /// Chunk size in bytes for resumable uploads.
    #[arg(long, value_name = "BYTES")]
    pub chunk_size: Option<u64>,

    /// Per-request timeout in seconds.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Attempts per file, including the first.
    #[arg(long, value_name = "N")]
    pub retry: Option<u32>,

    /// Gzip files before sending when it makes them smaller.
    #[arg(long)]
    pub compress: bool,

    #[arg(long, value_name = "1-9")]
    pub compression_level: Option<u32>,

    /// XOR whole-file payloads with the obfuscation key.
    #[arg(long)]
    pub obfuscate: bool,

    #[arg(long, value_name = "KEY")]
    pub obfuscation_key: Option<String>,

    /// Comma-separated glob patterns a file must match.
    #[arg(long, value_name = "PATTERNS")]
    pub include: Option<String>,

    /// Comma-separated glob patterns that exclude a file.
    #[arg(long, value_name = "PATTERNS")]
    pub exclude: Option<String>,

    /// Largest accepted file in bytes.
    #[arg(long, value_name = "BYTES")]
    pub max_size: Option<u64>,

    /// Deepest directory level scanned below each directory argument.
    #[arg(long, value_name = "N")]
    pub max_depth: Option<usize>,

    /// Always send files in a single request; ignore and keep resume state.
    #[arg(long)]
    pub no_resume: bool,

    /// List what would be uploaded without sending anything.
    #[arg(long)]
    pub dry_run: bool,
}

impl UploadArgs {
    /// Overlay command-line options on the loaded config.
    pub fn apply(&self, cfg: &mut UplConfig) {
        if let Some(url) = &self.url {
            cfg.url = url.clone();
        }
        if let Some(key) = &self.key {
            cfg.key = key.clone();
        }
        if let Some(n) = self.parallel {
            cfg.max_concurrent = n;
        }
        if let Some(n) = self.chunk_size {
            cfg.chunk_size = n;
        }
        if let Some(n) = self.timeout {
            cfg.timeout_secs = n;
        }
        if let Some(n) = self.retry {
            cfg.retry.max_attempts = n;
        }
        if self.compress {
            cfg.compress = true;
        }
        if let Some(n) = self.compression_level {
            cfg.compression_level = n;
        }
        if self.obfuscate {
            cfg.obfuscate = true;
        }
        if let Some(k) = &self.obfuscation_key {
            cfg.obfuscation_key = k.clone();
        }
        if let Some(p) = &self.include {
            cfg.include_patterns = config::split_list(p);
        }
        if let Some(p) = &self.exclude {
            cfg.exclude_patterns = config::split_list(p);
        }
        if let Some(n) = self.max_size {
            cfg.max_file_size = n;
        }
        if let Some(n) = self.max_depth {
            cfg.max_depth = n;
        }
        if self.preserve_structure {
            cfg.preserve_structure = true;
        }
        if self.no_resume {
            cfg.resume_enabled = false;
        }
    }
}

impl Cli {
    /// Filter used when `RUST_LOG` is unset.
    pub fn log_directive(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            DEFAULT_DIRECTIVE
        }
    }

    fn load_config(&self) -> Result<UplConfig> {
        let cfg = match &self.config {
            Some(path) => config::load_from(path)?,
            None => config::load_or_init()?,
        };
        tracing::debug!("loaded config: {:?}", cfg);
        Ok(cfg)
    }

    /// Dispatch the subcommand. `Ok(false)` means it ran but some file failed.
    pub async fn run(self) -> Result<bool> {
        match &self.command {
            CliCommand::Upload(args) => {
                let cfg = self.load_config()?;
                run_upload(cfg, args, self.quiet).await
            }
            CliCommand::Status => {
                run_status().await?;
                Ok(true)
            }
            CliCommand::Purge { max_age_hours } => {
                let cfg = self.load_config()?;
                run_purge(max_age_hours.unwrap_or(cfg.resume_max_age_hours)).await?;
                Ok(true)
            }
            CliCommand::Checksum { path } => {
                run_checksum(Path::new(path)).await?;
                Ok(true)
            }
            CliCommand::Completions { shell } => {
                run_completions(*shell);
                Ok(true)
            }
        }
    }
}

#[cfg(test)]
mod tests;
