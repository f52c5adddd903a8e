//! rtpack - bundle a runtime into per-platform release artifacts
//!
//! Library half of the `rtpack` binary: argument definitions, command
//! implementations and the terminal reporter.
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_panics_doc)]

pub mod cmd;
pub mod exit;
pub mod ui;

use std::path::PathBuf;

use clap::{ArgGroup, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "rtpack")]
#[command(author, version, about = "Bundle a runtime into per-platform release artifacts", long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to ./rtpack.toml)
    #[arg(long, global = true, env = "RTPACK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Run as if started in this directory
    #[arg(short = 'C', long = "dir", global = true)]
    pub dir: Option<PathBuf>,

    /// Log debug output (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Build release artifacts, then hash, sign and deploy them
    #[command(group(
        ArgGroup::new("selection")
            .required(true)
            .args(["universal", "all", "targets"])
    ))]
    Build {
        /// Build the platform-independent package
        #[arg(long)]
        universal: bool,

        /// Build every target listed in the configuration
        #[arg(long)]
        all: bool,

        /// Build these platform targets
        #[arg(short = 't', long = "target", value_name = "PLATFORM", num_args = 1..)]
        targets: Vec<String>,

        /// Targets built at once (1 to 4)
        #[arg(short, long)]
        jobs: Option<usize>,
    },

    /// Show the runtime bundle a platform resolves to
    Resolve {
        /// Platform identifier, e.g. linux-x64
        platform: String,
    },

    /// Print md5/sha1 records for files as JSON
    Hash {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Sign files, or every signable file in the output directory
    Sign { files: Vec<PathBuf> },

    /// Check a detached signature
    Verify {
        file: PathBuf,

        /// Armored OpenPGP public key file
        #[arg(long, env = "RTPACK_PUBLIC_KEY")]
        public_key: PathBuf,

        /// Signature file (defaults to <file>.asc)
        #[arg(long)]
        signature: Option<PathBuf>,
    },

    /// List supported platform targets
    Platforms,

    /// Remove the scratch directory and previously produced artifacts
    Clean,
}
