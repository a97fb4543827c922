//! apkc - bootstrap and populate apk roots
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
//!
//! Thin driver over `apk-core`: every subcommand maps onto one core
//! operation against the root given by `--root`.
//!
//! # Typical bootstrap
//!
//! ```text
//! apkc --root ./rootfs init
//! apkc --root ./rootfs keys add https://alpinelinux.org/keys/<key>.rsa.pub
//! apkc --root ./rootfs repos set https://dl-cdn.alpinelinux.org/alpine/v3.19/main
//! apkc --root ./rootfs world set alpine-baselayout busybox
//! apkc --root ./rootfs --cache-dir ./cache fetch busybox=1.36.1-r15
//! ```

pub mod cmd;
pub mod ui;

use std::path::PathBuf;

use apk_schema::Arch;
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "apkc")]
#[command(author, version, about = "apkc - bootstrap and populate apk roots")]
pub struct Cli {
    /// Root of the managed system
    #[arg(long, global = true, env = "APK_ROOT", default_value = "/")]
    pub root: PathBuf,

    /// Package cache directory (disables caching when unset)
    #[arg(long, global = true, env = "APK_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Architecture of the managed root (apk, Go or Rust spelling)
    #[arg(long, global = true, env = "APK_ARCH")]
    pub arch: Option<Arch>,

    /// Treat device node creation failures as warnings
    #[arg(long, global = true)]
    pub ignore_mknod_errors: bool,

    /// Show debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress progress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create the database layout under the root
    Init,
    /// Manage trusted signing keys
    Keys {
        #[command(subcommand)]
        command: KeysCommands,
    },
    /// Manage the repository list
    Repos {
        #[command(subcommand)]
        command: ReposCommands,
    },
    /// Manage explicitly requested packages
    World {
        #[command(subcommand)]
        command: WorldCommands,
    },
    /// Manage the recorded architecture
    Arch {
        #[command(subcommand)]
        command: ArchCommands,
    },
    /// Download package archives
    Fetch {
        /// Packages as name=version (e.g. busybox=1.36.1-r15)
        #[arg(required = true)]
        packages: Vec<String>,
        /// Repository to fetch from (defaults to the first configured one)
        #[arg(long, short)]
        repository: Option<String>,
        /// Copy the archives into this directory
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, Subcommand)]
pub enum KeysCommands {
    /// Install keys from local paths or URLs
    Add {
        /// Key files or URLs
        sources: Vec<String>,
        /// Also install keys from the system keyring
        #[arg(long)]
        system: bool,
        /// System keyring directory to search (repeatable)
        #[arg(long = "system-dir", requires = "system")]
        system_dirs: Vec<PathBuf>,
    },
    /// List trusted keys
    List {
        /// List the system keyring instead of the root's keys
        #[arg(long)]
        system: bool,
        /// System keyring directory to search (repeatable)
        #[arg(long = "system-dir", requires = "system")]
        system_dirs: Vec<PathBuf>,
    },
}

#[derive(Debug, Subcommand)]
pub enum ReposCommands {
    /// Replace the repository list, keeping the given order
    Set {
        #[arg(required = true)]
        uris: Vec<String>,
    },
    /// Print configured repositories
    List,
}

#[derive(Debug, Subcommand)]
pub enum WorldCommands {
    /// Replace the world file
    Set {
        /// Package names
        names: Vec<String>,
    },
    /// Print the world file
    List,
}

#[derive(Debug, Subcommand)]
pub enum ArchCommands {
    /// Record the architecture of the root
    Set { arch: Arch },
    /// Print the recorded architecture
    Show,
}
