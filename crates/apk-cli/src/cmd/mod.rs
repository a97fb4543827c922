//! Subcommand implementations.

pub mod arch;
pub mod fetch;
pub mod init;
pub mod keys;
pub mod repos;
pub mod world;

use std::sync::Arc;

use anyhow::{Context, Result};
use apk_core::fs::DirFs;
use apk_core::{Apk, ApkConfig};

use crate::Cli;
use crate::ui::ConsoleReporter;

/// Build an [`Apk`] for the root and flags on the command line.
pub fn open(cli: &Cli) -> Result<Apk> {
    let mut config = ApkConfig::from_env().context("Invalid APK_* environment")?;
    config.fs = Arc::new(DirFs::new(&cli.root));
    config.reporter = Arc::new(ConsoleReporter::new(cli.quiet));
    if let Some(dir) = &cli.cache_dir {
        config.cache_dir = Some(dir.clone());
    }
    if let Some(arch) = cli.arch {
        config.arch = arch;
    }
    if cli.ignore_mknod_errors {
        config.ignore_mknod_errors = true;
    }
    tracing::debug!(root = %cli.root.display(), ?config, "opened root");
    Ok(Apk::new(config))
}
