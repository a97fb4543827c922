//! Keyring commands

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use apk_core::keyring::{KeyringOptions, is_key_file_name};
use apk_core::{Apk, CancellationToken};

/// Install keys from local paths or URLs, optionally merging the system keyring
pub async fn add(
    apk: &Apk,
    cancel: &CancellationToken,
    sources: &[String],
    system: bool,
    system_dirs: Vec<PathBuf>,
) -> Result<()> {
    if sources.is_empty() && !system {
        bail!("No key sources given (pass paths, URLs or --system)");
    }
    let options = KeyringOptions {
        system_keyrings: system.then_some(system_dirs),
        arch: None,
    };
    let installed = apk
        .init_keyring(cancel, sources, &options)
        .await
        .context("Failed to initialize keyring")?;
    for path in installed {
        println!("{}", path.display());
    }
    Ok(())
}

/// List trusted keys in the root, or in the system keyring
pub fn list(apk: &Apk, system: bool, system_dirs: &[PathBuf]) -> Result<()> {
    if system {
        let keys = apk
            .load_system_keyring(system_dirs)
            .context("Failed to load system keyring")?;
        for key in keys {
            println!("{}", key.display());
        }
        return Ok(());
    }

    let keyring = &apk.config().paths.keyring;
    let entries = apk
        .fs()
        .read_dir(keyring)
        .with_context(|| format!("Failed to list {}", keyring.display()))?;
    for entry in entries.iter().filter(|e| is_key_file_name(&e.name)) {
        println!("{}", entry.name);
    }
    Ok(())
}
