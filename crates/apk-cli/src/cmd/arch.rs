//! Architecture commands

use anyhow::{Context, Result};
use apk_core::{Apk, Arch};

pub fn set(apk: &Apk, arch: Arch) -> Result<()> {
    apk.set_arch(arch).context("Failed to record architecture")
}

pub fn show(apk: &Apk) -> Result<()> {
    let arch = apk.get_arch().context("Failed to read architecture")?;
    println!("{arch}");
    Ok(())
}
