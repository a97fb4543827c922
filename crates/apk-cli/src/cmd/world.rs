//! World file commands

use anyhow::{Context, Result};
use apk_core::Apk;

pub fn set(apk: &Apk, names: &[String]) -> Result<()> {
    apk.set_world(names).context("Failed to write world")
}

pub fn list(apk: &Apk) -> Result<()> {
    for name in apk.get_world().context("Failed to read world")? {
        println!("{name}");
    }
    Ok(())
}
