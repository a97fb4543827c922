//! Repository list commands

use anyhow::{Context, Result};
use apk_core::Apk;

pub fn set(apk: &Apk, uris: &[String]) -> Result<()> {
    apk.set_repositories(uris)
        .context("Failed to write repositories")
}

pub fn list(apk: &Apk) -> Result<()> {
    let repos = apk
        .get_repositories()
        .context("Failed to read repositories")?;
    for repo in repos {
        println!("{repo}");
    }
    Ok(())
}
