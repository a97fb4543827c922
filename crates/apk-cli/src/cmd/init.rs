//! Init command

use anyhow::{Context, Result};
use apk_core::Apk;

/// Create the database layout under the root
pub fn init(apk: &Apk) -> Result<()> {
    apk.init_db().context("Failed to initialize database")?;
    println!("initialized apk database ({})", apk.config().arch);
    Ok(())
}
