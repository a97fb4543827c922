//! Fetch command

use std::path::Path;

use anyhow::{Context, Result, bail};
use apk_core::{Apk, Arch, CancellationToken, Package, Repository, RepositoryPackage};
use tracing::error;

/// Parse `name=version` into a package for `arch`.
pub fn parse_spec(spec: &str, arch: Arch) -> Result<Package> {
    match spec.split_once('=') {
        Some((name, version)) if !name.is_empty() && !version.is_empty() => {
            Ok(Package::new(name, version, arch))
        }
        _ => bail!("Invalid package '{spec}', expected name=version"),
    }
}

/// Fetch packages through the cache, optionally copying them to `output`
pub async fn fetch(
    apk: &Apk,
    cancel: &CancellationToken,
    specs: &[String],
    repository: Option<&str>,
    output: Option<&Path>,
) -> Result<()> {
    if output.is_none() && apk.config().cache_dir.is_none() {
        bail!("Nothing to keep the archives in: pass --output or --cache-dir");
    }

    let repository = match repository {
        Some(uri) => Repository::new(uri),
        None => {
            let repos = apk
                .get_repositories()
                .context("Failed to read repositories")?;
            match repos.first() {
                Some(uri) => Repository::new(uri),
                None => bail!("No repositories configured (run 'apkc repos set <uri>')"),
            }
        }
    };

    let arch = apk.config().arch;
    let pkgs = specs
        .iter()
        .map(|spec| parse_spec(spec, arch).map(|p| RepositoryPackage::new(p, repository.clone())))
        .collect::<Result<Vec<_>>>()?;

    if let Some(dir) = output {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }

    let results = apk.fetch_packages(cancel, &pkgs).await;
    let mut failed = 0usize;
    for (pkg, result) in pkgs.iter().zip(results) {
        let mut fetched = match result {
            Ok(fetched) => fetched,
            Err(e) => {
                error!("{}: {e}", pkg.package.name);
                failed += 1;
                continue;
            }
        };

        if let Some(dir) = output {
            let dest = dir.join(pkg.filename());
            let mut file = tokio::fs::File::create(&dest)
                .await
                .with_context(|| format!("Failed to create {}", dest.display()))?;
            tokio::io::copy(&mut fetched, &mut file)
                .await
                .with_context(|| format!("Failed to write {}", dest.display()))?;
            println!("{}", dest.display());
        } else if let Some(path) = fetched.cache_path() {
            println!("{}", path.display());
        }
    }

    if failed > 0 {
        bail!("{failed} of {} packages failed to fetch", pkgs.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_spec() {
        let pkg = parse_spec("busybox=1.36.1-r15", Arch::Armv7).unwrap();
        assert_eq!(pkg, Package::new("busybox", "1.36.1-r15", Arch::Armv7));

        assert!(parse_spec("busybox", Arch::X86_64).is_err());
        assert!(parse_spec("=1.0-r0", Arch::X86_64).is_err());
        assert!(parse_spec("busybox=", Arch::X86_64).is_err());
    }
}
