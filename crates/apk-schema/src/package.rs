//! Packages and the repositories they are published in.

use crate::{APK_EXTENSION, Arch};

/// A single package build: name, version and the architecture it targets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Package {
    /// Package name (e.g. `alpine-baselayout`).
    pub name: String,
    /// Full version including the release suffix (e.g. `3.2.0-r23`).
    pub version: String,
    /// Target architecture.
    pub arch: Arch,
}

impl Package {
    /// Create a new package reference.
    pub fn new(name: impl Into<String>, version: impl Into<String>, arch: Arch) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            arch,
        }
    }

    /// Archive filename: `<name>-<version>.apk`.
    pub fn filename(&self) -> String {
        format!("{}-{}.{APK_EXTENSION}", self.name, self.version)
    }
}

impl std::fmt::Display for Package {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{} ({})", self.name, self.version, self.arch)
    }
}

/// The base location of a package repository, without the architecture
/// component (e.g. `https://dl-cdn.alpinelinux.org/alpine/v3.16/main`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Repository(String);

impl Repository {
    /// Create a repository reference. Trailing slashes are dropped so that
    /// joined URLs and cache keys do not depend on how the URI was typed.
    pub fn new(uri: &str) -> Self {
        Self(uri.trim_end_matches('/').to_string())
    }

    /// The normalized repository URI.
    pub fn uri(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A package together with the repository it is fetched from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct RepositoryPackage {
    /// The package build.
    pub package: Package,
    /// Where the build is published.
    pub repository: Repository,
}

impl RepositoryPackage {
    /// Pair a package with its repository.
    pub fn new(package: Package, repository: Repository) -> Self {
        Self {
            package,
            repository,
        }
    }

    /// Archive filename, see [`Package::filename`].
    pub fn filename(&self) -> String {
        self.package.filename()
    }

    /// Download URL: `<repository>/<arch>/<filename>`.
    ///
    /// # Example
    ///
    /// ```
    /// use apk_schema::{Arch, Package, Repository, RepositoryPackage};
    ///
    /// let pkg = RepositoryPackage::new(
    ///     Package::new("busybox", "1.36.1-r2", Arch::Aarch64),
    ///     Repository::new("https://dl-cdn.alpinelinux.org/alpine/v3.19/main/"),
    /// );
    /// assert_eq!(
    ///     pkg.url(),
    ///     "https://dl-cdn.alpinelinux.org/alpine/v3.19/main/aarch64/busybox-1.36.1-r2.apk"
    /// );
    /// ```
    pub fn url(&self) -> String {
        format!(
            "{}/{}/{}",
            self.repository.uri(),
            self.package.arch,
            self.filename()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filename() {
        let pkg = Package::new("alpine-baselayout", "3.2.0-r23", Arch::X86_64);
        assert_eq!(pkg.filename(), "alpine-baselayout-3.2.0-r23.apk");
    }

    #[test]
    fn test_repository_trims_trailing_slashes() {
        let repo = Repository::new("https://example.com/alpine/main//");
        assert_eq!(repo.uri(), "https://example.com/alpine/main");
    }
}
