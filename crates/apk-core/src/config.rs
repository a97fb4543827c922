//! Construction-time configuration.
//!
//! Everything an [`crate::Apk`] needs is gathered into [`ApkConfig`]: the
//! injected capabilities, the cache location, the layout tables and the
//! well-known paths. Defaults describe a stock host install; tests replace
//! individual fields with struct update syntax.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use apk_schema::Arch;

use crate::error::{ApkError, Result};
use crate::fs::{DirFs, Filesystem};
use crate::http::{HttpClient, ReqwestClient};
use crate::initdb::InitLayout;
use crate::reporter::{NullReporter, Reporter};
use crate::{ARCH_PATH, KEYRING_PATH, REPOSITORIES_PATH, SYSTEM_KEYRING_PATH, WORLD_PATH};

/// Well-known locations. All but `system_keyrings` are relative to the
/// managed root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApkPaths {
    pub world: PathBuf,
    pub repositories: PathBuf,
    pub arch: PathBuf,
    /// Trusted keys directory that `init_keyring` populates.
    pub keyring: PathBuf,
    /// Directories searched by `load_system_keyring` when no paths are given.
    pub system_keyrings: Vec<PathBuf>,
}

impl Default for ApkPaths {
    fn default() -> Self {
        Self {
            world: PathBuf::from(WORLD_PATH),
            repositories: PathBuf::from(REPOSITORIES_PATH),
            arch: PathBuf::from(ARCH_PATH),
            keyring: PathBuf::from(KEYRING_PATH),
            system_keyrings: vec![PathBuf::from(SYSTEM_KEYRING_PATH)],
        }
    }
}

/// Capabilities and settings for one managed root.
pub struct ApkConfig {
    /// The managed root. Default: the host filesystem at `/`.
    pub fs: Arc<dyn Filesystem>,
    /// The host view used for local key sources and the package cache.
    /// Default: [`DirFs::host`], so relative paths follow the working
    /// directory.
    pub host_fs: Arc<dyn Filesystem>,
    /// Default: [`ReqwestClient`].
    pub client: Arc<dyn HttpClient>,
    /// Default: [`NullReporter`].
    pub reporter: Arc<dyn Reporter>,
    /// Package cache directory on `host_fs`. `None` (the default) disables
    /// caching and streams packages straight from the network.
    pub cache_dir: Option<PathBuf>,
    /// Treat device node creation failures during `init_db` as warnings.
    /// Default: `false`.
    pub ignore_mknod_errors: bool,
    /// Architecture of the managed root. Default: [`Arch::current`].
    pub arch: Arch,
    /// Upper bound on concurrent downloads in `fetch_packages`. Default: 8.
    pub max_concurrent_fetches: usize,
    pub paths: ApkPaths,
    /// What `init_db` creates. Default: the stock apk database layout.
    pub layout: InitLayout,
}

impl fmt::Debug for ApkConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApkConfig")
            .field("cache_dir", &self.cache_dir)
            .field("ignore_mknod_errors", &self.ignore_mknod_errors)
            .field("arch", &self.arch)
            .field("max_concurrent_fetches", &self.max_concurrent_fetches)
            .field("paths", &self.paths)
            .finish_non_exhaustive()
    }
}

impl Default for ApkConfig {
    fn default() -> Self {
        let client: Arc<dyn HttpClient> = match ReqwestClient::new() {
            Ok(client) => Arc::new(client),
            Err(e) => {
                tracing::warn!("falling back to default HTTP client: {e}");
                Arc::new(ReqwestClient::with_client(reqwest::Client::new()))
            }
        };
        Self {
            fs: Arc::new(DirFs::new("/")),
            host_fs: Arc::new(DirFs::host()),
            client,
            reporter: Arc::new(NullReporter),
            cache_dir: None,
            ignore_mknod_errors: false,
            arch: Arch::current(),
            max_concurrent_fetches: 8,
            paths: ApkPaths::default(),
            layout: InitLayout::default(),
        }
    }
}

impl ApkConfig {
    /// Defaults overlaid with `APK_CACHE_DIR`, `APK_ARCH` and
    /// `APK_IGNORE_MKNOD_ERRORS` from the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ApkError::Arch`] if `APK_ARCH` names an unknown architecture.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(dir) = std::env::var("APK_CACHE_DIR") {
            if !dir.is_empty() {
                config.cache_dir = Some(PathBuf::from(dir));
            }
        }

        if let Ok(arch) = std::env::var("APK_ARCH") {
            config.arch = arch.parse().map_err(|source| ApkError::Arch {
                origin: "APK_ARCH".to_string(),
                source,
            })?;
        }

        config.ignore_mknod_errors = std::env::var("APK_IGNORE_MKNOD_ERRORS")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Ok(config)
    }
}
