//! The [`Apk`] handle.
//!
//! Operations are split by concern across `initdb`, `state`, `keyring` and
//! `cache`, each adding an `impl Apk` block.

use std::io;
use std::sync::Arc;

use crate::config::ApkConfig;
use crate::fs::Filesystem;
use crate::locks::KeyedLocks;
use crate::reporter::Reporter;

/// A configured client for one managed root.
///
/// Holds no state across calls beyond its configuration and the per-key
/// locks that serialize concurrent fetches of the same cache entry.
#[derive(Debug)]
pub struct Apk {
    config: ApkConfig,
    pub(crate) locks: KeyedLocks,
}

impl Apk {
    /// Wrap `config`; nothing is touched until an operation runs.
    pub fn new(config: ApkConfig) -> Self {
        Self {
            config,
            locks: KeyedLocks::default(),
        }
    }

    /// Settings and capabilities this handle was built with.
    pub fn config(&self) -> &ApkConfig {
        &self.config
    }

    /// The managed root.
    pub fn fs(&self) -> &dyn Filesystem {
        self.config.fs.as_ref()
    }

    pub(crate) fn host_fs(&self) -> &Arc<dyn Filesystem> {
        &self.config.host_fs
    }

    pub(crate) fn reporter(&self) -> &dyn Reporter {
        self.config.reporter.as_ref()
    }

    /// Run blocking work against the host filesystem off the async runtime.
    pub(crate) async fn on_host<T, F>(&self, f: F) -> io::Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn Filesystem) -> io::Result<T> + Send + 'static,
    {
        let fs = Arc::clone(self.host_fs());
        tokio::task::spawn_blocking(move || f(fs.as_ref()))
            .await
            .map_err(io::Error::other)?
    }
}

impl Default for Apk {
    fn default() -> Self {
        Self::new(ApkConfig::default())
    }
}
