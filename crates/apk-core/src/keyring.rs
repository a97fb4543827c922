//! Keyring bootstrap and system keyring discovery.
//!
//! `init_keyring` gathers signing keys from local paths and URLs (and,
//! optionally, the system keyring) into the managed trusted keys directory.
//! Every source is resolved before anything is written, so one bad source
//! leaves the keyring exactly as it was.
//!
//! Keys are stored by file name, so one name yields one trusted key. When
//! names collide, an explicit source beats the system keyring, and an arch
//! subdirectory beats its base directory.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use apk_schema::Arch;
use bytes::Bytes;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::apk::Apk;
use crate::error::{ApkError, Result};
use crate::fs::{write_atomic, FileKind};
use crate::http;
use crate::paths::{filename_from_url, percent_decode};

const KEYRING_DIR_MODE: u32 = 0o755;
const KEY_FILE_MODE: u32 = 0o644;

/// Where a signing key comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
    /// A path on the host filesystem.
    Local(PathBuf),
    /// Anything with a URL scheme other than `file:`.
    Remote(String),
}

impl KeySource {
    /// Classify `source` by whether it carries a URL scheme. `file://` URLs
    /// are treated as local paths.
    pub fn parse(source: &str) -> Self {
        match reqwest::Url::parse(source) {
            Ok(url) if url.scheme() == "file" => {
                Self::Local(PathBuf::from(percent_decode(url.path())))
            }
            // Single letter schemes are drive letters, not URLs.
            Ok(url) if url.scheme().len() > 1 => Self::Remote(source.to_string()),
            _ => Self::Local(PathBuf::from(source)),
        }
    }

    /// Name the key is stored under: the basename of a local path, or the
    /// last (decoded) path segment of a URL.
    ///
    /// # Errors
    ///
    /// Returns [`ApkError::InvalidKeySource`] if there is no such name.
    pub fn file_name(&self) -> Result<String> {
        let name = match self {
            Self::Local(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            Self::Remote(url) => {
                let path = reqwest::Url::parse(url)
                    .map(|u| u.path().to_string())
                    .unwrap_or_default();
                percent_decode(filename_from_url(&path))
            }
        };
        if name.is_empty() || name == "." || name == ".." {
            return Err(ApkError::InvalidKeySource(self.to_string()));
        }
        Ok(name)
    }
}

impl std::fmt::Display for KeySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local(path) => write!(f, "{}", path.display()),
            Self::Remote(url) => write!(f, "{url}"),
        }
    }
}

/// Whether `name` follows the `<identity>.pub` key naming convention
/// (e.g. `alpine-devel@lists.alpinelinux.org-4a6a0840.rsa.pub`).
pub fn is_key_file_name(name: &str) -> bool {
    name.len() > ".pub".len() && name.ends_with(".pub") && !name.starts_with('.')
}

/// Extra inputs to [`Apk::init_keyring`].
#[derive(Debug, Clone, Default)]
pub struct KeyringOptions {
    /// Merge keys discovered by [`Apk::load_system_keyring`] from these
    /// directories. `Some(vec![])` searches the configured defaults; `None`
    /// skips the system keyring.
    pub system_keyrings: Option<Vec<PathBuf>>,
    /// Architecture subdirectory to search instead of the configured one.
    pub arch: Option<Arch>,
}

impl Apk {
    /// Install the keys named by `sources` (local paths or URLs) into the
    /// managed keyring directory, creating it if needed. Returns the paths
    /// written.
    ///
    /// # Errors
    ///
    /// Fails on the first source that cannot be read or downloaded, before
    /// any key is written.
    pub async fn init_keyring<S>(
        &self,
        cancel: &CancellationToken,
        sources: &[S],
        options: &KeyringOptions,
    ) -> Result<Vec<PathBuf>>
    where
        S: AsRef<str> + Sync,
    {
        let mut explicit: Vec<(String, Bytes)> = Vec::with_capacity(sources.len());
        for source in sources {
            let source = KeySource::parse(source.as_ref());
            let name = source.file_name()?;
            let data = match &source {
                KeySource::Local(path) => self.read_local_key(path).await?,
                KeySource::Remote(url) => {
                    http::get_bytes(self.config().client.as_ref(), cancel, url).await?
                }
            };
            debug!("resolved key {name} from {source}");
            explicit.push((name, data));
        }

        let mut keys: BTreeMap<String, Bytes> = BTreeMap::new();
        if let Some(dirs) = &options.system_keyrings {
            let arch = options.arch.unwrap_or(self.config().arch);
            // Base directories are listed before their arch subdirectory.
            for path in self.load_system_keyring_for_arch(arch, dirs)? {
                let data = self
                    .fs()
                    .read(&path)
                    .map_err(|source| ApkError::KeyUnreadable {
                        path: path.clone(),
                        source,
                    })?;
                let name = KeySource::Local(path).file_name()?;
                keys.insert(name, Bytes::from(data));
            }
        }
        keys.extend(explicit);

        let keyring = &self.config().paths.keyring;
        self.fs()
            .create_dir_all(keyring, KEYRING_DIR_MODE)
            .map_err(ApkError::io("create keyring directory", keyring))?;

        let mut installed = Vec::with_capacity(keys.len());
        for (name, data) in keys {
            let dest = keyring.join(&name);
            write_atomic(self.fs(), &dest, &data, KEY_FILE_MODE)
                .map_err(ApkError::io("write key", &dest))?;
            installed.push(dest);
        }

        info!(count = installed.len(), "keyring initialized");
        self.reporter()
            .info(&format!("installed {} keys into {}", installed.len(), keyring.display()));
        Ok(installed)
    }

    async fn read_local_key(&self, path: &Path) -> Result<Bytes> {
        let host_path = path.to_path_buf();
        self.on_host(move |fs| fs.read(&host_path))
            .await
            .map(Bytes::from)
            .map_err(|source| ApkError::KeyUnreadable {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Key files in the given system keyring directories (the configured
    /// defaults when `dirs` is empty) and their subdirectory for the
    /// configured architecture.
    ///
    /// # Errors
    ///
    /// Fails if a directory does not exist, or if no key files are found at
    /// all.
    pub fn load_system_keyring(&self, dirs: &[PathBuf]) -> Result<Vec<PathBuf>> {
        self.load_system_keyring_for_arch(self.config().arch, dirs)
    }

    /// [`Apk::load_system_keyring`] with an explicit architecture.
    pub fn load_system_keyring_for_arch(
        &self,
        arch: Arch,
        dirs: &[PathBuf],
    ) -> Result<Vec<PathBuf>> {
        let dirs = if dirs.is_empty() {
            self.config().paths.system_keyrings.as_slice()
        } else {
            dirs
        };

        let fs = self.fs();
        let mut found = Vec::new();
        for dir in dirs {
            match fs.metadata(dir) {
                Ok(meta) if meta.is_dir() => {}
                Ok(_) => {
                    return Err(ApkError::KeyringMissing {
                        path: dir.clone(),
                        source: std::io::Error::other("not a directory"),
                    });
                }
                Err(source) => {
                    return Err(ApkError::KeyringMissing {
                        path: dir.clone(),
                        source,
                    });
                }
            }

            let arch_dir = dir.join(arch.as_str());
            let mut candidates = vec![dir.clone()];
            if fs.metadata(&arch_dir).is_ok_and(|m| m.is_dir()) {
                candidates.push(arch_dir);
            }

            for candidate in candidates {
                let entries = fs
                    .read_dir(&candidate)
                    .map_err(ApkError::io("list", &candidate))?;
                found.extend(
                    entries
                        .into_iter()
                        .filter(|e| e.kind == FileKind::File && is_key_file_name(&e.name))
                        .map(|e| e.path),
                );
            }
        }

        if found.is_empty() {
            return Err(ApkError::NoKeys {
                searched: dirs.to_vec(),
            });
        }
        debug!(count = found.len(), "system keyring loaded");
        Ok(found)
    }
}
