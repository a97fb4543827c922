//! Package fetching with an optional, ETag-revalidated local cache.
//!
//! Without a cache directory packages stream straight from the network.
//! With one, every fetch goes through the cache:
//!
//! - no cached archive: download, store, return the stored bytes
//! - cached archive, no `.etag` sidecar: download unconditionally and
//!   overwrite, failing if the network does
//! - cached archive with sidecar: conditional GET, keep the cached bytes on
//!   `304` or a matching `ETag`, otherwise overwrite archive and sidecar
//!
//! Fetches of the same cache entry are serialized, and entries are replaced
//! by rename so readers never see a partial archive.

use std::fmt;
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};

use apk_schema::RepositoryPackage;
use bytes::Bytes;
use futures::{StreamExt, TryStreamExt};
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderValue, IF_NONE_MATCH};
use tokio::io::{AsyncRead, AsyncReadExt, ReadBuf};
use tokio_util::io::StreamReader;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::apk::Apk;
use crate::error::{ApkError, Result};
use crate::fs::write_atomic;
use crate::http;
use crate::paths::{etag_path, query_escape};

const CACHE_DIR_MODE: u32 = 0o755;
const CACHE_FILE_MODE: u32 = 0o644;

/// Where the bytes of a [`FetchedPackage`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchSource {
    /// Streamed from the network; caching is disabled.
    Network,
    /// The cached archive, confirmed current by the server.
    Cache,
    /// Downloaded and written to the cache.
    Refreshed,
}

impl fmt::Display for FetchSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Network => "network",
            Self::Cache => "cache",
            Self::Refreshed => "refreshed",
        })
    }
}

/// A package archive ready to be read.
///
/// With caching enabled the reader yields exactly the bytes resident in the
/// cache; otherwise exactly the bytes received over the network.
pub struct FetchedPackage {
    source: FetchSource,
    path: Option<PathBuf>,
    reader: Pin<Box<dyn AsyncRead + Send>>,
}

impl FetchedPackage {
    fn from_bytes(source: FetchSource, path: PathBuf, body: Bytes) -> Self {
        Self {
            source,
            path: Some(path),
            reader: Box::pin(Cursor::new(body)),
        }
    }

    /// Whether the bytes came from the network, the cache or a refresh.
    pub fn source(&self) -> FetchSource {
        self.source
    }

    /// The cache entry backing this archive, if caching is enabled.
    pub fn cache_path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Read the whole archive into memory.
    pub async fn bytes(mut self) -> io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.read_to_end(&mut buf).await?;
        Ok(buf)
    }
}

impl fmt::Debug for FetchedPackage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchedPackage")
            .field("source", &self.source)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl AsyncRead for FetchedPackage {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        self.get_mut().reader.as_mut().poll_read(cx, buf)
    }
}

impl Apk {
    /// Cache location of `pkg`:
    /// `<cache_dir>/<escaped repository>/<arch>/<name>-<version>.apk`.
    /// `None` when caching is disabled.
    pub fn cache_path(&self, pkg: &RepositoryPackage) -> Option<PathBuf> {
        self.config().cache_dir.as_ref().map(|dir| {
            dir.join(query_escape(pkg.repository.uri()))
                .join(pkg.package.arch.as_str())
                .join(pkg.filename())
        })
    }

    /// Fetch one package archive.
    ///
    /// # Errors
    ///
    /// Transport failures and non-success statuses are always fatal; there
    /// is no fallback to a cached copy that could not be revalidated.
    /// Cancellation leaves the cache untouched.
    pub async fn fetch_package(
        &self,
        cancel: &CancellationToken,
        pkg: &RepositoryPackage,
    ) -> Result<FetchedPackage> {
        let url = pkg.url();
        self.reporter().fetching(&pkg.package, &url);

        let result = match self.cache_path(pkg) {
            None => self.fetch_uncached(cancel, &url).await,
            Some(path) => self.fetch_cached(cancel, &url, path).await,
        };

        match &result {
            Ok(fetched) => {
                self.reporter()
                    .done(&pkg.package, fetched.source, fetched.cache_path());
            }
            Err(e) => self.reporter().failed(&pkg.package, &e.to_string()),
        }
        result
    }

    /// Fetch several packages, at most `max_concurrent_fetches` at a time.
    /// Results are in input order; one failure does not stop the rest.
    pub async fn fetch_packages(
        &self,
        cancel: &CancellationToken,
        pkgs: &[RepositoryPackage],
    ) -> Vec<Result<FetchedPackage>> {
        let limit = self.config().max_concurrent_fetches.max(1);
        futures::stream::iter(pkgs.iter().map(|pkg| self.fetch_package(cancel, pkg)))
            .buffered(limit)
            .collect()
            .await
    }

    async fn fetch_uncached(&self, cancel: &CancellationToken, url: &str) -> Result<FetchedPackage> {
        let response =
            http::send(self.config().client.as_ref(), cancel, url, HeaderMap::new()).await?;
        if !response.status.is_success() {
            return Err(ApkError::Status {
                url: url.to_string(),
                status: response.status,
            });
        }
        debug!("streaming {url} without cache");
        let body = response.body.map_err(io::Error::other);
        Ok(FetchedPackage {
            source: FetchSource::Network,
            path: None,
            reader: Box::pin(StreamReader::new(body)),
        })
    }

    async fn fetch_cached(
        &self,
        cancel: &CancellationToken,
        url: &str,
        path: PathBuf,
    ) -> Result<FetchedPackage> {
        let _guard = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(ApkError::Cancelled),
            guard = self.locks.lock(&path) => guard,
        };

        let entry = path.clone();
        let (cached, stored_etag) = self
            .on_host(move |fs| {
                if !fs.metadata(&entry).is_ok_and(|m| m.is_file()) {
                    return Ok((false, None));
                }
                let etag = match fs.read(&etag_path(&entry)) {
                    Ok(raw) => Some(String::from_utf8_lossy(&raw).trim().to_string()),
                    Err(e) if e.kind() == io::ErrorKind::NotFound => None,
                    Err(e) => return Err(e),
                };
                Ok((true, etag.filter(|e| !e.is_empty())))
            })
            .await
            .map_err(ApkError::io("inspect cache entry", &path))?;

        let mut headers = HeaderMap::new();
        if let Some(etag) = &stored_etag {
            match HeaderValue::from_str(etag) {
                Ok(value) => {
                    headers.insert(IF_NONE_MATCH, value);
                }
                Err(_) => debug!("ignoring unusable etag {etag:?} for {}", path.display()),
            }
        }
        match (cached, &stored_etag) {
            (false, _) => debug!("cache miss for {url}"),
            (true, None) => debug!("cached {} has no etag, refetching", path.display()),
            (true, Some(etag)) => debug!("revalidating {} with etag {etag}", path.display()),
        }

        let response = http::send(self.config().client.as_ref(), cancel, url, headers).await?;

        let unchanged = stored_etag.is_some()
            && (response.status == StatusCode::NOT_MODIFIED
                || (response.status.is_success() && response.etag() == stored_etag.as_deref()));
        if unchanged {
            debug!("cache hit for {}", path.display());
            let read_path = path.clone();
            let body = self
                .on_host(move |fs| fs.read(&read_path))
                .await
                .map_err(ApkError::io("read cached package", &path))?;
            return Ok(FetchedPackage::from_bytes(
                FetchSource::Cache,
                path,
                Bytes::from(body),
            ));
        }

        if !response.status.is_success() {
            return Err(ApkError::Status {
                url: url.to_string(),
                status: response.status,
            });
        }

        let fresh_etag = response.etag().map(str::to_string);
        let body = http::collect(cancel, url, response.body).await?;

        let target = path.clone();
        let contents = body.clone();
        self.on_host(move |fs| store(fs, &target, &contents, fresh_etag.as_deref()))
            .await
            .map_err(ApkError::io("write cache entry", &path))?;
        debug!("cached {} ({} bytes)", path.display(), body.len());

        Ok(FetchedPackage::from_bytes(FetchSource::Refreshed, path, body))
    }
}

/// Replace the archive at `path` and its sidecar. The old sidecar goes
/// first so a new archive is never paired with a stale `ETag`.
fn store(
    fs: &dyn crate::fs::Filesystem,
    path: &Path,
    contents: &[u8],
    etag: Option<&str>,
) -> io::Result<()> {
    let sidecar = etag_path(path);
    match fs.remove_file(&sidecar) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!("failed to remove stale {}: {e}", sidecar.display()),
    }

    if let Some(parent) = path.parent() {
        fs.create_dir_all(parent, CACHE_DIR_MODE)?;
    }
    write_atomic(fs, path, contents, CACHE_FILE_MODE)?;
    if let Some(etag) = etag {
        write_atomic(fs, &sidecar, etag.as_bytes(), CACHE_FILE_MODE)?;
    }
    Ok(())
}
