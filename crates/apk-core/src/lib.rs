//! Core of an apk-compatible package client: database layout, repository
//! and world configuration, keyring bootstrap and a revalidating package
//! cache, all parameterized over injected filesystem and HTTP capabilities.
//!
//! # Layout
//!
//! ```text
//! <root>/
//! ├── etc/apk/world         # explicitly requested packages, sorted
//! ├── etc/apk/repositories  # repository URIs, in caller order
//! ├── etc/apk/keys/         # trusted signing keys
//! └── lib/apk/db/           # installed database
//!
//! <cache>/<escaped repository>/<arch>/<name>-<version>.apk[.etag]
//! ```

pub mod apk;
pub mod cache;
pub mod config;
pub mod error;
pub mod fs;
pub mod http;
pub mod initdb;
pub mod keyring;
pub mod paths;
pub mod reporter;
pub mod state;

mod locks;

pub use apk::Apk;
pub use cache::{FetchSource, FetchedPackage};
pub use config::{ApkConfig, ApkPaths};
pub use error::{ApkError, ErrorKind, Result};
pub use paths::*;
pub use reporter::{NullReporter, Reporter};

pub use apk_schema::{Arch, Package, Repository, RepositoryPackage};
pub use tokio_util::sync::CancellationToken;

/// User Agent string for core operations
pub const USER_AGENT: &str = concat!("apk-core/", env!("CARGO_PKG_VERSION"));
