//! Reporter trait for dependency injection
//!
//! This trait allows core logic to report progress and status without
//! being coupled to a specific terminal UI.

use std::path::Path;

use apk_schema::Package;

use crate::cache::FetchSource;

pub trait Reporter: Send + Sync {
    /// A package download or revalidation has started.
    fn fetching(&self, package: &Package, url: &str);

    /// A package fetch completed.
    fn done(&self, package: &Package, source: FetchSource, cache_path: Option<&Path>);

    /// A package fetch failed with a specific reason.
    fn failed(&self, package: &Package, reason: &str);

    /// Log an informational message.
    fn info(&self, msg: &str);

    /// Log a warning message.
    fn warning(&self, msg: &str);
}

impl<T: Reporter + ?Sized> Reporter for std::sync::Arc<T> {
    fn fetching(&self, package: &Package, url: &str) {
        (**self).fetching(package, url);
    }
    fn done(&self, package: &Package, source: FetchSource, cache_path: Option<&Path>) {
        (**self).done(package, source, cache_path);
    }
    fn failed(&self, package: &Package, reason: &str) {
        (**self).failed(package, reason);
    }
    fn info(&self, msg: &str) {
        (**self).info(msg);
    }
    fn warning(&self, msg: &str) {
        (**self).warning(msg);
    }
}

/// A no-op reporter for silent operations (e.g., library use, testing).
#[derive(Debug, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn fetching(&self, _: &Package, _: &str) {}
    fn done(&self, _: &Package, _: FetchSource, _: Option<&Path>) {}
    fn failed(&self, _: &Package, _: &str) {}
    fn info(&self, _: &str) {}
    fn warning(&self, _: &str) {}
}
