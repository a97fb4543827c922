//! Terminal progress output.

use std::path::Path;

use apk_core::{FetchSource, Package, Reporter};

/// Writes progress lines to stderr so stdout stays scriptable.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleReporter {
    quiet: bool,
}

impl ConsoleReporter {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }
}

fn status_word(source: FetchSource) -> &'static str {
    match source {
        FetchSource::Network => "streamed",
        FetchSource::Cache => "cached",
        FetchSource::Refreshed => "downloaded",
    }
}

impl Reporter for ConsoleReporter {
    fn fetching(&self, package: &Package, url: &str) {
        if !self.quiet {
            eprintln!("{:<12}{} {url}", "fetching", package.name);
        }
    }

    fn done(&self, package: &Package, source: FetchSource, _cache_path: Option<&Path>) {
        if !self.quiet {
            eprintln!("{:<12}{}-{}", status_word(source), package.name, package.version);
        }
    }

    fn failed(&self, package: &Package, reason: &str) {
        eprintln!("{:<12}{}-{}: {reason}", "failed", package.name, package.version);
    }

    fn info(&self, msg: &str) {
        if !self.quiet {
            eprintln!("{msg}");
        }
    }

    fn warning(&self, msg: &str) {
        eprintln!("warning: {msg}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_words_are_distinct() {
        let words = [
            status_word(FetchSource::Network),
            status_word(FetchSource::Cache),
            status_word(FetchSource::Refreshed),
        ];
        assert_eq!(words, ["streamed", "cached", "downloaded"]);
    }
}
