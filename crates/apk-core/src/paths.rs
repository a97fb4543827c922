use std::path::{Path, PathBuf};

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};

/// Installed package set: `etc/apk/world`
pub const WORLD_PATH: &str = "etc/apk/world";

/// Configured repository URIs: `etc/apk/repositories`
pub const REPOSITORIES_PATH: &str = "etc/apk/repositories";

/// Managed architecture: `etc/apk/arch`
pub const ARCH_PATH: &str = "etc/apk/arch";

/// Trusted keys used to verify package signatures: `etc/apk/keys`
pub const KEYRING_PATH: &str = "etc/apk/keys";

/// Keys shipped by the host distribution: `/usr/share/apk/keys`
pub const SYSTEM_KEYRING_PATH: &str = "/usr/share/apk/keys";

/// Suffix of the sidecar holding the last `ETag` seen for a cached archive.
pub const ETAG_SUFFIX: &str = ".etag";

/// Extract the filename from a URL.
pub fn filename_from_url(url: &str) -> &str {
    let path = url.split(['?', '#']).next().unwrap_or("");
    path.split('/').next_back().unwrap_or("")
}

/// Sidecar path for a cached archive: the same path with `.etag` appended.
pub fn etag_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(ETAG_SUFFIX);
    PathBuf::from(name)
}

/// Bytes escaped in a cache path segment: everything except the unreserved
/// set `A-Z a-z 0-9 - _ . ~`.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Escape a string so it can be used as a single path segment, using the
/// `application/x-www-form-urlencoded` rules: unreserved bytes pass through,
/// space becomes `+`, everything else becomes `%XX`.
///
/// # Example
///
/// ```
/// use apk_core::paths::query_escape;
///
/// assert_eq!(
///     query_escape("https://dl-cdn.alpinelinux.org/alpine/v3.16/main"),
///     "https%3A%2F%2Fdl-cdn.alpinelinux.org%2Falpine%2Fv3.16%2Fmain"
/// );
/// ```
pub fn query_escape(s: &str) -> String {
    // A literal '%' is itself escaped, so every "%20" left here was a space.
    utf8_percent_encode(s, SEGMENT)
        .to_string()
        .replace("%20", "+")
}

/// Decode `%XX` escapes in a URL path segment. Malformed escapes are kept
/// verbatim rather than rejected.
pub fn percent_decode(s: &str) -> String {
    percent_decode_str(s).decode_utf8_lossy().into_owned()
}
