//! Shared types for the apk client crates.
//!
//! Kept free of IO so that both the core library and any front-end can
//! depend on it without pulling in the network stack.

pub mod arch;
pub mod package;

// Re-exports
pub use arch::*;
pub use package::*;

/// File extension of a package archive.
pub const APK_EXTENSION: &str = "apk";
