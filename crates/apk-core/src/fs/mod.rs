//! Filesystem capability.
//!
//! Everything apk-core reads or writes goes through [`Filesystem`], so the
//! same code can manage a real root directory ([`DirFs`]) or an in-memory
//! tree ([`MemFs`]). Paths are interpreted relative to the implementation's
//! root; a leading `/` is ignored.

mod dir;
mod memory;

pub use dir::DirFs;
pub use memory::MemFs;

use std::io;
use std::path::{Component, Path, PathBuf};

/// Major/minor identity of a device node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Device {
    pub major: u32,
    pub minor: u32,
}

impl Device {
    /// Device identity from its major and minor numbers.
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }
}

/// Type of a filesystem entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Dir,
    File,
    CharDevice,
    Symlink,
    /// Sockets, FIFOs, block devices.
    Other,
}

/// What `stat` reports about a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Metadata {
    pub kind: FileKind,
    /// Permission bits including setuid/setgid/sticky (`mode & 0o7777`).
    pub mode: u32,
    /// Size in bytes.
    pub len: u64,
    /// Device identity, for device nodes on platforms that expose it.
    pub device: Option<Device>,
}

impl Metadata {
    pub fn is_dir(&self) -> bool {
        self.kind == FileKind::Dir
    }

    pub fn is_file(&self) -> bool {
        self.kind == FileKind::File
    }

    pub fn is_char_device(&self) -> bool {
        self.kind == FileKind::CharDevice
    }
}

/// A single directory listing entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Full path of the entry (the listed directory joined with `name`).
    pub path: PathBuf,
    /// Final path component.
    pub name: String,
    pub kind: FileKind,
}

/// Hierarchical storage the core is parameterized over.
pub trait Filesystem: Send + Sync {
    /// Stat `path` without following a final symlink.
    fn metadata(&self, path: &Path) -> io::Result<Metadata>;

    /// Create `path` and any missing parents. Newly created directories get
    /// `mode`; existing ones are left alone.
    fn create_dir_all(&self, path: &Path, mode: u32) -> io::Result<()>;

    /// Set the permission bits of an existing path exactly.
    fn set_mode(&self, path: &Path, mode: u32) -> io::Result<()>;

    /// Whole contents of a regular file.
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Create or truncate `path` with `contents`. The parent must exist.
    fn write(&self, path: &Path, contents: &[u8], mode: u32) -> io::Result<()>;

    /// Entries of a directory, sorted by name.
    fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>>;

    /// Create a character device node.
    fn mknod(&self, path: &Path, device: Device, mode: u32) -> io::Result<()>;

    /// Atomically replace `to` with `from`.
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    fn remove_file(&self, path: &Path) -> io::Result<()>;

    /// Whether `path` can be stat'ed.
    fn exists(&self, path: &Path) -> bool {
        self.metadata(path).is_ok()
    }
}

/// Write `contents` to a temporary sibling of `path` and rename it into
/// place, so readers never observe a partially written file.
pub fn write_atomic(
    fs: &dyn Filesystem,
    path: &Path,
    contents: &[u8],
    mode: u32,
) -> io::Result<()> {
    let name = path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?;
    let mut tmp_name = std::ffi::OsString::from(".");
    tmp_name.push(name);
    tmp_name.push(format!(".tmp-{:08x}", rand::random::<u32>()));
    let tmp = path.with_file_name(tmp_name);

    fs.write(&tmp, contents, mode)?;
    fs.set_mode(&tmp, mode)?;
    if let Err(e) = fs.rename(&tmp, path) {
        let _ = fs.remove_file(&tmp);
        return Err(e);
    }
    Ok(())
}

/// Collapse `path` into its normal components, dropping any root and
/// resolving `.`/`..` lexically. The result never escapes the root.
pub(crate) fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::ParentDir => {
                out.pop();
            }
            Component::RootDir | Component::CurDir | Component::Prefix(_) => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_root_and_dots() {
        assert_eq!(normalize(Path::new("/etc/./apk/keys")), PathBuf::from("etc/apk/keys"));
        assert_eq!(normalize(Path::new("../../etc/../var")), PathBuf::from("var"));
        assert_eq!(normalize(Path::new("/")), PathBuf::new());
    }

    #[test]
    fn test_write_atomic_leaves_no_temp_files() {
        let fs = MemFs::new();
        fs.create_dir_all(Path::new("etc/apk"), 0o755).unwrap();
        write_atomic(&fs, Path::new("etc/apk/world"), b"busybox\n", 0o644).unwrap();
        write_atomic(&fs, Path::new("etc/apk/world"), b"musl\n", 0o644).unwrap();

        let entries = fs.read_dir(Path::new("etc/apk")).unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["world"]);
        assert_eq!(fs.read(Path::new("etc/apk/world")).unwrap(), b"musl\n");
        assert_eq!(fs.metadata(Path::new("etc/apk/world")).unwrap().mode, 0o644);
    }
}
