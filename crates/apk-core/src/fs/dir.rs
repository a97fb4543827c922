//! [`Filesystem`] backed by a directory on the host.

use std::ffi::CString;
use std::fs;
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::{DirBuilderExt, FileTypeExt, MetadataExt, OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};

use super::{normalize, Device, DirEntry, FileKind, Filesystem, Metadata};

/// A host directory treated as the filesystem root. Relative paths are
/// relative to that root, except on [`DirFs::host`].
#[derive(Debug, Clone)]
pub struct DirFs {
    root: PathBuf,
    relative_to_cwd: bool,
}

impl DirFs {
    /// Confine every path to `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            relative_to_cwd: false,
        }
    }

    /// The host filesystem as a process sees it: absolute paths from `/`,
    /// relative paths from the current working directory.
    pub fn host() -> Self {
        Self {
            root: PathBuf::from("/"),
            relative_to_cwd: true,
        }
    }

    /// The directory every path is resolved under.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Host path for `path`, which is always kept inside the root.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if self.relative_to_cwd && path.is_relative() {
            if let Ok(absolute) = std::path::absolute(path) {
                return self.root.join(normalize(&absolute));
            }
        }
        self.root.join(normalize(path))
    }
}

impl Filesystem for DirFs {
    fn metadata(&self, path: &Path) -> io::Result<Metadata> {
        let meta = fs::symlink_metadata(self.resolve(path))?;
        let ft = meta.file_type();
        let kind = if ft.is_dir() {
            FileKind::Dir
        } else if ft.is_file() {
            FileKind::File
        } else if ft.is_char_device() {
            FileKind::CharDevice
        } else if ft.is_symlink() {
            FileKind::Symlink
        } else {
            FileKind::Other
        };
        let device = (kind == FileKind::CharDevice)
            .then(|| decode_device(meta.rdev()))
            .flatten();
        Ok(Metadata {
            kind,
            mode: meta.permissions().mode() & 0o7777,
            len: meta.len(),
            device,
        })
    }

    fn create_dir_all(&self, path: &Path, mode: u32) -> io::Result<()> {
        fs::DirBuilder::new()
            .recursive(true)
            .mode(mode)
            .create(self.resolve(path))
    }

    fn set_mode(&self, path: &Path, mode: u32) -> io::Result<()> {
        fs::set_permissions(self.resolve(path), fs::Permissions::from_mode(mode))
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(self.resolve(path))
    }

    fn write(&self, path: &Path, contents: &[u8], mode: u32) -> io::Result<()> {
        use std::io::Write;

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(mode)
            .open(self.resolve(path))?;
        file.write_all(contents)?;
        file.sync_all()
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(self.resolve(path))? {
            let entry = entry?;
            let ft = entry.file_type()?;
            let kind = if ft.is_dir() {
                FileKind::Dir
            } else if ft.is_file() {
                FileKind::File
            } else if ft.is_char_device() {
                FileKind::CharDevice
            } else if ft.is_symlink() {
                FileKind::Symlink
            } else {
                FileKind::Other
            };
            let name = entry.file_name().to_string_lossy().into_owned();
            entries.push(DirEntry {
                path: path.join(&name),
                name,
                kind,
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    #[allow(unsafe_code)]
    fn mknod(&self, path: &Path, device: Device, mode: u32) -> io::Result<()> {
        let target = self.resolve(path);
        let c_path = CString::new(target.as_os_str().as_bytes())?;
        let dev = encode_device(device)?;

        // SAFETY: `c_path` is a valid NUL-terminated string that outlives the
        // call; mknod(2) only reads it.
        let ret = unsafe { libc::mknod(c_path.as_ptr(), libc::S_IFCHR | mode as libc::mode_t, dev) };
        if ret != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(self.resolve(from), self.resolve(to))
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(self.resolve(path))
    }
}

#[cfg(target_os = "linux")]
fn encode_device(device: Device) -> io::Result<libc::dev_t> {
    Ok(libc::makedev(device.major, device.minor))
}

#[cfg(not(target_os = "linux"))]
fn encode_device(_device: Device) -> io::Result<libc::dev_t> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "device node creation is only supported on Linux",
    ))
}

#[cfg(target_os = "linux")]
fn decode_device(rdev: u64) -> Option<Device> {
    Some(Device::new(libc::major(rdev), libc::minor(rdev)))
}

#[cfg(not(target_os = "linux"))]
fn decode_device(_rdev: u64) -> Option<Device> {
    None
}
