//! Database initialization: the directory, file and device node skeleton
//! of an apk root.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::apk::Apk;
use crate::error::{ApkError, Result};
use crate::fs::Device;

const INIT_DIRECTORIES: &[(&str, u32)] = &[
    ("tmp", 0o1777),
    ("dev", 0o755),
    ("etc", 0o755),
    ("lib", 0o755),
    ("proc", 0o555),
    ("var", 0o755),
    ("etc/apk", 0o755),
    ("etc/apk/keys", 0o755),
    ("lib/apk", 0o755),
    ("lib/apk/db", 0o755),
    ("var/cache", 0o755),
    ("var/cache/apk", 0o755),
    ("var/cache/misc", 0o755),
];

const INIT_FILES: &[(&str, u32, &[u8])] = &[
    ("etc/apk/world", 0o644, b"\n"),
    ("etc/apk/repositories", 0o644, b"\n"),
    ("lib/apk/db/lock", 0o600, b""),
    ("lib/apk/db/triggers", 0o644, b""),
    ("lib/apk/db/installed", 0o644, b""),
];

const INIT_DEVICES: &[(&str, u32, u32, u32)] = &[
    ("dev/zero", 1, 5, 0o666),
    ("dev/urandom", 1, 9, 0o666),
    ("dev/null", 1, 3, 0o666),
    ("dev/random", 1, 8, 0o666),
    ("dev/console", 5, 1, 0o620),
];

/// A directory `init_db` creates, with its exact mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectorySpec {
    pub path: PathBuf,
    pub mode: u32,
}

/// A regular file `init_db` creates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSpec {
    pub path: PathBuf,
    pub mode: u32,
    /// Initial contents, written only when the file does not exist yet.
    pub contents: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSpec {
    pub path: PathBuf,
    pub mode: u32,
    pub device: Device,
}

/// The tables `init_db` materializes, in creation order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitLayout {
    pub directories: Vec<DirectorySpec>,
    pub files: Vec<FileSpec>,
    /// Always created as character devices.
    pub devices: Vec<DeviceSpec>,
}

impl Default for InitLayout {
    fn default() -> Self {
        Self {
            directories: INIT_DIRECTORIES
                .iter()
                .map(|&(path, mode)| DirectorySpec {
                    path: PathBuf::from(path),
                    mode,
                })
                .collect(),
            files: INIT_FILES
                .iter()
                .map(|&(path, mode, contents)| FileSpec {
                    path: PathBuf::from(path),
                    mode,
                    contents: contents.to_vec(),
                })
                .collect(),
            devices: INIT_DEVICES
                .iter()
                .map(|&(path, major, minor, mode)| DeviceSpec {
                    path: PathBuf::from(path),
                    mode,
                    device: Device::new(major, minor),
                })
                .collect(),
        }
    }
}

impl Apk {
    /// Create the database skeleton under the managed root and record the
    /// configured architecture.
    ///
    /// Re-running re-asserts every mode but keeps existing file contents.
    /// Device node failures are fatal unless `ignore_mknod_errors` is set.
    ///
    /// # Errors
    ///
    /// Returns [`ApkError::Io`] for the first entry that cannot be created;
    /// entries created before it are left in place.
    pub fn init_db(&self) -> Result<()> {
        let fs = self.fs();
        let layout = &self.config().layout;

        for dir in &layout.directories {
            fs.create_dir_all(&dir.path, dir.mode)
                .map_err(ApkError::io("create directory", &dir.path))?;
            fs.set_mode(&dir.path, dir.mode)
                .map_err(ApkError::io("set mode on", &dir.path))?;
        }

        for file in &layout.files {
            if !fs.exists(&file.path) {
                fs.write(&file.path, &file.contents, file.mode)
                    .map_err(ApkError::io("create file", &file.path))?;
            }
            fs.set_mode(&file.path, file.mode)
                .map_err(ApkError::io("set mode on", &file.path))?;
        }

        for spec in &layout.devices {
            if let Err(e) = self.create_device(&spec.path, spec.device, spec.mode) {
                if self.config().ignore_mknod_errors {
                    warn!("ignoring device node error: {e}");
                    self.reporter()
                        .warning(&format!("skipped device node {}", spec.path.display()));
                } else {
                    return Err(e);
                }
            }
        }

        self.set_arch(self.config().arch)?;

        info!(
            directories = layout.directories.len(),
            files = layout.files.len(),
            devices = layout.devices.len(),
            "database initialized"
        );
        Ok(())
    }

    fn create_device(&self, path: &Path, device: Device, mode: u32) -> Result<()> {
        let fs = self.fs();
        match fs.metadata(path) {
            Ok(meta) if meta.is_char_device() => {
                debug!("device node {} already present", path.display());
            }
            _ => fs
                .mknod(path, device, mode)
                .map_err(ApkError::io("create device node", path))?,
        }
        fs.set_mode(path, mode)
            .map_err(ApkError::io("set mode on", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApkConfig;
    use crate::fs::{Filesystem, MemFs};
    use std::sync::Arc;

    fn apk_on(fs: Arc<MemFs>, ignore_mknod_errors: bool) -> Apk {
        Apk::new(ApkConfig {
            fs,
            ignore_mknod_errors,
            ..ApkConfig::default()
        })
    }

    #[test]
    fn test_init_db_creates_exact_layout() {
        let fs = Arc::new(MemFs::new());
        let apk = apk_on(fs.clone(), false);
        apk.init_db().unwrap();

        let layout = InitLayout::default();
        for d in &layout.directories {
            let meta = fs.metadata(&d.path).unwrap();
            assert!(meta.is_dir(), "expected {} to be a directory", d.path.display());
            assert_eq!(meta.mode, d.mode, "mode of {}", d.path.display());
        }
        for f in &layout.files {
            let meta = fs.metadata(&f.path).unwrap();
            assert!(meta.is_file(), "expected {} to be a file", f.path.display());
            assert_eq!(meta.mode, f.mode, "mode of {}", f.path.display());
            assert!(meta.len >= f.contents.len() as u64, "size of {}", f.path.display());
        }
        for d in &layout.devices {
            let meta = fs.metadata(&d.path).unwrap();
            assert!(meta.is_char_device(), "expected {} to be a char device", d.path.display());
            assert_eq!(meta.mode, d.mode, "mode of {}", d.path.display());
            assert_eq!(meta.device, Some(d.device));
        }
        assert_eq!(apk.get_arch().unwrap(), apk.config().arch);
    }

    #[test]
    fn test_init_db_mknod_failure_is_fatal_by_default() {
        let fs = Arc::new(MemFs::without_devices());
        let apk = apk_on(fs, false);
        let err = apk.init_db().unwrap_err();
        assert!(err.to_string().contains("dev/zero"), "{err}");
    }

    #[test]
    fn test_init_db_can_ignore_mknod_failures() {
        let fs = Arc::new(MemFs::without_devices());
        let apk = apk_on(fs.clone(), true);
        apk.init_db().unwrap();

        assert!(!fs.exists(Path::new("dev/null")));
        assert!(fs.metadata(Path::new("lib/apk/db")).unwrap().is_dir());
    }

    #[test]
    fn test_init_db_rerun_keeps_world_and_reasserts_modes() {
        let fs = Arc::new(MemFs::new());
        let apk = apk_on(fs.clone(), false);
        apk.init_db().unwrap();
        apk.set_world(&["busybox"]).unwrap();
        fs.set_mode(Path::new("etc/apk"), 0o700).unwrap();

        apk.init_db().unwrap();
        assert_eq!(apk.get_world().unwrap(), vec!["busybox".to_string()]);
        assert_eq!(fs.metadata(Path::new("etc/apk")).unwrap().mode, 0o755);
    }
}
