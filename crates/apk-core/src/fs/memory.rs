//! In-memory [`Filesystem`].
//!
//! Used to build a root without touching the host, and by tests. Device
//! nodes are recorded rather than created, so `mknod` works unprivileged
//! unless the instance was built with [`MemFs::without_devices`] to mimic a
//! restricted container.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use super::{normalize, Device, DirEntry, FileKind, Filesystem, Metadata};

#[derive(Debug, Clone)]
enum NodeKind {
    Dir,
    File(Vec<u8>),
    CharDevice(Device),
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    mode: u32,
}

impl Node {
    fn file_kind(&self) -> FileKind {
        match self.kind {
            NodeKind::Dir => FileKind::Dir,
            NodeKind::File(_) => FileKind::File,
            NodeKind::CharDevice(_) => FileKind::CharDevice,
        }
    }
}

#[derive(Debug)]
pub struct MemFs {
    nodes: RwLock<BTreeMap<PathBuf, Node>>,
    allow_devices: bool,
}

impl Default for MemFs {
    fn default() -> Self {
        Self::new()
    }
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("{}: no such file or directory", path.display()),
    )
}

fn not_a_dir(path: &Path) -> io::Error {
    io::Error::other(format!("{}: not a directory", path.display()))
}

impl MemFs {
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(
            PathBuf::new(),
            Node {
                kind: NodeKind::Dir,
                mode: 0o755,
            },
        );
        Self {
            nodes: RwLock::new(nodes),
            allow_devices: true,
        }
    }

    /// A filesystem on which `mknod` fails with `PermissionDenied`.
    pub fn without_devices() -> Self {
        Self {
            allow_devices: false,
            ..Self::new()
        }
    }

    fn check_parent(nodes: &BTreeMap<PathBuf, Node>, path: &Path) -> io::Result<()> {
        let parent = path.parent().unwrap_or(Path::new(""));
        match nodes.get(parent) {
            Some(Node {
                kind: NodeKind::Dir,
                ..
            }) => Ok(()),
            Some(_) => Err(not_a_dir(parent)),
            None => Err(not_found(parent)),
        }
    }
}

impl Filesystem for MemFs {
    fn metadata(&self, path: &Path) -> io::Result<Metadata> {
        let path = normalize(path);
        let nodes = self.nodes.read().unwrap_or_else(PoisonError::into_inner);
        let node = nodes.get(&path).ok_or_else(|| not_found(&path))?;
        let (len, device) = match &node.kind {
            NodeKind::Dir => (0, None),
            NodeKind::File(data) => (data.len() as u64, None),
            NodeKind::CharDevice(dev) => (0, Some(*dev)),
        };
        Ok(Metadata {
            kind: node.file_kind(),
            mode: node.mode,
            len,
            device,
        })
    }

    fn create_dir_all(&self, path: &Path, mode: u32) -> io::Result<()> {
        let path = normalize(path);
        let mut nodes = self.nodes.write().unwrap_or_else(PoisonError::into_inner);
        let mut current = PathBuf::new();
        for part in path.iter() {
            current.push(part);
            match nodes.get(&current) {
                Some(Node {
                    kind: NodeKind::Dir,
                    ..
                }) => {}
                Some(_) => return Err(not_a_dir(&current)),
                None => {
                    nodes.insert(
                        current.clone(),
                        Node {
                            kind: NodeKind::Dir,
                            mode: mode & 0o7777,
                        },
                    );
                }
            }
        }
        Ok(())
    }

    fn set_mode(&self, path: &Path, mode: u32) -> io::Result<()> {
        let path = normalize(path);
        let mut nodes = self.nodes.write().unwrap_or_else(PoisonError::into_inner);
        let node = nodes.get_mut(&path).ok_or_else(|| not_found(&path))?;
        node.mode = mode & 0o7777;
        Ok(())
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        let path = normalize(path);
        let nodes = self.nodes.read().unwrap_or_else(PoisonError::into_inner);
        match nodes.get(&path) {
            Some(Node {
                kind: NodeKind::File(data),
                ..
            }) => Ok(data.clone()),
            Some(_) => Err(io::Error::other(format!(
                "{}: not a regular file",
                path.display()
            ))),
            None => Err(not_found(&path)),
        }
    }

    fn write(&self, path: &Path, contents: &[u8], mode: u32) -> io::Result<()> {
        let path = normalize(path);
        let mut nodes = self.nodes.write().unwrap_or_else(PoisonError::into_inner);
        Self::check_parent(&nodes, &path)?;
        match nodes.get_mut(&path) {
            Some(Node {
                kind: NodeKind::File(data),
                ..
            }) => {
                // Truncating an existing file keeps its mode, as on a real fs.
                *data = contents.to_vec();
            }
            Some(_) => {
                return Err(io::Error::other(format!(
                    "{}: not a regular file",
                    path.display()
                )));
            }
            None => {
                nodes.insert(
                    path,
                    Node {
                        kind: NodeKind::File(contents.to_vec()),
                        mode: mode & 0o7777,
                    },
                );
            }
        }
        Ok(())
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        let dir = normalize(path);
        let nodes = self.nodes.read().unwrap_or_else(PoisonError::into_inner);
        match nodes.get(&dir) {
            Some(Node {
                kind: NodeKind::Dir,
                ..
            }) => {}
            Some(_) => return Err(not_a_dir(&dir)),
            None => return Err(not_found(&dir)),
        }
        let entries = nodes
            .iter()
            .filter(|(p, _)| !p.as_os_str().is_empty() && p.parent() == Some(dir.as_path()))
            .map(|(p, node)| {
                let name = p
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                DirEntry {
                    path: path.join(&name),
                    name,
                    kind: node.file_kind(),
                }
            })
            .collect();
        Ok(entries)
    }

    fn mknod(&self, path: &Path, device: Device, mode: u32) -> io::Result<()> {
        if !self.allow_devices {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("{}: operation not permitted", path.display()),
            ));
        }
        let path = normalize(path);
        let mut nodes = self.nodes.write().unwrap_or_else(PoisonError::into_inner);
        Self::check_parent(&nodes, &path)?;
        if nodes.contains_key(&path) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{}: file exists", path.display()),
            ));
        }
        nodes.insert(
            path,
            Node {
                kind: NodeKind::CharDevice(device),
                mode: mode & 0o7777,
            },
        );
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        let from = normalize(from);
        let to = normalize(to);
        let mut nodes = self.nodes.write().unwrap_or_else(PoisonError::into_inner);
        Self::check_parent(&nodes, &to)?;
        match nodes.get(&to) {
            Some(Node {
                kind: NodeKind::Dir,
                ..
            }) => {
                return Err(io::Error::other(format!(
                    "{}: is a directory",
                    to.display()
                )));
            }
            Some(_) | None => {}
        }
        let node = nodes.remove(&from).ok_or_else(|| not_found(&from))?;
        if matches!(node.kind, NodeKind::Dir) {
            let children: Vec<PathBuf> = nodes
                .keys()
                .filter(|p| p.starts_with(&from))
                .cloned()
                .collect();
            for child in children {
                if let (Some(moved), Ok(rest)) = (nodes.remove(&child), child.strip_prefix(&from)) {
                    nodes.insert(to.join(rest), moved);
                }
            }
        }
        nodes.insert(to, node);
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        let path = normalize(path);
        let mut nodes = self.nodes.write().unwrap_or_else(PoisonError::into_inner);
        match nodes.get(&path) {
            Some(Node {
                kind: NodeKind::Dir,
                ..
            }) => Err(io::Error::other(format!("{}: is a directory", path.display()))),
            Some(_) => {
                nodes.remove(&path);
                Ok(())
            }
            None => Err(not_found(&path)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_requires_parent() {
        let fs = MemFs::new();
        let err = fs.write(Path::new("etc/apk/world"), b"", 0o644).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);

        fs.create_dir_all(Path::new("/etc/apk"), 0o755).unwrap();
        fs.write(Path::new("/etc/apk/world"), b"abc\n", 0o644).unwrap();
        assert_eq!(fs.read(Path::new("etc/apk/world")).unwrap(), b"abc\n");
    }

    #[test]
    fn test_read_dir_only_lists_immediate_children() {
        let fs = MemFs::new();
        fs.create_dir_all(Path::new("keys/x86_64"), 0o755).unwrap();
        fs.write(Path::new("keys/a.rsa.pub"), b"a", 0o644).unwrap();
        fs.write(Path::new("keys/x86_64/b.rsa.pub"), b"b", 0o644).unwrap();

        let entries = fs.read_dir(Path::new("/keys")).unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a.rsa.pub", "x86_64"]);
        assert_eq!(entries[0].path, PathBuf::from("/keys/a.rsa.pub"));
    }

    #[test]
    fn test_mknod_records_char_device() {
        let fs = MemFs::new();
        fs.create_dir_all(Path::new("dev"), 0o755).unwrap();
        fs.mknod(Path::new("dev/null"), Device::new(1, 3), 0o666).unwrap();

        let meta = fs.metadata(Path::new("dev/null")).unwrap();
        assert!(meta.is_char_device());
        assert_eq!(meta.mode, 0o666);
        assert_eq!(meta.device, Some(Device::new(1, 3)));

        let restricted = MemFs::without_devices();
        restricted.create_dir_all(Path::new("dev"), 0o755).unwrap();
        let err = restricted
            .mknod(Path::new("dev/null"), Device::new(1, 3), 0o666)
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
    }

    #[test]
    fn test_rename_replaces_file() {
        let fs = MemFs::new();
        fs.write(Path::new("a"), b"new", 0o600).unwrap();
        fs.write(Path::new("b"), b"old", 0o644).unwrap();
        fs.rename(Path::new("a"), Path::new("b")).unwrap();

        assert!(!fs.exists(Path::new("a")));
        assert_eq!(fs.read(Path::new("b")).unwrap(), b"new");
        assert_eq!(fs.metadata(Path::new("b")).unwrap().mode, 0o600);
    }
}
