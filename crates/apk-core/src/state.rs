//! `world`, `repositories` and `arch`: the line-oriented configuration
//! files downstream resolvers read.

use std::path::Path;

use apk_schema::Arch;
use tracing::debug;

use crate::apk::Apk;
use crate::error::{ApkError, Result};
use crate::fs::write_atomic;

const CONFIG_FILE_MODE: u32 = 0o644;

/// `lines` joined by newlines with a trailing newline; empty for no lines.
fn render_lines<S: AsRef<str>>(lines: &[S]) -> String {
    let mut out = String::new();
    for line in lines {
        out.push_str(line.as_ref());
        out.push('\n');
    }
    out
}

impl Apk {
    /// Replace the world file with `names`, sorted bytewise, one per line.
    /// Duplicates are written as given.
    pub fn set_world<S: AsRef<str>>(&self, names: &[S]) -> Result<()> {
        let mut sorted: Vec<&str> = names.iter().map(|n| n.as_ref()).collect();
        sorted.sort_unstable();
        let path = &self.config().paths.world;
        self.write_config(path, &render_lines(&sorted))?;
        debug!(count = sorted.len(), "world updated");
        Ok(())
    }

    /// Package names listed in the world file.
    pub fn get_world(&self) -> Result<Vec<String>> {
        let path = &self.config().paths.world;
        Ok(self
            .read_config(path)?
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Replace the repositories file with `uris`, keeping their order.
    ///
    /// # Errors
    ///
    /// Returns [`ApkError::NoRepositories`] for an empty list, without
    /// touching the existing file.
    pub fn set_repositories<S: AsRef<str>>(&self, uris: &[S]) -> Result<()> {
        if uris.is_empty() {
            return Err(ApkError::NoRepositories);
        }
        let path = &self.config().paths.repositories;
        self.write_config(path, &render_lines(uris))?;
        debug!(count = uris.len(), "repositories updated");
        Ok(())
    }

    /// Repository URIs in file order. Blank lines and `#` comments are skipped.
    pub fn get_repositories(&self) -> Result<Vec<String>> {
        let path = &self.config().paths.repositories;
        Ok(self
            .read_config(path)?
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(str::to_string)
            .collect())
    }

    /// Record the architecture of the managed root.
    pub fn set_arch(&self, arch: Arch) -> Result<()> {
        let path = &self.config().paths.arch;
        self.write_config(path, &format!("{arch}\n"))
    }

    /// Architecture recorded in the managed root.
    ///
    /// # Errors
    ///
    /// Returns [`ApkError::Arch`] if the file holds an unknown name.
    pub fn get_arch(&self) -> Result<Arch> {
        let path = &self.config().paths.arch;
        self.read_config(path)?
            .trim()
            .parse()
            .map_err(|source| ApkError::Arch {
                origin: path.display().to_string(),
                source,
            })
    }

    fn write_config(&self, path: &Path, contents: &str) -> Result<()> {
        write_atomic(self.fs(), path, contents.as_bytes(), CONFIG_FILE_MODE)
            .map_err(ApkError::io("write", path))
    }

    fn read_config(&self, path: &Path) -> Result<String> {
        let bytes = self.fs().read(path).map_err(ApkError::io("read", path))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApkConfig;
    use crate::error::ErrorKind;
    use crate::fs::{Filesystem, MemFs};
    use std::sync::Arc;

    fn setup() -> (Arc<MemFs>, Apk) {
        let fs = Arc::new(MemFs::new());
        fs.create_dir_all(Path::new("etc/apk"), 0o755).unwrap();
        let apk = Apk::new(ApkConfig {
            fs: fs.clone(),
            ..ApkConfig::default()
        });
        (fs, apk)
    }

    #[test]
    fn test_set_world_sorts() {
        let (fs, apk) = setup();
        apk.set_world(&["foo", "bar", "abc", "zulu"]).unwrap();

        let actual = fs.read(Path::new("etc/apk/world")).unwrap();
        assert_eq!(String::from_utf8(actual).unwrap(), "abc\nbar\nfoo\nzulu\n");
    }

    #[test]
    fn test_set_world_keeps_duplicates_and_truncates() {
        let (fs, apk) = setup();
        apk.set_world(&["zlib", "musl", "busybox", "alpine-base"]).unwrap();
        apk.set_world(&["musl", "Musl", "musl"]).unwrap();

        let actual = fs.read(Path::new("etc/apk/world")).unwrap();
        assert_eq!(String::from_utf8(actual).unwrap(), "Musl\nmusl\nmusl\n");
    }

    #[test]
    fn test_set_world_empty_writes_empty_file() {
        let (fs, apk) = setup();
        apk.set_world::<&str>(&[]).unwrap();
        assert!(fs.read(Path::new("etc/apk/world")).unwrap().is_empty());
        assert!(apk.get_world().unwrap().is_empty());
    }

    #[test]
    fn test_set_repositories_preserves_order() {
        let (fs, apk) = setup();
        let repos = [
            "https://dl-cdn.alpinelinux.org/alpine/v3.16/main",
            "https://dl-cdn.alpinelinux.org/alpine/v3.16/community",
        ];
        apk.set_repositories(&repos).unwrap();

        let actual = fs.read(Path::new("etc/apk/repositories")).unwrap();
        assert_eq!(String::from_utf8(actual).unwrap(), repos.join("\n") + "\n");
        assert_eq!(apk.get_repositories().unwrap(), repos);
    }

    #[test]
    fn test_set_repositories_empty_is_rejected_without_writing() {
        let (fs, apk) = setup();
        apk.set_repositories(&["https://example.com/main"]).unwrap();

        let err = apk.set_repositories::<String>(&[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        let actual = fs.read(Path::new("etc/apk/repositories")).unwrap();
        assert_eq!(actual, b"https://example.com/main\n");
    }

    #[test]
    fn test_get_repositories_skips_comments() {
        let (fs, apk) = setup();
        fs.write(
            Path::new("etc/apk/repositories"),
            b"# main\nhttps://a/main\n\n  https://b/community  \n",
            0o644,
        )
        .unwrap();
        assert_eq!(
            apk.get_repositories().unwrap(),
            vec!["https://a/main".to_string(), "https://b/community".to_string()]
        );
    }

    #[test]
    fn test_arch_round_trip() {
        let (fs, apk) = setup();
        apk.set_arch(Arch::Aarch64).unwrap();
        assert_eq!(fs.read(Path::new("etc/apk/arch")).unwrap(), b"aarch64\n");
        assert_eq!(apk.get_arch().unwrap(), Arch::Aarch64);

        fs.write(Path::new("etc/apk/arch"), b"vax\n", 0o644).unwrap();
        assert_eq!(apk.get_arch().unwrap_err().kind(), ErrorKind::Configuration);
    }
}
