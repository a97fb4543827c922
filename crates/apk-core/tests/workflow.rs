//! End-to-end bootstrap of a root: init, keyring, configuration, fetch.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use apk_core::fs::{Filesystem, MemFs};
use apk_core::keyring::KeyringOptions;
use apk_core::{
    Apk, ApkConfig, Arch, CancellationToken, FetchSource, Package, Repository, RepositoryPackage,
    Reporter,
};
use mockito::Server;

#[derive(Default)]
struct RecordingReporter {
    events: Mutex<Vec<String>>,
}

impl RecordingReporter {
    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }

    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl Reporter for RecordingReporter {
    fn fetching(&self, package: &Package, _url: &str) {
        self.push(format!("fetching {}", package.name));
    }
    fn done(&self, package: &Package, source: FetchSource, _: Option<&Path>) {
        self.push(format!("done {} {source}", package.name));
    }
    fn failed(&self, package: &Package, _reason: &str) {
        self.push(format!("failed {}", package.name));
    }
    fn info(&self, _: &str) {}
    fn warning(&self, _: &str) {}
}

#[tokio::test]
async fn test_bootstrap_root_and_fetch() {
    let mut server = Server::new_async().await;
    let _key = server
        .mock("GET", "/keys/builder-61666e3f.rsa.pub")
        .with_status(200)
        .with_body("-----BEGIN PUBLIC KEY-----\n")
        .create_async()
        .await;
    let _pkg = server
        .mock("GET", "/alpine/v3.19/main/aarch64/busybox-1.36.1-r15.apk")
        .with_status(200)
        .with_header("etag", "\"bb-1\"")
        .with_body("busybox archive")
        .create_async()
        .await;

    let root = Arc::new(MemFs::new());
    let host = Arc::new(MemFs::new());
    let reporter = Arc::new(RecordingReporter::default());
    let apk = Apk::new(ApkConfig {
        fs: root.clone(),
        host_fs: host.clone(),
        reporter: reporter.clone(),
        cache_dir: Some(PathBuf::from("/var/cache/apkc")),
        arch: Arch::Aarch64,
        ..ApkConfig::default()
    });
    let cancel = CancellationToken::new();

    apk.init_db().unwrap();
    assert_eq!(apk.get_arch().unwrap(), Arch::Aarch64);

    let keys = apk
        .init_keyring(
            &cancel,
            &[format!("{}/keys/builder-61666e3f.rsa.pub", server.url())],
            &KeyringOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!(keys, vec![PathBuf::from("etc/apk/keys/builder-61666e3f.rsa.pub")]);

    let repository = format!("{}/alpine/v3.19/main", server.url());
    apk.set_repositories(&[repository.as_str()]).unwrap();
    apk.set_world(&["busybox", "alpine-baselayout"]).unwrap();
    assert_eq!(apk.get_repositories().unwrap(), vec![repository.clone()]);
    assert_eq!(apk.get_world().unwrap(), vec!["alpine-baselayout", "busybox"]);

    let pkg = RepositoryPackage::new(
        Package::new("busybox", "1.36.1-r15", Arch::Aarch64),
        Repository::new(&repository),
    );
    let fetched = apk.fetch_package(&cancel, &pkg).await.unwrap();
    assert_eq!(fetched.source(), FetchSource::Refreshed);
    let cache_path = fetched.cache_path().unwrap().to_path_buf();
    assert_eq!(fetched.bytes().await.unwrap(), b"busybox archive");

    assert!(cache_path.starts_with("/var/cache/apkc"));
    assert_eq!(host.read(&cache_path).unwrap(), b"busybox archive");
    // The managed root only holds the database, never the cache.
    assert!(!root.exists(Path::new("/var/cache/apkc")));

    assert_eq!(
        reporter.events(),
        vec!["fetching busybox".to_string(), "done busybox refreshed".to_string()]
    );
}

#[tokio::test]
async fn test_missing_repository_list_is_a_validation_error() {
    let apk = Apk::new(ApkConfig {
        fs: Arc::new(MemFs::new()),
        ..ApkConfig::default()
    });
    apk.init_db().unwrap();

    let err = apk.set_repositories::<&str>(&[]).unwrap_err();
    assert_eq!(err.kind(), apk_core::ErrorKind::Validation);
    assert_eq!(apk.get_repositories().unwrap(), Vec::<String>::new());
}
