//! Cache lifecycle tests against the library API

use async_trait::async_trait;
use precache::lifecycle::{GenerationState, LifecycleDriver};
use precache::manifest::{AssetManifest, CacheVersion};
use precache::config::schema::OriginConfig;
use precache::network::{HttpTransport, Transport};
use precache::resource::{ResourceRequest, ResourceResponse, ResponseSource};
use precache::storage::{CacheStorage, DiskStorage, MemoryStorage, NamedStore};
use precache::worker::OfflineCacheManager;
use precache::{PrecacheError, PrecacheResult};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Origin serving a fixed set of pages, switchable offline
struct ScriptedOrigin {
    pages: HashMap<String, String>,
    online: AtomicBool,
    calls: AtomicUsize,
}

impl ScriptedOrigin {
    fn serving(paths: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            pages: paths
                .iter()
                .map(|p| (p.to_string(), format!("body of {}", p)))
                .collect(),
            online: AtomicBool::new(true),
            calls: AtomicUsize::new(0),
        })
    }

    fn go_offline(&self) {
        self.online.store(false, Ordering::SeqCst);
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for ScriptedOrigin {
    async fn fetch(&self, request: &ResourceRequest) -> PrecacheResult<ResourceResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.online.load(Ordering::SeqCst) {
            return Err(PrecacheError::network(&request.path, "network unreachable"));
        }
        self.pages
            .get(&request.path)
            .map(|body| {
                ResourceResponse::new(200, body.as_str()).with_header("Content-Type", "text/plain")
            })
            .ok_or_else(|| PrecacheError::network(&request.path, "connection reset"))
    }

    fn describe(&self) -> String {
        "scripted".to_string()
    }
}

async fn installed_and_active(
    storage: Arc<dyn CacheStorage>,
    origin: Arc<ScriptedOrigin>,
    manifest: &[&str],
) -> LifecycleDriver {
    let driver = LifecycleDriver::new(OfflineCacheManager::new(storage, origin));
    let manifest = AssetManifest::new(manifest.iter().copied()).unwrap();
    let version = CacheVersion::from("v1");

    driver.install(&manifest, &version).await.unwrap();
    driver.activate(&version).await.unwrap();
    driver
}

#[tokio::test]
async fn install_then_activate_leaves_only_current_store_on_disk() {
    let temp = TempDir::new().unwrap();
    let storage = Arc::new(DiskStorage::new(temp.path().join("caches")));

    // A previous generation already on disk
    let old = storage.open("v0").await.unwrap();
    old.put("/", ResourceResponse::new(200, "old home")).await.unwrap();

    let origin = ScriptedOrigin::serving(&["/", "/a.css"]);
    let driver = LifecycleDriver::new(OfflineCacheManager::new(storage.clone(), origin));
    let manifest = AssetManifest::new(["/", "/a.css"]).unwrap();
    let version = CacheVersion::from("v1");

    let report = driver.install(&manifest, &version).await.unwrap();
    assert_eq!(report.stored, 2);

    let keys = storage.open("v1").await.unwrap().keys().await.unwrap();
    assert_eq!(keys, vec!["/".to_string(), "/a.css".to_string()]);
    assert_eq!(
        storage.list().await.unwrap(),
        vec!["v0".to_string(), "v1".to_string()]
    );

    let report = driver.activate(&version).await.unwrap();
    assert!(report.is_clean());
    assert_eq!(report.deleted, vec!["v0".to_string()]);

    // Reopen from disk to see what actually survived
    let reopened = DiskStorage::new(temp.path().join("caches"));
    assert_eq!(reopened.list().await.unwrap(), vec!["v1".to_string()]);
}

#[tokio::test]
async fn failed_asset_fails_install_without_rollback() {
    let storage = Arc::new(MemoryStorage::new());
    let origin = ScriptedOrigin::serving(&["/"]);
    let driver = LifecycleDriver::new(OfflineCacheManager::new(storage.clone(), origin));
    let manifest = AssetManifest::new(["/", "/missing.js"]).unwrap();
    let version = CacheVersion::from("v1");

    let err = driver.install(&manifest, &version).await.unwrap_err();
    match err {
        PrecacheError::InstallFailed { ref failures, .. } => {
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].path, "/missing.js");
        }
        ref other => panic!("unexpected error: {other}"),
    }
    assert!(err.is_retryable());

    // Partial writes are kept
    assert_eq!(storage.entry_count("v1"), Some(1));
    assert_eq!(
        driver.state_of(&version).await,
        Some(GenerationState::Uninstalled)
    );
}

#[tokio::test]
async fn quota_exceeded_fails_install() {
    let storage = Arc::new(MemoryStorage::with_quota(1));
    let origin = ScriptedOrigin::serving(&["/", "/a.css"]);
    let driver = LifecycleDriver::new(OfflineCacheManager::new(storage, origin));
    let manifest = AssetManifest::new(["/", "/a.css"]).unwrap();

    let err = driver.install(&manifest, &"v1".into()).await.unwrap_err();
    assert!(err.to_string().contains("1 of 2 assets"));
}

#[tokio::test]
async fn cached_request_makes_no_network_call() {
    let origin = ScriptedOrigin::serving(&["/"]);
    let driver =
        installed_and_active(Arc::new(MemoryStorage::new()), origin.clone(), &["/"]).await;
    let calls_after_install = origin.calls();

    let served = driver.fetch(&ResourceRequest::get("/")).await.unwrap();
    assert_eq!(served.source, ResponseSource::Cache);
    assert_eq!(served.response.body, b"body of /".to_vec());
    assert_eq!(served.response.content_type(), Some("text/plain"));
    assert_eq!(origin.calls(), calls_after_install);

    // Still served while the origin is down
    origin.go_offline();
    let served = driver.fetch(&ResourceRequest::get("/")).await.unwrap();
    assert_eq!(served.source, ResponseSource::Cache);
    assert_eq!(origin.calls(), calls_after_install);
}

#[tokio::test]
async fn miss_falls_back_to_network_without_caching() {
    let storage = Arc::new(MemoryStorage::new());
    let origin = ScriptedOrigin::serving(&["/", "/new.png"]);
    let driver = installed_and_active(storage.clone(), origin.clone(), &["/"]).await;
    let calls_before = origin.calls();

    let served = driver.fetch(&ResourceRequest::get("/new.png")).await.unwrap();
    assert_eq!(served.source, ResponseSource::Network);
    assert_eq!(served.response.body, b"body of /new.png".to_vec());
    assert_eq!(origin.calls(), calls_before + 1);

    let keys = storage.open("v1").await.unwrap().keys().await.unwrap();
    assert_eq!(keys, vec!["/".to_string()]);

    // A second miss goes to the network again
    driver.fetch(&ResourceRequest::get("/new.png")).await.unwrap();
    assert_eq!(origin.calls(), calls_before + 2);
}

#[tokio::test]
async fn miss_with_network_down_is_unavailable() {
    let origin = ScriptedOrigin::serving(&["/"]);
    let driver =
        installed_and_active(Arc::new(MemoryStorage::new()), origin.clone(), &["/"]).await;
    origin.go_offline();

    let err = driver
        .fetch(&ResourceRequest::get("/new.png"))
        .await
        .unwrap_err();
    assert!(matches!(err, PrecacheError::ResourceUnavailable { ref path, .. } if path == "/new.png"));
}

#[tokio::test]
async fn non_get_requests_bypass_cache() {
    let origin = ScriptedOrigin::serving(&["/"]);
    let driver =
        installed_and_active(Arc::new(MemoryStorage::new()), origin.clone(), &["/"]).await;
    let calls_before = origin.calls();

    let served = driver
        .fetch(&ResourceRequest::with_method("post", "/"))
        .await
        .unwrap();
    assert_eq!(served.source, ResponseSource::Network);
    assert_eq!(origin.calls(), calls_before + 1);
}

#[tokio::test]
async fn surviving_stale_store_is_retried_next_activation() {
    let storage = Arc::new(MemoryStorage::new());
    storage.open("v0").await.unwrap();
    storage.fail_deletes_for("v0");

    let origin = ScriptedOrigin::serving(&["/"]);
    let driver = LifecycleDriver::new(OfflineCacheManager::new(storage.clone(), origin));
    let manifest = AssetManifest::new(["/"]).unwrap();
    let version = CacheVersion::from("v1");
    driver.install(&manifest, &version).await.unwrap();

    let report = driver.activate(&version).await.unwrap();
    assert!(!report.is_clean());
    assert_eq!(report.retained[0].store, "v0");
    assert_eq!(
        driver.state_of(&version).await,
        Some(GenerationState::Active)
    );

    // Activation still bound the new store
    let served = driver.fetch(&ResourceRequest::get("/")).await.unwrap();
    assert_eq!(served.source, ResponseSource::Cache);

    storage.heal_deletes();
    let report = driver.activate(&version).await.unwrap();
    assert!(report.is_clean());
    assert_eq!(report.deleted, vec!["v0".to_string()]);
    assert_eq!(storage.list().await.unwrap(), vec!["v1".to_string()]);
}

#[tokio::test]
async fn concurrent_fetches_share_active_store() {
    let origin = ScriptedOrigin::serving(&["/", "/a.css"]);
    let driver = Arc::new(
        installed_and_active(Arc::new(MemoryStorage::new()), origin.clone(), &["/", "/a.css"])
            .await,
    );
    let calls_before = origin.calls();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let driver = Arc::clone(&driver);
            let path = if i % 2 == 0 { "/" } else { "/a.css" };
            tokio::spawn(async move { driver.fetch(&ResourceRequest::get(path)).await })
        })
        .collect();

    for handle in handles {
        let served = handle.await.unwrap().unwrap();
        assert_eq!(served.source, ResponseSource::Cache);
    }
    assert_eq!(origin.calls(), calls_before);
}

#[tokio::test(flavor = "multi_thread")]
async fn uncached_post_reaches_live_origin() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let origin = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = vec![0u8; 4096];
        let mut read = Vec::new();
        while !read.ends_with(b"message=hello") {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            read.extend_from_slice(&buf[..n]);
        }
        socket
            .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 4\r\nConnection: close\r\n\r\nsent")
            .await
            .unwrap();
        socket.shutdown().await.ok();
        String::from_utf8_lossy(&read).into_owned()
    });

    let transport = HttpTransport::new(&OriginConfig {
        base_url: format!("http://{}", addr),
        timeout_secs: 5,
    });
    let manager = OfflineCacheManager::new(Arc::new(MemoryStorage::new()), Arc::new(transport));

    let request = ResourceRequest::with_method("POST", "/contact")
        .with_header("Content-Type", "application/x-www-form-urlencoded")
        .with_body("message=hello");
    let served = manager.on_fetch(&request).await.unwrap();

    assert_eq!(served.source, ResponseSource::Network);
    assert_eq!(served.response.status, 200);
    assert_eq!(served.response.body, b"sent".to_vec());

    let raw = origin.await.unwrap();
    assert!(raw.starts_with("POST /contact "));
}
