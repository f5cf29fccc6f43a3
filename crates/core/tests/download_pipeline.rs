//! Download pipeline integration tests.
//!
//! These tests run single items through the worker pipeline:
//! link -> scratch dir -> download -> extract -> archive removal -> remote cleanup

use std::sync::Arc;

use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use debridarr_core::{
    testing::{fixtures, MockArchiveStore, MockDebridClient, StoreOp},
    Admission, DownloadRegistry, DownloadSlot, DownloadWorker, FsArchiveStore, StorageConfig,
    WorkerError,
};

fn admit(registry: &DownloadRegistry, name: &str) -> DownloadSlot {
    match registry.try_admit(name) {
        Admission::Admitted(slot) => slot,
        other => panic!("expected admission of {}, got {:?}", name, other),
    }
}

#[tokio::test]
async fn test_folder_item_is_materialized() {
    let server = MockServer::start().await;
    let archive = fixtures::zip_archive(&[
        ("Show.S01/Show.S01E01.mkv", b"first episode"),
        ("Show.S01/Show.S01E02.mkv", b"second episode"),
    ]);
    Mock::given(method("GET"))
        .and(path("/zip/d1.zip"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(archive.clone()))
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let unzip_dir = temp_dir.path().join("unzip");
    let library = temp_dir.path().join("library");

    let debrid = Arc::new(MockDebridClient::new());
    debrid.set_link_base(format!("{}/zip", server.uri()));
    debrid.set_items(vec![fixtures::folder_item("d1", "Show.S01")]);
    let store = Arc::new(FsArchiveStore::new(StorageConfig::new(&unzip_dir)));

    let registry = DownloadRegistry::new(2);
    let slot = admit(&registry, "Show.S01");
    let worker = DownloadWorker::new(debrid.clone(), store, &library);

    let outcome = worker
        .run(fixtures::folder_item("d1", "Show.S01"), slot)
        .await
        .expect("pipeline should succeed");

    assert_eq!(outcome.bytes_downloaded, archive.len() as u64);
    assert_eq!(outcome.files_extracted, 2);
    assert!(outcome.remote_removed);

    assert_eq!(
        std::fs::read(library.join("Show.S01/Show.S01E01.mkv")).unwrap(),
        b"first episode"
    );
    assert!(library.join("Show.S01/Show.S01E02.mkv").is_file());

    // Archive and its scratch directory are gone
    assert_eq!(std::fs::read_dir(&unzip_dir).unwrap().count(), 0);

    assert_eq!(debrid.calls_to("generate_folder_link"), vec!["d1"]);
    assert_eq!(debrid.calls_to("delete_folder"), vec!["d1"]);
    assert!(debrid.items().is_empty());
    assert!(!registry.contains("Show.S01"));
}

#[tokio::test]
async fn test_unknown_kind_fails_without_network() {
    let debrid = Arc::new(MockDebridClient::new());
    let store = Arc::new(MockArchiveStore::new());
    let registry = DownloadRegistry::new(1);
    let slot = admit(&registry, "Mystery");

    let worker = DownloadWorker::new(debrid.clone(), store.clone(), "/library");
    let err = worker
        .run(fixtures::unknown_item("u1", "Mystery"), slot)
        .await
        .unwrap_err();

    assert!(matches!(err, WorkerError::UnsupportedKind(_)));
    assert_eq!(err.stage(), "link");
    assert!(debrid.calls().is_empty());
    assert!(store.operations().is_empty());
    assert_eq!(registry.count(), 0);
}

/// Run a folder item with one injected failure and return the error.
async fn run_with_failure(
    debrid_failure: Option<&str>,
    store_failure: Option<&str>,
) -> (WorkerError, DownloadRegistry, Arc<MockDebridClient>, Arc<MockArchiveStore>) {
    let debrid = Arc::new(MockDebridClient::new());
    let store = Arc::new(MockArchiveStore::new());
    if let Some(op) = debrid_failure {
        debrid.fail_on(op);
    }
    if let Some(op) = store_failure {
        store.fail_on(op);
    }

    let registry = DownloadRegistry::new(1);
    let slot = admit(&registry, "Show.S01");
    let worker = DownloadWorker::new(debrid.clone(), store.clone(), "/library");

    let err = worker
        .run(fixtures::folder_item("d1", "Show.S01"), slot)
        .await
        .unwrap_err();
    (err, registry, debrid, store)
}

#[tokio::test]
async fn test_every_failure_point_releases_slot() {
    let cases = [
        (Some("generate_folder_link"), None, "link"),
        (None, Some("create_scratch_dir"), "scratch"),
        (None, Some("stream_download"), "download"),
        (None, Some("extract"), "extract"),
        (None, Some("remove_file"), "cleanup"),
    ];

    for (debrid_failure, store_failure, stage) in cases {
        let (err, registry, debrid, _store) = run_with_failure(debrid_failure, store_failure).await;

        assert_eq!(err.stage(), stage);
        assert_eq!(registry.count(), 0, "slot leaked at stage {}", stage);
        assert!(!registry.release("Show.S01"), "double release at stage {}", stage);

        // The remote item is left for a later tick
        assert!(debrid.calls_to("delete_folder").is_empty());
        assert!(debrid.calls_to("delete_file").is_empty());

        // Name can be admitted again
        assert!(registry.try_admit("Show.S01").is_admitted());
    }
}

#[tokio::test]
async fn test_failed_extraction_skips_archive_removal() {
    let (_err, _registry, _debrid, store) = run_with_failure(None, Some("extract")).await;

    let ops = store.operations();
    assert!(ops.iter().any(|op| matches!(op, StoreOp::Extract { .. })));
    assert!(!ops.iter().any(|op| matches!(op, StoreOp::RemoveFile(_))));
}

#[tokio::test]
async fn test_concurrent_admission_of_same_name() {
    let registry = DownloadRegistry::new(4);

    let attempts: Vec<_> = (0..8)
        .map(|_| {
            let registry = registry.clone();
            tokio::spawn(async move { registry.try_admit("Show.S01") })
        })
        .collect();

    let mut slots = Vec::new();
    for attempt in attempts {
        if let Admission::Admitted(slot) = attempt.await.unwrap() {
            slots.push(slot);
        }
    }

    assert_eq!(slots.len(), 1);
    assert_eq!(registry.count(), 1);
    drop(slots);
    assert_eq!(registry.count(), 0);
}
