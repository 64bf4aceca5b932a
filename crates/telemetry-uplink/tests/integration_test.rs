// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use mockito::Server;
use tokio_util::sync::CancellationToken;

use telemetry_uplink::{
    Batch, Config, DeliveryPipeline, FileIndex, PersistedFileStore, RehydrationScheduler,
    ReqwestTransport, SendOutcome, TracingDiagnostics,
};

const TEST_KEY: &str = "0fe983f4-6df5-49cf-a2a0-7b20d565bbb1";
const RETENTION: Duration = Duration::from_secs(48 * 60 * 60);

struct Uplink {
    pipeline: Arc<DeliveryPipeline<ReqwestTransport>>,
    store: Arc<PersistedFileStore>,
    index: Arc<FileIndex>,
    endpoint: String,
    _dir: tempfile::TempDir,
}

fn uplink(server_url: &str, capacity: usize) -> Uplink {
    let endpoint = format!("{server_url}/v2/track");
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(
        PersistedFileStore::new(dir.path().to_path_buf(), endpoint.clone(), RETENTION).unwrap(),
    );
    let index = Arc::new(FileIndex::new(store.list_existing().unwrap(), capacity));
    let config = Config {
        request_timeout: Duration::from_secs(5),
        ..Config::default()
    };
    let pipeline = Arc::new(DeliveryPipeline::new(
        Arc::new(ReqwestTransport::new(&config)),
        Arc::clone(&store),
        Arc::clone(&index),
        Arc::new(TracingDiagnostics::new()),
    ));
    Uplink {
        pipeline,
        store,
        index,
        endpoint,
        _dir: dir,
    }
}

fn batch_for(endpoint: &str) -> Batch {
    Batch::new(
        br#"{"items":[{"name":"request","duration":12}]}"#.to_vec(),
        TEST_KEY.to_string(),
        endpoint.to_string(),
    )
    .unwrap()
}

#[tokio::test]
async fn server_error_persists_then_successful_replay_deletes_the_file() {
    let mut server = Server::new_async().await;
    let failure = server
        .mock("POST", "/v2/track")
        .with_status(500)
        .with_body("Internal Server Error")
        .expect(1)
        .create_async()
        .await;

    let uplink = uplink(&server.url(), 100);
    let outcome = uplink.pipeline.send(&batch_for(&uplink.endpoint)).await;
    assert_eq!(outcome, SendOutcome::Persisted);
    assert_eq!(uplink.store.list_existing().unwrap().len(), 1);
    assert_eq!(uplink.index.len(), 1);
    failure.assert_async().await;

    // The sink recovers; the replay succeeds and the file disappears.
    let success = server
        .mock("POST", "/v2/track")
        .with_status(200)
        .expect(1)
        .create_async()
        .await;
    let scheduler = RehydrationScheduler::new(
        Arc::clone(&uplink.pipeline),
        Arc::clone(&uplink.store),
        Arc::clone(&uplink.index),
        Duration::from_millis(10),
        CancellationToken::new(),
    );
    let outcome = scheduler.replay_oldest().await;
    assert_eq!(outcome, Some(SendOutcome::Delivered));
    assert!(uplink.store.list_existing().unwrap().is_empty());
    assert!(uplink.index.is_empty());
    success.assert_async().await;
}

#[tokio::test]
async fn renewed_failure_on_replay_repersists_as_a_new_file() {
    let mut server = Server::new_async().await;
    let unavailable = server
        .mock("POST", "/v2/track")
        .with_status(503)
        .expect(2)
        .create_async()
        .await;

    let uplink = uplink(&server.url(), 100);
    uplink.pipeline.send(&batch_for(&uplink.endpoint)).await;
    let original = uplink.store.list_existing().unwrap().remove(0);

    let scheduler = RehydrationScheduler::new(
        Arc::clone(&uplink.pipeline),
        Arc::clone(&uplink.store),
        Arc::clone(&uplink.index),
        Duration::from_millis(10),
        CancellationToken::new(),
    );
    let outcome = scheduler.replay_oldest().await;
    assert_eq!(outcome, Some(SendOutcome::Persisted));

    // Exactly one file, and the original is gone (deleted before resend).
    let remaining = uplink.store.list_existing().unwrap();
    assert_eq!(remaining.len(), 1);
    assert_ne!(remaining[0].path(), original.path());
    assert!(!original.path().exists());
    unavailable.assert_async().await;
}

#[tokio::test]
async fn payload_rejection_is_discarded_without_persisting() {
    let mut server = Server::new_async().await;
    let rejection = server
        .mock("POST", "/v2/track")
        .with_status(400)
        .with_body(r#"{"errors":[{"message":"Field 'time' is required"}]}"#)
        .expect(1)
        .create_async()
        .await;

    let uplink = uplink(&server.url(), 100);
    let outcome = uplink.pipeline.send(&batch_for(&uplink.endpoint)).await;
    assert_eq!(outcome, SendOutcome::Discarded);
    assert!(uplink.store.list_existing().unwrap().is_empty());
    rejection.assert_async().await;
}

#[tokio::test]
async fn exhausted_redirect_chain_is_discarded() {
    let mut server = Server::new_async().await;
    let target = format!("{}/v2/track", server.url());
    // Redirect to itself: the transport follows 10 hops (11 requests total)
    // and then hands the 307 back to the classifier.
    let redirect = server
        .mock("POST", "/v2/track")
        .with_status(307)
        .with_header("location", &target)
        .expect(11)
        .create_async()
        .await;

    let uplink = uplink(&server.url(), 100);
    let outcome = uplink.pipeline.send(&batch_for(&uplink.endpoint)).await;
    assert_eq!(outcome, SendOutcome::Discarded);
    assert!(uplink.store.list_existing().unwrap().is_empty());
    redirect.assert_async().await;
}

#[tokio::test]
async fn requests_carry_gzip_and_json_headers() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/v2/track")
        .match_header("Content-Encoding", "gzip")
        .match_header("Content-Type", "application/json")
        .with_status(200)
        .expect(1)
        .create_async()
        .await;

    let uplink = uplink(&server.url(), 100);
    let outcome = uplink.pipeline.send(&batch_for(&uplink.endpoint)).await;
    assert_eq!(outcome, SendOutcome::Delivered);
    mock.assert_async().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_producers_against_a_degraded_sink_persist_every_batch() {
    let mut server = Server::new_async().await;
    let failure = server
        .mock("POST", "/v2/track")
        .with_status(500)
        .expect(100)
        .create_async()
        .await;

    let uplink = uplink(&server.url(), 1000);
    let mut tasks = Vec::new();
    for _ in 0..10 {
        let pipeline = Arc::clone(&uplink.pipeline);
        let endpoint = uplink.endpoint.clone();
        tasks.push(tokio::spawn(async move {
            for _ in 0..10 {
                assert_eq!(
                    pipeline.send(&batch_for(&endpoint)).await,
                    SendOutcome::Persisted
                );
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(uplink.store.list_existing().unwrap().len(), 100);
    assert_eq!(uplink.index.len(), 100);
    failure.assert_async().await;
}

#[tokio::test]
async fn index_rebuild_excludes_files_past_retention() {
    let server = Server::new_async().await;
    let uplink = uplink(&server.url(), 100);

    // One real persisted batch, plus a file 49 hours old.
    uplink
        .store
        .write(&batch_for(&uplink.endpoint))
        .unwrap();
    let expired_ms = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_millis() as u64
        - Duration::from_secs(49 * 60 * 60).as_millis() as u64;
    let expired_path = uplink._dir.path().join(format!("{expired_ms}-a.trn"));
    fs::write(&expired_path, b"stale").unwrap();

    // Simulated restart: rebuild the index from the directory scan.
    let rebuilt = FileIndex::new(uplink.store.list_existing().unwrap(), 100);
    assert_eq!(rebuilt.len(), 1);
    let only = rebuilt.take_oldest().unwrap();
    assert_ne!(only.path(), expired_path.as_path());
    assert!(rebuilt.take_oldest().is_none());
    // Excluded, not deleted.
    assert!(expired_path.exists());
}
