use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::time::{Instant, sleep};

use burrow_core::{FileQueue, QueueBuilder, QueueConfig, QueueError};

async fn open(root: &Path, name: &str, sweep: Duration) -> FileQueue {
    QueueBuilder::new(name)
        .config(QueueConfig {
            root: root.to_path_buf(),
            sweep_interval_ms: sweep.as_millis() as u64,
            lock_backoff_ms: 5,
        })
        .open()
        .await
        .unwrap()
}

#[tokio::test]
async fn hello_round_trip_leaves_no_file_behind() {
    let root = TempDir::new().unwrap();
    let queue = open(root.path(), "hello", Duration::from_secs(60)).await;

    let handle = queue.push("hello").await.unwrap();
    assert!(queue.is_active());

    let msg = queue.pull(None).await.unwrap().expect("one visible message");
    assert_eq!(msg.content(), "hello");
    assert_eq!(msg.receipt_handle(), &handle);
    assert!(msg.visible_at().is_some());

    assert!(queue.pull(None).await.unwrap().is_none());
    assert!(queue.delete(handle.as_str()).await.unwrap());

    assert!(!queue.paths().message().exists());
    assert!(!queue.paths().lock().exists());
    assert!(!queue.is_active());
}

#[tokio::test]
async fn sweeper_makes_expired_claims_visible_again() {
    let root = TempDir::new().unwrap();
    let queue = open(root.path(), "redeliver", Duration::from_millis(100)).await;

    let handle = queue.push("retry me").await.unwrap();
    let first = queue.pull(Some(1)).await.unwrap().unwrap();
    assert_eq!(first.receipt_handle(), &handle);

    let deadline = Instant::now() + Duration::from_secs(10);
    let again = loop {
        if let Some(msg) = queue.pull(Some(60)).await.unwrap() {
            break msg;
        }
        assert!(Instant::now() < deadline, "message was never redelivered");
        sleep(Duration::from_millis(100)).await;
    };

    assert_eq!(again.receipt_handle(), &handle);
    assert_eq!(again.content(), "retry me");
}

#[tokio::test]
async fn idle_sweeper_handle_redelivers_claims_from_other_handles() {
    let root = TempDir::new().unwrap();
    let sweeper = Arc::new(open(root.path(), "idle", Duration::from_millis(50)).await);
    assert!(!sweeper.is_active());

    let watcher = {
        let sweeper = Arc::clone(&sweeper);
        tokio::spawn(async move { sweeper.watch_activity().await })
    };

    {
        let producer = open(root.path(), "idle", Duration::from_secs(60)).await;
        producer.push("x").await.unwrap();
        producer.pull(Some(0)).await.unwrap().unwrap();
    }

    let deadline = Instant::now() + Duration::from_secs(10);
    let again = loop {
        if let Some(msg) = sweeper.pull(Some(60)).await.unwrap() {
            break msg;
        }
        assert!(Instant::now() < deadline, "claim was never returned");
        sleep(Duration::from_millis(50)).await;
    };

    assert_eq!(again.content(), "x");
    assert!(sweeper.is_active());
    watcher.abort();
}

#[tokio::test]
async fn handles_on_one_root_share_the_queue() {
    let root = TempDir::new().unwrap();
    let producer = open(root.path(), "shared", Duration::from_secs(60)).await;
    let consumer = open(root.path(), "shared", Duration::from_secs(60)).await;

    producer.push("from producer").await.unwrap();
    let msg = consumer.pull(None).await.unwrap().unwrap();
    assert_eq!(msg.content(), "from producer");

    // the producer sees the claim
    assert!(producer.pull(None).await.unwrap().is_none());
    assert!(producer.delete(msg.receipt_handle()).await.unwrap());
    assert!(!consumer.paths().message().exists());
}

#[tokio::test]
async fn queues_are_isolated_by_name() {
    let root = TempDir::new().unwrap();
    let a = open(root.path(), "a", Duration::from_secs(60)).await;
    let b = open(root.path(), "b", Duration::from_secs(60)).await;

    a.push("only in a").await.unwrap();
    assert!(b.pull(None).await.unwrap().is_none());
    assert_eq!(a.pull(None).await.unwrap().unwrap().content(), "only in a");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_consumers_never_share_a_claim() {
    let root = TempDir::new().unwrap();
    let producer = open(root.path(), "work", Duration::from_secs(60)).await;
    for i in 0..40 {
        producer.push(format!("job-{i}")).await.unwrap();
    }

    let mut workers = Vec::new();
    for _ in 0..4 {
        let consumer = Arc::new(open(root.path(), "work", Duration::from_secs(60)).await);
        workers.push(tokio::spawn(async move {
            let mut seen = Vec::new();
            while let Some(msg) = consumer.pull(Some(600)).await.unwrap() {
                seen.push(msg.into_content());
            }
            seen
        }));
    }

    let mut all = Vec::new();
    for worker in workers {
        all.extend(worker.await.unwrap());
    }

    let unique: HashSet<_> = all.iter().cloned().collect();
    assert_eq!(all.len(), 40);
    assert_eq!(unique.len(), 40);
}

#[tokio::test]
async fn invalid_queue_name_is_rejected_at_open() {
    let root = TempDir::new().unwrap();
    let result = QueueBuilder::new("a/b").root(root.path()).open().await;
    assert!(matches!(result, Err(QueueError::InvalidQueueName { .. })));
}

#[tokio::test]
async fn queue_url_resolves_to_trailing_segment() {
    let root = TempDir::new().unwrap();
    let queue = QueueBuilder::from_url("http://localhost:9324/queue/orders")
        .unwrap()
        .root(root.path())
        .open()
        .await
        .unwrap();

    queue.push("x").await.unwrap();
    assert!(root.path().join("orders").join("message").exists());
}
