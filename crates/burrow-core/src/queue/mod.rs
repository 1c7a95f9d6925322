//! Queue module: record codec, on-disk layout and the file-backed queue.

pub mod codec;
mod paths;
pub(crate) mod store;

pub use paths::QueuePaths;

use std::future::Future;
use std::sync::Arc;

use crate::domain::{Message, QueueName, ReceiptHandle};
use crate::error::{QueueError, Result};
use crate::observability::QueueStats;
use store::QueueStore;

/// Handle to one file-backed queue.
///
/// Design intent:
/// - All state lives on disk; any number of handles, in this or other
///   processes, may work on the same queue as long as they share the root
///   and the lock protocol.
/// - Each operation is one transaction under the queue lock. Once started it
///   runs to completion on its own task even if the caller's future is
///   dropped, so a cancelled caller never leaves the lock behind.
/// - Dropping the handle stops its visibility sweeper.
pub struct FileQueue {
    store: Arc<QueueStore>,
}

impl FileQueue {
    pub(crate) fn new(store: Arc<QueueStore>) -> Self {
        Self { store }
    }

    pub fn name(&self) -> &QueueName {
        self.store.name()
    }

    pub fn paths(&self) -> &QueuePaths {
        self.store.paths()
    }

    /// Append a visible message; returns its receipt handle.
    pub async fn push(&self, content: impl Into<String>) -> Result<ReceiptHandle> {
        let content = content.into();
        if content.contains(['\n', '\r']) {
            return Err(QueueError::InvalidContent);
        }
        let store = Arc::clone(&self.store);
        run_to_completion(async move { store.push(content).await }).await
    }

    /// Claim the first visible message for `visibility_timeout` seconds
    /// (`None` = default). Returns `None` when nothing is visible.
    pub async fn pull(&self, visibility_timeout: Option<i64>) -> Result<Option<Message>> {
        let store = Arc::clone(&self.store);
        run_to_completion(async move { store.pull(visibility_timeout).await }).await
    }

    /// Acknowledge an in-flight message. Returns `false` for an empty handle,
    /// an unknown handle, or a message that is not currently claimed.
    pub async fn delete(&self, receipt_handle: impl AsRef<str>) -> Result<bool> {
        let receipt_handle = receipt_handle.as_ref().to_owned();
        if receipt_handle.is_empty() {
            return Ok(false);
        }
        let store = Arc::clone(&self.store);
        run_to_completion(async move { store.delete(&receipt_handle).await }).await
    }

    /// Start the sweeper once another handle or process creates the message
    /// file. A handle opened on an empty queue otherwise stays dormant until
    /// it pushes itself.
    ///
    /// Polls every sweep interval and only returns on an I/O error, so run it
    /// alongside something that ends (e.g. in `tokio::select!`).
    pub async fn watch_activity(&self) -> Result<()> {
        self.store.watch_activity().await
    }

    /// Observability hook.
    pub fn stats(&self) -> QueueStats {
        self.store.stats()
    }

    pub fn is_active(&self) -> bool {
        self.store.is_active()
    }

    #[cfg(test)]
    pub(crate) async fn refresh(&self) -> Result<()> {
        self.store.refresh().await
    }

    #[cfg(test)]
    pub(crate) fn store(&self) -> &Arc<QueueStore> {
        &self.store
    }
}

impl Drop for FileQueue {
    fn drop(&mut self) {
        self.store.deactivate();
    }
}

async fn run_to_completion<T, F>(tx: F) -> Result<T>
where
    T: Send + 'static,
    F: Future<Output = Result<T>> + Send + 'static,
{
    tokio::spawn(tx)
        .await
        .map_err(|e| QueueError::Interrupted(e.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::Arc;

    use chrono::{TimeDelta, TimeZone, Utc};
    use tempfile::TempDir;

    use crate::app::QueueBuilder;
    use crate::impls::ProcessLock;
    use crate::ports::{Clock, FixedClock};

    struct Fixture {
        root: TempDir,
        clock: Arc<FixedClock>,
        queue: FileQueue,
    }

    /// Queue with a manual clock and a sweeper that never fires on its own,
    /// so tests drive refresh explicitly.
    async fn fixture(name: &str) -> Fixture {
        let root = TempDir::new().unwrap();
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
        ));
        let queue = open(root.path(), name, &clock).await;
        Fixture { root, clock, queue }
    }

    async fn open(root: &Path, name: &str, clock: &Arc<FixedClock>) -> FileQueue {
        QueueBuilder::new(name)
            .root(root)
            .clock(clock.clone())
            .sweep_interval(std::time::Duration::from_secs(3600))
            .open()
            .await
            .unwrap()
    }

    fn read_message_file(queue: &FileQueue) -> String {
        std::fs::read_to_string(queue.paths().message()).unwrap()
    }

    #[tokio::test]
    async fn push_then_pull_returns_content_with_stable_handle() {
        let f = fixture("orders").await;

        let handle = f.queue.push("hello").await.unwrap();
        let message = f.queue.pull(Some(30)).await.unwrap().unwrap();

        assert_eq!(message.content(), "hello");
        assert_eq!(message.receipt_handle(), &handle);
        assert!(!handle.is_empty());
        assert_eq!(
            message.visible_at(),
            Some(f.clock.now() + TimeDelta::seconds(30))
        );
    }

    #[tokio::test]
    async fn hello_scenario_drains_queue() {
        let f = fixture("orders").await;

        f.queue.push("hello").await.unwrap();
        let message = f.queue.pull(Some(30)).await.unwrap().unwrap();
        assert_eq!(message.content(), "hello");

        assert!(f.queue.pull(Some(30)).await.unwrap().is_none());
        assert!(f.queue.delete(message.receipt_handle()).await.unwrap());
        assert!(f.queue.pull(Some(30)).await.unwrap().is_none());

        assert!(!f.queue.paths().message().exists());
        assert!(!f.queue.is_active());
    }

    #[tokio::test]
    async fn zero_timeout_pulls_in_push_order() {
        let f = fixture("orders").await;

        f.queue.push("a").await.unwrap();
        f.queue.push("b").await.unwrap();

        let first = f.queue.pull(Some(0)).await.unwrap().unwrap();
        let second = f.queue.pull(Some(0)).await.unwrap().unwrap();
        assert_eq!(first.content(), "a");
        assert_eq!(second.content(), "b");
    }

    #[tokio::test]
    async fn pull_claims_only_one_message() {
        let f = fixture("orders").await;
        for content in ["a", "b", "c"] {
            f.queue.push(content).await.unwrap();
        }

        f.queue.pull(Some(30)).await.unwrap().unwrap();

        let lines: Vec<_> = read_message_file(&f.queue).lines().map(str::to_owned).collect();
        assert_eq!(lines.len(), 3);
        assert!(!lines[0].contains("$0$"));
        assert!(lines[1].ends_with("$0$b"));
        assert!(lines[2].ends_with("$0$c"));
    }

    #[tokio::test]
    async fn pull_on_untouched_queue_returns_none() {
        let f = fixture("never-used").await;
        assert!(f.queue.pull(None).await.unwrap().is_none());
        assert!(!f.queue.paths().message().exists());
    }

    #[tokio::test]
    async fn pull_without_visible_message_leaves_file_identical() {
        let f = fixture("orders").await;
        f.queue.push("a").await.unwrap();
        f.queue.pull(Some(30)).await.unwrap().unwrap();
        let before = read_message_file(&f.queue);

        assert!(f.queue.pull(Some(30)).await.unwrap().is_none());
        assert_eq!(read_message_file(&f.queue), before);
    }

    #[tokio::test]
    async fn expired_claim_is_redelivered_after_refresh() {
        let f = fixture("orders").await;
        f.queue.push("job").await.unwrap();
        let first = f.queue.pull(Some(10)).await.unwrap().unwrap();

        // not yet expired
        f.clock.advance(TimeDelta::seconds(10));
        f.queue.refresh().await.unwrap();
        assert!(f.queue.pull(Some(10)).await.unwrap().is_none());

        f.clock.advance(TimeDelta::seconds(1));
        f.queue.refresh().await.unwrap();
        let again = f.queue.pull(Some(10)).await.unwrap().unwrap();

        assert_eq!(again.receipt_handle(), first.receipt_handle());
        assert_eq!(again.content(), "job");
    }

    #[tokio::test]
    async fn expiry_without_refresh_does_not_redeliver() {
        let f = fixture("orders").await;
        f.queue.push("job").await.unwrap();
        f.queue.pull(Some(1)).await.unwrap().unwrap();

        f.clock.advance(TimeDelta::seconds(60));
        assert!(f.queue.pull(Some(1)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_of_visible_message_is_a_noop() {
        let f = fixture("orders").await;
        let handle = f.queue.push("job").await.unwrap();

        assert!(!f.queue.delete(&handle).await.unwrap());

        let message = f.queue.pull(Some(30)).await.unwrap().unwrap();
        assert_eq!(message.receipt_handle(), &handle);
    }

    #[tokio::test]
    async fn delete_after_pull_removes_message_for_good() {
        let f = fixture("orders").await;
        f.queue.push("a").await.unwrap();
        f.queue.push("b").await.unwrap();

        let a = f.queue.pull(Some(5)).await.unwrap().unwrap();
        assert!(f.queue.delete(a.receipt_handle()).await.unwrap());
        assert!(!f.queue.delete(a.receipt_handle()).await.unwrap());

        f.clock.advance(TimeDelta::seconds(60));
        f.queue.refresh().await.unwrap();

        let next = f.queue.pull(Some(5)).await.unwrap().unwrap();
        assert_eq!(next.content(), "b");
        assert!(f.queue.paths().message().exists());
        assert!(f.queue.is_active());
    }

    #[tokio::test]
    async fn delete_with_empty_or_unknown_handle() {
        let f = fixture("orders").await;
        assert!(!f.queue.delete("").await.unwrap());
        assert!(!f.queue.delete("missing").await.unwrap());

        f.queue.push("a").await.unwrap();
        f.queue.pull(Some(5)).await.unwrap().unwrap();
        assert!(!f.queue.delete("missing").await.unwrap());
    }

    #[tokio::test]
    async fn content_with_delimiter_round_trips() {
        let f = fixture("orders").await;
        let content = "$total$ = 5$ and $";

        f.queue.push(content).await.unwrap();
        let message = f.queue.pull(None).await.unwrap().unwrap();
        assert_eq!(message.content(), content);
    }

    #[tokio::test]
    async fn content_with_line_break_is_rejected() {
        let f = fixture("orders").await;
        assert!(matches!(
            f.queue.push("two\nlines").await,
            Err(QueueError::InvalidContent)
        ));
        assert!(!f.queue.paths().message().exists());
    }

    #[tokio::test]
    async fn malformed_lines_are_dropped_and_counted() {
        let f = fixture("orders").await;
        f.queue.push("a").await.unwrap();

        let path = f.queue.paths().message().to_path_buf();
        let mut raw = std::fs::read_to_string(&path).unwrap();
        raw.push_str("garbage without delimiters\n");
        raw.push_str("h$not-a-time$x\n");
        std::fs::write(&path, raw).unwrap();
        f.queue.push("b").await.unwrap();

        let a = f.queue.pull(Some(0)).await.unwrap().unwrap();
        let b = f.queue.pull(Some(0)).await.unwrap().unwrap();
        assert_eq!(a.content(), "a");
        assert_eq!(b.content(), "b");

        assert_eq!(read_message_file(&f.queue).lines().count(), 2);
        let stats = f.queue.stats();
        assert_eq!(stats.dropped_lines, 2);
        assert_eq!(stats.transactions, 2);
    }

    #[tokio::test]
    async fn first_push_activates_and_last_delete_deactivates() {
        let f = fixture("orders").await;
        assert!(!f.queue.is_active());

        f.queue.push("a").await.unwrap();
        assert!(f.queue.is_active());
        assert!(f.queue.stats().scheduler_active);

        let a = f.queue.pull(Some(5)).await.unwrap().unwrap();
        f.queue.delete(a.receipt_handle()).await.unwrap();
        assert!(!f.queue.is_active());

        // a fresh push brings the queue back
        f.queue.push("b").await.unwrap();
        assert!(f.queue.is_active());
    }

    #[tokio::test]
    async fn opening_populated_queue_activates_sweeper() {
        let f = fixture("orders").await;
        f.queue.push("a").await.unwrap();

        let other = open(f.root.path(), "orders", &f.clock).await;
        assert!(other.is_active());

        let empty = open(f.root.path(), "empty", &f.clock).await;
        assert!(!empty.is_active());
    }

    #[tokio::test]
    async fn stale_backup_file_is_discarded() {
        let f = fixture("orders").await;
        f.queue.push("a").await.unwrap();
        std::fs::write(f.queue.paths().backup(), "stale$0$leftover\n").unwrap();

        let a = f.queue.pull(Some(0)).await.unwrap().unwrap();
        assert_eq!(a.content(), "a");
        assert!(f.queue.pull(Some(30)).await.unwrap().is_none());
        assert_eq!(read_message_file(&f.queue).lines().count(), 1);
    }

    #[tokio::test]
    async fn transactions_work_with_process_lock() {
        let root = TempDir::new().unwrap();
        let queue = QueueBuilder::new("in-process")
            .root(root.path())
            .lock(Arc::new(ProcessLock::new()))
            .open()
            .await
            .unwrap();

        queue.push("x").await.unwrap();
        let message = queue.pull(Some(30)).await.unwrap().unwrap();
        assert!(queue.delete(message.receipt_handle()).await.unwrap());
        assert!(!queue.paths().message().exists());
        assert!(!queue.paths().lock().exists());
    }

    #[tokio::test]
    async fn lock_marker_is_released_after_each_operation() {
        let f = fixture("orders").await;
        f.queue.push("a").await.unwrap();
        assert!(!f.queue.paths().lock().exists());
        f.queue.pull(None).await.unwrap();
        assert!(!f.queue.paths().lock().exists());
    }

    #[tokio::test]
    async fn rewrite_dropping_every_line_removes_message_file() {
        let f = fixture("orders").await;
        f.queue.push("a").await.unwrap();
        let path = f.queue.paths().message().to_path_buf();

        std::fs::write(&path, "garbage\n").unwrap();
        assert!(f.queue.pull(None).await.unwrap().is_none());
        assert!(!path.exists());
        assert!(!f.queue.is_active());

        std::fs::write(&path, "h$not-a-time$x\n").unwrap();
        f.queue.refresh().await.unwrap();
        assert!(!path.exists());
        assert_eq!(f.queue.stats().dropped_lines, 2);
    }

    #[tokio::test]
    async fn untouched_records_are_copied_byte_for_byte() {
        let f = fixture("orders").await;
        let path = f.queue.paths().message().to_path_buf();
        std::fs::create_dir_all(f.queue.paths().dir()).unwrap();

        // claimed far in the future, non-canonical millis, mixed line endings
        let raw = "h1$09999999999999$x\nh2$9999999999999$y\r\n";
        std::fs::write(&path, raw).unwrap();

        assert!(f.queue.pull(Some(30)).await.unwrap().is_none());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), raw);

        f.queue.refresh().await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), raw);
    }

    #[tokio::test]
    async fn io_failure_surfaces_and_releases_lock() {
        let f = fixture("orders").await;
        f.queue.push("a").await.unwrap();
        let before = read_message_file(&f.queue);

        // a directory where the backup file goes makes the rewrite fail
        std::fs::create_dir(f.queue.paths().backup()).unwrap();
        assert!(matches!(
            f.queue.pull(Some(30)).await,
            Err(QueueError::Io { .. })
        ));
        assert!(!f.queue.paths().lock().exists());
        assert_eq!(read_message_file(&f.queue), before);
        assert!(f.queue.is_active());

        std::fs::remove_dir(f.queue.paths().backup()).unwrap();
        let message = f.queue.pull(Some(30)).await.unwrap().unwrap();
        assert_eq!(message.content(), "a");
    }
}
