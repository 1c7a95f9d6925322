//! Read-rewrite-swap transactions over one queue's message file.
//!
//! Every transaction has the same shape:
//!
//! 1. acquire the queue lock
//! 2. fast path out if the message file does not exist
//! 3. stream the message file line by line into a freshly truncated backup file
//! 4. fsync the backup and rename it over the message file
//! 5. drain: a rewrite that kept nothing removes the file and goes dormant
//! 6. release the lock (also on failure)
//!
//! Push is the exception: it appends one line to the message file in place.

use std::future::Future;
use std::io::ErrorKind;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::codec::{self, LINE_ENDING};
use super::QueuePaths;
use crate::app::sweeper::{Lifecycle, Sweeper};
use crate::domain::{Message, QueueName, ReceiptHandle, VisibilityPolicy};
use crate::error::{QueueError, Result};
use crate::observability::{Counters, QueueStats, RewriteReport};
use crate::ports::{Clock, IdGenerator, QueueLock};

/// What a rewrite does with one decoded record.
enum Step {
    Keep,
    Replace(Message),
    Remove,
}

/// Shared state behind a `FileQueue` handle.
///
/// Held in an `Arc` so transactions can run on their own task and the
/// sweeper can reach it through a `Weak`.
pub(crate) struct QueueStore {
    name: QueueName,
    paths: QueuePaths,
    lock: Arc<dyn QueueLock>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    policy: VisibilityPolicy,
    sweep_interval: Duration,
    lifecycle: Mutex<Lifecycle>,
    counters: Counters,
}

pub(crate) struct StoreParts {
    pub name: QueueName,
    pub paths: QueuePaths,
    pub lock: Arc<dyn QueueLock>,
    pub clock: Arc<dyn Clock>,
    pub ids: Arc<dyn IdGenerator>,
    pub policy: VisibilityPolicy,
    pub sweep_interval: Duration,
}

impl QueueStore {
    pub(crate) fn new(parts: StoreParts) -> Self {
        Self {
            name: parts.name,
            paths: parts.paths,
            lock: parts.lock,
            clock: parts.clock,
            ids: parts.ids,
            policy: parts.policy,
            sweep_interval: parts.sweep_interval,
            lifecycle: Mutex::new(Lifecycle::Dormant),
            counters: Counters::default(),
        }
    }

    pub(crate) fn name(&self) -> &QueueName {
        &self.name
    }

    pub(crate) fn paths(&self) -> &QueuePaths {
        &self.paths
    }

    pub(crate) fn stats(&self) -> QueueStats {
        self.counters.snapshot(self.is_active())
    }

    // ----------------------------------------------------------------
    // Lifecycle (Dormant <-> Active)
    // ----------------------------------------------------------------

    pub(crate) fn is_active(&self) -> bool {
        let lifecycle = self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner);
        matches!(*lifecycle, Lifecycle::Active(_))
    }

    /// Dormant -> Active. No-op when already active.
    pub(crate) fn activate(self: &Arc<Self>) {
        let mut lifecycle = self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner);
        if matches!(*lifecycle, Lifecycle::Dormant) {
            let sweeper = Sweeper::spawn(Arc::downgrade(self), self.sweep_interval);
            *lifecycle = Lifecycle::Active(sweeper);
            info!(queue = %self.name, "queue active, visibility sweeper started");
        }
    }

    /// Active -> Dormant. No-op when already dormant.
    pub(crate) fn deactivate(&self) {
        let previous = {
            let mut lifecycle = self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *lifecycle, Lifecycle::Dormant)
        };
        if let Lifecycle::Active(sweeper) = previous {
            sweeper.stop();
            info!(queue = %self.name, "queue dormant, visibility sweeper stopped");
        }
    }

    // ----------------------------------------------------------------
    // Transactions
    // ----------------------------------------------------------------

    pub(crate) async fn push(self: &Arc<Self>, content: String) -> Result<ReceiptHandle> {
        self.locked(async {
            if !self.message_file_exists().await? {
                self.activate();
                tokio::fs::create_dir_all(self.paths.dir())
                    .await
                    .map_err(|e| self.io_err("create queue dir", e))?;
            }

            let message = Message::new(self.ids.generate_receipt_handle(), content);
            let mut line = codec::encode(&message);
            line.push_str(LINE_ENDING);

            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(self.paths.message())
                .await
                .map_err(|e| self.io_err("open message file for append", e))?;
            file.write_all(line.as_bytes())
                .await
                .map_err(|e| self.io_err("append message", e))?;
            file.sync_data()
                .await
                .map_err(|e| self.io_err("sync message file", e))?;

            debug!(queue = %self.name, receipt_handle = %message.receipt_handle(), "pushed");
            Ok(message.receipt_handle().clone())
        })
        .await
    }

    pub(crate) async fn pull(&self, visibility_timeout: Option<i64>) -> Result<Option<Message>> {
        let timeout = self.policy.clamp(visibility_timeout);

        self.locked(async {
            if !self.message_file_exists().await? {
                return Ok(None);
            }

            let until = self.policy.expiry_from_now(self.clock.as_ref(), timeout);
            let mut claimed: Option<Message> = None;
            let report = self
                .rewrite(|message| {
                    if claimed.is_some() || !message.visibility().is_visible() {
                        return Step::Keep;
                    }
                    let mut message = message.clone();
                    message.set_visible_at(Some(until));
                    claimed = Some(message.clone());
                    Step::Replace(message)
                })
                .await?;

            debug!(
                queue = %self.name,
                claimed = claimed.is_some(),
                timeout_secs = timeout,
                scanned = report.scanned,
                written = report.written,
                "pulled"
            );
            Ok(claimed)
        })
        .await
    }

    pub(crate) async fn delete(&self, receipt_handle: &str) -> Result<bool> {
        if receipt_handle.is_empty() {
            return Ok(false);
        }

        self.locked(async {
            if !self.message_file_exists().await? {
                return Ok(false);
            }

            let mut deleted = false;
            let report = self
                .rewrite(|message| {
                    let matches = message.receipt_handle().as_str() == receipt_handle
                        && message.visibility().is_in_flight();
                    if matches {
                        deleted = true;
                        Step::Remove
                    } else {
                        Step::Keep
                    }
                })
                .await?;

            debug!(
                queue = %self.name,
                deleted,
                removed = report.removed,
                drained = report.written == 0,
                "delete"
            );
            Ok(deleted)
        })
        .await
    }

    /// Make every claim whose deadline has passed visible again.
    pub(crate) async fn refresh(&self) -> Result<()> {
        self.locked(async {
            if !self.message_file_exists().await? {
                return Ok(());
            }

            let now = self.clock.now();
            let mut expired = 0u64;
            let report = self
                .rewrite(|message| {
                    if !message.visibility().is_expired_at(now) {
                        return Step::Keep;
                    }
                    let mut message = message.clone();
                    message.set_visible_at(None);
                    expired += 1;
                    Step::Replace(message)
                })
                .await?;

            if expired > 0 {
                debug!(
                    queue = %self.name,
                    expired,
                    written = report.written,
                    "claims expired, messages visible again"
                );
            }
            Ok(())
        })
        .await
    }

    /// Poll for a message file created by another handle or process and
    /// activate the sweeper when one appears.
    ///
    /// Only returns on an I/O error; stop it by dropping the future.
    pub(crate) async fn watch_activity(self: &Arc<Self>) -> Result<()> {
        let mut ticker = tokio::time::interval(self.sweep_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if !self.is_active() && self.message_file_exists().await? {
                debug!(queue = %self.name, "message file appeared");
                self.activate();
            }
        }
    }

    // ----------------------------------------------------------------
    // Internals
    // ----------------------------------------------------------------

    /// Run `tx` while holding the queue lock.
    ///
    /// The lock is released whether or not `tx` succeeds; a failure of `tx`
    /// wins over a failure to release.
    async fn locked<T>(&self, tx: impl Future<Output = Result<T>>) -> Result<T> {
        self.lock.acquire(&self.name).await?;
        let outcome = tx.await;
        let released = self.lock.release(&self.name).await;
        let value = outcome?;
        released?;
        Ok(value)
    }

    async fn message_file_exists(&self) -> Result<bool> {
        tokio::fs::try_exists(self.paths.message())
            .await
            .map_err(|e| self.io_err("probe message file", e))
    }

    /// Stream the message file through `step` into a fresh backup file, then
    /// swap the backup in.
    ///
    /// Kept records are copied byte for byte; lines that do not decode are
    /// dropped. A rewrite that leaves no record removes the message file and
    /// puts the queue back to dormant.
    async fn rewrite<F>(&self, step: F) -> Result<RewriteReport>
    where
        F: FnMut(&Message) -> Step,
    {
        let swapped = match self.rewrite_into_backup(step).await {
            Ok(report) => tokio::fs::rename(self.paths.backup(), self.paths.message())
                .await
                .map(|()| report)
                .map_err(|e| self.io_err("swap backup into message file", e)),
            Err(e) => Err(e),
        };
        let report = match swapped {
            Ok(report) => report,
            Err(e) => {
                // the message file is untouched; only the staging file is stale
                if let Err(cleanup) = tokio::fs::remove_file(self.paths.backup()).await
                    && cleanup.kind() != ErrorKind::NotFound
                {
                    warn!(queue = %self.name, error = %cleanup, "could not remove backup file");
                }
                return Err(e);
            }
        };

        self.counters.record(&report);
        if report.dropped > 0 {
            warn!(
                queue = %self.name,
                dropped = report.dropped,
                "malformed records dropped during rewrite"
            );
        }
        if report.written == 0 {
            self.drain().await?;
        }
        Ok(report)
    }

    async fn rewrite_into_backup<F>(&self, mut step: F) -> Result<RewriteReport>
    where
        F: FnMut(&Message) -> Step,
    {
        let source = File::open(self.paths.message())
            .await
            .map_err(|e| self.io_err("open message file", e))?;
        let mut reader = BufReader::new(source);

        // File::create truncates: a backup left by an interrupted transaction is discarded.
        let backup = File::create(self.paths.backup())
            .await
            .map_err(|e| self.io_err("create backup file", e))?;
        let mut writer = BufWriter::new(backup);

        let mut report = RewriteReport::default();
        let mut buf = Vec::new();
        loop {
            buf.clear();
            let read = reader
                .read_until(b'\n', &mut buf)
                .await
                .map_err(|e| self.io_err("read message file", e))?;
            if read == 0 {
                break;
            }
            report.scanned += 1;

            let raw = buf.strip_suffix(b"\n").unwrap_or(&buf[..]);
            let decoded = match std::str::from_utf8(raw) {
                Ok(line) => codec::decode(line).map_err(|e| e.to_string()),
                Err(e) => Err(format!("not UTF-8: {e}")),
            };
            let message = match decoded {
                Ok(message) => message,
                Err(reason) => {
                    report.dropped += 1;
                    debug!(queue = %self.name, line = report.scanned, %reason, "dropping malformed record");
                    continue;
                }
            };

            let line = match step(&message) {
                Step::Remove => {
                    report.removed += 1;
                    continue;
                }
                Step::Keep if buf.ends_with(b"\n") => buf.clone(),
                Step::Keep => [&buf[..], LINE_ENDING.as_bytes()].concat(),
                Step::Replace(message) => {
                    let mut line = codec::encode(&message);
                    line.push_str(LINE_ENDING);
                    line.into_bytes()
                }
            };
            writer
                .write_all(&line)
                .await
                .map_err(|e| self.io_err("write backup file", e))?;
            report.written += 1;
        }

        writer
            .flush()
            .await
            .map_err(|e| self.io_err("flush backup file", e))?;
        writer
            .into_inner()
            .sync_all()
            .await
            .map_err(|e| self.io_err("sync backup file", e))?;

        Ok(report)
    }

    /// Remove an empty message file, then go dormant. The file goes first so
    /// a failed removal leaves the sweeper running.
    async fn drain(&self) -> Result<()> {
        tokio::fs::remove_file(self.paths.message())
            .await
            .map_err(|e| self.io_err("remove empty message file", e))?;
        self.deactivate();
        Ok(())
    }

    fn io_err(&self, what: &str, source: std::io::Error) -> QueueError {
        QueueError::io(format!("{what} (queue {})", self.name), source)
    }
}
