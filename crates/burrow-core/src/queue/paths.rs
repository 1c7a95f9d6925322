//! On-disk layout of one queue.

use std::path::{Path, PathBuf};

use crate::domain::QueueName;

pub const LOCK_DIR_NAME: &str = ".lock";
pub const MESSAGE_FILE_NAME: &str = "message";
pub const BACKUP_FILE_NAME: &str = "backupMessage";

/// Paths derived from `<root>/<queue>`:
///
/// - `.lock/`        lock marker (existence = held)
/// - `message`       message file (absence = dormant queue)
/// - `backupMessage` staging file, valid only inside a transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuePaths {
    dir: PathBuf,
    lock: PathBuf,
    message: PathBuf,
    backup: PathBuf,
}

impl QueuePaths {
    pub fn new(root: impl AsRef<Path>, queue: &QueueName) -> Self {
        let dir = root.as_ref().join(queue.as_str());
        Self {
            lock: dir.join(LOCK_DIR_NAME),
            message: dir.join(MESSAGE_FILE_NAME),
            backup: dir.join(BACKUP_FILE_NAME),
            dir,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn lock(&self) -> &Path {
        &self.lock
    }

    pub fn message(&self) -> &Path {
        &self.message
    }

    pub fn backup(&self) -> &Path {
        &self.backup
    }
}
