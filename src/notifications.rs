//! Local notification scheduling.
//!
//! [`NotificationCenter`] is the seam to the platform's notification
//! subsystem. Two implementations ship here: an in-process one and a JSON
//! spool on disk that a platform shim delivers from.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Notification permission denied")]
    PermissionDenied,
    #[error("Failed to schedule notification: {0}")]
    SchedulingFailed(String),
    #[error("Notification spool I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Notification spool is not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A one-shot notification to deliver at `fire_at` (local time)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationRequest {
    pub title: String,
    pub body: String,
    /// Opaque category marker used to find a caller's own notifications
    pub tag: String,
    pub fire_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledNotification {
    pub identifier: String,
    pub title: String,
    pub body: String,
    pub tag: String,
    pub fire_at: NaiveDateTime,
}

pub trait NotificationCenter {
    /// Every pending notification, whatever its tag
    fn scheduled(&self) -> Result<Vec<ScheduledNotification>, NotificationError>;

    /// Install a one-shot notification and return its identifier
    fn schedule(&mut self, request: NotificationRequest) -> Result<String, NotificationError>;

    /// Remove a pending notification. Unknown identifiers are ignored.
    fn cancel(&mut self, identifier: &str) -> Result<(), NotificationError>;

    /// Remove and return notifications due at or before `now`, earliest first
    fn take_due(&mut self, now: NaiveDateTime) -> Result<Vec<ScheduledNotification>, NotificationError>;
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct Spool {
    #[serde(default)]
    next_id: u64,
    #[serde(default)]
    pending: Vec<ScheduledNotification>,
}

impl Spool {
    fn push(&mut self, request: NotificationRequest) -> Result<String, NotificationError> {
        if request.tag.trim().is_empty() {
            return Err(NotificationError::SchedulingFailed("notification tag is empty".to_string()));
        }
        self.next_id += 1;
        let identifier = format!("{}-{}", request.tag, self.next_id);
        self.pending.push(ScheduledNotification {
            identifier: identifier.clone(),
            title: request.title,
            body: request.body,
            tag: request.tag,
            fire_at: request.fire_at,
        });
        Ok(identifier)
    }

    fn remove(&mut self, identifier: &str) {
        self.pending.retain(|n| n.identifier != identifier);
    }

    fn take_due(&mut self, now: NaiveDateTime) -> Vec<ScheduledNotification> {
        let (mut due, pending): (Vec<_>, Vec<_>) =
            self.pending.drain(..).partition(|n| n.fire_at <= now);
        self.pending = pending;
        due.sort_by_key(|n| n.fire_at);
        due
    }
}

/// Notifications held in process memory
#[derive(Debug, Clone)]
pub struct MemoryNotificationCenter {
    spool: Spool,
    permission_granted: bool,
}

impl Default for MemoryNotificationCenter {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryNotificationCenter {
    pub fn new() -> Self {
        Self {
            spool: Spool::default(),
            permission_granted: true,
        }
    }

    /// Make subsequent `schedule` calls fail as if the user refused permission
    pub fn deny_permission(&mut self) {
        self.permission_granted = false;
    }

    pub fn grant_permission(&mut self) {
        self.permission_granted = true;
    }
}

impl NotificationCenter for MemoryNotificationCenter {
    fn scheduled(&self) -> Result<Vec<ScheduledNotification>, NotificationError> {
        Ok(self.spool.pending.clone())
    }

    fn schedule(&mut self, request: NotificationRequest) -> Result<String, NotificationError> {
        if !self.permission_granted {
            return Err(NotificationError::PermissionDenied);
        }
        self.spool.push(request)
    }

    fn cancel(&mut self, identifier: &str) -> Result<(), NotificationError> {
        self.spool.remove(identifier);
        Ok(())
    }

    fn take_due(&mut self, now: NaiveDateTime) -> Result<Vec<ScheduledNotification>, NotificationError> {
        Ok(self.spool.take_due(now))
    }
}

/// Notifications persisted as a JSON spool file
#[derive(Debug, Clone)]
pub struct FileNotificationCenter {
    path: PathBuf,
}

impl FileNotificationCenter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Spool, NotificationError> {
        if !self.path.exists() {
            return Ok(Spool::default());
        }
        let contents = fs::read_to_string(&self.path)?;
        if contents.trim().is_empty() {
            return Ok(Spool::default());
        }
        Ok(serde_json::from_str(&contents)?)
    }

    /// Write to a sibling temp file, then rename over the spool
    fn store(&self, spool: &Spool) -> Result<(), NotificationError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(spool)?)?;
        fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), pending = spool.pending.len(), "notification spool written");
        Ok(())
    }
}

impl NotificationCenter for FileNotificationCenter {
    fn scheduled(&self) -> Result<Vec<ScheduledNotification>, NotificationError> {
        Ok(self.load()?.pending)
    }

    fn schedule(&mut self, request: NotificationRequest) -> Result<String, NotificationError> {
        let mut spool = self.load()?;
        let identifier = spool.push(request)?;
        self.store(&spool)?;
        Ok(identifier)
    }

    fn cancel(&mut self, identifier: &str) -> Result<(), NotificationError> {
        let mut spool = self.load()?;
        let before = spool.pending.len();
        spool.remove(identifier);
        if spool.pending.len() != before {
            self.store(&spool)?;
        }
        Ok(())
    }

    fn take_due(&mut self, now: NaiveDateTime) -> Result<Vec<ScheduledNotification>, NotificationError> {
        let mut spool = self.load()?;
        let due = spool.take_due(now);
        if !due.is_empty() {
            self.store(&spool)?;
        }
        Ok(due)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::at;

    fn request(tag: &str, fire_at: NaiveDateTime) -> NotificationRequest {
        NotificationRequest {
            title: "title".to_string(),
            body: "body".to_string(),
            tag: tag.to_string(),
            fire_at,
        }
    }

    fn temp_spool(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("clarity-test-{}-{}", std::process::id(), name));
        let _ = fs::remove_dir_all(&dir);
        dir.join("notifications.json")
    }

    #[test]
    fn memory_center_issues_fresh_identifiers() {
        let mut center = MemoryNotificationCenter::new();
        let a = center.schedule(request("checkin", at(2024, 1, 1, 19, 0, 0))).unwrap();
        center.cancel(&a).unwrap();
        let b = center.schedule(request("checkin", at(2024, 1, 1, 19, 0, 0))).unwrap();
        assert_ne!(a, b);
        assert_eq!(center.scheduled().unwrap().len(), 1);
    }

    #[test]
    fn memory_center_denies_when_told() {
        let mut center = MemoryNotificationCenter::new();
        center.deny_permission();
        let err = center.schedule(request("checkin", at(2024, 1, 1, 19, 0, 0))).unwrap_err();
        assert!(matches!(err, NotificationError::PermissionDenied));
        assert!(center.scheduled().unwrap().is_empty());
    }

    #[test]
    fn untagged_requests_are_rejected() {
        let mut center = MemoryNotificationCenter::new();
        let err = center.schedule(request(" ", at(2024, 1, 1, 19, 0, 0))).unwrap_err();
        assert!(matches!(err, NotificationError::SchedulingFailed(_)));
    }

    #[test]
    fn take_due_drains_only_past_notifications() {
        let mut center = MemoryNotificationCenter::new();
        center.schedule(request("a", at(2024, 1, 2, 9, 0, 0))).unwrap();
        center.schedule(request("b", at(2024, 1, 1, 19, 0, 0))).unwrap();
        let due = center.take_due(at(2024, 1, 1, 20, 0, 0)).unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].tag, "b");
        assert_eq!(center.scheduled().unwrap()[0].tag, "a");
    }

    #[test]
    fn file_center_survives_reopen() {
        let path = temp_spool("reopen");
        let mut center = FileNotificationCenter::new(&path);
        assert!(center.scheduled().unwrap().is_empty());

        let first = center.schedule(request("checkin", at(2024, 1, 1, 19, 0, 0))).unwrap();
        center.schedule(request("other", at(2024, 1, 3, 8, 0, 0))).unwrap();
        center.cancel(&first).unwrap();

        let mut reopened = FileNotificationCenter::new(&path);
        let pending = reopened.scheduled().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].tag, "other");

        // sequence continues across instances
        let next = reopened.schedule(request("checkin", at(2024, 1, 2, 19, 0, 0))).unwrap();
        assert_eq!(next, "checkin-3");

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn file_center_rejects_corrupt_spool() {
        let path = temp_spool("corrupt");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{not json").unwrap();
        let center = FileNotificationCenter::new(&path);
        assert!(matches!(center.scheduled(), Err(NotificationError::Serialization(_))));
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }
}
