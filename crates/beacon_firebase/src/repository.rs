//! Storage for device tokens and notification logs
//!
//! The traits are object safe so the service can hold them as `Arc<dyn ..>`.
//! The in-memory implementations are used when no database is configured and
//! in tests; see [`crate::repository_sql`] for the SQLite ones.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use tokio::sync::RwLock;

use crate::client::FirebaseError;
use crate::models::{DeviceToken, NotificationLogEntry};

/// Type alias for a boxed future that returns a Result
pub type BoxFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'a>>;

/// Device registration tokens per user.
pub trait DeviceTokenRepository: Send + Sync {
    /// The most recently registered or refreshed token for `user_id`.
    fn latest_token(&self, user_id: &str) -> BoxFuture<'_, Option<DeviceToken>, FirebaseError>;

    /// Stores `token`, refreshing an existing entry for the same user and
    /// token, or the same user and device.
    fn upsert_token(&self, token: DeviceToken) -> BoxFuture<'_, DeviceToken, FirebaseError>;
}

/// Append-only record of delivered notifications.
pub trait NotificationLogRepository: Send + Sync {
    fn append(&self, entry: NotificationLogEntry) -> BoxFuture<'_, (), FirebaseError>;
}

/// Keeps tokens in registration order; the last entry for a user is the latest.
#[derive(Debug, Default)]
pub struct InMemoryDeviceTokenRepository {
    tokens: RwLock<Vec<DeviceToken>>,
}

impl InMemoryDeviceTokenRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.tokens.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tokens.read().await.is_empty()
    }
}

impl DeviceTokenRepository for InMemoryDeviceTokenRepository {
    fn latest_token(&self, user_id: &str) -> BoxFuture<'_, Option<DeviceToken>, FirebaseError> {
        let user_id = user_id.to_string();

        Box::pin(async move {
            let tokens = self.tokens.read().await;
            Ok(tokens.iter().rev().find(|t| t.user_id == user_id).cloned())
        })
    }

    fn upsert_token(&self, mut token: DeviceToken) -> BoxFuture<'_, DeviceToken, FirebaseError> {
        Box::pin(async move {
            let mut tokens = self.tokens.write().await;

            let existing = tokens.iter().position(|t| {
                t.user_id == token.user_id
                    && (t.token == token.token
                        || (token.device_id.is_some() && t.device_id == token.device_id))
            });
            if let Some(idx) = existing {
                let previous = tokens.remove(idx);
                token.created_at = previous.created_at;
                if token.device_id.is_none() {
                    token.device_id = previous.device_id;
                }
            }

            tokens.push(token.clone());
            Ok(token)
        })
    }
}

/// Entries kept by [`InMemoryNotificationLogRepository::new`].
pub const DEFAULT_LOG_CAPACITY: usize = 1000;

/// Keeps the most recent `capacity` log entries; older ones are dropped.
#[derive(Debug)]
pub struct InMemoryNotificationLogRepository {
    entries: RwLock<VecDeque<NotificationLogEntry>>,
    capacity: usize,
}

impl Default for InMemoryNotificationLogRepository {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_LOG_CAPACITY)
    }
}

impl InMemoryNotificationLogRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// A capacity of zero is treated as one.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest first.
    pub async fn entries(&self) -> Vec<NotificationLogEntry> {
        self.entries.read().await.iter().cloned().collect()
    }
}

impl NotificationLogRepository for InMemoryNotificationLogRepository {
    fn append(&self, entry: NotificationLogEntry) -> BoxFuture<'_, (), FirebaseError> {
        Box::pin(async move {
            let mut entries = self.entries.write().await;
            while entries.len() >= self.capacity {
                entries.pop_front();
            }
            entries.push_back(entry);
            Ok(())
        })
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn log_entry(user_id: &str) -> NotificationLogEntry {
        NotificationLogEntry {
            user_id: user_id.to_string(),
            baby_id: None,
            kind: "test".to_string(),
            title: "t".to_string(),
            body: "b".to_string(),
            fcm_response: serde_json::json!({"name": "m"}),
            sent_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_log_keeps_only_most_recent_entries() {
        let logs = InMemoryNotificationLogRepository::with_capacity(2);
        for user in ["u1", "u2", "u3"] {
            logs.append(log_entry(user)).await.unwrap();
        }

        let users: Vec<String> = logs.entries().await.into_iter().map(|e| e.user_id).collect();
        assert_eq!(users, ["u2", "u3"]);
        assert_eq!(InMemoryNotificationLogRepository::new().capacity(), DEFAULT_LOG_CAPACITY);
    }

    #[tokio::test]
    async fn test_latest_token_is_last_registered() {
        let repo = InMemoryDeviceTokenRepository::new();
        assert!(repo.latest_token("u1").await.unwrap().is_none());

        repo.upsert_token(DeviceToken::new("u1".into(), "t1".into(), Some("phone".into())))
            .await
            .unwrap();
        repo.upsert_token(DeviceToken::new("u1".into(), "t2".into(), Some("tablet".into())))
            .await
            .unwrap();
        repo.upsert_token(DeviceToken::new("u2".into(), "t3".into(), None))
            .await
            .unwrap();

        let latest = repo.latest_token("u1").await.unwrap().unwrap();
        assert_eq!(latest.token, "t2");
        assert_eq!(repo.len().await, 3);
    }

    #[tokio::test]
    async fn test_refreshing_a_token_makes_it_latest() {
        let repo = InMemoryDeviceTokenRepository::new();
        repo.upsert_token(DeviceToken::new("u1".into(), "t1".into(), Some("phone".into())))
            .await
            .unwrap();
        repo.upsert_token(DeviceToken::new("u1".into(), "t2".into(), Some("tablet".into())))
            .await
            .unwrap();

        // Same token again, no device id: refreshes the phone entry.
        let refreshed = repo
            .upsert_token(DeviceToken::new("u1".into(), "t1".into(), None))
            .await
            .unwrap();
        assert_eq!(refreshed.device_id.as_deref(), Some("phone"));
        assert_eq!(repo.len().await, 2);
        assert_eq!(repo.latest_token("u1").await.unwrap().unwrap().token, "t1");
    }

    #[tokio::test]
    async fn test_new_token_for_same_device_replaces_old() {
        let repo = InMemoryDeviceTokenRepository::new();
        repo.upsert_token(DeviceToken::new("u1".into(), "old".into(), Some("phone".into())))
            .await
            .unwrap();
        repo.upsert_token(DeviceToken::new("u1".into(), "new".into(), Some("phone".into())))
            .await
            .unwrap();

        assert_eq!(repo.len().await, 1);
        assert_eq!(repo.latest_token("u1").await.unwrap().unwrap().token, "new");
    }
}
