//! SQLite storage for device tokens and notification logs
//!
//! Tables are `fcm_tokens` and `notification_logs`, created on first use by
//! `init_schema`. Token ordering follows a `seq` column bumped on every insert
//! or refresh, so "latest" means the same thing as in the in-memory store.

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::client::FirebaseError;
use crate::models::{DeviceToken, NotificationLogEntry};
use crate::repository::{BoxFuture, DeviceTokenRepository, NotificationLogRepository};

fn db_error(context: &str, err: sqlx::Error) -> FirebaseError {
    error!("{}: {}", context, err);
    FirebaseError::Repository(format!("{context}: {err}"))
}

/// Opens a connection pool, creating the database file and its directory if needed.
///
/// An in-memory URL (`sqlite::memory:`) gets a single long-lived connection,
/// since every SQLite connection would otherwise see its own empty database.
pub async fn connect(url: &str) -> Result<SqlitePool, FirebaseError> {
    debug!("Creating database pool with URL: {}", url);

    let options = SqliteConnectOptions::from_str(url)
        .map_err(|e| db_error("Invalid database URL", e))?
        .create_if_missing(true);

    let in_memory = url.contains(":memory:") || url.contains("mode=memory");
    if !in_memory {
        if let Some(dir) = options.clone().get_filename().parent() {
            if !dir.as_os_str().is_empty() {
                tokio::fs::create_dir_all(dir).await.map_err(|e| {
                    error!("Failed to create directory for SQLite database: {}", e);
                    FirebaseError::Repository(format!("Failed to create directory: {e}"))
                })?;
            }
        }
    }

    let pool_options = if in_memory {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .idle_timeout(Duration::from_secs(600))
    };

    let pool = pool_options
        .connect_with(options)
        .await
        .map_err(|e| db_error("Failed to create database pool", e))?;

    info!("Database pool created successfully");
    Ok(pool)
}

#[derive(Debug, FromRow)]
struct TokenRow {
    user_id: String,
    token: String,
    device_id: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<TokenRow> for DeviceToken {
    fn from(row: TokenRow) -> Self {
        Self {
            user_id: row.user_id,
            token: row.token,
            device_id: row.device_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Device tokens in the `fcm_tokens` table
#[derive(Debug, Clone)]
pub struct SqlDeviceTokenRepository {
    pool: SqlitePool,
}

impl SqlDeviceTokenRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn init_schema(&self) -> Result<(), FirebaseError> {
        debug!("Initializing fcm_tokens schema");

        let query = r#"
            CREATE TABLE IF NOT EXISTS fcm_tokens (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                token TEXT NOT NULL,
                device_id TEXT,
                seq INTEGER NOT NULL,
                created_at DATETIME NOT NULL,
                updated_at DATETIME NOT NULL
            )
        "#;
        sqlx::query(query)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("Failed to create fcm_tokens", e))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_fcm_tokens_user ON fcm_tokens (user_id, seq)")
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("Failed to index fcm_tokens", e))?;

        info!("fcm_tokens schema initialized successfully");
        Ok(())
    }
}

impl DeviceTokenRepository for SqlDeviceTokenRepository {
    fn latest_token(&self, user_id: &str) -> BoxFuture<'_, Option<DeviceToken>, FirebaseError> {
        let user_id = user_id.to_string();

        Box::pin(async move {
            let query = r#"
                SELECT user_id, token, device_id, created_at, updated_at
                FROM fcm_tokens
                WHERE user_id = $1
                ORDER BY seq DESC
                LIMIT 1
            "#;

            let row: Option<TokenRow> = sqlx::query_as(query)
                .bind(&user_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("Failed to find device token", e))?;

            Ok(row.map(DeviceToken::from))
        })
    }

    fn upsert_token(&self, token: DeviceToken) -> BoxFuture<'_, DeviceToken, FirebaseError> {
        Box::pin(async move {
            debug!("Registering device token for user: {}", token.user_id);

            let mut tx = self
                .pool
                .begin()
                .await
                .map_err(|e| db_error("Failed to begin transaction", e))?;

            let existing: Option<(i64,)> = sqlx::query_as(
                r#"
                SELECT id FROM fcm_tokens
                WHERE user_id = $1
                  AND (token = $2 OR ($3 IS NOT NULL AND device_id = $3))
                ORDER BY seq
                LIMIT 1
                "#,
            )
            .bind(&token.user_id)
            .bind(&token.token)
            .bind(&token.device_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| db_error("Failed to look up device token", e))?;

            let row: TokenRow = match existing {
                Some((id,)) => {
                    sqlx::query_as(
                        r#"
                        UPDATE fcm_tokens
                        SET token = $1,
                            device_id = COALESCE($2, device_id),
                            updated_at = $3,
                            seq = (SELECT COALESCE(MAX(seq), 0) + 1 FROM fcm_tokens)
                        WHERE id = $4
                        RETURNING user_id, token, device_id, created_at, updated_at
                        "#,
                    )
                    .bind(&token.token)
                    .bind(&token.device_id)
                    .bind(token.updated_at)
                    .bind(id)
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(|e| db_error("Failed to update device token", e))?
                }
                None => {
                    sqlx::query_as(
                        r#"
                        INSERT INTO fcm_tokens (user_id, token, device_id, seq, created_at, updated_at)
                        VALUES ($1, $2, $3, (SELECT COALESCE(MAX(seq), 0) + 1 FROM fcm_tokens), $4, $5)
                        RETURNING user_id, token, device_id, created_at, updated_at
                        "#,
                    )
                    .bind(&token.user_id)
                    .bind(&token.token)
                    .bind(&token.device_id)
                    .bind(token.created_at)
                    .bind(token.updated_at)
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(|e| db_error("Failed to insert device token", e))?
                }
            };

            tx.commit()
                .await
                .map_err(|e| db_error("Failed to commit device token", e))?;

            Ok(row.into())
        })
    }
}

/// Delivered notifications in the `notification_logs` table
#[derive(Debug, Clone)]
pub struct SqlNotificationLogRepository {
    pool: SqlitePool,
}

impl SqlNotificationLogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn init_schema(&self) -> Result<(), FirebaseError> {
        debug!("Initializing notification_logs schema");

        let query = r#"
            CREATE TABLE IF NOT EXISTS notification_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                baby_id TEXT,
                notification_type TEXT NOT NULL,
                title TEXT NOT NULL,
                body TEXT NOT NULL,
                fcm_response TEXT NOT NULL,
                sent_at DATETIME NOT NULL
            )
        "#;
        sqlx::query(query)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("Failed to create notification_logs", e))?;

        info!("notification_logs schema initialized successfully");
        Ok(())
    }
}

impl NotificationLogRepository for SqlNotificationLogRepository {
    fn append(&self, entry: NotificationLogEntry) -> BoxFuture<'_, (), FirebaseError> {
        Box::pin(async move {
            let query = r#"
                INSERT INTO notification_logs
                    (user_id, baby_id, notification_type, title, body, fcm_response, sent_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#;

            sqlx::query(query)
                .bind(&entry.user_id)
                .bind(&entry.baby_id)
                .bind(&entry.kind)
                .bind(&entry.title)
                .bind(&entry.body)
                .bind(entry.fcm_response.to_string())
                .bind(entry.sent_at)
                .execute(&self.pool)
                .await
                .map_err(|e| db_error("Failed to insert notification log", e))?;

            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    async fn memory_pool() -> SqlitePool {
        connect("sqlite::memory:").await.unwrap()
    }

    async fn token_repo() -> SqlDeviceTokenRepository {
        let repo = SqlDeviceTokenRepository::new(memory_pool().await);
        repo.init_schema().await.unwrap();
        repo
    }

    fn device(user_id: &str, token: &str, device_id: Option<&str>) -> DeviceToken {
        DeviceToken::new(user_id.into(), token.into(), device_id.map(str::to_string))
    }

    async fn count(pool: &SqlitePool, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_latest_token_is_last_registered() {
        let repo = token_repo().await;
        assert!(repo.latest_token("u1").await.unwrap().is_none());

        repo.upsert_token(device("u1", "t1", Some("phone"))).await.unwrap();
        repo.upsert_token(device("u1", "t2", Some("tablet"))).await.unwrap();
        repo.upsert_token(device("u2", "t3", None)).await.unwrap();

        assert_eq!(repo.latest_token("u1").await.unwrap().unwrap().token, "t2");
        assert_eq!(count(&repo.pool, "fcm_tokens").await, 3);
    }

    #[tokio::test]
    async fn test_refresh_keeps_device_and_creation_time() {
        let repo = token_repo().await;
        let first = repo.upsert_token(device("u1", "t1", Some("phone"))).await.unwrap();
        repo.upsert_token(device("u1", "t2", Some("tablet"))).await.unwrap();

        let refreshed = repo.upsert_token(device("u1", "t1", None)).await.unwrap();
        assert_eq!(refreshed.device_id.as_deref(), Some("phone"));
        assert_eq!(refreshed.created_at, first.created_at);
        assert_eq!(count(&repo.pool, "fcm_tokens").await, 2);
        assert_eq!(repo.latest_token("u1").await.unwrap().unwrap().token, "t1");
    }

    #[tokio::test]
    async fn test_new_token_for_same_device_replaces_old() {
        let repo = token_repo().await;
        repo.upsert_token(device("u1", "old", Some("phone"))).await.unwrap();
        repo.upsert_token(device("u1", "new", Some("phone"))).await.unwrap();

        assert_eq!(count(&repo.pool, "fcm_tokens").await, 1);
        assert_eq!(repo.latest_token("u1").await.unwrap().unwrap().token, "new");
    }

    #[tokio::test]
    async fn test_log_rows_are_appended() {
        let pool = memory_pool().await;
        let logs = SqlNotificationLogRepository::new(pool.clone());
        logs.init_schema().await.unwrap();

        for user in ["u1", "u2"] {
            logs.append(NotificationLogEntry {
                user_id: user.to_string(),
                baby_id: Some("b1".to_string()),
                kind: "test".to_string(),
                title: "Test".to_string(),
                body: "Body".to_string(),
                fcm_response: serde_json::json!({"name": "projects/p/messages/1"}),
                sent_at: Utc::now(),
            })
            .await
            .unwrap();
        }

        assert_eq!(count(&pool, "notification_logs").await, 2);
        let response: String =
            sqlx::query_scalar("SELECT fcm_response FROM notification_logs WHERE user_id = 'u2'")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(response, r#"{"name":"projects/p/messages/1"}"#);
    }

    #[tokio::test]
    async fn test_file_database_survives_reconnect() {
        let dir = std::env::temp_dir().join(format!("beacon-db-{}", std::process::id()));
        let url = format!("sqlite://{}/tokens.db", dir.display());

        let repo = SqlDeviceTokenRepository::new(connect(&url).await.unwrap());
        repo.init_schema().await.unwrap();
        repo.upsert_token(device("u1", "t1", None)).await.unwrap();
        repo.pool.close().await;

        let reopened = SqlDeviceTokenRepository::new(connect(&url).await.unwrap());
        reopened.init_schema().await.unwrap();
        assert_eq!(reopened.latest_token("u1").await.unwrap().unwrap().token, "t1");

        reopened.pool.close().await;
        let _ = std::fs::remove_dir_all(&dir);
    }
}
