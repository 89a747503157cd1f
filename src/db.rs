use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use diesel::connection::Connection;
use diesel::sqlite::SqliteConnection;
use diesel::ConnectionError;
use diesel_async::pooled_connection::bb8::{Pool, PooledConnection};
use diesel_async::pooled_connection::{AsyncDieselConnectionManager, ManagerConfig};
use diesel_async::sync_connection_wrapper::SyncConnectionWrapper;
use diesel_async::{AsyncConnection, RunQueryDsl};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use futures::future::BoxFuture;
use futures::FutureExt;
use time::OffsetDateTime;

use crate::config::DatabaseConfig;
use crate::error::{ChronicleError, Result};

const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

pub type SqliteAsyncConn = SyncConnectionWrapper<SqliteConnection>;
pub type SqlitePool = Pool<SqliteAsyncConn>;
pub type SqlitePooledConn<'a> = PooledConnection<'a, SqliteAsyncConn>;

/// Runs pending migrations and builds the shared connection pool.
pub async fn connect(config: &DatabaseConfig) -> Result<SqlitePool> {
    let sqlite_path = config.sqlite_path.as_str();
    ensure_parent_dir(sqlite_path)?;
    run_migrations(sqlite_path).await?;

    let busy_timeout_ms = config.busy_timeout_ms;
    let mut manager_config = ManagerConfig::<SqliteAsyncConn>::default();
    manager_config.custom_setup =
        Box::new(move |url| establish_with_pragmas(url, busy_timeout_ms));
    let manager =
        AsyncDieselConnectionManager::<SqliteAsyncConn>::new_with_config(sqlite_path, manager_config);
    Pool::builder()
        .max_size(config.max_connections.max(1))
        .build(manager)
        .await
        .map_err(|e| ChronicleError::Store(e.to_string()))
}

// SQLite leaves foreign keys off unless every connection opts in.
fn establish_with_pragmas(
    url: &str,
    busy_timeout_ms: u64,
) -> BoxFuture<'_, diesel::ConnectionResult<SqliteAsyncConn>> {
    async move {
        let mut conn = SqliteAsyncConn::establish(url).await?;
        diesel::sql_query("PRAGMA foreign_keys = ON")
            .execute(&mut conn)
            .await
            .map_err(|e| ConnectionError::BadConnection(e.to_string()))?;
        diesel::sql_query(format!("PRAGMA busy_timeout = {busy_timeout_ms}"))
            .execute(&mut conn)
            .await
            .map_err(|e| ConnectionError::BadConnection(e.to_string()))?;
        Ok(conn)
    }
    .boxed()
}

pub fn ensure_parent_dir(path: &str) -> Result<()> {
    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ChronicleError::Runtime(e.to_string()))?;
    }
    Ok(())
}

async fn run_migrations(database_url: &str) -> Result<()> {
    let database_url = database_url.to_string();
    tokio::task::spawn_blocking(move || {
        let mut conn = SqliteConnection::establish(&database_url)
            .map_err(|e| ChronicleError::Store(e.to_string()))?;
        conn.run_pending_migrations(MIGRATIONS)
            .map_err(|e| ChronicleError::Store(e.to_string()))?;
        Ok::<_, ChronicleError>(())
    })
    .await
    .map_err(|e| ChronicleError::Runtime(e.to_string()))??;
    Ok(())
}

pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

pub fn to_millis(ts: OffsetDateTime) -> i64 {
    (ts.unix_timestamp_nanos() / 1_000_000) as i64
}

pub fn from_millis(ms: i64) -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp_nanos(ms as i128 * 1_000_000)
        .unwrap_or(OffsetDateTime::UNIX_EPOCH)
}

pub fn encode_list(values: &[String]) -> Result<String> {
    Ok(serde_json::to_string(values)?)
}

/// Stored lists that fail to parse read back as empty rather than null.
pub fn decode_list(raw: &str) -> Vec<String> {
    serde_json::from_str(raw).unwrap_or_default()
}
