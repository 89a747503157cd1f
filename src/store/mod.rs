//! SQLite-backed record store.
//!
//! `CareStore` owns the connection pool for the process lifetime. It is
//! opened explicitly at startup and closed on shutdown; tests open their own
//! store over a temporary file.

use diesel::expression::SqlLiteral;
use diesel::prelude::*;
use diesel::sql_types::BigInt;
use diesel_async::RunQueryDsl;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::db::{self, SqlitePool, SqlitePooledConn};
use crate::error::{ChronicleError, Result};

mod conversations;
mod episodes;
mod members;
mod metrics;
mod records;
pub mod schema;
mod team;

pub use records::OverviewSnapshot;

#[derive(QueryableByName)]
struct CountRow {
    #[diesel(sql_type = BigInt)]
    count: i64,
}

/// Result of the connectivity probe behind `/api/test-db`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStatus {
    pub member_count: i64,
    pub total_tables: i64,
}

pub struct CareStore {
    pool: SqlitePool,
}

impl CareStore {
    pub async fn open(config: &DatabaseConfig) -> Result<Self> {
        let pool = db::connect(config).await?;
        info!(path = %config.sqlite_path, "record store opened");
        Ok(Self { pool })
    }

    pub async fn open_path(sqlite_path: impl AsRef<str>) -> Result<Self> {
        let config = DatabaseConfig {
            sqlite_path: sqlite_path.as_ref().to_string(),
            ..DatabaseConfig::default()
        };
        Self::open(&config).await
    }

    /// Drops the pool; pooled connections close once released.
    pub fn close(self) {
        let state = self.pool.state();
        debug!(
            connections = state.connections,
            idle = state.idle_connections,
            "closing record store"
        );
        drop(self.pool);
        info!("record store closed");
    }

    pub async fn status(&self) -> Result<StoreStatus> {
        let mut conn = self.conn().await?;
        let member_count: i64 = schema::members::table
            .count()
            .get_result(&mut conn)
            .await?;
        let tables: CountRow = diesel::sql_query(
            "SELECT count(*) AS count FROM sqlite_master
             WHERE type = 'table'
               AND name NOT LIKE 'sqlite_%'
               AND name != '__diesel_schema_migrations'",
        )
        .get_result(&mut conn)
        .await?;
        Ok(StoreStatus {
            member_count,
            total_tables: tables.count,
        })
    }

    async fn conn(&self) -> Result<SqlitePooledConn<'_>> {
        self.pool
            .get()
            .await
            .map_err(|e| ChronicleError::Store(e.to_string()))
    }
}

fn new_id(explicit: Option<String>) -> String {
    explicit
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

// SQLite's implicit rowid grows with every insert. Ordering by it second
// keeps equal timestamps in insertion order.
fn inserted(table: &str) -> SqlLiteral<BigInt> {
    diesel::dsl::sql::<BigInt>(&format!("{table}.rowid"))
}

fn not_found(entity: &str) -> ChronicleError {
    ChronicleError::NotFound(format!("{entity} not found"))
}
