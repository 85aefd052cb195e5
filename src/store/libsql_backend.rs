//! libSQL backend — async `UserStore` implementation.
//!
//! Stores a single connection reused for all operations; `libsql::Connection`
//! is `Send + Sync` and safe for concurrent async use. Timestamps are written
//! as RFC 3339 text.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{params, Connection, Database};
use tracing::{debug, info};

use crate::engine::Stage;
use crate::error::DatabaseError;
use crate::store::traits::{InterviewState, InterviewType, UserRecord, UserStore};

/// A single migration step.
struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

/// All migrations in order. Add new versions to the end.
static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial_schema",
    sql: r#"
        CREATE TABLE IF NOT EXISTS users (
            identity TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            stage TEXT NOT NULL DEFAULT 'initial',
            last_interaction TEXT NOT NULL,
            last_advice TEXT,
            interview_type TEXT,
            interview_role TEXT,
            last_question TEXT,
            last_response TEXT,
            last_follow_up TEXT,
            last_follow_up_response TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_users_stage ON users(stage);
        CREATE INDEX IF NOT EXISTS idx_users_last_interaction ON users(last_interaction);
    "#,
}];

const USER_COLUMNS: &str = "identity, name, stage, last_interaction, last_advice, \
     interview_type, interview_role, last_question, last_response, \
     last_follow_up, last_follow_up_response";

/// libSQL database backend for user records.
pub struct LibSqlStore {
    #[allow(dead_code)]
    db: Arc<Database>,
    conn: Connection,
}

impl LibSqlStore {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Connection(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Connection(format!("Failed to open database: {e}")))?;
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Connection(format!("Failed to create connection: {e}")))?;

        let store = Self {
            db: Arc::new(db),
            conn,
        };
        store.run_migrations().await?;
        info!(path = %path.display(), "Database opened");
        Ok(store)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Connection(format!("Failed to create in-memory database: {e}"))
            })?;
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Connection(format!("Failed to create connection: {e}")))?;

        let store = Self {
            db: Arc::new(db),
            conn,
        };
        store.run_migrations().await?;
        Ok(store)
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }

    async fn run_migrations(&self) -> Result<(), DatabaseError> {
        let conn = self.conn();
        conn.execute(
            "CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                applied_at TEXT NOT NULL
            )",
            (),
        )
        .await
        .map_err(|e| DatabaseError::Migration(format!("create _migrations: {e}")))?;

        let current: i64 = {
            let mut rows = conn
                .query("SELECT COALESCE(MAX(version), 0) FROM _migrations", ())
                .await
                .map_err(|e| DatabaseError::Migration(format!("read version: {e}")))?;
            match rows.next().await {
                Ok(Some(row)) => row.get(0).unwrap_or(0),
                _ => 0,
            }
        };

        for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
            conn.execute_batch(migration.sql)
                .await
                .map_err(|e| DatabaseError::Migration(format!("{}: {e}", migration.name)))?;
            conn.execute(
                "INSERT INTO _migrations (version, name, applied_at) VALUES (?1, ?2, ?3)",
                params![migration.version, migration.name, Utc::now().to_rfc3339()],
            )
            .await
            .map_err(|e| DatabaseError::Migration(format!("record {}: {e}", migration.name)))?;
            info!(version = migration.version, name = migration.name, "Applied migration");
        }
        Ok(())
    }
}

// ── Row mapping helpers ─────────────────────────────────────────────

/// Parse an RFC 3339 timestamp, falling back to the epoch minimum so a
/// mangled row sorts as maximally stale rather than erroring.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Convert Option<&str> to a libsql Value (Null when None).
fn opt_text(s: Option<&str>) -> libsql::Value {
    match s {
        Some(s) => libsql::Value::Text(s.to_string()),
        None => libsql::Value::Null,
    }
}

/// Map a libsql row to a UserRecord. Column order matches `USER_COLUMNS`.
///
/// An unrecognized stage string heals to `Onboarded` here, at the load
/// boundary, so the engine only ever sees enumerated stages.
fn row_to_record(row: &libsql::Row) -> Result<UserRecord, libsql::Error> {
    let identity: String = row.get(0)?;
    let name: String = row.get(1)?;
    let stage_str: String = row.get(2)?;
    let last_interaction_str: String = row.get(3)?;
    // NULL columns fail the typed get; treat that as absent.
    let last_advice: Option<String> = row.get::<String>(4).ok();
    let interview_type_str: Option<String> = row.get::<String>(5).ok();
    let role: Option<String> = row.get::<String>(6).ok();
    let last_question: Option<String> = row.get::<String>(7).ok();
    let last_response: Option<String> = row.get::<String>(8).ok();
    let last_follow_up: Option<String> = row.get::<String>(9).ok();
    let last_follow_up_response: Option<String> = row.get::<String>(10).ok();

    Ok(UserRecord {
        identity,
        name,
        stage: Stage::parse_lossy(&stage_str),
        last_interaction: parse_datetime(&last_interaction_str),
        last_advice,
        interview: InterviewState {
            interview_type: interview_type_str.as_deref().and_then(InterviewType::parse),
            role,
            last_question,
            last_response,
            last_follow_up,
            last_follow_up_response,
        },
    })
}

#[async_trait]
impl UserStore for LibSqlStore {
    async fn load(&self, identity: &str) -> Result<Option<UserRecord>, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE identity = ?1"),
                params![identity],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("load: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let record = row_to_record(&row)
                    .map_err(|e| DatabaseError::Query(format!("row parse: {e}")))?;
                Ok(Some(record))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("load: {e}"))),
        }
    }

    async fn create(&self, identity: &str) -> Result<UserRecord, DatabaseError> {
        let record = UserRecord::new(identity);
        let now = Utc::now().to_rfc3339();
        let conn = self.conn();
        conn.execute(
            "INSERT INTO users (identity, name, stage, last_interaction, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![
                record.identity.clone(),
                record.name.clone(),
                record.stage.as_str(),
                record.last_interaction.to_rfc3339(),
                now,
            ],
        )
        .await
        .map_err(|e| DatabaseError::Query(format!("create: {e}")))?;

        debug!(identity, "User record created");
        Ok(record)
    }

    async fn save(&self, record: &UserRecord) -> Result<(), DatabaseError> {
        let conn = self.conn();
        let affected = conn
            .execute(
                "UPDATE users SET name = ?2, stage = ?3, last_interaction = ?4,
                    last_advice = ?5, interview_type = ?6, interview_role = ?7,
                    last_question = ?8, last_response = ?9, last_follow_up = ?10,
                    last_follow_up_response = ?11, updated_at = ?12
                 WHERE identity = ?1",
                params![
                    record.identity.clone(),
                    record.name.clone(),
                    record.stage.as_str(),
                    record.last_interaction.to_rfc3339(),
                    opt_text(record.last_advice.as_deref()),
                    opt_text(record.interview.interview_type.map(|t| t.as_str())),
                    opt_text(record.interview.role.as_deref()),
                    opt_text(record.interview.last_question.as_deref()),
                    opt_text(record.interview.last_response.as_deref()),
                    opt_text(record.interview.last_follow_up.as_deref()),
                    opt_text(record.interview.last_follow_up_response.as_deref()),
                    Utc::now().to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("save: {e}")))?;

        if affected == 0 {
            return Err(DatabaseError::NotFound {
                identity: record.identity.clone(),
            });
        }
        Ok(())
    }

    async fn list_idle(&self, cutoff: DateTime<Utc>) -> Result<Vec<UserRecord>, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {USER_COLUMNS} FROM users
                     WHERE last_interaction < ?1 AND stage NOT IN ('initial', 'onboarded')"
                ),
                params![cutoff.to_rfc3339()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list_idle: {e}")))?;

        let mut records = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            match row_to_record(&row) {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!("Skipping user row: {e}");
                }
            }
        }
        Ok(records)
    }
}
