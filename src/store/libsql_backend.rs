//! libSQL backend: async `Database` trait implementation.
//!
//! Supports local file and in-memory databases. All timestamps are written
//! as fixed-width RFC 3339 (microseconds, `Z`) so they sort lexically; dates
//! are written as `YYYY-MM-DD`.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info};
use uuid::Uuid;

use crate::answers::Answer;
use crate::checkins::model::CheckIn;
use crate::error::DatabaseError;
use crate::reminders::model::{Category, CompletionOutcome, Reminder, ReminderSource};
use crate::store::migrations;
use crate::store::traits::Database;

/// libSQL database backend.
///
/// One connection behind an async mutex. Every operation holds the lock for
/// its whole duration, so a transaction never interleaves with statements
/// from another request and `:memory:` databases keep working.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Mutex<Connection>,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn: Mutex::new(conn),
        };
        backend.run_migrations().await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn: Mutex::new(conn),
        };
        backend.run_migrations().await?;
        Ok(backend)
    }

    /// Lock the connection for one operation.
    async fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().await
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Canonical timestamp format.
fn ts(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn date_str(d: NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

fn parse_date(s: &str, column: &str) -> Result<NaiveDate, DatabaseError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| DatabaseError::Serialization(format!("{column} '{s}': {e}")))
}

fn parse_uuid(s: &str, column: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(s).map_err(|e| DatabaseError::Serialization(format!("{column} '{s}': {e}")))
}

fn parse_category(s: &str) -> Result<Category, DatabaseError> {
    s.parse::<Category>().map_err(DatabaseError::Serialization)
}

/// Optional text column, with empty strings read as absent.
fn opt_col(row: &libsql::Row, idx: i32) -> Option<String> {
    row.get::<String>(idx).ok().filter(|s| !s.is_empty())
}

fn req_col(row: &libsql::Row, idx: i32, name: &str) -> Result<String, DatabaseError> {
    row.get::<String>(idx)
        .map_err(|e| DatabaseError::Query(format!("{name}: {e}")))
}

/// Convert `Option<&str>` to libsql Value.
fn opt_text(s: Option<&str>) -> libsql::Value {
    match s {
        Some(s) => libsql::Value::Text(s.to_string()),
        None => libsql::Value::Null,
    }
}

// ── Row mapping ─────────────────────────────────────────────────────

const ANSWER_COLUMNS: &str = "user_id, category, key, value, created_at, updated_at";

const REMINDER_COLUMNS: &str = "id, user_id, category, title, description, due_date, recurring, \
     recurrence_label, recurrence_interval, completed, completed_at, snoozed_until, source, \
     parent_id, created_at";

const CHECKIN_COLUMNS: &str =
    "id, user_id, category, key, prompt, due_date, dismissed, answered, created_at";

fn row_to_answer(row: &libsql::Row) -> Result<Answer, DatabaseError> {
    Ok(Answer {
        user_id: req_col(row, 0, "answer.user_id")?,
        category: parse_category(&req_col(row, 1, "answer.category")?)?,
        key: req_col(row, 2, "answer.key")?,
        value: req_col(row, 3, "answer.value")?,
        created_at: parse_datetime(&req_col(row, 4, "answer.created_at")?),
        updated_at: parse_datetime(&req_col(row, 5, "answer.updated_at")?),
    })
}

fn row_to_reminder(row: &libsql::Row) -> Result<Reminder, DatabaseError> {
    let source_str = req_col(row, 12, "reminder.source")?;
    let source = source_str
        .parse::<ReminderSource>()
        .map_err(DatabaseError::Serialization)?;

    Ok(Reminder {
        id: parse_uuid(&req_col(row, 0, "reminder.id")?, "reminder.id")?,
        user_id: req_col(row, 1, "reminder.user_id")?,
        category: parse_category(&req_col(row, 2, "reminder.category")?)?,
        title: req_col(row, 3, "reminder.title")?,
        description: opt_col(row, 4),
        due_date: parse_date(&req_col(row, 5, "reminder.due_date")?, "reminder.due_date")?,
        recurring: row.get::<i64>(6).unwrap_or(0) != 0,
        recurrence_label: opt_col(row, 7),
        recurrence_interval: opt_col(row, 8),
        completed: row.get::<i64>(9).unwrap_or(0) != 0,
        completed_at: opt_col(row, 10).map(|s| parse_datetime(&s)),
        snoozed_until: opt_col(row, 11)
            .map(|s| parse_date(&s, "reminder.snoozed_until"))
            .transpose()?,
        source,
        parent_id: opt_col(row, 13)
            .map(|s| parse_uuid(&s, "reminder.parent_id"))
            .transpose()?,
        created_at: parse_datetime(&req_col(row, 14, "reminder.created_at")?),
    })
}

fn row_to_checkin(row: &libsql::Row) -> Result<CheckIn, DatabaseError> {
    Ok(CheckIn {
        id: parse_uuid(&req_col(row, 0, "checkin.id")?, "checkin.id")?,
        user_id: req_col(row, 1, "checkin.user_id")?,
        category: parse_category(&req_col(row, 2, "checkin.category")?)?,
        key: req_col(row, 3, "checkin.key")?,
        prompt: req_col(row, 4, "checkin.prompt")?,
        due_date: parse_date(&req_col(row, 5, "checkin.due_date")?, "checkin.due_date")?,
        dismissed: row.get::<i64>(6).unwrap_or(0) != 0,
        answered: row.get::<i64>(7).unwrap_or(0) != 0,
        created_at: parse_datetime(&req_col(row, 8, "checkin.created_at")?),
    })
}

async fn collect_rows<T>(
    mut rows: libsql::Rows,
    op: &str,
    map: fn(&libsql::Row) -> Result<T, DatabaseError>,
) -> Result<Vec<T>, DatabaseError> {
    let mut out = Vec::new();
    while let Some(row) = rows
        .next()
        .await
        .map_err(|e| DatabaseError::Query(format!("{op} row: {e}")))?
    {
        out.push(map(&row)?);
    }
    Ok(out)
}

/// Insert one reminder on `conn` (a plain connection or a transaction).
async fn insert_reminder(conn: &Connection, r: &Reminder) -> Result<(), DatabaseError> {
    conn.execute(
        &format!(
            "INSERT INTO reminders ({REMINDER_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)"
        ),
        params![
            r.id.to_string(),
            r.user_id.as_str(),
            r.category.as_str(),
            r.title.as_str(),
            opt_text(r.description.as_deref()),
            date_str(r.due_date),
            r.recurring as i64,
            opt_text(r.recurrence_label.as_deref()),
            opt_text(r.recurrence_interval.as_deref()),
            r.completed as i64,
            opt_text(r.completed_at.map(ts).as_deref()),
            opt_text(r.snoozed_until.map(date_str).as_deref()),
            r.source.as_str(),
            opt_text(r.parent_id.map(|id| id.to_string()).as_deref()),
            ts(r.created_at),
        ],
    )
    .await
    .map_err(|e| DatabaseError::Query(format!("insert_reminder: {e}")))?;
    Ok(())
}

async fn select_reminder(
    conn: &Connection,
    user_id: &str,
    id: Uuid,
) -> Result<Option<Reminder>, DatabaseError> {
    let mut rows = conn
        .query(
            &format!("SELECT {REMINDER_COLUMNS} FROM reminders WHERE id = ?1 AND user_id = ?2"),
            params![id.to_string(), user_id],
        )
        .await
        .map_err(|e| DatabaseError::Query(format!("get_reminder: {e}")))?;

    match rows.next().await {
        Ok(Some(row)) => Ok(Some(row_to_reminder(&row)?)),
        Ok(None) => Ok(None),
        Err(e) => Err(DatabaseError::Query(format!("get_reminder row: {e}"))),
    }
}

async fn upsert_answer_on(
    conn: &Connection,
    user_id: &str,
    category: Category,
    key: &str,
    value: &str,
    now: DateTime<Utc>,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO answers (user_id, category, key, value, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)
         ON CONFLICT (user_id, category, key) DO UPDATE SET value = ?4, updated_at = ?5",
        params![user_id, category.as_str(), key, value, ts(now)],
    )
    .await
    .map_err(|e| DatabaseError::Query(format!("upsert_answer: {e}")))?;
    Ok(())
}

// ── Trait implementation ────────────────────────────────────────────

#[async_trait]
impl Database for LibSqlBackend {
    async fn run_migrations(&self) -> Result<(), DatabaseError> {
        let conn = self.conn().await;
        migrations::run_migrations(&conn).await
    }

    // ── Answers ─────────────────────────────────────────────────────

    async fn upsert_answer(
        &self,
        user_id: &str,
        category: Category,
        key: &str,
        value: &str,
        now: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        let conn = self.conn().await;
        upsert_answer_on(&conn, user_id, category, key, value, now).await?;
        debug!(user_id, category = %category, key, "Answer upserted");
        Ok(())
    }

    async fn list_answers(&self, user_id: &str) -> Result<Vec<Answer>, DatabaseError> {
        let conn = self.conn().await;
        let rows = conn
            .query(
                &format!(
                    "SELECT {ANSWER_COLUMNS} FROM answers WHERE user_id = ?1
                     ORDER BY created_at ASC, rowid ASC"
                ),
                params![user_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list_answers: {e}")))?;
        collect_rows(rows, "list_answers", row_to_answer).await
    }

    // ── Reminders ───────────────────────────────────────────────────

    async fn create_reminder(&self, reminder: &Reminder) -> Result<(), DatabaseError> {
        let conn = self.conn().await;
        insert_reminder(&conn, reminder).await?;
        debug!(id = %reminder.id, source = reminder.source.as_str(), "Reminder created");
        Ok(())
    }

    async fn get_reminder(
        &self,
        user_id: &str,
        id: Uuid,
    ) -> Result<Option<Reminder>, DatabaseError> {
        let conn = self.conn().await;
        select_reminder(&conn, user_id, id).await
    }

    async fn list_reminders(&self, user_id: &str) -> Result<Vec<Reminder>, DatabaseError> {
        let conn = self.conn().await;
        let rows = conn
            .query(
                &format!(
                    "SELECT {REMINDER_COLUMNS} FROM reminders WHERE user_id = ?1
                     ORDER BY due_date ASC, created_at ASC, rowid ASC"
                ),
                params![user_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list_reminders: {e}")))?;
        collect_rows(rows, "list_reminders", row_to_reminder).await
    }

    async fn complete_reminder(
        &self,
        user_id: &str,
        id: Uuid,
        at: DateTime<Utc>,
        successor: &(dyn for<'r> Fn(&'r Reminder) -> Option<Reminder> + Send + Sync),
    ) -> Result<Option<CompletionOutcome>, DatabaseError> {
        let conn = self.conn().await;
        let tx = conn
            .transaction()
            .await
            .map_err(|e| DatabaseError::Query(format!("complete_reminder begin: {e}")))?;

        let result = async {
            let count = tx
                .execute(
                    "UPDATE reminders SET completed = 1, completed_at = ?3
                     WHERE id = ?1 AND user_id = ?2 AND completed = 0",
                    params![id.to_string(), user_id, ts(at)],
                )
                .await
                .map_err(|e| DatabaseError::Query(format!("complete_reminder update: {e}")))?;
            let transitioned = count > 0;

            let Some(reminder) = select_reminder(&tx, user_id, id).await? else {
                return Ok(None);
            };
            let next = if transitioned { successor(&reminder) } else { None };
            if let Some(next) = &next {
                insert_reminder(&tx, next).await?;
            }
            Ok::<_, DatabaseError>(Some(CompletionOutcome {
                reminder,
                transitioned,
                successor: next,
            }))
        }
        .await;

        match result {
            Ok(outcome) => {
                tx.commit()
                    .await
                    .map_err(|e| DatabaseError::Query(format!("complete_reminder commit: {e}")))?;
                Ok(outcome)
            }
            Err(e) => {
                let _ = tx.rollback().await;
                Err(e)
            }
        }
    }

    async fn snooze_reminder(
        &self,
        user_id: &str,
        id: Uuid,
        until: NaiveDate,
    ) -> Result<bool, DatabaseError> {
        let conn = self.conn().await;
        let count = conn
            .execute(
                "UPDATE reminders SET snoozed_until = ?3 WHERE id = ?1 AND user_id = ?2",
                params![id.to_string(), user_id, date_str(until)],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("snooze_reminder: {e}")))?;
        Ok(count > 0)
    }

    async fn delete_reminder(&self, user_id: &str, id: Uuid) -> Result<bool, DatabaseError> {
        let conn = self.conn().await;
        let count = conn
            .execute(
                "DELETE FROM reminders WHERE id = ?1 AND user_id = ?2",
                params![id.to_string(), user_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("delete_reminder: {e}")))?;
        Ok(count > 0)
    }

    async fn replace_ai_reminders(
        &self,
        user_id: &str,
        replacements: &[Reminder],
    ) -> Result<usize, DatabaseError> {
        let conn = self.conn().await;
        let tx = conn
            .transaction()
            .await
            .map_err(|e| DatabaseError::Query(format!("replace_ai_reminders begin: {e}")))?;

        let result = async {
            let deleted = tx
                .execute(
                    "DELETE FROM reminders WHERE user_id = ?1 AND source = 'ai' AND completed = 0",
                    params![user_id],
                )
                .await
                .map_err(|e| DatabaseError::Query(format!("replace_ai_reminders delete: {e}")))?;
            for reminder in replacements {
                insert_reminder(&tx, reminder).await?;
            }
            Ok::<usize, DatabaseError>(deleted as usize)
        }
        .await;

        match result {
            Ok(deleted) => {
                tx.commit().await.map_err(|e| {
                    DatabaseError::Query(format!("replace_ai_reminders commit: {e}"))
                })?;
                debug!(user_id, deleted, inserted = replacements.len(), "AI reminders replaced");
                Ok(deleted)
            }
            Err(e) => {
                let _ = tx.rollback().await;
                Err(e)
            }
        }
    }

    // ── Check-ins ───────────────────────────────────────────────────

    async fn create_checkin(&self, checkin: &CheckIn) -> Result<bool, DatabaseError> {
        let conn = self.conn().await;
        let count = conn
            .execute(
                &format!(
                    "INSERT OR IGNORE INTO checkins ({CHECKIN_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
                ),
                params![
                    checkin.id.to_string(),
                    checkin.user_id.as_str(),
                    checkin.category.as_str(),
                    checkin.key.as_str(),
                    checkin.prompt.as_str(),
                    date_str(checkin.due_date),
                    checkin.dismissed as i64,
                    checkin.answered as i64,
                    ts(checkin.created_at),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("create_checkin: {e}")))?;
        Ok(count > 0)
    }

    async fn get_checkin(&self, user_id: &str, id: Uuid) -> Result<Option<CheckIn>, DatabaseError> {
        let conn = self.conn().await;
        let mut rows = conn
            .query(
                &format!("SELECT {CHECKIN_COLUMNS} FROM checkins WHERE id = ?1 AND user_id = ?2"),
                params![id.to_string(), user_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_checkin: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_checkin(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_checkin row: {e}"))),
        }
    }

    async fn list_open_checkins(&self, user_id: &str) -> Result<Vec<CheckIn>, DatabaseError> {
        let conn = self.conn().await;
        let rows = conn
            .query(
                &format!(
                    "SELECT {CHECKIN_COLUMNS} FROM checkins
                     WHERE user_id = ?1 AND dismissed = 0 AND answered = 0
                     ORDER BY created_at ASC, rowid ASC"
                ),
                params![user_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list_open_checkins: {e}")))?;
        collect_rows(rows, "list_open_checkins", row_to_checkin).await
    }

    async fn answer_checkin(
        &self,
        user_id: &str,
        id: Uuid,
        value: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, DatabaseError> {
        let conn = self.conn().await;
        let tx = conn
            .transaction()
            .await
            .map_err(|e| DatabaseError::Query(format!("answer_checkin begin: {e}")))?;

        let result = async {
            let mut rows = tx
                .query(
                    "SELECT category, key FROM checkins
                     WHERE id = ?1 AND user_id = ?2 AND dismissed = 0 AND answered = 0",
                    params![id.to_string(), user_id],
                )
                .await
                .map_err(|e| DatabaseError::Query(format!("answer_checkin lookup: {e}")))?;
            let Some(row) = rows
                .next()
                .await
                .map_err(|e| DatabaseError::Query(format!("answer_checkin row: {e}")))?
            else {
                return Ok(false);
            };
            let category = parse_category(&req_col(&row, 0, "checkin.category")?)?;
            let key = req_col(&row, 1, "checkin.key")?;
            drop(rows);

            upsert_answer_on(&tx, user_id, category, &key, value, now).await?;
            tx.execute(
                "UPDATE checkins SET answered = 1 WHERE id = ?1 AND user_id = ?2",
                params![id.to_string(), user_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("answer_checkin update: {e}")))?;
            Ok::<bool, DatabaseError>(true)
        }
        .await;

        match result {
            Ok(answered) => {
                tx.commit()
                    .await
                    .map_err(|e| DatabaseError::Query(format!("answer_checkin commit: {e}")))?;
                Ok(answered)
            }
            Err(e) => {
                let _ = tx.rollback().await;
                Err(e)
            }
        }
    }

    async fn dismiss_checkin(&self, user_id: &str, id: Uuid) -> Result<bool, DatabaseError> {
        let conn = self.conn().await;
        let count = conn
            .execute(
                "UPDATE checkins SET dismissed = 1
                 WHERE id = ?1 AND user_id = ?2 AND dismissed = 0 AND answered = 0",
                params![id.to_string(), user_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("dismiss_checkin: {e}")))?;
        Ok(count > 0)
    }

    // ── Settings ────────────────────────────────────────────────────

    async fn get_setting(
        &self,
        user_id: &str,
        key: &str,
    ) -> Result<Option<serde_json::Value>, DatabaseError> {
        let conn = self.conn().await;
        let mut rows = conn
            .query(
                "SELECT value FROM settings WHERE user_id = ?1 AND key = ?2",
                params![user_id, key],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_setting: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let value_str: String = row.get(0).unwrap_or_else(|_| "null".to_string());
                let value: serde_json::Value =
                    serde_json::from_str(&value_str).unwrap_or(serde_json::Value::Null);
                Ok(Some(value))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_setting: {e}"))),
        }
    }

    async fn set_setting(
        &self,
        user_id: &str,
        key: &str,
        value: &serde_json::Value,
    ) -> Result<(), DatabaseError> {
        let value_str = serde_json::to_string(value)
            .map_err(|e| DatabaseError::Serialization(e.to_string()))?;

        let conn = self.conn().await;
        conn.execute(
            "INSERT INTO settings (user_id, key, value, updated_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (user_id, key) DO UPDATE SET value = ?3, updated_at = ?4",
            params![user_id, key, value_str, ts(Utc::now())],
        )
        .await
        .map_err(|e| DatabaseError::Query(format!("set_setting: {e}")))?;

        Ok(())
    }

    async fn delete_setting(&self, user_id: &str, key: &str) -> Result<bool, DatabaseError> {
        let conn = self.conn().await;
        let count = conn
            .execute(
                "DELETE FROM settings WHERE user_id = ?1 AND key = ?2",
                params![user_id, key],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("delete_setting: {e}")))?;
        Ok(count > 0)
    }

    // ── Account ─────────────────────────────────────────────────────

    async fn reset_user(&self, user_id: &str) -> Result<(), DatabaseError> {
        let conn = self.conn().await;
        for table in ["reminders", "answers", "checkins"] {
            conn.execute(
                &format!("DELETE FROM {table} WHERE user_id = ?1"),
                params![user_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("reset_user {table}: {e}")))?;
        }
        info!(user_id, "User data deleted");
        Ok(())
    }
}
