use crate::errors::StoreError;
use crate::models::{FeedbackEntry, Identity, MoodEntry, Owned};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row};
use std::{path::Path, sync::Mutex};
use tracing::info;

pub type StoreResult<T> = Result<T, StoreError>;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS users (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        username    TEXT NOT NULL UNIQUE,
        password    TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS moods (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        emotion     TEXT NOT NULL,
        intensity   INTEGER NOT NULL,
        note        TEXT NOT NULL,
        timestamp   TEXT NOT NULL,
        user_id     INTEGER NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_moods_user
        ON moods(user_id, timestamp);

    CREATE TABLE IF NOT EXISTS feedback (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        content     TEXT NOT NULL,
        timestamp   TEXT NOT NULL,
        user_id     INTEGER NOT NULL
    );
";

/// SQLite-backed credential store, mood log and feedback log.
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    pub fn open(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        let store = Self::with_schema(conn)?;
        info!("database opened at {}", path.display());
        Ok(store)
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Self::with_schema(Connection::open_in_memory()?)
    }

    fn with_schema(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn with_conn<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&Connection) -> StoreResult<T>,
    {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        f(&conn)
    }

    // -- Users --

    pub fn register(&self, username: &str, password: &str) -> StoreResult<Identity> {
        self.with_conn(|conn| {
            match conn.execute(
                "INSERT INTO users (username, password) VALUES (?1, ?2)",
                (username, password),
            ) {
                Ok(_) => Ok(Identity {
                    id: conn.last_insert_rowid(),
                    username: username.to_string(),
                }),
                Err(rusqlite::Error::SqliteFailure(err, _))
                    if err.code == ErrorCode::ConstraintViolation =>
                {
                    Err(StoreError::DuplicateUsername)
                }
                Err(err) => Err(err.into()),
            }
        })
    }

    /// Plaintext comparison; no hashing is performed.
    pub fn authenticate(&self, username: &str, password: &str) -> StoreResult<Identity> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, username FROM users WHERE username = ?1 AND password = ?2",
                (username, password),
                identity_from_row,
            )
            .optional()?
            .ok_or(StoreError::InvalidCredentials)
        })
    }

    pub fn identity(&self, user_id: i64) -> StoreResult<Option<Identity>> {
        self.with_conn(|conn| {
            let identity = conn
                .query_row(
                    "SELECT id, username FROM users WHERE id = ?1",
                    [user_id],
                    identity_from_row,
                )
                .optional()?;
            Ok(identity)
        })
    }

    #[cfg(test)]
    fn user_count(&self) -> StoreResult<i64> {
        self.with_conn(|conn| {
            Ok(conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?)
        })
    }

    // -- Moods --

    pub fn append_mood(
        &self,
        user_id: i64,
        emotion: &str,
        intensity: i64,
        note: &str,
    ) -> StoreResult<MoodEntry> {
        self.append_mood_at(user_id, emotion, intensity, note, Utc::now())
    }

    fn append_mood_at(
        &self,
        user_id: i64,
        emotion: &str,
        intensity: i64,
        note: &str,
        timestamp: DateTime<Utc>,
    ) -> StoreResult<MoodEntry> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO moods (emotion, intensity, note, timestamp, user_id) VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![emotion, intensity, note, timestamp, user_id],
            )?;
            Ok(MoodEntry {
                id: conn.last_insert_rowid(),
                emotion: emotion.to_string(),
                intensity,
                note: note.to_string(),
                timestamp,
                user_id,
            })
        })
    }

    /// All of a user's moods, newest first.
    pub fn moods_for_user(&self, user_id: i64) -> StoreResult<Vec<MoodEntry>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, emotion, intensity, note, timestamp, user_id
                 FROM moods WHERE user_id = ?1
                 ORDER BY timestamp DESC, id DESC",
            )?;
            let rows = stmt
                .query_map([user_id], mood_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn all_moods(&self) -> StoreResult<Vec<Owned<MoodEntry>>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT m.id, m.emotion, m.intensity, m.note, m.timestamp, m.user_id, u.id, u.username
                 FROM moods m LEFT JOIN users u ON u.id = m.user_id
                 ORDER BY m.timestamp DESC, m.id DESC",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(Owned {
                        record: mood_from_row(row)?,
                        owner: owner_from_row(row, 6)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Feedback --

    pub fn append_feedback(&self, user_id: i64, content: &str) -> StoreResult<FeedbackEntry> {
        self.append_feedback_at(user_id, content, Utc::now())
    }

    fn append_feedback_at(
        &self,
        user_id: i64,
        content: &str,
        timestamp: DateTime<Utc>,
    ) -> StoreResult<FeedbackEntry> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO feedback (content, timestamp, user_id) VALUES (?1, ?2, ?3)",
                rusqlite::params![content, timestamp, user_id],
            )?;
            Ok(FeedbackEntry {
                id: conn.last_insert_rowid(),
                content: content.to_string(),
                timestamp,
                user_id,
            })
        })
    }

    pub fn all_feedback(&self) -> StoreResult<Vec<Owned<FeedbackEntry>>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT f.id, f.content, f.timestamp, f.user_id, u.id, u.username
                 FROM feedback f LEFT JOIN users u ON u.id = f.user_id
                 ORDER BY f.timestamp DESC, f.id DESC",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(Owned {
                        record: FeedbackEntry {
                            id: row.get(0)?,
                            content: row.get(1)?,
                            timestamp: row.get(2)?,
                            user_id: row.get(3)?,
                        },
                        owner: owner_from_row(row, 4)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn identity_from_row(row: &Row<'_>) -> rusqlite::Result<Identity> {
    Ok(Identity {
        id: row.get(0)?,
        username: row.get(1)?,
    })
}

fn mood_from_row(row: &Row<'_>) -> rusqlite::Result<MoodEntry> {
    Ok(MoodEntry {
        id: row.get(0)?,
        emotion: row.get(1)?,
        intensity: row.get(2)?,
        note: row.get(3)?,
        timestamp: row.get(4)?,
        user_id: row.get(5)?,
    })
}

// Owner columns are NULL when the LEFT JOIN finds no user.
fn owner_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Option<Identity>> {
    let id: Option<i64> = row.get(offset)?;
    let username: Option<String> = row.get(offset + 1)?;
    Ok(id.zip(username).map(|(id, username)| Identity { id, username }))
}
