use chrono::{Duration, NaiveDate, NaiveDateTime};
use rusqlite::{Connection, OptionalExtension};
use std::path::PathBuf;
use std::rc::Rc;
use thiserror::Error;
use tracing::{debug, info};

use crate::clock::{Clock, SystemClock};
use crate::models::{Entry, ThoughtLog, UserInfo};
use crate::streak;
use crate::utils::{calendar_day_bounds, format_timestamp, parse_date, parse_timestamp, start_of_day};

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(#[from] rusqlite::Error),
    #[error("Failed to create database directory: {0}")]
    DirectoryError(String),
    #[error("Missing id for {0}")]
    MissingIdentifier(&'static str),
}

const ENTRY_COLUMNS: &str = "id, timestamp, sleep_time, sleep_quality, moods, energy_level, stress_level, \
     body_feel, appetite, focus, motivation, anxiety, others, ai_report";

const THOUGHT_LOG_COLUMNS: &str = "id, situation, emotions, automatic_thoughts, evidence_for, \
     evidence_against, alternative_thought, outcome, timestamp";

const USER_INFO_COLUMNS: &str = "id, name, age, weight, height, conditions, medications, hobbies, \
     goals, occupation, physical_activity, additional_info";

pub struct Database {
    conn: Connection,
    clock: Rc<dyn Clock>,
}

impl Database {
    /// Create a new database connection and initialize the schema
    pub fn new(path: &str) -> Result<Self, DatabaseError> {
        Self::with_clock(path, Rc::new(SystemClock))
    }

    /// Open the database at `path`, reading "now" from `clock`
    pub fn with_clock(path: &str, clock: Rc<dyn Clock>) -> Result<Self, DatabaseError> {
        let db_path = PathBuf::from(path);

        // Create parent directory if it doesn't exist
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| DatabaseError::DirectoryError(e.to_string()))?;
            }
        }

        let conn = Connection::open(&db_path)?;
        let db = Database { conn, clock };
        db.initialize_schema()?;
        debug!(path = %db_path.display(), "database opened");

        Ok(db)
    }

    /// Fresh, throwaway database
    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        Self::open_in_memory_with_clock(Rc::new(SystemClock))
    }

    pub fn open_in_memory_with_clock(clock: Rc<dyn Clock>) -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn, clock };
        db.initialize_schema()?;
        Ok(db)
    }

    /// Initialize the database schema (tables and indexes). Safe to run on every start.
    fn initialize_schema(&self) -> Result<(), DatabaseError> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS entries (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp       TEXT NOT NULL,
                sleep_time      TEXT,
                sleep_quality   TEXT,
                moods           TEXT,
                energy_level    TEXT,
                stress_level    TEXT,
                body_feel       TEXT,
                appetite        TEXT,
                focus           TEXT,
                motivation      TEXT,
                anxiety         TEXT,
                others          TEXT,
                ai_report       TEXT
            );

            CREATE TABLE IF NOT EXISTS thought_logs (
                id                  INTEGER PRIMARY KEY AUTOINCREMENT,
                situation           TEXT,
                emotions            TEXT,
                automatic_thoughts  TEXT,
                evidence_for        TEXT,
                evidence_against    TEXT,
                alternative_thought TEXT,
                outcome             TEXT,
                timestamp           TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS user_info (
                id                  INTEGER PRIMARY KEY AUTOINCREMENT,
                name                TEXT,
                age                 INTEGER,
                weight              INTEGER,
                height              INTEGER,
                conditions          TEXT,
                medications         TEXT,
                hobbies             TEXT,
                goals               TEXT,
                occupation          TEXT,
                physical_activity   TEXT,
                additional_info     TEXT
            );

            CREATE TABLE IF NOT EXISTS settings (
                key     TEXT PRIMARY KEY,
                value   TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_entries_timestamp ON entries(timestamp);
            CREATE INDEX IF NOT EXISTS idx_thought_logs_timestamp ON thought_logs(timestamp);",
        )?;

        Ok(())
    }

    /// Drop the journal tables and recreate them empty. Settings such as the
    /// reminder time are kept.
    pub fn clear(&self) -> Result<(), DatabaseError> {
        self.conn.execute_batch(
            "DROP TABLE IF EXISTS entries;
             DROP TABLE IF EXISTS thought_logs;
             DROP TABLE IF EXISTS user_info;",
        )?;
        self.initialize_schema()?;
        info!("database cleared");
        Ok(())
    }

    /// The clock this store reads "now" from, for collaborators that must agree with it
    pub fn clock(&self) -> Rc<dyn Clock> {
        Rc::clone(&self.clock)
    }

    pub fn now(&self) -> NaiveDateTime {
        self.clock.now()
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Helper function to map a row to an Entry
    fn row_to_entry(row: &rusqlite::Row) -> Result<Entry, rusqlite::Error> {
        Ok(Entry {
            id: Some(row.get(0)?),
            timestamp: Some(timestamp_column(row, 1)?),
            sleep_time: row.get(2)?,
            sleep_quality: row.get(3)?,
            moods: row.get(4)?,
            energy_level: row.get(5)?,
            stress_level: row.get(6)?,
            body_feel: row.get(7)?,
            appetite: row.get(8)?,
            focus: row.get(9)?,
            motivation: row.get(10)?,
            anxiety: row.get(11)?,
            others: row.get(12)?,
            ai_report: row.get(13)?,
        })
    }

    /// Insert an entry and return its ID. A missing timestamp means "now".
    /// Several entries on the same calendar day are allowed.
    pub fn insert_entry(&self, entry: &Entry) -> Result<i64, DatabaseError> {
        let timestamp = entry.timestamp.unwrap_or_else(|| self.now());
        self.conn.execute(
            "INSERT INTO entries (timestamp, sleep_time, sleep_quality, moods, energy_level, stress_level,
                                  body_feel, appetite, focus, motivation, anxiety, others, ai_report)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            rusqlite::params![
                format_timestamp(&timestamp),
                entry.sleep_time,
                entry.sleep_quality,
                entry.moods,
                entry.energy_level,
                entry.stress_level,
                entry.body_feel,
                entry.appetite,
                entry.focus,
                entry.motivation,
                entry.anxiety,
                entry.others,
                entry.ai_report,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!(id, timestamp = %timestamp, "entry inserted");
        Ok(id)
    }

    /// Overwrite the content fields of an existing entry.
    ///
    /// A `None` timestamp keeps the stored one, so editing never moves an
    /// entry to another calendar day by accident. The AI report is left
    /// alone; use [`Database::update_ai_report`] for that.
    pub fn update_entry(&self, entry: &Entry) -> Result<(), DatabaseError> {
        let id = entry.id.ok_or(DatabaseError::MissingIdentifier("entry"))?;
        let timestamp = entry.timestamp.as_ref().map(format_timestamp);

        self.conn.execute(
            "UPDATE entries SET sleep_time = ?1, sleep_quality = ?2, moods = ?3, energy_level = ?4,
                 stress_level = ?5, body_feel = ?6, appetite = ?7, focus = ?8, motivation = ?9,
                 anxiety = ?10, others = ?11, timestamp = COALESCE(?12, timestamp)
             WHERE id = ?13",
            rusqlite::params![
                entry.sleep_time,
                entry.sleep_quality,
                entry.moods,
                entry.energy_level,
                entry.stress_level,
                entry.body_feel,
                entry.appetite,
                entry.focus,
                entry.motivation,
                entry.anxiety,
                entry.others,
                timestamp,
                id
            ],
        )?;
        Ok(())
    }

    /// Attach generated report text to an entry
    pub fn update_ai_report(&self, id: i64, report: &str) -> Result<(), DatabaseError> {
        self.conn.execute(
            "UPDATE entries SET ai_report = ?1 WHERE id = ?2",
            rusqlite::params![report, id],
        )?;
        Ok(())
    }

    /// Delete an entry by ID. Deleting a missing ID is not an error.
    pub fn delete_entry(&self, id: i64) -> Result<(), DatabaseError> {
        self.conn.execute("DELETE FROM entries WHERE id = ?1", rusqlite::params![id])?;
        Ok(())
    }

    /// Get a single entry by ID
    pub fn get_entry(&self, id: i64) -> Result<Option<Entry>, DatabaseError> {
        let sql = format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE id = ?1");
        let entry = self
            .conn
            .query_row(&sql, rusqlite::params![id], Self::row_to_entry)
            .optional()?;
        Ok(entry)
    }

    /// The entry recorded on local calendar day `date`.
    /// When several share the day the latest timestamp wins, then the highest id.
    pub fn get_entry_by_day(&self, date: NaiveDate) -> Result<Option<Entry>, DatabaseError> {
        let (start, end) = calendar_day_bounds(date);
        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM entries
             WHERE timestamp >= ?1 AND timestamp < ?2
             ORDER BY timestamp DESC, id DESC LIMIT 1"
        );
        let entry = self
            .conn
            .query_row(
                &sql,
                rusqlite::params![format_timestamp(&start), format_timestamp(&end)],
                Self::row_to_entry,
            )
            .optional()?;
        Ok(entry)
    }

    /// Today's entry, if one has been recorded
    pub fn get_most_recent_for_today(&self) -> Result<Option<Entry>, DatabaseError> {
        self.get_entry_by_day(self.today())
    }

    /// Entries from midnight `days` days ago up to now, newest first
    pub fn get_entries_last_days(&self, days: u32) -> Result<Vec<Entry>, DatabaseError> {
        let now = self.now();
        let start = start_of_day(now.date() - Duration::days(i64::from(days)));
        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM entries
             WHERE timestamp >= ?1 AND timestamp <= ?2
             ORDER BY timestamp DESC, id DESC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let entries = stmt
            .query_map(
                rusqlite::params![format_timestamp(&start), format_timestamp(&now)],
                Self::row_to_entry,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// All entries ordered by timestamp DESC (newest first)
    pub fn get_all_entries(&self) -> Result<Vec<Entry>, DatabaseError> {
        let sql = format!("SELECT {ENTRY_COLUMNS} FROM entries ORDER BY timestamp DESC, id DESC");
        let mut stmt = self.conn.prepare(&sql)?;
        let entries = stmt
            .query_map([], Self::row_to_entry)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// Distinct local calendar days that have at least one entry, newest first
    pub fn get_entry_days(&self) -> Result<Vec<NaiveDate>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT substr(timestamp, 1, 10) AS day FROM entries ORDER BY day DESC",
        )?;
        let days = stmt
            .query_map([], |row| {
                let raw: String = row.get(0)?;
                parse_date(&raw).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(days)
    }

    /// Consecutive days with an entry ending today; 0 if today has none
    pub fn compute_streak(&self) -> Result<u32, DatabaseError> {
        Ok(streak::current_streak(self.get_entry_days()?, self.today()))
    }

    /// Longest run of consecutive days with an entry
    pub fn longest_streak(&self) -> Result<u32, DatabaseError> {
        Ok(streak::longest_streak(self.get_entry_days()?))
    }

    /// Helper function to map a row to a ThoughtLog
    fn row_to_thought_log(row: &rusqlite::Row) -> Result<ThoughtLog, rusqlite::Error> {
        Ok(ThoughtLog {
            id: Some(row.get(0)?),
            situation: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
            emotions: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
            automatic_thoughts: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
            evidence_for: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
            evidence_against: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
            alternative_thought: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
            outcome: row.get::<_, Option<String>>(7)?.unwrap_or_default(),
            timestamp: Some(timestamp_column(row, 8)?),
        })
    }

    /// Insert a thought log and return its ID
    pub fn insert_thought_log(&self, log: &ThoughtLog) -> Result<i64, DatabaseError> {
        let timestamp = log.timestamp.unwrap_or_else(|| self.now());
        self.conn.execute(
            "INSERT INTO thought_logs (situation, emotions, automatic_thoughts, evidence_for,
                                       evidence_against, alternative_thought, outcome, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            rusqlite::params![
                log.situation,
                log.emotions,
                log.automatic_thoughts,
                log.evidence_for,
                log.evidence_against,
                log.alternative_thought,
                log.outcome,
                format_timestamp(&timestamp),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Update an existing thought log. Fails fast when the log has no id.
    pub fn update_thought_log(&self, log: &ThoughtLog) -> Result<(), DatabaseError> {
        let id = log.id.ok_or(DatabaseError::MissingIdentifier("thought log"))?;
        let timestamp = log.timestamp.as_ref().map(format_timestamp);

        self.conn.execute(
            "UPDATE thought_logs SET situation = ?1, emotions = ?2, automatic_thoughts = ?3,
                 evidence_for = ?4, evidence_against = ?5, alternative_thought = ?6, outcome = ?7,
                 timestamp = COALESCE(?8, timestamp)
             WHERE id = ?9",
            rusqlite::params![
                log.situation,
                log.emotions,
                log.automatic_thoughts,
                log.evidence_for,
                log.evidence_against,
                log.alternative_thought,
                log.outcome,
                timestamp,
                id
            ],
        )?;
        Ok(())
    }

    pub fn delete_thought_log(&self, id: i64) -> Result<(), DatabaseError> {
        self.conn
            .execute("DELETE FROM thought_logs WHERE id = ?1", rusqlite::params![id])?;
        Ok(())
    }

    /// All thought logs, newest first
    pub fn get_thought_logs(&self) -> Result<Vec<ThoughtLog>, DatabaseError> {
        let sql = format!("SELECT {THOUGHT_LOG_COLUMNS} FROM thought_logs ORDER BY timestamp DESC, id DESC");
        let mut stmt = self.conn.prepare(&sql)?;
        let logs = stmt
            .query_map([], Self::row_to_thought_log)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(logs)
    }

    pub fn get_thought_log(&self, id: i64) -> Result<Option<ThoughtLog>, DatabaseError> {
        let sql = format!("SELECT {THOUGHT_LOG_COLUMNS} FROM thought_logs WHERE id = ?1");
        let log = self
            .conn
            .query_row(&sql, rusqlite::params![id], Self::row_to_thought_log)
            .optional()?;
        Ok(log)
    }

    /// The stored profile, if any
    pub fn get_user_info(&self) -> Result<Option<UserInfo>, DatabaseError> {
        let sql = format!("SELECT {USER_INFO_COLUMNS} FROM user_info ORDER BY id ASC LIMIT 1");
        let info = self
            .conn
            .query_row(&sql, [], |row| {
                Ok(UserInfo {
                    id: Some(row.get(0)?),
                    name: row.get(1)?,
                    age: row.get(2)?,
                    weight: row.get(3)?,
                    height: row.get(4)?,
                    conditions: row.get(5)?,
                    medications: row.get(6)?,
                    hobbies: row.get(7)?,
                    goals: row.get(8)?,
                    occupation: row.get(9)?,
                    physical_activity: row.get(10)?,
                    additional_info: row.get(11)?,
                })
            })
            .optional()?;
        Ok(info)
    }

    /// Insert the profile, or replace the row with the same id. Returns the row id.
    pub fn save_user_info(&self, info: &UserInfo) -> Result<i64, DatabaseError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO user_info (id, name, age, weight, height, conditions, medications,
                                               hobbies, goals, occupation, physical_activity, additional_info)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            rusqlite::params![
                info.id,
                info.name,
                info.age,
                info.weight,
                info.height,
                info.conditions,
                info.medications,
                info.hobbies,
                info.goals,
                info.occupation,
                info.physical_activity,
                info.additional_info,
            ],
        )?;
        Ok(info.id.unwrap_or_else(|| self.conn.last_insert_rowid()))
    }

    /// Read a value from the key-value settings table
    pub fn get_setting(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                rusqlite::params![key],
                |row| row.get(0),
            )
            .optional()?;
        debug!(key, ?value, "setting read");
        Ok(value)
    }

    /// Insert or overwrite a value in the key-value settings table
    pub fn set_setting(&self, key: &str, value: &str) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT INTO settings (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            rusqlite::params![key, value],
        )?;
        debug!(key, value, "setting written");
        Ok(())
    }
}

fn timestamp_column(row: &rusqlite::Row, idx: usize) -> Result<NaiveDateTime, rusqlite::Error> {
    let raw: String = row.get(idx)?;
    parse_timestamp(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}
