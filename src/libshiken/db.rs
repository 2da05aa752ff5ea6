use crate::libshiken::joutai::QuizState;
use log::{debug, error, info, warn};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::time::Instant;
use thiserror::Error;

pub const STORAGE_KEY: &str = "quizState";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("cannot encode quiz state: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Where the session is mirrored between runs. `load` never fails: anything
/// missing or unreadable comes back as `None`.
pub trait StateStorage {
    fn save(&self, state: &QuizState) -> Result<(), StorageError>;
    fn load(&self) -> Option<QuizState>;
    fn clear(&self) -> Result<(), StorageError>;
}

pub struct KeyValue;

impl KeyValue {
    pub fn put(connection: &Connection, key: &str, value: &str) -> rusqlite::Result<()> {
        match connection.execute(
            "INSERT INTO KeyValue(key, value) VALUES (?1, ?2) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        ) {
            Ok(_) => {
                debug!("[DB] Wrote '{}' ({} bytes)", key, value.len());
                Ok(())
            }
            Err(err) => {
                error!("[DB] Error while writing '{}': {:?}", key, err);
                Err(err)
            }
        }
    }

    pub fn get(connection: &Connection, key: &str) -> rusqlite::Result<Option<String>> {
        let mut statement =
            connection.prepare("SELECT value FROM KeyValue WHERE key = :key LIMIT 1")?;
        statement
            .query_row(&[(":key", key)], |row| row.get(0))
            .optional()
    }

    pub fn delete(connection: &Connection, key: &str) -> rusqlite::Result<()> {
        match connection.execute("DELETE FROM KeyValue WHERE key = ?1", params![key]) {
            Ok(_) => {
                debug!("[DB] Deleted '{}'", key);
                Ok(())
            }
            Err(err) => {
                error!("[DB] Error while deleting '{}': {:?}", key, err);
                Err(err)
            }
        }
    }
}

pub struct SqliteStorage {
    connection: Connection,
}

impl SqliteStorage {
    pub fn create_or_open(src: &Path) -> rusqlite::Result<SqliteStorage> {
        let connection = if src.exists() {
            info!("[DB] Opening existing Database");
            open_db(src)?
        } else {
            info!("[DB] Creating new Database");
            create_db(src)?
        };
        Ok(SqliteStorage { connection })
    }

    pub fn in_memory() -> rusqlite::Result<SqliteStorage> {
        let connection = init_db(Connection::open_in_memory()?)?;
        Ok(SqliteStorage { connection })
    }

    /// The stored document exactly as written, parseable or not.
    pub fn raw(&self) -> rusqlite::Result<Option<String>> {
        KeyValue::get(&self.connection, STORAGE_KEY)
    }

    pub fn close(self) -> rusqlite::Result<()> {
        close_db(self.connection)
    }
}

impl StateStorage for SqliteStorage {
    fn save(&self, state: &QuizState) -> Result<(), StorageError> {
        let json = serde_json::to_string(state)?;
        KeyValue::put(&self.connection, STORAGE_KEY, &json)?;
        Ok(())
    }

    fn load(&self) -> Option<QuizState> {
        let json = match self.raw() {
            Ok(Some(json)) => json,
            Ok(None) => {
                debug!("[DB] No stored session");
                return None;
            }
            Err(err) => {
                warn!("[DB] Cannot read stored session: {}", err);
                return None;
            }
        };
        match serde_json::from_str::<QuizState>(&json) {
            Ok(state) => Some(state.restored()),
            Err(err) => {
                warn!("[DB] Discarding malformed stored session: {}", err);
                None
            }
        }
    }

    fn clear(&self) -> Result<(), StorageError> {
        KeyValue::delete(&self.connection, STORAGE_KEY)?;
        Ok(())
    }
}

fn create_db(dest: &Path) -> rusqlite::Result<Connection> {
    let now = Instant::now();
    let db = init_db(Connection::open(dest)?)?;
    debug!(
        "[DB] Creating and Saving took {} ms.",
        now.elapsed().as_millis()
    );
    Ok(db)
}

fn open_db(src: &Path) -> rusqlite::Result<Connection> {
    let now = Instant::now();
    // Older files may predate the table.
    let db = init_db(Connection::open(src)?)?;
    debug!("[DB] Opening took {} ms.", now.elapsed().as_millis());
    Ok(db)
}

fn close_db(connection: Connection) -> rusqlite::Result<()> {
    info!("[DB] Closing Database");
    match connection.close() {
        Ok(_) => Ok(()),
        Err((conn, _)) => {
            error!("[DB] Cannot close connection. Retrying...");
            conn.close().map_err(|(_, err)| err)
        }
    }
}

fn init_db(conn: Connection) -> rusqlite::Result<Connection> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS KeyValue (
              key TEXT NOT NULL PRIMARY KEY,
              value TEXT NOT NULL
            )",
        (),
    )?;
    debug!("[DB INIT] Table KeyValue ready");
    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libshiken::joutai::{Action, FetchStatus};
    use crate::libshiken::shitsumon::tests::capital_question;

    fn in_progress() -> QuizState {
        QuizState::default()
            .apply(Action::FetchStarted)
            .apply(Action::FetchSucceeded(vec![
                capital_question("1"),
                capital_question("2"),
            ]))
            .apply(Action::SetCurrentQuestion(1))
            .apply(Action::SelectAnswer {
                question_id: "2".into(),
                answer_id: "answer_b".into(),
            })
    }

    #[test]
    fn empty_store_loads_nothing() {
        let storage = SqliteStorage::in_memory().unwrap();
        assert!(storage.load().is_none());
    }

    #[test]
    fn save_then_load_resumes_mid_quiz() {
        let storage = SqliteStorage::in_memory().unwrap();
        let state = in_progress();
        storage.save(&state).unwrap();
        assert_eq!(storage.load(), Some(state));
    }

    #[test]
    fn save_overwrites_previous_value() {
        let storage = SqliteStorage::in_memory().unwrap();
        storage.save(&in_progress()).unwrap();
        let next = in_progress().apply(Action::SubmitQuiz);
        storage.save(&next).unwrap();
        assert_eq!(storage.load(), Some(next));
    }

    #[test]
    fn malformed_value_is_discarded() {
        let storage = SqliteStorage::in_memory().unwrap();
        KeyValue::put(&storage.connection, STORAGE_KEY, "{not json").unwrap();
        assert!(storage.load().is_none());
        assert_eq!(storage.raw().unwrap().as_deref(), Some("{not json"));
    }

    #[test]
    fn stored_loading_status_restarts() {
        let storage = SqliteStorage::in_memory().unwrap();
        storage
            .save(&QuizState::default().apply(Action::FetchStarted))
            .unwrap();
        assert_eq!(storage.load().unwrap().status, FetchStatus::NotStarted);
    }

    #[test]
    fn clear_removes_the_entry() {
        let storage = SqliteStorage::in_memory().unwrap();
        storage.save(&in_progress()).unwrap();
        storage.clear().unwrap();
        assert!(storage.load().is_none());
        assert!(storage.raw().unwrap().is_none());
    }

    #[test]
    fn file_database_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shiken.db");

        let storage = SqliteStorage::create_or_open(&path).unwrap();
        storage.save(&in_progress()).unwrap();
        storage.close().unwrap();

        let reopened = SqliteStorage::create_or_open(&path).unwrap();
        assert_eq!(reopened.load(), Some(in_progress()));
    }
}
