//! Publish history storage and retrieval using SQLite.
//!
//! Manages persistent storage of every successfully published episode with
//! timestamps, and provides querying capabilities for the history command.

use anyhow::Result;
use chrono::{DateTime, Local};
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};

/// A single published episode in the history.
#[derive(Debug, Clone)]
pub struct PublishedEntry {
    /// Unique identifier for this history row
    pub id: i64,
    /// Episode title at publish time
    pub title: String,
    /// Public URL the episode is reachable at
    pub url: String,
    /// Output format that was published (mp3, m4a, m3u8, or the source type)
    pub format: String,
    /// When this episode was published
    pub published_at: DateTime<Local>,
}

/// Manages the publish history database.
pub struct HistoryManager {
    /// Path to the SQLite database file
    database_path: PathBuf,
    /// Connection to the database (lazy-loaded)
    connection: Option<Connection>,
}

impl HistoryManager {
    /// Creates a new history manager for the given data directory.
    ///
    /// # Arguments
    /// * `data_dir` - Directory where the database file will be stored
    ///
    /// # Errors
    /// - If the data directory cannot be accessed
    pub fn new(data_dir: &Path) -> Result<Self> {
        let database_path = data_dir.join("publish_history.db");

        Ok(Self {
            database_path,
            connection: None,
        })
    }

    /// Initializes database connection and creates tables if necessary.
    ///
    /// # Errors
    /// - If the database file cannot be opened
    /// - If table creation fails
    fn get_connection(&mut self) -> Result<&Connection> {
        if self.connection.is_none() {
            let connection = Connection::open(&self.database_path)?;

            connection.execute("PRAGMA foreign_keys = ON", [])?;

            connection.execute(
                "CREATE TABLE IF NOT EXISTS published_episodes (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    title TEXT NOT NULL,
                    url TEXT NOT NULL,
                    format TEXT NOT NULL,
                    published_at TEXT NOT NULL
                )",
                [],
            )?;

            self.connection = Some(connection);
        }

        Ok(self.connection.as_ref().unwrap())
    }

    /// Saves a published episode to the history database.
    ///
    /// # Errors
    /// - If database connection fails
    /// - If insertion fails
    pub fn save_published(&mut self, title: &str, url: &str, format: &str) -> Result<()> {
        let connection = self.get_connection()?;
        let now = Local::now();
        let timestamp = now.to_rfc3339();

        connection.execute(
            "INSERT INTO published_episodes (title, url, format, published_at) VALUES (?1, ?2, ?3, ?4)",
            params![title, url, format, timestamp],
        )?;

        tracing::debug!("Published episode saved to history");
        Ok(())
    }

    /// Retrieves all published episodes ordered by most recent first.
    ///
    /// # Errors
    /// - If database connection fails
    /// - If query execution fails
    /// - If timestamp parsing fails
    pub fn get_all_published(&mut self) -> Result<Vec<PublishedEntry>> {
        let connection = self.get_connection()?;

        let mut statement = connection.prepare(
            "SELECT id, title, url, format, published_at FROM published_episodes \
             ORDER BY published_at DESC",
        )?;

        let entries = statement
            .query_map([], |row| {
                let id = row.get::<_, i64>(0)?;
                let title = row.get::<_, String>(1)?;
                let url = row.get::<_, String>(2)?;
                let format = row.get::<_, String>(3)?;
                let timestamp_str = row.get::<_, String>(4)?;

                let published_at = DateTime::parse_from_rfc3339(&timestamp_str)
                    .map(|dt| dt.with_timezone(&Local))
                    .map_err(|_| {
                        rusqlite::Error::InvalidParameterName(
                            "Invalid timestamp format".to_string(),
                        )
                    })?;

                Ok(PublishedEntry {
                    id,
                    title,
                    url,
                    format,
                    published_at,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_data_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("castup-history-{tag}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_save_and_list_round_trip() {
        let dir = temp_data_dir("roundtrip");
        let mut manager = HistoryManager::new(&dir).unwrap();

        manager
            .save_published("Morning news", "https://cdn/e1.mp3", "mp3")
            .unwrap();
        manager
            .save_published("Evening news", "https://cdn/e2/playlist.m3u8", "m3u8")
            .unwrap();

        let entries = manager.get_all_published().unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().any(|e| e.title == "Morning news"));
        assert!(entries.iter().any(|e| e.format == "m3u8"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_empty_history_lists_nothing() {
        let dir = temp_data_dir("empty");
        let mut manager = HistoryManager::new(&dir).unwrap();
        assert!(manager.get_all_published().unwrap().is_empty());
        std::fs::remove_dir_all(&dir).ok();
    }
}
