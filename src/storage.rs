//! Session log of user evaluations as CSV.

use crate::models::{ExperimentData, UserData};
use csv::{ReaderBuilder, WriterBuilder};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

const HEADER: [&str; 8] = [
    "experiment_id",
    "genome_id",
    "time_since_startup",
    "user_rating",
    "last_message",
    "last_message_time",
    "last_response",
    "last_response_time",
];

/// One CSV row; field order matches [`HEADER`]
#[derive(Debug, Serialize, Deserialize)]
struct SessionRow {
    experiment_id: u32,
    genome_id: u64,
    time_since_startup: f64,
    user_rating: i32,
    last_message: Option<String>,
    last_message_time: Option<f64>,
    last_response: Option<String>,
    last_response_time: Option<f64>,
}

impl From<&UserData> for SessionRow {
    fn from(data: &UserData) -> Self {
        Self {
            experiment_id: data.experiment_data.experiment_id,
            genome_id: data.experiment_data.genome_id,
            time_since_startup: data.time_since_startup,
            user_rating: data.user_rating,
            last_message: data.last_message.clone(),
            last_message_time: data.last_message_time,
            last_response: data.last_response.clone(),
            last_response_time: data.last_response_time,
        }
    }
}

impl From<SessionRow> for UserData {
    fn from(row: SessionRow) -> Self {
        Self {
            experiment_data: ExperimentData {
                experiment_id: row.experiment_id,
                genome_id: row.genome_id,
            },
            time_since_startup: row.time_since_startup,
            user_rating: row.user_rating,
            last_message: row.last_message,
            last_message_time: row.last_message_time,
            last_response: row.last_response,
            last_response_time: row.last_response_time,
        }
    }
}

/// Appends one row per received [`UserData`]; the header is written when
/// the file is created. Callers sharing one file serialize their writes.
#[derive(Debug, Clone)]
pub struct SessionData {
    path: PathBuf,
}

impl SessionData {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn store_session_data(&self, data: &UserData) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        let is_new = file.metadata()?.len() == 0;

        let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
        if is_new {
            writer.write_record(HEADER)?;
        }
        writer.serialize(SessionRow::from(data))?;
        writer.flush()?;
        Ok(())
    }

    /// Every stored row; empty cells read back as `None`
    pub fn load(&self) -> Result<Vec<UserData>, StorageError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut reader = ReaderBuilder::new().has_headers(true).from_path(&self.path)?;
        let rows = reader
            .deserialize::<SessionRow>()
            .map(|row| row.map(UserData::from))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

#[derive(Debug)]
pub enum StorageError {
    Io(std::io::Error),
    Csv(csv::Error),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "IO error: {}", e),
            Self::Csv(e) => write!(f, "CSV error: {}", e),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<csv::Error> for StorageError {
    fn from(e: csv::Error) -> Self {
        Self::Csv(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(genome_id: u64, message: Option<&str>) -> UserData {
        UserData {
            experiment_data: ExperimentData {
                experiment_id: 1,
                genome_id,
            },
            time_since_startup: 42.5,
            user_rating: 4,
            last_message: message.map(str::to_string),
            last_message_time: message.map(|_| 40.0),
            last_response: None,
            last_response_time: None,
        }
    }

    #[test]
    fn test_header_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let sessions = SessionData::new(dir.path().join("logs/session_data.csv"));

        sessions.store_session_data(&sample(3, Some("hello, there"))).unwrap();
        sessions.store_session_data(&sample(4, None)).unwrap();

        let text = std::fs::read_to_string(sessions.path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("experiment_id,genome_id"));
        assert!(lines[1].contains("\"hello, there\""));

        let rows = sessions.load().unwrap();
        assert_eq!(rows, vec![sample(3, Some("hello, there")), sample(4, None)]);
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let sessions = SessionData::new(dir.path().join("absent.csv"));
        assert!(sessions.load().unwrap().is_empty());
    }

    #[test]
    fn test_fractional_ids_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session_data.csv");
        std::fs::write(
            &path,
            format!("{}\n0,1.5,10.0,3,,,,\n", HEADER.join(",")),
        )
        .unwrap();
        assert!(matches!(SessionData::new(&path).load(), Err(StorageError::Csv(_))));

        std::fs::write(
            &path,
            format!("{}\n0,9007199254740993,10.0,3,,,,\n", HEADER.join(",")),
        )
        .unwrap();
        let rows = SessionData::new(&path).load().unwrap();
        assert_eq!(rows[0].experiment_data.genome_id, 9_007_199_254_740_993);
        assert_eq!(rows[0].last_message, None);
    }
}
