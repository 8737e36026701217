// ABOUTME: Append-only CSV log of dated horoscope predictions (fecha,signo,prediccion).
// ABOUTME: Writes the header once on a missing or empty file and skips rows with blank predictions.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use csv::{Terminator, WriterBuilder};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::extract::Prediction;

/// Header row of the log.
pub const HEADER: [&str; 3] = ["fecha", "signo", "prediccion"];

/// Date format of the `fecha` column.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// One row of the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRow {
    pub fecha: NaiveDate,
    pub signo: String,
    pub prediccion: String,
}

impl LogRow {
    fn record(&self) -> [String; 3] {
        [
            self.fecha.format(DATE_FORMAT).to_string(),
            self.signo.clone(),
            self.prediccion.clone(),
        ]
    }
}

/// Stamps every prediction of one run with the same date.
pub fn rows_for(fecha: NaiveDate, predictions: &[Prediction]) -> Vec<LogRow> {
    predictions
        .iter()
        .map(|p| LogRow {
            fecha,
            signo: p.sign.label().to_string(),
            prediccion: p.prediction.clone(),
        })
        .collect()
}

/// The CSV file predictions are appended to.
#[derive(Debug, Clone)]
pub struct CsvLog {
    path: PathBuf,
}

impl CsvLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn display(&self) -> String {
        self.path.display().to_string()
    }

    /// Writes the header if the file is missing or empty.
    ///
    /// Returns true when the header was written.
    pub fn ensure_header(&self) -> Result<bool> {
        let has_content = match fs::metadata(&self.path) {
            Ok(meta) => meta.len() > 0,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => return Err(Error::io(self.display(), e)),
        };
        if has_content {
            return Ok(false);
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| Error::io(self.display(), e))?;
        }

        let file = fs::File::create(&self.path).map_err(|e| Error::io(self.display(), e))?;
        let mut writer = WriterBuilder::new()
            .terminator(Terminator::CRLF)
            .from_writer(file);
        writer
            .write_record(HEADER)
            .map_err(|e| Error::csv(self.display(), e))?;
        writer.flush().map_err(|e| Error::io(self.display(), e))?;
        debug!(path = %self.display(), "initialized CSV log");
        Ok(true)
    }

    /// Appends rows with a non-blank prediction, never rewriting the header.
    ///
    /// Returns the number of rows written; the file is not touched when that is zero.
    pub fn append_rows(&self, rows: &[LogRow]) -> Result<usize> {
        let valid: Vec<&LogRow> = rows
            .iter()
            .filter(|row| !row.prediccion.trim().is_empty())
            .collect();
        if valid.is_empty() {
            debug!(path = %self.display(), "no rows to append");
            return Ok(0);
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| Error::io(self.display(), e))?;
        let mut writer = WriterBuilder::new()
            .has_headers(false)
            .terminator(Terminator::CRLF)
            .from_writer(file);
        for row in &valid {
            writer
                .write_record(row.record())
                .map_err(|e| Error::csv(self.display(), e))?;
        }
        writer.flush().map_err(|e| Error::io(self.display(), e))?;

        info!(path = %self.display(), rows = valid.len(), "appended predictions");
        Ok(valid.len())
    }

    /// Ensures the header, then appends this run's predictions under `fecha`.
    pub fn record(&self, fecha: NaiveDate, predictions: &[Prediction]) -> Result<usize> {
        self.ensure_header()?;
        self.append_rows(&rows_for(fecha, predictions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signs::Sign;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 21).unwrap()
    }

    fn row(signo: &str, prediccion: &str) -> LogRow {
        LogRow {
            fecha: day(),
            signo: signo.to_string(),
            prediccion: prediccion.to_string(),
        }
    }

    #[test]
    fn header_written_on_missing_file() {
        let dir = TempDir::new().unwrap();
        let log = CsvLog::new(dir.path().join("h.csv"));
        assert!(log.ensure_header().unwrap());
        assert_eq!(
            fs::read_to_string(log.path()).unwrap(),
            "fecha,signo,prediccion\r\n"
        );
        assert!(!log.ensure_header().unwrap());
    }

    #[test]
    fn header_written_on_empty_file_and_nested_dirs() {
        let dir = TempDir::new().unwrap();
        let empty = dir.path().join("empty.csv");
        fs::write(&empty, "").unwrap();
        assert!(CsvLog::new(&empty).ensure_header().unwrap());

        let nested = CsvLog::new(dir.path().join("a/b/log.csv"));
        assert!(nested.ensure_header().unwrap());
        assert!(nested.path().exists());
    }

    #[test]
    fn blank_predictions_are_filtered() {
        let dir = TempDir::new().unwrap();
        let log = CsvLog::new(dir.path().join("h.csv"));
        log.ensure_header().unwrap();
        let written = log
            .append_rows(&[row("ARIES", "uno"), row("TAURO", "   "), row("LEO", "")])
            .unwrap();
        assert_eq!(written, 1);
        assert_eq!(
            fs::read_to_string(log.path()).unwrap(),
            "fecha,signo,prediccion\r\n2024-03-21,ARIES,uno\r\n"
        );
    }

    #[test]
    fn all_blank_rows_leave_file_untouched() {
        let dir = TempDir::new().unwrap();
        let log = CsvLog::new(dir.path().join("none.csv"));
        assert_eq!(log.append_rows(&[row("ARIES", " ")]).unwrap(), 0);
        assert!(!log.path().exists());
    }

    #[test]
    fn fields_are_quoted_when_needed() {
        let dir = TempDir::new().unwrap();
        let log = CsvLog::new(dir.path().join("q.csv"));
        let preds = vec![Prediction {
            sign: Sign::Geminis,
            prediction: "Dijo \"sí\", y luego, no".to_string(),
        }];
        assert_eq!(log.record(day(), &preds).unwrap(), 1);
        let content = fs::read_to_string(log.path()).unwrap();
        assert!(content.ends_with("2024-03-21,GÉMINIS,\"Dijo \"\"sí\"\", y luego, no\"\r\n"));
    }

    #[test]
    fn rows_share_the_run_date() {
        let preds = vec![
            Prediction {
                sign: Sign::Aries,
                prediction: "a".to_string(),
            },
            Prediction {
                sign: Sign::Cancer,
                prediction: "b".to_string(),
            },
        ];
        let rows = rows_for(day(), &preds);
        assert_eq!(rows, vec![row("ARIES", "a"), row("CÁNCER", "b")]);
    }
}
