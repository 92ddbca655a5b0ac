//! CSV file codec.
//!
//! Responsibilities:
//! - Read a record file into typed rows, skipping malformed rows with a warning
//! - Write a header line followed by every row, using standard quoted-CSV escaping
//! - Provide serde field adapters for the `HH:MM` time and `YYYY-MM-DD HH:MM` timestamp
//!   columns (dates use chrono's default `YYYY-MM-DD` form)
//!
//! Blank cells deserialize to `None` and `None` serializes to an empty cell.

use crate::models::EntityKind;
use crate::{ClinicError, ClinicResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::Path;

// ============================================================================
// File access
// ============================================================================

/// Reads every well-formed row of `path`.
///
/// A missing file yields no rows; the caller decides whether to create it. Cells are taken
/// verbatim so a written row reads back unchanged; only header names are trimmed. Rows that
/// cannot be decoded (wrong column count, unparseable number, date or enum value) are logged
/// and skipped. Only I/O failures abort the read.
pub fn read_rows<R: DeserializeOwned>(kind: EntityKind, path: &Path) -> ClinicResult<Vec<R>> {
    let load_err = |source: io::Error| ClinicError::DataLoad {
        kind,
        path: path.to_path_buf(),
        source,
    };

    let file = match fs::File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(load_err(e)),
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .trim(csv::Trim::Headers)
        .from_reader(file);

    let mut rows = Vec::new();
    for (index, result) in reader.deserialize::<R>().enumerate() {
        match result {
            Ok(row) => rows.push(row),
            Err(e) if e.is_io_error() => return Err(load_err(io::Error::from(e))),
            Err(e) => {
                // Line 1 is the header.
                tracing::warn!(
                    "skipping malformed {} row {} in {}: {}",
                    kind,
                    index + 2,
                    path.display(),
                    e
                );
            }
        }
    }

    Ok(rows)
}

/// Rewrites `path` with `header` followed by `rows`, creating the parent directory if needed.
pub fn write_rows<R: Serialize>(
    kind: EntityKind,
    path: &Path,
    header: &[&str],
    rows: &[R],
) -> ClinicResult<()> {
    let save_err = |source: io::Error| ClinicError::DataSave {
        kind,
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(save_err)?;
        }
    }

    let file = fs::File::create(path).map_err(save_err)?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);

    writer
        .write_record(header)
        .map_err(|e| save_err(io::Error::from(e)))?;
    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| save_err(io::Error::from(e)))?;
    }
    writer.flush().map_err(save_err)?;

    Ok(())
}

// ============================================================================
// Field adapters
// ============================================================================

/// `Option<NaiveTime>` as `HH:MM`.
pub mod optional_time {
    use crate::constants::TIME_FORMAT;
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<NaiveTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(time) => serializer.serialize_str(&time.format(TIME_FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        let Some(raw) = raw.filter(|r| !r.trim().is_empty()) else {
            return Ok(None);
        };
        let raw = raw.trim();
        NaiveTime::parse_from_str(raw, TIME_FORMAT)
            .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
            .map(Some)
            .map_err(|e| serde::de::Error::custom(format!("invalid time '{raw}': {e}")))
    }
}

/// `Option<NaiveDateTime>` as `YYYY-MM-DD HH:MM`.
pub mod optional_datetime {
    use crate::constants::DATETIME_FORMAT;
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<NaiveDateTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(ts) => serializer.serialize_str(&ts.format(DATETIME_FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        let Some(raw) = raw.filter(|r| !r.trim().is_empty()) else {
            return Ok(None);
        };
        let raw = raw.trim();
        NaiveDateTime::parse_from_str(raw, DATETIME_FORMAT)
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
            .map(Some)
            .map_err(|e| serde::de::Error::custom(format!("invalid timestamp '{raw}': {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct SampleRow {
        id: Option<String>,
        note: Option<String>,
        count: Option<u32>,
        day: Option<NaiveDate>,
        #[serde(with = "optional_time")]
        at: Option<NaiveTime>,
        #[serde(with = "optional_datetime")]
        stamp: Option<NaiveDateTime>,
    }

    const HEADER: &[&str] = &["id", "note", "count", "day", "at", "stamp"];

    #[test]
    fn test_missing_file_reads_as_empty() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let rows: Vec<SampleRow> =
            read_rows(EntityKind::Patient, &temp_dir.path().join("absent.csv"))
                .expect("missing file is not an error");
        assert!(rows.is_empty());
    }

    #[test]
    fn test_write_then_read_preserves_quoting_and_blanks() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("nested").join("sample.csv");

        let row = SampleRow {
            id: Some("X1".into()),
            note: Some("said \"hello\", then\nleft".into()),
            count: Some(3),
            day: NaiveDate::from_ymd_opt(2025, 9, 20),
            at: NaiveTime::from_hms_opt(9, 15, 0),
            stamp: None,
        };
        write_rows(EntityKind::Patient, &path, HEADER, std::slice::from_ref(&row))
            .expect("write should succeed");

        let text = fs::read_to_string(&path).expect("file should exist");
        assert!(text.starts_with("id,note,count,day,at,stamp\n"));
        assert!(text.contains("2025-09-20,09:15,"));

        let rows: Vec<SampleRow> = read_rows(EntityKind::Patient, &path).expect("read");
        assert_eq!(rows, vec![row]);
    }

    #[test]
    fn test_header_only_file_written_for_empty_rows() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("empty.csv");
        write_rows::<SampleRow>(EntityKind::Staff, &path, HEADER, &[]).expect("write");
        let text = fs::read_to_string(&path).expect("file should exist");
        assert_eq!(text.trim_end(), "id,note,count,day,at,stamp");
    }

    #[test]
    fn test_malformed_rows_are_skipped() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("mixed.csv");
        fs::write(
            &path,
            "id,note,count,day,at,stamp\n\
             A,ok,1,2025-01-01,10:00,2025-01-01 09:00\n\
             B,bad count,-4,2025-01-01,10:00,\n\
             C,too,few\n\
             D,bad date,1,2025-13-40,10:00,\n\
             E,,,,,\n",
        )
        .expect("write fixture");

        let rows: Vec<SampleRow> = read_rows(EntityKind::Appointment, &path).expect("read");
        let ids: Vec<_> = rows.iter().filter_map(|r| r.id.as_deref()).collect();
        assert_eq!(ids, vec!["A", "E"]);
        assert_eq!(rows[1].note, None);
        assert_eq!(rows[1].count, None);
    }
}
