//! CSV export of a profile's readings.
//!
//! Layout: a fixed header row, then one row per reading in the order given.
//! Timestamps are ISO-8601 UTC instants with millisecond precision. The notes
//! column is always quoted, with embedded quotes doubled. Rows are joined by
//! `\n` without a trailing newline.

use std::path::Path;

use chrono::{DateTime, NaiveDate, SecondsFormat};
use regex::Regex;

use crate::error::{Error, Result};

use super::model::VitalRecord;

/// Header row of the export.
pub const CSV_HEADERS: [&str; 6] = [
    "Timestamp",
    "Systolic",
    "Diastolic",
    "Heart Rate",
    "Oxygen Saturation",
    "Notes",
];

/// Render readings as CSV. Returns `None` when there is nothing to export.
///
/// # Errors
///
/// Returns a validation error if a timestamp is outside the representable range.
pub fn export_csv(records: &[&VitalRecord]) -> Result<Option<String>> {
    if records.is_empty() {
        return Ok(None);
    }

    let mut lines = Vec::with_capacity(records.len() + 1);
    lines.push(CSV_HEADERS.join(","));
    for record in records {
        lines.push(format!(
            "{},{},{},{},{},{}",
            iso_instant(record.timestamp)?,
            record.systolic,
            record.diastolic,
            record.heart_rate,
            record.oxygen_saturation,
            quote(record.notes.as_deref().unwrap_or_default()),
        ));
    }
    Ok(Some(lines.join("\n")))
}

/// Download file name: `health_data_<name>_<YYYY-MM-DD>.csv`, with each run
/// of whitespace in the name replaced by `_`.
///
/// # Errors
///
/// Returns an internal error if the whitespace pattern fails to compile.
pub fn export_file_name(profile_name: &str, date: NaiveDate) -> Result<String> {
    let whitespace = Regex::new(r"\s+").map_err(|e| Error::internal(e.to_string()))?;
    let name = whitespace.replace_all(profile_name, "_");
    Ok(format!("health_data_{name}_{}.csv", date.format("%Y-%m-%d")))
}

/// Write the CSV for `records` to `path`. Returns `false` and writes nothing
/// when there are no records.
///
/// # Errors
///
/// Returns an I/O error if the file cannot be written, or a validation
/// error for an out-of-range timestamp.
pub fn write_csv_file(path: &Path, records: &[&VitalRecord]) -> Result<bool> {
    let Some(csv) = export_csv(records)? else {
        return Ok(false);
    };
    std::fs::write(path, csv)?;
    Ok(true)
}

fn iso_instant(millis: i64) -> Result<String> {
    DateTime::from_timestamp_millis(millis)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
        .ok_or_else(|| Error::validation(format!("timestamp out of range: {millis}")))
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(timestamp: i64, vitals: (i32, i32, i32, i32), notes: Option<&str>) -> VitalRecord {
        VitalRecord {
            id: format!("r{timestamp}"),
            patient_id: "p".to_string(),
            timestamp,
            systolic: vitals.0,
            diastolic: vitals.1,
            heart_rate: vitals.2,
            oxygen_saturation: vitals.3,
            notes: notes.map(ToString::to_string),
        }
    }

    /// Minimal reader for the export format: comma separated, `"` quoting.
    fn parse_csv(text: &str) -> Vec<Vec<String>> {
        text.lines()
            .map(|line| {
                let mut fields = Vec::new();
                let mut field = String::new();
                let mut in_quotes = false;
                let mut chars = line.chars().peekable();
                while let Some(c) = chars.next() {
                    match (c, in_quotes) {
                        ('"', true) if chars.peek() == Some(&'"') => {
                            field.push('"');
                            chars.next();
                        }
                        ('"', _) => in_quotes = !in_quotes,
                        (',', false) => fields.push(std::mem::take(&mut field)),
                        _ => field.push(c),
                    }
                }
                fields.push(field);
                fields
            })
            .collect()
    }

    #[test]
    fn test_empty_export_is_none() {
        assert_eq!(export_csv(&[]).unwrap(), None);
    }

    #[test]
    fn test_export_layout() {
        let r = record(0, (120, 80, 70, 98), Some("after \"run\""));
        let csv = export_csv(&[&r]).unwrap().unwrap();

        assert_eq!(
            csv,
            "Timestamp,Systolic,Diastolic,Heart Rate,Oxygen Saturation,Notes\n\
             1970-01-01T00:00:00.000Z,120,80,70,98,\"after \"\"run\"\"\""
        );
    }

    #[test]
    fn test_missing_notes_are_empty_quoted() {
        let r = record(1_700_000_000_000, (130, 85, 72, 97), None);
        let csv = export_csv(&[&r]).unwrap().unwrap();
        let last_line = csv.lines().last().unwrap();
        assert!(last_line.starts_with("2023-11-14T22:13:20.000Z,"));
        assert!(last_line.ends_with(",\"\""));
    }

    #[test]
    fn test_export_reparses_to_same_vitals_in_order() {
        let records = vec![
            record(1_000, (118, 76, 64, 99), Some("morning, rested")),
            record(2_000, (135, 88, 90, 96), None),
            record(3_000, (142, 91, 101, 94), Some("said \"dizzy\"")),
        ];
        let refs: Vec<&VitalRecord> = records.iter().collect();
        let csv = export_csv(&refs).unwrap().unwrap();

        let rows = parse_csv(&csv);
        assert_eq!(rows[0], CSV_HEADERS.map(String::from).to_vec());

        let tuples: Vec<(i32, i32, i32, i32)> = rows[1..]
            .iter()
            .map(|row| {
                (
                    row[1].parse().unwrap(),
                    row[2].parse().unwrap(),
                    row[3].parse().unwrap(),
                    row[4].parse().unwrap(),
                )
            })
            .collect();
        let expected: Vec<(i32, i32, i32, i32)> = records
            .iter()
            .map(|r| (r.systolic, r.diastolic, r.heart_rate, r.oxygen_saturation))
            .collect();
        assert_eq!(tuples, expected);
        assert_eq!(rows[1][5], "morning, rested");
        assert_eq!(rows[3][5], "said \"dizzy\"");
    }

    #[test]
    fn test_out_of_range_timestamp() {
        let r = record(i64::MAX, (1, 1, 1, 1), None);
        assert!(export_csv(&[&r]).unwrap_err().is_validation());
    }

    #[test]
    fn test_export_file_name() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 17).unwrap();
        assert_eq!(
            export_file_name("Mary  Ann Smith", date).unwrap(),
            "health_data_Mary_Ann_Smith_2024-05-17.csv"
        );
    }

    #[test]
    fn test_write_csv_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");

        assert!(!write_csv_file(&path, &[]).unwrap());
        assert!(!path.exists());

        let r = record(1_700_000_000_000, (120, 80, 70, 98), None);
        assert!(write_csv_file(&path, &[&r]).unwrap());
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, export_csv(&[&r]).unwrap().unwrap());

        let unwritable = dir.path().join("no-such-dir").join("out.csv");
        assert!(matches!(write_csv_file(&unwritable, &[&r]), Err(Error::Io(_))));
    }
}
