use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::roster::normalize_employee_id;
use crate::timeutil::to_seconds;

pub const COL_EMPLOYEE_ID: &str = "Employee ID";
pub const COL_WORK_DATE: &str = "Work Date";
pub const COL_PROCESS_TASK: &str = "Process Task";
pub const COL_UNIT_QTY: &str = "Unit Qty";
pub const COL_HTP_START: &str = "HTP Start";
pub const COL_HTP_END: &str = "HTP End";
pub const COL_LOCATION: &str = "Location";
pub const COL_HOUR_OF_WORK_DATE: &str = "Hour of Work Date";

/// Date placed on rows whose work-date cell cannot be parsed.
pub const UNKNOWN_DATE: &str = "unknown";

/// One normalized upload row. Only stow rows feed the metrics, but every
/// parseable row is kept so the raw view can show the whole file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    pub employee_id: String,
    pub date: String,
    pub process_task: String,
    pub unit_qty: f64,
    pub htp_start: u32,
    pub htp_end: u32,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub hour_of_work_date: Option<usize>,
}

/// Untouched upload rows, retained for the external raw-data view.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

pub struct IngestResult {
    pub records: Vec<TaskRecord>,
    pub raw: RawTable,
    pub skipped: usize,
    /// Timestamp extracted from a `worker_history_YYYYMMDDHHMMSS` file name.
    pub work_stamp: Option<String>,
    pub source_file: String,
}

/// Resolves the upload argument: a file is used as-is, a directory is walked
/// for the newest `worker_history_*` export.
pub fn resolve_upload_path(path: &Path) -> Result<PathBuf> {
    if path.is_file() {
        return Ok(path.to_path_buf());
    }
    if !path.is_dir() {
        bail!("no such file or directory: {}", path.display());
    }

    let mut newest: Option<(String, PathBuf)> = None;
    for entry in WalkDir::new(path)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let p = entry.path();
        if !p.is_file() {
            continue;
        }
        let name = p.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
        if !name.starts_with("worker_history_") {
            continue;
        }
        if p.extension().map(|e| e != "csv").unwrap_or(true) {
            continue;
        }
        let key = extract_stamp(&name).unwrap_or_default();
        if newest.as_ref().map(|(k, _)| key > *k).unwrap_or(true) {
            newest = Some((key, p.to_path_buf()));
        }
    }

    match newest {
        Some((_, p)) => Ok(p),
        None => bail!("no worker_history_*.csv export found under {}", path.display()),
    }
}

/// Reads one task export. Rows missing the identifier or both time fields
/// are kept in the raw table but excluded from aggregation.
pub fn ingest_file(path: &Path, debug: bool) -> Result<IngestResult> {
    if path.extension().map(|e| e != "csv").unwrap_or(true) {
        bail!("only CSV task exports are supported: {}", path.display());
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let content = content.strip_prefix('\u{feff}').unwrap_or(&content);
    if content.trim().is_empty() {
        bail!("empty task file: {}", path.display());
    }

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .context("task file has no header row")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let col = |name: &str| headers.iter().position(|h| h == name);
    let idx_employee = col(COL_EMPLOYEE_ID);
    let idx_date = col(COL_WORK_DATE);
    let idx_task = col(COL_PROCESS_TASK);
    let idx_qty = col(COL_UNIT_QTY);
    let idx_start = col(COL_HTP_START);
    let idx_end = col(COL_HTP_END);
    let idx_location = col(COL_LOCATION);
    let idx_hour = col(COL_HOUR_OF_WORK_DATE);

    if idx_employee.is_none() || idx_start.is_none() || idx_end.is_none() {
        bail!(
            "task file is missing required columns ({}, {}, {})",
            COL_EMPLOYEE_ID,
            COL_HTP_START,
            COL_HTP_END
        );
    }

    let mut result = IngestResult {
        records: Vec::new(),
        raw: RawTable {
            headers,
            rows: Vec::new(),
        },
        skipped: 0,
        work_stamp: path
            .file_name()
            .and_then(|n| extract_stamp(&n.to_string_lossy())),
        source_file: path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default(),
    };

    // Byte-level records so oddly-encoded cells are still recovered and
    // retained; only structurally unreadable rows are dropped.
    for record in reader.byte_records() {
        let Ok(record) = record else {
            result.skipped += 1;
            continue;
        };
        let cells: Vec<String> = record
            .iter()
            .map(|c| String::from_utf8_lossy(c).into_owned())
            .collect();
        if cells.iter().all(|c| c.trim().is_empty()) {
            continue;
        }
        result.raw.rows.push(cells.clone());

        let cell = |idx: Option<usize>| -> &str {
            idx.and_then(|i| cells.get(i)).map(|c| c.trim()).unwrap_or("")
        };

        let raw_id = cell(idx_employee);
        let start_raw = cell(idx_start);
        let end_raw = cell(idx_end);

        if raw_id.is_empty() || start_raw.is_empty() || end_raw.is_empty() {
            result.skipped += 1;
            if debug {
                eprintln!("[DEBUG] Row kept for raw view only (missing id/times)");
            }
            continue;
        }

        let employee_id =
            normalize_employee_id(raw_id).unwrap_or_else(|| raw_id.to_string());

        result.records.push(TaskRecord {
            employee_id,
            date: normalize_date(cell(idx_date)),
            process_task: cell(idx_task).to_string(),
            unit_qty: cell(idx_qty).parse().unwrap_or(0.0_f64).max(0.0),
            htp_start: to_seconds(start_raw),
            htp_end: to_seconds(end_raw),
            location: non_empty(cell(idx_location)),
            hour_of_work_date: parse_hour_index(cell(idx_hour)),
        });
    }

    if debug {
        eprintln!(
            "[DEBUG] Ingested {} records ({} skipped) from {}",
            result.records.len(),
            result.skipped,
            result.source_file
        );
    }

    Ok(result)
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() { None } else { Some(s.to_string()) }
}

/// "YYYY-MM-DD" with or without a trailing time part; anything else becomes
/// the unknown sentinel.
fn normalize_date(raw: &str) -> String {
    let prefix: String = raw.chars().take(10).collect();
    match NaiveDate::parse_from_str(&prefix, "%Y-%m-%d") {
        Ok(date) => date.format("%Y-%m-%d").to_string(),
        Err(_) => UNKNOWN_DATE.to_string(),
    }
}

fn parse_hour_index(raw: &str) -> Option<usize> {
    if raw.is_empty() {
        return None;
    }
    let value: f64 = raw.parse().ok()?;
    if value < 0.0 {
        return None;
    }
    Some(value as usize)
}

fn extract_stamp(name: &str) -> Option<String> {
    let rest = name.split("worker_history_").nth(1)?;
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.len() < 14 {
        return None;
    }
    let d = &digits[..14];
    Some(format!(
        "{}-{}-{} {}:{}:{}",
        &d[..4],
        &d[4..6],
        &d[6..8],
        &d[8..10],
        &d[10..12],
        &d[12..14]
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(name: &str, content: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("stowtrack-tests");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        path
    }

    const SAMPLE: &str = "\
Employee ID,Work Date,Process Task,Unit Qty,HTP Start,HTP End,Location,Hour of Work Date
01012345678,2024-01-10,STOW(STOW),100,23:30:00,00:30:00,A-1,
87654321,2024-01-10,PICK(PICK),40,09:00:00,10:00:00,,9
,2024-01-10,STOW(STOW),10,09:00:00,10:00:00,,
";

    #[test]
    fn test_ingest_maps_columns() {
        let path = write_temp("worker_history_20240110083000.csv", SAMPLE);
        let result = ingest_file(&path, false).unwrap();

        assert_eq!(result.records.len(), 2);
        assert_eq!(result.skipped, 1);
        assert_eq!(result.raw.rows.len(), 3);
        assert_eq!(result.work_stamp.as_deref(), Some("2024-01-10 08:30:00"));

        let r = &result.records[0];
        assert_eq!(r.employee_id, "12345678");
        assert_eq!(r.date, "2024-01-10");
        assert_eq!(r.process_task, "STOW(STOW)");
        assert_eq!(r.unit_qty, 100.0);
        assert_eq!(r.htp_start, 23 * 3600 + 1800);
        assert_eq!(r.htp_end, 1800);
        assert_eq!(r.location.as_deref(), Some("A-1"));
        assert_eq!(r.hour_of_work_date, None);

        assert_eq!(result.records[1].hour_of_work_date, Some(9));
        assert_eq!(result.records[1].location, None);
    }

    #[test]
    fn test_ingest_rejects_non_csv() {
        let path = write_temp("tasks.xlsx", "binary");
        assert!(ingest_file(&path, false).is_err());
    }

    #[test]
    fn test_ingest_rejects_empty_file() {
        let path = write_temp("worker_history_20240110083000_empty.csv", "\n");
        assert!(ingest_file(&path, false).is_err());
    }

    #[test]
    fn test_ingest_rejects_missing_required_columns() {
        let path = write_temp("nocols.csv", "A,B\n1,2\n");
        assert!(ingest_file(&path, false).is_err());
    }

    #[test]
    fn test_bad_date_becomes_unknown() {
        let content = "\
Employee ID,Work Date,Process Task,Unit Qty,HTP Start,HTP End
12345678,not-a-date,STOW(STOW),5,09:00:00,10:00:00
";
        let path = write_temp("baddate.csv", content);
        let result = ingest_file(&path, false).unwrap();
        assert_eq!(result.records[0].date, UNKNOWN_DATE);
    }

    #[test]
    fn test_ragged_rows_retained_in_raw() {
        let content = "\
Employee ID,Work Date,Process Task,Unit Qty,HTP Start,HTP End
12345678,2024-01-10,STOW(STOW),5,09:00:00,10:00:00
87654321,2024-01-10
99999999,2024-01-10,STOW(STOW),3,10:00:00,11:00:00,spill,over
";
        let path = write_temp("ragged.csv", content);
        let result = ingest_file(&path, false).unwrap();

        // The short row cannot yield a task, but it stays in the raw table.
        assert_eq!(result.records.len(), 2);
        assert_eq!(result.skipped, 1);
        assert_eq!(result.raw.rows.len(), 3);
        assert_eq!(result.raw.rows[1][0], "87654321");
        assert_eq!(result.raw.rows[2].len(), 8);
    }

    #[test]
    fn test_bad_qty_becomes_zero() {
        let content = "\
Employee ID,Work Date,Process Task,Unit Qty,HTP Start,HTP End
12345678,2024-01-10,STOW(STOW),n/a,09:00:00,10:00:00
";
        let path = write_temp("badqty.csv", content);
        let result = ingest_file(&path, false).unwrap();
        assert_eq!(result.records[0].unit_qty, 0.0);
    }

    #[test]
    fn test_extract_stamp() {
        assert_eq!(
            extract_stamp("worker_history_20240110235959.csv"),
            Some("2024-01-10 23:59:59".to_string())
        );
        assert_eq!(extract_stamp("worker_history_2024.csv"), None);
        assert_eq!(extract_stamp("other.csv"), None);
    }
}
