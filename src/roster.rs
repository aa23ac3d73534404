use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::shiftwin::ShiftWindow;

/// Pasted roster column order: date, id, phone, name, wave, shift label,
/// then optional shift start/end times.
const COL_ID: usize = 1;
const COL_NAME: usize = 3;
const COL_SHIFT_LABEL: usize = 5;
const COL_SHIFT_START: usize = 6;
const COL_SHIFT_END: usize = 7;
const MIN_COLUMNS: usize = 6;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RosterEntry {
    pub employee_id: String,
    pub display_name: String,
    pub shift_label: String,
    #[serde(default)]
    pub shift_start: Option<String>,
    #[serde(default)]
    pub shift_end: Option<String>,
}

impl RosterEntry {
    pub fn window(&self) -> Option<ShiftWindow> {
        let start = self.shift_start.as_deref()?;
        let end = self.shift_end.as_deref()?;
        ShiftWindow::parse(start, end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RosterSource {
    Primary,
    Override,
}

#[derive(Debug, Clone)]
pub struct ResolvedWorker {
    pub entry: RosterEntry,
    pub source: RosterSource,
}

/// Reduces a free-form identifier to the 8-digit employee code carried by
/// task records. Idempotent; returns `None` when no code can be extracted.
pub fn normalize_employee_id(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.len() == 8 && trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Some(trimmed.to_string());
    }

    let runs = digit_runs(trimmed);

    // Badge scans prepend the 010 carrier prefix to the 8-digit code.
    for run in &runs {
        if run.len() == 11 && run.starts_with("010") {
            return Some(run[3..].to_string());
        }
    }

    runs.iter()
        .find(|run| run.len() >= 8)
        .map(|run| run[..8].to_string())
}

fn digit_runs(s: &str) -> Vec<String> {
    let mut runs = Vec::new();
    let mut current = String::new();
    for c in s.chars() {
        if c.is_ascii_digit() {
            current.push(c);
        } else if !current.is_empty() {
            runs.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }
    runs
}

/// Parses pasted tabular roster text. Lines whose identifier cannot be
/// normalized are dropped; they could never join against task records.
pub fn parse_roster_text(text: &str, debug: bool) -> Vec<RosterEntry> {
    let mut entries = Vec::new();

    for line in text.lines() {
        let line = line.trim_end();
        if line.trim().is_empty() {
            continue;
        }

        let cols = split_columns(line);
        if cols.len() < MIN_COLUMNS {
            if debug {
                eprintln!("[DEBUG] Roster line skipped ({} columns): {}", cols.len(), line);
            }
            continue;
        }

        let Some(employee_id) = normalize_employee_id(&cols[COL_ID]) else {
            if debug {
                eprintln!("[DEBUG] Unresolved roster id: {}", cols[COL_ID]);
            }
            continue;
        };

        entries.push(RosterEntry {
            employee_id,
            display_name: cols[COL_NAME].trim().to_string(),
            shift_label: cols[COL_SHIFT_LABEL].trim().to_string(),
            shift_start: column_opt(&cols, COL_SHIFT_START),
            shift_end: column_opt(&cols, COL_SHIFT_END),
        });
    }

    entries
}

fn column_opt(cols: &[String], idx: usize) -> Option<String> {
    cols.get(idx)
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
}

/// Tab-delimited first, then runs of 2+ spaces, then comma. Single spaces
/// stay inside a column so display names survive.
fn split_columns(line: &str) -> Vec<String> {
    if line.contains('\t') {
        return line.split('\t').map(|c| c.trim().to_string()).collect();
    }

    let by_spaces = split_multispace(line);
    if by_spaces.len() >= MIN_COLUMNS {
        return by_spaces;
    }

    if line.contains(',') {
        return line.split(',').map(|c| c.trim().to_string()).collect();
    }

    by_spaces
}

fn split_multispace(line: &str) -> Vec<String> {
    let mut cols = Vec::new();
    let mut current = String::new();
    let mut spaces = 0usize;

    for c in line.chars() {
        if c == ' ' {
            spaces += 1;
            continue;
        }
        if spaces >= 2 && !current.is_empty() {
            cols.push(std::mem::take(&mut current));
        } else if spaces == 1 && !current.is_empty() {
            current.push(' ');
        }
        spaces = 0;
        current.push(c);
    }
    if !current.is_empty() {
        cols.push(current);
    }

    cols.into_iter().map(|c| c.trim().to_string()).collect()
}

/// Builds the worker lookup: primary entries first, override entries layered
/// on top. Overrides win and tag the worker as override-sourced.
pub fn merge_rosters(
    primary: &[RosterEntry],
    overrides: &[RosterEntry],
) -> HashMap<String, ResolvedWorker> {
    let mut lookup = HashMap::new();

    for entry in primary {
        lookup.insert(
            entry.employee_id.clone(),
            ResolvedWorker {
                entry: entry.clone(),
                source: RosterSource::Primary,
            },
        );
    }

    for entry in overrides {
        lookup.insert(
            entry.employee_id.clone(),
            ResolvedWorker {
                entry: entry.clone(),
                source: RosterSource::Override,
            },
        );
    }

    lookup
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_plain_8_digits() {
        assert_eq!(normalize_employee_id("12345678"), Some("12345678".to_string()));
    }

    #[test]
    fn test_normalize_carrier_prefix() {
        assert_eq!(normalize_employee_id("01012345678"), Some("12345678".to_string()));
    }

    #[test]
    fn test_normalize_embedded_run() {
        assert_eq!(normalize_employee_id("id=87654321/x"), Some("87654321".to_string()));
        assert_eq!(normalize_employee_id("note 123456789"), Some("12345678".to_string()));
    }

    #[test]
    fn test_normalize_unresolved() {
        assert_eq!(normalize_employee_id("Kim"), None);
        assert_eq!(normalize_employee_id("010-1111-2222"), None);
        assert_eq!(normalize_employee_id(""), None);
    }

    #[test]
    fn test_normalize_idempotent() {
        for raw in ["12345678", "01012345678", "x87654321y"] {
            let once = normalize_employee_id(raw).unwrap();
            assert_eq!(normalize_employee_id(&once), Some(once.clone()));
        }
    }

    #[test]
    fn test_parse_tab_delimited_row() {
        let text = "2024-01-10\t01012345678\t010-1111-2222\tKim\tA\tDay\t09:00\t18:00";
        let entries = parse_roster_text(text, false);

        assert_eq!(entries.len(), 1);
        let e = &entries[0];
        assert_eq!(e.employee_id, "12345678");
        assert_eq!(e.display_name, "Kim");
        assert_eq!(e.shift_label, "Day");
        assert_eq!(e.shift_start.as_deref(), Some("09:00"));
        assert_eq!(e.shift_end.as_deref(), Some("18:00"));

        let w = e.window().unwrap();
        assert_eq!(w.start_hour, 9);
        assert_eq!(w.end_hour, 17);
    }

    #[test]
    fn test_parse_multispace_delimited_row() {
        let text = "2024-01-10  01012345678  010-1111-2222  Kim Min Ju  A  Night  22:00  06:00";
        let entries = parse_roster_text(text, false);

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].display_name, "Kim Min Ju");
        assert_eq!(entries[0].shift_label, "Night");
    }

    #[test]
    fn test_parse_comma_delimited_row() {
        let text = "2024-01-10,01012345678,010-1111-2222,Lee,B,Day,09:00,18:00";
        let entries = parse_roster_text(text, false);

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].employee_id, "12345678");
    }

    #[test]
    fn test_parse_drops_short_and_unresolved_lines() {
        let text = "just a note\n2024-01-10\tno-id-here\t010-1111-2222\tKim\tA\tDay\n";
        assert!(parse_roster_text(text, false).is_empty());
    }

    #[test]
    fn test_missing_shift_times_are_none() {
        let text = "2024-01-10\t12345678\t010-1111-2222\tPark\tA\tDay";
        let entries = parse_roster_text(text, false);

        assert_eq!(entries.len(), 1);
        assert!(entries[0].shift_start.is_none());
        assert!(entries[0].window().is_none());
    }

    #[test]
    fn test_override_wins_merge() {
        let primary = vec![RosterEntry {
            employee_id: "12345678".to_string(),
            display_name: "Kim".to_string(),
            shift_label: "Day".to_string(),
            shift_start: None,
            shift_end: None,
        }];
        let overrides = vec![RosterEntry {
            employee_id: "12345678".to_string(),
            display_name: "Kim (PM)".to_string(),
            shift_label: "Night".to_string(),
            shift_start: Some("22:00".to_string()),
            shift_end: Some("06:00".to_string()),
        }];

        let merged = merge_rosters(&primary, &overrides);
        let worker = &merged["12345678"];

        assert_eq!(worker.entry.display_name, "Kim (PM)");
        assert_eq!(worker.source, RosterSource::Override);
        assert_eq!(merged.len(), 1);
    }
}
