use anyhow::{bail, Context, Result};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::roster::{normalize_employee_id, RosterEntry};

/// Fixed interchange header for the curated override roster.
const HEADER: [&str; 5] = ["NickName", "EmployeeID", "Shift", "ShiftStart", "ShiftEnd"];

/// Writes the override roster as UTF-8 CSV with a byte-order mark so
/// spreadsheet tools pick up the encoding.
pub fn export_csv(entries: &[RosterEntry], path: &Path) -> Result<()> {
    let mut buf: Vec<u8> = Vec::new();
    buf.extend_from_slice("\u{feff}".as_bytes());

    {
        let mut writer = csv::Writer::from_writer(&mut buf);
        writer.write_record(HEADER)?;
        for e in entries {
            writer.write_record([
                e.display_name.as_str(),
                e.employee_id.as_str(),
                e.shift_label.as_str(),
                e.shift_start.as_deref().unwrap_or(""),
                e.shift_end.as_deref().unwrap_or(""),
            ])?;
        }
        writer.flush()?;
    }

    fs::write(path, buf).with_context(|| format!("failed to write {}", path.display()))
}

/// Reads an override-roster CSV. The header row must match the export format
/// exactly; rows with unresolvable identifiers are dropped.
pub fn import_csv(path: &Path, debug: bool) -> Result<Vec<RosterEntry>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let content = content.strip_prefix('\u{feff}').unwrap_or(&content);
    if content.trim().is_empty() {
        bail!("empty override file: {}", path.display());
    }

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .context("override file has no header row")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    if headers != HEADER {
        bail!(
            "unexpected override header (want {}): {}",
            HEADER.join(","),
            headers.join(",")
        );
    }

    let mut entries = Vec::new();
    for record in reader.records() {
        let Ok(record) = record else { continue };
        let cell = |i: usize| record.get(i).map(str::trim).unwrap_or("");

        let Some(employee_id) = normalize_employee_id(cell(1)) else {
            if debug {
                eprintln!("[DEBUG] Unresolved override id: {}", cell(1));
            }
            continue;
        };

        let opt = |s: &str| if s.is_empty() { None } else { Some(s.to_string()) };
        entries.push(RosterEntry {
            employee_id,
            display_name: cell(0).to_string(),
            shift_label: cell(2).to_string(),
            shift_start: opt(cell(3)),
            shift_end: opt(cell(4)),
        });
    }

    Ok(entries)
}

/// Folds imported entries into the existing roster, skipping employee IDs
/// that are already present. Returns (merged, added, skipped).
pub fn merge_imported(
    existing: Vec<RosterEntry>,
    imported: Vec<RosterEntry>,
) -> (Vec<RosterEntry>, usize, usize) {
    let mut present: HashSet<String> =
        existing.iter().map(|e| e.employee_id.clone()).collect();
    let mut merged = existing;
    let mut added = 0;
    let mut skipped = 0;

    for entry in imported {
        if present.contains(&entry.employee_id) {
            skipped += 1;
            continue;
        }
        present.insert(entry.employee_id.clone());
        merged.push(entry);
        added += 1;
    }

    (merged, added, skipped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_path(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("stowtrack-tests");
        fs::create_dir_all(&dir).unwrap();
        dir.join(name)
    }

    fn sample_entries() -> Vec<RosterEntry> {
        vec![
            RosterEntry {
                employee_id: "12345678".to_string(),
                display_name: "Kim".to_string(),
                shift_label: "Day".to_string(),
                shift_start: Some("09:00".to_string()),
                shift_end: Some("18:00".to_string()),
            },
            RosterEntry {
                employee_id: "87654321".to_string(),
                display_name: "Lee".to_string(),
                shift_label: "Night".to_string(),
                shift_start: None,
                shift_end: None,
            },
        ]
    }

    #[test]
    fn test_export_has_bom_and_header() {
        let path = temp_path("overrides_out.csv");
        export_csv(&sample_entries(), &path).unwrap();

        let bytes = fs::read(&path).unwrap();
        assert_eq!(&bytes[..3], "\u{feff}".as_bytes());

        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("NickName,EmployeeID,Shift,ShiftStart,ShiftEnd"));
    }

    #[test]
    fn test_round_trip_preserves_fields() {
        let path = temp_path("overrides_rt.csv");
        let entries = sample_entries();
        export_csv(&entries, &path).unwrap();

        let imported = import_csv(&path, false).unwrap();
        assert_eq!(imported, entries);
    }

    #[test]
    fn test_reimport_creates_no_duplicates() {
        let path = temp_path("overrides_dup.csv");
        let entries = sample_entries();
        export_csv(&entries, &path).unwrap();

        let imported = import_csv(&path, false).unwrap();
        let (merged, added, skipped) = merge_imported(entries.clone(), imported);

        assert_eq!(merged, entries);
        assert_eq!(added, 0);
        assert_eq!(skipped, 2);
    }

    #[test]
    fn test_import_rejects_wrong_header() {
        let path = temp_path("overrides_bad.csv");
        fs::write(&path, "Name,ID\nKim,12345678\n").unwrap();
        assert!(import_csv(&path, false).is_err());
    }

    #[test]
    fn test_import_normalizes_ids() {
        let path = temp_path("overrides_norm.csv");
        fs::write(
            &path,
            "NickName,EmployeeID,Shift,ShiftStart,ShiftEnd\nKim,01012345678,Day,09:00,18:00\n",
        )
        .unwrap();

        let imported = import_csv(&path, false).unwrap();
        assert_eq!(imported.len(), 1);
        assert_eq!(imported[0].employee_id, "12345678");
    }
}
