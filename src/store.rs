use anyhow::{Context, Result};
use chrono::Local;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::ingest::{IngestResult, RawTable, TaskRecord};
use crate::roster::RosterEntry;

/// Stored upload: the normalized records plus the untouched rows and the
/// upload provenance stamp. An upload replaces this wholesale.
#[derive(Serialize, Deserialize, Default)]
pub struct DatasetFile {
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub records: Vec<TaskRecord>,
    #[serde(default)]
    pub raw: RawTable,
    #[serde(default)]
    pub skipped: usize,
    #[serde(default)]
    pub source_file: String,
    #[serde(default)]
    pub work_stamp: Option<String>,
    #[serde(default)]
    pub uploaded_at: String,
}

impl DatasetFile {
    pub fn from_ingest(result: IngestResult) -> Self {
        Self {
            version: 1,
            records: result.records,
            raw: result.raw,
            skipped: result.skipped,
            source_file: result.source_file,
            work_stamp: result.work_stamp,
            uploaded_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Default)]
pub struct RosterFile {
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub entries: Vec<RosterEntry>,
}

#[derive(Serialize, Deserialize, Default)]
pub struct SortOrderFile {
    #[serde(default)]
    pub order: Vec<String>,
}

fn store_dir() -> Option<PathBuf> {
    dirs::data_dir()
        .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
        .map(|p| p.join("stowtrack"))
}

fn store_path(name: &str) -> Result<PathBuf> {
    store_dir()
        .map(|dir| dir.join(name))
        .context("cannot locate a data directory")
}

pub fn load_dataset() -> DatasetFile {
    load_json("dataset.json")
}

pub fn replace_dataset(dataset: &DatasetFile) -> Result<()> {
    save_json("dataset.json", dataset)
}

pub fn load_primary_roster() -> Vec<RosterEntry> {
    load_json::<RosterFile>("roster.json").entries
}

pub fn replace_primary_roster(entries: &[RosterEntry]) -> Result<()> {
    save_json(
        "roster.json",
        &RosterFile {
            version: 1,
            entries: entries.to_vec(),
        },
    )
}

pub fn load_override_roster() -> Vec<RosterEntry> {
    load_json::<RosterFile>("overrides.json").entries
}

pub fn replace_override_roster(entries: &[RosterEntry]) -> Result<()> {
    save_json(
        "overrides.json",
        &RosterFile {
            version: 1,
            entries: entries.to_vec(),
        },
    )
}

pub fn load_sort_order() -> Vec<String> {
    load_json::<SortOrderFile>("sort_order.json").order
}

pub fn save_sort_order(order: &[String]) -> Result<()> {
    save_json(
        "sort_order.json",
        &SortOrderFile {
            order: order.to_vec(),
        },
    )
}

fn load_json<T: DeserializeOwned + Default>(name: &str) -> T {
    let Some(path) = store_dir().map(|d| d.join(name)) else {
        return T::default();
    };
    if !path.exists() {
        return T::default();
    }
    fs::read_to_string(&path)
        .ok()
        .and_then(|content| serde_json::from_str(&content).ok())
        .unwrap_or_default()
}

fn save_json<T: Serialize>(name: &str, value: &T) -> Result<()> {
    let path = store_path(name)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let tmp_path = path.with_extension("json.tmp");
    let content = serde_json::to_string_pretty(value)?;

    fs::write(&tmp_path, content)
        .with_context(|| format!("failed to write {}", tmp_path.display()))?;
    fs::rename(&tmp_path, &path)
        .with_context(|| format!("failed to replace {}", path.display()))?;

    Ok(())
}
