mod aggregate;
mod buckets;
mod config;
mod ingest;
mod overrides;
mod report;
mod roster;
mod shiftwin;
mod store;
mod timeutil;

use anyhow::{bail, Result};
use clap::Parser;
use colored::*;
use std::fs;
use std::path::PathBuf;

use aggregate::AggregationContext;

#[derive(Parser)]
#[command(name = "stowtrack")]
#[command(about = "Hourly stow productivity aggregation for warehouse shift tracking")]
struct Cli {
    #[arg(
        long,
        value_name = "PATH",
        help = "Ingest a task CSV (or the newest worker_history export under a directory) and replace the stored dataset"
    )]
    upload: Option<PathBuf>,

    #[arg(
        long,
        value_name = "FILE",
        help = "Parse pasted roster text and replace the primary roster"
    )]
    roster: Option<PathBuf>,

    #[arg(
        long,
        value_name = "FILE",
        help = "Import an override-roster CSV, skipping IDs already present"
    )]
    import_overrides: Option<PathBuf>,

    #[arg(long, value_name = "FILE", help = "Export the override roster as CSV")]
    export_overrides: Option<PathBuf>,

    #[arg(
        long,
        value_name = "ID,ID,...",
        help = "Persist an explicit worker sort order"
    )]
    set_order: Option<String>,

    #[arg(long, help = "Print the hourly quantity series")]
    hourly: bool,

    #[arg(long, value_name = "HOUR", help = "Print the location matrix for one hour (0-23)")]
    hour: Option<usize>,

    #[arg(long, help = "Emit the selected view as JSON")]
    json: bool,

    #[arg(long, help = "Debug output")]
    debug: bool,
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        eprintln!("{} {e}", "[오류]".red().bold());
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = config::load_config();

    if let Some(path) = &cli.upload {
        let file = ingest::resolve_upload_path(path)?;
        let result = ingest::ingest_file(&file, cli.debug)?;
        println!(
            "{}",
            format!(
                "업로드 완료: {} ({}행, {}행 집계 제외)",
                result.source_file,
                result.records.len(),
                result.skipped
            )
            .green()
        );
        store::replace_dataset(&store::DatasetFile::from_ingest(result))?;
    }

    if let Some(path) = &cli.roster {
        let text = fs::read_to_string(path)?;
        if text.trim().is_empty() {
            bail!("로스터 입력이 비어 있습니다");
        }
        let entries = roster::parse_roster_text(&text, cli.debug);
        if entries.is_empty() {
            bail!("로스터에서 유효한 행을 찾지 못했습니다");
        }
        println!("{}", format!("기본 로스터 저장: {}명", entries.len()).green());
        store::replace_primary_roster(&entries)?;
    }

    if let Some(path) = &cli.import_overrides {
        let imported = overrides::import_csv(path, cli.debug)?;
        let existing = store::load_override_roster();
        let (merged, added, skipped) = overrides::merge_imported(existing, imported);
        println!(
            "{}",
            format!("오버라이드 가져오기: {added}명 추가, {skipped}명 중복 제외").green()
        );
        store::replace_override_roster(&merged)?;
    }

    if let Some(path) = &cli.export_overrides {
        let entries = store::load_override_roster();
        overrides::export_csv(&entries, path)?;
        println!(
            "{}",
            format!("오버라이드 내보내기: {} ({}명)", path.display(), entries.len()).green()
        );
    }

    if let Some(order) = &cli.set_order {
        let ids: Vec<String> = order
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| roster::normalize_employee_id(s).unwrap_or_else(|| s.to_string()))
            .collect();
        if ids.is_empty() {
            bail!("정렬 순서가 비어 있습니다");
        }
        store::save_sort_order(&ids)?;
        println!("{}", format!("정렬 순서 저장: {}명", ids.len()).green());
    }

    let dataset = store::load_dataset();
    if dataset.records.is_empty() {
        if cli.upload.is_none() {
            println!("{}", "저장된 작업 데이터가 없습니다. --upload로 시작하세요.".dimmed());
        }
        return Ok(());
    }

    if cli.debug {
        if let Some(stamp) = &dataset.work_stamp {
            eprintln!("[DEBUG] Dataset stamp: {stamp} (uploaded {})", dataset.uploaded_at);
        }
    }

    let primary = store::load_primary_roster();
    let override_roster = store::load_override_roster();
    let sort_order = store::load_sort_order();

    let ctx = AggregationContext::build(
        &dataset.records,
        &primary,
        &override_roster,
        &sort_order,
        &config,
        cli.debug,
    );

    if let Some(hour) = cli.hour {
        if hour >= buckets::CALENDAR_HOURS {
            bail!("시간은 0-23 범위여야 합니다: {hour}");
        }
        let matrix = report::build_location_matrix(&dataset.records, &ctx, &config, hour);
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&matrix)?);
        } else {
            report::print_location_matrix(&matrix);
        }
    } else if cli.hourly {
        let points = report::build_hourly_series(&ctx, &config);
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&points)?);
        } else {
            report::print_hourly_series(&points);
        }
    } else {
        let full = report::build_report(&ctx, &config);
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&full)?);
        } else {
            report::print_report(&full);
        }
    }

    Ok(())
}
