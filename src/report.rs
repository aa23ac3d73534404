use colored::*;
use serde::Serialize;
use std::collections::BTreeSet;
use tabled::builder::Builder;
use tabled::settings::{object::Columns, Alignment, Modify, Style};
use unicode_width::UnicodeWidthStr;

use crate::aggregate::{build_location_buckets, AggregationContext};
use crate::buckets::{CALENDAR_HOURS, NIGHT_LAST_HOUR};
use crate::config::Config;
use crate::ingest::TaskRecord;
use crate::roster::RosterSource;
use crate::shiftwin::hour_is_valid;

#[derive(Debug, Clone, Serialize)]
pub struct SectionRow {
    pub display_name: String,
    pub employee_id: String,
    pub total_mh: f64,
    pub total_qty: f64,
    pub total_ratio: f64,
    pub per_hour_ratio: Vec<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Section {
    pub date: Option<String>,
    /// Calendar hours the section covers, in display order.
    pub hours: Vec<usize>,
    pub rows: Vec<SectionRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HourPoint {
    pub label: String,
    pub hour: usize,
    pub mh: f64,
    pub qty: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LocationRow {
    pub display_name: String,
    pub employee_id: String,
    pub qty_by_location: Vec<f64>,
    pub total: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LocationMatrix {
    pub hour: usize,
    pub date: Option<String>,
    pub locations: Vec<String>,
    pub rows: Vec<LocationRow>,
    pub column_totals: Vec<f64>,
    pub grand_total: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub day: Section,
    pub night: Section,
    pub hourly: Vec<HourPoint>,
}

fn safe_ratio(qty: f64, mh: f64) -> f64 {
    if mh > 0.0 { qty / mh } else { 0.0 }
}

/// Which (date, slot index) a worker's metrics for calendar hour `h` come
/// from. Night hours of override-roster workers read the previous date's
/// extended slots; everyone else reads the latest date directly.
fn slot_for_hour<'a>(
    ctx: &'a AggregationContext,
    source: RosterSource,
    h: usize,
) -> Option<(&'a str, usize)> {
    if h <= NIGHT_LAST_HOUR && source == RosterSource::Override {
        Some((ctx.previous_date()?, CALENDAR_HOURS + h))
    } else {
        Some((ctx.latest_date()?, h))
    }
}

fn build_section(ctx: &AggregationContext, config: &Config, hours: &[usize]) -> Section {
    let mut rows = Vec::new();
    let mut ids: Vec<String> = ctx.buckets.keys().cloned().collect();
    ctx.order_workers(&mut ids);

    for id in &ids {
        let source = ctx.worker_source(id);
        let window = ctx.worker_window(id);

        let mut total_mh = 0.0;
        let mut total_qty = 0.0;
        let mut per_hour_ratio = Vec::with_capacity(hours.len());
        let mut any_valid = false;

        for &h in hours {
            if !hour_is_valid(window.as_ref(), h as u32) {
                per_hour_ratio.push(0.0);
                continue;
            }
            any_valid = true;

            let slot = slot_for_hour(ctx, source, h)
                .and_then(|(date, idx)| ctx.day_buckets(id, date).map(|b| b.slots[idx]));
            let Some(slot) = slot else {
                per_hour_ratio.push(0.0);
                continue;
            };

            total_mh += slot.mh;
            total_qty += slot.qty;
            per_hour_ratio.push(safe_ratio(slot.qty, slot.mh));
        }

        if !any_valid || total_mh <= 0.0 {
            continue;
        }

        rows.push(SectionRow {
            display_name: ctx.display_name(id, config),
            employee_id: id.clone(),
            total_mh,
            total_qty,
            total_ratio: safe_ratio(total_qty, total_mh),
            per_hour_ratio,
        });
    }

    Section {
        date: ctx.latest_date().map(str::to_string),
        hours: hours.to_vec(),
        rows,
    }
}

pub fn build_day_section(ctx: &AggregationContext, config: &Config) -> Section {
    let hours: Vec<usize> =
        (config.metrics.day_first_hour..=config.metrics.day_last_hour).collect();
    build_section(ctx, config, &hours)
}

pub fn build_night_section(ctx: &AggregationContext, config: &Config) -> Section {
    let hours: Vec<usize> = (0..=NIGHT_LAST_HOUR).collect();
    build_section(ctx, config, &hours)
}

/// 24 chart points starting at the configured first hour ("09시".."08시").
pub fn build_hourly_series(ctx: &AggregationContext, config: &Config) -> Vec<HourPoint> {
    let ids: Vec<String> = ctx.buckets.keys().cloned().collect();
    let mut points = Vec::with_capacity(CALENDAR_HOURS);

    for offset in 0..CALENDAR_HOURS {
        let h = (config.metrics.series_first_hour + offset) % CALENDAR_HOURS;
        let mut mh = 0.0;
        let mut qty = 0.0;

        for id in &ids {
            let window = ctx.worker_window(id);
            if !hour_is_valid(window.as_ref(), h as u32) {
                continue;
            }
            let source = ctx.worker_source(id);
            if let Some(slot) = slot_for_hour(ctx, source, h)
                .and_then(|(date, idx)| ctx.day_buckets(id, date).map(|b| b.slots[idx]))
            {
                mh += slot.mh;
                qty += slot.qty;
            }
        }

        points.push(HourPoint {
            label: format!("{h:02}시"),
            hour: h,
            mh,
            qty,
        });
    }

    points
}

/// (worker x location) quantity sums for one calendar hour.
pub fn build_location_matrix(
    records: &[TaskRecord],
    ctx: &AggregationContext,
    config: &Config,
    hour: usize,
) -> LocationMatrix {
    let buckets = build_location_buckets(records, config);

    let locations: Vec<String> = buckets
        .values()
        .flat_map(|by_loc| by_loc.keys().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut ids: Vec<String> = buckets.keys().cloned().collect();
    ctx.order_workers(&mut ids);

    let mut rows = Vec::new();
    let mut column_totals = vec![0.0; locations.len()];
    let mut grand_total = 0.0;

    for id in &ids {
        let window = ctx.worker_window(id);
        if !hour_is_valid(window.as_ref(), hour as u32) {
            continue;
        }
        let source = ctx.worker_source(id);
        let Some((date, idx)) = slot_for_hour(ctx, source, hour) else {
            continue;
        };

        let by_loc = &buckets[id];
        let mut qty_by_location = vec![0.0; locations.len()];
        let mut total = 0.0;

        for (col, loc) in locations.iter().enumerate() {
            let qty = by_loc
                .get(loc)
                .and_then(|by_date| by_date.get(date))
                .map(|b| b.slots[idx].qty)
                .unwrap_or(0.0);
            qty_by_location[col] = qty;
            total += qty;
        }

        if total <= 0.0 {
            continue;
        }

        for (col, qty) in qty_by_location.iter().enumerate() {
            column_totals[col] += qty;
        }
        grand_total += total;

        rows.push(LocationRow {
            display_name: ctx.display_name(id, config),
            employee_id: id.clone(),
            qty_by_location,
            total,
        });
    }

    LocationMatrix {
        hour,
        date: ctx.latest_date().map(str::to_string),
        locations,
        rows,
        column_totals,
        grand_total,
    }
}

pub fn build_report(ctx: &AggregationContext, config: &Config) -> Report {
    Report {
        day: build_day_section(ctx, config),
        night: build_night_section(ctx, config),
        hourly: build_hourly_series(ctx, config),
    }
}

pub fn print_report(report: &Report) {
    let date_str = report.day.date.as_deref().unwrap_or("데이터 없음");

    println!();
    println!("{}", format!("📊 주간 생산성 ({date_str})").cyan().bold());
    println!();
    print_section_table(&report.day);
    println!();

    println!("{}", "🌙 야간 생산성 (00~08시)".cyan().bold());
    println!();
    print_section_table(&report.night);
    println!();
}

fn print_section_table(section: &Section) {
    if section.rows.is_empty() {
        println!("{}", "해당 구간에 작업 기록이 없습니다.".dimmed());
        return;
    }

    let mut builder = Builder::default();

    let mut header: Vec<String> = vec![
        "작업자".to_string(),
        "ID".to_string(),
        "MH".to_string(),
        "Qty".to_string(),
        "생산성".to_string(),
    ];
    header.extend(section.hours.iter().map(|h| format!("{h:02}시")));
    builder.push_record(header);

    for row in &section.rows {
        let mut cells = vec![
            row.display_name.clone(),
            row.employee_id.clone(),
            format!("{:.2}", row.total_mh),
            format!("{:.0}", row.total_qty),
            format!("{:.1}", row.total_ratio),
        ];
        cells.extend(row.per_hour_ratio.iter().map(|r| {
            if *r > 0.0 { format!("{r:.1}") } else { "-".to_string() }
        }));
        builder.push_record(cells);
    }

    let table = builder
        .build()
        .with(Style::rounded())
        .with(Modify::new(Columns::new(2..)).with(Alignment::right()))
        .to_string();

    println!("{table}");
}

pub fn print_hourly_series(points: &[HourPoint]) {
    println!();
    println!("{}", "⏱  시간대별 물량".cyan().bold());
    println!();

    let max_qty = points.iter().map(|p| p.qty).fold(0.0_f64, f64::max);
    let label_width = points.iter().map(|p| p.label.width()).max().unwrap_or(0);

    for p in points {
        let pad = " ".repeat(label_width.saturating_sub(p.label.width()));
        let bar_len = if max_qty > 0.0 {
            ((p.qty / max_qty) * 40.0).round() as usize
        } else {
            0
        };
        let bar = "█".repeat(bar_len);
        println!(
            "  {}{} {} {}",
            pad,
            p.label,
            bar.blue(),
            format!("{:.0}", p.qty).dimmed()
        );
    }
    println!();
}

pub fn print_location_matrix(matrix: &LocationMatrix) {
    println!();
    println!(
        "{}",
        format!("📍 위치별 현황 ({:02}시)", matrix.hour).cyan().bold()
    );
    println!();

    if matrix.rows.is_empty() {
        println!("{}", "해당 시간대에 작업 기록이 없습니다.".dimmed());
        return;
    }

    let mut builder = Builder::default();

    let mut header: Vec<String> = vec!["작업자".to_string(), "ID".to_string()];
    header.extend(matrix.locations.iter().cloned());
    header.push("합계".to_string());
    builder.push_record(header);

    for row in &matrix.rows {
        let mut cells = vec![row.display_name.clone(), row.employee_id.clone()];
        cells.extend(row.qty_by_location.iter().map(|q| {
            if *q > 0.0 { format!("{q:.0}") } else { "-".to_string() }
        }));
        cells.push(format!("{:.0}", row.total));
        builder.push_record(cells);
    }

    let mut totals: Vec<String> = vec!["합계".to_string(), String::new()];
    totals.extend(matrix.column_totals.iter().map(|q| format!("{q:.0}")));
    totals.push(format!("{:.0}", matrix.grand_total));
    builder.push_record(totals);

    let table = builder
        .build()
        .with(Style::rounded())
        .with(Modify::new(Columns::new(2..)).with(Alignment::right()))
        .to_string();

    println!("{table}");
    println!();
}
