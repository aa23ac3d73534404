use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::buckets::DayBuckets;
use crate::config::Config;
use crate::ingest::{TaskRecord, UNKNOWN_DATE};
use crate::roster::{merge_rosters, ResolvedWorker, RosterEntry, RosterSource};
use crate::shiftwin::ShiftWindow;

/// Everything one report pass needs, rebuilt wholesale per request: the
/// per-worker-per-date buckets, the merged worker lookup, and the saved
/// ordering. No state survives between passes.
pub struct AggregationContext {
    pub buckets: HashMap<String, BTreeMap<String, DayBuckets>>,
    pub workers: HashMap<String, ResolvedWorker>,
    pub sort_rank: HashMap<String, usize>,
    /// Distinct known work dates, ascending. The unknown sentinel never
    /// participates in date selection.
    pub dates: Vec<String>,
}

impl AggregationContext {
    pub fn build(
        records: &[TaskRecord],
        primary: &[RosterEntry],
        overrides: &[RosterEntry],
        sort_order: &[String],
        config: &Config,
        debug: bool,
    ) -> Self {
        let mut buckets: HashMap<String, BTreeMap<String, DayBuckets>> = HashMap::new();
        let mut dates: BTreeSet<String> = BTreeSet::new();

        for record in records {
            if record.process_task != config.metrics.stow_task {
                continue;
            }

            if record.date != UNKNOWN_DATE {
                dates.insert(record.date.clone());
            }

            buckets
                .entry(record.employee_id.clone())
                .or_default()
                .entry(record.date.clone())
                .or_default()
                .add_task(
                    record.htp_start,
                    record.htp_end,
                    record.unit_qty,
                    record.hour_of_work_date,
                );
        }

        let sort_rank = sort_order
            .iter()
            .enumerate()
            .map(|(rank, id)| (id.clone(), rank))
            .collect();

        if debug {
            eprintln!(
                "[DEBUG] Aggregated {} workers over {} dates",
                buckets.len(),
                dates.len()
            );
        }

        Self {
            buckets,
            workers: merge_rosters(primary, overrides),
            sort_rank,
            dates: dates.into_iter().collect(),
        }
    }

    pub fn latest_date(&self) -> Option<&str> {
        self.dates.last().map(String::as_str)
    }

    pub fn previous_date(&self) -> Option<&str> {
        let n = self.dates.len();
        if n >= 2 { Some(&self.dates[n - 2]) } else { None }
    }

    pub fn day_buckets(&self, employee_id: &str, date: &str) -> Option<&DayBuckets> {
        self.buckets.get(employee_id).and_then(|by_date| by_date.get(date))
    }

    pub fn worker_source(&self, employee_id: &str) -> RosterSource {
        self.workers
            .get(employee_id)
            .map(|w| w.source)
            .unwrap_or(RosterSource::Primary)
    }

    pub fn worker_window(&self, employee_id: &str) -> Option<ShiftWindow> {
        self.workers.get(employee_id).and_then(|w| w.entry.window())
    }

    /// Roster name, or the placeholder for workers only seen in task data.
    pub fn display_name(&self, employee_id: &str, config: &Config) -> String {
        self.workers
            .get(employee_id)
            .map(|w| w.entry.display_name.clone())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| config.labels.unknown_worker.clone())
    }

    /// Report order: primary-roster workers before override-roster workers,
    /// saved explicit order within a partition, alphabetical ID as the tail
    /// tiebreak.
    pub fn order_workers(&self, ids: &mut Vec<String>) {
        ids.sort_by_key(|id| {
            let partition = match self.worker_source(id) {
                RosterSource::Primary => 0u8,
                RosterSource::Override => 1u8,
            };
            let rank = self.sort_rank.get(id).copied().unwrap_or(usize::MAX);
            (partition, rank, id.clone())
        });
    }
}

/// Location-keyed variant of the bucket fold, backing the per-hour location
/// matrix. Missing locations land in the uncategorized bucket.
pub fn build_location_buckets(
    records: &[TaskRecord],
    config: &Config,
) -> HashMap<String, HashMap<String, BTreeMap<String, DayBuckets>>> {
    let mut buckets: HashMap<String, HashMap<String, BTreeMap<String, DayBuckets>>> =
        HashMap::new();

    for record in records {
        if record.process_task != config.metrics.stow_task {
            continue;
        }

        let location = record
            .location
            .clone()
            .unwrap_or_else(|| config.labels.uncategorized_location.clone());

        buckets
            .entry(record.employee_id.clone())
            .or_default()
            .entry(location)
            .or_default()
            .entry(record.date.clone())
            .or_default()
            .add_task(
                record.htp_start,
                record.htp_end,
                record.unit_qty,
                record.hour_of_work_date,
            );
    }

    buckets
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, date: &str, task: &str, qty: f64, start: &str, end: &str) -> TaskRecord {
        TaskRecord {
            employee_id: id.to_string(),
            date: date.to_string(),
            process_task: task.to_string(),
            unit_qty: qty,
            htp_start: crate::timeutil::to_seconds(start),
            htp_end: crate::timeutil::to_seconds(end),
            location: None,
            hour_of_work_date: None,
        }
    }

    fn roster(id: &str, name: &str) -> RosterEntry {
        RosterEntry {
            employee_id: id.to_string(),
            display_name: name.to_string(),
            shift_label: String::new(),
            shift_start: None,
            shift_end: None,
        }
    }

    #[test]
    fn test_only_stow_tasks_aggregate() {
        let records = vec![
            record("12345678", "2024-01-10", "STOW(STOW)", 100.0, "09:00:00", "10:00:00"),
            record("12345678", "2024-01-10", "PICK(PICK)", 40.0, "10:00:00", "11:00:00"),
        ];
        let ctx = AggregationContext::build(&records, &[], &[], &[], &Config::default(), false);

        let b = ctx.day_buckets("12345678", "2024-01-10").unwrap();
        assert_eq!(b.total_qty, 100.0);
        assert_eq!(b.total_mh, 1.0);
    }

    #[test]
    fn test_date_selection_skips_unknown() {
        let records = vec![
            record("12345678", "2024-01-09", "STOW(STOW)", 1.0, "09:00:00", "10:00:00"),
            record("12345678", "2024-01-10", "STOW(STOW)", 1.0, "09:00:00", "10:00:00"),
            record("12345678", UNKNOWN_DATE, "STOW(STOW)", 1.0, "09:00:00", "10:00:00"),
        ];
        let ctx = AggregationContext::build(&records, &[], &[], &[], &Config::default(), false);

        assert_eq!(ctx.latest_date(), Some("2024-01-10"));
        assert_eq!(ctx.previous_date(), Some("2024-01-09"));
        // Unknown-dated work is still held, just never selected for reports.
        assert!(ctx.day_buckets("12345678", UNKNOWN_DATE).is_some());
    }

    #[test]
    fn test_unrostered_worker_gets_placeholder() {
        let config = Config::default();
        let ctx = AggregationContext::build(&[], &[], &[], &[], &config, false);
        assert_eq!(ctx.display_name("99999999", &config), config.labels.unknown_worker);
    }

    #[test]
    fn test_order_partitions_then_rank_then_id() {
        let primary = vec![roster("30000000", "P1"), roster("10000000", "P2")];
        let overrides = vec![roster("20000000", "O1")];
        let sort_order = vec!["30000000".to_string()];
        let ctx = AggregationContext::build(
            &[],
            &primary,
            &overrides,
            &sort_order,
            &Config::default(),
            false,
        );

        let mut ids = vec![
            "10000000".to_string(),
            "20000000".to_string(),
            "30000000".to_string(),
        ];
        ctx.order_workers(&mut ids);

        // Ranked primary first, then alphabetical primary, then overrides.
        assert_eq!(ids, ["30000000", "10000000", "20000000"]);
    }

    #[test]
    fn test_location_buckets_uncategorized() {
        let config = Config::default();
        let mut r = record("12345678", "2024-01-10", "STOW(STOW)", 10.0, "09:00:00", "10:00:00");
        r.location = None;
        let buckets = build_location_buckets(&[r], &config);

        let by_loc = &buckets["12345678"];
        assert!(by_loc.contains_key(&config.labels.uncategorized_location));
    }
}
