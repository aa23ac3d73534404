use serde::{Deserialize, Serialize};

use crate::timeutil::duration_seconds;

pub const CALENDAR_HOURS: usize = 24;
pub const EXTENDED_SLOTS: usize = 33;
/// Last calendar hour mirrored into the extended 24-32 range.
pub const NIGHT_LAST_HOUR: usize = 8;

/// Segments can touch at most 25 hour boundaries for a sub-24h task;
/// anything past this means the input was malformed.
const MAX_SEGMENTS: usize = 26;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HourSlot {
    pub mh: f64,
    pub qty: f64,
}

/// Per (worker, date) accumulator over the 33-slot extended day.
///
/// Slots 0-23 are calendar hours; slots 24-32 duplicate hours 0-8 so a
/// date's late-night work can be read both under its own key and as the
/// "previous-day extension" of the next date. Totals cover slots 0-23 only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayBuckets {
    pub total_mh: f64,
    pub total_qty: f64,
    pub slots: Vec<HourSlot>,
}

impl Default for DayBuckets {
    fn default() -> Self {
        Self {
            total_mh: 0.0,
            total_qty: 0.0,
            slots: vec![HourSlot::default(); EXTENDED_SLOTS],
        }
    }
}

impl DayBuckets {
    /// Folds one task into the buckets.
    ///
    /// `hour_override` is the source system's pre-computed slot index; when
    /// present and in range it receives the whole contribution instead of the
    /// proportional split.
    pub fn add_task(&mut self, start: u32, end: u32, qty: f64, hour_override: Option<usize>) {
        let total = duration_seconds(start, end);
        let mh = total as f64 / 3600.0;

        // A task that spans no time contributes nothing, even when the
        // source system supplied a slot index for it.
        if total == 0 {
            return;
        }

        if let Some(idx) = hour_override {
            if idx < EXTENDED_SLOTS {
                self.total_mh += mh;
                self.total_qty += qty;
                add_mirrored(&mut self.slots, idx, mh, qty);
                return;
            }
        }

        self.total_mh += mh;
        self.total_qty += qty;
        distribute(&mut self.slots, start, end, qty);
    }
}

/// Splits one task across the hour buckets it spans, proportionally by
/// overlap. Quantity is conserved: the per-slot fractions sum to `qty`.
pub fn distribute(slots: &mut [HourSlot], start: u32, end: u32, qty: f64) {
    let total = duration_seconds(start, end);
    if total == 0 {
        return;
    }

    // Walk in calendar-hour-aligned segments; `end_abs` may pass 86400,
    // indexing wraps modulo 24.
    let end_abs = start + total;
    let mut current = start;
    let mut segments = 0;

    while current < end_abs && segments < MAX_SEGMENTS {
        let hour = (current / 3600) as usize;
        let boundary = (hour as u32 + 1) * 3600;
        let seg_end = boundary.min(end_abs);
        let seg = (seg_end - current) as f64;
        let ratio = seg / total as f64;

        add_mirrored(slots, hour % CALENDAR_HOURS, seg / 3600.0, qty * ratio);

        current = seg_end;
        segments += 1;
    }
}

/// Writes to one slot, keeping the 0-8 / 24-32 duplication in sync from
/// either side.
fn add_mirrored(slots: &mut [HourSlot], idx: usize, mh: f64, qty: f64) {
    slots[idx].mh += mh;
    slots[idx].qty += qty;

    if idx <= NIGHT_LAST_HOUR {
        slots[CALENDAR_HOURS + idx].mh += mh;
        slots[CALENDAR_HOURS + idx].qty += qty;
    } else if idx >= CALENDAR_HOURS {
        slots[idx - CALENDAR_HOURS].mh += mh;
        slots[idx - CALENDAR_HOURS].qty += qty;
    }
}
