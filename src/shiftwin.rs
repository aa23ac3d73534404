/// Valid-hour window derived from a worker's declared shift times.
///
/// `None` start/end means the worker is unfiltered (every hour counts).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShiftWindow {
    pub start_hour: u32,
    pub end_hour: u32,
}

impl ShiftWindow {
    /// Builds a window from "HH:MM" strings. For a same-day shift an end
    /// time landing exactly on the hour excludes that hour (18:00 means work
    /// through 17:xx, 24:00 means through 23:xx); a wrapped shift keeps its
    /// floor end hour.
    pub fn parse(start: &str, end: &str) -> Option<Self> {
        let (start_hour, _) = parse_hhmm(start)?;
        let (mut end_hour, end_min) = parse_hhmm(end)?;
        if start_hour > 23 {
            return None;
        }

        if end_min == 0 && end_hour > 0 && start_hour < end_hour {
            end_hour -= 1;
        }

        Some(Self { start_hour, end_hour })
    }

    /// Whether calendar hour `h` (0-23) falls inside the shift. Windows where
    /// start > end wrap past midnight.
    pub fn contains(&self, h: u32) -> bool {
        if self.start_hour <= self.end_hour {
            self.start_hour <= h && h <= self.end_hour
        } else {
            h >= self.start_hour || h <= self.end_hour
        }
    }
}

/// Hour validity with the no-window default: absent shift times filter
/// nothing.
pub fn hour_is_valid(window: Option<&ShiftWindow>, h: u32) -> bool {
    match window {
        Some(w) => w.contains(h),
        None => true,
    }
}

fn parse_hhmm(raw: &str) -> Option<(u32, u32)> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let mut parts = raw.split(':');
    let h: u32 = parts.next()?.trim().parse().ok()?;
    let m: u32 = parts.next().and_then(|p| p.trim().parse().ok()).unwrap_or(0);
    // 24:00 is a legitimate end-of-day marker; anything past it is not.
    if h > 24 || m > 59 || (h == 24 && m != 0) {
        return None;
    }
    Some((h, m))
}
