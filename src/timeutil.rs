pub const SECONDS_PER_DAY: u32 = 86_400;

/// Converts a raw time-of-day cell to seconds since midnight.
///
/// Spreadsheet exports carry times either as "HH:MM:SS" text or as a bare
/// number meaning fraction-of-day (0.5 = noon). Malformed input yields 0;
/// anything outside one day is malformed too (an Excel datetime serial like
/// "45301.5" is not a time of day).
pub fn to_seconds(raw: &str) -> u32 {
    let raw = raw.trim();
    if raw.is_empty() {
        return 0;
    }

    let seconds: u64 = if raw.contains(':') {
        let mut parts = raw.split(':');
        let mut component = |scale: u64| {
            parts
                .next()
                .and_then(|p| p.trim().parse::<u64>().ok())
                .unwrap_or(0)
                .saturating_mul(scale)
        };
        let h = component(3600);
        let m = component(60);
        let s = component(1);
        h.saturating_add(m).saturating_add(s)
    } else {
        match raw.parse::<f64>() {
            Ok(frac) if (0.0..1.0).contains(&frac) => (frac * SECONDS_PER_DAY as f64) as u64,
            _ => return 0,
        }
    };

    if seconds >= SECONDS_PER_DAY as u64 {
        0
    } else {
        seconds as u32
    }
}

/// Signed duration with midnight wraparound. Always in [0, 86400).
pub fn duration_seconds(start: u32, end: u32) -> u32 {
    let diff = end as i64 - start as i64;
    if diff < 0 {
        (diff + SECONDS_PER_DAY as i64) as u32
    } else {
        diff as u32
    }
}
