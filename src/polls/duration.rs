use std::time::Duration;

pub const DEFAULT_POLL_DURATION: Duration = Duration::from_secs(5 * 60);

/// Parses durations such as `90s`, `5m`, `2h` or `1h30m`. Missing,
/// malformed or zero-length input falls back to [`DEFAULT_POLL_DURATION`].
pub fn parse_duration(input: Option<&str>) -> Duration {
    input
        .and_then(parse_strict)
        .filter(|d| !d.is_zero())
        .unwrap_or(DEFAULT_POLL_DURATION)
}

fn parse_strict(input: &str) -> Option<Duration> {
    let compact: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return None;
    }

    let mut total: u64 = 0;
    let mut rest = compact.as_str();
    while !rest.is_empty() {
        let digits = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        if digits == 0 {
            return None;
        }
        let value: u64 = rest[..digits].parse().ok()?;
        rest = &rest[digits..];

        let unit_len = rest.find(|c: char| c.is_ascii_digit()).unwrap_or(rest.len());
        let unit = rest[..unit_len].to_ascii_lowercase();
        rest = &rest[unit_len..];

        let scale = match unit.as_str() {
            "s" | "sec" | "secs" => 1,
            "m" | "min" | "mins" => 60,
            "h" | "hr" | "hrs" => 60 * 60,
            "d" | "day" | "days" => 24 * 60 * 60,
            "w" => 7 * 24 * 60 * 60,
            _ => return None,
        };
        total = total.checked_add(value.checked_mul(scale)?)?;
    }

    Some(Duration::from_secs(total))
}
