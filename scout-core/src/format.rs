use alloy_primitives::U256;
use chrono::{DateTime, NaiveDateTime, Utc};

pub const UNKNOWN: &str = "Unknown";

/// Decimals of the chain's native currency.
pub const NATIVE_DECIMALS: u32 = 18;
/// Fraction digits shown for native-currency values.
pub const NATIVE_DISPLAY_DIGITS: u32 = 6;
/// Upper bound on fraction digits shown for token amounts.
pub const TOKEN_MAX_DISPLAY_DIGITS: u32 = 6;

const MINUTES_PER_HOUR: i64 = 60;
const MINUTES_PER_DAY: i64 = 1_440;

/// Parses explorer timestamps: RFC 3339 with offset, or a naive
/// `YYYY-MM-DDTHH:MM:SS[.f]` taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

fn plural(count: i64, unit: &str) -> String {
    if count == 1 {
        format!("{} {} ago", count, unit)
    } else {
        format!("{} {}s ago", count, unit)
    }
}

/// `"N min(s) ago"` under an hour, `"N hour(s) ago"` under a day, otherwise
/// `"N day(s) ago"`. Counts are floored; timestamps ahead of `now` read as
/// zero minutes.
pub fn relative_time(timestamp: &str, now: DateTime<Utc>) -> String {
    let Some(ts) = parse_timestamp(timestamp) else {
        return UNKNOWN.to_string();
    };
    let minutes = (now - ts).num_minutes().max(0);
    if minutes < MINUTES_PER_HOUR {
        plural(minutes, "min")
    } else if minutes < MINUTES_PER_DAY {
        plural(minutes / MINUTES_PER_HOUR, "hour")
    } else {
        plural(minutes / MINUTES_PER_DAY, "day")
    }
}

/// Converts a base-unit amount to display units with exactly `frac_digits`
/// fraction digits, rounding half up. `None` when `raw` is not a number.
pub fn format_units(raw: &str, decimals: u32, frac_digits: u32) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if raw.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(value) = U256::from_str_radix(raw, 10) {
            if let Some(out) = scale_exact(value, decimals, frac_digits) {
                return Some(out);
            }
        }
    }
    let value = raw.parse::<f64>().ok().filter(|v| v.is_finite())?;
    Some(scale_float(value, decimals, frac_digits))
}

fn scale_exact(value: U256, decimals: u32, frac_digits: u32) -> Option<String> {
    let ten = U256::from(10u8);
    let scaled = if frac_digits >= decimals {
        let factor = ten.checked_pow(U256::from(frac_digits - decimals))?;
        value.checked_mul(factor)?
    } else {
        let divisor = ten.checked_pow(U256::from(decimals - frac_digits))?;
        let (quot, rem) = value.div_rem(divisor);
        if rem >= divisor - rem {
            quot + U256::from(1u8)
        } else {
            quot
        }
    };
    if frac_digits == 0 {
        return Some(scaled.to_string());
    }
    let unit = ten.checked_pow(U256::from(frac_digits))?;
    let (int_part, frac_part) = scaled.div_rem(unit);
    Some(format!(
        "{}.{:0>width$}",
        int_part,
        frac_part.to_string(),
        width = frac_digits as usize
    ))
}

fn scale_float(value: f64, decimals: u32, frac_digits: u32) -> String {
    let scaled = value / 10f64.powi(decimals.min(i32::MAX as u32) as i32);
    format!("{:.*}", frac_digits as usize, scaled)
}

/// Native-currency value with its unit, e.g. `"1.500000 PAS"`.
pub fn format_native(raw: &str, symbol: &str) -> String {
    let amount = format_units(raw, NATIVE_DECIMALS, NATIVE_DISPLAY_DIGITS)
        .unwrap_or_else(|| "0".to_string());
    with_unit(amount, symbol)
}

/// Token amount shown with `min(decimals, 6)` fraction digits.
pub fn format_token_amount(raw: &str, decimals: u32) -> Option<String> {
    format_units(raw, decimals, decimals.min(TOKEN_MAX_DISPLAY_DIGITS))
}

pub fn with_unit(amount: String, symbol: &str) -> String {
    let symbol = symbol.trim();
    if symbol.is_empty() {
        amount
    } else {
        format!("{} {}", amount, symbol)
    }
}

/// Keeps the first `head` and last `tail` characters around `...`. Strings
/// too short to shorten come back unchanged.
pub fn truncate_middle(value: &str, head: usize, tail: usize) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= head + tail {
        return value.to_string();
    }
    let start: String = chars[..head].iter().collect();
    let end: String = chars[chars.len() - tail..].iter().collect();
    format!("{}...{}", start, end)
}

/// Table form of a hash or address: `0x1234ab...abcdef`.
pub fn short_hash(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.is_empty() => truncate_middle(v, 8, 6),
        _ => UNKNOWN.to_string(),
    }
}

/// Card form of an owner address: `0x67A7...A5E7`.
pub fn short_address(value: &str) -> String {
    truncate_middle(value, 6, 4)
}

/// First `len` characters followed by `...`.
pub fn preview(value: &str, len: usize) -> String {
    let head: String = value.chars().take(len).collect();
    format!("{}...", head)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn ago(now: DateTime<Utc>, minutes: i64) -> String {
        (now - Duration::minutes(minutes)).to_rfc3339()
    }

    #[test]
    fn relative_time_buckets() {
        let now = Utc::now();
        assert_eq!(relative_time(&ago(now, 45), now), "45 mins ago");
        assert_eq!(relative_time(&ago(now, 1), now), "1 min ago");
        assert_eq!(relative_time(&ago(now, 0), now), "0 mins ago");
        assert_eq!(relative_time(&ago(now, 90), now), "1 hour ago");
        assert_eq!(relative_time(&ago(now, 150), now), "2 hours ago");
        assert_eq!(relative_time(&ago(now, 2 * 1_440), now), "2 days ago");
        assert_eq!(relative_time(&ago(now, 1_440 + 30), now), "1 day ago");
    }

    #[test]
    fn relative_time_floors_partial_minutes() {
        let now = Utc::now();
        let ts = (now - Duration::seconds(119)).to_rfc3339();
        assert_eq!(relative_time(&ts, now), "1 min ago");
    }

    #[test]
    fn relative_time_fallbacks() {
        let now = Utc::now();
        assert_eq!(relative_time("not a date", now), UNKNOWN);
        assert_eq!(relative_time("", now), UNKNOWN);
        let future = (now + Duration::minutes(10)).to_rfc3339();
        assert_eq!(relative_time(&future, now), "0 mins ago");
    }

    #[test]
    fn parses_explorer_timestamp_shapes() {
        let expected = parse_timestamp("2024-05-01T12:00:00Z").expect("rfc3339");
        assert_eq!(parse_timestamp("2024-05-01T12:00:00.000000Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-05-01T12:00:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-05-01T14:00:00+02:00"), Some(expected));
    }

    #[test]
    fn unit_conversion_exact() {
        assert_eq!(
            format_units("1000000000000000000", 18, 6).as_deref(),
            Some("1.000000")
        );
        assert_eq!(format_units("500", 2, 2).as_deref(), Some("5.00"));
        assert_eq!(format_units("0", 18, 6).as_deref(), Some("0.000000"));
        assert_eq!(format_units("42", 0, 0).as_deref(), Some("42"));
    }

    #[test]
    fn unit_conversion_rounds_half_up() {
        assert_eq!(format_units("1234567500000", 18, 6).as_deref(), Some("0.000001"));
        assert_eq!(format_units("1999999500000000000", 18, 6).as_deref(), Some("2.000000"));
        assert_eq!(format_units("1499999", 18, 6).as_deref(), Some("0.000000"));
    }

    #[test]
    fn unit_conversion_beyond_u64() {
        assert_eq!(
            format_units("123456789000000000000000000000", 18, 6).as_deref(),
            Some("123456789000.000000")
        );
    }

    #[test]
    fn unit_conversion_float_fallback_and_garbage() {
        assert_eq!(format_units("1e18", 18, 6).as_deref(), Some("1.000000"));
        assert_eq!(format_units("abc", 18, 6), None);
        assert_eq!(format_units("", 18, 6), None);
    }

    #[test]
    fn native_and_token_rendering() {
        assert_eq!(format_native("2500000000000000000", "PAS"), "2.500000 PAS");
        assert_eq!(format_native("garbage", "PAS"), "0 PAS");
        assert_eq!(format_token_amount("1234500", 6).as_deref(), Some("1.234500"));
        assert_eq!(format_token_amount("1500", 2).as_deref(), Some("15.00"));
        assert_eq!(
            format_token_amount("1000000000000000000", 18).as_deref(),
            Some("1.000000")
        );
    }

    #[test]
    fn truncation_helpers() {
        let hash = "0x2F1AEdd2D80806B0405b44021B0448a8f073f73b";
        assert_eq!(short_hash(Some(hash)), "0x2F1AEd...73f73b");
        assert_eq!(short_hash(None), UNKNOWN);
        assert_eq!(short_hash(Some("")), UNKNOWN);
        assert_eq!(short_hash(Some("0xabc")), "0xabc");
        assert_eq!(short_address(hash), "0x2F1A...f73b");
        assert_eq!(preview("0xddf252ad1be2c89b69c2b068fc378daa", 10), "0xddf252ad...");
    }
}
