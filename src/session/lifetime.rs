//! Human-readable token lifetimes such as `"60m"`, `"7h"` or `"1d"`.

use chrono::{DateTime, Duration, Utc};

/// Lifetime, in seconds, used when the configured string is not understood.
pub const FALLBACK_LIFETIME_SECS: i64 = 86_400;

fn fallback() -> Duration {
    Duration::seconds(FALLBACK_LIFETIME_SECS)
}

/// Parses `<n>s`, `<n>m`, `<n>h` or `<n>d` into a duration.
///
/// Anything else, including a missing or non-numeric amount, yields
/// one day rather than an error.
pub fn parse_lifetime(input: &str) -> Duration {
    let input = input.trim();
    let Some(unit) = input.chars().last() else {
        return fallback();
    };
    let amount = &input[..input.len() - unit.len_utf8()];

    let Ok(amount) = amount.parse::<i64>() else {
        return fallback();
    };
    if amount < 0 {
        return fallback();
    }

    let parsed = match unit {
        's' => Duration::try_seconds(amount),
        'm' => Duration::try_minutes(amount),
        'h' => Duration::try_hours(amount),
        'd' => Duration::try_days(amount),
        _ => None,
    };

    parsed.unwrap_or_else(fallback)
}

/// The absolute instant a token issued at `now` with the given lifetime expires.
pub fn expiry_from(input: &str, now: DateTime<Utc>) -> DateTime<Utc> {
    now.checked_add_signed(parse_lifetime(input))
        .or_else(|| now.checked_add_signed(fallback()))
        .unwrap_or(now)
}
