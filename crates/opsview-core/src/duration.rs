//! Downtime duration parsing
//!
//! A duration is a whitespace separated list of `<count><unit>` tokens with
//! units `s`, `m`, `h`, `d` and `w`, e.g. `1h 30m`. The result is the sum of
//! all tokens.

use chrono::TimeDelta;

use crate::error::CoreError;

/// Parse a duration string such as `"2w"` or `"1h 30m"`
///
/// Input is matched case-insensitively. An empty string is a zero duration.
///
/// # Errors
/// Returns [`CoreError::InvalidDuration`] with the whole input if any token
/// has an unknown unit, a non-numeric count, or overflows.
pub fn parse_duration(duration: &str) -> Result<TimeDelta, CoreError> {
    let invalid = || CoreError::InvalidDuration(duration.to_string());

    duration
        .to_lowercase()
        .split_whitespace()
        .try_fold(TimeDelta::zero(), |total, token| {
            let token_delta = parse_token(token).ok_or_else(invalid)?;
            total.checked_add(&token_delta).ok_or_else(invalid)
        })
}

fn parse_token(token: &str) -> Option<TimeDelta> {
    let unit = token.chars().last()?;
    let count: i64 = token[..token.len() - unit.len_utf8()].parse().ok()?;

    match unit {
        's' => TimeDelta::try_seconds(count),
        'm' => TimeDelta::try_minutes(count),
        'h' => TimeDelta::try_hours(count),
        'd' => TimeDelta::try_days(count),
        'w' => TimeDelta::try_weeks(count),
        _ => None,
    }
}
