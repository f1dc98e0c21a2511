use std::time::Duration;

use crate::error::{DurationError, DurationResult};

/// Parses a compact duration string such as `30s`, `10m`, `1h30m` or `1d`.
///
/// Each component is a run of digits followed by one of `s`, `m`, `h` or `d`.
/// Components may repeat and are summed. Whitespace around the input is
/// ignored.
///
/// # Errors
///
/// * [`DurationError::ParseFailed`] on an empty input, a number without a
///   unit, an unknown unit, or overflow.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use npmpeek_utils::time::parse_duration;
///
/// assert_eq!(parse_duration("1h30m").unwrap(), Duration::from_secs(5400));
/// ```
pub fn parse_duration(input: &str) -> DurationResult<Duration> {
    let fail = || DurationError::ParseFailed {
        input: input.to_string(),
    };

    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(fail());
    }

    let mut total: u64 = 0;
    let mut number = String::new();

    for c in trimmed.chars() {
        if c.is_ascii_digit() {
            number.push(c);
            continue;
        }

        let value: u64 = number.parse().map_err(|_| fail())?;
        number.clear();

        let multiplier = match c {
            's' => 1,
            'm' => 60,
            'h' => 60 * 60,
            'd' => 24 * 60 * 60,
            _ => return Err(fail()),
        };

        total = value
            .checked_mul(multiplier)
            .and_then(|secs| total.checked_add(secs))
            .ok_or_else(fail)?;
    }

    if !number.is_empty() {
        return Err(fail());
    }

    Ok(Duration::from_secs(total))
}
