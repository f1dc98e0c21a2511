use crate::error::{BytesError, BytesResult};

const BINARY_UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];

/// Formats a byte count using binary units.
///
/// Plain bytes are printed without decimals; larger values use `precision`
/// decimal places.
///
/// # Example
///
/// ```
/// use npmpeek_utils::bytes::format_bytes;
///
/// assert_eq!(format_bytes(512, 1), "512 B");
/// assert_eq!(format_bytes(1536, 1), "1.5 KiB");
/// ```
pub fn format_bytes(bytes: u64, precision: usize) -> String {
    let mut value = bytes as f64;
    let mut idx = 0;

    while value >= 1024.0 && idx < BINARY_UNITS.len() - 1 {
        value /= 1024.0;
        idx += 1;
    }

    if idx == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.precision$} {}", BINARY_UNITS[idx])
    }
}

/// Parses a human-readable size such as `1MiB`, `512 KB` or `2048`.
///
/// Binary suffixes (`KiB`, `MiB`, ...) use powers of 1024, decimal suffixes
/// (`KB`, `MB`, ...) use powers of 1000. Suffixes are case-insensitive.
///
/// # Errors
///
/// * [`BytesError::ParseFailed`] if the number or the suffix is invalid.
pub fn parse_bytes(input: &str) -> BytesResult<u64> {
    let trimmed = input.trim();
    if let Ok(v) = trimmed.parse::<u64>() {
        return Ok(v);
    }

    let split_at = trimmed
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .ok_or_else(|| fail(input, "missing number"))?;
    let (number, suffix) = trimmed.split_at(split_at);
    let number: f64 = number
        .parse()
        .map_err(|_| fail(input, "invalid number"))?;

    let suffix = suffix.trim().to_uppercase();
    let (prefix, base) = match suffix.strip_suffix("IB") {
        Some(prefix) => (prefix.to_string(), 1024_f64),
        None => (suffix.trim_end_matches('B').to_string(), 1000_f64),
    };

    let exponent = match prefix.as_str() {
        "" => 0,
        "K" => 1,
        "M" => 2,
        "G" => 3,
        "T" => 4,
        _ => return Err(fail(input, "unknown suffix")),
    };

    Ok((number * base.powi(exponent)).round() as u64)
}

fn fail(input: &str, reason: &str) -> BytesError {
    BytesError::ParseFailed {
        input: input.to_string(),
        reason: reason.to_string(),
    }
}
