//! Human-readable byte sizes ("2GB", "500MB").

use thiserror::Error;

const KB: u64 = 1024;
const MB: u64 = 1024 * KB;
const GB: u64 = 1024 * MB;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid size '{input}' - expected format like '2GB', '500MB', or '1024KB'")]
pub struct SizeParseError {
    input: String,
}

impl SizeParseError {
    fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }
}

/// Parses a size with an optional K/KB, M/MB or G/GB suffix (case
/// insensitive, binary units). A bare number is bytes.
pub fn parse_size(s: &str) -> Result<u64, SizeParseError> {
    let trimmed = s.trim();
    let upper = trimmed.to_ascii_uppercase();

    let (digits, multiplier) = [("GB", GB), ("G", GB), ("MB", MB), ("M", MB), ("KB", KB), ("K", KB)]
        .iter()
        .find_map(|(suffix, mult)| {
            upper
                .strip_suffix(suffix)
                .map(|rest| (rest.trim().to_string(), *mult))
        })
        .unwrap_or((upper.clone(), 1));

    let num: u64 = digits.parse().map_err(|_| SizeParseError::new(s))?;
    num.checked_mul(multiplier)
        .ok_or_else(|| SizeParseError::new(s))
}

/// Formats bytes with the largest fitting unit and one decimal place
/// when the value is not a whole multiple.
pub fn format_size(bytes: u64) -> String {
    let (unit, name) = if bytes >= GB {
        (GB, "GB")
    } else if bytes >= MB {
        (MB, "MB")
    } else if bytes >= KB {
        (KB, "KB")
    } else {
        return format!("{}B", bytes);
    };

    if bytes % unit == 0 {
        format!("{}{}", bytes / unit, name)
    } else {
        format!("{:.1}{}", bytes as f64 / unit as f64, name)
    }
}
