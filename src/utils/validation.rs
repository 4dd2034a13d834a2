//! Centralized validation helpers.

use crate::core::types::{ABSENT_PART, FILE_STEM_DELIMITER, LABEL_DELIMITER};

/// Maximum number of reference sequences loaded into one table (memory protection)
pub const MAX_REFERENCE_SEQUENCES: usize = 1_000_000;

/// Maximum label length; labels end up in output file names
pub const MAX_LABEL_LENGTH: usize = 128;

/// Check whether a reference table holding `count` sequences would exceed the maximum.
///
/// Returns an error message if the limit is exceeded, None if safe.
///
/// # Example
/// ```
/// use adna_screen::utils::validation::{check_reference_limit, MAX_REFERENCE_SEQUENCES};
///
/// assert!(check_reference_limit(10).is_none());
/// assert!(check_reference_limit(MAX_REFERENCE_SEQUENCES + 1).is_some());
/// ```
#[must_use]
pub fn check_reference_limit(count: usize) -> Option<String> {
    if count > MAX_REFERENCE_SEQUENCES {
        Some(format!(
            "Too many reference sequences: {count} exceeds maximum of {MAX_REFERENCE_SEQUENCES}"
        ))
    } else {
        None
    }
}

/// Validate a reference label.
///
/// Labels are joined with `:` in read descriptions and with `.` in output file
/// names, so they must be non-empty and must not contain either delimiter,
/// whitespace, path separators or control characters. The absent-part
/// placeholder `unknown` is reserved in any case.
///
/// # Errors
///
/// Returns a message describing why the label was rejected.
pub fn validate_label(label: &str) -> Result<(), String> {
    if label.is_empty() {
        return Err("label is empty".to_string());
    }

    if label.len() > MAX_LABEL_LENGTH {
        return Err(format!("label exceeds {MAX_LABEL_LENGTH} characters"));
    }

    if label.contains(LABEL_DELIMITER) {
        return Err(format!("label contains the delimiter '{LABEL_DELIMITER}'"));
    }

    if label.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err("label contains whitespace or control characters".to_string());
    }

    if label.contains(FILE_STEM_DELIMITER) {
        return Err(format!("label contains the file name delimiter '{FILE_STEM_DELIMITER}'"));
    }

    if label.eq_ignore_ascii_case(ABSENT_PART) {
        return Err(format!("label '{ABSENT_PART}' is reserved for unmatched reads"));
    }

    // Prevent directory traversal through output file names
    if label.contains('/') || label.contains('\\') {
        return Err("label contains a path separator".to_string());
    }

    Ok(())
}

/// Validate an output file suffix such as `.fq` or `.fastq`.
///
/// # Errors
///
/// Returns a message if the suffix contains a path separator, `..`, or
/// control characters.
pub fn validate_suffix(suffix: &str) -> Result<(), String> {
    if suffix.contains("..") || suffix.contains('/') || suffix.contains('\\') {
        return Err(format!("invalid output suffix '{suffix}'"));
    }
    if suffix.chars().any(char::is_control) {
        return Err("output suffix contains control characters".to_string());
    }
    Ok(())
}
