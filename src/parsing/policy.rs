use std::path::Path;

use crate::alignment::clipper::{ClipPolicy, ClipPolicyTable};
use crate::core::types::ClipMode;
use crate::parsing::ParseError;

/// Parse a per-read-group clip policy file
///
/// # Errors
///
/// Returns `ParseError::Io` if the file cannot be read, or other parse errors
/// if the content is invalid.
pub fn parse_policy_file(path: &Path, default: ClipPolicy) -> Result<ClipPolicyTable, ParseError> {
    let content = std::fs::read_to_string(path)?;
    parse_policy_text(&content, default)
}

/// Parse TSV text with columns: read group, clip length, mode (`soft` or `hard`)
///
/// Blank lines and `#` comments are skipped; a first line starting with
/// `read_group` or `rg` is treated as a header.
///
/// # Errors
///
/// Returns `ParseError::InvalidFormat` if a line does not have three fields, has an
/// invalid length or mode, or repeats a read group.
pub fn parse_policy_text(text: &str, default: ClipPolicy) -> Result<ClipPolicyTable, ParseError> {
    let mut table = ClipPolicyTable::new(default);
    let mut first_data_line = true;

    for (i, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line.split('\t').map(str::trim).collect();

        if first_data_line {
            first_data_line = false;
            let first = fields.first().map(|s| s.to_lowercase()).unwrap_or_default();
            if first == "read_group" || first == "rg" {
                continue;
            }
        }

        let line_num = i + 1;

        let [read_group, length, mode] = fields.as_slice() else {
            return Err(ParseError::InvalidFormat(format!(
                "Line {line_num} must have 3 tab-separated fields, found {}",
                fields.len()
            )));
        };

        let length: usize = length.parse().map_err(|_| {
            ParseError::InvalidFormat(format!("Invalid clip length on line {line_num}: '{length}'"))
        })?;
        let mode = match mode.to_lowercase().as_str() {
            "soft" => ClipMode::Soft,
            "hard" => ClipMode::Hard,
            other => {
                return Err(ParseError::InvalidFormat(format!(
                    "Invalid clip mode on line {line_num}: '{other}' (expected soft or hard)"
                )))
            }
        };

        table
            .insert(read_group, ClipPolicy { length, mode })
            .map_err(|e| ParseError::InvalidFormat(format!("Line {line_num}: {e}")))?;
    }

    Ok(table)
}
