use std::path::Path;

use crate::core::sequence::Sequence;
use crate::core::types::Label;
use crate::parsing::ParseError;
use crate::utils::validation::check_reference_limit;

/// Separator between the interchangeable sequences of one set.
pub const SET_DELIMITER: char = ':';

/// One line of a reference-set file: a group of equal-length sequences and their label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceSetEntry {
    pub sequences: Vec<Sequence>,
    pub label: Label,
}

/// Parse a reference-set file.
///
/// # Errors
///
/// Returns `ParseError::Io` if the file cannot be read, or other parse errors
/// if the content is invalid.
pub fn parse_file(path: &Path) -> Result<Vec<ReferenceSetEntry>, ParseError> {
    let content = std::fs::read_to_string(path)?;
    parse_text(&content)
}

/// Parse reference-set text: one `SEQ[:SEQ...]<whitespace>LABEL` entry per line.
///
/// Blank lines and lines starting with `#` are ignored. Consistency between
/// entries (duplicate labels, lengths) is checked when the entries are loaded
/// into a [`ReferenceTable`](crate::matching::reference::ReferenceTable).
///
/// # Errors
///
/// Returns `ParseError::InvalidFormat` if a line does not have exactly two fields,
/// has an empty sequence, or contains an invalid base, or `ParseError::TooManyEntries`
/// if the limit is exceeded.
pub fn parse_text(text: &str) -> Result<Vec<ReferenceSetEntry>, ParseError> {
    let mut entries = Vec::new();
    let mut total = 0usize;

    for (i, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        // Line numbers in errors are 1-based for user friendliness
        let line_num = i + 1;

        let fields: Vec<&str> = line.split_whitespace().collect();
        let [sequences, label] = fields.as_slice() else {
            return Err(ParseError::InvalidFormat(format!(
                "Line {line_num} must have 2 fields (sequences and label), found {}",
                fields.len()
            )));
        };

        let sequences = sequences
            .split(SET_DELIMITER)
            .map(|s| {
                if s.is_empty() {
                    return Err(ParseError::InvalidFormat(format!(
                        "Empty sequence on line {line_num}"
                    )));
                }
                Sequence::new(s).map_err(|e| {
                    ParseError::InvalidFormat(format!("Line {line_num}: {e} in '{s}'"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        total += sequences.len();
        if check_reference_limit(total).is_some() {
            return Err(ParseError::TooManyEntries(total));
        }

        entries.push(ReferenceSetEntry {
            sequences,
            label: Label::new(*label),
        });
    }

    if entries.is_empty() {
        return Err(ParseError::InvalidFormat(
            "No reference sequences found".to_string(),
        ));
    }

    Ok(entries)
}
