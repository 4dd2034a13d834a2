use serde::{Deserialize, Serialize};

/// Delimiter used when an [`ExperimentKey`] is serialized; labels may not contain it.
pub const LABEL_DELIMITER: char = ':';

/// Delimiter between the parts of an [`ExperimentKey::file_stem`]; labels may not contain it.
pub const FILE_STEM_DELIMITER: char = '.';

/// File stem part written for an absent key component; reserved, never a label.
pub const ABSENT_PART: &str = "unknown";

/// Identifier of a reference group (an index or a barcode set).
///
/// Labels are unique within a matcher and are meant to be used as map keys downstream.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Label(pub String);

impl Label {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of an experiment: resolved i5/i7 indices and p5/p7 barcode sets.
///
/// Each component is absent when the corresponding lane was not matched (or not configured).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExperimentKey {
    pub i5: Option<Label>,
    pub i7: Option<Label>,
    pub p5: Option<Label>,
    pub p7: Option<Label>,
}

impl ExperimentKey {
    #[must_use]
    pub fn new(
        i5: Option<Label>,
        i7: Option<Label>,
        p5: Option<Label>,
        p7: Option<Label>,
    ) -> Self {
        Self { i5, i7, p5, p7 }
    }

    fn parts(&self) -> [Option<&str>; 4] {
        [
            self.i5.as_ref().map(Label::as_str),
            self.i7.as_ref().map(Label::as_str),
            self.p5.as_ref().map(Label::as_str),
            self.p7.as_ref().map(Label::as_str),
        ]
    }

    /// File-name friendly form, with [`ABSENT_PART`] standing in for absent components.
    ///
    /// Distinct keys of valid labels give distinct stems: labels cannot contain
    /// [`FILE_STEM_DELIMITER`] and cannot equal [`ABSENT_PART`].
    #[must_use]
    pub fn file_stem(&self) -> String {
        let delimiter = FILE_STEM_DELIMITER.to_string();
        self.parts()
            .iter()
            .map(|p| p.unwrap_or(ABSENT_PART))
            .collect::<Vec<_>>()
            .join(&delimiter)
    }
}

impl std::fmt::Display for ExperimentKey {
    /// `i5:i7:p5:p7`, absent components left empty.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let delimiter = LABEL_DELIMITER.to_string();
        let joined = self
            .parts()
            .iter()
            .map(|p| p.unwrap_or(""))
            .collect::<Vec<_>>()
            .join(&delimiter);
        f.write_str(&joined)
    }
}

/// How clipped bases are represented in an alignment record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ClipMode {
    /// Keep the bases in the record, mark them as not aligned (`S`)
    Soft,
    /// Remove the bases and qualities from the record (`H`)
    Hard,
}

impl std::fmt::Display for ClipMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Soft => write!(f, "soft"),
            Self::Hard => write!(f, "hard"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_experiment_key_display() {
        let key = ExperimentKey::new(
            Some(Label::new("i5_01")),
            Some(Label::new("i7_02")),
            None,
            Some(Label::new("bc7")),
        );
        assert_eq!(key.to_string(), "i5_01:i7_02::bc7");
        assert_eq!(key.file_stem(), "i5_01.i7_02.unknown.bc7");
    }

    #[test]
    fn test_empty_key() {
        let key = ExperimentKey::default();
        assert_eq!(key.to_string(), ":::");
        assert_eq!(key.file_stem(), "unknown.unknown.unknown.unknown");
    }

    #[test]
    fn test_file_stem_keeps_label_boundaries() {
        let split_after = ExperimentKey::new(Some(Label::new("a_b")), Some(Label::new("c")), None, None);
        let split_before = ExperimentKey::new(Some(Label::new("a")), Some(Label::new("b_c")), None, None);
        assert_ne!(split_after.file_stem(), split_before.file_stem());
        assert_eq!(split_after.file_stem(), "a_b.c.unknown.unknown");
    }
}
