use std::collections::HashMap;

use serde::Serialize;
use thiserror::Error;

use crate::alignment::cigar::{Cigar, CigarError, CigarKind};
use crate::alignment::md::{EditString, EditStringError};
use crate::core::types::ClipMode;

/// A record that cannot be clipped. Never a configuration problem; the caller
/// logs it and moves on to the next record.
#[derive(Error, Debug)]
pub enum ClipError {
    #[error("Invalid CIGAR: {0}")]
    Cigar(#[from] CigarError),

    #[error("Invalid MD tag: {0}")]
    Md(#[from] EditStringError),

    #[error("MD tag covers {md} reference positions but CIGAR describes {cigar}")]
    MdLengthMismatch { md: usize, cigar: usize },

    #[error("Sequence has {sequence} bases but CIGAR describes {cigar}")]
    SequenceLengthMismatch { sequence: usize, cigar: usize },

    #[error("Quality has {quality} scores but sequence has {sequence} bases")]
    QualityLengthMismatch { quality: usize, sequence: usize },

    #[error("Invalid alignment start {0}")]
    InvalidPosition(usize),

    #[error("Invalid {tag} tag: {reason}")]
    InvalidTag { tag: &'static str, reason: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    #[error("Read group '{0}' already has a clip policy")]
    DuplicateReadGroup(String),

    #[error("Empty read group name")]
    EmptyReadGroup,
}

/// How many bases to clip from each end, and how
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClipPolicy {
    pub length: usize,
    pub mode: ClipMode,
}

impl Default for ClipPolicy {
    fn default() -> Self {
        Self {
            length: 0,
            mode: ClipMode::Soft,
        }
    }
}

/// Clip policies keyed by read group ID, with a fallback for everything else
#[derive(Debug, Clone, Default)]
pub struct ClipPolicyTable {
    default: ClipPolicy,
    by_read_group: HashMap<String, ClipPolicy>,
}

impl ClipPolicyTable {
    #[must_use]
    pub fn new(default: ClipPolicy) -> Self {
        Self {
            default,
            by_read_group: HashMap::new(),
        }
    }

    /// # Errors
    ///
    /// Returns `PolicyError` if the read group is empty or already present.
    pub fn insert(&mut self, read_group: &str, policy: ClipPolicy) -> Result<(), PolicyError> {
        if read_group.is_empty() {
            return Err(PolicyError::EmptyReadGroup);
        }
        if self.by_read_group.contains_key(read_group) {
            return Err(PolicyError::DuplicateReadGroup(read_group.to_string()));
        }
        self.by_read_group.insert(read_group.to_string(), policy);
        Ok(())
    }

    #[must_use]
    pub fn resolve(&self, read_group: Option<&str>) -> ClipPolicy {
        read_group
            .and_then(|rg| self.by_read_group.get(rg))
            .copied()
            .unwrap_or(self.default)
    }

    #[must_use]
    pub fn default_policy(&self) -> ClipPolicy {
        self.default
    }

    /// Number of read-group overrides
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_read_group.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_read_group.is_empty()
    }
}

/// The alignment fields touched by clipping.
///
/// `sequence` and `quality` may be empty when the record does not store them.
/// `alignment_start` is 1-based.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlignmentRecord {
    pub name: String,
    pub read_group: Option<String>,
    pub alignment_start: usize,
    pub cigar: Cigar,
    pub md: Option<String>,
    pub edit_distance: Option<u32>,
    pub sequence: Vec<u8>,
    pub quality: Vec<u8>,
}

impl AlignmentRecord {
    /// A record keeps at least one base aligned to the reference
    #[must_use]
    pub fn has_aligned_bases(&self) -> bool {
        self.cigar.has_aligned_bases()
    }
}

/// What a clip did to one record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClipReport {
    /// Reference positions removed from the front
    pub start_shift: usize,
    /// Bases removed from the stored read (hard clipping only)
    pub trimmed_front: usize,
    pub trimmed_back: usize,
}

#[derive(Debug, Default)]
struct EndClip {
    trimmed: usize,
    reference: usize,
    md: usize,
}

impl EndClip {
    fn account(&mut self, kind: CigarKind) {
        if kind.consumes_reference() {
            self.reference += 1;
        }
        if kind.in_md() {
            self.md += 1;
        }
    }
}

/// Clips both ends of alignment records, keeping start, CIGAR, MD and NM consistent.
#[derive(Debug, Clone, Default)]
pub struct AlignmentClipper {
    policies: ClipPolicyTable,
}

impl AlignmentClipper {
    #[must_use]
    pub fn new(policies: ClipPolicyTable) -> Self {
        Self { policies }
    }

    #[must_use]
    pub fn policies(&self) -> &ClipPolicyTable {
        &self.policies
    }

    /// Clip using the policy of the record's read group.
    ///
    /// # Errors
    ///
    /// Returns `ClipError` if the record's fields are inconsistent.
    pub fn clip(&self, record: &mut AlignmentRecord) -> Result<ClipReport, ClipError> {
        let policy = self.policies.resolve(record.read_group.as_deref());
        clip_record(record, policy)
    }
}

/// Clip `policy.length` bases from both ends of `record`.
///
/// The record is left untouched on error. Without an MD tag the CIGAR and
/// start are still rewritten and NM is left as is.
///
/// # Errors
///
/// Returns `ClipError` if the MD tag is malformed or does not agree with the
/// CIGAR, or if the stored sequence/quality lengths do not match the CIGAR.
pub fn clip_record(record: &mut AlignmentRecord, policy: ClipPolicy) -> Result<ClipReport, ClipError> {
    let read_length = record.cigar.read_length();
    if !record.sequence.is_empty() && record.sequence.len() != read_length {
        return Err(ClipError::SequenceLengthMismatch {
            sequence: record.sequence.len(),
            cigar: read_length,
        });
    }
    if !record.quality.is_empty() && record.quality.len() != record.sequence.len() {
        return Err(ClipError::QualityLengthMismatch {
            quality: record.quality.len(),
            sequence: record.sequence.len(),
        });
    }

    let mut md = record.md.as_deref().map(EditString::parse).transpose()?;
    if let Some(md) = &md {
        let span = record.cigar.md_length();
        if md.len() != span {
            return Err(ClipError::MdLengthMismatch {
                md: md.len(),
                cigar: span,
            });
        }
    }

    let length = policy.length.min(read_length);
    if length == 0 {
        return Ok(ClipReport::default());
    }

    let mut kinds = record.cigar.unroll();
    let front = clip_end(&mut kinds, length, policy.mode, false);
    let back = clip_end(&mut kinds, length, policy.mode, true);
    order_clips(&mut kinds);

    let cigar = Cigar::roll(&kinds);
    let alignment_start = record.alignment_start + front.reference;

    if let Some(md) = md.as_mut() {
        md.clip(front.md, back.md);
        record.edit_distance = u32::try_from(cigar.insertions() + md.edit_distance()).ok();
        record.md = Some(md.to_string());
    }

    if policy.mode == ClipMode::Hard {
        trim(&mut record.sequence, front.trimmed, back.trimmed);
        trim(&mut record.quality, front.trimmed, back.trimmed);
    }

    record.cigar = cigar;
    record.alignment_start = alignment_start;

    Ok(ClipReport {
        start_shift: front.reference,
        trimmed_front: front.trimmed,
        trimmed_back: back.trimmed,
    })
}

/// Walk `length` read bases in from one end, turning them into clips.
///
/// Existing hard clips are passed over. Reference-only operators met on the
/// way, or left sitting at the new boundary, become hard clips.
fn clip_end(kinds: &mut [CigarKind], length: usize, mode: ClipMode, from_back: bool) -> EndClip {
    let n = kinds.len();
    let index = |i: usize| if from_back { n - 1 - i } else { i };
    let target = match mode {
        ClipMode::Soft => CigarKind::SoftClip,
        ClipMode::Hard => CigarKind::HardClip,
    };

    let mut clip = EndClip::default();
    let mut consumed = 0;
    let mut i = 0;

    while i < n && consumed < length {
        let idx = index(i);
        let kind = kinds[idx];
        i += 1;

        if kind == CigarKind::HardClip {
            continue;
        }

        if kind.consumes_read() {
            consumed += 1;
            kinds[idx] = target;
            if target == CigarKind::HardClip {
                clip.trimmed += 1;
            }
        } else {
            kinds[idx] = CigarKind::HardClip;
        }
        clip.account(kind);
    }

    while i < n {
        let idx = index(i);
        let kind = kinds[idx];
        if !matches!(kind, CigarKind::Deletion | CigarKind::Skip | CigarKind::Pad) {
            break;
        }
        kinds[idx] = CigarKind::HardClip;
        clip.account(kind);
        i += 1;
    }

    clip
}

/// Put hard clips outside soft clips at both ends.
fn order_clips(kinds: &mut [CigarKind]) {
    let leading = kinds.iter().take_while(|k| k.is_clip()).count();
    fill_clips(&mut kinds[..leading], false);

    if leading < kinds.len() {
        let trailing = kinds.iter().rev().take_while(|k| k.is_clip()).count();
        let start = kinds.len() - trailing;
        fill_clips(&mut kinds[start..], true);
    }
}

fn fill_clips(run: &mut [CigarKind], hard_last: bool) {
    let hard = run.iter().filter(|&&k| k == CigarKind::HardClip).count();
    let len = run.len();
    for (i, kind) in run.iter_mut().enumerate() {
        let is_hard = if hard_last { i >= len - hard } else { i < hard };
        *kind = if is_hard {
            CigarKind::HardClip
        } else {
            CigarKind::SoftClip
        };
    }
}

fn trim(values: &mut Vec<u8>, front: usize, back: usize) {
    let start = front.min(values.len());
    let end = values.len().saturating_sub(back).max(start);
    values.truncate(end);
    values.drain(..start);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(start: usize, cigar: &str, md: Option<&str>, len: usize) -> AlignmentRecord {
        let bases = b"ACGT";
        AlignmentRecord {
            name: "r1".to_string(),
            read_group: None,
            alignment_start: start,
            cigar: cigar.parse().unwrap(),
            md: md.map(str::to_string),
            edit_distance: Some(4),
            sequence: (0..len).map(|i| bases[i % 4]).collect(),
            quality: (0..len).map(|i| (i % 40) as u8).collect(),
        }
    }

    fn soft(length: usize) -> ClipPolicy {
        ClipPolicy {
            length,
            mode: ClipMode::Soft,
        }
    }

    fn hard(length: usize) -> ClipPolicy {
        ClipPolicy {
            length,
            mode: ClipMode::Hard,
        }
    }

    #[test]
    fn test_soft_clip() {
        let mut rec = record(5510, "20M1D31M", Some("0A17T1^C23C7"), 51);
        let original = rec.sequence.clone();

        let report = clip_record(&mut rec, soft(2)).unwrap();

        assert_eq!(rec.cigar.to_string(), "2S18M1D29M2S");
        assert_eq!(rec.md.as_deref(), Some("16T1^C23C5"));
        assert_eq!(rec.alignment_start, 5512);
        assert_eq!(rec.edit_distance, Some(3));
        assert_eq!(rec.sequence, original);
        assert_eq!(rec.quality.len(), 51);
        assert_eq!(report.start_shift, 2);
        assert_eq!(report.trimmed_front, 0);
    }

    #[test]
    fn test_hard_clip() {
        let mut rec = record(5510, "20M1D31M", Some("0A17T1^C23C7"), 51);
        let original = rec.sequence.clone();
        let original_quality = rec.quality.clone();

        let report = clip_record(&mut rec, hard(2)).unwrap();

        assert_eq!(rec.cigar.to_string(), "2H18M1D29M2H");
        assert_eq!(rec.md.as_deref(), Some("16T1^C23C5"));
        assert_eq!(rec.alignment_start, 5512);
        assert_eq!(rec.edit_distance, Some(3));
        assert_eq!(rec.sequence, original[2..49].to_vec());
        assert_eq!(rec.quality, original_quality[2..49].to_vec());
        assert_eq!((report.trimmed_front, report.trimmed_back), (2, 2));
    }

    #[test]
    fn test_existing_soft_clip_counts_toward_length() {
        let mut rec = record(100, "1S10M", Some("10"), 11);
        clip_record(&mut rec, soft(2)).unwrap();
        assert_eq!(rec.cigar.to_string(), "2S7M2S");
        assert_eq!(rec.alignment_start, 101);
        assert_eq!(rec.md.as_deref(), Some("7"));
    }

    #[test]
    fn test_existing_hard_clip_is_skipped() {
        let mut rec = record(100, "3H10M", Some("10"), 10);
        clip_record(&mut rec, soft(2)).unwrap();
        assert_eq!(rec.cigar.to_string(), "3H2S6M2S");
        assert_eq!(rec.alignment_start, 102);
    }

    #[test]
    fn test_hard_clip_converts_existing_soft_clip() {
        let mut rec = record(100, "2S10M", Some("10"), 12);
        let original = rec.sequence.clone();
        clip_record(&mut rec, hard(3)).unwrap();
        assert_eq!(rec.cigar.to_string(), "3H6M3H");
        assert_eq!(rec.alignment_start, 101);
        assert_eq!(rec.sequence, original[3..9].to_vec());
        assert_eq!(rec.md.as_deref(), Some("6"));
    }

    #[test]
    fn test_deletion_at_boundary_is_absorbed() {
        let mut rec = record(100, "2M1D10M", Some("2^A10"), 12);
        clip_record(&mut rec, soft(2)).unwrap();
        assert_eq!(rec.cigar.to_string(), "1H2S8M2S");
        assert_eq!(rec.alignment_start, 103);
        assert_eq!(rec.md.as_deref(), Some("8"));
        assert_eq!(rec.edit_distance, Some(0));
    }

    #[test]
    fn test_clip_through_insertion() {
        let mut rec = record(100, "1M1I10M", Some("0G10"), 12);
        clip_record(&mut rec, soft(2)).unwrap();
        assert_eq!(rec.cigar.to_string(), "2S8M2S");
        assert_eq!(rec.alignment_start, 101);
        assert_eq!(rec.md.as_deref(), Some("8"));
        assert_eq!(rec.edit_distance, Some(0));
    }

    #[test]
    fn test_remaining_insertion_counts_in_edit_distance() {
        let mut rec = record(100, "5M1I5M", Some("5"), 11);
        rec.md = Some("10".to_string());
        clip_record(&mut rec, soft(1)).unwrap();
        assert_eq!(rec.cigar.to_string(), "1S4M1I4M1S");
        assert_eq!(rec.edit_distance, Some(1));
    }

    #[test]
    fn test_skip_shifts_start_but_not_md() {
        let mut rec = record(100, "2M1N10M", Some("12"), 12);
        clip_record(&mut rec, soft(2)).unwrap();
        assert_eq!(rec.cigar.to_string(), "1H2S8M2S");
        assert_eq!(rec.alignment_start, 103);
        assert_eq!(rec.md.as_deref(), Some("8"));
    }

    #[test]
    fn test_clip_longer_than_read_empties_record() {
        let mut rec = record(100, "4M", Some("4"), 4);
        clip_record(&mut rec, hard(10)).unwrap();
        assert_eq!(rec.cigar.to_string(), "4H");
        assert!(rec.sequence.is_empty());
        assert!(!rec.has_aligned_bases());
        assert_eq!(rec.md.as_deref(), Some("0"));

        let mut rec = record(100, "4M", Some("4"), 4);
        clip_record(&mut rec, soft(10)).unwrap();
        assert_eq!(rec.cigar.to_string(), "4S");
        assert_eq!(rec.sequence.len(), 4);
        assert!(!rec.has_aligned_bases());
    }

    #[test]
    fn test_zero_length_is_noop() {
        let mut rec = record(100, "10M", Some("10"), 10);
        let before = rec.clone();
        let report = clip_record(&mut rec, soft(0)).unwrap();
        assert_eq!(rec, before);
        assert_eq!(report, ClipReport::default());
    }

    #[test]
    fn test_missing_md_still_clips() {
        let mut rec = record(100, "10M", None, 10);
        clip_record(&mut rec, soft(2)).unwrap();
        assert_eq!(rec.cigar.to_string(), "2S6M2S");
        assert_eq!(rec.md, None);
        assert_eq!(rec.edit_distance, Some(4));
    }

    #[test]
    fn test_inconsistent_record_is_rejected_untouched() {
        let mut rec = record(100, "10M", Some("9"), 10);
        let before = rec.clone();
        assert!(matches!(
            clip_record(&mut rec, soft(2)),
            Err(ClipError::MdLengthMismatch { md: 9, cigar: 10 })
        ));
        assert_eq!(rec, before);

        let mut rec = record(100, "10M", Some("10"), 9);
        assert!(matches!(
            clip_record(&mut rec, soft(2)),
            Err(ClipError::SequenceLengthMismatch { .. })
        ));

        let mut rec = record(100, "10M", Some("1x"), 10);
        assert!(matches!(clip_record(&mut rec, soft(2)), Err(ClipError::Md(_))));
    }

    #[test]
    fn test_clipper_uses_read_group_policy() {
        let mut table = ClipPolicyTable::new(soft(1));
        table.insert("ss", hard(2)).unwrap();
        let clipper = AlignmentClipper::new(table);

        let mut rec = record(100, "10M", Some("10"), 10);
        rec.read_group = Some("ss".to_string());
        clipper.clip(&mut rec).unwrap();
        assert_eq!(rec.cigar.to_string(), "2H6M2H");

        let mut rec = record(100, "10M", Some("10"), 10);
        rec.read_group = Some("ds".to_string());
        clipper.clip(&mut rec).unwrap();
        assert_eq!(rec.cigar.to_string(), "1S8M1S");
    }

    #[test]
    fn test_policy_table_rejects_duplicates() {
        let mut table = ClipPolicyTable::new(soft(1));
        assert!(table.insert("a", soft(2)).is_ok());
        assert_eq!(
            table.insert("a", soft(3)),
            Err(PolicyError::DuplicateReadGroup("a".to_string()))
        );
        assert_eq!(table.insert("", soft(3)), Err(PolicyError::EmptyReadGroup));
        assert_eq!(table.len(), 1);
    }
}
