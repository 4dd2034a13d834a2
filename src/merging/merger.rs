use std::cmp::Reverse;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::trace;

use crate::core::quality::{QualityTrack, MAX_ENCODABLE_QUALITY};
use crate::core::read::Read;
use crate::core::sequence::Sequence;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MergeConfigError {
    #[error("Minimum overlap must be at least 1")]
    ZeroMinOverlap,

    #[error("Candidate cap must be at least 2 to detect ambiguity, got {0}")]
    CandidateCap(usize),

    #[error("Penalty '{name}' must be finite and non-negative, got {value}")]
    InvalidPenalty { name: &'static str, value: f64 },

    #[error("Maximum quality {0} cannot be encoded")]
    MaxQuality(u8),
}

/// Merge parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Mismatch penalty budget within the minimum overlap
    pub max_penalty: f64,
    pub min_overlap: usize,
    /// Shortest merged read worth reporting
    pub min_length: usize,
    /// Stop enumerating offsets after this many passing candidates
    pub max_candidates: usize,
    /// Both qualities at or above this make a mismatch high-confidence
    pub quality_threshold: u8,
    pub high_penalty: f64,
    pub low_penalty: f64,
    /// Ceiling for the quality of agreeing positions
    pub max_quality: u8,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            max_penalty: 3.0,
            min_overlap: 10,
            min_length: 30,
            max_candidates: 16,
            quality_threshold: 20,
            high_penalty: 1.0,
            low_penalty: 0.25,
            max_quality: 41,
        }
    }
}

impl MergeConfig {
    /// # Errors
    ///
    /// Returns `MergeConfigError` for settings that cannot produce a sound merge.
    pub fn validate(&self) -> Result<(), MergeConfigError> {
        if self.min_overlap == 0 {
            return Err(MergeConfigError::ZeroMinOverlap);
        }
        if self.max_candidates < 2 {
            return Err(MergeConfigError::CandidateCap(self.max_candidates));
        }
        for (name, value) in [
            ("max_penalty", self.max_penalty),
            ("high_penalty", self.high_penalty),
            ("low_penalty", self.low_penalty),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(MergeConfigError::InvalidPenalty { name, value });
            }
        }
        if self.max_quality > MAX_ENCODABLE_QUALITY {
            return Err(MergeConfigError::MaxQuality(self.max_quality));
        }
        Ok(())
    }
}

/// Result of trying to merge one read pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Exactly one offset passed; `offset` is the start of the reverse read
    /// relative to the start of the forward read
    Merged { read: Read, offset: isize },
    /// More than one offset passed
    Ambiguous { candidates: usize },
    NoOverlap,
}

impl MergeOutcome {
    #[must_use]
    pub fn into_read(self) -> Option<Read> {
        match self {
            Self::Merged { read, .. } => Some(read),
            _ => None,
        }
    }
}

/// Overlap-merges a forward read with its reverse-complemented mate.
#[derive(Debug, Clone)]
pub struct ReadMerger {
    config: MergeConfig,
}

impl ReadMerger {
    /// # Errors
    ///
    /// Returns `MergeConfigError` if the configuration is invalid.
    pub fn new(config: MergeConfig) -> Result<Self, MergeConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    #[must_use]
    pub fn config(&self) -> &MergeConfig {
        &self.config
    }

    /// Merge `forward` with `reverse`, which must already be reverse-complemented.
    ///
    /// The merged read takes the forward read's header.
    #[must_use]
    pub fn merge(&self, forward: &Read, reverse: &Read) -> MergeOutcome {
        let candidates = self.candidates(forward, reverse);
        match candidates.as_slice() {
            [] => MergeOutcome::NoOverlap,
            [offset] => MergeOutcome::Merged {
                read: self.consensus(forward, reverse, *offset),
                offset: *offset,
            },
            _ => MergeOutcome::Ambiguous {
                candidates: candidates.len(),
            },
        }
    }

    /// Offsets that pass the penalty walk, widest overlap first, at most
    /// `max_candidates` of them.
    #[must_use]
    pub fn candidates(&self, forward: &Read, reverse: &Read) -> Vec<isize> {
        let mut passing = Vec::new();
        for offset in self.offsets(forward.len(), reverse.len()) {
            if self.passes(forward, reverse, offset) {
                trace!(offset, "Offset passed penalty walk");
                passing.push(offset);
                if passing.len() >= self.config.max_candidates {
                    break;
                }
            }
        }
        passing
    }

    /// Offsets giving at least `min_overlap` overlap and `min_length` merged bases.
    fn offsets(&self, forward_len: usize, reverse_len: usize) -> Vec<isize> {
        let (Ok(lf), Ok(lr), Ok(min_overlap), Ok(min_length)) = (
            isize::try_from(forward_len),
            isize::try_from(reverse_len),
            isize::try_from(self.config.min_overlap),
            isize::try_from(self.config.min_length),
        ) else {
            return Vec::new();
        };

        let mut offsets: Vec<(isize, isize)> = (min_length - lr..=lf - min_overlap)
            .filter_map(|offset| {
                let overlap = overlap_len(lf, lr, offset);
                (overlap >= min_overlap).then_some((overlap, offset))
            })
            .collect();
        offsets.sort_by_key(|&(overlap, offset)| (Reverse(overlap), offset));
        offsets.into_iter().map(|(_, offset)| offset).collect()
    }

    fn passes(&self, forward: &Read, reverse: &Read, offset: isize) -> bool {
        let (f_start, r_start, overlap) = spans(forward.len(), reverse.len(), offset);
        let f_bases = &forward.sequence().as_bytes()[f_start..f_start + overlap];
        let r_bases = &reverse.sequence().as_bytes()[r_start..r_start + overlap];
        let f_quals = &forward.quality().scores()[f_start..f_start + overlap];
        let r_quals = &reverse.quality().scores()[r_start..r_start + overlap];

        let config = &self.config;
        let min_overlap = config.min_overlap as f64;
        let mut penalty = 0.0;

        for i in 0..overlap {
            if f_bases[i] == r_bases[i] {
                continue;
            }
            penalty += if f_quals[i] >= config.quality_threshold
                && r_quals[i] >= config.quality_threshold
            {
                config.high_penalty
            } else {
                config.low_penalty
            };

            let rejected = if i < config.min_overlap {
                penalty > config.max_penalty
            } else {
                penalty * min_overlap > i as f64 * config.max_penalty
            };
            if rejected {
                return false;
            }
        }
        true
    }

    fn consensus(&self, forward: &Read, reverse: &Read, offset: isize) -> Read {
        let (f_start, r_start, overlap) = spans(forward.len(), reverse.len(), offset);
        let f_bases = forward.sequence().as_bytes();
        let r_bases = reverse.sequence().as_bytes();
        let f_quals = forward.quality().scores();
        let r_quals = reverse.quality().scores();

        let merged_len = f_start + reverse.len() - r_start;
        let mut bases = Vec::with_capacity(merged_len);
        let mut quals = Vec::with_capacity(merged_len);

        bases.extend_from_slice(&f_bases[..f_start]);
        quals.extend_from_slice(&f_quals[..f_start]);

        for i in 0..overlap {
            let (fb, fq) = (f_bases[f_start + i], f_quals[f_start + i]);
            let (rb, rq) = (r_bases[r_start + i], r_quals[r_start + i]);
            if fb == rb {
                bases.push(fb.to_ascii_uppercase());
                quals.push(fq.max(rq).min(self.config.max_quality));
            } else {
                bases.push(if fq >= rq { fb } else { rb });
                quals.push(fq.abs_diff(rq));
            }
        }

        bases.extend_from_slice(&r_bases[r_start + overlap..]);
        quals.extend_from_slice(&r_quals[r_start + overlap..]);

        Read::from_parts(
            forward.header().map(str::to_string),
            Sequence::from_raw(bases),
            QualityTrack::from_raw(quals),
        )
    }
}

fn overlap_len(lf: isize, lr: isize, offset: isize) -> isize {
    lf.min(offset + lr) - offset.max(0)
}

/// Start of the overlap in each read, and its length.
fn spans(forward_len: usize, reverse_len: usize, offset: isize) -> (usize, usize, usize) {
    let f_start = offset.max(0).unsigned_abs();
    let r_start = offset.min(0).unsigned_abs();
    let overlap = forward_len
        .saturating_sub(f_start)
        .min(reverse_len.saturating_sub(r_start));
    (f_start, r_start, overlap)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(bases: &str, quals: Vec<u8>) -> Read {
        Read::new(
            Some("r1".to_string()),
            Sequence::new(bases).unwrap(),
            QualityTrack::new(quals).unwrap(),
        )
        .unwrap()
    }

    fn uniform(bases: &str, q: u8) -> Read {
        read(bases, vec![q; bases.len()])
    }

    fn merger() -> ReadMerger {
        ReadMerger::new(MergeConfig::default()).unwrap()
    }

    const SEVENTY: &str =
        "ACGGTCATTGCAAGTCCTAGGATCGTTACAGCTTGACCATGAGTCAATCGCTATGGACTTCAGCATAGTC";
    const INSERT: &str =
        "TTGACCTAGCATGCAAGTCGATCCGTAAGCTTAGCGATCCATGGTACAGTCGAATCGGCTACCTGATGCATCAGTTACGA";

    #[test]
    fn test_identical_reads_merge_at_zero() {
        let r = uniform(SEVENTY, 30);
        match merger().merge(&r, &r) {
            MergeOutcome::Merged { read, offset } => {
                assert_eq!(offset, 0);
                assert_eq!(read.sequence(), r.sequence());
                assert_eq!(read.quality(), r.quality());
            }
            other => panic!("expected merge, got {other:?}"),
        }
    }

    #[test]
    fn test_repeating_motif_is_ambiguous() {
        let motif = "ACGT".repeat(17);
        let r = uniform(&motif, 30);
        assert_eq!(
            merger().merge(&r, &r),
            MergeOutcome::Ambiguous { candidates: 16 }
        );
    }

    #[test]
    fn test_overlapping_pair() {
        // Insert positions 0..50 forward, 30..80 reverse, one disagreement at 35
        let forward = uniform(&INSERT[..50], 30);
        let mut reverse_bases = INSERT[30..].to_string();
        reverse_bases.replace_range(5..6, "A");
        let mut reverse_quals = vec![30; 50];
        reverse_quals[5] = 35;
        let reverse = read(&reverse_bases, reverse_quals);

        let MergeOutcome::Merged { read, offset } = merger().merge(&forward, &reverse) else {
            panic!("expected merge");
        };
        assert_eq!(offset, 30);
        assert_eq!(read.len(), 80);
        let expected = format!("{}A{}", &INSERT[..35], &INSERT[36..]);
        assert_eq!(read.sequence().to_string(), expected);
        assert_eq!(read.quality().get(35), Some(5));
        assert_eq!(read.quality().get(30), Some(30));
        assert_eq!(read.header(), Some("r1"));
    }

    #[test]
    fn test_adapter_read_through() {
        let insert = &INSERT[..40];
        let forward = uniform(&format!("{insert}AGATCGGAAGAGCACACGTC"), 30);
        let adapter = Sequence::new("GTGTAGATCTCGGTGGTCGC").unwrap().reverse_complement();
        let reverse = uniform(&format!("{adapter}{insert}"), 30);

        let MergeOutcome::Merged { read, offset } = merger().merge(&forward, &reverse) else {
            panic!("expected merge");
        };
        assert_eq!(offset, -20);
        assert_eq!(read.sequence().to_string(), insert);
    }

    #[test]
    fn test_unrelated_reads_do_not_merge() {
        let forward = uniform(&"A".repeat(40), 30);
        let reverse = uniform(&"C".repeat(40), 30);
        assert_eq!(merger().merge(&forward, &reverse), MergeOutcome::NoOverlap);
    }

    #[test]
    fn test_reads_shorter_than_min_length() {
        let r = uniform(&SEVENTY[..20], 30);
        assert_eq!(merger().merge(&r, &r), MergeOutcome::NoOverlap);
    }

    #[test]
    fn test_low_quality_mismatches_cost_less() {
        // Five mismatches inside the minimum overlap: rejected at high quality,
        // accepted when every mismatch has low quality
        let forward_bases = &SEVENTY[..30];
        let mut reverse_bases: Vec<u8> = forward_bases.as_bytes().to_vec();
        for i in [1, 3, 5, 7, 9] {
            reverse_bases[i] = if reverse_bases[i] == b'A' { b'C' } else { b'A' };
        }
        let reverse_bases = String::from_utf8(reverse_bases).unwrap();
        let m = merger();

        let high = uniform(&reverse_bases, 30);
        assert!(!m.candidates(&uniform(forward_bases, 30), &high).contains(&0));

        let low = uniform(&reverse_bases, 10);
        assert!(m.candidates(&uniform(forward_bases, 30), &low).contains(&0));
    }

    #[test]
    fn test_penalty_density_past_min_overlap() {
        // Past the minimum overlap a mismatch at index i is tolerated while
        // penalty * min_overlap <= i * max_penalty: 3 * 10 <= 12 * 3, but 4 * 10 > 13 * 3
        let forward_bases = &SEVENTY[..40];
        let mutate = |positions: &[usize]| {
            let mut bases = forward_bases.as_bytes().to_vec();
            for &i in positions {
                bases[i] = if bases[i] == b'A' { b'C' } else { b'A' };
            }
            String::from_utf8(bases).unwrap()
        };
        let m = ReadMerger::new(MergeConfig {
            min_length: 40,
            ..MergeConfig::default()
        })
        .unwrap();
        let forward = uniform(forward_bases, 30);

        let three = uniform(&mutate(&[10, 11, 12]), 30);
        assert_eq!(m.candidates(&forward, &three), vec![0]);

        let four = uniform(&mutate(&[10, 11, 12, 13]), 30);
        assert!(m.candidates(&forward, &four).is_empty());
    }

    #[test]
    fn test_consensus_rules() {
        let m = merger();
        let forward = read("ACGT", vec![50, 20, 20, 15]);
        let reverse = read("ACTA", vec![45, 20, 30, 15]);
        let merged = m.consensus(&forward, &reverse, 0);
        // agreement caps at max quality; tie keeps the forward base
        assert_eq!(merged.sequence().to_string(), "ACTT");
        assert_eq!(merged.quality().scores(), &[41, 20, 10, 0]);
    }

    #[test]
    fn test_config_validation() {
        assert!(MergeConfig::default().validate().is_ok());
        let bad = MergeConfig {
            min_overlap: 0,
            ..MergeConfig::default()
        };
        assert_eq!(bad.validate(), Err(MergeConfigError::ZeroMinOverlap));
        let bad = MergeConfig {
            max_candidates: 1,
            ..MergeConfig::default()
        };
        assert_eq!(bad.validate(), Err(MergeConfigError::CandidateCap(1)));
        let bad = MergeConfig {
            low_penalty: f64::NAN,
            ..MergeConfig::default()
        };
        assert!(matches!(
            bad.validate(),
            Err(MergeConfigError::InvalidPenalty { name: "low_penalty", .. })
        ));
        assert!(ReadMerger::new(MergeConfig {
            max_quality: 94,
            ..MergeConfig::default()
        })
        .is_err());
    }
}
