use std::collections::BTreeMap;

use serde::Serialize;
use tracing::trace;

use crate::core::read::{Read, ReadQuad};
use crate::core::types::{ExperimentKey, Label};
use crate::matching::SequenceMatcher;
use crate::merging::merger::{MergeOutcome, ReadMerger};

/// Why a read pair produced no merged read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotMergedReason {
    Ambiguous,
    NoOverlap,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    Merged { key: ExperimentKey, read: Read },
    NotMerged {
        key: ExperimentKey,
        reason: NotMergedReason,
    },
}

impl ProcessOutcome {
    #[must_use]
    pub fn key(&self) -> &ExperimentKey {
        match self {
            Self::Merged { key, .. } | Self::NotMerged { key, .. } => key,
        }
    }
}

/// Identifies indexes and barcodes of a read quad, strips the barcodes, and
/// merges the pair.
///
/// | Key part | Lane | Position |
/// |----------|------|----------|
/// | i7 | first index read | whole read prefix |
/// | i5 | second index read | whole read prefix |
/// | p5 | forward read | inline barcode at the start |
/// | p7 | reverse read | inline barcode at the start |
///
/// Any matcher may be absent; its key part is then empty.
pub struct ReadProcessor {
    i7: Option<Box<dyn SequenceMatcher>>,
    i5: Option<Box<dyn SequenceMatcher>>,
    p5: Option<Box<dyn SequenceMatcher>>,
    p7: Option<Box<dyn SequenceMatcher>>,
    merger: ReadMerger,
}

impl ReadProcessor {
    #[must_use]
    pub fn new(merger: ReadMerger) -> Self {
        Self {
            i7: None,
            i5: None,
            p5: None,
            p7: None,
            merger,
        }
    }

    #[must_use]
    pub fn with_i7(mut self, matcher: Box<dyn SequenceMatcher>) -> Self {
        self.i7 = Some(matcher);
        self
    }

    #[must_use]
    pub fn with_i5(mut self, matcher: Box<dyn SequenceMatcher>) -> Self {
        self.i5 = Some(matcher);
        self
    }

    #[must_use]
    pub fn with_p5(mut self, matcher: Box<dyn SequenceMatcher>) -> Self {
        self.p5 = Some(matcher);
        self
    }

    #[must_use]
    pub fn with_p7(mut self, matcher: Box<dyn SequenceMatcher>) -> Self {
        self.p7 = Some(matcher);
        self
    }

    #[must_use]
    pub fn merger(&self) -> &ReadMerger {
        &self.merger
    }

    pub fn process(&mut self, quad: &ReadQuad) -> ProcessOutcome {
        let i7 = identify(self.i7.as_mut(), quad.index1.as_ref());
        let i5 = identify(self.i5.as_mut(), quad.index2.as_ref());
        let p5 = identify(self.p5.as_mut(), Some(&quad.forward));
        let p7 = identify(self.p7.as_mut(), Some(&quad.reverse));

        let forward = strip(self.p5.as_deref(), p5.as_ref(), &quad.forward);
        let reverse = strip(self.p7.as_deref(), p7.as_ref(), &quad.reverse).reverse_complement();

        let key = ExperimentKey::new(i5, i7, p5, p7);

        match self.merger.merge(&forward, &reverse) {
            MergeOutcome::Merged { read, offset } => {
                trace!(read = quad.forward.name(), offset, "Merged read pair");
                let header = format!("{} {key}", quad.forward.name());
                ProcessOutcome::Merged {
                    read: read.with_header(Some(header)),
                    key,
                }
            }
            MergeOutcome::Ambiguous { candidates } => {
                trace!(read = quad.forward.name(), candidates, "Ambiguous overlap");
                ProcessOutcome::NotMerged {
                    key,
                    reason: NotMergedReason::Ambiguous,
                }
            }
            MergeOutcome::NoOverlap => ProcessOutcome::NotMerged {
                key,
                reason: NotMergedReason::NoOverlap,
            },
        }
    }
}

impl std::fmt::Debug for ReadProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadProcessor")
            .field("i7", &self.i7.is_some())
            .field("i5", &self.i5.is_some())
            .field("p5", &self.p5.is_some())
            .field("p7", &self.p7.is_some())
            .field("merger", &self.merger)
            .finish()
    }
}

/// Match the read prefix of the matcher's reference length.
fn identify(matcher: Option<&mut Box<dyn SequenceMatcher>>, read: Option<&Read>) -> Option<Label> {
    let matcher = matcher?;
    let read = read?;
    let length = matcher.sequence_length()?;
    if read.len() < length {
        return None;
    }
    matcher.find(&read.sequence().slice(0, length))
}

fn strip(matcher: Option<&dyn SequenceMatcher>, label: Option<&Label>, read: &Read) -> Read {
    match (matcher, label) {
        (Some(matcher), Some(label)) => read.trim(matcher.barcode_length(label), 0),
        _ => read.clone(),
    }
}

/// Counters for a merge run
#[derive(Debug, Clone, Default, Serialize)]
pub struct MergeStats {
    pub read_pairs: usize,
    pub merged: usize,
    pub ambiguous: usize,
    pub no_overlap: usize,
    /// Merged reads per experiment key
    pub experiments: BTreeMap<String, usize>,
}

impl MergeStats {
    pub fn record(&mut self, outcome: &ProcessOutcome) {
        self.read_pairs += 1;
        match outcome {
            ProcessOutcome::Merged { key, .. } => {
                self.merged += 1;
                *self.experiments.entry(key.to_string()).or_default() += 1;
            }
            ProcessOutcome::NotMerged {
                reason: NotMergedReason::Ambiguous,
                ..
            } => self.ambiguous += 1,
            ProcessOutcome::NotMerged {
                reason: NotMergedReason::NoOverlap,
                ..
            } => self.no_overlap += 1,
        }
    }

    /// Fraction of read pairs merged
    #[must_use]
    pub fn merge_rate(&self) -> f64 {
        if self.read_pairs == 0 {
            0.0
        } else {
            self.merged as f64 / self.read_pairs as f64
        }
    }
}
