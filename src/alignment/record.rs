//! Conversion between `noodles` records and [`AlignmentRecord`].

use noodles::core::Position;
use noodles::sam::alignment::record::cigar::op::Kind;
use noodles::sam::alignment::record::cigar::Op;
use noodles::sam::alignment::record::data::field::Tag;
use noodles::sam::alignment::record_buf::data::field::Value;
use noodles::sam::alignment::record_buf::{Cigar as CigarBuf, QualityScores, Sequence};
use noodles::sam::alignment::RecordBuf;

use crate::alignment::cigar::{Cigar, CigarKind, CigarOp};
use crate::alignment::clipper::{AlignmentRecord, ClipError};

impl From<Kind> for CigarKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Match => Self::Match,
            Kind::Insertion => Self::Insertion,
            Kind::Deletion => Self::Deletion,
            Kind::Skip => Self::Skip,
            Kind::SoftClip => Self::SoftClip,
            Kind::HardClip => Self::HardClip,
            Kind::Pad => Self::Pad,
            Kind::SequenceMatch => Self::SequenceMatch,
            Kind::SequenceMismatch => Self::SequenceMismatch,
        }
    }
}

impl From<CigarKind> for Kind {
    fn from(kind: CigarKind) -> Self {
        match kind {
            CigarKind::Match => Self::Match,
            CigarKind::Insertion => Self::Insertion,
            CigarKind::Deletion => Self::Deletion,
            CigarKind::Skip => Self::Skip,
            CigarKind::SoftClip => Self::SoftClip,
            CigarKind::HardClip => Self::HardClip,
            CigarKind::Pad => Self::Pad,
            CigarKind::SequenceMatch => Self::SequenceMatch,
            CigarKind::SequenceMismatch => Self::SequenceMismatch,
        }
    }
}

fn string_tag(record: &RecordBuf, tag: Tag, name: &'static str) -> Result<Option<String>, ClipError> {
    match record.data().get(&tag) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(String::from_utf8_lossy(s).into_owned())),
        Some(_) => Err(ClipError::InvalidTag {
            tag: name,
            reason: "expected a string".to_string(),
        }),
    }
}

impl AlignmentRecord {
    /// Extract the fields clipping needs from a mapped record.
    ///
    /// # Errors
    ///
    /// Returns `ClipError` if the record has no alignment start, or an MD, NM
    /// or RG tag of the wrong type.
    pub fn from_record_buf(record: &RecordBuf) -> Result<Self, ClipError> {
        let name = record
            .name()
            .map(|n| String::from_utf8_lossy(n).into_owned())
            .unwrap_or_default();

        let alignment_start = record
            .alignment_start()
            .map(usize::from)
            .ok_or(ClipError::InvalidPosition(0))?;

        let cigar: Cigar = record
            .cigar()
            .as_ref()
            .iter()
            .map(|op| CigarOp::new(CigarKind::from(op.kind()), op.len()))
            .collect();

        let edit_distance = match record.data().get(&Tag::EDIT_DISTANCE) {
            None => None,
            Some(value) => {
                let nm = value
                    .as_int()
                    .and_then(|v| u32::try_from(v).ok())
                    .ok_or_else(|| ClipError::InvalidTag {
                        tag: "NM",
                        reason: "expected a non-negative integer".to_string(),
                    })?;
                Some(nm)
            }
        };

        Ok(Self {
            name,
            read_group: string_tag(record, Tag::READ_GROUP, "RG")?,
            alignment_start,
            cigar,
            md: string_tag(record, Tag::MISMATCHED_POSITIONS, "MD")?,
            edit_distance,
            sequence: record.sequence().as_ref().to_vec(),
            quality: record.quality_scores().as_ref().to_vec(),
        })
    }

    /// Write the clipped fields back into `record`.
    ///
    /// # Errors
    ///
    /// Returns `ClipError::InvalidPosition` if the alignment start is zero.
    pub fn apply_to(&self, record: &mut RecordBuf) -> Result<(), ClipError> {
        let start = Position::new(self.alignment_start)
            .ok_or(ClipError::InvalidPosition(self.alignment_start))?;

        let ops: Vec<Op> = self
            .cigar
            .ops()
            .iter()
            .map(|op| Op::new(Kind::from(op.kind), op.len))
            .collect();

        *record.alignment_start_mut() = Some(start);
        *record.cigar_mut() = CigarBuf::from(ops);
        *record.sequence_mut() = Sequence::from(self.sequence.clone());
        *record.quality_scores_mut() = QualityScores::from(self.quality.clone());

        if let Some(md) = &self.md {
            record
                .data_mut()
                .insert(Tag::MISMATCHED_POSITIONS, Value::from(md.clone()));
        }
        if let Some(nm) = self.edit_distance {
            let nm = i32::try_from(nm).unwrap_or(i32::MAX);
            record.data_mut().insert(Tag::EDIT_DISTANCE, Value::from(nm));
        }

        Ok(())
    }
}
