//! Alignment record clipping.
//!
//! Damaged bases at the ends of ancient-DNA reads are clipped after alignment.
//! Clipping has to keep four fields consistent with each other:
//!
//! | Field | Change |
//! |-------|--------|
//! | Alignment start | advanced by the reference positions clipped from the front |
//! | CIGAR | clipped positions become `S` (soft) or `H` (hard) |
//! | MD | the same reference positions are cut from both ends |
//! | NM | recomputed as remaining insertions plus MD edits |
//!
//! # Example
//!
//! ```
//! use adna_screen::alignment::clipper::{clip_record, AlignmentRecord, ClipPolicy};
//! use adna_screen::core::types::ClipMode;
//!
//! let mut record = AlignmentRecord {
//!     alignment_start: 5510,
//!     cigar: "20M1D31M".parse().unwrap(),
//!     md: Some("0A17T1^C23C7".to_string()),
//!     ..Default::default()
//! };
//! let policy = ClipPolicy { length: 2, mode: ClipMode::Soft };
//! clip_record(&mut record, policy).unwrap();
//!
//! assert_eq!(record.cigar.to_string(), "2S18M1D29M2S");
//! assert_eq!(record.md.as_deref(), Some("16T1^C23C5"));
//! assert_eq!(record.alignment_start, 5512);
//! assert_eq!(record.edit_distance, Some(3));
//! ```

pub mod cigar;
pub mod clipper;
pub mod md;
pub mod record;
