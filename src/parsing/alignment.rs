use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use noodles::bam;
use noodles::sam;
use noodles::sam::alignment::io::Write as _;
use noodles::sam::alignment::RecordBuf;

use crate::parsing::ParseError;

/// Alignment container formats handled by the `clip` command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignmentFormat {
    Sam,
    Bam,
}

/// Choose the format from the file extension
///
/// # Errors
///
/// Returns `ParseError::UnsupportedFormat` for extensions other than `sam` and `bam`.
pub fn detect_format(path: &Path) -> Result<AlignmentFormat, ParseError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase);

    match extension.as_deref() {
        Some("sam") => Ok(AlignmentFormat::Sam),
        Some("bam") => Ok(AlignmentFormat::Bam),
        Some(ext) => Err(ParseError::UnsupportedFormat(ext.to_string())),
        None => Err(ParseError::UnsupportedFormat(path.display().to_string())),
    }
}

type RecordIter = Box<dyn Iterator<Item = std::io::Result<RecordBuf>>>;

/// Header plus a record stream, independent of the container format
pub struct AlignmentReader {
    header: sam::Header,
    records: RecordIter,
}

impl AlignmentReader {
    /// # Errors
    ///
    /// Returns `ParseError::Io` if the file cannot be opened, `ParseError::Noodles`
    /// if the header is malformed, or `ParseError::UnsupportedFormat`.
    pub fn open(path: &Path) -> Result<Self, ParseError> {
        match detect_format(path)? {
            AlignmentFormat::Sam => {
                let mut reader = File::open(path)
                    .map(BufReader::new)
                    .map(sam::io::Reader::new)?;
                let header = reader
                    .read_header()
                    .map_err(|e| ParseError::Noodles(e.to_string()))?;
                let records_header = header.clone();
                let records = std::iter::from_fn(move || {
                    let mut record = RecordBuf::default();
                    match reader.read_record_buf(&records_header, &mut record) {
                        Ok(0) => None,
                        Ok(_) => Some(Ok(record)),
                        Err(e) => Some(Err(e)),
                    }
                });
                Ok(Self {
                    header,
                    records: Box::new(records),
                })
            }
            AlignmentFormat::Bam => {
                let mut reader = File::open(path).map(bam::io::Reader::new)?;
                let header = reader
                    .read_header()
                    .map_err(|e| ParseError::Noodles(e.to_string()))?;
                let records_header = header.clone();
                let records = std::iter::from_fn(move || {
                    let mut record = RecordBuf::default();
                    match reader.read_record_buf(&records_header, &mut record) {
                        Ok(0) => None,
                        Ok(_) => Some(Ok(record)),
                        Err(e) => Some(Err(e)),
                    }
                });
                Ok(Self {
                    header,
                    records: Box::new(records),
                })
            }
        }
    }

    #[must_use]
    pub fn header(&self) -> &sam::Header {
        &self.header
    }

    #[must_use]
    pub fn into_parts(self) -> (sam::Header, RecordIter) {
        (self.header, self.records)
    }
}

/// Format-independent alignment output
pub struct AlignmentWriter {
    header: sam::Header,
    inner: Box<dyn sam::alignment::io::Write>,
}

impl AlignmentWriter {
    /// Create the output and write its header
    ///
    /// # Errors
    ///
    /// Returns `ParseError::UnsupportedFormat` for an unknown extension, without
    /// creating the file, and `ParseError::Io` if the file cannot be created or
    /// the header written.
    pub fn create(path: &Path, header: &sam::Header) -> Result<Self, ParseError> {
        let format = detect_format(path)?;
        let file = File::create(path)?;
        let mut inner: Box<dyn sam::alignment::io::Write> = match format {
            AlignmentFormat::Sam => Box::new(sam::io::Writer::new(BufWriter::new(file))),
            AlignmentFormat::Bam => Box::new(bam::io::Writer::new(file)),
        };
        inner.write_alignment_header(header)?;
        Ok(Self {
            header: header.clone(),
            inner,
        })
    }

    /// # Errors
    ///
    /// Returns `ParseError::Io` if the record cannot be written.
    pub fn write(&mut self, record: &RecordBuf) -> Result<(), ParseError> {
        self.inner.write_alignment_record(&self.header, record)?;
        Ok(())
    }

    /// Flush and finalize the output (e.g. the BGZF end-of-file marker).
    ///
    /// # Errors
    ///
    /// Returns `ParseError::Io` if finalizing fails.
    pub fn finish(mut self) -> Result<(), ParseError> {
        self.inner.finish(&self.header)?;
        Ok(())
    }
}
