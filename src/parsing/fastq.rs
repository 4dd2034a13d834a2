use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, ErrorKind, Write};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use flate2::read::MultiGzDecoder;
use noodles::fastq;
use noodles::fastq::record::Definition;
use tracing::debug;

use crate::cache::{Cache, CacheStats, Release};
use crate::core::read::Read;
use crate::core::types::ExperimentKey;
use crate::parsing::ParseError;

/// Open a FASTQ file, transparently decompressing `.gz` input.
///
/// # Errors
///
/// Returns `ParseError::Io` if the file cannot be opened.
pub fn open_reader(path: &Path) -> Result<FastqReads<Box<dyn BufRead>>, ParseError> {
    let file = File::open(path)?;
    let is_gzip = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("gz"));

    let inner: Box<dyn BufRead> = if is_gzip {
        Box::new(BufReader::new(MultiGzDecoder::new(file)))
    } else {
        Box::new(BufReader::new(file))
    };
    Ok(FastqReads::new(inner))
}

/// Iterator of [`Read`]s over FASTQ input.
pub struct FastqReads<R: BufRead> {
    reader: fastq::io::Reader<R>,
    record: fastq::Record,
    records_read: usize,
}

impl<R: BufRead> FastqReads<R> {
    pub fn new(inner: R) -> Self {
        Self {
            reader: fastq::io::Reader::new(inner),
            record: fastq::Record::default(),
            records_read: 0,
        }
    }

    fn convert(&self) -> Result<Read, ParseError> {
        let name = String::from_utf8_lossy(self.record.name());
        let description = String::from_utf8_lossy(self.record.description());
        let header = if description.is_empty() {
            name.into_owned()
        } else {
            format!("{name} {description}")
        };
        Read::from_text(
            Some(&header),
            self.record.sequence(),
            self.record.quality_scores(),
        )
        .map_err(|e| {
            ParseError::InvalidFormat(format!("FASTQ record {} ({header}): {e}", self.records_read))
        })
    }
}

impl<R: BufRead> Iterator for FastqReads<R> {
    type Item = Result<Read, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.reader.read_record(&mut self.record) {
            Ok(0) => None,
            Ok(_) => {
                self.records_read += 1;
                Some(self.convert())
            }
            Err(e) => Some(Err(ParseError::Io(e))),
        }
    }
}

/// Build a noodles FASTQ record from a [`Read`].
#[must_use]
pub fn to_record(read: &Read) -> fastq::Record {
    let header = read.header().unwrap_or("");
    let (name, description) = header.split_once(' ').unwrap_or((header, ""));
    fastq::Record::new(
        Definition::new(name.as_bytes().to_vec(), description.as_bytes().to_vec()),
        read.sequence().as_bytes().to_vec(),
        read.quality().to_phred33(),
    )
}

/// Buffered FASTQ output file; closing it is a [`Release`].
pub struct FastqSink {
    path: PathBuf,
    inner: BufWriter<File>,
}

impl FastqSink {
    /// Create (truncate) or, with `append`, reopen a FASTQ output file.
    ///
    /// # Errors
    ///
    /// Returns the I/O error raised while opening the file.
    pub fn open(path: &Path, append: bool) -> std::io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(append)
            .truncate(!append)
            .open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            inner: BufWriter::new(file),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// # Errors
    ///
    /// Returns the I/O error raised while writing.
    pub fn write(&mut self, read: &Read) -> std::io::Result<()> {
        let mut writer = fastq::io::Writer::new(&mut self.inner);
        writer.write_record(&to_record(read))
    }
}

impl Release for FastqSink {
    fn release(mut self) -> std::io::Result<bool> {
        self.inner.flush()?;
        debug!(path = %self.path.display(), "Closed FASTQ output");
        Ok(true)
    }
}

/// One FASTQ output per [`ExperimentKey`], with a bounded number of open files.
///
/// A sink evicted from the cache is flushed and closed; the next read for that
/// key reopens the file in append mode. Every output path belongs to exactly one
/// key, compared case-insensitively; a second key resolving to it is an error.
pub struct ExperimentSinks {
    directory: PathBuf,
    suffix: String,
    sinks: Cache<ExperimentKey, FastqSink>,
    /// Created outputs by case-folded path
    owners: HashMap<String, (PathBuf, ExperimentKey)>,
}

impl ExperimentSinks {
    #[must_use]
    pub fn new(directory: &Path, suffix: &str, max_open: NonZeroUsize) -> Self {
        Self {
            directory: directory.to_path_buf(),
            suffix: suffix.to_string(),
            sinks: Cache::new(max_open),
            owners: HashMap::new(),
        }
    }

    #[must_use]
    pub fn path_for(&self, key: &ExperimentKey) -> PathBuf {
        self.directory
            .join(format!("{}{}", key.file_stem(), self.suffix))
    }

    /// # Errors
    ///
    /// Returns the I/O error raised while opening or writing the output.
    pub fn write(&mut self, key: &ExperimentKey, read: &Read) -> std::io::Result<()> {
        if let Some(sink) = self.sinks.get_mut(key) {
            return sink.write(read);
        }

        let path = self.path_for(key);
        let folded = path.to_string_lossy().to_lowercase();
        let append = match self.owners.get(&folded) {
            Some((_, owner)) if owner == key => true,
            Some((existing, owner)) => {
                return Err(std::io::Error::new(
                    ErrorKind::AlreadyExists,
                    format!(
                        "experiments {owner} and {key} both resolve to output {}",
                        existing.display()
                    ),
                ));
            }
            None => false,
        };

        let mut sink = FastqSink::open(&path, append)?;
        sink.write(read)?;
        self.owners.insert(folded, (path, key.clone()));
        self.sinks.put(key.clone(), sink);
        Ok(())
    }

    /// Paths written so far.
    pub fn paths(&self) -> impl Iterator<Item = &PathBuf> {
        self.owners.values().map(|(path, _)| path)
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.sinks.stats()
    }

    /// Close every open sink.
    ///
    /// # Errors
    ///
    /// Returns an error if any sink failed to flush, now or at an earlier eviction.
    pub fn finish(mut self) -> std::io::Result<CacheStats> {
        self.sinks.clear();
        let stats = self.sinks.stats();
        if stats.failed_releases > 0 {
            return Err(std::io::Error::other(format!(
                "{} FASTQ output(s) failed to flush",
                stats.failed_releases
            )));
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Label;

    const FASTQ: &str = "@r1/1 1:N:0
ACGTN
IIII#
@r2/1
gattaca
IIIIIII
";

    #[test]
    fn test_read_fastq() {
        let reads: Vec<Read> = FastqReads::new(FASTQ.as_bytes())
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(reads.len(), 2);
        assert_eq!(reads[0].header(), Some("r1/1 1:N:0"));
        assert_eq!(reads[0].name(), "r1");
        assert_eq!(reads[0].quality().scores(), &[40, 40, 40, 40, 2]);
        assert_eq!(reads[1].sequence().to_string(), "GATTACA");
    }

    #[test]
    fn test_read_fastq_invalid_base() {
        let text = "@r1\nACGX\nIIII\n";
        let result: Result<Vec<Read>, _> = FastqReads::new(text.as_bytes()).collect();
        assert!(result.is_err());
    }

    #[test]
    fn test_to_record_splits_header() {
        let read = Read::from_text(Some("r1 XK:0:1::"), b"ACG", b"III").unwrap();
        let record = to_record(&read);
        assert_eq!(record.name(), &b"r1"[..]);
        assert_eq!(record.description(), &b"XK:0:1::"[..]);
        assert_eq!(record.sequence(), &b"ACG"[..]);
    }

    #[test]
    fn test_experiment_sinks_reopen_in_append_mode() {
        let dir = tempfile::tempdir().unwrap();
        let mut sinks = ExperimentSinks::new(dir.path(), ".fq", NonZeroUsize::new(1).unwrap());
        let a = ExperimentKey::new(Some(Label::new("a")), None, None, None);
        let b = ExperimentKey::new(Some(Label::new("b")), None, None, None);
        let read = Read::from_text(Some("r1"), b"ACGT", b"IIII").unwrap();

        sinks.write(&a, &read).unwrap();
        sinks.write(&b, &read).unwrap(); // evicts a
        sinks.write(&a, &read).unwrap(); // reopens a, evicts b
        let path_a = sinks.path_for(&a);
        let stats = sinks.finish().unwrap();
        assert_eq!(stats.forced_closes, 2);

        let content = std::fs::read_to_string(path_a).unwrap();
        assert_eq!(content, "@r1\nACGT\n+\nIIII\n@r1\nACGT\n+\nIIII\n");
    }

    #[test]
    fn test_experiment_sinks_keep_label_boundaries() {
        let dir = tempfile::tempdir().unwrap();
        let mut sinks = ExperimentSinks::new(dir.path(), ".fq", NonZeroUsize::new(4).unwrap());
        let first = ExperimentKey::new(Some(Label::new("a_b")), Some(Label::new("c")), None, None);
        let second = ExperimentKey::new(Some(Label::new("a")), Some(Label::new("b_c")), None, None);
        let r1 = Read::from_text(Some("r1"), b"ACGT", b"IIII").unwrap();
        let r2 = Read::from_text(Some("r2"), b"TTGA", b"IIII").unwrap();

        sinks.write(&first, &r1).unwrap();
        sinks.write(&second, &r2).unwrap();
        let (path_first, path_second) = (sinks.path_for(&first), sinks.path_for(&second));
        assert_ne!(path_first, path_second);
        assert_eq!(sinks.paths().count(), 2);
        sinks.finish().unwrap();

        assert_eq!(std::fs::read_to_string(path_first).unwrap(), "@r1\nACGT\n+\nIIII\n");
        assert_eq!(std::fs::read_to_string(path_second).unwrap(), "@r2\nTTGA\n+\nIIII\n");
    }

    #[test]
    fn test_experiment_sinks_reject_shared_path() {
        let dir = tempfile::tempdir().unwrap();
        let mut sinks = ExperimentSinks::new(dir.path(), ".fq", NonZeroUsize::new(4).unwrap());
        let upper = ExperimentKey::new(Some(Label::new("A")), None, None, None);
        let lower = ExperimentKey::new(Some(Label::new("a")), None, None, None);
        let read = Read::from_text(Some("r1"), b"ACGT", b"IIII").unwrap();

        sinks.write(&upper, &read).unwrap();
        let err = sinks.write(&lower, &read).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
        let path_upper = sinks.path_for(&upper);
        sinks.finish().unwrap();

        assert_eq!(std::fs::read_to_string(path_upper).unwrap(), "@r1\nACGT\n+\nIIII\n");
    }
}
