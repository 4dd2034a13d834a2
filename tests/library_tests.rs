//! Tests of the public library API across modules.

use std::cell::RefCell;
use std::num::NonZeroUsize;
use std::rc::Rc;

use adna_screen::alignment::clipper::{ClipPolicyTable, PolicyError};
use adna_screen::core::read::{ReadQuad, ReadError};
use adna_screen::matching::engine::MatcherConfig;
use adna_screen::merging::processor::{MergeStats, ProcessOutcome, ReadProcessor};
use adna_screen::{
    AlignmentClipper, AlignmentRecord, Cache, ClipMode, ClipPolicy, EditString, Label, Matcher,
    MergeConfig, MergeOutcome, Read, ReadMerger, Release, Sequence,
};

const INSERT: &str =
    "TTGACCTAGCATGCAAGTCGATCCGTAAGCTTAGCGATCCATGGTACAGTCGAATCGGCTACCTGATGCATCAGTTACGA";

fn read(header: &str, bases: &str) -> Read {
    let quals = "I".repeat(bases.len());
    Read::from_text(Some(header), bases.as_bytes(), quals.as_bytes()).unwrap()
}

fn seq(s: &str) -> Sequence {
    Sequence::new(s).unwrap()
}

// ============================================================================
// Cache
// ============================================================================

/// Records every release in a shared log.
struct Tracked {
    name: &'static str,
    log: Rc<RefCell<Vec<&'static str>>>,
}

impl Release for Tracked {
    fn release(self) -> std::io::Result<bool> {
        self.log.borrow_mut().push(self.name);
        Ok(true)
    }
}

#[test]
fn test_cache_releases_least_recently_used() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let tracked = |name| Tracked {
        name,
        log: Rc::clone(&log),
    };

    let mut cache = Cache::new(NonZeroUsize::new(3).unwrap());
    cache.put("a", tracked("a"));
    cache.put("b", tracked("b"));
    cache.put("c", tracked("c"));
    cache.get("a");
    cache.put("d", tracked("d"));

    assert_eq!(*log.borrow(), vec!["b"]);
    let stats = cache.stats();
    assert_eq!(stats.forced_closes, 1);
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.size, 3);

    drop(cache);
    let mut released = log.borrow().clone();
    released.sort_unstable();
    assert_eq!(released, vec!["a", "b", "c", "d"]);
}

// ============================================================================
// Matching
// ============================================================================

#[test]
fn test_matcher_from_reference_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("barcodes.txt");
    std::fs::write(&path, "ATCGATT\tQ1\nGGCCTTA:GGCCTTC\tQ2\n").unwrap();

    let config = MatcherConfig {
        max_distance: 1,
        ..MatcherConfig::default()
    };
    let mut matcher = Matcher::load_file(&path, &config).unwrap();
    assert_eq!(matcher.find(&seq("ATCGATT")), Some(Label::new("Q1")));
    assert_eq!(matcher.find(&seq("ATCGATG")), Some(Label::new("Q1")));
    assert_eq!(matcher.find(&seq("GGCCTTG")), Some(Label::new("Q2")));
    assert_eq!(matcher.find(&seq("AAAAAAA")), None);
}

#[test]
fn test_matcher_rejects_ambiguous_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("barcodes.txt");
    std::fs::write(&path, "ATCGATT\tQ1\nATCGATT\tQ2\n").unwrap();
    assert!(Matcher::load_file(&path, &MatcherConfig::default()).is_err());
}

// ============================================================================
// Merging
// ============================================================================

#[test]
fn test_merge_pair_from_sequencer_orientation() {
    let forward = read("frag/1", &INSERT[..50]);
    // Sequenced from the other end of the fragment
    let reverse = read("frag/2", &seq(&INSERT[30..]).reverse_complement().to_string());

    let merger = ReadMerger::new(MergeConfig::default()).unwrap();
    match merger.merge(&forward, &reverse.reverse_complement()) {
        MergeOutcome::Merged { read, offset } => {
            assert_eq!(offset, 30);
            assert_eq!(read.sequence().to_string(), INSERT);
            assert_eq!(read.len(), read.quality().len());
        }
        other => panic!("expected merge, got {other:?}"),
    }
}

#[test]
fn test_processor_counts_outcomes() {
    let merger = ReadMerger::new(MergeConfig::default()).unwrap();
    let mut processor = ReadProcessor::new(merger);
    let mut stats = MergeStats::default();

    let reverse = seq(&INSERT[30..]).reverse_complement().to_string();
    let merged = ReadQuad::new(read("a/1", &INSERT[..50]), read("a/2", &reverse), None, None)
        .unwrap();
    let motif = "ACGT".repeat(15);
    let ambiguous =
        ReadQuad::new(read("b/1", &motif), read("b/2", &motif), None, None).unwrap();

    for quad in [&merged, &ambiguous] {
        let outcome = processor.process(quad);
        stats.record(&outcome);
    }

    assert_eq!(stats.read_pairs, 2);
    assert_eq!(stats.merged, 1);
    assert_eq!(stats.ambiguous, 1);
    assert_eq!(stats.experiments.get(":::"), Some(&1));

    let outcome = processor.process(&merged);
    let ProcessOutcome::Merged { read, .. } = outcome else {
        panic!("expected merge");
    };
    assert_eq!(read.header(), Some("a :::"));
}

#[test]
fn test_read_quad_name_mismatch() {
    let result = ReadQuad::new(read("a/1", "ACGT"), read("b/2", "ACGT"), None, None);
    assert!(matches!(result, Err(ReadError::NameMismatch { .. })));
}

// ============================================================================
// Clipping
// ============================================================================

fn damaged_record(read_group: &str) -> AlignmentRecord {
    AlignmentRecord {
        name: "r1".to_string(),
        read_group: Some(read_group.to_string()),
        alignment_start: 5510,
        cigar: "20M1D31M".parse().unwrap(),
        md: Some("0A17T1^C23C7".to_string()),
        edit_distance: Some(4),
        sequence: vec![b'A'; 51],
        quality: vec![30; 51],
    }
}

#[test]
fn test_clipper_per_library() {
    let mut policies = ClipPolicyTable::new(ClipPolicy {
        length: 2,
        mode: ClipMode::Soft,
    });
    policies
        .insert(
            "udg_treated",
            ClipPolicy {
                length: 2,
                mode: ClipMode::Hard,
            },
        )
        .unwrap();
    assert_eq!(
        policies.insert("udg_treated", ClipPolicy::default()),
        Err(PolicyError::DuplicateReadGroup("udg_treated".to_string()))
    );
    let clipper = AlignmentClipper::new(policies);

    let mut soft = damaged_record("untreated");
    clipper.clip(&mut soft).unwrap();
    assert_eq!(soft.cigar.to_string(), "2S18M1D29M2S");
    assert_eq!(soft.md.as_deref(), Some("16T1^C23C5"));
    assert_eq!(soft.alignment_start, 5512);
    assert_eq!(soft.edit_distance, Some(3));
    assert_eq!(soft.sequence.len(), 51);

    let mut hard = damaged_record("udg_treated");
    let report = clipper.clip(&mut hard).unwrap();
    assert_eq!(hard.cigar.to_string(), "2H18M1D29M2H");
    assert_eq!(hard.sequence.len(), 47);
    assert_eq!(hard.quality.len(), 47);
    assert_eq!(report.trimmed_front, 2);
    assert_eq!(report.trimmed_back, 2);
}

#[test]
fn test_edit_string_round_trip() {
    for text in ["50", "0A17T1^C23C7", "3C55G0", "10^AC0T4"] {
        let md: EditString = text.parse().unwrap();
        assert_eq!(md.to_string(), text);
    }
    assert!("A10".parse::<EditString>().is_err());
}
