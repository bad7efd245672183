use std::io::Write;

use approx::assert_relative_eq;
use rstest::rstest;
use tempfile::NamedTempFile;
use vocab::{BuilderConfig, LoadError, ReadMode, VocabularyBuilder};

fn vector_file(contents: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents).unwrap();
    file
}

fn seeded(read_mode: ReadMode) -> VocabularyBuilder {
    VocabularyBuilder::new(BuilderConfig {
        read_mode,
        seed: Some(11),
        ..BuilderConfig::default()
    })
}

#[rstest]
#[case(b"a 1 2\nb 3 4\nc 5 6\n".as_slice(), 3)]
#[case(b"3 2\na 1 2\nb 3 4\nc 5 6\n".as_slice(), 3)]
#[case(b"a 1 2\r\nb 3 4".as_slice(), 2)]
fn row_count_is_vocabulary_plus_two(#[case] contents: &[u8], #[case] words: usize) {
    let file = vector_file(contents);
    let table = seeded(ReadMode::Text).build(file.path()).unwrap();

    assert_eq!(table.vocab_size(), words);
    assert_eq!(table.matrix().rows(), words + 2);
    assert_eq!(table.unknown_index() as usize, table.matrix().rows() - 1);
    for row in table.matrix().iter_rows() {
        assert_eq!(row.len(), table.embedding_size());
    }
}

#[rstest]
#[case(ReadMode::Text)]
#[case(ReadMode::Binary)]
fn ascii_files_load_in_either_mode(#[case] mode: ReadMode) {
    let file = vector_file(b"the 1.0 2.0\ncat 3.0 4.0\n");
    let table = seeded(mode).build(file.path()).unwrap();
    assert_eq!(table.index_of("the"), Some(1));
    assert_eq!(table.index_of("cat"), Some(2));
    assert_eq!(table.matrix().row(2).unwrap(), &[3.0, 4.0]);
}

#[test]
fn rebuilding_with_the_same_seed_is_reproducible() {
    let file = vector_file(b"x 0.1 0.2 0.3\ny -0.1 -0.2 -0.3\n");
    let first = seeded(ReadMode::Text).build(file.path()).unwrap();
    let second = seeded(ReadMode::Text).build(file.path()).unwrap();
    assert_eq!(first, second);

    let padding = first.matrix().row(0).unwrap();
    let unknown = first.matrix().row(3).unwrap();
    for dim in 0..3 {
        // Word rows cancel out, leaving a third of the padding row.
        assert_relative_eq!(unknown[dim], padding[dim] / 3.0, epsilon = 1e-6);
    }
}

#[test]
fn malformed_component_reports_mode_and_returns_nothing() {
    let file = vector_file(b"a 1 2\nb 3 four\n");
    let err = seeded(ReadMode::Binary).build(file.path()).unwrap_err();
    assert!(err.is_format_mismatch());
    assert!(err.to_string().contains("read mode = binary"));
}

#[test]
fn missing_file_is_an_open_error() {
    let err = seeded(ReadMode::Text)
        .build("no/such/embeddings.vec")
        .unwrap_err();
    assert!(matches!(err, LoadError::Open { .. }));
    assert!(!err.is_format_mismatch());
}

#[test]
fn empty_file_cannot_define_a_dimension() {
    let file = vector_file(b"");
    let err = seeded(ReadMode::Text).build(file.path()).unwrap_err();
    assert!(matches!(err, LoadError::Empty));
}
