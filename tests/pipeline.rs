use std::io::Write;

use approx::assert_relative_eq;
use candle_core::{Device, Tensor};
use rstest::{fixture, rstest};
use tempfile::NamedTempFile;
use vecprep::embedding_adapter::{
    AdapterConfig, ExecutionSpec, Features, GraphError, Labels, Mode, Model, Node, Session,
};
use vecprep::text_encoder::WhitespaceTokenizer;
use vecprep::vocab::{BuilderConfig, LoadError};
use vecprep::TextPreprocessor;

/// Sums the embedded vectors of each example.
struct BagOfVectors;

impl Model for BagOfVectors {
    type Params = ();

    fn params(&self) -> &() {
        &()
    }

    fn model_fn(
        &self,
        features: Features,
        _labels: Option<Labels>,
        mode: Mode,
        _session: &Session,
    ) -> Result<ExecutionSpec, GraphError> {
        let text = features
            .get("comment_text")
            .cloned()
            .ok_or_else(|| GraphError::MissingFeature("comment_text".into()))?;
        let mut spec = ExecutionSpec::new(mode);
        spec.predictions
            .insert("bag".into(), text.map(|tensor| tensor.sum(0)));
        Ok(spec)
    }
}

#[fixture]
fn vectors() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "4 3").unwrap();
    writeln!(file, "the 0.1 0.2 0.3").unwrap();
    writeln!(file, "cat 1.0 0.0 0.0").unwrap();
    writeln!(file, "sat 0.0 1.0 0.0").unwrap();
    writeln!(file, "mat 0.0 0.0 1.0").unwrap();
    file
}

fn load(file: &NamedTempFile) -> TextPreprocessor {
    TextPreprocessor::load(
        file.path(),
        BuilderConfig {
            seed: Some(99),
            ..BuilderConfig::default()
        },
    )
    .unwrap()
}

#[rstest]
#[case("The cat sat", vec![1, 2, 3])]
#[case("the MAT", vec![1, 4])]
#[case("the dog", vec![1, 5])]
#[case("", vec![])]
fn texts_encode_to_vocabulary_indices(
    vectors: NamedTempFile,
    #[case] text: &str,
    #[case] expected: Vec<u32>,
) {
    let preprocessor = load(&vectors);
    assert_eq!(preprocessor.unknown_index(), 5);
    let encoder = preprocessor.encoder(WhitespaceTokenizer, true);
    assert_eq!(encoder.encode(text).unwrap(), expected);
}

#[rstest]
fn encoded_text_flows_through_the_wrapped_model(vectors: NamedTempFile) {
    let preprocessor = load(&vectors);
    let encoder = preprocessor.encoder(WhitespaceTokenizer, true);
    let model =
        preprocessor.add_embedding_to_model(BagOfVectors, "comment_text", AdapterConfig::default());
    let session = Session::new(Device::Cpu);

    let ids = encoder.encode_to_tensor("cat sat mat", session.device()).unwrap();
    let features = Features::from([("comment_text".to_string(), Node::constant(ids))]);
    let spec = model
        .model_fn(features, None, Mode::Predict, &session)
        .unwrap();
    spec.scaffold.initialize(&session).unwrap();

    let bag = spec.predictions["bag"].eval(&session).unwrap();
    assert_eq!(bag.to_vec1::<f32>().unwrap(), vec![1.0, 1.0, 1.0]);
}

#[rstest]
fn unknown_words_embed_to_the_mean_row(vectors: NamedTempFile) {
    let preprocessor = load(&vectors);
    let encoder = preprocessor.encoder(WhitespaceTokenizer, true);
    let model =
        preprocessor.add_embedding_to_model(BagOfVectors, "comment_text", AdapterConfig::default());
    let session = Session::default();

    let ids = encoder.encode_to_tensor("zebra", session.device()).unwrap();
    let features = Features::from([("comment_text".to_string(), Node::constant(ids))]);
    let spec = model
        .model_fn(features, None, Mode::Predict, &session)
        .unwrap();
    spec.scaffold.initialize(&session).unwrap();

    let bag = spec.predictions["bag"].eval(&session).unwrap().to_vec1::<f32>().unwrap();
    let matrix = preprocessor.table().matrix();
    let padding = matrix.row(0).unwrap();
    for (dim, value) in bag.iter().enumerate() {
        let words: f32 = (1..=4).map(|row| matrix.row(row).unwrap()[dim]).sum();
        assert_relative_eq!(*value, (padding[dim] + words) / 5.0, epsilon = 1e-5);
    }
}

#[rstest]
fn wrong_mode_for_a_binary_file_is_reported(vectors: NamedTempFile) {
    let mut binary = NamedTempFile::new().unwrap();
    binary.write_all(b"2 2\nw\x80rd 1.0 2.0\n").unwrap();
    let err = TextPreprocessor::load(binary.path(), BuilderConfig::default()).unwrap_err();
    assert!(matches!(err, LoadError::InvalidEncoding { line: 2, .. }));
    assert!(err.to_string().contains("binary"));

    // The header-bearing text fixture still loads in binary mode.
    let preprocessor = TextPreprocessor::load(
        vectors.path(),
        BuilderConfig {
            read_mode: vecprep::vocab::ReadMode::Binary,
            ..BuilderConfig::default()
        },
    )
    .unwrap();
    assert_eq!(preprocessor.embedding_size(), 3);
}

#[test]
fn tensor_ids_match_plain_ids() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "a 1 1").unwrap();
    let preprocessor = load(&file);
    let encoder = preprocessor.encoder(WhitespaceTokenizer, false);
    let tensor = encoder.encode_to_tensor("a b a", &Device::Cpu).unwrap();
    let expected = Tensor::new(&[1u32, 2, 1], &Device::Cpu).unwrap();
    assert_eq!(
        tensor.to_vec1::<u32>().unwrap(),
        expected.to_vec1::<u32>().unwrap()
    );
}
