use std::path::PathBuf;

use anyhow::{Context, Result, bail, ensure};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use text_encoder::EncoderConfig;
use tracing::debug;
use vocab::{BuilderConfig, ReadMode, UnknownMean};

/// Location and parsing options of the word-vector file, shared by every command.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Path to the word-vector file. Required, either here or via `--embeddings`.
    pub embeddings_path: Option<PathBuf>,
    /// Decode records lossily instead of requiring UTF-8.
    pub is_binary_embedding: bool,
    /// Maximum number of words to read.
    pub max_words: Option<usize>,
    /// Seed for the padding row.
    pub seed: Option<u64>,
    /// Rows averaged into the unknown-token vector.
    pub unknown_mean: UnknownMean,
}

impl EmbeddingSettings {
    pub fn builder_config(&self) -> BuilderConfig {
        BuilderConfig {
            read_mode: ReadMode::from_binary_flag(self.is_binary_embedding),
            max_words: self.max_words,
            seed: self.seed,
            unknown_mean: self.unknown_mean,
        }
    }

    /// Resolves the embeddings path, preferring the command-line override.
    pub fn resolve_path(&self, explicit: Option<PathBuf>) -> Result<PathBuf> {
        match explicit.or_else(|| self.embeddings_path.clone()) {
            Some(path) => Ok(path),
            None => bail!(
                "no embeddings file configured; set `embeddings_path` or pass --embeddings"
            ),
        }
    }
}

/// Settings driving the `inspect` command.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct InspectSettings {
    #[serde(default)]
    pub embeddings: EmbeddingSettings,
    /// Number of vocabulary entries printed in index order.
    #[serde(default = "InspectSettings::default_preview")]
    pub preview: usize,
    /// Optional flamegraph destination.
    #[serde(default)]
    pub profile_output: Option<PathBuf>,
}

impl InspectSettings {
    fn default_preview() -> usize {
        10
    }
}

impl Default for InspectSettings {
    fn default() -> Self {
        Self {
            embeddings: EmbeddingSettings::default(),
            preview: Self::default_preview(),
            profile_output: None,
        }
    }
}

/// Settings powering the `encode` command.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct EncodeSettings {
    #[serde(default)]
    pub embeddings: EmbeddingSettings,
    #[serde(default)]
    pub encoder: EncoderConfig,
    /// Texts to encode; standard input is read line by line when empty.
    #[serde(default)]
    pub inputs: Vec<String>,
    #[serde(default)]
    pub profile_output: Option<PathBuf>,
}

/// Settings consumed by the `export` command.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ExportSettings {
    #[serde(default)]
    pub embeddings: EmbeddingSettings,
    /// Directory receiving `embeddings.safetensors` and `vocab.txt`.
    #[serde(default = "ExportSettings::default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub profile_output: Option<PathBuf>,
}

impl ExportSettings {
    fn default_output_dir() -> PathBuf {
        PathBuf::from("exports/embeddings")
    }
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            embeddings: EmbeddingSettings::default(),
            output_dir: Self::default_output_dir(),
            profile_output: None,
        }
    }
}

/// Reads the settings of `command` from `explicit`, or from `<command>.toml`
/// in the working directory.
///
/// A missing `<command>.toml` yields `T::default()`. A missing explicit path
/// is an error, so a mistyped `--config` never runs with defaults.
pub fn load_settings<T>(command: &str, explicit: Option<PathBuf>) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    let path = match explicit {
        Some(path) => {
            ensure!(
                path.is_file(),
                "`{command}` settings file {} does not exist",
                path.display()
            );
            path
        }
        None => {
            let fallback = PathBuf::from(format!("{command}.toml"));
            if !fallback.is_file() {
                debug!(command, "no settings file, using defaults");
                return Ok(T::default());
            }
            fallback
        }
    };

    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read `{command}` settings from {}", path.display()))?;
    toml::from_str(&raw)
        .with_context(|| format!("invalid `{command}` settings in {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn load_settings_returns_default_when_missing() {
        let settings: InspectSettings = load_settings("inspect", None).expect("default settings");
        assert_eq!(settings, InspectSettings::default());
        assert_eq!(settings.preview, 10);
    }

    #[test]
    fn load_settings_errors_for_missing_explicit_path() {
        let result: Result<EncodeSettings> =
            load_settings("encode", Some(PathBuf::from("definitely_missing.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn load_settings_names_the_file_on_invalid_toml() {
        let file = NamedTempFile::new().expect("temp file");
        let path = file.into_temp_path();
        std::fs::write(&path, "preview = \"ten\"\n").expect("write config");

        let err = load_settings::<InspectSettings>("inspect", Some(path.to_path_buf()))
            .unwrap_err();
        assert!(err.to_string().contains("invalid `inspect` settings"), "{err:#}");
    }

    #[test]
    fn load_settings_parses_toml_payload() {
        let file = NamedTempFile::new().expect("temp file");
        let path = file.into_temp_path();
        std::fs::write(
            &path,
            r#"inputs = ["The cat"]

[embeddings]
embeddings_path = "vectors/glove.txt"
is_binary_embedding = true
max_words = 5000
unknown_mean = "words_only"

[encoder]
lowercase = false
"#,
        )
        .expect("write config");

        let settings: EncodeSettings =
            load_settings("encode", Some(path.to_path_buf())).expect("parsed settings");
        assert_eq!(settings.inputs, vec!["The cat".to_string()]);
        assert!(!settings.encoder.lowercase);

        let builder = settings.embeddings.builder_config();
        assert_eq!(builder.read_mode, ReadMode::Binary);
        assert_eq!(builder.max_words, Some(5000));
        assert_eq!(builder.unknown_mean, UnknownMean::WordsOnly);
        assert_eq!(
            settings.embeddings.resolve_path(None).unwrap(),
            PathBuf::from("vectors/glove.txt")
        );
    }

    #[test]
    fn command_line_path_overrides_settings() {
        let settings = EmbeddingSettings {
            embeddings_path: Some(PathBuf::from("from_config.txt")),
            ..EmbeddingSettings::default()
        };
        let resolved = settings
            .resolve_path(Some(PathBuf::from("from_cli.txt")))
            .unwrap();
        assert_eq!(resolved, PathBuf::from("from_cli.txt"));
        assert!(EmbeddingSettings::default().resolve_path(None).is_err());
    }
}
