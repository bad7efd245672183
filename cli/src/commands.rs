use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use pprof::ProfilerGuard;
use text_encoder::{WhitespaceTokenizer, make_encoder};
use tracing::info;
use vocab::{EmbeddingSnapshot, EmbeddingTable, VocabularyBuilder};

use crate::config::{EmbeddingSettings, EncodeSettings, ExportSettings, InspectSettings};
use crate::telemetry::{init_telemetry, write_profile};

pub fn run_inspect(config_path: Option<PathBuf>, embeddings: Option<PathBuf>) -> Result<()> {
    let settings = crate::config::load_settings::<InspectSettings>("inspect", config_path)?;
    let profiler_guard = init_telemetry(settings.profile_output.is_some());

    let table = load_table(&settings.embeddings, embeddings)?;
    println!("{}", render_summary(&table, settings.preview));

    finish_profile(profiler_guard, settings.profile_output.as_deref())
}

pub fn run_encode(config_path: Option<PathBuf>, embeddings: Option<PathBuf>) -> Result<()> {
    let settings = crate::config::load_settings::<EncodeSettings>("encode", config_path)?;
    let profiler_guard = init_telemetry(settings.profile_output.is_some());

    let table = Arc::new(load_table(&settings.embeddings, embeddings)?);
    let encoder = make_encoder(table, WhitespaceTokenizer, &settings.encoder);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut write_encoded = |text: &str| -> Result<()> {
        let ids = match encoder.encode(text) {
            Ok(ids) => ids,
            Err(never) => match never {},
        };
        writeln!(out, "{}", serde_json::to_string(&ids)?)?;
        Ok(())
    };

    if settings.inputs.is_empty() {
        info!("reading texts from standard input");
        for line in io::stdin().lock().lines() {
            let line = line.context("failed to read standard input")?;
            write_encoded(&line)?;
        }
    } else {
        for text in &settings.inputs {
            write_encoded(text)?;
        }
    }

    finish_profile(profiler_guard, settings.profile_output.as_deref())
}

pub fn run_export(config_path: Option<PathBuf>, embeddings: Option<PathBuf>) -> Result<()> {
    let settings = crate::config::load_settings::<ExportSettings>("export", config_path)?;
    let profiler_guard = init_telemetry(settings.profile_output.is_some());

    let table = load_table(&settings.embeddings, embeddings)?;
    EmbeddingSnapshot::capture(&table)
        .write(&settings.output_dir)
        .with_context(|| {
            format!(
                "failed to write embeddings snapshot to {}",
                settings.output_dir.display()
            )
        })?;
    info!(
        output = %settings.output_dir.display(),
        rows = table.matrix().rows(),
        "snapshot written"
    );
    println!("Snapshot written to {}", settings.output_dir.display());

    finish_profile(profiler_guard, settings.profile_output.as_deref())
}

fn load_table(settings: &EmbeddingSettings, explicit: Option<PathBuf>) -> Result<EmbeddingTable> {
    let path = settings.resolve_path(explicit)?;
    let builder = VocabularyBuilder::new(settings.builder_config());
    builder
        .build(&path)
        .with_context(|| format!("failed to load embeddings from {}", path.display()))
}

fn render_summary(table: &EmbeddingTable, preview: usize) -> String {
    let mut lines = vec![
        format!("vocab_size = {}", table.vocab_size()),
        format!("embedding_size = {}", table.embedding_size()),
        format!("matrix_rows = {}", table.matrix().rows()),
        format!("unknown_index = {}", table.unknown_index()),
    ];
    let words = table.words_by_index();
    for (index, word) in words
        .iter()
        .enumerate()
        .filter_map(|(index, word)| word.map(|word| (index, word)))
        .take(preview)
    {
        lines.push(format!("{index}\t{word}"));
    }
    lines.join("\n")
}

fn finish_profile(guard: Option<ProfilerGuard<'static>>, output: Option<&Path>) -> Result<()> {
    if let (Some(guard), Some(profile_path)) = (guard, output) {
        ensure_parent(profile_path)?;
        write_profile(guard, profile_path)?;
        info!(path = %profile_path.display(), "CPU profile written");
    }
    Ok(())
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
    }
    Ok(())
}
