use std::fs;
use std::path::Path;

use desk_core::error::AppError;
use tracing::info;

use crate::embeddings::Embedder;
use crate::retrieve::{ArtifactStore, IndexManifest};

/// Splitter geometry for the offline corpus build.
#[derive(Debug, Clone)]
pub struct ChunkingConfig {
    /// Upper bound on characters per chunk.
    pub max_chars: usize,
    /// Trailing characters carried into the next window when a paragraph
    /// has to be split mid-text.
    pub overlap_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chars: 500,
            overlap_chars: 50,
        }
    }
}

fn split_long_paragraph(text: &str, max_chars: usize, overlap_chars: usize, out: &mut Vec<String>) {
    let chars: Vec<char> = text.chars().collect();
    let mut start = 0usize;
    while start < chars.len() {
        let end = (start + max_chars).min(chars.len());
        let mut cut = end;
        if end < chars.len() {
            // Prefer breaking at the last whitespace inside the window.
            if let Some(pos) = chars[start..end].iter().rposition(|c| c.is_whitespace()) {
                if pos > 0 {
                    cut = start + pos;
                }
            }
        }
        let piece: String = chars[start..cut].iter().collect();
        let piece = piece.trim();
        if !piece.is_empty() {
            out.push(piece.to_string());
        }
        if cut >= chars.len() {
            break;
        }
        let next = cut.saturating_sub(overlap_chars);
        start = if next > start { next } else { cut };
    }
}

/// Paragraph-first splitting: whole paragraphs are packed into chunks up to
/// `max_chars`; an oversized paragraph falls back to overlapping character
/// windows broken at whitespace.
pub fn chunk_text(text: &str, config: &ChunkingConfig) -> Vec<String> {
    let mut out = Vec::new();
    let mut buf = String::new();

    for para in text.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
        let para_len = para.chars().count();
        if para_len > config.max_chars {
            if !buf.is_empty() {
                out.push(std::mem::take(&mut buf));
            }
            split_long_paragraph(para, config.max_chars, config.overlap_chars, &mut out);
            continue;
        }

        let buf_len = buf.chars().count();
        if !buf.is_empty() && buf_len + 2 + para_len > config.max_chars {
            out.push(std::mem::take(&mut buf));
        }
        if !buf.is_empty() {
            buf.push_str("\n\n");
        }
        buf.push_str(para);
    }

    if !buf.trim().is_empty() {
        out.push(buf);
    }
    out
}

/// `.txt` files of the corpus directory in sorted filename order, so the
/// chunk sequence (and with it every index position) is reproducible.
pub fn read_corpus_dir(dir: &Path) -> Result<Vec<(String, String)>, AppError> {
    let entries = fs::read_dir(dir).map_err(|e| {
        AppError::new("CORPUS_READ_FAILED", "Failed to read corpus directory")
            .with_details(format!("path={}; err={}", dir.display(), e))
    })?;

    let mut names: Vec<String> = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| {
            AppError::new("CORPUS_READ_FAILED", "Failed to read corpus directory entry")
                .with_details(e.to_string())
        })?;
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) == Some("txt") {
            if let Some(name) = path.file_name().and_then(|s| s.to_str()) {
                names.push(name.to_string());
            }
        }
    }
    names.sort();

    let mut out = Vec::with_capacity(names.len());
    for name in names {
        let path = dir.join(&name);
        let text = fs::read_to_string(&path).map_err(|e| {
            AppError::new("CORPUS_READ_FAILED", "Failed to read corpus file")
                .with_details(format!("path={}; err={}", path.display(), e))
        })?;
        out.push((name, text));
    }
    Ok(out)
}

/// Full offline build: chunk every corpus file, embed every chunk, persist
/// the checksum-linked artifact pair.
pub fn build_index(
    corpus_dir: &Path,
    store: &ArtifactStore,
    embedder: &dyn Embedder,
    model: &str,
    built_at: &str,
) -> Result<IndexManifest, AppError> {
    let config = ChunkingConfig::default();
    let files = read_corpus_dir(corpus_dir)?;

    let mut chunks: Vec<String> = Vec::new();
    for (name, text) in &files {
        let file_chunks = chunk_text(text, &config);
        info!(file = %name, chunks = file_chunks.len(), "corpus file chunked");
        chunks.extend(file_chunks);
    }
    if chunks.is_empty() {
        return Err(AppError::new(
            "INDEX_NO_CHUNKS",
            "Corpus produced no chunks; nothing to index",
        )
        .with_details(format!("corpus_dir={}", corpus_dir.display())));
    }

    let vectors = embedder.embed_batch(model, &chunks)?;
    let manifest = store.write_pair(model, built_at, &vectors, &chunks)?;
    info!(rows = manifest.rows, dims = manifest.dims, "index build complete");
    Ok(manifest)
}
