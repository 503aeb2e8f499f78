//! Context assembly: rank, deduplicate, and budget retrieved chunks into a
//! single context string for the prompt.

use std::collections::HashSet;

use crate::db::search::RetrievedChunk;
use crate::segmenter::estimate_tokens;

/// Sentinel returned when no chunk fits the context budget.
pub const NO_CONTEXT: &str = "No relevant information found.";

/// Separator between formatted source blocks.
const BLOCK_SEPARATOR: &str = "\n---\n\n";

/// Stable sort by similarity, highest first.
#[must_use]
pub fn rank_chunks(mut chunks: Vec<RetrievedChunk>) -> Vec<RetrievedChunk> {
    chunks.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    chunks
}

/// Drop chunks whose case-folded, trimmed text matches an earlier chunk.
///
/// First occurrence wins; relative order is preserved. Idempotent.
#[must_use]
pub fn deduplicate_chunks(chunks: Vec<RetrievedChunk>) -> Vec<RetrievedChunk> {
    let mut seen: HashSet<String> = HashSet::new();
    chunks
        .into_iter()
        .filter(|chunk| seen.insert(chunk.text.trim().to_lowercase()))
        .collect()
}

/// Format chunks into a labeled context string within a token budget.
///
/// Chunks are consumed in order; each becomes a `[Source N]` block. A block
/// that would push the estimated token total past `max_tokens` ends
/// assembly; blocks are never truncated mid-text. Returns [`NO_CONTEXT`]
/// when nothing fits.
#[must_use]
pub fn assemble_context(chunks: &[RetrievedChunk], max_tokens: usize) -> String {
    let mut blocks = Vec::new();
    let mut total_tokens = 0usize;

    for (i, chunk) in chunks.iter().enumerate() {
        let block = format!("[Source {}]\n{}\n", i + 1, chunk.text);
        let block_tokens = estimate_tokens(&block);

        if total_tokens + block_tokens > max_tokens {
            break;
        }

        blocks.push(block);
        total_tokens += block_tokens;
    }

    if blocks.is_empty() {
        return NO_CONTEXT.to_string();
    }

    blocks.join(BLOCK_SEPARATOR)
}
