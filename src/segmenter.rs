/// Sentence-aware text segmentation with token budget and overlap.
///
/// Token counts are estimated by counting word-like runs rather than real
/// subword tokens. The same heuristic is used by the context assembler, so
/// both sides of the pipeline budget text consistently.
use std::sync::LazyLock;

use regex::Regex;

static WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\w+").expect("valid regex"));

/// Abbreviations that must not terminate a sentence.
const ABBREVIATIONS: &[&str] = &[
    "Dr.", "Mr.", "Mrs.", "Ms.", "Jr.", "Sr.", "e.g.", "i.e.",
];

/// Placeholder used to protect abbreviation dots during sentence splitting.
const DOT_MARK: char = '\u{1}';

/// Estimate the number of tokens in `text` by counting word-like runs.
#[must_use]
pub fn estimate_tokens(text: &str) -> usize {
    WORD_RE.find_iter(text).count()
}

/// Split `text` into token-bounded chunks with sentence overlap.
///
/// Short texts (estimated tokens ≤ `max_tokens`) come back as a single
/// trimmed chunk. Longer texts are split into sentences and packed greedily;
/// each new chunk is seeded with the maximal suffix of the previous chunk's
/// sentences that fits within `overlap_tokens`. Closed chunks shorter than
/// `min_chunk_size` tokens are dropped.
#[must_use]
pub fn segment(
    text: &str,
    max_tokens: usize,
    overlap_tokens: usize,
    min_chunk_size: usize,
) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    if estimate_tokens(text) <= max_tokens {
        return vec![text.trim().to_string()];
    }

    let sentences = split_into_sentences(text);

    let mut chunks: Vec<String> = Vec::new();
    let mut current: Vec<String> = Vec::new();
    let mut current_tokens = 0usize;

    for sentence in sentences {
        let sentence_tokens = estimate_tokens(&sentence);

        if sentence_tokens > max_tokens {
            // Sentence alone exceeds the budget: split on clause punctuation
            // and pack the fragments with the same greedy/overlap rule.
            for part in sentence.split([',', ';', ':']) {
                let part = part.trim();
                if part.is_empty() {
                    continue;
                }

                let part_tokens = estimate_tokens(part);
                if current_tokens + part_tokens > max_tokens {
                    close_chunk(&mut chunks, &current, current_tokens, min_chunk_size);
                    let mut seeded = overlap_window(&current, overlap_tokens);
                    seeded.push(part.to_string());
                    current_tokens = seeded.iter().map(|s| estimate_tokens(s)).sum();
                    current = seeded;
                } else {
                    current.push(part.to_string());
                    current_tokens += part_tokens;
                }
            }
        } else if current_tokens + sentence_tokens > max_tokens {
            close_chunk(&mut chunks, &current, current_tokens, min_chunk_size);
            let mut seeded = overlap_window(&current, overlap_tokens);
            seeded.push(sentence);
            current_tokens = seeded.iter().map(|s| estimate_tokens(s)).sum();
            current = seeded;
        } else {
            current.push(sentence);
            current_tokens += sentence_tokens;
        }
    }

    close_chunk(&mut chunks, &current, current_tokens, min_chunk_size);

    chunks
}

/// Append the accumulated sentences as a chunk if the minimum size is met.
fn close_chunk(chunks: &mut Vec<String>, current: &[String], tokens: usize, min_chunk_size: usize) {
    if !current.is_empty() && tokens >= min_chunk_size {
        chunks.push(current.join(" "));
    }
}

/// The maximal suffix of `sentences` whose cumulative token count fits
/// within `overlap_tokens`.
fn overlap_window(sentences: &[String], overlap_tokens: usize) -> Vec<String> {
    let mut window: Vec<String> = Vec::new();
    let mut tokens = 0usize;

    for sentence in sentences.iter().rev() {
        let sentence_tokens = estimate_tokens(sentence);
        if tokens + sentence_tokens > overlap_tokens {
            break;
        }
        window.insert(0, sentence.clone());
        tokens += sentence_tokens;
    }

    window
}

/// Split text into sentences on whitespace following `.`, `!` or `?`,
/// protecting common abbreviations from being treated as terminators.
#[must_use]
pub fn split_into_sentences(text: &str) -> Vec<String> {
    let mut protected = text.to_string();
    for abbr in ABBREVIATIONS {
        let masked: String = abbr
            .chars()
            .map(|c| if c == '.' { DOT_MARK } else { c })
            .collect();
        protected = protected.replace(abbr, &masked);
    }

    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = protected.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);
        if matches!(c, '.' | '!' | '?') && chars.peek().is_some_and(|n| n.is_whitespace()) {
            while chars.peek().is_some_and(|n| n.is_whitespace()) {
                chars.next();
            }
            sentences.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        sentences.push(current);
    }

    sentences
        .into_iter()
        .map(|s| s.replace(DOT_MARK, ".").trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
