//! # ragfolio: personal knowledge base RAG engine
//!
//! Retrieval-augmented chat over a personal profile: structured records
//! (basics, work experience, projects, skills, education) are formatted,
//! chunked, embedded, and stored in a local vector index, then retrieved at
//! chat time to ground a streamed LLM answer in the language of the question.
//!
//! ## Architecture
//!
//! - **[`config`]**: JSON configuration: chunking, retrieval, model, Ollama
//! - **[`segmenter`]**: sentence-aware chunking with token budget and overlap
//! - **[`embedder`]**: text embedding via ONNX Runtime (multilingual-e5-base)
//! - **[`db`]**: SQLite + sqlite-vec knowledge index (upsert, cosine search)
//! - **[`profile`]**: source record types and the read-only `ProfileStore` seam
//! - **[`formatter`]**: record → labeled text blocks for indexing
//! - **[`indexer`]**: per-source and full reindex pipeline
//! - **[`context`]**: rank / deduplicate / budget retrieved chunks
//! - **[`llm`]**: Ollama client with blocking and streaming completion
//! - **[`prompts`]**: per-language prompt templates and fallback messages
//! - **[`rag`]**: the orchestrator: detect → retrieve → assemble → generate

pub mod config;
pub mod context;
pub mod db;
pub mod embedder;
pub mod error;
pub mod formatter;
pub mod indexer;
pub mod llm;
pub mod profile;
pub mod prompts;
pub mod rag;
pub mod segmenter;

pub use error::{RagError, Result};
