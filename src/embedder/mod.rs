/// Embedder trait and shared types for text embedding.
///
/// The underlying E5 model is asymmetric: search queries and indexed
/// passages use distinct encoding prefixes. Callers go through
/// [`Embedder::embed_query`] / [`Embedder::embed_passage`] rather than
/// prefixing by hand.
pub mod download;
pub mod mock;
pub mod onnx;
pub mod tokenizer;

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::OnceCell;

use self::onnx::OnnxEmbedder;

/// Errors that can occur during embedding operations.
#[derive(Error, Debug)]
pub enum EmbedderError {
    #[error("inference failed: {0}")]
    InferenceFailed(String),

    #[error("model load failed: {0}")]
    ModelLoadFailed(String),

    #[error("tokenizer error: {0}")]
    TokenizerError(String),
}

/// Trait for text embedding implementations.
///
/// All implementations must be `Send + Sync` to allow concurrent use
/// behind `Arc`.
pub trait Embedder: Send + Sync {
    /// Embed a single text string into a vector.
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedderError>;

    /// Embed multiple text strings into vectors, preserving input order.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedderError>;

    /// Return the dimensionality of the embedding vectors.
    fn dimensions(&self) -> usize;

    /// Embed a search query (E5 `query: ` prefix).
    fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbedderError> {
        self.embed(&format!("query: {text}"))
    }

    /// Embed an indexed passage (E5 `passage: ` prefix).
    fn embed_passage(&self, text: &str) -> Result<Vec<f32>, EmbedderError> {
        self.embed(&format!("passage: {text}"))
    }

    /// Embed multiple passages, preserving input order.
    fn embed_passage_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedderError> {
        let prefixed: Vec<String> = texts.iter().map(|t| format!("passage: {t}")).collect();
        let refs: Vec<&str> = prefixed.iter().map(String::as_str).collect();
        self.embed_batch(&refs)
    }
}

/// Cosine similarity between two vectors.
///
/// Returns 0.0 when either vector has zero norm, never a division error.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|v| v * v).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

/// Lazily-initialized, process-wide embedder handle.
///
/// The ONNX model is loaded on first use and cached for the process
/// lifetime. Concurrent first callers are serialized by the `OnceCell`, so
/// at most one load runs at a time; once loaded the model is never
/// reloaded. Load failure surfaces to the caller.
pub struct SharedEmbedder {
    model_dir: PathBuf,
    cell: OnceCell<Arc<dyn Embedder>>,
}

impl SharedEmbedder {
    /// Handle that loads an [`OnnxEmbedder`] from `model_dir` on first use.
    #[must_use]
    pub fn onnx(model_dir: impl Into<PathBuf>) -> Self {
        Self {
            model_dir: model_dir.into(),
            cell: OnceCell::new(),
        }
    }

    /// Handle wrapping an already-constructed embedder (used in tests).
    #[must_use]
    pub fn preloaded(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            model_dir: PathBuf::new(),
            cell: OnceCell::new_with(Some(embedder)),
        }
    }

    /// Get the embedder, loading the model if this is the first use.
    pub async fn get(&self) -> Result<Arc<dyn Embedder>, EmbedderError> {
        let embedder = self
            .cell
            .get_or_try_init(|| async {
                let dir = self.model_dir.clone();
                // Model load is heavy IO + CPU; keep it off the async runtime.
                tokio::task::spawn_blocking(move || {
                    OnnxEmbedder::new(&dir).map(|e| Arc::new(e) as Arc<dyn Embedder>)
                })
                .await
                .map_err(|e| EmbedderError::ModelLoadFailed(format!("load task failed: {e}")))?
            })
            .await?;
        Ok(embedder.clone())
    }

    /// Whether the model has been loaded yet.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.cell.initialized()
    }
}
