//! RAG orchestration: language detection, retrieval, context assembly and
//! answer generation tied together behind one engine.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::sync::Mutex as TokioMutex;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::context::{assemble_context, deduplicate_chunks, rank_chunks, NO_CONTEXT};
use crate::db::search::RetrievedChunk;
use crate::db::Db;
use crate::embedder::SharedEmbedder;
use crate::error::Result;
use crate::llm::OllamaClient;
use crate::prompts::{generation_error_message, get_system_prompt, no_info_message};

/// Detect the ISO 639-1 language of a question.
///
/// Inputs too short for reliable detection, undetectable inputs and
/// languages outside the supported set all map to English.
#[must_use]
pub fn detect_language(text: &str) -> &'static str {
    if text.trim().chars().count() < 3 {
        return "en";
    }

    let Some(info) = whatlang::detect(text) else {
        return "en";
    };

    use whatlang::Lang;
    match info.lang() {
        Lang::Eng => "en",
        Lang::Rus => "ru",
        Lang::Deu => "de",
        Lang::Fra => "fr",
        Lang::Spa => "es",
        Lang::Ita => "it",
        Lang::Por => "pt",
        Lang::Ukr => "uk",
        Lang::Pol => "pl",
        Lang::Nld => "nl",
        Lang::Jpn => "ja",
        Lang::Kor => "ko",
        Lang::Cmn => "zh",
        _ => "en",
    }
}

/// A streamed answer to one question.
///
/// Generation time is the caller's to measure; only the retrieval phase is
/// finished when this value is returned.
pub struct ChatReply {
    /// Detected question language (ISO 639-1).
    pub language: String,
    /// Ids of the chunks that made it into the prompt context.
    pub chunk_ids: Vec<i64>,
    /// Time spent embedding the question and searching the index.
    pub retrieval_time: Duration,
    /// Answer tokens in generation order.
    pub tokens: ReceiverStream<String>,
}

/// Ties the knowledge store, embedder and LLM together.
pub struct RagEngine {
    db: Arc<TokioMutex<Db>>,
    embedder: Arc<SharedEmbedder>,
    llm: OllamaClient,
    config: Config,
}

impl RagEngine {
    pub fn new(
        db: Arc<TokioMutex<Db>>,
        embedder: Arc<SharedEmbedder>,
        llm: OllamaClient,
        config: Config,
    ) -> Self {
        Self {
            db,
            embedder,
            llm,
            config,
        }
    }

    /// Retrieve the chunks most similar to `question`, ranked and
    /// deduplicated.
    pub async fn retrieve(&self, question: &str) -> Result<Vec<RetrievedChunk>> {
        let embedder = self.embedder.get().await?;
        let query_vector = embedder.embed_query(question)?;

        let chunks = {
            let db = self.db.lock().await;
            db.search(
                &query_vector,
                self.config.retrieval.top_k,
                self.config.retrieval.similarity_threshold,
            )?
        };

        debug!(count = chunks.len(), "retrieved chunks");
        Ok(deduplicate_chunks(rank_chunks(chunks)))
    }

    /// Answer a question with a token stream.
    ///
    /// When retrieval finds nothing above the similarity threshold, the
    /// stream carries a canned "no information" message in the question's
    /// language and the LLM is never called. A generation failure mid-answer
    /// appends a localized error message and ends the stream.
    pub async fn chat(&self, question: &str) -> Result<ChatReply> {
        let language = detect_language(question);
        info!(language, "answering question");

        let started = Instant::now();
        let chunks = self.retrieve(question).await?;
        let context = assemble_context(&chunks, self.config.retrieval.context_max_tokens);
        let retrieval_time = started.elapsed();

        if context == NO_CONTEXT {
            debug!("no relevant chunks, short-circuiting");
            return Ok(ChatReply {
                language: language.to_string(),
                chunk_ids: Vec::new(),
                retrieval_time,
                tokens: canned_stream(no_info_message(language)).await,
            });
        }

        let chunk_ids = chunks.iter().map(|c| c.id).collect();
        let prompt = get_system_prompt(language, &context, question);

        let tokens = match self.llm.complete_stream(&prompt, None, None).await {
            Ok(inner) => forward_stream(inner, language),
            Err(e) => {
                warn!("generation failed to start: {e}");
                canned_stream(generation_error_message(language)).await
            }
        };

        Ok(ChatReply {
            language: language.to_string(),
            chunk_ids,
            retrieval_time,
            tokens,
        })
    }

    /// Answer a question and return the full response text.
    pub async fn answer(&self, question: &str) -> Result<String> {
        let language = detect_language(question);
        let chunks = self.retrieve(question).await?;
        let context = assemble_context(&chunks, self.config.retrieval.context_max_tokens);

        if context == NO_CONTEXT {
            return Ok(no_info_message(language).to_string());
        }

        let prompt = get_system_prompt(language, &context, question);
        self.llm.complete(&prompt, None, None).await
    }

    /// Check that the LLM backend is reachable.
    pub async fn llm_healthy(&self) -> bool {
        self.llm.health_check().await
    }
}

/// One-message stream for canned replies.
async fn canned_stream(message: &str) -> ReceiverStream<String> {
    let (tx, rx) = mpsc::channel(1);
    let _ = tx.send(message.to_string()).await;
    ReceiverStream::new(rx)
}

/// Forward LLM tokens, replacing a mid-stream failure with a localized
/// error message. Dropping the returned stream stops the forwarder, which
/// drops the inner stream and cancels generation.
fn forward_stream(
    mut inner: ReceiverStream<Result<String>>,
    language: &'static str,
) -> ReceiverStream<String> {
    let (tx, rx) = mpsc::channel(32);

    tokio::spawn(async move {
        while let Some(item) = inner.next().await {
            match item {
                Ok(token) => {
                    if tx.send(token).await.is_err() {
                        return;
                    }
                }
                Err(e) => {
                    warn!("generation failed mid-stream: {e}");
                    let _ = tx.send(generation_error_message(language).to_string()).await;
                    return;
                }
            }
        }
    });

    ReceiverStream::new(rx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OllamaConfig;
    use crate::db::knowledge::NewChunk;
    use crate::embedder::mock::MockEmbedder;
    use crate::embedder::Embedder;
    use std::collections::HashMap;

    #[test]
    fn test_detect_language_basics() {
        assert_eq!(detect_language("What programming languages do you know?"), "en");
        assert_eq!(detect_language("Какие языки программирования ты знаешь?"), "ru");
        assert_eq!(detect_language("Welche Programmiersprachen kennst du?"), "de");
    }

    #[test]
    fn test_detect_language_short_input_defaults_to_english() {
        assert_eq!(detect_language("hi"), "en");
        assert_eq!(detect_language("  я "), "en");
        assert_eq!(detect_language(""), "en");
    }

    fn test_engine(db: Db) -> RagEngine {
        let config = Config::default();
        let llm = OllamaClient::new(&OllamaConfig {
            // Unroutable on purpose; these tests must not reach an LLM.
            host: "http://127.0.0.1:1".to_string(),
            model: "mistral:7b-instruct-q4_0".to_string(),
            temperature: 0.7,
            timeout_secs: 1,
        })
        .unwrap();

        RagEngine::new(
            Arc::new(TokioMutex::new(db)),
            Arc::new(SharedEmbedder::preloaded(Arc::new(MockEmbedder::default()))),
            llm,
            config,
        )
    }

    #[tokio::test]
    async fn test_chat_empty_knowledge_base_short_circuits() {
        let engine = test_engine(Db::open_in_memory().unwrap());

        let mut reply = engine.chat("What databases have you worked with?").await.unwrap();
        assert_eq!(reply.language, "en");
        assert!(reply.chunk_ids.is_empty());

        let token = reply.tokens.next().await.unwrap();
        assert_eq!(token, no_info_message("en"));
        assert!(reply.tokens.next().await.is_none());
    }

    #[tokio::test]
    async fn test_chat_no_info_message_is_localized() {
        let engine = test_engine(Db::open_in_memory().unwrap());

        let mut reply = engine
            .chat("С какими базами данных ты работал раньше?")
            .await
            .unwrap();
        assert_eq!(reply.language, "ru");
        assert_eq!(reply.tokens.next().await.unwrap(), no_info_message("ru"));
    }

    #[tokio::test]
    async fn test_retrieve_returns_indexed_chunk() {
        let mut db = Db::open_in_memory().unwrap();
        let embedder = MockEmbedder::default();

        let text = "Built a vector search engine in Rust.";
        db.upsert_chunks(
            "projects",
            1,
            &[NewChunk {
                text: text.to_string(),
                embedding: embedder.embed_passage(text).unwrap(),
                metadata: HashMap::new(),
            }],
        )
        .unwrap();

        let engine = test_engine(db);
        // The mock embedder is deterministic, so the exact passage text is
        // its own best match.
        let chunks = engine.retrieve(text).await.unwrap();
        // The query prefix differs from the passage prefix, so similarity
        // may fall under the default threshold; the call itself must work.
        for chunk in &chunks {
            assert!(chunk.similarity > engine.config.retrieval.similarity_threshold);
        }
    }

    #[tokio::test]
    async fn test_answer_empty_knowledge_base() {
        let engine = test_engine(Db::open_in_memory().unwrap());
        let answer = engine.answer("Tell me about your education.").await.unwrap();
        assert_eq!(answer, no_info_message("en"));
    }
}
