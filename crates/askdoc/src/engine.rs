//! The question-answering engine
//!
//! Orchestrates the full pipeline: chunk and embed on ingest, then rank,
//! filter, and generate on ask. Every ask is recorded in the owner's
//! history, including the no-information and degraded-generation outcomes.

use std::sync::Arc;

use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::generation::PromptBuilder;
use crate::ingestion::TextChunker;
use crate::providers::{EmbeddingProvider, LlmProvider, OllamaClient, OllamaEmbedder, OllamaLlm};
use crate::retrieval::SimilarityIndex;
use crate::storage::CorpusDb;
use crate::types::document::{Chunk, Document, HistoryRecord};
use crate::types::response::{AskResponse, DeleteResponse, DocumentSummary, IngestResponse};
use uuid::Uuid;

/// Fixed answer returned when no chunk clears the relevance threshold
pub const NO_RELEVANT_INFORMATION: &str = "No relevant information found.";

/// Document Q&A engine
pub struct RagEngine {
    config: RagConfig,
    db: CorpusDb,
    chunker: TextChunker,
    embedder: Arc<dyn EmbeddingProvider>,
    llm: Arc<dyn LlmProvider>,
}

impl std::fmt::Debug for RagEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RagEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RagEngine {
    /// Create an engine backed by Ollama, opening (or creating) the corpus
    /// database at the configured path
    pub fn new(config: RagConfig) -> Result<Self> {
        let db = CorpusDb::new(&config.storage.database_path)?;

        let client = Arc::new(OllamaClient::new(&config.llm)?);
        let embedder = OllamaEmbedder::from_client(Arc::clone(&client), &config.embeddings);
        let llm = OllamaLlm::from_client(client, &config.llm);

        Self::with_providers(config, db, Arc::new(embedder), Arc::new(llm))
    }

    /// Create an engine over explicit providers and an open database
    ///
    /// Validates the config first; a zero chunking stride would otherwise
    /// never advance the chunk window.
    pub fn with_providers(
        config: RagConfig,
        db: CorpusDb,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmProvider>,
    ) -> Result<Self> {
        config.validate()?;

        let chunker = TextChunker::new(config.chunking.window_size, config.chunking.stride);
        Ok(Self {
            config,
            db,
            chunker,
            embedder,
            llm,
        })
    }

    /// Ingest a document: chunk, embed, and store atomically
    pub async fn ingest(
        &self,
        owner_id: &str,
        source_label: &str,
        text: &str,
    ) -> Result<IngestResponse> {
        if text.trim().is_empty() {
            return Err(Error::ExtractionEmpty(source_label.to_string()));
        }

        let pieces = self.chunker.chunk(text);
        let embeddings = self.embedder.embed_batch(&pieces).await?;

        if embeddings.len() != pieces.len() {
            return Err(Error::embedding(format!(
                "Embedder returned {} vectors for {} chunks",
                embeddings.len(),
                pieces.len()
            )));
        }
        let expected = self.embedder.dimensions();
        for embedding in &embeddings {
            if embedding.len() != expected {
                return Err(Error::embedding(format!(
                    "Embedder returned {} dimensions, expected {}",
                    embedding.len(),
                    expected
                )));
            }
        }

        let document = Document::new(owner_id, source_label);
        let chunks: Vec<Chunk> = pieces
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(i, (content, embedding))| {
                Chunk::new(document.id, i as u32, content, embedding)
            })
            .collect();

        let chunks_created = chunks.len();
        self.db.insert_document(&document, &chunks)?;

        tracing::info!(
            document_id = %document.id,
            owner_id,
            chunks_created,
            "Ingested document '{}'",
            source_label
        );

        Ok(IngestResponse {
            document_id: document.id,
            source_label: source_label.to_string(),
            chunks_created,
        })
    }

    /// Delete a document owned by the caller, along with all of its chunks
    pub fn delete(&self, owner_id: &str, document_id: Uuid) -> Result<DeleteResponse> {
        let chunks_removed = self.db.delete_document(owner_id, document_id)?;

        tracing::info!(%document_id, owner_id, chunks_removed, "Deleted document");

        Ok(DeleteResponse {
            document_id,
            chunks_removed,
        })
    }

    /// Answer a question from the caller's corpus
    ///
    /// Every call appends a history record, whatever the outcome. An
    /// embedding failure is the one exception: nothing was asked of the
    /// corpus, so the error propagates and no record is written.
    pub async fn ask(&self, owner_id: &str, question: &str) -> Result<AskResponse> {
        let query = self.embedder.embed(question).await?;

        let scope = if self.config.retrieval.shared_corpus {
            None
        } else {
            Some(owner_id)
        };
        let chunks = self.db.chunks_in_scope(scope)?;

        let index = SimilarityIndex::build(&chunks)?;
        let results = index.search(
            &query,
            self.config.retrieval.top_k,
            self.config.retrieval.score_threshold,
        )?;

        let (answer, sources) = if results.is_empty() {
            (NO_RELEVANT_INFORMATION.to_string(), Vec::new())
        } else {
            let context = PromptBuilder::build_context(&results);
            let sources = PromptBuilder::distinct_sources(&results);

            let answer = match self.llm.generate_answer(question, &context).await {
                Ok(answer) => answer.trim().to_string(),
                Err(e) => {
                    tracing::error!("Answer generation failed: {}", e);
                    format!("Error: {}", e)
                }
            };

            (answer, sources)
        };

        self.db.append_history(&HistoryRecord::new(
            owner_id,
            question,
            answer.clone(),
            sources.clone(),
        ))?;

        Ok(AskResponse { answer, sources })
    }

    /// Read the caller's question history in chronological order
    pub fn history(&self, owner_id: &str, limit: usize, offset: usize) -> Result<Vec<HistoryRecord>> {
        self.db.history_for_owner(owner_id, limit, offset)
    }

    /// List the caller's documents
    pub fn documents(&self, owner_id: &str) -> Result<Vec<DocumentSummary>> {
        Ok(self
            .db
            .list_documents(owner_id)?
            .into_iter()
            .map(|d| DocumentSummary {
                id: d.id,
                filename: d.filename,
                ingested_at: d.ingested_at,
            })
            .collect())
    }

    /// Check whether the generation backend is reachable
    pub async fn backend_healthy(&self) -> bool {
        self.llm.health_check().await.unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};
    use std::sync::atomic::{AtomicUsize, Ordering};

    const STUB_DIMS: usize = 64;

    /// Deterministic bag-of-words embedder: each word hashes into a bucket,
    /// so texts sharing vocabulary get similar vectors.
    struct StubEmbedder;

    fn bucket_embedding(text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; STUB_DIMS];
        for word in text.to_lowercase().split_whitespace() {
            let word = word.trim_matches(|c: char| !c.is_alphanumeric());
            if word.is_empty() {
                continue;
            }
            let mut hasher = DefaultHasher::new();
            word.hash(&mut hasher);
            v[(hasher.finish() % STUB_DIMS as u64) as usize] += 1.0;
        }
        v
    }

    #[async_trait]
    impl EmbeddingProvider for StubEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            Ok(bucket_embedding(text))
        }

        fn dimensions(&self) -> usize {
            STUB_DIMS
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        fn name(&self) -> &str {
            "stub"
        }
    }

    /// Canned-answer LLM that counts how often it was invoked
    struct StubLlm {
        calls: AtomicUsize,
    }

    impl StubLlm {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl LlmProvider for StubLlm {
        async fn generate_answer(&self, _question: &str, context: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("Answer grounded in {} bytes of context", context.len()))
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        fn name(&self) -> &str {
            "stub"
        }

        fn model(&self) -> &str {
            "stub-model"
        }
    }

    /// LLM that pads its answers with whitespace, as Ollama completions do
    struct PaddedLlm;

    #[async_trait]
    impl LlmProvider for PaddedLlm {
        async fn generate_answer(&self, _question: &str, _context: &str) -> Result<String> {
            Ok("\n  The capital is Paris.  \n".to_string())
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        fn name(&self) -> &str {
            "padded"
        }

        fn model(&self) -> &str {
            "padded-model"
        }
    }

    /// LLM whose generation always fails
    struct FailingLlm;

    #[async_trait]
    impl LlmProvider for FailingLlm {
        async fn generate_answer(&self, _question: &str, _context: &str) -> Result<String> {
            Err(Error::generation("model exploded"))
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(false)
        }

        fn name(&self) -> &str {
            "failing"
        }

        fn model(&self) -> &str {
            "failing-model"
        }
    }

    fn engine_with_llm(llm: Arc<dyn LlmProvider>) -> RagEngine {
        let db = CorpusDb::in_memory().unwrap();
        RagEngine::with_providers(RagConfig::default(), db, Arc::new(StubEmbedder), llm).unwrap()
    }

    #[test]
    fn invalid_chunking_config_is_rejected_at_construction() {
        let db = CorpusDb::in_memory().unwrap();
        let mut config = RagConfig::default();
        config.chunking.stride = 0;

        let err = RagEngine::with_providers(
            config,
            db,
            Arc::new(StubEmbedder),
            Arc::new(StubLlm::new()),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn stub_embedder_is_deterministic() {
        let a = bucket_embedding("Paris is the capital of France");
        let b = bucket_embedding("Paris is the capital of France");
        assert_eq!(a, b);
        assert!(a.iter().any(|&x| x > 0.0));
    }

    #[tokio::test]
    async fn ingest_then_ask_finds_the_source() {
        let llm = Arc::new(StubLlm::new());
        let engine = engine_with_llm(llm.clone());

        engine
            .ingest(
                "alice",
                "geo.txt",
                "Paris is the capital of France. The Eiffel Tower is in Paris.",
            )
            .await
            .unwrap();

        let response = engine
            .ask("alice", "What is the capital of France?")
            .await
            .unwrap();

        assert_eq!(response.sources, vec!["geo.txt".to_string()]);
        assert!(response.answer.starts_with("Answer grounded in"));
        assert_eq!(llm.calls.load(Ordering::SeqCst), 1);

        let history = engine.history("alice", 50, 0).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].question, "What is the capital of France?");
        assert_eq!(history[0].sources, vec!["geo.txt".to_string()]);
    }

    #[tokio::test]
    async fn empty_corpus_short_circuits_generation() {
        let llm = Arc::new(StubLlm::new());
        let engine = engine_with_llm(llm.clone());

        let response = engine.ask("alice", "Anything at all?").await.unwrap();

        assert_eq!(response.answer, NO_RELEVANT_INFORMATION);
        assert!(response.sources.is_empty());
        assert_eq!(llm.calls.load(Ordering::SeqCst), 0);

        // The ask is still recorded.
        let history = engine.history("alice", 50, 0).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].answer, NO_RELEVANT_INFORMATION);
    }

    #[tokio::test]
    async fn answer_is_trimmed_before_return_and_record() {
        let engine = engine_with_llm(Arc::new(PaddedLlm));

        engine
            .ingest("alice", "geo.txt", "Paris is the capital of France.")
            .await
            .unwrap();

        let response = engine
            .ask("alice", "What is the capital of France?")
            .await
            .unwrap();

        assert_eq!(response.answer, "The capital is Paris.");

        let history = engine.history("alice", 50, 0).unwrap();
        assert_eq!(history[0].answer, "The capital is Paris.");
    }

    #[tokio::test]
    async fn generation_failure_degrades_to_error_answer() {
        let engine = engine_with_llm(Arc::new(FailingLlm));

        engine
            .ingest("alice", "notes.txt", "The sky is blue on clear days.")
            .await
            .unwrap();

        let response = engine
            .ask("alice", "Why is the sky blue on clear days?")
            .await
            .unwrap();

        assert!(response.answer.starts_with("Error:"), "{}", response.answer);
        assert_eq!(response.sources, vec!["notes.txt".to_string()]);

        // Degraded answers are recorded like any other.
        let history = engine.history("alice", 50, 0).unwrap();
        assert_eq!(history.len(), 1);
        assert!(history[0].answer.starts_with("Error:"));
    }

    #[tokio::test]
    async fn empty_text_is_rejected_without_side_effects() {
        let engine = engine_with_llm(Arc::new(StubLlm::new()));

        let err = engine.ingest("alice", "blank.txt", "   \n\t ").await.unwrap_err();
        assert!(matches!(err, Error::ExtractionEmpty(_)));
        assert!(engine.documents("alice").unwrap().is_empty());
    }

    #[tokio::test]
    async fn owners_do_not_see_each_others_documents() {
        let engine = engine_with_llm(Arc::new(StubLlm::new()));

        engine
            .ingest("alice", "secret.txt", "The launch code is kept in the vault.")
            .await
            .unwrap();

        let response = engine
            .ask("bob", "Where is the launch code kept in the vault?")
            .await
            .unwrap();

        assert_eq!(response.answer, NO_RELEVANT_INFORMATION);
        assert!(response.sources.is_empty());
    }

    #[tokio::test]
    async fn shared_corpus_ranks_across_owners() {
        let db = CorpusDb::in_memory().unwrap();
        let mut config = RagConfig::default();
        config.retrieval.shared_corpus = true;
        let engine = RagEngine::with_providers(
            config,
            db,
            Arc::new(StubEmbedder),
            Arc::new(StubLlm::new()),
        )
        .unwrap();

        engine
            .ingest("alice", "shared.txt", "The office wifi password is rosebud.")
            .await
            .unwrap();

        let response = engine
            .ask("bob", "What is the office wifi password?")
            .await
            .unwrap();

        assert_eq!(response.sources, vec!["shared.txt".to_string()]);
    }

    #[tokio::test]
    async fn delete_makes_document_unretrievable() {
        let engine = engine_with_llm(Arc::new(StubLlm::new()));

        let ingested = engine
            .ingest("alice", "temp.txt", "Quarterly revenue rose by ten percent.")
            .await
            .unwrap();

        let deleted = engine.delete("alice", ingested.document_id).unwrap();
        assert_eq!(deleted.chunks_removed, ingested.chunks_created);

        let response = engine
            .ask("alice", "How much did quarterly revenue rise?")
            .await
            .unwrap();
        assert_eq!(response.answer, NO_RELEVANT_INFORMATION);
    }

    #[tokio::test]
    async fn documents_lists_only_the_callers() {
        let engine = engine_with_llm(Arc::new(StubLlm::new()));

        engine.ingest("alice", "a.txt", "alpha").await.unwrap();
        engine.ingest("bob", "b.txt", "beta").await.unwrap();

        let docs = engine.documents("alice").unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].filename, "a.txt");
    }
}
