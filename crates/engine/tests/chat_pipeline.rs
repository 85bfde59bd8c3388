//! End-to-end pipeline tests with mock inference services

use async_trait::async_trait;
use quotemaster_core::{DocumentChunk, Entity, EntityType, Relation, RelationType};
use quotemaster_engine::{
    ChatOrchestrator, CompletionClient, Embedder, EngineConfig, EngineError, MemorySessionStore,
    PromptBuilder, Retriever, SessionStore, TurnState,
};
use quotemaster_store::{EmbeddingStore, KnowledgeGraph};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Deterministic embedder: axis 0 for web topics, axis 1 for design.
struct KeywordEmbedder;

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, text: &str) -> quotemaster_engine::Result<Vec<f32>> {
        let text = text.to_lowercase();
        let web = if text.contains("website") { 1.0 } else { 0.1 };
        let design = if text.contains("design") { 1.0 } else { 0.1 };
        Ok(vec![web, design])
    }
}

/// Embedder standing in for an unreachable service.
struct DownEmbedder;

#[async_trait]
impl Embedder for DownEmbedder {
    async fn embed(&self, _text: &str) -> quotemaster_engine::Result<Vec<f32>> {
        Err(EngineError::LlmUnavailable("connection refused".into()))
    }
}

/// Completion client that replays a script of results.
struct ScriptedLlm {
    script: Mutex<VecDeque<quotemaster_engine::Result<String>>>,
    calls: Mutex<usize>,
}

impl ScriptedLlm {
    fn new(script: Vec<quotemaster_engine::Result<String>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: Mutex::new(0),
        }
    }

    fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl CompletionClient for ScriptedLlm {
    async fn complete(&self, _prompt: &str) -> quotemaster_engine::Result<String> {
        *self.calls.lock().unwrap() += 1;
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("| Item | Cost |\n| --- | --- |\n| Design | 5000 |".into()))
    }
}

fn built_store() -> Arc<EmbeddingStore> {
    let store = EmbeddingStore::new();
    store
        .build(vec![
            DocumentChunk::new(0, "Website development quote: 45000 INR, 4 weeks")
                .with_embedding(vec![1.0, 0.1]),
            DocumentChunk::new(1, "UI/UX design estimate: 25000 INR, 2 weeks")
                .with_embedding(vec![0.1, 1.0]),
        ])
        .unwrap();
    Arc::new(store)
}

fn sample_graph() -> Arc<KnowledgeGraph> {
    Arc::new(KnowledgeGraph::from_parts(
        vec![
            Entity::new("p1", "Website Development", EntityType::Product)
                .with_attribute("description", "Custom website development"),
            Entity::new("s1", "UI/UX Design", EntityType::Service),
        ],
        vec![Relation::new("p1", "s1", RelationType::Requires)],
    ))
}

fn orchestrator(
    embedder: Arc<dyn Embedder>,
    llm: Arc<ScriptedLlm>,
) -> (ChatOrchestrator, Arc<MemorySessionStore>) {
    let config = EngineConfig::default();
    let sessions = Arc::new(MemorySessionStore::new());
    let retriever = Retriever::new(built_store(), sample_graph(), embedder, &config);
    let prompt_builder = PromptBuilder::new("You are a quoting assistant.", &config);
    let orchestrator = ChatOrchestrator::new(
        retriever,
        prompt_builder,
        llm,
        sessions.clone(),
        &config,
    );
    (orchestrator, sessions)
}

#[tokio::test]
async fn test_full_turn_completes_with_context() {
    let llm = Arc::new(ScriptedLlm::new(vec![Ok(
        "| Service | Cost |\n| --- | --- |\n| Website | 45000 |".into(),
    )]));
    let (orchestrator, sessions) = orchestrator(Arc::new(KeywordEmbedder), llm.clone());

    let outcome = orchestrator
        .chat(None, "What does website development cost?")
        .await;

    assert_eq!(outcome.state, TurnState::Completed);
    assert!(outcome.content.contains("45000"));
    assert!(!outcome.session_id.is_empty());
    assert!(!outcome.context_used.is_empty());
    assert_eq!(llm.call_count(), 1);

    let history = sessions.get_history(&outcome.session_id).await;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].user_message, "What does website development cost?");
}

#[tokio::test]
async fn test_session_id_reused_across_turns() {
    let llm = Arc::new(ScriptedLlm::new(vec![]));
    let (orchestrator, sessions) = orchestrator(Arc::new(KeywordEmbedder), llm);

    let first = orchestrator.chat(None, "website development price?").await;
    let second = orchestrator
        .chat(Some(first.session_id.clone()), "and the design cost?")
        .await;

    assert_eq!(first.session_id, second.session_id);
    let history = sessions.get_history(&first.session_id).await;
    assert_eq!(history.len(), 2);
}

#[tokio::test]
async fn test_llm_timeout_fails_turn_but_session_survives() {
    // First call exhausts the client's retry budget and surfaces a
    // timeout; second call succeeds.
    let llm = Arc::new(ScriptedLlm::new(vec![
        Err(EngineError::LlmTimeout("deadline exceeded".into())),
        Ok("| Service | Cost |\n| --- | --- |\n| Website | 45000 |".into()),
    ]));
    let (orchestrator, sessions) = orchestrator(Arc::new(KeywordEmbedder), llm);

    let failed = orchestrator
        .chat(Some("sess-1".into()), "website development price?")
        .await;
    assert_eq!(failed.state, TurnState::Failed);
    assert!(failed.content.contains("try again"));

    // Nothing persisted for the failed turn
    assert!(sessions.get_history("sess-1").await.is_empty());

    // Session remains usable for the next message
    let ok = orchestrator
        .chat(Some("sess-1".into()), "website development price?")
        .await;
    assert_eq!(ok.state, TurnState::Completed);
    assert_eq!(sessions.get_history("sess-1").await.len(), 1);
}

#[tokio::test]
async fn test_degraded_retrieval_still_completes() {
    let llm = Arc::new(ScriptedLlm::new(vec![]));
    let (orchestrator, _) = orchestrator(Arc::new(DownEmbedder), llm);

    let outcome = orchestrator
        .chat(None, "What does website development cost?")
        .await;

    // Embedding service down: graph-only context, turn still completes
    assert_eq!(outcome.state, TurnState::Completed);
    assert!(outcome.context_used.text.contains("Website Development"));
}

#[tokio::test]
async fn test_quotation_shortcut_skips_llm() {
    let llm = Arc::new(ScriptedLlm::new(vec![]));
    let (orchestrator, _) = orchestrator(Arc::new(KeywordEmbedder), llm.clone());

    let outcome = orchestrator.chat(None, "  Quotation  ").await;

    assert_eq!(outcome.state, TurnState::Completed);
    assert!(outcome.content.contains("**Client Name**"));
    assert_eq!(llm.call_count(), 0);
}

#[tokio::test]
async fn test_non_business_query_short_circuits() {
    let llm = Arc::new(ScriptedLlm::new(vec![]));
    let (orchestrator, _) = orchestrator(Arc::new(KeywordEmbedder), llm.clone());

    let outcome = orchestrator.chat(None, "Tell me a joke").await;

    assert_eq!(outcome.state, TurnState::Completed);
    assert!(outcome.content.contains("Business-Related"));
    assert_eq!(llm.call_count(), 0);
}

#[tokio::test]
async fn test_structured_quote_extracted_and_cached() {
    let llm = Arc::new(ScriptedLlm::new(vec![Ok(r#"{
        "client_name": "Acme",
        "project_name": "Acme Website",
        "timeline": "4 weeks",
        "pricing": {"Development": 45000.0, "Design": 25000.0}
    }"#
    .into())]));
    let (orchestrator, _) = orchestrator(Arc::new(KeywordEmbedder), llm);

    let outcome = orchestrator
        .chat(None, "quote for the Acme website project")
        .await;

    assert_eq!(outcome.state, TurnState::Completed);
    let quote = outcome.quote.expect("quote should be extracted");
    assert_eq!(quote.client_name, "Acme");
    assert_eq!(quote.total, 70000.0);

    let recent = orchestrator.recent_estimates(5);
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].project_name, "Acme Website");
}

#[tokio::test]
async fn test_uiux_estimate_parses_quote() {
    let llm = Arc::new(ScriptedLlm::new(vec![Ok(r#"```json
{"client_name": "Acme", "project_name": "Store Redesign",
 "timeline": "3 to 4 weeks",
 "pricing": {"Research & Discovery": 10000.0, "UI Design": 15000.0}}
```"#
        .into())]));
    let (orchestrator, _) = orchestrator(Arc::new(KeywordEmbedder), llm);

    let quote = orchestrator
        .uiux_estimate(Some("Acme".into()), Some("Store Redesign".into()))
        .await
        .unwrap();

    assert_eq!(quote.client_name, "Acme");
    assert_eq!(quote.total, 25000.0);
    assert_eq!(orchestrator.recent_estimates(5).len(), 1);
}

#[tokio::test]
async fn test_uiux_estimate_invalid_payload_errors() {
    let llm = Arc::new(ScriptedLlm::new(vec![Ok("not json at all".into())]));
    let (orchestrator, _) = orchestrator(Arc::new(KeywordEmbedder), llm);

    let err = orchestrator.uiux_estimate(None, None).await.unwrap_err();
    assert!(matches!(err, EngineError::Processing(_)));
}
