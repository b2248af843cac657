//! Integration tests for the ingest → retrieve → chat flow.
//!
//! Records are served by a mock HTTP server, embedded with the offline
//! hashing provider and answered by in-test generators.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use ragbot_embeddings::HashingProvider;
use ragbot_retrieval::{
    ExtractiveGenerator, GenerationError, Generator, HttpSource, IndexError, IngestionPipeline,
    QueryConfig, RagEngine, RagError, Session, SharedIndex, SharedPassages, StaticSource,
    shared_store,
};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const DIM: usize = 512;

/// Echoes the passages it was given, in order, and can be switched to fail.
#[derive(Default)]
struct EchoGenerator {
    broken: AtomicBool,
}

#[async_trait]
impl Generator for EchoGenerator {
    fn name(&self) -> &str {
        "echo"
    }

    async fn generate(
        &self,
        _question: &str,
        passages: &[String],
    ) -> Result<String, GenerationError> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(GenerationError::ApiRequest("model offline".to_string()));
        }
        Ok(passages.join(" | "))
    }
}

async fn wordpress_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wp-json/wp/v2/posts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "content": {"rendered": "Rust guarantees memory safety without a garbage collector"}},
            {"id": 2, "content": {"rendered": "Bread dough rises while yeast ferments sugar"}},
            {"id": 3, "content": {"rendered": "Tokio is an asynchronous runtime for Rust"}}
        ])))
        .mount(&server)
        .await;
    server
}

async fn ingest_from(server: &MockServer) -> (SharedIndex, SharedPassages) {
    let (index, passages) = shared_store();
    let source = HttpSource::new(format!("{}/wp-json/wp/v2/posts", server.uri()));

    let added = IngestionPipeline::new(
        Arc::new(source),
        Arc::new(HashingProvider::new(DIM)),
        index.clone(),
        passages.clone(),
    )
    .with_text_field("content.rendered")
    .run()
    .await
    .unwrap();

    assert_eq!(added, 3);
    (index, passages)
}

#[tokio::test]
async fn test_http_ingest_then_answer() {
    let server = wordpress_server().await;
    let (index, passages) = ingest_from(&server).await;

    let engine = RagEngine::new(
        index,
        passages,
        Arc::new(HashingProvider::new(DIM)),
        Arc::new(ExtractiveGenerator),
    );
    let mut session = Session::new(engine);

    let answer = session
        .ask("Tokio is an asynchronous runtime for Rust")
        .await
        .unwrap();
    assert_eq!(answer, "Tokio is an asynchronous runtime for Rust");
    assert_eq!(session.history().len(), 1);
}

#[tokio::test]
async fn test_generator_sees_passages_in_rank_order() {
    let server = wordpress_server().await;
    let (index, passages) = ingest_from(&server).await;

    let engine = RagEngine::new(
        index,
        passages,
        Arc::new(HashingProvider::new(DIM)),
        Arc::new(EchoGenerator::default()),
    )
    .with_query_config(QueryConfig { top_k: 10 });

    let question = "Bread dough rises while yeast ferments sugar";
    let retrieved = engine.retrieve(question).await.unwrap();
    assert_eq!(retrieved.len(), 3);
    assert!(retrieved.windows(2).all(|w| w[0].score >= w[1].score));

    let expected = retrieved
        .iter()
        .map(|p| p.text.as_str())
        .collect::<Vec<_>>()
        .join(" | ");
    assert_eq!(engine.generate(question).await.unwrap(), expected);
    assert!(expected.starts_with("Bread dough"));
}

#[tokio::test]
async fn test_failed_fetch_leaves_store_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let (index, passages) = shared_store();
    let err = IngestionPipeline::new(
        Arc::new(HttpSource::new(server.uri())),
        Arc::new(HashingProvider::new(DIM)),
        index.clone(),
        passages.clone(),
    )
    .run()
    .await
    .unwrap_err();

    assert!(matches!(err, RagError::Fetch(_)));
    assert!(!index.read().await.is_built());
    assert!(passages.read().await.is_empty());
}

#[tokio::test]
async fn test_question_before_ingestion_is_retrieval_error() {
    let (index, passages) = shared_store();
    let engine = RagEngine::new(
        index,
        passages,
        Arc::new(HashingProvider::new(DIM)),
        Arc::new(ExtractiveGenerator),
    );
    let mut session = Session::new(engine);

    let err = session.ask("anyone there?").await.unwrap_err();
    assert!(matches!(err, RagError::Retrieval(IndexError::IndexNotBuilt)));
    assert!(session.history().is_empty());
}

#[tokio::test]
async fn test_session_survives_engine_failure() {
    let (index, passages) = shared_store();
    IngestionPipeline::new(
        Arc::new(StaticSource::from_texts(["ferris is a crab", "gophers dig"])),
        Arc::new(HashingProvider::new(DIM)),
        index.clone(),
        passages.clone(),
    )
    .run()
    .await
    .unwrap();

    let generator = Arc::new(EchoGenerator::default());
    let engine = RagEngine::new(
        index,
        passages,
        Arc::new(HashingProvider::new(DIM)),
        generator.clone(),
    )
    .with_query_config(QueryConfig { top_k: 1 });
    let mut session = Session::new(engine);

    let first = session.ask("ferris is a crab").await.unwrap();
    assert_eq!(first, "ferris is a crab");

    generator.broken.store(true, Ordering::SeqCst);
    let err = session.ask("gophers dig").await.unwrap_err();
    assert!(matches!(err, RagError::Generation(_)));

    let history = session.history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].question, "ferris is a crab");
    assert_eq!(history[0].answer, "ferris is a crab");

    session.close();
    generator.broken.store(false, Ordering::SeqCst);
    for question in ["gophers dig", ""] {
        assert!(matches!(
            session.ask(question).await.unwrap_err(),
            RagError::SessionClosed
        ));
    }
}

#[tokio::test]
async fn test_reingestion_appends_and_keeps_ids_aligned() {
    let (index, passages) = shared_store();
    let embedder = Arc::new(HashingProvider::new(DIM));

    for batch in [vec!["first batch alpha"], vec!["second batch beta", "second batch gamma"]] {
        IngestionPipeline::new(
            Arc::new(StaticSource::from_texts(batch)),
            embedder.clone(),
            index.clone(),
            passages.clone(),
        )
        .run()
        .await
        .unwrap();
    }

    assert_eq!(index.read().await.len(), 3);
    assert_eq!(passages.read().await.len(), 3);

    let engine = RagEngine::new(index, passages, embedder, Arc::new(ExtractiveGenerator));
    let retrieved = engine.retrieve("second batch gamma").await.unwrap();
    assert_eq!(retrieved[0].id, 2);
    assert_eq!(retrieved[0].text, "second batch gamma");

    // Same state, same question, same ranking.
    assert_eq!(engine.retrieve("second batch gamma").await.unwrap(), retrieved);
}

#[tokio::test]
async fn test_text_list_body_is_ingested_per_entry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "text": ["Rust has no garbage collector", "Yeast ferments sugar"]
        })))
        .mount(&server)
        .await;

    let (index, passages) = shared_store();
    let added = IngestionPipeline::new(
        Arc::new(HttpSource::new(format!("{}/data", server.uri()))),
        Arc::new(HashingProvider::new(DIM)),
        index.clone(),
        passages.clone(),
    )
    .run()
    .await
    .unwrap();

    assert_eq!(added, 2);
    assert_eq!(index.read().await.len(), 2);
    let store = passages.read().await;
    assert_eq!(store.text(1), Some("Yeast ferments sugar"));
    assert_eq!(store.get(1).unwrap().metadata, None);
}
