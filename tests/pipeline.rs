//! End-to-end pipeline tests with fake embedding/generation/PDF stages.
//!
//! Covers the ingestion invariants (idempotency, ledger self-healing,
//! per-file failure isolation) and the HTTP boundary contract
//! (400 / 503 / 200, and that an empty store never reaches generation).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use tempfile::TempDir;

use citeline::config::{
    ChunkingConfig, Config, EmbeddingConfig, GenerationConfig, RetrievalConfig, ServerConfig,
    StorageConfig,
};
use citeline::embedding::Embedder;
use citeline::generate::Generator;
use citeline::ingest::run_ingest;
use citeline::ledger::Ledger;
use citeline::models::{Chunk, ChunkMetadata, PageText};
use citeline::pdf::{PdfInfo, PdfReader};
use citeline::server::{build_router, AppState};
use citeline::store::PassageStore;
use citeline::{db, migrate};

// ============ Fakes ============

/// Deterministic embedder: maps each text to a small vector derived from
/// its bytes, so similar runs produce identical vectors.
struct FakeEmbedder {
    calls: AtomicUsize,
}

impl FakeEmbedder {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Embedder for FakeEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts
            .iter()
            .map(|t| {
                let sum: u32 = t.bytes().map(u32::from).sum();
                vec![t.len() as f32, (sum % 97) as f32, 1.0]
            })
            .collect())
    }

    fn model_name(&self) -> &str {
        "fake-embedder"
    }
}

/// Canned generator that records whether it was ever invoked.
struct FakeGenerator {
    response: String,
    calls: AtomicUsize,
}

impl FakeGenerator {
    fn new(response: &str) -> Self {
        Self {
            response: response.to_string(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Generator for FakeGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.response.clone())
    }

    fn model_name(&self) -> &str {
        "fake-generator"
    }
}

/// In-memory PDF capability: page text keyed by file name. Files listed in
/// `failing` error on access, like a corrupt PDF would.
struct FakePdfReader {
    pages: HashMap<String, Vec<PageText>>,
    failing: Vec<String>,
}

impl FakePdfReader {
    fn new() -> Self {
        Self {
            pages: HashMap::new(),
            failing: Vec::new(),
        }
    }

    fn with_document(mut self, file_name: &str, page_texts: &[&str]) -> Self {
        let pages = page_texts
            .iter()
            .enumerate()
            .map(|(i, text)| PageText {
                page_number: i as i64 + 1,
                text: text.to_string(),
            })
            .collect();
        self.pages.insert(file_name.to_string(), pages);
        self
    }

    fn with_failing(mut self, file_name: &str) -> Self {
        self.failing.push(file_name.to_string());
        self
    }

    fn file_name(path: &Path) -> String {
        path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default()
    }
}

impl PdfReader for FakePdfReader {
    fn load_pages(&self, path: &Path) -> Result<Vec<PageText>> {
        let name = Self::file_name(path);
        if self.failing.contains(&name) {
            bail!("simulated PDF parse failure for {}", name);
        }
        Ok(self.pages.get(&name).cloned().unwrap_or_default())
    }

    fn read_info(&self, path: &Path) -> Result<PdfInfo> {
        let name = Self::file_name(path);
        if self.failing.contains(&name) {
            bail!("simulated PDF parse failure for {}", name);
        }
        Ok(PdfInfo {
            title: Some(format!("Title of {}", name)),
            doi: Some(format!("10.1000/{}", name.trim_end_matches(".pdf"))),
        })
    }
}

// ============ Environment ============

struct TestEnv {
    _tmp: TempDir,
    config: Config,
    store: PassageStore,
}

impl TestEnv {
    fn pdf_dir(&self) -> &Path {
        &self.config.storage.pdf_dir
    }

    fn ledger_path(&self) -> &Path {
        &self.config.storage.ledger_path
    }
}

async fn setup_env() -> TestEnv {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();
    std::fs::create_dir_all(root.join("pdf_documents")).unwrap();

    let config = Config {
        storage: StorageConfig {
            db_path: root.join("data").join("citeline.sqlite"),
            pdf_dir: root.join("pdf_documents"),
            ledger_path: root.join("data").join("processed_files.json"),
        },
        chunking: ChunkingConfig::default(),
        retrieval: RetrievalConfig::default(),
        embedding: EmbeddingConfig {
            provider: "gemini".to_string(),
            model: "text-embedding-004".to_string(),
            max_retries: 0,
            timeout_secs: 5,
        },
        generation: GenerationConfig {
            provider: "gemini".to_string(),
            model: "gemini-2.5-flash-preview-05-20".to_string(),
            temperature: 0.3,
            max_retries: 0,
            timeout_secs: 5,
        },
        server: ServerConfig {
            bind: "127.0.0.1:0".to_string(),
        },
    };

    let pool = db::connect(&config.storage.db_path).await.unwrap();
    migrate::run_migrations(&pool).await.unwrap();
    let store = PassageStore::new(pool);

    TestEnv {
        _tmp: tmp,
        config,
        store,
    }
}

/// The on-disk PDF only has to exist; content comes from the fake reader.
fn touch_pdf(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, b"%PDF-1.4 placeholder").unwrap();
    path
}

// ============ Ingestion invariants ============

#[tokio::test]
async fn ingestion_is_idempotent() {
    let env = setup_env().await;
    touch_pdf(env.pdf_dir(), "alpha.pdf");
    touch_pdf(env.pdf_dir(), "beta.pdf");

    let reader = FakePdfReader::new()
        .with_document("alpha.pdf", &["alpha page one text", "alpha page two text"])
        .with_document("beta.pdf", &["beta page one text"]);
    let embedder = FakeEmbedder::new();

    let first = run_ingest(&env.config, &env.store, &embedder, &reader)
        .await
        .unwrap();
    assert_eq!(first.files_processed, 2);
    assert_eq!(first.chunks_added, 3);
    assert_eq!(env.store.count().await.unwrap(), 3);

    let ledger_after_first = std::fs::read(env.ledger_path()).unwrap();

    let second = run_ingest(&env.config, &env.store, &embedder, &reader)
        .await
        .unwrap();
    assert_eq!(second.files_processed, 0);
    assert_eq!(second.chunks_added, 0);
    assert_eq!(second.skipped_by_ledger, 2);
    assert_eq!(env.store.count().await.unwrap(), 3);
    assert_eq!(std::fs::read(env.ledger_path()).unwrap(), ledger_after_first);
}

#[tokio::test]
async fn ledger_heals_from_store_state() {
    let env = setup_env().await;
    touch_pdf(env.pdf_dir(), "known.pdf");

    // The store already holds a chunk for known.pdf, but the ledger does not
    // list it (e.g. the previous run crashed before the ledger write).
    let chunk = Chunk {
        id: "known_page1_chunk0".to_string(),
        text: "previously indexed text".to_string(),
        metadata: ChunkMetadata {
            source_file: "known.pdf".to_string(),
            title: "Known".to_string(),
            doi: "10.1000/known".to_string(),
            page_number: 1,
        },
    };
    env.store.add(&[chunk], &[vec![1.0, 2.0, 3.0]]).await.unwrap();

    let reader = FakePdfReader::new().with_document("known.pdf", &["page text"]);
    let embedder = FakeEmbedder::new();

    let report = run_ingest(&env.config, &env.store, &embedder, &reader)
        .await
        .unwrap();
    assert_eq!(report.skipped_by_store, 1);
    assert_eq!(report.files_processed, 0);
    assert_eq!(report.chunks_added, 0);
    assert_eq!(env.store.count().await.unwrap(), 1);
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);

    let ledger = Ledger::load(env.ledger_path());
    assert!(ledger.contains("known.pdf"));
}

#[tokio::test]
async fn failed_file_is_isolated_and_retry_eligible() {
    let env = setup_env().await;
    touch_pdf(env.pdf_dir(), "bad.pdf");
    touch_pdf(env.pdf_dir(), "good.pdf");

    let reader = FakePdfReader::new()
        .with_document("good.pdf", &["good page text"])
        .with_failing("bad.pdf");
    let embedder = FakeEmbedder::new();

    let report = run_ingest(&env.config, &env.store, &embedder, &reader)
        .await
        .unwrap();
    assert_eq!(report.failed, 1);
    assert_eq!(report.files_processed, 1);

    let ledger = Ledger::load(env.ledger_path());
    assert!(ledger.contains("good.pdf"));
    assert!(!ledger.contains("bad.pdf"));

    // bad.pdf is retried on the next run.
    let retry = run_ingest(&env.config, &env.store, &embedder, &reader)
        .await
        .unwrap();
    assert_eq!(retry.failed, 1);
    assert_eq!(retry.skipped_by_ledger, 1);
}

#[tokio::test]
async fn empty_documents_are_skipped_but_not_ledgered() {
    let env = setup_env().await;
    touch_pdf(env.pdf_dir(), "blank.pdf");

    let reader = FakePdfReader::new().with_document("blank.pdf", &["   ", ""]);
    let embedder = FakeEmbedder::new();

    let report = run_ingest(&env.config, &env.store, &embedder, &reader)
        .await
        .unwrap();
    assert_eq!(report.skipped_empty, 1);
    assert_eq!(env.store.count().await.unwrap(), 0);
    assert!(!Ledger::load(env.ledger_path()).contains("blank.pdf"));
}

#[tokio::test]
async fn corrupt_ledger_is_treated_as_empty() {
    let env = setup_env().await;
    touch_pdf(env.pdf_dir(), "alpha.pdf");
    std::fs::create_dir_all(env.ledger_path().parent().unwrap()).unwrap();
    std::fs::write(env.ledger_path(), "{definitely not json").unwrap();

    let reader = FakePdfReader::new().with_document("alpha.pdf", &["alpha text"]);
    let embedder = FakeEmbedder::new();

    let report = run_ingest(&env.config, &env.store, &embedder, &reader)
        .await
        .unwrap();
    assert_eq!(report.files_processed, 1);

    // The rewritten ledger parses again.
    let ledger = Ledger::load(env.ledger_path());
    assert!(ledger.contains("alpha.pdf"));
}

// ============ HTTP boundary ============

async fn serve(state: AppState) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = build_router(state);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn app_state(
    env: &TestEnv,
    embedder: Arc<FakeEmbedder>,
    generator: Arc<FakeGenerator>,
    reader: FakePdfReader,
) -> AppState {
    AppState {
        config: Arc::new(env.config.clone()),
        store: env.store.clone(),
        embedder,
        generator,
        reader: Arc::new(reader),
    }
}

#[tokio::test]
async fn chat_with_empty_store_is_unavailable_and_skips_generation() {
    let env = setup_env().await;
    let generator = Arc::new(FakeGenerator::new("unused"));
    let state = app_state(
        &env,
        Arc::new(FakeEmbedder::new()),
        generator.clone(),
        FakePdfReader::new(),
    );
    let base = serve(state).await;

    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{}/chat", base))
        .json(&serde_json::json!({ "query": "anything" }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 503);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "unavailable");
    assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn chat_rejects_blank_queries() {
    let env = setup_env().await;
    let state = app_state(
        &env,
        Arc::new(FakeEmbedder::new()),
        Arc::new(FakeGenerator::new("unused")),
        FakePdfReader::new(),
    );
    let base = serve(state).await;

    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{}/chat", base))
        .json(&serde_json::json!({ "query": "   " }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 400);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "bad_request");
}

#[tokio::test]
async fn chat_returns_cited_answer_after_ingestion() {
    let env = setup_env().await;
    touch_pdf(env.pdf_dir(), "nitinol.pdf");

    let reader = FakePdfReader::new().with_document(
        "nitinol.pdf",
        &["Energy density strongly affects residual stress in printed nitinol parts."],
    );
    let embedder = Arc::new(FakeEmbedder::new());
    run_ingest(&env.config, &env.store, embedder.as_ref(), &reader)
        .await
        .unwrap();

    let generator = Arc::new(FakeGenerator::new(
        "Residual stress decreases with energy density [1].\nhas_references: true",
    ));
    let state = app_state(&env, embedder, generator.clone(), reader);
    let base = serve(state).await;

    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{}/chat", base))
        .json(&serde_json::json!({ "query": "What affects residual stress?" }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    let answer = body["answer"].as_str().unwrap();
    assert!(answer.contains("Residual stress decreases"));
    assert!(answer.contains("**References:**"));
    assert!(answer.contains("10.1000/nitinol"));
    assert!(!answer.to_lowercase().contains("has_references"));
    assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn ingest_endpoint_reports_missing_pdfs() {
    let env = setup_env().await;
    // No PDFs written into the directory.
    let state = app_state(
        &env,
        Arc::new(FakeEmbedder::new()),
        Arc::new(FakeGenerator::new("unused")),
        FakePdfReader::new(),
    );
    let base = serve(state).await;

    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{}/ingest", base))
        .json(&serde_json::json!({}))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert!(body["message"].as_str().unwrap().contains("No PDFs found"));
}

#[tokio::test]
async fn health_reports_passage_count() {
    let env = setup_env().await;
    let state = app_state(
        &env,
        Arc::new(FakeEmbedder::new()),
        Arc::new(FakeGenerator::new("unused")),
        FakePdfReader::new(),
    );
    let base = serve(state).await;

    let client = reqwest::Client::new();
    let resp = client.get(format!("{}/health", base)).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["passages"], 0);
}
