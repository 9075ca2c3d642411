#![allow(dead_code)]

use async_trait::async_trait;
use projects_service::config::{MongoConfig, ProjectsConfig, SheetConfig, StoreBackend};
use projects_service::models::{ProjectRow, RowFields};
use projects_service::services::{InMemoryProjectStore, MongoDb, ProjectStore, WriteBatch};
use projects_service::startup::Application;
use service_core::config::Config as CoreConfig;
use service_core::error::AppError;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub store: Arc<dyn ProjectStore>,
    pub client: reqwest::Client,
    shutdown: oneshot::Sender<()>,
    server: JoinHandle<std::io::Result<()>>,
}

pub fn test_config() -> ProjectsConfig {
    ProjectsConfig {
        common: CoreConfig {
            port: 0, // Random port for testing
            log_level: "info".to_string(),
            otlp_endpoint: None,
        },
        store: StoreBackend::Memory,
        mongodb: MongoConfig {
            uri: "mongodb://localhost:27017".to_string(),
            database: "projects_test".to_string(),
            username: None,
            password: None,
            auth_source: None,
            app_name: "projects-service-test".to_string(),
            collection: "projects".to_string(),
        },
        sheet: SheetConfig {
            max_batch_rows: 500,
        },
    }
}

/// MongoDB settings for one test: `MONGODB_URI` (default localhost) and a
/// fresh database.
pub fn mongo_test_config() -> MongoConfig {
    let mut mongodb = test_config().mongodb;
    mongodb.uri = std::env::var("MONGODB_URI")
        .unwrap_or_else(|_| "mongodb://localhost:27017".to_string());
    mongodb.database = format!("projects_test_{}", uuid::Uuid::new_v4().simple());
    mongodb
}

/// A connected `MongoDb` store on its own database, dropped by `cleanup`.
pub struct MongoTestStore {
    pub db: MongoDb,
    pub db_name: String,
}

impl MongoTestStore {
    pub async fn connect() -> Self {
        let config = mongo_test_config();
        let db = MongoDb::connect(&config)
            .await
            .expect("Failed to connect to MongoDB");
        db.initialize_indexes()
            .await
            .expect("Failed to initialize indexes");

        MongoTestStore {
            db,
            db_name: config.database,
        }
    }

    pub async fn cleanup(&self) {
        let _ = self.db.client().database(&self.db_name).drop(None).await;
    }
}

pub fn fields(value: serde_json::Value) -> RowFields {
    value
        .as_object()
        .cloned()
        .expect("test fields must be a JSON object")
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with_store(Arc::new(InMemoryProjectStore::new())).await
    }

    pub async fn spawn_with_rows(rows: impl IntoIterator<Item = ProjectRow>) -> Self {
        Self::spawn_with_store(Arc::new(InMemoryProjectStore::with_rows(rows))).await
    }

    pub async fn spawn_with_store(store: Arc<dyn ProjectStore>) -> Self {
        Self::spawn_with(test_config(), store).await
    }

    pub async fn spawn_with(config: ProjectsConfig, store: Arc<dyn ProjectStore>) -> Self {
        let app = Application::build_with_store(config, store)
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let store = app.store();
        let address = format!("http://127.0.0.1:{}", port);

        let (tx, rx) = oneshot::channel::<()>();
        let server = tokio::spawn(app.run_until(async move {
            rx.await.ok();
        }));

        // Wait for the server to answer before handing it to the test
        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(20)).await;
        }

        TestApp {
            address,
            port,
            store,
            client,
            shutdown: tx,
            server,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub async fn post_sheet(&self, body: serde_json::Value) -> reqwest::Response {
        self.client
            .post(self.url("/sheetToDb"))
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn get_projects(&self) -> reqwest::Response {
        self.client
            .get(self.url("/projects"))
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn rows(&self) -> Vec<ProjectRow> {
        self.store.list_rows().await.expect("Failed to list rows")
    }

    /// Triggers graceful shutdown and waits for the server task to finish.
    pub async fn stop(self) {
        let TestApp {
            client,
            shutdown,
            server,
            ..
        } = self;

        // Release keep-alive connections so shutdown does not wait on them
        drop(client);

        let _ = shutdown.send(());
        server
            .await
            .expect("Server task panicked")
            .expect("Server returned an error");
    }
}

/// Store double that fails every call, as an unreachable database would.
#[derive(Default)]
pub struct FailingStore;

#[async_trait]
impl ProjectStore for FailingStore {
    async fn list_rows(&self) -> Result<Vec<ProjectRow>, AppError> {
        Err(AppError::DatabaseError(anyhow::anyhow!("connection refused")))
    }

    async fn find_by_row_numbers(&self, _rows: &[i64]) -> Result<Vec<ProjectRow>, AppError> {
        Err(AppError::DatabaseError(anyhow::anyhow!("connection refused")))
    }

    async fn commit_batch(&self, _batch: WriteBatch) -> Result<(), AppError> {
        Err(AppError::DatabaseError(anyhow::anyhow!("connection refused")))
    }

    async fn health_check(&self) -> Result<(), AppError> {
        Err(AppError::DatabaseError(anyhow::anyhow!("connection refused")))
    }
}

/// In-memory store that records how it was used.
#[derive(Default)]
pub struct RecordingStore {
    pub inner: InMemoryProjectStore,
    pub finds: AtomicUsize,
    pub commits: AtomicUsize,
    pub fail_commit: AtomicBool,
    pub closed: AtomicBool,
}

impl RecordingStore {
    pub fn with_rows(rows: impl IntoIterator<Item = ProjectRow>) -> Self {
        Self {
            inner: InMemoryProjectStore::with_rows(rows),
            ..Default::default()
        }
    }

    pub fn finds(&self) -> usize {
        self.finds.load(Ordering::SeqCst)
    }

    pub fn commits(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProjectStore for RecordingStore {
    async fn list_rows(&self) -> Result<Vec<ProjectRow>, AppError> {
        self.inner.list_rows().await
    }

    async fn find_by_row_numbers(&self, rows: &[i64]) -> Result<Vec<ProjectRow>, AppError> {
        self.finds.fetch_add(1, Ordering::SeqCst);
        self.inner.find_by_row_numbers(rows).await
    }

    async fn commit_batch(&self, batch: WriteBatch) -> Result<(), AppError> {
        self.commits.fetch_add(1, Ordering::SeqCst);
        if self.fail_commit.load(Ordering::SeqCst) {
            return Err(AppError::DatabaseError(anyhow::anyhow!("transaction aborted")));
        }
        self.inner.commit_batch(batch).await
    }

    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}
