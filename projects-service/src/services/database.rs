use crate::config::MongoConfig;
use crate::models::{ProjectRow, RowFields, ROW_FIELD};
use crate::services::store::{ProjectStore, WriteBatch, WriteOp};
use async_trait::async_trait;
use futures::stream::TryStreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, Bson, Document},
    options::{ClientOptions, Credential, IndexOptions, UpdateOptions},
    Client as MongoClient, ClientSession, Collection, Database, IndexModel,
};
use secrecy::ExposeSecret;
use serde_json::Value;
use service_core::error::AppError;
use uuid::Uuid;

#[derive(Clone)]
pub struct MongoDb {
    client: MongoClient,
    db: Database,
    collection: String,
}

impl MongoDb {
    pub async fn connect(config: &MongoConfig) -> Result<Self, AppError> {
        tracing::info!(database = %config.database, "Connecting to MongoDB");

        let mut options = ClientOptions::parse(&config.uri).await.map_err(|e| {
            tracing::error!("Failed to parse MongoDB connection string: {}", e);
            AppError::from(e)
        })?;
        options.app_name = Some(config.app_name.clone());

        if let Some(username) = &config.username {
            options.credential = Some(
                Credential::builder()
                    .username(username.clone())
                    .password(
                        config
                            .password
                            .as_ref()
                            .map(|p| p.expose_secret().clone()),
                    )
                    .source(config.auth_source.clone())
                    .build(),
            );
        }

        let client = MongoClient::with_options(options).map_err(|e| {
            tracing::error!("Failed to create MongoDB client: {}", e);
            AppError::from(e)
        })?;
        let db = client.database(&config.database);
        tracing::info!(database = %config.database, "Successfully connected to MongoDB database");

        Ok(Self {
            client,
            db,
            collection: config.collection.clone(),
        })
    }

    pub async fn initialize_indexes(&self) -> Result<(), AppError> {
        tracing::info!("Creating MongoDB indexes for projects-service");

        // Non-unique: uniqueness of `row` is only maintained by lookup-before-insert.
        let row_index = IndexModel::builder()
            .keys(doc! { ROW_FIELD: 1 })
            .options(IndexOptions::builder().name("row_lookup".to_string()).build())
            .build();

        self.projects()
            .create_index(row_index, None)
            .await
            .map_err(|e| {
                tracing::error!(
                    collection = %self.collection,
                    "Failed to create row index: {}",
                    e
                );
                AppError::from(e)
            })?;
        tracing::info!(collection = %self.collection, "Created index on row");

        Ok(())
    }

    pub fn client(&self) -> &MongoClient {
        &self.client
    }

    pub fn projects(&self) -> Collection<Document> {
        self.db.collection(&self.collection)
    }

    async fn apply(&self, session: &mut ClientSession, batch: WriteBatch) -> Result<(), AppError> {
        let projects = self.projects();
        // Same semantics as a set-with-merge: a vanished target is recreated.
        let merge_options = UpdateOptions::builder().upsert(true).build();

        for op in batch.into_ops() {
            match op {
                WriteOp::Merge { id, fields } => {
                    projects
                        .update_one_with_session(
                            id_filter(&id),
                            merge_pipeline(&fields)?,
                            merge_options.clone(),
                            session,
                        )
                        .await?;
                }
                WriteOp::Insert { fields } => {
                    let mut document = to_document(&fields)?;
                    document.insert("_id", Uuid::new_v4().to_string());
                    projects
                        .insert_one_with_session(document, None, session)
                        .await?;
                }
            }
        }

        Ok(())
    }
}

#[async_trait]
impl ProjectStore for MongoDb {
    async fn list_rows(&self) -> Result<Vec<ProjectRow>, AppError> {
        let mut cursor = self.projects().find(None, None).await?;

        let mut rows = Vec::new();
        while let Some(document) = cursor.try_next().await? {
            rows.push(to_project_row(document));
        }
        Ok(rows)
    }

    async fn find_by_row_numbers(&self, rows: &[i64]) -> Result<Vec<ProjectRow>, AppError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let mut cursor = self
            .projects()
            .find(doc! { ROW_FIELD: { "$in": rows.to_vec() } }, None)
            .await?;

        let mut found = Vec::new();
        while let Some(document) = cursor.try_next().await? {
            found.push(to_project_row(document));
        }
        Ok(found)
    }

    /// Runs the batch inside a multi-document transaction (requires a replica set).
    async fn commit_batch(&self, batch: WriteBatch) -> Result<(), AppError> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut session = self.client.start_session(None).await?;
        session.start_transaction(None).await?;

        if let Err(e) = self.apply(&mut session, batch).await {
            if let Err(abort_err) = session.abort_transaction().await {
                tracing::warn!("Failed to abort MongoDB transaction: {}", abort_err);
            }
            return Err(e);
        }

        session.commit_transaction().await?;
        Ok(())
    }

    async fn health_check(&self) -> Result<(), AppError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| {
                tracing::error!("MongoDB health check failed: {}", e);
                AppError::from(e)
            })?;
        Ok(())
    }

    async fn close(&self) {
        tracing::info!("Closing MongoDB client");
        self.client.clone().shutdown().await;
    }
}

/// Matches both UUID string ids and `ObjectId`s written by other tools.
fn id_filter(id: &str) -> Document {
    match ObjectId::parse_str(id) {
        Ok(oid) => doc! { "_id": { "$in": [oid, id] } },
        Err(_) => doc! { "_id": id },
    }
}

/// Update pipeline that merges `fields` into the stored document.
///
/// Column names stay literal keys, as they are on insert. A `$set` would read
/// `"Budget.2024"` as a nested path and reject names like `"No."` or `"$x"`.
fn merge_pipeline(fields: &RowFields) -> Result<Vec<Document>, AppError> {
    Ok(vec![doc! {
        "$replaceWith": {
            "$mergeObjects": ["$$ROOT", { "$literal": to_document(fields)? }]
        }
    }])
}

fn to_document(fields: &RowFields) -> Result<Document, AppError> {
    mongodb::bson::to_document(fields).map_err(|e| {
        AppError::InternalError(anyhow::anyhow!("Failed to encode row fields: {}", e))
    })
}

fn to_project_row(mut document: Document) -> ProjectRow {
    let id = match document.remove("_id") {
        Some(Bson::ObjectId(oid)) => oid.to_hex(),
        Some(Bson::String(s)) => s,
        Some(other) => other.to_string(),
        None => String::new(),
    };

    let fields = match Bson::Document(document).into_relaxed_extjson() {
        Value::Object(map) => map,
        _ => RowFields::new(),
    };

    ProjectRow::new(id, fields)
}
