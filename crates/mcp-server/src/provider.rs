//! MongoDB provider facade.
//!
//! Tools talk to the database through this trait so the dispatcher, gating
//! and formatting layers can be exercised against in-memory fakes. The
//! production implementation is a thin veneer over `mongodb::Client`.

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use bson::{Bson, Document};
use futures::stream::{Stream, StreamExt, TryStreamExt};
use mongodb::options::{AggregateOptions, CountOptions, FindOptions, IndexOptions};
use mongodb::IndexModel;

use crate::error::{ErrorCode, ServerError};

/// Stream of documents from a cursor. Dropping the stream closes the
/// underlying cursor.
pub type DocumentStream = Pin<Box<dyn Stream<Item = Result<Document, ServerError>> + Send>>;

/// A `find` invocation, kept driver-agnostic.
#[derive(Clone, Debug, Default)]
pub struct FindQuery {
    pub filter: Document,
    pub projection: Option<Document>,
    pub sort: Option<Document>,
    pub limit: Option<i64>,
    pub skip: Option<u64>,
}

#[async_trait]
pub trait Provider: Send + Sync {
    async fn find(&self, db: &str, coll: &str, query: FindQuery) -> Result<DocumentStream, ServerError>;

    async fn aggregate(
        &self,
        db: &str,
        coll: &str,
        pipeline: Vec<Document>,
        max_time: Option<Duration>,
    ) -> Result<DocumentStream, ServerError>;

    /// Returns the inserted ids in insertion order.
    async fn insert_many(
        &self,
        db: &str,
        coll: &str,
        docs: Vec<Document>,
    ) -> Result<Vec<Bson>, ServerError>;

    /// Returns `(matched, modified)`.
    async fn update_many(
        &self,
        db: &str,
        coll: &str,
        filter: Document,
        update: Document,
    ) -> Result<(u64, u64), ServerError>;

    /// Returns the number of deleted documents.
    async fn delete_many(&self, db: &str, coll: &str, filter: Document) -> Result<u64, ServerError>;

    async fn drop_collection(&self, db: &str, coll: &str) -> Result<(), ServerError>;

    async fn drop_database(&self, db: &str) -> Result<(), ServerError>;

    async fn list_databases(&self) -> Result<Vec<String>, ServerError>;

    async fn list_collections(&self, db: &str) -> Result<Vec<String>, ServerError>;

    async fn list_indexes(&self, db: &str, coll: &str) -> Result<Vec<Document>, ServerError>;

    /// Returns the created index name.
    async fn create_index(
        &self,
        db: &str,
        coll: &str,
        keys: Document,
        name: Option<String>,
        unique: bool,
    ) -> Result<String, ServerError>;

    async fn drop_index(&self, db: &str, coll: &str, name: &str) -> Result<(), ServerError>;

    async fn list_search_indexes(&self, db: &str, coll: &str) -> Result<Vec<Document>, ServerError>;

    async fn count(
        &self,
        db: &str,
        coll: &str,
        filter: Document,
        max_time: Option<Duration>,
    ) -> Result<u64, ServerError>;

    async fn run_command(&self, db: &str, command: Document) -> Result<Document, ServerError>;

    /// Whether the connected deployment supports Atlas Search stages.
    async fn supports_search(&self, db: &str, coll: &str) -> Result<bool, ServerError>;

    /// Best-effort teardown; errors are logged, never raised.
    async fn close(&self);
}

pub struct MongoDbProvider {
    client: mongodb::Client,
}

impl MongoDbProvider {
    pub async fn connect(uri: &str) -> Result<Self, ServerError> {
        let client = mongodb::Client::with_uri_str(uri).await.map_err(|err| {
            ServerError::new(
                ErrorCode::ConnectionFailed,
                format!("Failed to connect to MongoDB: {err}"),
            )
        })?;
        Ok(Self { client })
    }

    fn collection(&self, db: &str, coll: &str) -> mongodb::Collection<Document> {
        self.client.database(db).collection::<Document>(coll)
    }
}

fn boxed(cursor: mongodb::Cursor<Document>) -> DocumentStream {
    cursor.map_err(ServerError::from).boxed()
}

#[async_trait]
impl Provider for MongoDbProvider {
    async fn find(&self, db: &str, coll: &str, query: FindQuery) -> Result<DocumentStream, ServerError> {
        let options = FindOptions::builder()
            .projection(query.projection)
            .sort(query.sort)
            .limit(query.limit)
            .skip(query.skip)
            .build();
        let cursor = self
            .collection(db, coll)
            .find(query.filter)
            .with_options(options)
            .await?;
        Ok(boxed(cursor))
    }

    async fn aggregate(
        &self,
        db: &str,
        coll: &str,
        pipeline: Vec<Document>,
        max_time: Option<Duration>,
    ) -> Result<DocumentStream, ServerError> {
        let options = AggregateOptions::builder().max_time(max_time).build();
        let cursor = self
            .collection(db, coll)
            .aggregate(pipeline)
            .with_options(options)
            .await?;
        Ok(boxed(cursor))
    }

    async fn insert_many(
        &self,
        db: &str,
        coll: &str,
        docs: Vec<Document>,
    ) -> Result<Vec<Bson>, ServerError> {
        let result = self.collection(db, coll).insert_many(docs).await?;
        let mut ids: Vec<(usize, Bson)> = result.inserted_ids.into_iter().collect();
        ids.sort_by_key(|(index, _)| *index);
        Ok(ids.into_iter().map(|(_, id)| id).collect())
    }

    async fn update_many(
        &self,
        db: &str,
        coll: &str,
        filter: Document,
        update: Document,
    ) -> Result<(u64, u64), ServerError> {
        let result = self.collection(db, coll).update_many(filter, update).await?;
        Ok((result.matched_count, result.modified_count))
    }

    async fn delete_many(&self, db: &str, coll: &str, filter: Document) -> Result<u64, ServerError> {
        let result = self.collection(db, coll).delete_many(filter).await?;
        Ok(result.deleted_count)
    }

    async fn drop_collection(&self, db: &str, coll: &str) -> Result<(), ServerError> {
        self.collection(db, coll).drop().await?;
        Ok(())
    }

    async fn drop_database(&self, db: &str) -> Result<(), ServerError> {
        self.client.database(db).drop().await?;
        Ok(())
    }

    async fn list_databases(&self) -> Result<Vec<String>, ServerError> {
        Ok(self.client.list_database_names().await?)
    }

    async fn list_collections(&self, db: &str) -> Result<Vec<String>, ServerError> {
        Ok(self.client.database(db).list_collection_names().await?)
    }

    async fn list_indexes(&self, db: &str, coll: &str) -> Result<Vec<Document>, ServerError> {
        let mut cursor = self.collection(db, coll).list_indexes().await?;
        let mut indexes = Vec::new();
        while let Some(model) = cursor.try_next().await? {
            indexes.push(bson::to_document(&model).map_err(|err| ServerError::unexpected(err.to_string()))?);
        }
        Ok(indexes)
    }

    async fn create_index(
        &self,
        db: &str,
        coll: &str,
        keys: Document,
        name: Option<String>,
        unique: bool,
    ) -> Result<String, ServerError> {
        let options = IndexOptions::builder()
            .name(name)
            .unique(unique)
            .build();
        let model = IndexModel::builder().keys(keys).options(options).build();
        let result = self.collection(db, coll).create_index(model).await?;
        Ok(result.index_name)
    }

    async fn drop_index(&self, db: &str, coll: &str, name: &str) -> Result<(), ServerError> {
        self.collection(db, coll).drop_index(name).await?;
        Ok(())
    }

    async fn list_search_indexes(&self, db: &str, coll: &str) -> Result<Vec<Document>, ServerError> {
        let mut cursor = self.collection(db, coll).list_search_indexes().await?;
        let mut indexes = Vec::new();
        while let Some(doc) = cursor.try_next().await? {
            indexes.push(doc);
        }
        Ok(indexes)
    }

    async fn count(
        &self,
        db: &str,
        coll: &str,
        filter: Document,
        max_time: Option<Duration>,
    ) -> Result<u64, ServerError> {
        let options = CountOptions::builder().max_time(max_time).build();
        Ok(self
            .collection(db, coll)
            .count_documents(filter)
            .with_options(options)
            .await?)
    }

    async fn run_command(&self, db: &str, command: Document) -> Result<Document, ServerError> {
        Ok(self.client.database(db).run_command(command).await?)
    }

    async fn supports_search(&self, db: &str, coll: &str) -> Result<bool, ServerError> {
        match self.list_search_indexes(db, coll).await {
            Ok(_) => Ok(true),
            Err(err) => {
                let message = err.message.to_lowercase();
                if message.contains("no such command")
                    || message.contains("unrecognized")
                    || message.contains("not supported")
                    || message.contains("not allowed")
                {
                    Ok(false)
                } else {
                    Err(err)
                }
            }
        }
    }

    async fn close(&self) {
        // Client::shutdown consumes the handle; cloning shares the pool.
        self.client.clone().shutdown().await;
    }
}
