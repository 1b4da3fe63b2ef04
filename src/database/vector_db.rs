use thiserror::Error;
use qdrant_client::{
    qdrant::{
        Condition, CountPoints, CreateCollection, DeletePoints, Distance, FieldCondition,
        Filter, Match, PointId, PointStruct, PointsSelector, SearchPoints, Value,
        VectorParams, VectorsConfig, UpsertPoints,
        condition::ConditionOneOf,
        point_id::PointIdOptions,
        points_selector::PointsSelectorOneOf,
        r#match::MatchValue,
        with_payload_selector::SelectorOptions,
        WithPayloadSelector,
    },
    Qdrant,
};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;
use log;

use crate::database::qdrant_config::create_qdrant_client;

#[derive(Error, Debug)]
pub enum VectorDBError {
    #[error("Connection error: {0}")]
    Connection(String),
    #[error("Operation failed: {0}")]
    Operation(String),
}

/// One embedded chunk of an uploaded study document, ready to upsert.
#[derive(Debug, Clone)]
pub struct ChunkRecord {
    pub text: String,
    pub source: String,
    pub chunk_index: i64,
    pub embedding: Vec<f32>,
}

/// Retrieval hit returned to the tutor prompt builder.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub text: String,
    pub source: String,
    pub chunk_index: i64,
    pub score: f32,
}

/// Qdrant-backed store for document chunk embeddings. Record lifecycle is
/// owned by Qdrant; this type only maps between domain structs and points.
#[derive(Clone)]
pub struct VectorDB {
    client: Arc<Qdrant>,
}

impl VectorDB {
    pub async fn new(url: &str) -> Result<Self, VectorDBError> {
        let client = create_qdrant_client(url)
            .await
            .map_err(|e| VectorDBError::Connection(e.to_string()))?;
        Ok(Self {
            client: Arc::new(client),
        })
    }

    /// Creates the chunk collection with cosine distance. Idempotent: an
    /// already-existing collection is not an error.
    pub async fn ensure_collection(&self, name: &str, vector_size: u64) -> Result<(), VectorDBError> {
        let vectors_config = VectorsConfig {
            config: Some(qdrant_client::qdrant::vectors_config::Config::Params(VectorParams {
                size: vector_size,
                distance: Distance::Cosine.into(),
                ..Default::default()
            })),
        };

        let create_collection = CreateCollection {
            collection_name: name.to_string(),
            vectors_config: Some(vectors_config),
            ..Default::default()
        };

        match self.client.create_collection(create_collection).await {
            Ok(_) => Ok(()),
            Err(e) if e.to_string().contains("already exists")
                || e.to_string().contains("AlreadyExists") =>
            {
                log::info!("Collection {} already exists, skipping creation", name);
                Ok(())
            }
            Err(e) => Err(VectorDBError::Operation(e.to_string())),
        }
    }

    /// Upserts a batch of embedded chunks, one point per chunk. Returns the
    /// generated point ids.
    pub async fn upsert_chunks(
        &self,
        collection: &str,
        records: Vec<ChunkRecord>,
    ) -> Result<Vec<String>, VectorDBError> {
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let mut ids = Vec::with_capacity(records.len());
        let points: Vec<PointStruct> = records
            .into_iter()
            .map(|record| {
                let point_id = Uuid::new_v4().to_string();
                ids.push(point_id.clone());

                let mut payload: HashMap<String, Value> = HashMap::new();
                payload.insert("text".to_string(), Value::from(record.text));
                payload.insert("source".to_string(), Value::from(record.source));
                payload.insert("chunk".to_string(), Value::from(record.chunk_index));

                PointStruct {
                    id: Some(PointId {
                        point_id_options: Some(PointIdOptions::Uuid(point_id)),
                    }),
                    vectors: Some(record.embedding.into()),
                    payload,
                }
            })
            .collect();

        let upsert_points = UpsertPoints {
            collection_name: collection.to_string(),
            points,
            ..Default::default()
        };

        self.client
            .upsert_points(upsert_points)
            .await
            .map_err(|e| VectorDBError::Operation(e.to_string()))?;

        Ok(ids)
    }

    /// Cosine search over the chunk collection, payloads included.
    pub async fn search_chunks(
        &self,
        collection: &str,
        query_vector: Vec<f32>,
        limit: u64,
    ) -> Result<Vec<ScoredChunk>, VectorDBError> {
        let request = SearchPoints {
            collection_name: collection.to_string(),
            vector: query_vector,
            limit,
            with_payload: Some(WithPayloadSelector {
                selector_options: Some(SelectorOptions::Enable(true)),
            }),
            ..Default::default()
        };

        let results = self.client
            .search_points(request)
            .await
            .map_err(|e| VectorDBError::Operation(e.to_string()))?;

        let chunks = results.result
            .into_iter()
            .map(|point| {
                let text = point.payload.get("text")
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string())
                    .unwrap_or_default();
                let source = point.payload.get("source")
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string())
                    .unwrap_or_default();
                let chunk_index = point.payload.get("chunk")
                    .and_then(|v| match v.kind {
                        Some(qdrant_client::qdrant::value::Kind::IntegerValue(i)) => Some(i),
                        _ => None,
                    })
                    .unwrap_or(0);

                ScoredChunk {
                    text,
                    source,
                    chunk_index,
                    score: point.score,
                }
            })
            .collect();

        Ok(chunks)
    }

    /// Number of stored chunks. The query endpoint answers 404 while this
    /// is zero.
    pub async fn count(&self, collection: &str) -> Result<u64, VectorDBError> {
        let request = CountPoints {
            collection_name: collection.to_string(),
            exact: Some(true),
            ..Default::default()
        };

        let response = self.client
            .count(request)
            .await
            .map_err(|e| VectorDBError::Operation(e.to_string()))?;

        Ok(response.result.map(|r| r.count).unwrap_or(0))
    }

    /// Removes every chunk that came from the given source file.
    pub async fn delete_by_source(
        &self,
        collection: &str,
        source: &str,
    ) -> Result<(), VectorDBError> {
        let filter = Filter {
            must: vec![Condition {
                condition_one_of: Some(ConditionOneOf::Field(FieldCondition {
                    key: "source".to_string(),
                    r#match: Some(Match {
                        match_value: Some(MatchValue::Keyword(source.to_string())),
                    }),
                    ..Default::default()
                })),
            }],
            ..Default::default()
        };

        let delete_points = DeletePoints {
            collection_name: collection.to_string(),
            points: Some(PointsSelector {
                points_selector_one_of: Some(PointsSelectorOneOf::Filter(filter)),
            }),
            ..Default::default()
        };

        self.client
            .delete_points(delete_points)
            .await
            .map_err(|e| VectorDBError::Operation(e.to_string()))?;

        Ok(())
    }
}
