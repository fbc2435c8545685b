//! Qdrant-backed vector index

use super::{ChunkPayload, IndexFilter, IndexHit, IndexPoint, VectorIndex};
use crate::config::Config;
use crate::error::{Error, Result};
use async_trait::async_trait;
use qdrant_client::qdrant::{
    Condition, CountPointsBuilder, CreateCollectionBuilder, DeletePointsBuilder, Distance, Filter,
    PointStruct, ScalarQuantizationBuilder, SearchPointsBuilder, UpsertPointsBuilder,
    VectorParamsBuilder,
};
use qdrant_client::Qdrant;
use serde_json::Value;
use tracing::{debug, info};

/// Qdrant index handle
pub struct QdrantIndex {
    client: Qdrant,
    collection: String,
    dimension: usize,
}

impl QdrantIndex {
    /// Connect using config (index URL, collection, embedding dimension)
    pub fn connect(config: &Config) -> Result<Self> {
        Self::new(
            &config.index.url,
            &config.index.collection,
            config.embedding.dimension,
            config.index_api_key(),
        )
    }

    /// Create a new index connection
    pub fn new(
        url: &str,
        collection: &str,
        dimension: usize,
        api_key: Option<String>,
    ) -> Result<Self> {
        debug!("Connecting to Qdrant at {}", url);

        let mut builder = Qdrant::from_url(url).skip_compatibility_check();
        if let Some(key) = api_key {
            builder = builder.api_key(key);
        }
        let client = builder
            .build()
            .map_err(|e| Error::Index(e.to_string()))?;

        Ok(Self {
            client,
            collection: collection.to_string(),
            dimension,
        })
    }

    fn to_qdrant_filter(filter: &IndexFilter) -> Option<Filter> {
        let mut must: Vec<Condition> = Vec::new();

        if let Some(kind) = filter.source_kind {
            must.push(Condition::matches("source_type", kind.as_str().to_string()));
        }
        if let Some(ref collection) = filter.collection {
            must.push(Condition::matches("collection", collection.clone()));
        }

        if must.is_empty() {
            None
        } else {
            Some(Filter {
                must,
                should: vec![],
                must_not: vec![],
                min_should: None,
            })
        }
    }
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    async fn ensure_ready(&self) -> Result<()> {
        let exists = self.client.collection_exists(&self.collection).await?;
        if exists {
            debug!("Collection {} already exists", self.collection);
            return Ok(());
        }

        info!(
            "Creating collection {} with dimension {}",
            self.collection, self.dimension
        );

        let vectors_config = VectorParamsBuilder::new(self.dimension as u64, Distance::Cosine);

        self.client
            .create_collection(
                CreateCollectionBuilder::new(&self.collection)
                    .vectors_config(vectors_config)
                    .quantization_config(ScalarQuantizationBuilder::default()),
            )
            .await?;

        Ok(())
    }

    async fn upsert(&self, points: Vec<IndexPoint>) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }

        debug!(
            "Upserting {} points to collection {}",
            points.len(),
            self.collection
        );

        let point_structs: Vec<PointStruct> = points
            .into_iter()
            .map(|p| PointStruct::new(p.id.to_string(), p.vector, p.payload.to_qdrant_payload()))
            .collect();

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, point_structs))
            .await?;

        Ok(())
    }

    async fn query(
        &self,
        vector: Vec<f32>,
        k: usize,
        filter: Option<IndexFilter>,
    ) -> Result<Vec<IndexHit>> {
        debug!(
            "Searching collection {} with limit {}",
            self.collection, k
        );

        let mut search_builder =
            SearchPointsBuilder::new(&self.collection, vector, k as u64).with_payload(true);

        if let Some(f) = filter {
            if let Some(qdrant_filter) = Self::to_qdrant_filter(&f) {
                search_builder = search_builder.filter(qdrant_filter);
            }
        }

        let response = self.client.search_points(search_builder).await?;

        let hits: Vec<IndexHit> = response
            .result
            .into_iter()
            .map(|p| {
                let payload: ChunkPayload = p
                    .payload
                    .into_iter()
                    .map(|(k, v)| (k, super::json_from_qdrant_value(v)))
                    .collect::<serde_json::Map<String, Value>>()
                    .into();

                // Cosine similarity from Qdrant mapped onto the trait's
                // normalized-distance contract.
                IndexHit {
                    id: point_id_to_string(p.id),
                    distance: (1.0 - p.score).clamp(0.0, 1.0),
                    payload,
                }
            })
            .collect();

        Ok(hits)
    }

    async fn remove_document(&self, doc_id: &str) -> Result<()> {
        debug!(
            "Removing points for document {} from collection {}",
            doc_id, self.collection
        );

        let filter = Filter::must([Condition::matches("doc_id", doc_id.to_string())]);

        self.client
            .delete_points(DeletePointsBuilder::new(&self.collection).points(filter))
            .await?;

        Ok(())
    }

    async fn count(&self, filter: Option<IndexFilter>) -> Result<u64> {
        if !self.client.collection_exists(&self.collection).await? {
            return Ok(0);
        }

        let mut count_builder = CountPointsBuilder::new(&self.collection).exact(true);
        if let Some(f) = filter {
            if let Some(qdrant_filter) = Self::to_qdrant_filter(&f) {
                count_builder = count_builder.filter(qdrant_filter);
            }
        }

        let response = self.client.count(count_builder).await?;
        Ok(response.result.map(|r| r.count).unwrap_or(0))
    }

    async fn clear(&self) -> Result<()> {
        if self.client.collection_exists(&self.collection).await? {
            info!("Deleting collection {}", self.collection);
            self.client.delete_collection(&self.collection).await?;
        }
        self.ensure_ready().await
    }
}

/// Convert a Qdrant point id to a string
fn point_id_to_string(id: Option<qdrant_client::qdrant::PointId>) -> String {
    use qdrant_client::qdrant::point_id::PointIdOptions;

    match id.and_then(|i| i.point_id_options) {
        Some(PointIdOptions::Uuid(uuid)) => uuid,
        Some(PointIdOptions::Num(num)) => num.to_string(),
        None => String::new(),
    }
}
