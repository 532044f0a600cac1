//! Outbound side of the server: the operations the tool handlers need from a
//! vector database, and the Qdrant REST client that provides them.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[cfg(test)]
pub(crate) mod mock;
pub mod rest;

pub use rest::QdrantRest;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Distance {
    Cosine,
    Euclid,
    Dot,
}

impl Distance {
    pub const ALL: [Distance; 3] = [Distance::Cosine, Distance::Euclid, Distance::Dot];
    /// Qdrant metric names, index-aligned with [`Distance::ALL`].
    pub const NAMES: &'static [&'static str] = &["Cosine", "Euclid", "Dot"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Distance::Cosine => "Cosine",
            Distance::Euclid => "Euclid",
            Distance::Dot => "Dot",
        }
    }
}

/// Qdrant accepts unsigned integers or UUIDs as point ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PointId {
    Num(u64),
    Uuid(String),
}

impl std::fmt::Display for PointId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PointId::Num(n) => write!(f, "{n}"),
            PointId::Uuid(u) => write!(f, "{u}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointStruct {
    pub id: PointId,
    pub vector: Vec<f32>,
    pub payload: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub vector: Vec<f32>,
    pub limit: u64,
    pub score_threshold: Option<f32>,
    pub filter: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPoint {
    pub id: PointId,
    pub score: f32,
    #[serde(default)]
    pub payload: Option<Map<String, Value>>,
}

/// A point as returned by retrieve. `vector` stays untyped because named
/// and sparse vectors come back as objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: PointId,
    #[serde(default)]
    pub payload: Option<Map<String, Value>>,
    #[serde(default)]
    pub vector: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionInfo {
    pub status: String,
    #[serde(default)]
    pub optimizer_status: Option<Value>,
    #[serde(default)]
    pub vectors_count: Option<u64>,
    #[serde(default)]
    pub indexed_vectors_count: Option<u64>,
    #[serde(default)]
    pub points_count: Option<u64>,
    #[serde(default)]
    pub segments_count: Option<u64>,
    #[serde(default)]
    pub config: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateResult {
    #[serde(default)]
    pub operation_id: Option<u64>,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerVersion {
    #[serde(default)]
    pub title: String,
    pub version: String,
}

/// Collection and point operations consumed by the tool handlers.
///
/// Implementations own their connection handling; callers treat every method
/// as one independent round trip.
#[async_trait]
pub trait VectorBackend: Send + Sync {
    async fn list_collections(&self) -> anyhow::Result<Vec<String>>;

    async fn create_collection(
        &self,
        name: &str,
        vector_size: u64,
        distance: Distance,
    ) -> anyhow::Result<bool>;

    async fn delete_collection(&self, name: &str) -> anyhow::Result<bool>;

    async fn collection_info(&self, name: &str) -> anyhow::Result<CollectionInfo>;

    async fn upsert_points(
        &self,
        collection: &str,
        points: Vec<PointStruct>,
    ) -> anyhow::Result<UpdateResult>;

    async fn search_points(
        &self,
        collection: &str,
        request: SearchRequest,
    ) -> anyhow::Result<Vec<ScoredPoint>>;

    async fn delete_points(
        &self,
        collection: &str,
        ids: Vec<PointId>,
    ) -> anyhow::Result<UpdateResult>;

    async fn get_points(&self, collection: &str, ids: Vec<PointId>)
        -> anyhow::Result<Vec<Record>>;

    async fn version(&self) -> anyhow::Result<ServerVersion>;
}
