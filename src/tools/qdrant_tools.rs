//! The fixed set of Qdrant tools exposed over MCP.

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{ParamKind, ParamSpec, Params, Tool, ToolError, ToolSet};
use crate::qdrant::{Distance, SearchRequest, VectorBackend};

pub const DEFAULT_SEARCH_LIMIT: u64 = 10;

const NO_PARAMS: &[ParamSpec] = &[];

const COLLECTION_NAME: &[ParamSpec] = &[ParamSpec::required(
    "name",
    ParamKind::String,
    "Name of the collection",
)];

const POINT_IDS: &[ParamSpec] = &[
    ParamSpec::required("collection", ParamKind::String, "Name of the collection"),
    ParamSpec::required("ids", ParamKind::Ids, "List of vector IDs"),
];

/// Builds the registry in the order tools are advertised.
pub fn registry() -> ToolSet {
    let mut tools = ToolSet::default();
    tools.add_tool(ListCollections);
    tools.add_tool(CreateCollection);
    tools.add_tool(DeleteCollection);
    tools.add_tool(GetCollectionInfo);
    tools.add_tool(UpsertVectors);
    tools.add_tool(SearchVectors);
    tools.add_tool(DeleteVectors);
    tools.add_tool(GetVectors);
    tools.add_tool(HealthCheck);
    tools
}

pub struct ListCollections;

#[async_trait]
impl Tool for ListCollections {
    fn name(&self) -> &'static str {
        "list_collections"
    }

    fn description(&self) -> &'static str {
        "List all collections in the Qdrant database"
    }

    fn parameters(&self) -> &'static [ParamSpec] {
        NO_PARAMS
    }

    async fn call(&self, backend: &dyn VectorBackend, _params: Params) -> Result<Value, ToolError> {
        let collections = backend.list_collections().await?;
        Ok(json!({
            "count": collections.len(),
            "collections": collections,
        }))
    }
}

pub struct CreateCollection;

impl CreateCollection {
    const PARAMS: &'static [ParamSpec] = &[
        ParamSpec::required(
            "name",
            ParamKind::String,
            "Name of the collection to create",
        ),
        ParamSpec::required(
            "vector_size",
            ParamKind::Integer { default: None },
            "Size of the vectors in this collection",
        ),
        ParamSpec::optional(
            "distance",
            ParamKind::Choice {
                options: Distance::NAMES,
                default: "Cosine",
            },
            "Distance metric for vector similarity",
        ),
    ];
}

#[async_trait]
impl Tool for CreateCollection {
    fn name(&self) -> &'static str {
        "create_collection"
    }

    fn description(&self) -> &'static str {
        "Create a new collection in Qdrant"
    }

    fn parameters(&self) -> &'static [ParamSpec] {
        Self::PARAMS
    }

    async fn call(&self, backend: &dyn VectorBackend, params: Params) -> Result<Value, ToolError> {
        let name = params.string("name")?;
        let vector_size = params.positive_integer("vector_size")?;
        let distance = Distance::ALL[params.choice("distance", Distance::NAMES, 0)?];

        backend
            .create_collection(&name, vector_size, distance)
            .await?;
        Ok(json!({
            "message": format!("Collection '{name}' created successfully"),
            "collection": {
                "name": name,
                "vector_size": vector_size,
                "distance": distance.as_str(),
            },
        }))
    }
}

pub struct DeleteCollection;

#[async_trait]
impl Tool for DeleteCollection {
    fn name(&self) -> &'static str {
        "delete_collection"
    }

    fn description(&self) -> &'static str {
        "Delete a collection from Qdrant"
    }

    fn parameters(&self) -> &'static [ParamSpec] {
        COLLECTION_NAME
    }

    async fn call(&self, backend: &dyn VectorBackend, params: Params) -> Result<Value, ToolError> {
        let name = params.string("name")?;
        let deleted = backend.delete_collection(&name).await?;
        Ok(json!({
            "message": format!("Collection '{name}' deleted successfully"),
            "deleted": deleted,
        }))
    }
}

pub struct GetCollectionInfo;

#[async_trait]
impl Tool for GetCollectionInfo {
    fn name(&self) -> &'static str {
        "get_collection_info"
    }

    fn description(&self) -> &'static str {
        "Get information about a specific collection"
    }

    fn parameters(&self) -> &'static [ParamSpec] {
        COLLECTION_NAME
    }

    async fn call(&self, backend: &dyn VectorBackend, params: Params) -> Result<Value, ToolError> {
        let name = params.string("name")?;
        let info = backend.collection_info(&name).await?;
        let vectors = info
            .config
            .pointer("/params/vectors")
            .cloned()
            .unwrap_or(Value::Null);
        Ok(json!({
            "collection": {
                "name": name,
                "status": info.status,
                "optimizer_status": info.optimizer_status,
                "vectors_count": info.vectors_count,
                "indexed_vectors_count": info.indexed_vectors_count,
                "points_count": info.points_count,
                "segments_count": info.segments_count,
                "config": {
                    "params": {
                        "vectors": vectors,
                    },
                },
            },
        }))
    }
}

pub struct UpsertVectors;

impl UpsertVectors {
    const PARAMS: &'static [ParamSpec] = &[
        ParamSpec::required("collection", ParamKind::String, "Name of the collection"),
        ParamSpec::required("vectors", ParamKind::Records, "List of vectors to upsert"),
    ];
}

#[async_trait]
impl Tool for UpsertVectors {
    fn name(&self) -> &'static str {
        "upsert_vectors"
    }

    fn description(&self) -> &'static str {
        "Insert or update vectors in a collection"
    }

    fn parameters(&self) -> &'static [ParamSpec] {
        Self::PARAMS
    }

    async fn call(&self, backend: &dyn VectorBackend, params: Params) -> Result<Value, ToolError> {
        let collection = params.string("collection")?;
        let points = params.records("vectors")?;
        let count = points.len();
        let update = backend.upsert_points(&collection, points).await?;
        Ok(json!({
            "message": format!("Upserted {count} vectors to collection '{collection}'"),
            "operation_id": update.operation_id,
            "status_info": update.status,
        }))
    }
}

pub struct SearchVectors;

impl SearchVectors {
    const PARAMS: &'static [ParamSpec] = &[
        ParamSpec::required(
            "collection",
            ParamKind::String,
            "Name of the collection to search",
        ),
        ParamSpec::required(
            "query_vector",
            ParamKind::Vector,
            "Query vector for similarity search",
        ),
        ParamSpec::optional(
            "limit",
            ParamKind::Integer {
                default: Some(DEFAULT_SEARCH_LIMIT),
            },
            "Maximum number of results to return",
        ),
        ParamSpec::optional(
            "score_threshold",
            ParamKind::Number { default: None },
            "Minimum similarity score threshold",
        ),
        ParamSpec::optional(
            "filter",
            ParamKind::Object,
            "Filter conditions for the search",
        ),
    ];
}

#[async_trait]
impl Tool for SearchVectors {
    fn name(&self) -> &'static str {
        "search_vectors"
    }

    fn description(&self) -> &'static str {
        "Search for similar vectors in a collection"
    }

    fn parameters(&self) -> &'static [ParamSpec] {
        Self::PARAMS
    }

    async fn call(&self, backend: &dyn VectorBackend, params: Params) -> Result<Value, ToolError> {
        let collection = params.string("collection")?;
        let vector = params.vector("query_vector")?;
        let limit = params
            .opt_positive_integer("limit")?
            .unwrap_or(DEFAULT_SEARCH_LIMIT);
        let score_threshold = params.opt_number("score_threshold")?;
        let filter = params.opt_object("filter")?;

        let hits = backend
            .search_points(
                &collection,
                SearchRequest {
                    vector,
                    limit,
                    score_threshold,
                    filter,
                },
            )
            .await?;
        let results: Vec<Value> = hits
            .into_iter()
            .map(|hit| json!({ "id": hit.id, "score": hit.score, "payload": hit.payload }))
            .collect();
        Ok(json!({
            "query": {
                "collection": collection,
                "limit": limit,
                "score_threshold": score_threshold,
            },
            "count": results.len(),
            "results": results,
        }))
    }
}

pub struct DeleteVectors;

#[async_trait]
impl Tool for DeleteVectors {
    fn name(&self) -> &'static str {
        "delete_vectors"
    }

    fn description(&self) -> &'static str {
        "Delete vectors from a collection"
    }

    fn parameters(&self) -> &'static [ParamSpec] {
        POINT_IDS
    }

    async fn call(&self, backend: &dyn VectorBackend, params: Params) -> Result<Value, ToolError> {
        let collection = params.string("collection")?;
        let ids = params.ids("ids")?;
        let count = ids.len();
        let update = backend.delete_points(&collection, ids).await?;
        Ok(json!({
            "message": format!("Deleted {count} vectors from collection '{collection}'"),
            "operation_id": update.operation_id,
            "status_info": update.status,
        }))
    }
}

pub struct GetVectors;

#[async_trait]
impl Tool for GetVectors {
    fn name(&self) -> &'static str {
        "get_vectors"
    }

    fn description(&self) -> &'static str {
        "Retrieve vectors by their IDs"
    }

    fn parameters(&self) -> &'static [ParamSpec] {
        POINT_IDS
    }

    async fn call(&self, backend: &dyn VectorBackend, params: Params) -> Result<Value, ToolError> {
        let collection = params.string("collection")?;
        let ids = params.ids("ids")?;
        let records = backend.get_points(&collection, ids).await?;
        let vectors: Vec<Value> = records
            .into_iter()
            .map(|r| json!({ "id": r.id, "vector": r.vector, "payload": r.payload }))
            .collect();
        Ok(json!({
            "count": vectors.len(),
            "vectors": vectors,
        }))
    }
}

pub struct HealthCheck;

#[async_trait]
impl Tool for HealthCheck {
    fn name(&self) -> &'static str {
        "health_check"
    }

    fn description(&self) -> &'static str {
        "Check the health status of the Qdrant connection"
    }

    fn parameters(&self) -> &'static [ParamSpec] {
        NO_PARAMS
    }

    async fn call(&self, backend: &dyn VectorBackend, _params: Params) -> Result<Value, ToolError> {
        let collections = backend.list_collections().await?;
        let version = backend.version().await?;
        Ok(json!({
            "status": "healthy",
            "message": "Qdrant connection is working",
            "collections_count": collections.len(),
            "version": version.version,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        }))
    }
}
