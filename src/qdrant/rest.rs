use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use super::{
    CollectionInfo, Distance, PointId, PointStruct, Record, ScoredPoint, SearchRequest,
    ServerVersion, UpdateResult, VectorBackend,
};
use crate::config::QdrantConfig;

#[derive(Debug, thiserror::Error)]
pub enum QdrantError {
    #[error("Qdrant returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("unexpected Qdrant response: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(serde::Deserialize)]
struct ApiResponse<T> {
    result: T,
}

#[derive(serde::Deserialize)]
struct CollectionsResult {
    collections: Vec<CollectionDescription>,
}

#[derive(serde::Deserialize)]
struct CollectionDescription {
    name: String,
}

/// Pulls `status.error` out of a Qdrant error body, falling back to the raw text.
fn error_message(body: &[u8]) -> String {
    serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/status/error")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| String::from_utf8_lossy(body).trim().to_string())
}

/// Qdrant client over the REST API.
#[derive(Debug, Clone)]
pub struct QdrantRest {
    client: reqwest::Client,
    base: Url,
    api_key: Option<String>,
}

impl QdrantRest {
    pub fn new(config: &QdrantConfig) -> anyhow::Result<Self> {
        let base = Url::parse(&config.url)
            .with_context(|| format!("Invalid Qdrant url: {}", config.url))?;
        if base.cannot_be_a_base() {
            anyhow::bail!("Invalid Qdrant url: {}", config.url);
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_sec))
            .build()?;
        Ok(Self {
            client,
            base,
            api_key: config.api_key.clone(),
        })
    }

    pub fn url(&self) -> &str {
        self.base.as_str()
    }

    /// Dot segments are refused: URL normalization would drop them and
    /// silently retarget the request.
    fn endpoint(&self, segments: &[&str], wait: bool) -> anyhow::Result<Url> {
        if let Some(segment) = segments.iter().find(|s| matches!(**s, "." | "..")) {
            anyhow::bail!("`{segment}` cannot be used as a collection name");
        }
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("Invalid Qdrant url: {}", self.base))?
            .pop_if_empty()
            .extend(segments);
        if wait {
            url.query_pairs_mut().append_pair("wait", "true");
        }
        Ok(url)
    }

    async fn send_raw<T: DeserializeOwned>(&self, request: RequestBuilder) -> anyhow::Result<T> {
        let request = match &self.api_key {
            Some(key) => request.header("api-key", key),
            None => request,
        };
        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            let message = error_message(&body);
            log::debug!("Qdrant error {}: {}", status, message);
            return Err(QdrantError::Api {
                status: status.as_u16(),
                message,
            }
            .into());
        }
        Ok(serde_json::from_slice(&body).map_err(QdrantError::Decode)?)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> anyhow::Result<T> {
        let response: ApiResponse<T> = self.send_raw(request).await?;
        Ok(response.result)
    }
}

#[async_trait]
impl VectorBackend for QdrantRest {
    async fn list_collections(&self) -> anyhow::Result<Vec<String>> {
        let url = self.endpoint(&["collections"], false)?;
        let result: CollectionsResult = self.send(self.client.get(url)).await?;
        Ok(result.collections.into_iter().map(|c| c.name).collect())
    }

    async fn create_collection(
        &self,
        name: &str,
        vector_size: u64,
        distance: Distance,
    ) -> anyhow::Result<bool> {
        let url = self.endpoint(&["collections", name], false)?;
        let body = json!({
            "vectors": {
                "size": vector_size,
                "distance": distance,
            }
        });
        self.send(self.client.put(url).json(&body)).await
    }

    async fn delete_collection(&self, name: &str) -> anyhow::Result<bool> {
        let url = self.endpoint(&["collections", name], false)?;
        self.send(self.client.delete(url)).await
    }

    async fn collection_info(&self, name: &str) -> anyhow::Result<CollectionInfo> {
        let url = self.endpoint(&["collections", name], false)?;
        self.send(self.client.get(url)).await
    }

    async fn upsert_points(
        &self,
        collection: &str,
        points: Vec<PointStruct>,
    ) -> anyhow::Result<UpdateResult> {
        let url = self.endpoint(&["collections", collection, "points"], true)?;
        let body = json!({ "points": points });
        self.send(self.client.put(url).json(&body)).await
    }

    async fn search_points(
        &self,
        collection: &str,
        request: SearchRequest,
    ) -> anyhow::Result<Vec<ScoredPoint>> {
        let url = self.endpoint(&["collections", collection, "points", "search"], false)?;
        let mut body = json!({
            "vector": request.vector,
            "limit": request.limit,
            "with_payload": true,
        });
        if let Some(threshold) = request.score_threshold {
            body["score_threshold"] = json!(threshold);
        }
        if let Some(filter) = request.filter {
            body["filter"] = filter;
        }
        self.send(self.client.post(url).json(&body)).await
    }

    async fn delete_points(
        &self,
        collection: &str,
        ids: Vec<PointId>,
    ) -> anyhow::Result<UpdateResult> {
        let url = self.endpoint(&["collections", collection, "points", "delete"], true)?;
        let body = json!({ "points": ids });
        self.send(self.client.post(url).json(&body)).await
    }

    async fn get_points(
        &self,
        collection: &str,
        ids: Vec<PointId>,
    ) -> anyhow::Result<Vec<Record>> {
        let url = self.endpoint(&["collections", collection, "points"], false)?;
        let body = json!({
            "ids": ids,
            "with_payload": true,
            "with_vector": true,
        });
        self.send(self.client.post(url).json(&body)).await
    }

    async fn version(&self) -> anyhow::Result<ServerVersion> {
        let url = self.endpoint(&[], false)?;
        self.send_raw(self.client.get(url)).await
    }
}
