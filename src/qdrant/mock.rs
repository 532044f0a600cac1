//! In-memory stand-in for the Qdrant REST API, served by axum on an ephemeral port.

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
};

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post, put},
    Json, Router,
};
use serde_json::{json, Value};

pub const MOCK_VERSION: &str = "1.12.0";

type Reply = (StatusCode, Json<Value>);

struct StoredPoint {
    id: Value,
    vector: Vec<f32>,
    payload: Value,
}

struct Collection {
    size: u64,
    distance: String,
    points: BTreeMap<String, StoredPoint>,
}

#[derive(Default)]
struct Inner {
    collections: BTreeMap<String, Collection>,
    api_keys: Vec<String>,
    operation_id: u64,
}

type Shared = Arc<Mutex<Inner>>;

pub struct MockQdrant {
    pub url: String,
    state: Shared,
}

impl MockQdrant {
    pub async fn start() -> Self {
        let state = Shared::default();
        let router = Router::new()
            .route("/", get(version))
            .route("/collections", get(list_collections))
            .route(
                "/collections/{name}",
                get(collection_info)
                    .put(create_collection)
                    .delete(delete_collection),
            )
            .route("/collections/{name}/points", put(upsert).post(retrieve))
            .route("/collections/{name}/points/search", post(search))
            .route("/collections/{name}/points/delete", post(delete_points))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        MockQdrant {
            url: format!("http://{addr}"),
            state,
        }
    }

    /// A url nothing listens on.
    pub async fn unused_url() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{addr}")
    }

    pub fn api_keys(&self) -> Vec<String> {
        self.state.lock().unwrap().api_keys.clone()
    }

    pub fn point_count(&self, collection: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .collections
            .get(collection)
            .map(|c| c.points.len())
            .unwrap_or(0)
    }
}

fn ok(result: Value) -> Reply {
    (
        StatusCode::OK,
        Json(json!({ "result": result, "status": "ok", "time": 0.0001 })),
    )
}

fn fail(status: StatusCode, message: String) -> Reply {
    (
        status,
        Json(json!({ "status": { "error": message }, "time": 0.0 })),
    )
}

fn not_found(name: &str) -> Reply {
    fail(
        StatusCode::NOT_FOUND,
        format!("Not found: Collection `{name}` doesn't exist!"),
    )
}

fn record_key(state: &mut Inner, headers: &HeaderMap) {
    if let Some(key) = headers.get("api-key").and_then(|v| v.to_str().ok()) {
        state.api_keys.push(key.to_string());
    }
}

fn next_update(state: &mut Inner) -> Reply {
    state.operation_id += 1;
    ok(json!({ "operation_id": state.operation_id, "status": "completed" }))
}

fn vector_of(value: &Value) -> Vec<f32> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_f64)
                .map(|x| x as f32)
                .collect()
        })
        .unwrap_or_default()
}

fn score(distance: &str, a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    match distance {
        "Cosine" => {
            let na = a.iter().map(|x| x * x).sum::<f32>().sqrt();
            let nb = b.iter().map(|x| x * x).sum::<f32>().sqrt();
            if na == 0.0 || nb == 0.0 {
                0.0
            } else {
                dot / (na * nb)
            }
        }
        _ => dot,
    }
}

/// Supports `{"must": [{"key": k, "match": {"value": v}}]}`.
fn matches(filter: Option<&Value>, payload: &Value) -> bool {
    let Some(must) = filter.and_then(|f| f.get("must")).and_then(Value::as_array) else {
        return true;
    };
    must.iter().all(|cond| {
        let key = cond.get("key").and_then(Value::as_str).unwrap_or_default();
        let expected = cond.pointer("/match/value");
        payload.get(key) == expected
    })
}

async fn version(State(state): State<Shared>, headers: HeaderMap) -> Json<Value> {
    record_key(&mut state.lock().unwrap(), &headers);
    Json(json!({ "title": "qdrant - vector search engine", "version": MOCK_VERSION }))
}

async fn list_collections(State(state): State<Shared>, headers: HeaderMap) -> Reply {
    let mut state = state.lock().unwrap();
    record_key(&mut state, &headers);
    let collections: Vec<Value> = state
        .collections
        .keys()
        .map(|name| json!({ "name": name }))
        .collect();
    ok(json!({ "collections": collections }))
}

async fn create_collection(
    State(state): State<Shared>,
    Path(name): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    let mut state = state.lock().unwrap();
    record_key(&mut state, &headers);
    if state.collections.contains_key(&name) {
        return fail(
            StatusCode::CONFLICT,
            format!("Wrong input: Collection `{name}` already exists!"),
        );
    }
    let size = body.pointer("/vectors/size").and_then(Value::as_u64);
    let distance = body.pointer("/vectors/distance").and_then(Value::as_str);
    let (Some(size), Some(distance)) = (size, distance) else {
        return fail(
            StatusCode::UNPROCESSABLE_ENTITY,
            "Json deserialize error: missing field `vectors`".to_string(),
        );
    };
    state.collections.insert(
        name,
        Collection {
            size,
            distance: distance.to_string(),
            points: BTreeMap::new(),
        },
    );
    ok(json!(true))
}

async fn delete_collection(
    State(state): State<Shared>,
    Path(name): Path<String>,
    headers: HeaderMap,
) -> Reply {
    let mut state = state.lock().unwrap();
    record_key(&mut state, &headers);
    ok(json!(state.collections.remove(&name).is_some()))
}

async fn collection_info(
    State(state): State<Shared>,
    Path(name): Path<String>,
    headers: HeaderMap,
) -> Reply {
    let mut state = state.lock().unwrap();
    record_key(&mut state, &headers);
    let Some(collection) = state.collections.get(&name) else {
        return not_found(&name);
    };
    ok(json!({
        "status": "green",
        "optimizer_status": "ok",
        "indexed_vectors_count": 0,
        "points_count": collection.points.len(),
        "segments_count": 2,
        "config": {
            "params": {
                "vectors": { "size": collection.size, "distance": collection.distance },
                "shard_number": 1,
            },
            "hnsw_config": { "m": 16, "ef_construct": 100 },
        },
        "payload_schema": {},
    }))
}

async fn upsert(
    State(state): State<Shared>,
    Path(name): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    let mut state = state.lock().unwrap();
    record_key(&mut state, &headers);
    let Some(collection) = state.collections.get_mut(&name) else {
        return not_found(&name);
    };
    let points = body
        .get("points")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    for point in points {
        let vector = vector_of(&point["vector"]);
        if vector.len() as u64 != collection.size {
            return fail(
                StatusCode::BAD_REQUEST,
                format!(
                    "Wrong input: Vector dimension error: expected dim: {}, got {}",
                    collection.size,
                    vector.len()
                ),
            );
        }
        let id = point["id"].clone();
        collection.points.insert(
            id.to_string(),
            StoredPoint {
                id,
                vector,
                payload: point.get("payload").cloned().unwrap_or(json!({})),
            },
        );
    }
    next_update(&mut state)
}

async fn retrieve(
    State(state): State<Shared>,
    Path(name): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    let mut state = state.lock().unwrap();
    record_key(&mut state, &headers);
    let Some(collection) = state.collections.get(&name) else {
        return not_found(&name);
    };
    let ids = body
        .get("ids")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let records: Vec<Value> = ids
        .iter()
        .filter_map(|id| collection.points.get(&id.to_string()))
        .map(|p| json!({ "id": p.id, "payload": p.payload, "vector": p.vector }))
        .collect();
    ok(json!(records))
}

async fn search(
    State(state): State<Shared>,
    Path(name): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    let mut state = state.lock().unwrap();
    record_key(&mut state, &headers);
    let Some(collection) = state.collections.get(&name) else {
        return not_found(&name);
    };
    let query = vector_of(&body["vector"]);
    if query.len() as u64 != collection.size {
        return fail(
            StatusCode::BAD_REQUEST,
            format!(
                "Wrong input: Vector dimension error: expected dim: {}, got {}",
                collection.size,
                query.len()
            ),
        );
    }
    let limit = body.get("limit").and_then(Value::as_u64).unwrap_or(10) as usize;
    let threshold = body.get("score_threshold").and_then(Value::as_f64);
    let filter = body.get("filter");

    let mut hits: Vec<(f32, &StoredPoint)> = collection
        .points
        .values()
        .filter(|p| matches(filter, &p.payload))
        .map(|p| (score(&collection.distance, &query, &p.vector), p))
        .filter(|(s, _)| threshold.map_or(true, |t| f64::from(*s) >= t))
        .collect();
    hits.sort_by(|a, b| b.0.total_cmp(&a.0));
    let hits: Vec<Value> = hits
        .into_iter()
        .take(limit)
        .map(|(s, p)| json!({ "id": p.id, "version": 0, "score": s, "payload": p.payload }))
        .collect();
    ok(json!(hits))
}

async fn delete_points(
    State(state): State<Shared>,
    Path(name): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    let mut state = state.lock().unwrap();
    record_key(&mut state, &headers);
    let Some(collection) = state.collections.get_mut(&name) else {
        return not_found(&name);
    };
    if let Some(ids) = body.get("points").and_then(Value::as_array) {
        for id in ids {
            collection.points.remove(&id.to_string());
        }
    }
    next_update(&mut state)
}
