//! Scripted walkthrough of every tool and removal of the collections it leaves
//! behind. Both drive the same dispatcher the MCP server uses.

use serde_json::{json, Value};

use crate::tools::{Dispatcher, Invocation};

pub const DEMO_COLLECTION: &str = "mcp_demo_collection";

/// Collection names the embedding and MCP walkthroughs create.
pub const DEMO_COLLECTIONS: &[&str] = &[
    "basic_embeddings_demo",
    "basic_embeddings",
    "dense_embeddings_demo",
    "minicoil_demo",
    "minicoil_collection",
    "sparse_minicoil_demo",
    "splade_demo",
    "splade_collection",
    "sparse_splade_demo",
    "colbert_demo",
    "colbert_collection",
    "multivector_demo",
    "colbert_multivector_demo",
    "reranking_demo",
    "reranking_collection",
    "rerank_demo",
    "fastembed_demo_collection",
    "qdrant_integration_demo",
    "integration_demo",
    DEMO_COLLECTION,
    "mcp_server_demo",
    "mcp_demo",
    "comparison_demo_collection",
    "comparison_demo",
    "all_methods_demo",
    "demo_collection",
    "test_collection",
    "sample_collection",
    "example_collection",
    "tutorial_collection",
    "quickstart_collection",
];

async fn step(
    dispatcher: &Dispatcher,
    title: &str,
    tool: &str,
    arguments: Value,
) -> anyhow::Result<Value> {
    println!("\n{title}");
    match dispatcher.invoke(tool, arguments.as_object().cloned()).await {
        Invocation::Success { result } => Ok(result),
        Invocation::Error { kind, message } => {
            anyhow::bail!("{tool} failed ({kind:?}): {message}")
        }
    }
}

fn sample_records(dim: usize) -> Value {
    json!([
        {
            "id": "1",
            "vector": vec![0.1f32; dim],
            "payload": { "text": "Machine learning is fascinating", "category": "AI" },
        },
        {
            "id": "2",
            "vector": vec![0.2f32; dim],
            "payload": { "text": "Vector databases are powerful", "category": "Database" },
        },
        {
            "id": "3",
            "vector": vec![0.15f32; dim],
            "payload": { "text": "AI and ML work together", "category": "AI" },
        },
    ])
}

pub async fn run_walkthrough(dispatcher: &Dispatcher, dim: usize) -> anyhow::Result<()> {
    anyhow::ensure!(dim > 0, "vector dimension must be positive");

    let health = step(dispatcher, "1. Health check", "health_check", json!({})).await?;
    println!(
        "   Status: {}, Qdrant {}, {} collections",
        health["status"], health["version"], health["collections_count"]
    );

    let listed = step(dispatcher, "2. List collections", "list_collections", json!({})).await?;
    println!("   Found {} collections", listed["count"]);
    let stale = listed["collections"]
        .as_array()
        .is_some_and(|names| names.iter().any(|n| n == DEMO_COLLECTION));
    if stale {
        step(
            dispatcher,
            "   Removing collection left by a previous run",
            "delete_collection",
            json!({ "name": DEMO_COLLECTION }),
        )
        .await?;
    }

    let created = step(
        dispatcher,
        "3. Create test collection",
        "create_collection",
        json!({ "name": DEMO_COLLECTION, "vector_size": dim, "distance": "Cosine" }),
    )
    .await?;
    println!("   Collection: {}", created["collection"]["name"]);

    let info = step(
        dispatcher,
        "4. Get collection info",
        "get_collection_info",
        json!({ "name": DEMO_COLLECTION }),
    )
    .await?;
    let vectors = &info["collection"]["config"]["params"]["vectors"];
    println!(
        "   Vector size: {}, distance: {}",
        vectors["size"], vectors["distance"]
    );

    let upserted = step(
        dispatcher,
        "5. Insert vectors",
        "upsert_vectors",
        json!({ "collection": DEMO_COLLECTION, "vectors": sample_records(dim) }),
    )
    .await?;
    println!("   {}", upserted["message"]);

    let found = step(
        dispatcher,
        "6. Search vectors",
        "search_vectors",
        json!({ "collection": DEMO_COLLECTION, "query_vector": vec![0.1f32; dim], "limit": 3 }),
    )
    .await?;
    println!("   Found {} results:", found["count"]);
    for (i, hit) in found["results"].as_array().into_iter().flatten().enumerate() {
        println!(
            "     {}. id={} score={} text={}",
            i + 1,
            hit["id"],
            hit["score"],
            hit["payload"]["text"]
        );
    }

    let fetched = step(
        dispatcher,
        "7. Get specific vectors",
        "get_vectors",
        json!({ "collection": DEMO_COLLECTION, "ids": ["1", "2"] }),
    )
    .await?;
    println!("   Retrieved {} vectors", fetched["count"]);

    let deleted = step(
        dispatcher,
        "8. Delete a vector",
        "delete_vectors",
        json!({ "collection": DEMO_COLLECTION, "ids": ["3"] }),
    )
    .await?;
    println!("   {}", deleted["message"]);

    let dropped = step(
        dispatcher,
        "9. Delete test collection",
        "delete_collection",
        json!({ "name": DEMO_COLLECTION }),
    )
    .await?;
    println!("   {}", dropped["message"]);
    Ok(())
}

#[derive(Debug, Default, PartialEq)]
pub struct CleanupReport {
    pub deleted: Vec<String>,
    pub missing: Vec<String>,
}

/// Deletes each named collection that exists.
pub async fn cleanup(dispatcher: &Dispatcher, names: &[String]) -> anyhow::Result<CleanupReport> {
    let listed = match dispatcher.invoke("list_collections", None).await {
        Invocation::Success { result } => result,
        Invocation::Error { message, .. } => anyhow::bail!("list_collections failed: {message}"),
    };
    let existing: Vec<&str> = listed["collections"]
        .as_array()
        .map(|names| names.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    log::info!("Found {} collections in Qdrant", existing.len());

    let mut report = CleanupReport::default();
    for name in names {
        if !existing.contains(&name.as_str()) {
            report.missing.push(name.clone());
            continue;
        }
        let arguments = json!({ "name": name }).as_object().cloned();
        match dispatcher.invoke("delete_collection", arguments).await {
            Invocation::Success { .. } => report.deleted.push(name.clone()),
            Invocation::Error { message, .. } => {
                anyhow::bail!("failed to delete {name}: {message}")
            }
        }
    }
    Ok(report)
}
