use std::sync::Arc;

use axum::Router;
use rmcp::{
    model::{
        CallToolRequestParam, CallToolResult, Content, Implementation, ListToolsResult,
        PaginatedRequestParam, ServerCapabilities, ServerInfo, Tool as McpTool,
    },
    service::RequestContext,
    transport::{
        stdio,
        streamable_http_server::{
            session::local::LocalSessionManager, StreamableHttpServerConfig,
            StreamableHttpService,
        },
    },
    ErrorData as McpError, RoleServer, ServerHandler, ServiceExt,
};

use crate::tools::Dispatcher;

/// MCP front end for the tool dispatcher.
#[derive(Clone, Debug)]
pub struct QdrantMcpServer {
    dispatcher: Arc<Dispatcher>,
}

impl QdrantMcpServer {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }

    pub fn mcp_tools(&self) -> Vec<McpTool> {
        self.dispatcher
            .tools()
            .iter()
            .map(|tool| {
                McpTool::new(
                    tool.name(),
                    tool.description(),
                    Arc::new(tool.input_schema()),
                )
            })
            .collect()
    }

    /// Tool failures are reported in the result with `is_error` set, never as
    /// protocol errors.
    pub async fn call(&self, request: CallToolRequestParam) -> CallToolResult {
        let outcome = self
            .dispatcher
            .invoke(&request.name, request.arguments)
            .await;
        let content = vec![Content::text(outcome.to_pretty_json())];
        if outcome.is_success() {
            CallToolResult::success(content)
        } else {
            CallToolResult::error(content)
        }
    }
}

impl ServerHandler for QdrantMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Qdrant MCP Server - collection management, vector upsert/search/fetch/delete \
                 and health monitoring for a Qdrant vector database."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: env!("CARGO_PKG_NAME").into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult::with_all_items(self.mcp_tools()))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        Ok(self.call(request).await)
    }
}

pub async fn serve_stdio(server: QdrantMcpServer) -> anyhow::Result<()> {
    log::info!("MCP server running on stdio");
    let service = server.serve(stdio()).await.inspect_err(|e| {
        log::error!("serving error: {:?}", e);
    })?;
    let reason = service.waiting().await?;
    log::info!("MCP server stopped: {:?}", reason);
    Ok(())
}

pub fn router(server: QdrantMcpServer) -> Router {
    let service = StreamableHttpService::new(
        move || Ok(server.clone()),
        LocalSessionManager::default().into(),
        StreamableHttpServerConfig::default(),
    );
    Router::new().nest_service("/mcp", service)
}

pub async fn serve_http(server: QdrantMcpServer, addr: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("MCP server listening on http://{}/mcp", addr);

    axum::serve(listener, router(server))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::error!("Failed to listen for shutdown signal: {}", e);
            }
            log::info!("Shutdown signal received");
        })
        .await?;
    Ok(())
}

#[cfg(test)]
mod test {
    use serde_json::{json, Value};

    use super::*;
    use crate::config::QdrantConfig;
    use crate::qdrant::{mock::MockQdrant, QdrantRest};

    fn server_for(url: &str) -> QdrantMcpServer {
        let backend = QdrantRest::new(&QdrantConfig {
            url: url.to_string(),
            api_key: None,
            timeout_sec: 5,
        })
        .unwrap();
        QdrantMcpServer::new(Arc::new(Dispatcher::new(Arc::new(backend))))
    }

    fn request(name: &str, arguments: Value) -> CallToolRequestParam {
        CallToolRequestParam {
            name: name.to_string().into(),
            arguments: arguments.as_object().cloned(),
        }
    }

    /// Returns `(is_error, envelope)` from the wire form of a result.
    fn decode(result: &CallToolResult) -> (bool, Value) {
        let wire = serde_json::to_value(result).unwrap();
        let text = wire["content"][0]["text"].as_str().unwrap();
        (
            wire["isError"].as_bool().unwrap_or(false),
            serde_json::from_str(text).unwrap(),
        )
    }

    #[test]
    fn advertises_tools_with_schemas() {
        let server = server_for("http://localhost:6333");
        let tools = server.mcp_tools();
        assert_eq!(tools.len(), 9);

        let wire = serde_json::to_value(&tools).unwrap();
        let search = wire
            .as_array()
            .unwrap()
            .iter()
            .find(|t| t["name"] == "search_vectors")
            .unwrap();
        assert_eq!(
            search["inputSchema"]["required"],
            json!(["collection", "query_vector"])
        );
        assert_eq!(search["inputSchema"]["properties"]["limit"]["default"], 10);

        let info = server.get_info();
        assert!(info.capabilities.tools.is_some());
    }

    #[tokio::test]
    async fn successful_call_returns_envelope_text() {
        let mock = MockQdrant::start().await;
        let server = server_for(&mock.url);
        let result = server.call(request("list_collections", json!({}))).await;
        let (is_error, envelope) = decode(&result);
        assert!(!is_error);
        assert_eq!(
            envelope,
            json!({ "status": "success", "result": { "collections": [], "count": 0 } })
        );
    }

    #[tokio::test]
    async fn failures_are_tool_errors_not_protocol_errors() {
        let server = server_for(&MockQdrant::unused_url().await);

        let (is_error, envelope) = decode(&server.call(request("no_such_tool", json!({}))).await);
        assert!(is_error);
        assert_eq!(envelope["kind"], "UnknownTool");

        let (is_error, envelope) =
            decode(&server.call(request("delete_collection", json!({}))).await);
        assert!(is_error);
        assert_eq!(envelope["kind"], "MissingParameter");

        let (is_error, envelope) = decode(&server.call(request("health_check", json!({}))).await);
        assert!(is_error);
        assert_eq!(envelope["kind"], "BackendError");
    }
}
