use std::{collections::HashMap, fmt::Debug, sync::Arc};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::qdrant::VectorBackend;

pub mod params;
pub mod qdrant_tools;

pub use params::{ParamKind, ParamSpec, Params};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FailureKind {
    MissingParameter,
    InvalidParameter,
    UnknownTool,
    BackendError,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ToolError {
    #[error("missing required parameter `{0}`")]
    MissingParameter(String),
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: String, reason: String },
    #[error("unknown tool `{0}`")]
    UnknownTool(String),
    #[error("{0}")]
    Backend(String),
}

impl ToolError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ToolError::MissingParameter(_) => FailureKind::MissingParameter,
            ToolError::InvalidParameter { .. } => FailureKind::InvalidParameter,
            ToolError::UnknownTool(_) => FailureKind::UnknownTool,
            ToolError::Backend(_) => FailureKind::BackendError,
        }
    }
}

impl From<anyhow::Error> for ToolError {
    fn from(e: anyhow::Error) -> Self {
        ToolError::Backend(format!("{e:#}"))
    }
}

/// Outcome of one tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Invocation {
    Success { result: Value },
    Error { kind: FailureKind, message: String },
}

impl Invocation {
    pub fn is_success(&self) -> bool {
        matches!(self, Invocation::Success { .. })
    }

    pub fn result(&self) -> Option<&Value> {
        match self {
            Invocation::Success { result } => Some(result),
            Invocation::Error { .. } => None,
        }
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Invocation::Success { .. } => None,
            Invocation::Error { kind, .. } => Some(*kind),
        }
    }

    pub fn failure(e: ToolError) -> Self {
        Invocation::Error {
            kind: e.kind(),
            message: e.to_string(),
        }
    }

    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(self)
            .unwrap_or_else(|e| json!({ "status": "error", "message": e.to_string() }).to_string())
    }
}

impl From<Result<Value, ToolError>> for Invocation {
    fn from(result: Result<Value, ToolError>) -> Self {
        match result {
            Ok(result) => Invocation::Success { result },
            Err(e) => Invocation::failure(e),
        }
    }
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    fn parameters(&self) -> &'static [ParamSpec];
    async fn call(&self, backend: &dyn VectorBackend, params: Params) -> Result<Value, ToolError>;

    fn input_schema(&self) -> Map<String, Value> {
        params::input_schema(self.parameters())
    }

    fn descriptor(&self) -> Value {
        json!({
            "name": self.name(),
            "description": self.description(),
            "inputSchema": self.input_schema(),
        })
    }
}

/// Name-keyed tool registry. Listing preserves registration order.
#[derive(Clone, Default)]
pub struct ToolSet {
    tools: HashMap<&'static str, Arc<dyn Tool>>,
    order: Vec<&'static str>,
}

impl Debug for ToolSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolSet")
            .field("tools", &self.order)
            .finish()
    }
}

impl ToolSet {
    /// Returns false and keeps the existing tool when the name is taken.
    pub fn add_tool<T: Tool + 'static>(&mut self, tool: T) -> bool {
        let name = tool.name();
        if self.tools.contains_key(name) {
            log::warn!("tool {} is already registered", name);
            return false;
        }
        self.tools.insert(name, Arc::new(tool));
        self.order.push(name);
        true
    }

    pub fn get_tool(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn tools(&self) -> Vec<Arc<dyn Tool>> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name).cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Routes named invocations to the registered tools and folds every outcome
/// into an [`Invocation`].
#[derive(Clone)]
pub struct Dispatcher {
    tools: ToolSet,
    backend: Arc<dyn VectorBackend>,
}

impl Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("tools", &self.tools)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    pub fn new(backend: Arc<dyn VectorBackend>) -> Self {
        Self::with_tools(qdrant_tools::registry(), backend)
    }

    pub fn with_tools(tools: ToolSet, backend: Arc<dyn VectorBackend>) -> Self {
        Self { tools, backend }
    }

    pub fn tools(&self) -> Vec<Arc<dyn Tool>> {
        self.tools.tools()
    }

    pub async fn invoke(&self, name: &str, args: Option<Map<String, Value>>) -> Invocation {
        let Some(tool) = self.tools.get_tool(name) else {
            log::warn!("Unknown tool: {}", name);
            return Invocation::failure(ToolError::UnknownTool(name.to_string()));
        };

        log::info!("Calling tool {}", name);
        log::debug!("arguments: {:?}", args);
        let result = match Params::validate(tool.parameters(), args) {
            Ok(params) => tool.call(self.backend.as_ref(), params).await,
            Err(e) => Err(e),
        };

        match &result {
            Ok(_) => log::debug!("tool {} succeeded", name),
            Err(e @ ToolError::Backend(_)) => log::error!("Error handling tool {}: {}", name, e),
            Err(e) => log::warn!("Rejected call to {}: {}", name, e),
        }
        result.into()
    }
}
