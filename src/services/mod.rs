use std::sync::Arc;

use crate::{
    config::{Config, Transport},
    qdrant::QdrantRest,
    tools::Dispatcher,
};

pub mod mcp;

pub fn dispatcher(config: &Config) -> anyhow::Result<Dispatcher> {
    let backend = QdrantRest::new(&config.qdrant)?;
    log::info!("Using Qdrant at {}", backend.url());
    Ok(Dispatcher::new(Arc::new(backend)))
}

pub async fn serve(config: &Config) -> anyhow::Result<()> {
    let dispatcher = Arc::new(dispatcher(config)?);
    log::info!("Registered tools: {:?}", dispatcher);
    let server = mcp::QdrantMcpServer::new(dispatcher);

    match config.server.transport {
        Transport::Stdio => mcp::serve_stdio(server).await,
        Transport::HttpStreamable => mcp::serve_http(server, &config.server.addr).await,
    }
}
