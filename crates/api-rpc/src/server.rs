//! JSON-RPC Server
//!
//! Serves the ingress methods over TCP on localhost.

use crate::handler::RpcHandler;
use crate::types::{StatsRequest, SubmitCommandRequest};
use jsonrpsee::server::{Server, ServerHandle};
use jsonrpsee::RpcModule;
use std::net::SocketAddr;
use std::sync::Arc;
use tierd_core::application::SubmissionService;
use tracing::info;

pub const DEFAULT_RPC_HOST: &str = "127.0.0.1";
pub const DEFAULT_RPC_PORT: u16 = 9527;

/// RPC Server Configuration
#[derive(Debug, Clone)]
pub struct RpcServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for RpcServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_RPC_HOST.to_string(),
            port: DEFAULT_RPC_PORT,
        }
    }
}

/// RPC Server
pub struct RpcServer {
    config: RpcServerConfig,
    handler: Arc<RpcHandler>,
}

impl RpcServer {
    pub fn new(config: RpcServerConfig, submissions: Arc<SubmissionService>) -> Self {
        Self {
            config,
            handler: Arc::new(RpcHandler::new(submissions)),
        }
    }

    /// Build the method table
    pub fn into_module(self) -> Result<RpcModule<()>, String> {
        let mut module = RpcModule::new(());

        let handler = self.handler.clone();
        module
            .register_method("cmd.submit.v1", move |params, _, _| {
                let req: SubmitCommandRequest = params.parse()?;
                handler.submit(req)
            })
            .map_err(|e| e.to_string())?;

        let handler = self.handler.clone();
        module
            .register_method("admin.stats.v1", move |_, _, _| handler.stats(StatsRequest {}))
            .map_err(|e| e.to_string())?;

        Ok(module)
    }

    /// Start the JSON-RPC server. Returns the bound address (useful with port 0).
    pub async fn start(self) -> Result<(SocketAddr, ServerHandle), String> {
        let addr = format!("{}:{}", self.config.host, self.config.port);

        info!(
            host = %self.config.host,
            port = %self.config.port,
            "Starting JSON-RPC server on TCP"
        );

        let server = Server::builder()
            .build(&addr)
            .await
            .map_err(|e| format!("Failed to build server on {}: {}", addr, e))?;
        let local_addr = server
            .local_addr()
            .map_err(|e| format!("Failed to read bound address: {}", e))?;

        let module = self.into_module()?;
        let handle = server.start(module);

        info!(addr = %local_addr, "JSON-RPC server started");
        Ok((local_addr, handle))
    }
}
