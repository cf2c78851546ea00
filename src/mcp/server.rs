//! MCP server: the per-connection protocol dispatcher.
//!
//! A server moves through `Idle -> Connecting -> Connected -> Closed` exactly
//! once. Reaching `Connected` emits a single `server.info` notification before
//! any inbound frame is processed. Inbound frames are classified in delivery
//! order, but each request runs on its own task, so responses may leave in a
//! different order than their requests arrived.

use futures::FutureExt;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use tokio::sync::watch;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::mcp::prompts::{ListPromptsResult, PromptRegistry};
use crate::mcp::protocol::*;
use crate::mcp::registry::Registry;
use crate::mcp::transport::{FrameHandler, Transport};
use crate::metrics::Metrics;
use crate::VERSION;

/// Connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No transport attached.
    Idle,
    /// Transport handshake in flight.
    Connecting,
    /// Frames flow in both directions.
    Connected,
    /// Terminal.
    Closed,
}

/// MCP server.
pub struct McpServer {
    inner: Arc<Inner>,
}

struct Inner {
    registry: Arc<Registry>,
    prompts: Arc<PromptRegistry>,
    info: ServerInfo,
    state: watch::Sender<ConnectionState>,
    transport: OnceLock<Arc<dyn Transport>>,
    in_flight: TaskTracker,
    metrics: Arc<Metrics>,
}

impl McpServer {
    /// Create a new MCP server.
    pub fn new(registry: Registry, prompts: PromptRegistry, name: impl Into<String>) -> Self {
        Self::with_shared(
            Arc::new(registry),
            Arc::new(prompts),
            ServerInfo {
                name: name.into(),
                version: VERSION.to_string(),
            },
            Metrics::new(),
        )
    }

    /// Create a server over registries and metrics shared with other owners.
    pub fn with_shared(
        registry: Arc<Registry>,
        prompts: Arc<PromptRegistry>,
        info: ServerInfo,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                registry,
                prompts,
                info,
                state: watch::Sender::new(ConnectionState::Idle),
                transport: OnceLock::new(),
                in_flight: TaskTracker::new(),
                metrics,
            }),
        }
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.inner.state.borrow()
    }

    /// Server identity announced on connect.
    pub fn info(&self) -> &ServerInfo {
        &self.inner.info
    }

    pub fn metrics(&self) -> Arc<Metrics> {
        Arc::clone(&self.inner.metrics)
    }

    /// Attach a transport and announce the server.
    pub async fn connect(&self, transport: Arc<dyn Transport>) -> Result<()> {
        let started = self.inner.state.send_if_modified(|state| {
            if *state == ConnectionState::Idle {
                *state = ConnectionState::Connecting;
                true
            } else {
                false
            }
        });
        if !started {
            return Err(Error::AlreadyConnected);
        }

        if self.inner.transport.set(Arc::clone(&transport)).is_err() {
            return Err(Error::AlreadyConnected);
        }

        let inner = Arc::clone(&self.inner);
        let on_message: FrameHandler =
            Arc::new(move |frame: String| Arc::clone(&inner).on_frame(frame).boxed());

        if let Err(e) = transport.connect(on_message).await {
            warn!("Transport failed to connect: {}", e);
            self.inner.state.send_replace(ConnectionState::Closed);
            return Err(e);
        }

        let announcement = ServerInfoParams::new(&self.inner.info).into_notification()?;
        self.inner.send(&Message::Notification(announcement));
        self.inner.state.send_replace(ConnectionState::Connected);

        info!(
            "MCP server connected: {} v{}",
            self.inner.info.name, self.inner.info.version
        );
        Ok(())
    }

    /// Wait until every request accepted so far has sent its response.
    ///
    /// Requests arriving after this returns are still served; call it once
    /// inbound traffic has stopped, e.g. after stdin reaches EOF.
    pub async fn drain(&self) {
        let tracker = &self.inner.in_flight;
        tracker.close();
        tracker.wait().await;
        tracker.reopen();
        debug!("In-flight requests drained");
    }

    /// Disconnect the transport. Idempotent.
    ///
    /// Responses still being computed are dropped; use [`McpServer::drain`]
    /// first to keep them.
    pub async fn disconnect(&self) -> Result<()> {
        if matches!(
            self.state(),
            ConnectionState::Idle | ConnectionState::Closed
        ) {
            self.inner.state.send_replace(ConnectionState::Closed);
            return Ok(());
        }

        let result = match self.inner.transport.get() {
            Some(transport) => transport.disconnect().await,
            None => Ok(()),
        };
        self.inner.state.send_replace(ConnectionState::Closed);
        info!("MCP server disconnected");
        result
    }

    /// Dispatch one request directly, bypassing any transport.
    pub async fn handle_request(&self, req: JsonRpcRequest) -> JsonRpcResponse {
        self.inner.handle_request(req).await
    }
}

fn parse_params<T: DeserializeOwned>(params: Option<Value>) -> Result<T> {
    let params = params.ok_or_else(|| Error::InvalidParams("Missing params".to_string()))?;
    serde_json::from_value(params).map_err(|e| Error::InvalidParams(e.to_string()))
}

impl Inner {
    /// Process one inbound frame.
    async fn on_frame(self: Arc<Self>, frame: String) {
        // Frames delivered during the handshake wait for the announcement.
        let mut state = self.state.subscribe();
        let ready = state
            .wait_for(|s| matches!(s, ConnectionState::Connected | ConnectionState::Closed))
            .await
            .map(|s| *s);
        if !matches!(ready, Ok(ConnectionState::Connected)) {
            debug!("Connection closed; dropping inbound frame");
            return;
        }

        self.metrics.inc_frames();

        let value: Value = match serde_json::from_str(&frame) {
            Ok(value) => value,
            Err(e) => {
                warn!("Failed to parse frame: {}", e);
                self.send(&Message::Response(JsonRpcResponse::failure(
                    RequestId::Null,
                    error_codes::PARSE_ERROR,
                    "Parse error",
                    Some(Value::String(e.to_string())),
                )));
                return;
            }
        };

        let id = RequestId::of_frame(&value);
        match Message::classify(value) {
            Ok(Message::Request(req)) => {
                let inner = Arc::clone(&self);
                self.in_flight.spawn(async move {
                    let response = inner.handle_request(req).await;
                    inner.send(&Message::Response(response));
                });
            }
            Ok(Message::Notification(notif)) => {
                debug!("Received notification: {}", notif.method);
            }
            Ok(Message::Response(res)) => {
                debug!("Received response for {:?}; no outbound requests are tracked", res.id);
            }
            Err(e) => {
                warn!("Invalid frame: {}", e);
                self.send(&Message::Response(JsonRpcResponse::failure(
                    id,
                    error_codes::INVALID_REQUEST,
                    "Invalid Request",
                    Some(Value::String(e.to_string())),
                )));
            }
        }
    }

    /// Send a message unless the connection is closed.
    fn send(&self, message: &Message) {
        if *self.state.borrow() == ConnectionState::Closed {
            debug!("Connection closed; dropping outbound frame");
            return;
        }
        let Some(transport) = self.transport.get() else {
            debug!("No transport attached; dropping outbound frame");
            return;
        };
        match message.to_frame() {
            Ok(frame) => transport.send(frame),
            Err(e) => warn!("Failed to serialize outbound frame: {}", e),
        }
    }

    /// Handle a JSON-RPC request.
    async fn handle_request(&self, req: JsonRpcRequest) -> JsonRpcResponse {
        debug!("Handling request: {} (id: {:?})", req.method, req.id);
        self.metrics.inc_requests();

        let result = match req.method.as_str() {
            // Resources
            "resource.get" => self.handle_get_resource(req.params).await,
            "resource.list" => self.handle_list_resources(),
            "resource.templates" => self.handle_list_templates(),
            // Tools
            "tool.list" => self.handle_list_tools(),
            "tool.call" => self.handle_call_tool(req.params).await,
            // Prompts
            "prompt.list" => self.handle_list_prompts(),
            "prompt.get" => self.handle_get_prompt(req.params),
            // Unknown
            _ => {
                debug!("Method not found: {}", req.method);
                self.metrics.inc_failed();
                return JsonRpcResponse::failure(
                    req.id,
                    error_codes::METHOD_NOT_FOUND,
                    "Method not found",
                    Some(Value::String(req.method)),
                );
            }
        };

        match result {
            Ok(value) => {
                self.metrics.inc_success();
                JsonRpcResponse::success(req.id, value)
            }
            Err(e) => {
                warn!("Request {} failed: {}", req.method, e);
                self.metrics.inc_failed();
                JsonRpcResponse::failure(
                    req.id,
                    error_codes::INTERNAL_ERROR,
                    "Internal error",
                    Some(Value::String(e.to_string())),
                )
            }
        }
    }

    /// Handle `resource.get`.
    async fn handle_get_resource(&self, params: Option<Value>) -> Result<Value> {
        let params: ReadResourceParams = parse_params(params)?;

        let resolved = self
            .registry
            .resolve_resource(&params.uri)
            .ok_or_else(|| Error::ResourceNotFound(params.uri.clone()))?;
        let url = Url::parse(&params.uri)
            .map_err(|e| Error::InvalidParams(format!("Invalid URI {}: {}", params.uri, e)))?;

        debug!("Reading resource {} via '{}'", params.uri, resolved.entry.name);
        self.metrics.inc_resource_reads();
        let result = resolved
            .entry
            .handler
            .read(&url, &resolved.params)
            .await?;
        Ok(serde_json::to_value(result)?)
    }

    /// Handle `resource.list`.
    fn handle_list_resources(&self) -> Result<Value> {
        let result = ListResourcesResult {
            resources: self.registry.list_resources(),
        };
        Ok(serde_json::to_value(result)?)
    }

    /// Handle `resource.templates`.
    fn handle_list_templates(&self) -> Result<Value> {
        let result = ListResourceTemplatesResult {
            resource_templates: self.registry.list_resource_templates(),
        };
        Ok(serde_json::to_value(result)?)
    }

    /// Handle `tool.list`.
    fn handle_list_tools(&self) -> Result<Value> {
        let result = ListToolsResult {
            tools: self.registry.list_tools(),
        };
        Ok(serde_json::to_value(result)?)
    }

    /// Handle `tool.call`.
    async fn handle_call_tool(&self, params: Option<Value>) -> Result<Value> {
        let params: CallToolParams = parse_params(params)?;

        let handler = self
            .registry
            .find_tool(&params.name)
            .map(|entry| Arc::clone(&entry.handler))
            .ok_or_else(|| Error::ToolNotFound(params.name.clone()))?;

        self.metrics.inc_tool_calls();
        let result = handler.execute(params.params).await?;
        Ok(serde_json::to_value(result)?)
    }

    /// Handle `prompt.list`.
    fn handle_list_prompts(&self) -> Result<Value> {
        let result = ListPromptsResult {
            prompts: self.prompts.list(),
        };
        Ok(serde_json::to_value(result)?)
    }

    /// Handle `prompt.get`.
    fn handle_get_prompt(&self, params: Option<Value>) -> Result<Value> {
        #[derive(serde::Deserialize)]
        struct GetPromptParams {
            name: String,
            #[serde(default)]
            arguments: HashMap<String, String>,
        }

        let params: GetPromptParams = parse_params(params)?;
        let result = self.prompts.get(&params.name, &params.arguments)?;
        Ok(serde_json::to_value(result)?)
    }
}
