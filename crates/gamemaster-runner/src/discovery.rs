//! Content-tool discovery over MCP streamable HTTP.
//!
//! At startup the orchestrator asks the tool server which generation tools
//! it offers. The handshake is three JSON-RPC messages posted to one URL:
//!
//! 1. `initialize` -- the server answers with its capabilities and may
//!    assign a session through the `Mcp-Session-Id` response header.
//! 2. `notifications/initialized` -- a notification, no response body.
//! 3. `tools/list` -- repeated while the server returns a `nextCursor`.
//!
//! Responses arrive either as plain JSON or as a server-sent event stream
//! whose `data:` lines carry the JSON-RPC message.

use std::time::Duration;

use gamemaster_types::{ToolCatalog, ToolDescriptor};
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::error::RunnerError;

/// Protocol revision announced in `initialize`.
pub const PROTOCOL_VERSION: &str = "2025-03-26";

/// Header carrying the server-assigned session.
const SESSION_HEADER: &str = "Mcp-Session-Id";

/// Upper bound on `tools/list` pages, in case a server keeps returning a
/// cursor.
const MAX_PAGES: u32 = 32;

/// Client for the discovery handshake.
#[derive(Debug)]
pub struct ToolDiscovery {
    client: reqwest::Client,
    url: String,
}

impl ToolDiscovery {
    /// Create a discovery client for `url`, bounding each request by
    /// `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Discovery`] if the HTTP client cannot be built.
    pub fn new(url: &str, timeout: Duration) -> Result<Self, RunnerError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RunnerError::Discovery(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            url: url.to_owned(),
        })
    }

    /// Run the handshake and return every advertised tool.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Discovery`] if any step of the handshake
    /// fails or the server answers with a JSON-RPC error.
    pub async fn discover(&self) -> Result<ToolCatalog, RunnerError> {
        let (init, session) = self
            .request(
                1,
                "initialize",
                json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": {},
                    "clientInfo": {
                        "name": "gamemaster",
                        "version": env!("CARGO_PKG_VERSION"),
                    },
                }),
                None,
            )
            .await?;

        info!(
            server = init.pointer("/serverInfo/name").and_then(serde_json::Value::as_str),
            protocol = init.get("protocolVersion").and_then(serde_json::Value::as_str),
            session = session.as_deref(),
            "Tool server initialized"
        );

        self.notify("notifications/initialized", session.as_deref())
            .await?;

        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;
        let mut id: u64 = 2;
        for _ in 0..MAX_PAGES {
            let params = cursor
                .as_ref()
                .map_or_else(|| json!({}), |c| json!({ "cursor": c }));
            let (page, _) = self
                .request(id, "tools/list", params, session.as_deref())
                .await?;
            tools.extend(parse_tools(&page)?);

            cursor = page
                .get("nextCursor")
                .and_then(Value::as_str)
                .map(ToOwned::to_owned);
            if cursor.is_none() {
                break;
            }
            id = id.saturating_add(1);
        }

        for tool in &tools {
            info!(tool = %tool.name, description = %tool.description, "Discovered content tool");
        }
        Ok(ToolCatalog::new(tools))
    }

    /// Send a JSON-RPC request and return its `result` plus any session id.
    async fn request(
        &self,
        id: u64,
        method: &str,
        params: Value,
        session: Option<&str>,
    ) -> Result<(Value, Option<String>), RunnerError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let response = self
            .post(&body, session)
            .send()
            .await
            .map_err(|e| RunnerError::Discovery(format!("{method} request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RunnerError::Discovery(format!("{method} returned {status}")));
        }

        let assigned = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(ToOwned::to_owned)
            .or_else(|| session.map(ToOwned::to_owned));

        let is_stream = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("text/event-stream"));

        let text = response
            .text()
            .await
            .map_err(|e| RunnerError::Discovery(format!("{method} body unreadable: {e}")))?;
        debug!(method, body = %text, "Tool server response");

        let message = if is_stream {
            sse_messages(&text)
                .into_iter()
                .find(|m| m.get("id").and_then(Value::as_u64) == Some(id))
                .ok_or_else(|| {
                    RunnerError::Discovery(format!("{method}: no response in event stream"))
                })?
        } else {
            serde_json::from_str(&text)?
        };

        Ok((rpc_result(method, message)?, assigned))
    }

    /// Send a JSON-RPC notification; the server owes no response body.
    async fn notify(&self, method: &str, session: Option<&str>) -> Result<(), RunnerError> {
        let body = json!({ "jsonrpc": "2.0", "method": method });
        let response = self
            .post(&body, session)
            .send()
            .await
            .map_err(|e| RunnerError::Discovery(format!("{method} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RunnerError::Discovery(format!("{method} returned {status}")));
        }
        Ok(())
    }

    fn post(&self, body: &Value, session: Option<&str>) -> reqwest::RequestBuilder {
        let request = self
            .client
            .post(&self.url)
            .header(reqwest::header::ACCEPT, "application/json, text/event-stream")
            .header("MCP-Protocol-Version", PROTOCOL_VERSION)
            .json(body);
        match session {
            Some(id) => request.header(SESSION_HEADER, id),
            None => request,
        }
    }
}

/// Unwrap a JSON-RPC response into its `result`.
fn rpc_result(method: &str, mut message: Value) -> Result<Value, RunnerError> {
    if let Some(error) = message.get("error") {
        let code = error.get("code").and_then(Value::as_i64).unwrap_or_default();
        let text = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        return Err(RunnerError::Discovery(format!("{method} error {code}: {text}")));
    }
    message
        .get_mut("result")
        .map(Value::take)
        .ok_or_else(|| RunnerError::Discovery(format!("{method}: response has no result")))
}

/// Parse the `tools` array of a `tools/list` result.
fn parse_tools(result: &Value) -> Result<Vec<ToolDescriptor>, RunnerError> {
    let tools = result
        .get("tools")
        .cloned()
        .ok_or_else(|| RunnerError::Discovery("tools/list result has no tools".to_owned()))?;
    Ok(serde_json::from_value(tools)?)
}

/// Decode every JSON message carried by an event-stream body.
///
/// Events are separated by blank lines; multiple `data:` lines within one
/// event are joined with newlines. Events whose data is not JSON are
/// skipped.
fn sse_messages(body: &str) -> Vec<Value> {
    let mut messages = Vec::new();
    let mut data = String::new();

    let mut flush = |data: &mut String| {
        if !data.is_empty() {
            if let Ok(value) = serde_json::from_str::<Value>(data) {
                messages.push(value);
            }
            data.clear();
        }
    };

    for line in body.lines() {
        if line.is_empty() {
            flush(&mut data);
        } else if let Some(rest) = line.strip_prefix("data:") {
            if !data.is_empty() {
                data.push('\n');
            }
            data.push_str(rest.strip_prefix(' ').unwrap_or(rest));
        }
    }
    flush(&mut data);

    messages
}
