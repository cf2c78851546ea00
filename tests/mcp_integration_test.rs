//! MCP Server Integration Tests
//!
//! These tests spawn the server binary and talk JSON-RPC to it over stdio.
//! None of the calls made here reach the Figma API.

#![allow(deprecated)] // Allow deprecated cargo_bin for now

use assert_cmd::cargo::CommandCargoExt;
use assert_cmd::Command as AssertCommand;
use predicates::prelude::*;
use serde_json::{json, Value};
use std::io::{BufRead, BufReader, Write};
use std::collections::HashMap;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::Duration;

const BIN: &str = "figma-context-mcp";

/// MCP test client that talks to the server over stdio
struct McpTestClient {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    request_id: i64,
}

impl McpTestClient {
    /// Spawn the server and consume its announcement
    fn spawn() -> Result<(Self, Value), Box<dyn std::error::Error>> {
        let mut child = Command::cargo_bin(BIN)?
            .arg("--transport")
            .arg("stdio")
            .env_remove("FIGMA_ACCESS_TOKEN")
            .env_remove("FIGMA_OAUTH_TOKEN")
            .env_remove("FIGMA_TEAM_ID")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;

        let stdin = child.stdin.take().expect("Failed to get stdin");
        let stdout = BufReader::new(child.stdout.take().expect("Failed to get stdout"));

        let mut client = Self {
            child,
            stdin,
            stdout,
            request_id: 0,
        };
        let announcement = client.read_frame()?;
        Ok((client, announcement))
    }

    fn read_frame(&mut self) -> Result<Value, Box<dyn std::error::Error>> {
        let mut line = String::new();
        self.stdout.read_line(&mut line)?;
        Ok(serde_json::from_str(&line)?)
    }

    fn send_raw(&mut self, frame: &str) -> Result<Value, Box<dyn std::error::Error>> {
        writeln!(self.stdin, "{}", frame)?;
        self.stdin.flush()?;
        self.read_frame()
    }

    /// Send a JSON-RPC request and get the response
    fn request(
        &mut self,
        method: &str,
        params: Value,
    ) -> Result<Value, Box<dyn std::error::Error>> {
        self.request_id += 1;
        let request = json!({
            "jsonrpc": "2.0",
            "id": self.request_id,
            "method": method,
            "params": params
        });
        self.send_raw(&serde_json::to_string(&request)?)
    }

    fn call_tool(
        &mut self,
        name: &str,
        params: Value,
    ) -> Result<Value, Box<dyn std::error::Error>> {
        self.request("tool.call", json!({ "name": name, "params": params }))
    }
}

impl Drop for McpTestClient {
    fn drop(&mut self) {
        let _ = self.child.kill();
    }
}

fn tool_text(response: &Value) -> Value {
    let text = response["result"]["content"][0]["text"]
        .as_str()
        .expect("Expected text content");
    serde_json::from_str(text).expect("Expected JSON text")
}

// ============================================================================
// Integration Tests
// ============================================================================

#[test]
fn test_binary_help() {
    AssertCommand::cargo_bin(BIN)
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("MCP server"))
        .stdout(predicate::str::contains("--transport"));
}

#[test]
fn test_binary_version() {
    AssertCommand::cargo_bin(BIN)
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_rejects_unknown_transport() {
    AssertCommand::cargo_bin(BIN)
        .unwrap()
        .args(["--transport", "carrier-pigeon"])
        .assert()
        .failure();
}

#[test]
fn test_rejects_invalid_api_url() {
    AssertCommand::cargo_bin(BIN)
        .unwrap()
        .arg("--api-url")
        .arg("not a url")
        .write_stdin("")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid API URL"));
}

#[test]
fn test_server_info_is_first_frame() {
    let (_client, announcement) = McpTestClient::spawn().expect("Failed to spawn MCP server");

    assert_eq!(announcement["jsonrpc"], "2.0");
    assert_eq!(announcement["method"], "server.info");
    assert!(announcement.get("id").is_none());
    assert_eq!(announcement["params"]["name"], "figma-context-mcp");
    assert_eq!(announcement["params"]["version"], env!("CARGO_PKG_VERSION"));
}

#[test]
fn test_unknown_method() {
    let (mut client, _) = McpTestClient::spawn().expect("Failed to spawn MCP server");

    let response = client
        .send_raw(r#"{"jsonrpc":"2.0","id":7,"method":"foo"}"#)
        .expect("Failed to send");
    assert_eq!(response["id"], 7);
    assert_eq!(response["error"]["code"], -32601);
    assert_eq!(response["error"]["data"], "foo");
    assert!(response.get("result").is_none());
}

#[test]
fn test_malformed_frames() {
    let (mut client, _) = McpTestClient::spawn().expect("Failed to spawn MCP server");

    let response = client.send_raw("{not json").expect("Failed to send");
    assert_eq!(response["error"]["code"], -32700);
    assert!(response["id"].is_null());

    let response = client.send_raw("[1, 2, 3]").expect("Failed to send");
    assert_eq!(response["error"]["code"], -32600);
    assert!(response["id"].is_null());

    // The connection survives both.
    let response = client.request("tool.list", json!({})).expect("Failed to list tools");
    assert!(response.get("result").is_some());
}

#[test]
fn test_piped_input_is_answered_before_exit() {
    let input = [
        json!({"jsonrpc": "2.0", "id": 1, "method": "tool.list"}).to_string(),
        "{not json".to_string(),
        json!({"jsonrpc": "2.0", "id": "two", "method": "resource.templates"}).to_string(),
        json!({"jsonrpc": "2.0", "method": "client.ready"}).to_string(),
        json!({"jsonrpc": "2.0", "id": 3, "method": "prompt.list"}).to_string(),
        json!({
            "jsonrpc": "2.0", "id": 4, "method": "tool.call",
            "params": {"name": "validate_context", "params": {"context": {}}}
        })
        .to_string(),
    ]
    .join("\n")
        + "\n";

    // Exiting right after EOF used to race the stdout writer, so repeat.
    for _ in 0..5 {
        let output = AssertCommand::cargo_bin(BIN)
            .unwrap()
            .arg("--transport")
            .arg("stdio")
            .env_remove("FIGMA_ACCESS_TOKEN")
            .env_remove("FIGMA_OAUTH_TOKEN")
            .env_remove("FIGMA_TEAM_ID")
            .write_stdin(input.clone())
            .timeout(Duration::from_secs(30))
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();

        let frames: Vec<Value> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).expect("stdout carries only frames"))
            .collect();
        assert_eq!(frames.len(), 6, "frames: {:?}", frames);
        assert_eq!(frames[0]["method"], "server.info");

        let replies: HashMap<String, &Value> = frames[1..]
            .iter()
            .map(|frame| (frame["id"].to_string(), frame))
            .collect();
        assert_eq!(replies.len(), 5);
        assert!(replies["1"]["result"]["tools"].is_array());
        assert!(replies["\"two\""]["result"]["resourceTemplates"].is_array());
        assert!(replies["3"]["result"]["prompts"].is_array());
        assert_eq!(tool_text(replies["4"])["valid"], false);
        assert_eq!(replies["null"]["error"]["code"], -32700);
    }
}

#[test]
fn test_list_surface() {
    let (mut client, _) = McpTestClient::spawn().expect("Failed to spawn MCP server");

    let response = client.request("tool.list", json!({})).expect("Failed to list tools");
    let names: Vec<&str> = response["result"]["tools"]
        .as_array()
        .expect("tools should be array")
        .iter()
        .filter_map(|t| t["name"].as_str())
        .collect();
    assert!(names.contains(&"get_file_context"));
    assert!(names.contains(&"validate_context"));

    let response = client
        .request("resource.list", json!({}))
        .expect("Failed to list resources");
    let uris: Vec<&str> = response["result"]["resources"]
        .as_array()
        .expect("resources should be array")
        .iter()
        .filter_map(|r| r["uriTemplate"].as_str())
        .collect();
    assert!(uris.contains(&"figma://file/{fileKey}"));
    assert!(uris.contains(&"figma://team/{teamId}/components"));
    assert!(!uris.iter().any(|uri| uri.contains("/node/")));

    let response = client
        .request("prompt.list", json!({}))
        .expect("Failed to list prompts");
    assert!(response["result"]["prompts"].as_array().is_some());
}

#[test]
fn test_validate_context_tool() {
    let (mut client, _) = McpTestClient::spawn().expect("Failed to spawn MCP server");

    let context = json!({
        "metadata": {
            "version": "1.0.0",
            "source": {"type": "figma", "fileKey": "abc", "fileName": "Demo"},
            "timestamp": "2024-01-01T00:00:00Z",
            "generator": "test"
        },
        "design": {
            "structure": {
                "root": "0:0",
                "hierarchy": [
                    {"id": "0:0", "name": "Document", "type": "DOCUMENT", "children": ["1:1"]},
                    {"id": "1:1", "name": "Frame", "type": "FRAME", "parent": "0:0", "children": []}
                ]
            },
            "elements": [
                {"id": "0:0", "name": "Document", "type": "DOCUMENT"},
                {"id": "1:1", "name": "Frame", "type": "FRAME"}
            ],
            "styles": {}
        }
    });

    let response = client
        .call_tool("validate_context", json!({ "context": context }))
        .expect("Failed to call validate_context");
    let report = tool_text(&response);
    assert_eq!(report["valid"], true, "unexpected report: {}", report);

    let mut broken = context.clone();
    broken["design"]["structure"]["hierarchy"][1]["parent"] = json!("9:9");
    let response = client
        .call_tool("validate_context", json!({ "context": broken }))
        .expect("Failed to call validate_context");
    let report = tool_text(&response);
    assert_eq!(report["valid"], false);
    assert!(report["errors"]
        .as_array()
        .unwrap()
        .iter()
        .any(|e| e == "Hierarchy node 1:1 references missing parent 9:9"));
}

#[test]
fn test_invalid_tool() {
    let (mut client, _) = McpTestClient::spawn().expect("Failed to spawn MCP server");

    let response = client
        .call_tool("nonexistent_tool", json!({}))
        .expect("Failed to call tool");
    assert_eq!(response["error"]["code"], -32603);
    assert_eq!(response["error"]["message"], "Internal error");
}

#[test]
fn test_upstream_call_without_credential() {
    let (mut client, _) = McpTestClient::spawn().expect("Failed to spawn MCP server");

    let response = client
        .request("resource.get", json!({ "uri": "figma://file/abc" }))
        .expect("Failed to read resource");
    assert_eq!(response["error"]["code"], -32603);
    assert!(response["error"]["data"].is_string());
}

#[test]
fn test_get_prompt() {
    let (mut client, _) = McpTestClient::spawn().expect("Failed to spawn MCP server");

    let response = client
        .request(
            "prompt.get",
            json!({ "name": "describe_design", "arguments": { "fileKey": "abc" } }),
        )
        .expect("Failed to get prompt");
    let text = response["result"]["messages"][0]["content"]["text"]
        .as_str()
        .expect("Expected prompt text");
    assert!(text.contains("abc"));
}
