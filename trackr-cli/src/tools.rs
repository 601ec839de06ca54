//! Stdio tool-call mode.
//!
//! One JSON request per input line, one JSON response per output line.
//! Requests run concurrently against the shared [`App`], so responses may
//! come back out of order; a request `id` is echoed for correlation.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use trackr_core::{IssueId, ProjectId};

use crate::app::{App, Remote};
use crate::error::{CliError, CliResult};

/// Tool definition.
#[derive(Debug, Clone, Serialize)]
pub struct Tool {
    pub name: String,
    pub description: String,
    pub input_schema: JsonValue,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallToolRequest {
    #[serde(default)]
    pub id: Option<JsonValue>,
    pub name: String,
    #[serde(default)]
    pub arguments: JsonValue,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallToolResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<JsonValue>,
    pub content: Vec<ContentBlock>,
    #[serde(default)]
    pub is_error: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
}

impl CallToolResponse {
    fn text(id: Option<JsonValue>, text: String, is_error: bool) -> Self {
        Self {
            id,
            content: vec![ContentBlock::Text { text }],
            is_error,
        }
    }
}

fn credential_property() -> JsonValue {
    json!({
        "type": "string",
        "description": "Caller credential; its hash keys the caller's last-used project"
    })
}

pub fn available_tools() -> Vec<Tool> {
    vec![
        Tool {
            name: "resolve_member".to_string(),
            description: "Resolve a loose name, login or email to a project member login"
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "project": { "type": "string", "description": "Project id" },
                    "query": { "type": "string", "description": "Free-text member query" },
                    "credential": credential_property()
                },
                "required": ["project", "query"]
            }),
        },
        Tool {
            name: "resolve_value".to_string(),
            description: "Resolve a loose value to an allowed value of a project field".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "project": { "type": "string", "description": "Project id" },
                    "field": { "type": "string", "description": "Field name, e.g. State" },
                    "query": { "type": "string", "description": "Free-text value query" },
                    "credential": credential_property()
                },
                "required": ["project", "field", "query"]
            }),
        },
        Tool {
            name: "rewrite_command".to_string(),
            description: "Canonicalize every field value in a command".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "project": { "type": "string", "description": "Project id" },
                    "command": {
                        "type": "string",
                        "description": "Command such as 'state fix for john'"
                    },
                    "credential": credential_property()
                },
                "required": ["project", "command"]
            }),
        },
        Tool {
            name: "apply_command".to_string(),
            description: "Rewrite a command and apply it to an issue".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "issue": { "type": "string", "description": "Issue id, e.g. DEMO-42" },
                    "command": { "type": "string", "description": "Command to apply" },
                    "project": { "type": "string", "description": "Optional project override" },
                    "credential": credential_property()
                },
                "required": ["issue", "command"]
            }),
        },
        Tool {
            name: "last_project".to_string(),
            description: "The caller's most recently used project".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": { "credential": credential_property() }
            }),
        },
        Tool {
            name: "drop_cache".to_string(),
            description: "Forget cached project metadata (one project, or all)".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "project": {
                        "type": "string",
                        "description": "Project id; omit to drop everything"
                    }
                }
            }),
        },
    ]
}

fn required_str<'a>(args: &'a JsonValue, name: &'static str) -> CliResult<&'a str> {
    args[name].as_str().ok_or(CliError::MissingArgument(name))
}

fn optional_str<'a>(args: &'a JsonValue, name: &str) -> Option<&'a str> {
    args[name].as_str().filter(|s| !s.trim().is_empty())
}

/// Serves tool calls against one shared [`App`].
pub struct ToolServer<C> {
    app: Arc<App<C>>,
}

impl<C> Clone for ToolServer<C> {
    fn clone(&self) -> Self {
        Self {
            app: Arc::clone(&self.app),
        }
    }
}

impl<C: Remote> ToolServer<C> {
    pub fn new(app: Arc<App<C>>) -> Self {
        Self { app }
    }

    pub async fn call(&self, request: CallToolRequest) -> CallToolResponse {
        tracing::debug!(tool = %request.name, "Tool call");
        match self.execute(&request.name, &request.arguments).await {
            Ok(text) => CallToolResponse::text(request.id, text, false),
            Err(e) => {
                tracing::debug!(tool = %request.name, error = %e, "Tool call failed");
                CallToolResponse::text(request.id, e.to_string(), true)
            }
        }
    }

    async fn execute(&self, name: &str, args: &JsonValue) -> CliResult<String> {
        let identity = self.app.identity(optional_str(args, "credential"));
        let identity = identity.as_ref();

        match name {
            "list_tools" => Ok(serde_json::to_string_pretty(&available_tools())?),
            "resolve_member" => {
                let project = ProjectId::new(required_str(args, "project")?);
                let query = required_str(args, "query")?;
                let resolved = self.app.resolve_member(identity, &project, query).await?;
                Ok(resolved.value)
            }
            "resolve_value" => {
                let project = ProjectId::new(required_str(args, "project")?);
                let field = required_str(args, "field")?;
                let query = required_str(args, "query")?;
                let resolved = self.app.resolve_value(identity, &project, field, query).await?;
                Ok(resolved.value)
            }
            "rewrite_command" => {
                let project = ProjectId::new(required_str(args, "project")?);
                let command = required_str(args, "command")?;
                Ok(self.app.rewrite(identity, &project, command).await?)
            }
            "apply_command" => {
                let issue = IssueId::new(required_str(args, "issue")?);
                let command = required_str(args, "command")?;
                let project = optional_str(args, "project").map(ProjectId::new);
                let applied = self.app.apply(identity, &issue, command, project).await?;
                Ok(format!("Applied to {}: {}", applied.issue, applied.command))
            }
            "last_project" => Ok(self
                .app
                .last_project(identity)
                .map(|p| p.to_string())
                .unwrap_or_default()),
            "drop_cache" => {
                let project = optional_str(args, "project").map(ProjectId::new);
                let removed = self.app.drop_cache(project.as_ref()).await;
                Ok(format!("Dropped {} cache entries", removed))
            }
            other => Err(CliError::UnknownTool(other.to_string())),
        }
    }

    async fn handle_line(&self, line: &str) -> String {
        let response = match serde_json::from_str::<CallToolRequest>(line) {
            Ok(request) => self.call(request).await,
            Err(e) => CallToolResponse::text(None, format!("Invalid tool request: {}", e), true),
        };
        serde_json::to_string(&response).unwrap_or_else(|e| {
            let text = format!("Failed to encode response: {}", e);
            json!({"content": [{"type": "text", "text": text}], "is_error": true}).to_string()
        })
    }

    /// Serve requests until `reader` reaches end of input and every
    /// in-flight call has answered.
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> CliResult<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        let mut lines = reader.lines();

        let read = async move {
            while let Some(line) = lines.next_line().await? {
                if line.trim().is_empty() {
                    continue;
                }
                let server = self.clone();
                let tx = tx.clone();
                tokio::spawn(async move {
                    let response = server.handle_line(&line).await;
                    let _ = tx.send(response);
                });
            }
            drop(tx);
            Ok::<(), std::io::Error>(())
        };

        let write = async move {
            while let Some(response) = rx.recv().await {
                writer.write_all(response.as_bytes()).await?;
                writer.write_all(b"\n").await?;
                writer.flush().await?;
            }
            Ok::<(), std::io::Error>(())
        };

        let (read_result, write_result) = tokio::join!(read, write);
        read_result?;
        write_result?;
        tracing::info!("Tool input closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::demo_app;
    use trackr_test_utils::MockTracker;

    fn server() -> (Arc<MockTracker>, ToolServer<Arc<MockTracker>>) {
        let (mock, app) = demo_app();
        (mock, ToolServer::new(Arc::new(app)))
    }

    fn request(name: &str, arguments: JsonValue) -> CallToolRequest {
        CallToolRequest {
            id: None,
            name: name.to_string(),
            arguments,
        }
    }

    fn text(response: &CallToolResponse) -> &str {
        match &response.content[0] {
            ContentBlock::Text { text } => text,
        }
    }

    #[tokio::test]
    async fn test_resolve_tools() {
        let (_, server) = server();

        let member = server
            .call(request("resolve_member", json!({"project": "DEMO", "query": "john.doe"})))
            .await;
        assert!(!member.is_error);
        assert_eq!(text(&member), "john.doe");

        let value = server
            .call(request(
                "resolve_value",
                json!({"project": "DEMO", "field": "State", "query": "prog"}),
            ))
            .await;
        assert_eq!(text(&value), "In Progress");
    }

    #[tokio::test]
    async fn test_resolution_errors_are_tool_errors() {
        let (_, server) = server();
        let response = server
            .call(request("resolve_member", json!({"project": "DEMO", "query": "doe"})))
            .await;
        assert!(response.is_error);
        assert!(text(&response).contains("john.doe (John Doe) [substring]"));
        assert!(text(&response).contains("jane.doe (Jane Doe) [substring]"));
    }

    #[tokio::test]
    async fn test_missing_argument() {
        let (_, server) = server();
        let response = server
            .call(request("rewrite_command", json!({"project": "DEMO"})))
            .await;
        assert!(response.is_error);
        assert_eq!(text(&response), "Missing required argument: command");
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let (_, server) = server();
        let response = server.call(request("delete_everything", JsonValue::Null)).await;
        assert!(response.is_error);
        assert!(text(&response).contains("delete_everything"));
    }

    #[tokio::test]
    async fn test_credential_keys_last_project() {
        let (_, server) = server();
        server
            .call(request(
                "rewrite_command",
                json!({"project": "DEMO", "command": "state fix", "credential": "perm:agent-1"}),
            ))
            .await;

        let mine = server
            .call(request("last_project", json!({"credential": "perm:agent-1"})))
            .await;
        assert_eq!(text(&mine), "DEMO");
        let theirs = server
            .call(request("last_project", json!({"credential": "perm:agent-2"})))
            .await;
        assert_eq!(text(&theirs), "");
    }

    #[tokio::test]
    async fn test_drop_cache_tool() {
        let (mock, server) = server();
        server
            .call(request("resolve_member", json!({"project": "DEMO", "query": "jane"})))
            .await;
        let dropped = server.call(request("drop_cache", json!({}))).await;
        assert_eq!(text(&dropped), "Dropped 1 cache entries");

        server
            .call(request("resolve_member", json!({"project": "DEMO", "query": "jane"})))
            .await;
        assert_eq!(mock.member_calls(), 2);
    }

    #[tokio::test]
    async fn test_list_tools() {
        let (_, server) = server();
        let response = server.call(request("list_tools", JsonValue::Null)).await;
        let tools: JsonValue = serde_json::from_str(text(&response)).unwrap();
        assert_eq!(tools.as_array().unwrap().len(), available_tools().len());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_serve_answers_every_line() {
        let (mock, server) = server();
        let mut input = String::new();
        for i in 0..20 {
            let query = if i % 2 == 0 { "john.doe" } else { "jane" };
            input.push_str(&format!(
                "{}\n",
                json!({
                    "id": i,
                    "name": "resolve_member",
                    "arguments": {"project": "DEMO", "query": query}
                })
            ));
        }
        input.push_str("\nnot json\n");

        let mut output = Vec::new();
        server.serve(input.as_bytes(), &mut output).await.unwrap();

        let responses: Vec<CallToolResponse> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(responses.len(), 21);
        assert_eq!(responses.iter().filter(|r| r.is_error).count(), 1);

        for response in responses.iter().filter(|r| !r.is_error) {
            let i = response.id.as_ref().and_then(JsonValue::as_u64).unwrap();
            let expected = if i % 2 == 0 { "john.doe" } else { "jane.doe" };
            assert_eq!(text(response), expected);
        }
        // Concurrent misses may each sweep, but never more than once per call.
        assert!(mock.member_calls() >= 1 && mock.member_calls() <= 20);
    }
}
