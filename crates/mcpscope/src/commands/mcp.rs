//! MCP exploration command handlers.

use crate::context::App;
use anyhow::{anyhow, bail, Context};
use mcpscope_auth::{TokenMonitor, TokenSet};
use mcpscope_mcp::{McpFailure, McpResponse, McpSessionClient, McpTool, ToolCallResult};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::debug;

fn failure(e: McpFailure) -> anyhow::Error {
    match e.status {
        Some(status) => anyhow!("{} (status {status}, {} ms)", e.message, e.elapsed_ms),
        None => anyhow!("{} ({} ms)", e.message, e.elapsed_ms),
    }
}

async fn connect(app: &App, endpoint: &str) -> anyhow::Result<McpSessionClient> {
    let client = app.mcp_client()?;
    let response = client
        .initialize_session(endpoint)
        .await
        .map_err(failure)
        .with_context(|| format!("Failed to initialize session with {endpoint}"))?;

    if let Some(server) = mcpscope_mcp::ServerInfo::from_response(&response.data) {
        debug!(server = %server.name, version = ?server.version, "Connected");
    }
    Ok(client)
}

/// List the tools an endpoint offers.
pub async fn tools(app: &App, endpoint: Option<String>, json: bool) -> anyhow::Result<()> {
    let endpoint = app.endpoint(endpoint)?;
    let client = connect(app, &endpoint).await?;
    let tools = client.discover_tools(&endpoint).await.map_err(failure)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&tools)?);
    } else {
        print_tools(&tools);
    }
    Ok(())
}

/// Call one tool and print its result.
pub async fn call(
    app: &App,
    endpoint: Option<String>,
    tool: &str,
    args: Option<String>,
) -> anyhow::Result<()> {
    let endpoint = app.endpoint(endpoint)?;
    let arguments = parse_arguments(args.as_deref())?;
    let client = connect(app, &endpoint).await?;

    let response = client
        .call_tool(&endpoint, tool, arguments)
        .await
        .map_err(failure)?;
    if print_call_result(&response) {
        bail!("Tool '{tool}' reported an error");
    }
    Ok(())
}

/// Interactive session against one endpoint.
pub async fn shell(app: &App, endpoint: Option<String>) -> anyhow::Result<()> {
    let endpoint = app.endpoint(endpoint)?;

    let monitor = if can_refresh(app.store.get_tokens().await.as_ref()) {
        app.config.oauth.clone().map(|config| {
            TokenMonitor::spawn(app.flow.clone(), config, app.config.monitor_settings())
        })
    } else {
        None
    };

    let client = connect(app, &endpoint).await?;
    println!("Connected to {endpoint}. Type `help` for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    loop {
        stdout.write_all(b"mcp> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        match ShellCommand::parse(&line) {
            Ok(ShellCommand::Empty) => {}
            Ok(ShellCommand::Quit) => break,
            Ok(ShellCommand::Help) => print_shell_help(),
            Ok(ShellCommand::Session) => match client.session_id(&endpoint).await {
                Some(id) => println!("Session: {id}"),
                None => println!("No session id assigned."),
            },
            Ok(ShellCommand::Tools) => match client.discover_tools(&endpoint).await {
                Ok(tools) => print_tools(&tools),
                Err(e) => eprintln!("Error: {}", failure(e)),
            },
            Ok(ShellCommand::Call { tool, arguments }) => {
                match client.call_tool(&endpoint, &tool, arguments).await {
                    Ok(response) => {
                        print_call_result(&response);
                    }
                    Err(e) => eprintln!("Error: {}", failure(e)),
                }
            }
            Err(e) => eprintln!("Error: {e}"),
        }
    }

    if let Some(monitor) = monitor {
        monitor.shutdown().await;
    }
    Ok(())
}

/// The monitor is worth running for any token set it can refresh, expired
/// or not.
fn can_refresh(tokens: Option<&TokenSet>) -> bool {
    tokens.is_some_and(|t| t.refresh_token.is_some())
}

#[derive(Debug, PartialEq)]
enum ShellCommand {
    Empty,
    Quit,
    Help,
    Session,
    Tools,
    Call { tool: String, arguments: Value },
}

impl ShellCommand {
    fn parse(line: &str) -> anyhow::Result<Self> {
        let line = line.trim();
        let (head, rest) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(h, r)| (h, r.trim()));

        Ok(match head {
            "" => Self::Empty,
            "quit" | "exit" => Self::Quit,
            "help" | "?" => Self::Help,
            "session" => Self::Session,
            "tools" => Self::Tools,
            "call" => {
                let (tool, args) = rest
                    .split_once(char::is_whitespace)
                    .map_or((rest, None), |(t, a)| (t, Some(a.trim())));
                if tool.is_empty() {
                    bail!("usage: call <tool> [json arguments]");
                }
                Self::Call {
                    tool: tool.to_string(),
                    arguments: parse_arguments(args)?,
                }
            }
            other => bail!("unknown command '{other}', try `help`"),
        })
    }
}

fn print_shell_help() {
    println!("Commands:");
    println!("  tools                   list available tools");
    println!("  call <tool> [json]      call a tool, arguments default to {{}}");
    println!("  session                 show the session id");
    println!("  quit                    leave the shell");
}

/// Arguments default to an empty object and must be a JSON object.
fn parse_arguments(args: Option<&str>) -> anyhow::Result<Value> {
    let Some(raw) = args.map(str::trim).filter(|a| !a.is_empty()) else {
        return Ok(Value::Object(serde_json::Map::new()));
    };
    let value: Value = serde_json::from_str(raw).context("Arguments must be valid JSON")?;
    if !value.is_object() {
        bail!("Arguments must be a JSON object");
    }
    Ok(value)
}

fn print_tools(tools: &[McpTool]) {
    if tools.is_empty() {
        println!("No tools available.");
        return;
    }

    for tool in tools {
        println!("{}", tool.name);
        if !tool.description.is_empty() {
            println!("  {}", tool.description.lines().next().unwrap_or_default());
        }
        for (name, property) in &tool.input_schema.properties {
            let marker = if tool.input_schema.is_required(name) { "*" } else { " " };
            println!(
                "   {marker} {name}: {}{}",
                property.property_type.as_deref().unwrap_or("any"),
                property
                    .description
                    .as_deref()
                    .map(|d| format!("  {d}"))
                    .unwrap_or_default()
            );
        }
    }
}

/// Print a `tools/call` response. Returns whether the tool flagged an error.
fn print_call_result(response: &McpResponse) -> bool {
    if let Some(error) = mcpscope_mcp::JsonRpcError::from_response(&response.data) {
        eprintln!("JSON-RPC error {}: {}", error.code, error.message);
        return true;
    }

    match ToolCallResult::from_response(&response.data) {
        Some(result) if !result.text().is_empty() => {
            println!("{}", result.text());
            eprintln!("({} ms)", response.elapsed_ms);
            result.is_error
        }
        Some(result) => {
            println!(
                "{}",
                serde_json::to_string_pretty(&result.content).unwrap_or_default()
            );
            result.is_error
        }
        None => {
            println!(
                "{}",
                serde_json::to_string_pretty(&response.data).unwrap_or_default()
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_arguments() {
        assert_eq!(parse_arguments(None).unwrap(), json!({}));
        assert_eq!(parse_arguments(Some("  ")).unwrap(), json!({}));
        assert_eq!(parse_arguments(Some(r#"{"x": 1}"#)).unwrap(), json!({"x": 1}));
        assert!(parse_arguments(Some("[1, 2]")).is_err());
        assert!(parse_arguments(Some("{oops")).is_err());
    }

    #[test]
    fn test_shell_command_parse() {
        assert_eq!(ShellCommand::parse("").unwrap(), ShellCommand::Empty);
        assert_eq!(ShellCommand::parse("  exit ").unwrap(), ShellCommand::Quit);
        assert_eq!(ShellCommand::parse("tools").unwrap(), ShellCommand::Tools);
        assert_eq!(
            ShellCommand::parse("call echo").unwrap(),
            ShellCommand::Call {
                tool: "echo".to_string(),
                arguments: json!({})
            }
        );
        assert_eq!(
            ShellCommand::parse(r#"call echo   {"x": 1}"#).unwrap(),
            ShellCommand::Call {
                tool: "echo".to_string(),
                arguments: json!({"x": 1})
            }
        );
        assert!(ShellCommand::parse("call").is_err());
        assert!(ShellCommand::parse("dance").is_err());
    }

    #[test]
    fn test_monitor_runs_for_expired_refreshable_tokens() {
        let expired = TokenSet {
            access_token: "at".to_string(),
            refresh_token: Some("rt".to_string()),
            id_token: None,
            expires_at: chrono::Utc::now() - chrono::Duration::minutes(10),
            token_type: "Bearer".to_string(),
            user_display: None,
        };
        assert!(can_refresh(Some(&expired)));

        let no_refresh = TokenSet {
            refresh_token: None,
            ..expired
        };
        assert!(!can_refresh(Some(&no_refresh)));
        assert!(!can_refresh(None));
    }

    #[test]
    fn test_failure_message() {
        let e = McpFailure {
            message: "upstream down".to_string(),
            status: Some(502),
            elapsed_ms: 12,
        };
        assert_eq!(failure(e).to_string(), "upstream down (status 502, 12 ms)");
    }
}
