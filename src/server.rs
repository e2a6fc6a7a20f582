//! MCP stdio 服务：按行读写 JSON-RPC 2.0，只提供一个 `search` 工具
//!
//! 请求逐个处理，上一个搜索返回之前不会读取下一条请求。

use anyhow::{Context, Result};
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, error, info, warn};

use crate::config::SERVER_NAME;
use crate::format::format_outcome;
use crate::provider::FileSearcher;
use crate::query::Platform;

const DEFAULT_PROTOCOL_VERSION: &str = "2024-11-05";
const TOOL_NAME: &str = "search";

const PARSE_ERROR: i64 = -32700;
const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_PARAMS: i64 = -32602;

pub struct McpServer {
    searcher: &'static dyn FileSearcher,
}

impl McpServer {
    pub fn new(searcher: &'static dyn FileSearcher) -> Self {
        Self { searcher }
    }

    pub async fn run(&self) -> Result<()> {
        info!("MCP 服务启动，后端: {}", self.searcher.name());
        self.run_on(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
            .await
    }

    pub async fn run_on<R, W>(&self, reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await.context("读取 stdin 失败")? {
            if line.trim().is_empty() {
                continue;
            }
            let response = match serde_json::from_str::<Value>(&line) {
                Ok(message) => self.handle(message).await,
                Err(e) => {
                    warn!("无法解析的请求: {}", e);
                    Some(error_response(Value::Null, PARSE_ERROR, &format!("Parse error: {}", e)))
                }
            };
            if let Some(response) = response {
                let mut bytes = serde_json::to_vec(&response)?;
                bytes.push(b'\n');
                writer.write_all(&bytes).await.context("写入 stdout 失败")?;
                writer.flush().await?;
            }
        }
        info!("stdin 已关闭，MCP 服务退出");
        Ok(())
    }

    /// 处理一条 JSON-RPC 消息；通知（无 id）不返回响应
    pub async fn handle(&self, message: Value) -> Option<Value> {
        let method = message.get("method").and_then(Value::as_str).unwrap_or_default();
        let params = message.get("params").cloned().unwrap_or(Value::Null);
        let id = match message.get("id") {
            Some(id) if !id.is_null() => id.clone(),
            _ => {
                debug!("收到通知: {}", method);
                return None;
            }
        };
        debug!("收到请求: {} (id={})", method, id);

        let result = match method {
            "initialize" => Ok(self.initialize(&params)),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({ "tools": [tool_definition(self.searcher)] })),
            "tools/call" => self.call_tool(&params).await,
            "resources/list" => Ok(json!({ "resources": [] })),
            "resources/templates/list" => Ok(json!({ "resourceTemplates": [] })),
            "prompts/list" => Ok(json!({ "prompts": [] })),
            other => Err((METHOD_NOT_FOUND, format!("Method not found: {}", other))),
        };

        Some(match result {
            Ok(result) => json!({ "jsonrpc": "2.0", "id": id, "result": result }),
            Err((code, msg)) => error_response(id, code, &msg),
        })
    }

    fn initialize(&self, params: &Value) -> Value {
        let version = params
            .get("protocolVersion")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_PROTOCOL_VERSION);
        json!({
            "protocolVersion": version,
            "capabilities": { "tools": { "listChanged": false } },
            "serverInfo": { "name": SERVER_NAME, "version": env!("CARGO_PKG_VERSION") }
        })
    }

    async fn call_tool(&self, params: &Value) -> Result<Value, (i64, String)> {
        let name = params.get("name").and_then(Value::as_str).unwrap_or_default();
        if name != TOOL_NAME {
            return Err((INVALID_PARAMS, format!("Unknown tool: {}", name)));
        }
        let arguments = match params.get("arguments") {
            Some(v) if !v.is_null() => v.clone(),
            _ => json!({}),
        };

        // 搜索是阻塞调用（子进程 / SDK），放到阻塞线程池执行
        let searcher = self.searcher;
        let outcome = tokio::task::spawn_blocking(move || crate::search_with(searcher, &arguments)).await;

        let (text, is_error) = match outcome {
            Ok(Ok(outcome)) => {
                info!(
                    "搜索完成: {} 条结果 (共 {} 条匹配, {}ms)",
                    outcome.entries.len(),
                    outcome.total_found,
                    outcome.elapsed_ms
                );
                (format_outcome(&outcome), false)
            }
            Ok(Err(e)) => {
                warn!("搜索失败: {}", e);
                (format!("Search failed: {}", e), true)
            }
            Err(e) => {
                error!("搜索线程异常退出: {}", e);
                (format!("Search failed: {}", e), true)
            }
        };

        Ok(json!({
            "content": [{ "type": "text", "text": text }],
            "isError": is_error
        }))
    }
}

fn error_response(id: Value, code: i64, message: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": { "code": code, "message": message }
    })
}

fn syntax_guide(platform: Platform) -> &'static str {
    match platform {
        Platform::Windows => {
            "Everything Search Syntax:\n\
- Wildcards: * matches any characters, ? matches one character\n\
- Operators: space = AND, | = OR, ! = NOT, < > = grouping, \"\" = exact phrase\n\
- Functions: ext:pdf;docx  size:>1mb  dm:today  parent:C:\\Users  folder:  file:\n\
- Options: match_path, match_case, match_whole_word, match_regex, sort_by (e.g. SIZE_DESC, DATE_MODIFIED_DESC)"
        }
        Platform::Linux => {
            "Linux Locate Search Syntax:\n\
- Simple pattern: filename\n\
- Wildcards: * matches any characters, ? matches one character, [] matches a class\n\
- Case-insensitive by default (-i) unless match_case is set\n\
- Regular expressions: match_regex or linux_params.regex_search (-r)\n\
- linux_params: existing_files (-e, on by default when linux_params is given), count_only (-c)\n\
- Examples: \"*.pdf\", \"/home/.*\\.txt$\" with match_regex"
        }
        Platform::MacOs => {
            "macOS Spotlight (mdfind) Search Syntax:\n\
- Simple text: matched against file names (-name) unless match_path is set\n\
- Metadata queries: kMDItemKind == 'PDF Document', kMDItemFSSize > 1000000\n\
- mac_params: search_directory (-onlyin), literal_query (-literal), interpret_query (-interpret)"
        }
    }
}

fn platform_params_schema(platform: Platform) -> Value {
    match platform {
        Platform::Windows => json!({
            "type": "object",
            "description": "Everything-specific overrides",
            "properties": {
                "match_path": { "type": "boolean" },
                "match_case": { "type": "boolean" },
                "match_whole_word": { "type": "boolean" },
                "match_regex": { "type": "boolean" },
                "sort_by": { "type": ["integer", "string"] }
            }
        }),
        Platform::Linux => json!({
            "type": "object",
            "description": "locate-specific parameters",
            "properties": {
                "ignore_case": { "type": "boolean", "description": "Ignore case distinctions (-i), defaults to !match_case" },
                "regex_search": { "type": "boolean", "default": false, "description": "Use regular expressions (-r)" },
                "existing_files": { "type": "boolean", "default": true, "description": "Only output existing files (-e)" },
                "count_only": { "type": "boolean", "default": false, "description": "Only display count of matches (-c)" }
            }
        }),
        Platform::MacOs => json!({
            "type": "object",
            "description": "mdfind-specific parameters",
            "properties": {
                "search_directory": { "type": "string", "description": "Limit search to a directory (-onlyin)" },
                "literal_query": { "type": "boolean", "description": "Treat query as literal string (-literal)" },
                "interpret_query": { "type": "boolean", "description": "Interpret query as typed in Spotlight (-interpret)" },
                "live_updates": { "type": "boolean", "description": "Accepted for compatibility, ignored" }
            }
        }),
    }
}

pub fn tool_definition(searcher: &dyn FileSearcher) -> Value {
    let platform = searcher.platform();
    let mut properties = json!({
        "query": { "type": "string", "description": "Search query string. See the syntax guide in the tool description." },
        "max_results": {
            "type": "integer", "minimum": 1, "maximum": 1000, "default": 100,
            "description": "Maximum number of results to return (1-1000)"
        },
        "match_path": { "type": "boolean", "default": false, "description": "Match against full path instead of filename only" },
        "match_case": { "type": "boolean", "default": false, "description": "Enable case-sensitive search" },
        "match_whole_word": { "type": "boolean", "default": false, "description": "Match whole words only" },
        "match_regex": { "type": "boolean", "default": false, "description": "Enable regex search" },
        "sort_by": {
            "type": ["integer", "string"], "default": 1,
            "description": "Sort order, Everything code (1-26) or name such as NAME_ASCENDING, SIZE_DESC"
        }
    });
    if let Some(map) = properties.as_object_mut() {
        if platform == Platform::Windows {
            map.insert(
                "fields".into(),
                json!({
                    "type": "array", "items": { "type": "string" },
                    "description": "Fields to request: filename, path, extension, size, created, modified, accessed, attributes, run_count, highlighted_filename, highlighted_path"
                }),
            );
        }
        map.insert(platform.params_key().into(), platform_params_schema(platform));
    }

    json!({
        "name": TOOL_NAME,
        "description": format!(
            "Universal file search tool for {}\n\nCurrent Implementation:\nUsing {}\n\nSearch Syntax Guide:\n{}",
            std::env::consts::OS,
            searcher.name(),
            syntax_guide(platform)
        ),
        "inputSchema": {
            "type": "object",
            "properties": properties,
            "required": ["query"]
        }
    })
}
