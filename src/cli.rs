use clap::{Args, Parser, Subcommand};
use serde_json::{json, Map, Value};

use crate::config::DEFAULT_MAX_RESULTS;
use crate::provider::FileSearcher;

#[derive(Parser, Debug)]
#[command(author, version, about = "StarSearch 通用文件搜索（MCP 服务 / AI调用专用）", long_about = None)]
pub struct Cli {
    /// 不带子命令时以 MCP stdio 服务运行
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// 以 MCP stdio 服务运行（默认）
    Serve,
    /// 直接执行一次搜索，输出 JSON
    Search(SearchArgs),
}

#[derive(Args, Debug, Clone)]
pub struct SearchArgs {
    /// 搜索关键词
    #[arg(short = 'q', long = "query", required = true)]
    pub query: String,

    /// 最大结果数（1-1000）
    #[arg(short = 'm', long = "max-results", default_value_t = DEFAULT_MAX_RESULTS)]
    pub max_results: usize,

    /// 匹配完整路径而不只是文件名
    #[arg(long = "match-path")]
    pub match_path: bool,

    /// 区分大小写
    #[arg(long = "match-case")]
    pub match_case: bool,

    /// 全词匹配
    #[arg(long = "whole-word")]
    pub whole_word: bool,

    /// 正则表达式
    #[arg(long = "regex")]
    pub regex: bool,

    /// 排序方式：代码 1-26 或名称（SIZE_DESC 等）
    #[arg(long = "sort")]
    pub sort: Option<String>,

    /// 限定搜索目录（仅 mdfind）
    #[arg(short = 's', long = "scope")]
    pub scope: Option<String>,

    /// 只输出仍然存在的文件（仅 locate）
    #[arg(long = "existing")]
    pub existing: bool,

    /// 只统计匹配数（仅 locate）
    #[arg(long = "count")]
    pub count: bool,
}

impl SearchArgs {
    /// 转成与 MCP 工具调用相同形状的参数
    pub fn to_arguments(&self) -> Value {
        let mut args = json!({
            "query": self.query,
            "max_results": self.max_results,
            "match_path": self.match_path,
            "match_case": self.match_case,
            "match_whole_word": self.whole_word,
            "match_regex": self.regex,
        });
        if let Some(sort) = &self.sort {
            // 纯数字按排序代码传，其余按名称
            args["sort_by"] = match sort.parse::<u64>() {
                Ok(code) => json!(code),
                Err(_) => json!(sort),
            };
        }

        // 命令行上 -e 只由 --existing 决定
        let mut linux = Map::new();
        linux.insert("existing_files".into(), json!(self.existing));
        if self.regex {
            linux.insert("regex_search".into(), json!(true));
        }
        if self.count {
            linux.insert("count_only".into(), json!(true));
        }
        args["linux_params"] = Value::Object(linux);
        if let Some(scope) = &self.scope {
            args["mac_params"] = json!({ "search_directory": scope });
        }
        args
    }
}

// CLI入口
pub fn run_search(searcher: &dyn FileSearcher, args: &SearchArgs) -> anyhow::Result<()> {
    let output = search_json(searcher, args);
    // 输出JSON（AI易解析）
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

pub fn search_json(searcher: &dyn FileSearcher, args: &SearchArgs) -> Value {
    match crate::search_with(searcher, &args.to_arguments()) {
        Ok(outcome) => json!({
            "code": 0,
            "msg": "success",
            "query": args.query,
            "provider": searcher.name(),
            "total_found": outcome.total_found,
            "elapsed_ms": outcome.elapsed_ms,
            "results": outcome.entries
        }),
        Err(e) => json!({
            "code": e.native_code().map(i64::from).unwrap_or(-1),
            "msg": e.to_string(),
            "query": args.query,
            "provider": searcher.name(),
            "results": []
        }),
    }
}
