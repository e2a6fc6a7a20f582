//! StarSearch 通用文件搜索
//!
//! 把"按名称/元数据搜索文件"这一能力委托给操作系统自带的索引：
//! Windows 上的 Everything SDK，Linux 上的 plocate/locate，macOS 上的 mdfind。

pub mod cli;
pub mod config;
pub mod console;
pub mod error;
pub mod everything;
pub mod external;
pub mod format;
pub mod locate;
pub mod mdfind;
pub mod provider;
pub mod query;
pub mod server;
pub mod types;

use serde_json::Value;
use tracing_subscriber::EnvFilter;

pub use error::SearchError;
pub use provider::{FileSearcher, SearchProvider};
pub use query::SearchQuery;
pub use types::{SearchOutcome, SearchResult};

/// 核心入口：未类型化参数 -> 归一化查询 -> 当前后端
pub fn search_with(searcher: &dyn FileSearcher, arguments: &Value) -> Result<SearchOutcome, SearchError> {
    let query = SearchQuery::from_arguments(arguments, searcher.platform())?;
    searcher.search(&query)
}

/// 日志写到 stderr（stdout 留给协议），级别取 RUST_LOG，默认 warn
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init();
}
