use anyhow::Context;
use clap::Parser;

use starsearch_mcp::cli::{self, Cli, Commands};
use starsearch_mcp::server::McpServer;
use starsearch_mcp::{console, provider};

fn main() -> anyhow::Result<()> {
    // 必须在任何输出之前调用
    console::configure();
    starsearch_mcp::init_tracing();

    let cli = Cli::parse();

    // 后端构造失败直接退出，不启动服务
    let searcher = provider::init().context("搜索后端初始化失败")?;

    match cli.command {
        Some(Commands::Search(args)) => cli::run_search(searcher, &args),
        Some(Commands::Serve) | None => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(McpServer::new(searcher).run())
        }
    }
}
