use std::path::PathBuf;
use std::time::Instant;

use tracing::{debug, warn};

use crate::config::{self, MDFIND_REINDEX_COMMAND};
use crate::error::SearchError;
use crate::external::{self, CommandRunner, SystemRunner};
use crate::query::{MdfindParams, PlatformParams, SearchQuery};
use crate::types::SearchOutcome;

/// macOS 搜索后端：Spotlight 命令行 mdfind
pub struct MdfindSearcher<R: CommandRunner = SystemRunner> {
    program: PathBuf,
    runner: R,
}

impl MdfindSearcher<SystemRunner> {
    pub fn detect() -> Result<Self, SearchError> {
        let (preferred, fallback) = config::MDFIND_CANDIDATES;
        let (program, _) = external::probe(preferred, fallback, config::MDFIND_INSTALL_HINT)?;
        Ok(Self::with_runner(program, SystemRunner))
    }
}

impl<R: CommandRunner> MdfindSearcher<R> {
    pub fn with_runner(program: PathBuf, runner: R) -> Self {
        Self { program, runner }
    }

    pub fn build_args(&self, query: &SearchQuery) -> Vec<String> {
        let params = match &query.platform {
            PlatformParams::Mdfind(p) => p.clone(),
            _ => MdfindParams::default(),
        };

        let mut args = Vec::new();
        // -live 会让 mdfind 持续输出永不退出，同步读取模式下无法支持
        if params.live_updates {
            warn!("mdfind -live 不适用于一次性查询，已忽略");
        }
        if let Some(dir) = &params.search_directory {
            args.push("-onlyin".to_string());
            args.push(dir.clone());
        }
        if params.literal_query {
            args.push("-literal".to_string());
        }
        if params.interpret_query {
            args.push("-interpret".to_string());
        }
        // 默认只匹配文件名；匹配路径或原样查询时交给 Spotlight 解析
        let raw = query.options.match_path || params.literal_query || params.interpret_query;
        if !raw {
            args.push("-name".to_string());
        }
        args.push(query.query.clone());
        args
    }

    pub fn search(&self, query: &SearchQuery) -> Result<SearchOutcome, SearchError> {
        let start = Instant::now();
        let args = self.build_args(query);
        debug!("执行 {} {:?}", self.program.display(), args);

        let output = self
            .runner
            .run(&self.program, &args)
            .map_err(|source| SearchError::Spawn {
                tool: "mdfind".to_string(),
                source,
            })?;

        if !output.success() {
            return Err(classify_failure(&output.stderr));
        }

        let (entries, total_found) = external::collect_results(&output.stdout, query.max_results);
        Ok(SearchOutcome {
            entries,
            total_found,
            elapsed_ms: start.elapsed().as_millis() as u64,
        })
    }
}

/// Spotlight 索引关闭或缺失时的典型输出
const INDEX_UNAVAILABLE_PHRASES: [&str; 5] = [
    "indexing disabled",
    "indexing is disabled",
    "index is disabled",
    "indexing and searching disabled",
    "no index",
];

fn classify_failure(stderr: &str) -> SearchError {
    let lower = stderr.to_lowercase();
    if INDEX_UNAVAILABLE_PHRASES.iter().any(|p| lower.contains(p)) {
        SearchError::DatabaseNotReady {
            tool: "mdfind".to_string(),
            command: MDFIND_REINDEX_COMMAND.to_string(),
        }
    } else {
        SearchError::CommandFailed {
            tool: "mdfind".to_string(),
            stderr: stderr.trim().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::testing::FakeRunner;
    use crate::query::Platform;
    use serde_json::json;

    fn mac_query(args: serde_json::Value) -> SearchQuery {
        SearchQuery::from_arguments(&args, Platform::MacOs).unwrap()
    }

    fn searcher(runner: FakeRunner) -> MdfindSearcher<FakeRunner> {
        MdfindSearcher::with_runner(PathBuf::from("/usr/bin/mdfind"), runner)
    }

    #[test]
    fn test_name_search_by_default() {
        let s = searcher(FakeRunner::default());
        assert_eq!(s.build_args(&mac_query(json!({"query": "budget"}))), vec!["-name", "budget"]);
    }

    #[test]
    fn test_params_translation() {
        let s = searcher(FakeRunner::default());
        let q = mac_query(json!({
            "query": "kMDItemKind == 'PDF'",
            "mac_params": {
                "search_directory": "/Users/me/Documents",
                "interpret_query": true,
                "live_updates": true
            }
        }));
        assert_eq!(
            s.build_args(&q),
            vec!["-onlyin", "/Users/me/Documents", "-interpret", "kMDItemKind == 'PDF'"]
        );

        let q = mac_query(json!({"query": "notes", "match_path": true}));
        assert_eq!(s.build_args(&q), vec!["notes"]);
    }

    #[test]
    fn test_results_truncated() {
        let runner = FakeRunner::with_stdout("/x/a\n/x/b\n/x/c\n");
        let out = searcher(runner)
            .search(&mac_query(json!({"query": "x", "max_results": 2})))
            .unwrap();
        assert_eq!(out.entries.len(), 2);
        assert_eq!(out.total_found, 3);
        assert_eq!(out.entries[1].filename, "b");
    }

    #[test]
    fn test_failures() {
        let err = searcher(FakeRunner::failing(1, "Spotlight index is disabled on this volume"))
            .search(&mac_query(json!({"query": "x"})))
            .unwrap_err();
        assert!(err.to_string().contains("sudo mdutil -i on /"));

        let err = searcher(FakeRunner::failing(64, "mdfind: bad query"))
            .search(&mac_query(json!({"query": "x"})))
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("mdfind") && msg.contains("bad query"));
    }

    #[test]
    fn test_query_errors_mentioning_index_are_not_index_failures() {
        let err = searcher(FakeRunner::failing(64, "mdfind: could not parse query near 'index'"))
            .search(&mac_query(json!({"query": "index"})))
            .unwrap_err();
        assert!(matches!(err, SearchError::CommandFailed { .. }));

        let err = searcher(FakeRunner::failing(1, "/: Indexing disabled."))
            .search(&mac_query(json!({"query": "x"})))
            .unwrap_err();
        assert!(matches!(err, SearchError::DatabaseNotReady { .. }));
    }
}
