use std::path::PathBuf;
use std::time::Instant;

use tracing::debug;

use crate::config::{self, LOCATE_REBUILD_COMMAND};
use crate::error::SearchError;
use crate::external::{self, CommandRunner, SystemRunner};
use crate::query::{LocateParams, PlatformParams, SearchQuery};
use crate::types::SearchOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocateFlavor {
    Plocate,
    Mlocate,
}

impl LocateFlavor {
    fn name(&self) -> &'static str {
        match self {
            Self::Plocate => "plocate",
            Self::Mlocate => "mlocate",
        }
    }

    fn regex_flag(&self) -> &'static str {
        match self {
            Self::Plocate => "-r",
            Self::Mlocate => "--regex",
        }
    }
}

/// Linux 搜索后端：plocate 优先，退回 locate (mlocate)
pub struct LocateSearcher<R: CommandRunner = SystemRunner> {
    program: PathBuf,
    flavor: LocateFlavor,
    runner: R,
}

impl LocateSearcher<SystemRunner> {
    pub fn detect() -> Result<Self, SearchError> {
        let (preferred, fallback) = config::LOCATE_CANDIDATES;
        let (program, name) = external::probe(preferred, fallback, config::LOCATE_INSTALL_HINT)?;
        let flavor = if name == preferred {
            LocateFlavor::Plocate
        } else {
            LocateFlavor::Mlocate
        };
        Ok(Self::with_runner(program, flavor, SystemRunner))
    }
}

impl<R: CommandRunner> LocateSearcher<R> {
    pub fn with_runner(program: PathBuf, flavor: LocateFlavor, runner: R) -> Self {
        Self {
            program,
            flavor,
            runner,
        }
    }

    pub fn flavor(&self) -> LocateFlavor {
        self.flavor
    }

    /// 参数顺序固定：-i、正则、-e、-c，查询串放最后
    pub fn build_args(&self, query: &SearchQuery) -> Vec<String> {
        let params = match &query.platform {
            PlatformParams::Locate(p) => p.clone(),
            _ => LocateParams::default(),
        };
        let opts = &query.options;

        let mut args = Vec::new();
        if params.ignore_case.unwrap_or(!opts.match_case) {
            args.push("-i".to_string());
        }
        if opts.match_regex || params.regex_search {
            args.push(self.flavor.regex_flag().to_string());
        }
        if params.existing_files {
            args.push("-e".to_string());
        }
        if params.count_only {
            args.push("-c".to_string());
        }
        args.push(query.query.clone());
        args
    }

    pub fn search(&self, query: &SearchQuery) -> Result<SearchOutcome, SearchError> {
        let start = Instant::now();
        let args = self.build_args(query);
        let count_only = matches!(&query.platform, PlatformParams::Locate(p) if p.count_only);
        if query.options.match_whole_word || query.options.match_path {
            debug!("locate 不支持 match_whole_word / match_path，已忽略");
        }
        debug!("执行 {} {:?}", self.program.display(), args);

        let output = self
            .runner
            .run(&self.program, &args)
            .map_err(|source| SearchError::Spawn {
                tool: self.tool_name(),
                source,
            })?;

        if !output.success() {
            // 退出码 1 且 stderr 为空表示无匹配；-c 时 stdout 仍会输出 0
            let no_match = output.status == Some(1) && output.stderr.trim().is_empty();
            if !no_match {
                return Err(self.classify_failure(&output.stderr));
            }
        }

        let (entries, total_found) = if count_only {
            let count = output
                .stdout
                .lines()
                .next()
                .and_then(|l| l.trim().parse::<u64>().ok())
                .unwrap_or(0);
            (Vec::new(), count)
        } else {
            external::collect_results(&output.stdout, query.max_results)
        };

        Ok(SearchOutcome {
            entries,
            total_found,
            elapsed_ms: start.elapsed().as_millis() as u64,
        })
    }

    fn tool_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.flavor.name().to_string())
    }

    fn classify_failure(&self, stderr: &str) -> SearchError {
        let lower = stderr.to_lowercase();
        if lower.contains("no such file or directory") || lower.contains("database") {
            SearchError::DatabaseNotReady {
                tool: self.flavor.name().to_string(),
                command: LOCATE_REBUILD_COMMAND.to_string(),
            }
        } else {
            SearchError::CommandFailed {
                tool: self.tool_name(),
                stderr: stderr.trim().to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::testing::FakeRunner;
    use crate::query::Platform;
    use serde_json::json;
    use std::fs;
    use tempfile::tempdir;

    fn searcher(runner: FakeRunner, flavor: LocateFlavor) -> LocateSearcher<FakeRunner> {
        LocateSearcher::with_runner(PathBuf::from("/usr/bin/plocate"), flavor, runner)
    }

    fn linux_query(args: serde_json::Value) -> SearchQuery {
        SearchQuery::from_arguments(&args, Platform::Linux).unwrap()
    }

    #[test]
    fn test_default_args() {
        let s = searcher(FakeRunner::default(), LocateFlavor::Plocate);
        let args = s.build_args(&linux_query(json!({"query": "*.pdf"})));
        assert_eq!(args, vec!["-i", "*.pdf"]);
    }

    #[test]
    fn test_flag_order() {
        let s = searcher(FakeRunner::default(), LocateFlavor::Plocate);
        let q = linux_query(json!({
            "query": "/home/.*\\.txt$",
            "match_regex": true,
            "linux_params": {"existing_files": true, "count_only": true}
        }));
        assert_eq!(s.build_args(&q), vec!["-i", "-r", "-e", "-c", "/home/.*\\.txt$"]);

        let q = linux_query(json!({"query": "Readme", "match_case": true, "match_regex": true}));
        let m = searcher(FakeRunner::default(), LocateFlavor::Mlocate);
        assert_eq!(m.build_args(&q), vec!["--regex", "Readme"]);
    }

    #[test]
    fn test_ignore_case_param_overrides() {
        let s = searcher(FakeRunner::default(), LocateFlavor::Plocate);
        let q = linux_query(json!({"query": "a", "linux_params": {"ignore_case": false}}));
        assert_eq!(s.build_args(&q), vec!["-e", "a"]);

        let q = linux_query(json!({"query": "a", "linux_params": {"ignore_case": false, "existing_files": false}}));
        assert_eq!(s.build_args(&q), vec!["a"]);
    }

    #[test]
    fn test_seven_lines_five_results() {
        let dir = tempdir().unwrap();
        let mut lines = Vec::new();
        for i in 0..7 {
            let p = dir.path().join(format!("note{}.txt", i));
            fs::write(&p, vec![b'x'; i + 1]).unwrap();
            lines.push(p.to_string_lossy().into_owned());
        }
        let runner = FakeRunner::with_stdout(&(lines.join("\n") + "\n"));
        let s = searcher(runner.clone(), LocateFlavor::Plocate);

        let out = s.search(&linux_query(json!({"query": "*.txt", "max_results": 5}))).unwrap();
        assert_eq!(out.entries.len(), 5);
        assert_eq!(out.total_found, 7);
        for (i, r) in out.entries.iter().enumerate() {
            assert_eq!(r.path, lines[i]);
            assert_eq!(r.size, Some(i as u64 + 1));
            assert!(r.modified.is_some());
        }
        assert_eq!(runner.last_args(), vec!["-i", "*.txt"]);
    }

    #[test]
    fn test_vanished_file_degrades() {
        let runner = FakeRunner::with_stdout("/gone/away/old-report.docx\n");
        let s = searcher(runner, LocateFlavor::Plocate);
        let out = s.search(&linux_query(json!({"query": "report"}))).unwrap();
        let r = &out.entries[0];
        assert_eq!(r.filename, "old-report.docx");
        assert!(r.size.is_none() && r.modified.is_none());
    }

    #[test]
    fn test_missing_database() {
        let runner = FakeRunner::failing(
            1,
            "plocate: could not open database '/var/lib/plocate/plocate.db': No such file or directory",
        );
        let err = searcher(runner, LocateFlavor::Plocate)
            .search(&linux_query(json!({"query": "x"})))
            .unwrap_err();
        assert!(matches!(err, SearchError::DatabaseNotReady { .. }));
        assert!(err.to_string().contains("sudo updatedb"));
    }

    #[test]
    fn test_generic_failure() {
        let runner = FakeRunner::failing(2, "plocate: invalid option -- 'z'");
        let err = searcher(runner, LocateFlavor::Plocate)
            .search(&linux_query(json!({"query": "x"})))
            .unwrap_err();
        let msg = err.to_string();
        assert!(matches!(err, SearchError::CommandFailed { .. }));
        assert!(msg.contains("plocate"));
        assert!(msg.contains("invalid option"));
    }

    #[test]
    fn test_no_match_is_empty() {
        let runner = FakeRunner::failing(1, "");
        let out = searcher(runner, LocateFlavor::Plocate)
            .search(&linux_query(json!({"query": "zzzz"})))
            .unwrap();
        assert!(out.entries.is_empty());
        assert_eq!(out.total_found, 0);
    }

    #[test]
    fn test_count_only() {
        let runner = FakeRunner::with_stdout("1234\n");
        let out = searcher(runner, LocateFlavor::Plocate)
            .search(&linux_query(json!({"query": "x", "linux_params": {"count_only": true}})))
            .unwrap();
        assert!(out.entries.is_empty());
        assert_eq!(out.total_found, 1234);
    }

    #[test]
    fn test_count_only_zero_matches() {
        let mut runner = FakeRunner::with_stdout("0\n");
        runner.output.status = Some(1);
        for flavor in [LocateFlavor::Mlocate, LocateFlavor::Plocate] {
            let out = searcher(runner.clone(), flavor)
                .search(&linux_query(json!({"query": "nothing-here", "linux_params": {"count_only": true}})))
                .unwrap();
            assert!(out.entries.is_empty());
            assert_eq!(out.total_found, 0);
        }
        assert_eq!(runner.last_args(), vec!["-i", "-e", "-c", "nothing-here"]);
    }
}
