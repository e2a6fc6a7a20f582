//! Everything 原生搜索后端 (Windows)
//!
//! SDK 的搜索状态是进程级单例：SetSearch/SetMatchCase 等写入的是全局变量，
//! 两个并发调用会互相覆盖配置。这里用一把 Mutex 把整个
//! "配置 -> 查询 -> 读取结果 -> Reset" 周期包起来。

mod api;
mod dll;
mod flags;
pub mod time;

use std::sync::Mutex;
use std::time::Instant;

use tracing::{debug, warn};

pub use api::EverythingApi;
pub use dll::EverythingDll;
pub use flags::RequestFlags;

use crate::error::SearchError;
use crate::query::SearchQuery;
use crate::types::{extension_of, file_name_of, SearchOutcome, SearchResult};
use time::filetime_to_local;

pub struct EverythingSearcher<A: EverythingApi> {
    session: Mutex<A>,
}

impl<A: EverythingApi> EverythingSearcher<A> {
    pub fn new(api: A) -> Self {
        Self {
            session: Mutex::new(api),
        }
    }

    pub fn search(&self, query: &SearchQuery) -> Result<SearchOutcome, SearchError> {
        let start = Instant::now();
        // 上一个调用方 panic 不影响 SDK 状态，每次都会 Reset
        let mut api = self.session.lock().unwrap_or_else(|e| e.into_inner());

        let result = run_query(&mut *api, query);
        api.reset();

        let (entries, total_found) = result?;
        Ok(SearchOutcome {
            entries,
            total_found,
            elapsed_ms: start.elapsed().as_millis() as u64,
        })
    }
}

fn run_query<A: EverythingApi>(
    api: &mut A,
    query: &SearchQuery,
) -> Result<(Vec<SearchResult>, u64), SearchError> {
    let text = normalize_query(&query.query);
    let opts = &query.options;
    let flags = opts.request_flags.unwrap_or_default().with_path();

    debug!(
        "Everything 查询: {:?} case={} path={} word={} regex={} sort={}",
        text,
        opts.match_case,
        opts.match_path,
        opts.match_whole_word,
        opts.match_regex,
        opts.sort_by.name()
    );

    api.set_search(&text);
    api.set_match_path(opts.match_path);
    api.set_match_case(opts.match_case);
    api.set_match_whole_word(opts.match_whole_word);
    api.set_regex(opts.match_regex);
    api.set_sort(opts.sort_by.code());
    api.set_max(query.max_results as u32);
    api.set_request_flags(flags.bits());

    if !api.query() {
        return Err(SearchError::everything(api.last_error()));
    }

    let reported = api.num_results();
    let count = (reported as usize).min(query.max_results) as u32;

    // 单条结果读取失败只跳过该条
    let entries = (0..count)
        .filter_map(|i| match extract_row(api, i, flags) {
            Ok(row) => Some(row),
            Err(e) => {
                warn!("跳过第 {} 条结果: {}", i, e);
                None
            }
        })
        .collect();

    Ok((entries, u64::from(reported)))
}

fn extract_row<A: EverythingApi>(
    api: &A,
    index: u32,
    flags: RequestFlags,
) -> Result<SearchResult, String> {
    let path = api
        .result_full_path(index)
        .ok_or_else(|| "无法读取完整路径".to_string())?;

    let filename = flags
        .contains(RequestFlags::FILE_NAME)
        .then(|| api.result_file_name(index))
        .flatten()
        .unwrap_or_else(|| file_name_of(&path));

    let extension = if flags.contains(RequestFlags::EXTENSION) {
        api.result_extension(index)
    } else {
        extension_of(&filename)
    };

    let size = if flags.contains(RequestFlags::SIZE) {
        api.result_size(index).and_then(|s| u64::try_from(s).ok())
    } else {
        None
    };

    let date = |flag: RequestFlags, read: fn(&A, u32) -> Option<u64>| {
        if flags.contains(flag) {
            read(api, index).and_then(filetime_to_local)
        } else {
            None
        }
    };

    Ok(SearchResult {
        created: date(RequestFlags::DATE_CREATED, A::result_date_created),
        modified: date(RequestFlags::DATE_MODIFIED, A::result_date_modified),
        accessed: date(RequestFlags::DATE_ACCESSED, A::result_date_accessed),
        attributes: flags
            .contains(RequestFlags::ATTRIBUTES)
            .then(|| api.result_attributes(index))
            .flatten(),
        run_count: flags
            .contains(RequestFlags::RUN_COUNT)
            .then(|| api.result_run_count(index))
            .flatten(),
        highlighted_filename: flags
            .contains(RequestFlags::HIGHLIGHTED_FILE_NAME)
            .then(|| api.result_highlighted_file_name(index))
            .flatten(),
        highlighted_path: flags
            .contains(RequestFlags::HIGHLIGHTED_PATH)
            .then(|| api.result_highlighted_path(index))
            .flatten(),
        path,
        filename,
        extension,
        size,
    })
}

/// Everything 使用 Windows 路径语法：合并重复的反斜杠，正斜杠转反斜杠
pub fn normalize_query(query: &str) -> String {
    let mut text = query.replace('/', "\\");
    while text.contains("\\\\") {
        text = text.replace("\\\\", "\\");
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{Platform, SortOrder};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Search(String),
        MatchPath(bool),
        MatchCase(bool),
        WholeWord(bool),
        Regex(bool),
        Sort(u32),
        Max(u32),
        Flags(u32),
        Query,
        Reset,
    }

    #[derive(Clone)]
    struct FakeRow {
        path: Option<String>,
        name: Option<String>,
        size: Option<i64>,
        modified: Option<u64>,
    }

    /// 记录所有调用的假 SDK
    struct FakeSdk {
        calls: Arc<Mutex<Vec<Call>>>,
        rows: Vec<FakeRow>,
        fail_with: Option<u32>,
        query_delay: Option<Duration>,
    }

    impl FakeSdk {
        fn new(rows: Vec<FakeRow>) -> (Self, Arc<Mutex<Vec<Call>>>) {
            let calls = Arc::new(Mutex::new(Vec::new()));
            (
                Self {
                    calls: calls.clone(),
                    rows,
                    fail_with: None,
                    query_delay: None,
                },
                calls,
            )
        }

        fn log(&self, call: Call) {
            self.calls.lock().unwrap().push(call);
        }

        fn row(&self, index: u32) -> Option<&FakeRow> {
            self.rows.get(index as usize)
        }
    }

    impl EverythingApi for FakeSdk {
        fn set_search(&mut self, text: &str) {
            self.log(Call::Search(text.to_string()));
        }
        fn set_match_path(&mut self, enable: bool) {
            self.log(Call::MatchPath(enable));
        }
        fn set_match_case(&mut self, enable: bool) {
            self.log(Call::MatchCase(enable));
        }
        fn set_match_whole_word(&mut self, enable: bool) {
            self.log(Call::WholeWord(enable));
        }
        fn set_regex(&mut self, enable: bool) {
            self.log(Call::Regex(enable));
        }
        fn set_sort(&mut self, sort: u32) {
            self.log(Call::Sort(sort));
        }
        fn set_max(&mut self, max: u32) {
            self.log(Call::Max(max));
        }
        fn set_request_flags(&mut self, flags: u32) {
            self.log(Call::Flags(flags));
        }
        fn query(&mut self) -> bool {
            if let Some(delay) = self.query_delay {
                std::thread::sleep(delay);
            }
            self.log(Call::Query);
            self.fail_with.is_none()
        }
        fn last_error(&self) -> u32 {
            self.fail_with.unwrap_or(0)
        }
        fn num_results(&self) -> u32 {
            self.rows.len() as u32
        }
        fn result_full_path(&self, index: u32) -> Option<String> {
            self.row(index)?.path.clone()
        }
        fn result_file_name(&self, index: u32) -> Option<String> {
            self.row(index)?.name.clone()
        }
        fn result_extension(&self, index: u32) -> Option<String> {
            let name = self.row(index)?.name.clone()?;
            extension_of(&name)
        }
        fn result_size(&self, index: u32) -> Option<i64> {
            self.row(index)?.size
        }
        fn result_date_created(&self, _index: u32) -> Option<u64> {
            Some(0)
        }
        fn result_date_modified(&self, index: u32) -> Option<u64> {
            self.row(index)?.modified
        }
        fn result_date_accessed(&self, _index: u32) -> Option<u64> {
            None
        }
        fn result_attributes(&self, _index: u32) -> Option<u32> {
            Some(0x20)
        }
        fn result_run_count(&self, _index: u32) -> Option<u32> {
            Some(3)
        }
        fn result_highlighted_file_name(&self, _index: u32) -> Option<String> {
            Some("*rep*ort.txt".to_string())
        }
        fn result_highlighted_path(&self, _index: u32) -> Option<String> {
            None
        }
        fn reset(&mut self) {
            self.log(Call::Reset);
        }
    }

    fn row(path: &str, size: i64) -> FakeRow {
        FakeRow {
            path: Some(path.to_string()),
            name: Some(file_name_of(path)),
            size: Some(size),
            modified: Some(133_485_408_000_000_000),
        }
    }

    fn windows_query(args: serde_json::Value) -> SearchQuery {
        SearchQuery::from_arguments(&args, Platform::Windows).unwrap()
    }

    #[test]
    fn test_setters_called_before_query_and_order_kept() {
        let rows = vec![
            row(r"C:\data\big.iso", 4_000_000_000),
            row(r"C:\data\mid.zip", 2_000_000),
            row(r"C:\data\small.txt", 12),
        ];
        let (sdk, calls) = FakeSdk::new(rows);
        let searcher = EverythingSearcher::new(sdk);

        let q = windows_query(json!({"query": "data", "match_case": true, "sort_by": "SIZE_DESC"}));
        let out = searcher.search(&q).unwrap();

        let calls = calls.lock().unwrap().clone();
        let query_pos = calls.iter().position(|c| *c == Call::Query).unwrap();
        let case_pos = calls.iter().position(|c| *c == Call::MatchCase(true)).unwrap();
        let sort_pos = calls
            .iter()
            .position(|c| *c == Call::Sort(SortOrder::SizeDescending.code()))
            .unwrap();
        assert!(case_pos < query_pos);
        assert!(sort_pos < query_pos);
        assert_eq!(calls.last(), Some(&Call::Reset));

        // 不重新排序，保持后端顺序
        let sizes: Vec<_> = out.entries.iter().map(|r| r.size.unwrap()).collect();
        assert_eq!(sizes, vec![4_000_000_000, 2_000_000, 12]);
        assert_eq!(out.total_found, 3);
    }

    #[test]
    fn test_max_results_limits_rows() {
        let rows = (0..10).map(|i| row(&format!(r"C:\f{}.txt", i), i)).collect();
        let (sdk, calls) = FakeSdk::new(rows);
        let searcher = EverythingSearcher::new(sdk);

        let out = searcher.search(&windows_query(json!({"query": "f", "max_results": 4}))).unwrap();
        assert_eq!(out.entries.len(), 4);
        assert_eq!(out.total_found, 10);
        assert!(calls.lock().unwrap().contains(&Call::Max(4)));
    }

    #[test]
    fn test_corrupt_row_is_skipped() {
        let mut rows = vec![row(r"C:\a.txt", 1), row(r"C:\b.txt", 2), row(r"C:\c.txt", 3)];
        rows[1].path = None;
        let (sdk, _) = FakeSdk::new(rows);
        let searcher = EverythingSearcher::new(sdk);

        let out = searcher.search(&windows_query(json!({"query": "x"}))).unwrap();
        let names: Vec<_> = out.entries.iter().map(|r| r.filename.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "c.txt"]);
    }

    #[test]
    fn test_query_failure_maps_error_and_resets() {
        let (mut sdk, calls) = FakeSdk::new(vec![]);
        sdk.fail_with = Some(2);
        let searcher = EverythingSearcher::new(sdk);

        let err = searcher.search(&windows_query(json!({"query": "x"}))).unwrap_err();
        assert_eq!(err.native_code(), Some(2));
        assert_eq!(calls.lock().unwrap().last(), Some(&Call::Reset));
    }

    #[test]
    fn test_field_decoding() {
        let mut r = row(r"C:\Users\me\report.txt", 0);
        r.name = None;
        let (sdk, _) = FakeSdk::new(vec![r]);
        let searcher = EverythingSearcher::new(sdk);

        let out = searcher
            .search(&windows_query(json!({"query": "report"})))
            .unwrap();
        let res = &out.entries[0];
        assert_eq!(res.path, r"C:\Users\me\report.txt");
        // 文件名未提供时从路径推导
        assert_eq!(res.filename, "report.txt");
        assert_eq!(res.size, Some(0));
        // created 原始值为 0 -> 缺失
        assert!(res.created.is_none());
        assert!(res.modified.is_some());
        assert!(res.accessed.is_none());
        assert_eq!(res.attributes, Some(0x20));
        // 默认不请求运行次数和高亮
        assert!(res.run_count.is_none());
        assert!(res.highlighted_filename.is_none());
    }

    #[test]
    fn test_requested_fields_only() {
        let (sdk, calls) = FakeSdk::new(vec![row(r"C:\report.txt", 5)]);
        let searcher = EverythingSearcher::new(sdk);

        let q = windows_query(json!({"query": "rep", "fields": ["run_count", "highlighted_filename"]}));
        let out = searcher.search(&q).unwrap();
        let res = &out.entries[0];
        assert!(res.size.is_none());
        assert!(res.modified.is_none());
        assert_eq!(res.run_count, Some(3));
        assert_eq!(res.highlighted_filename.as_deref(), Some("*rep*ort.txt"));

        let expected = (RequestFlags::RUN_COUNT | RequestFlags::HIGHLIGHTED_FILE_NAME).with_path();
        assert!(calls.lock().unwrap().contains(&Call::Flags(expected.bits())));
    }

    #[test]
    fn test_query_text_normalized_before_submit() {
        let (sdk, calls) = FakeSdk::new(vec![]);
        let searcher = EverythingSearcher::new(sdk);
        searcher
            .search(&windows_query(json!({"query": "C:/Users//me\\\\docs"})))
            .unwrap();
        assert_eq!(
            calls.lock().unwrap().first(),
            Some(&Call::Search(r"C:\Users\me\docs".to_string()))
        );
    }

    #[test]
    fn test_normalize_idempotent() {
        for q in [r"C:\\Users\\me", "a/b//c", r"\\\\server\share", "plain *.txt", ""] {
            let once = normalize_query(q);
            assert!(!once.contains("\\\\"));
            assert!(!once.contains('/'));
            assert_eq!(normalize_query(&once), once);
        }
    }

    #[test]
    fn test_concurrent_searches_do_not_interleave() {
        let (mut sdk, calls) = FakeSdk::new(vec![row(r"C:\data\a.txt", 1)]);
        sdk.query_delay = Some(Duration::from_millis(5));
        let searcher = EverythingSearcher::new(sdk);

        const THREADS: usize = 4;
        const ROUNDS: usize = 5;
        std::thread::scope(|scope| {
            for t in 0..THREADS {
                let searcher = &searcher;
                scope.spawn(move || {
                    for _ in 0..ROUNDS {
                        let q = windows_query(json!({"query": format!("caller{}", t)}));
                        assert_eq!(searcher.search(&q).unwrap().entries.len(), 1);
                    }
                });
            }
        });

        let calls = calls.lock().unwrap().clone();
        assert_eq!(calls.len(), THREADS * ROUNDS * 10);
        let mut per_caller = [0usize; THREADS];
        for block in calls.chunks(10) {
            let text = match &block[0] {
                Call::Search(text) => text.clone(),
                other => panic!("block starts with {:?}", other),
            };
            assert!(block[1..].iter().all(|c| !matches!(c, Call::Search(_))));
            assert_eq!(block[8], Call::Query);
            assert_eq!(block[9], Call::Reset);
            let caller: usize = text.trim_start_matches("caller").parse().unwrap();
            per_caller[caller] += 1;
        }
        assert_eq!(per_caller, [ROUNDS; THREADS]);
    }
}
