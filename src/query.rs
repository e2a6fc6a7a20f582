//! 查询归一化：把客户端传入的松散 JSON 参数整理成各后端都能理解的 `SearchQuery`
//!
//! 规则：
//! - 未知字段一律忽略（客户端可能按超集 schema 编写）
//! - `max_results` 非数字时取默认值，<=0 拒绝，超过上限截断
//! - 只读取当前平台的参数包，其它平台的参数包忽略

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::warn;

use crate::config::{DEFAULT_MAX_RESULTS, MAX_RESULTS_LIMIT};
use crate::error::SearchError;
use crate::everything::RequestFlags;

/// 当前可用后端所在的平台
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Platform {
    Windows,
    Linux,
    MacOs,
}

impl Platform {
    pub fn from_os(os: &str) -> Option<Self> {
        match os {
            "windows" => Some(Self::Windows),
            "linux" => Some(Self::Linux),
            "macos" => Some(Self::MacOs),
            _ => None,
        }
    }

    /// 参数包在 JSON 里的键名
    pub fn params_key(&self) -> &'static str {
        match self {
            Self::Windows => "windows_params",
            Self::Linux => "linux_params",
            Self::MacOs => "mac_params",
        }
    }
}

/// Everything SDK 排序常量 (EVERYTHING_SORT_*)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u32)]
pub enum SortOrder {
    NameAscending = 1,
    NameDescending = 2,
    PathAscending = 3,
    PathDescending = 4,
    SizeAscending = 5,
    SizeDescending = 6,
    ExtensionAscending = 7,
    ExtensionDescending = 8,
    TypeNameAscending = 9,
    TypeNameDescending = 10,
    DateCreatedAscending = 11,
    DateCreatedDescending = 12,
    DateModifiedAscending = 13,
    DateModifiedDescending = 14,
    AttributesAscending = 15,
    AttributesDescending = 16,
    FileListFilenameAscending = 17,
    FileListFilenameDescending = 18,
    RunCountAscending = 19,
    RunCountDescending = 20,
    DateRecentlyChangedAscending = 21,
    DateRecentlyChangedDescending = 22,
    DateAccessedAscending = 23,
    DateAccessedDescending = 24,
    DateRunAscending = 25,
    DateRunDescending = 26,
}

const SORT_TABLE: [(SortOrder, &str); 26] = [
    (SortOrder::NameAscending, "NAME_ASCENDING"),
    (SortOrder::NameDescending, "NAME_DESCENDING"),
    (SortOrder::PathAscending, "PATH_ASCENDING"),
    (SortOrder::PathDescending, "PATH_DESCENDING"),
    (SortOrder::SizeAscending, "SIZE_ASCENDING"),
    (SortOrder::SizeDescending, "SIZE_DESCENDING"),
    (SortOrder::ExtensionAscending, "EXTENSION_ASCENDING"),
    (SortOrder::ExtensionDescending, "EXTENSION_DESCENDING"),
    (SortOrder::TypeNameAscending, "TYPE_NAME_ASCENDING"),
    (SortOrder::TypeNameDescending, "TYPE_NAME_DESCENDING"),
    (SortOrder::DateCreatedAscending, "DATE_CREATED_ASCENDING"),
    (SortOrder::DateCreatedDescending, "DATE_CREATED_DESCENDING"),
    (SortOrder::DateModifiedAscending, "DATE_MODIFIED_ASCENDING"),
    (SortOrder::DateModifiedDescending, "DATE_MODIFIED_DESCENDING"),
    (SortOrder::AttributesAscending, "ATTRIBUTES_ASCENDING"),
    (SortOrder::AttributesDescending, "ATTRIBUTES_DESCENDING"),
    (SortOrder::FileListFilenameAscending, "FILE_LIST_FILENAME_ASCENDING"),
    (SortOrder::FileListFilenameDescending, "FILE_LIST_FILENAME_DESCENDING"),
    (SortOrder::RunCountAscending, "RUN_COUNT_ASCENDING"),
    (SortOrder::RunCountDescending, "RUN_COUNT_DESCENDING"),
    (SortOrder::DateRecentlyChangedAscending, "DATE_RECENTLY_CHANGED_ASCENDING"),
    (SortOrder::DateRecentlyChangedDescending, "DATE_RECENTLY_CHANGED_DESCENDING"),
    (SortOrder::DateAccessedAscending, "DATE_ACCESSED_ASCENDING"),
    (SortOrder::DateAccessedDescending, "DATE_ACCESSED_DESCENDING"),
    (SortOrder::DateRunAscending, "DATE_RUN_ASCENDING"),
    (SortOrder::DateRunDescending, "DATE_RUN_DESCENDING"),
];

impl Default for SortOrder {
    fn default() -> Self {
        Self::NameAscending
    }
}

impl SortOrder {
    pub fn code(self) -> u32 {
        self as u32
    }

    pub fn from_code(code: u32) -> Option<Self> {
        SORT_TABLE.iter().find(|(s, _)| s.code() == code).map(|(s, _)| *s)
    }

    /// 接受 `SIZE_DESC`、`size_descending`、`EVERYTHING_SORT_SIZE_DESCENDING`、`date-modified-asc` 等写法
    pub fn from_name(name: &str) -> Option<Self> {
        let mut key = name.trim().to_uppercase().replace(['-', ' '], "_");
        if let Some(rest) = key.strip_prefix("EVERYTHING_SORT_") {
            key = rest.to_string();
        }
        if let Some(stem) = key.strip_suffix("_ASC") {
            key = format!("{}_ASCENDING", stem);
        } else if let Some(stem) = key.strip_suffix("_DESC") {
            key = format!("{}_DESCENDING", stem);
        }
        SORT_TABLE.iter().find(|(_, n)| *n == key).map(|(s, _)| *s)
    }

    pub fn name(self) -> &'static str {
        SORT_TABLE
            .iter()
            .find(|(s, _)| *s == self)
            .map(|(_, n)| *n)
            .unwrap_or("NAME_ASCENDING")
    }
}

/// 各后端通用的匹配开关
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchOptions {
    pub match_path: bool,
    pub match_case: bool,
    pub match_whole_word: bool,
    pub match_regex: bool,
    pub sort_by: SortOrder,
    /// 仅 Everything 使用：只请求需要的字段
    pub request_flags: Option<RequestFlags>,
}

/// locate 专用参数
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocateParams {
    /// 显式指定时覆盖 `match_case` 推导出的 `-i`
    pub ignore_case: Option<bool>,
    /// 参数包存在但未给出时为 true；没有参数包时为 false
    pub regex_search: bool,
    pub existing_files: bool,
    pub count_only: bool,
}

/// mdfind 专用参数
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MdfindParams {
    pub live_updates: bool,
    pub search_directory: Option<String>,
    pub literal_query: bool,
    pub interpret_query: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformParams {
    Native,
    Locate(LocateParams),
    Mdfind(MdfindParams),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub query: String,
    pub max_results: usize,
    pub options: MatchOptions,
    pub platform: PlatformParams,
}

impl SearchQuery {
    /// 从未类型化的工具参数构造查询
    pub fn from_arguments(arguments: &Value, platform: Platform) -> Result<Self, SearchError> {
        let top = arguments
            .as_object()
            .ok_or_else(|| SearchError::InvalidQuery("参数必须是 JSON 对象".into()))?;
        let base = unwrap_base(top)?;

        let query = match base.get("query") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        };
        if query.trim().is_empty() {
            return Err(SearchError::InvalidQuery("缺少 query 参数".into()));
        }

        let max_results = match base.get("max_results").and_then(coerce_int) {
            Some(n) => clamp_max_results(n)?,
            None => DEFAULT_MAX_RESULTS,
        };

        let sort_by = match base.get("sort_by") {
            None | Some(Value::Null) => SortOrder::default(),
            Some(v) => parse_sort(v).unwrap_or_else(|| {
                warn!("无法识别的 sort_by: {}，使用默认排序", v);
                SortOrder::default()
            }),
        };

        let mut options = MatchOptions {
            match_path: flag(&base, "match_path").unwrap_or(false),
            match_case: flag(&base, "match_case").unwrap_or(false),
            match_whole_word: flag(&base, "match_whole_word").unwrap_or(false),
            match_regex: flag(&base, "match_regex").unwrap_or(false),
            sort_by,
            request_flags: base.get("fields").and_then(parse_fields),
        };

        // 参数包优先取顶层，其次取 base 内部
        let bag = top
            .get(platform.params_key())
            .or_else(|| base.get(platform.params_key()))
            .and_then(as_object);

        let platform = match platform {
            Platform::Windows => {
                // windows_params 里的同名开关覆盖顶层
                if let Some(bag) = &bag {
                    overlay(&mut options.match_path, bag, "match_path");
                    overlay(&mut options.match_case, bag, "match_case");
                    overlay(&mut options.match_whole_word, bag, "match_whole_word");
                    overlay(&mut options.match_regex, bag, "match_regex");
                    if let Some(sort) = bag.get("sort_by").and_then(parse_sort) {
                        options.sort_by = sort;
                    }
                }
                PlatformParams::Native
            }
            Platform::Linux => PlatformParams::Locate(
                bag.map(|b| LocateParams {
                    ignore_case: flag(&b, "ignore_case"),
                    regex_search: flag(&b, "regex_search").unwrap_or(false),
                    // 显式给出参数包时默认只输出仍存在的文件
                    existing_files: flag(&b, "existing_files").unwrap_or(true),
                    count_only: flag(&b, "count_only").unwrap_or(false),
                })
                .unwrap_or_default(),
            ),
            Platform::MacOs => PlatformParams::Mdfind(
                bag.map(|b| MdfindParams {
                    live_updates: flag(&b, "live_updates").unwrap_or(false),
                    search_directory: b
                        .get("search_directory")
                        .and_then(Value::as_str)
                        .filter(|s| !s.trim().is_empty())
                        .map(str::to_string),
                    literal_query: flag(&b, "literal_query").unwrap_or(false),
                    interpret_query: flag(&b, "interpret_query").unwrap_or(false),
                })
                .unwrap_or_default(),
            ),
        };

        Ok(Self {
            query,
            max_results,
            options,
            platform,
        })
    }
}

/// <=0 拒绝，超过上限截断
pub fn clamp_max_results(n: i64) -> Result<usize, SearchError> {
    if n < 1 {
        return Err(SearchError::InvalidQuery(format!(
            "max_results 必须在 1-{} 之间，收到 {}",
            MAX_RESULTS_LIMIT, n
        )));
    }
    Ok((n as u64).min(MAX_RESULTS_LIMIT as u64) as usize)
}

/// `base` 可以是对象、JSON 字符串或纯查询字符串；没有 `base` 时参数本身就是 base
fn unwrap_base(top: &Map<String, Value>) -> Result<Map<String, Value>, SearchError> {
    match top.get("base") {
        None | Some(Value::Null) => Ok(top.clone()),
        Some(Value::Object(m)) => Ok(m.clone()),
        Some(Value::String(s)) => match serde_json::from_str::<Value>(s) {
            Ok(Value::Object(m)) => Ok(m),
            _ => {
                let mut m = Map::new();
                m.insert("query".into(), Value::String(s.clone()));
                Ok(m)
            }
        },
        Some(_) => Err(SearchError::InvalidQuery(
            "base 参数必须是字符串或对象".into(),
        )),
    }
}

fn as_object(v: &Value) -> Option<Map<String, Value>> {
    match v {
        Value::Object(m) => Some(m.clone()),
        Value::String(s) => match serde_json::from_str::<Value>(s) {
            Ok(Value::Object(m)) => Some(m),
            _ => None,
        },
        _ => None,
    }
}

fn coerce_int(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn coerce_bool(v: &Value) -> Option<bool> {
    match v {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" => Some(true),
            "false" | "0" | "no" => Some(false),
            _ => None,
        },
        Value::Number(n) => n.as_i64().map(|i| i != 0),
        _ => None,
    }
}

fn flag(map: &Map<String, Value>, key: &str) -> Option<bool> {
    map.get(key).and_then(coerce_bool)
}

fn overlay(target: &mut bool, map: &Map<String, Value>, key: &str) {
    if let Some(v) = flag(map, key) {
        *target = v;
    }
}

fn parse_sort(v: &Value) -> Option<SortOrder> {
    match v {
        Value::Number(_) => coerce_int(v)
            .and_then(|n| u32::try_from(n).ok())
            .and_then(SortOrder::from_code),
        Value::String(s) => match s.trim().parse::<u32>() {
            Ok(code) => SortOrder::from_code(code),
            Err(_) => SortOrder::from_name(s),
        },
        _ => None,
    }
}

fn parse_fields(v: &Value) -> Option<RequestFlags> {
    let names: Vec<&str> = match v {
        Value::Array(items) => items.iter().filter_map(Value::as_str).collect(),
        Value::String(s) => s.split(',').collect(),
        _ => return None,
    };
    let mut flags = RequestFlags::empty();
    for name in names {
        match RequestFlags::from_field_name(name) {
            Some(f) => flags |= f,
            None => warn!("忽略未知字段: {}", name),
        }
    }
    (!flags.is_empty()).then_some(flags)
}
