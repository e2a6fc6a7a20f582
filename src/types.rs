use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// 统一搜索结果：三种后端最终都归一化为此结构
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub path: String,
    pub filename: String,
    pub extension: Option<String>,
    pub size: Option<u64>,
    pub created: Option<DateTime<Local>>,
    pub modified: Option<DateTime<Local>>,
    pub accessed: Option<DateTime<Local>>,
    /// Windows 属性位 或 Unix st_mode，原样透传
    pub attributes: Option<u32>,
    // 以下字段仅 Everything 后端提供
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub run_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub highlighted_filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub highlighted_path: Option<String>,
}

impl SearchResult {
    /// 仅凭路径构造，文件名与后缀从路径推导，其余元数据留空
    pub fn from_path(path: impl Into<String>) -> Self {
        let path = path.into();
        let filename = file_name_of(&path);
        let extension = extension_of(&filename);
        Self {
            path,
            filename,
            extension,
            size: None,
            created: None,
            modified: None,
            accessed: None,
            attributes: None,
            run_count: None,
            highlighted_filename: None,
            highlighted_path: None,
        }
    }
}

/// 一次搜索的完整输出
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub entries: Vec<SearchResult>,
    /// 后端报告的匹配总数（截断前）
    pub total_found: u64,
    pub elapsed_ms: u64,
}

/// 取路径最后一段，同时识别 `/` 与 `\`（Everything 返回的是 Windows 路径）
pub fn file_name_of(path: &str) -> String {
    let trimmed = path.trim_end_matches(['/', '\\']);
    match trimmed.rsplit(['/', '\\']).next() {
        Some(name) if !name.is_empty() => name.to_string(),
        // 根目录之类没有最后一段，退回完整路径，保证文件名非空
        _ => path.to_string(),
    }
}

/// 后缀不含点；`.bashrc` 这类点文件视为无后缀
pub fn extension_of(filename: &str) -> Option<String> {
    match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Some(ext.to_string()),
        _ => None,
    }
}
