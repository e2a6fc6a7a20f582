use std::path::PathBuf;

/// Everything SDK 动态库路径（Everything64.dll / Everything32.dll）
pub const SDK_PATH_ENV: &str = "EVERYTHING_SDK_PATH";

/// 单次搜索结果数上限
pub const MAX_RESULTS_LIMIT: usize = 1000;

/// 未指定或无法解析时的默认结果数
pub const DEFAULT_MAX_RESULTS: usize = 100;

/// 服务名（MCP serverInfo）
pub const SERVER_NAME: &str = "universal-search";

/// 外部工具候选：优先 / 备选
pub const LOCATE_CANDIDATES: (&str, &str) = ("plocate", "locate");
pub const MDFIND_CANDIDATES: (&str, &str) = ("mdfind", "/usr/bin/mdfind");

/// locate 数据库缺失时提示的修复命令
pub const LOCATE_REBUILD_COMMAND: &str = "sudo updatedb";
/// Spotlight 索引关闭时提示的修复命令
pub const MDFIND_REINDEX_COMMAND: &str = "sudo mdutil -i on /";

pub const LOCATE_INSTALL_HINT: &str = "请安装其中之一:\n\
Ubuntu/Debian: sudo apt-get install plocate\n\
              或 sudo apt-get install mlocate\n\
Fedora: sudo dnf install mlocate\n\
安装后数据库会自动更新，也可手动运行: sudo updatedb";

pub const MDFIND_INSTALL_HINT: &str = "mdfind 随 macOS 自带，请确认 /usr/bin/mdfind 存在且 Spotlight 未被禁用";

/// 启动时从环境读取的配置
#[derive(Debug, Clone, Default)]
pub struct SearchConfig {
    pub sdk_path: Option<PathBuf>,
}

impl SearchConfig {
    pub fn from_env() -> Self {
        let sdk_path = std::env::var_os(SDK_PATH_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        Self { sdk_path }
    }
}
