use thiserror::Error;

/// Everything SDK 错误码 (Everything_GetLastError)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EverythingErrorKind {
    Ok,
    Memory,
    Ipc,
    RegisterClassEx,
    CreateWindow,
    CreateThread,
    InvalidIndex,
    InvalidCall,
    InvalidRequest,
    InvalidParameter,
    Unknown,
}

impl EverythingErrorKind {
    pub fn from_code(code: u32) -> Self {
        match code {
            0 => Self::Ok,
            1 => Self::Memory,
            2 => Self::Ipc,
            3 => Self::RegisterClassEx,
            4 => Self::CreateWindow,
            5 => Self::CreateThread,
            6 => Self::InvalidIndex,
            7 => Self::InvalidCall,
            8 => Self::InvalidRequest,
            9 => Self::InvalidParameter,
            _ => Self::Unknown,
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Self::Ok => "SDK 报告失败但错误码为 OK",
            Self::Memory => "内存不足",
            Self::Ipc => "IPC 不可用，Everything 后台服务可能未运行",
            Self::RegisterClassEx => "注册窗口类失败",
            Self::CreateWindow => "创建窗口失败",
            Self::CreateThread => "创建线程失败",
            Self::InvalidIndex => "结果索引无效",
            Self::InvalidCall => "调用无效（查询尚未执行）",
            Self::InvalidRequest => "请求的数据无效",
            Self::InvalidParameter => "参数无效",
            Self::Unknown => "未知错误",
        }
    }
}

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("未设置环境变量 {0}，无法定位 Everything SDK 动态库")]
    SdkPathMissing(&'static str),

    #[error("加载 Everything SDK 失败 ({path}): {source}")]
    LibraryLoad {
        path: String,
        #[source]
        source: libloading::Error,
    },

    #[error("Everything SDK 缺少导出函数 {name}: {source}")]
    LibrarySymbol {
        name: &'static str,
        #[source]
        source: libloading::Error,
    },

    #[error("未安装 {tool}。{remedy}")]
    ToolNotInstalled { tool: String, remedy: String },

    #[error("不支持的平台: {0}")]
    UnsupportedPlatform(String),

    #[error("Everything 查询失败 (错误码 {code}): {}", .kind.describe())]
    Everything { code: u32, kind: EverythingErrorKind },

    #[error("{tool} 索引数据库尚未就绪，请运行: {command}")]
    DatabaseNotReady { tool: String, command: String },

    #[error("{tool} 执行失败: {stderr}")]
    CommandFailed { tool: String, stderr: String },

    #[error("无法启动 {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("查询参数无效: {0}")]
    InvalidQuery(String),
}

impl SearchError {
    pub fn everything(code: u32) -> Self {
        Self::Everything {
            code,
            kind: EverythingErrorKind::from_code(code),
        }
    }

    /// 原生错误码，仅 Everything 错误携带
    pub fn native_code(&self) -> Option<u32> {
        match self {
            Self::Everything { code, .. } => Some(*code),
            _ => None,
        }
    }
}
