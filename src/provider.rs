//! 后端选择：启动时按操作系统选定唯一的搜索后端，之后调用方不再关心平台

use once_cell::sync::OnceCell;
use tracing::info;

use crate::config::{SearchConfig, SDK_PATH_ENV};
use crate::error::SearchError;
use crate::everything::{EverythingApi, EverythingDll, EverythingSearcher};
use crate::external::CommandRunner;
use crate::locate::LocateSearcher;
use crate::mdfind::MdfindSearcher;
use crate::query::{Platform, SearchQuery};
use crate::types::SearchOutcome;

/// 统一的搜索能力接口
pub trait FileSearcher: Send + Sync {
    fn name(&self) -> &'static str;
    fn platform(&self) -> Platform;
    fn search(&self, query: &SearchQuery) -> Result<SearchOutcome, SearchError>;
}

impl<A: EverythingApi> FileSearcher for EverythingSearcher<A> {
    fn name(&self) -> &'static str {
        "Everything"
    }

    fn platform(&self) -> Platform {
        Platform::Windows
    }

    fn search(&self, query: &SearchQuery) -> Result<SearchOutcome, SearchError> {
        EverythingSearcher::search(self, query)
    }
}

impl<R: CommandRunner> FileSearcher for LocateSearcher<R> {
    fn name(&self) -> &'static str {
        match self.flavor() {
            crate::locate::LocateFlavor::Plocate => "plocate",
            crate::locate::LocateFlavor::Mlocate => "locate",
        }
    }

    fn platform(&self) -> Platform {
        Platform::Linux
    }

    fn search(&self, query: &SearchQuery) -> Result<SearchOutcome, SearchError> {
        LocateSearcher::search(self, query)
    }
}

impl<R: CommandRunner> FileSearcher for MdfindSearcher<R> {
    fn name(&self) -> &'static str {
        "mdfind"
    }

    fn platform(&self) -> Platform {
        Platform::MacOs
    }

    fn search(&self, query: &SearchQuery) -> Result<SearchOutcome, SearchError> {
        MdfindSearcher::search(self, query)
    }
}

/// 三种后端的封闭集合
pub enum SearchProvider {
    Everything(EverythingSearcher<EverythingDll>),
    Locate(LocateSearcher),
    Mdfind(MdfindSearcher),
}

impl SearchProvider {
    /// 按当前操作系统构造后端
    pub fn detect() -> Result<Self, SearchError> {
        Self::for_os(std::env::consts::OS, &SearchConfig::from_env())
    }

    pub fn for_os(os: &str, config: &SearchConfig) -> Result<Self, SearchError> {
        let platform =
            Platform::from_os(os).ok_or_else(|| SearchError::UnsupportedPlatform(os.to_string()))?;

        let provider = match platform {
            Platform::Windows => {
                let path = config
                    .sdk_path
                    .as_deref()
                    .ok_or(SearchError::SdkPathMissing(SDK_PATH_ENV))?;
                Self::Everything(EverythingSearcher::new(EverythingDll::load(path)?))
            }
            Platform::Linux => Self::Locate(LocateSearcher::detect()?),
            Platform::MacOs => Self::Mdfind(MdfindSearcher::detect()?),
        };
        info!("搜索后端就绪: {} ({})", provider.name(), os);
        Ok(provider)
    }

    fn inner(&self) -> &dyn FileSearcher {
        match self {
            Self::Everything(s) => s,
            Self::Locate(s) => s,
            Self::Mdfind(s) => s,
        }
    }
}

impl FileSearcher for SearchProvider {
    fn name(&self) -> &'static str {
        self.inner().name()
    }

    fn platform(&self) -> Platform {
        self.inner().platform()
    }

    fn search(&self, query: &SearchQuery) -> Result<SearchOutcome, SearchError> {
        self.inner().search(query)
    }
}

static PROVIDER: OnceCell<SearchProvider> = OnceCell::new();

/// 进程级单例：首次调用时探测并构造，失败不缓存
pub fn init() -> Result<&'static SearchProvider, SearchError> {
    PROVIDER.get_or_try_init(SearchProvider::detect)
}
