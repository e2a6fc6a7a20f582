//! 外部索引工具（locate / mdfind）的公共部分：探测、执行、逐行 stat

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::{DateTime, Local};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::error::SearchError;
use crate::types::SearchResult;

/// 子进程输出
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

/// 执行外部命令的抽象，测试时可替换
pub trait CommandRunner: Send + Sync {
    fn run(&self, program: &Path, args: &[String]) -> std::io::Result<CommandOutput>;
}

/// 真实执行：同步等待子进程结束，不设超时
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &Path, args: &[String]) -> std::io::Result<CommandOutput> {
        let output = Command::new(program).args(args).output()?;
        Ok(CommandOutput {
            status: output.status.code(),
            stdout: decode_output(&output.stdout),
            stderr: decode_output(&output.stderr),
        })
    }
}

/// 先按 UTF-8 严格解码，失败则有损解码（非 UTF-8 文件名会出现替换字符）
pub fn decode_output(bytes: &[u8]) -> String {
    let (decoded, _, had_errors) = encoding_rs::UTF_8.decode(bytes);
    if had_errors {
        debug!("子进程输出含非 UTF-8 字节，已替换");
    }
    decoded.into_owned()
}

/// 依次尝试首选与备选可执行文件
pub fn probe<'a>(
    preferred: &'a str,
    fallback: &'a str,
    remedy: &str,
) -> Result<(PathBuf, &'a str), SearchError> {
    probe_with(preferred, fallback, remedy, |name| which::which(name).ok())
}

/// `lookup` 返回可执行文件的完整路径；结果第二项是命中的候选名
pub fn probe_with<'a>(
    preferred: &'a str,
    fallback: &'a str,
    remedy: &str,
    lookup: impl Fn(&str) -> Option<PathBuf>,
) -> Result<(PathBuf, &'a str), SearchError> {
    for name in [preferred, fallback] {
        if let Some(path) = lookup(name) {
            info!("使用 {}: {}", name, path.display());
            return Ok((path, name));
        }
    }
    Err(SearchError::ToolNotInstalled {
        tool: format!("{} / {}", preferred, fallback),
        remedy: remedy.to_string(),
    })
}

/// 按行切分输出，取前 `max_results` 个路径并补全元数据
///
/// 返回 (结果, 输出总行数)
pub fn collect_results(stdout: &str, max_results: usize) -> (Vec<SearchResult>, u64) {
    let paths: Vec<&str> = stdout
        .lines()
        .map(|l| l.trim_end_matches('\r'))
        .filter(|l| !l.trim().is_empty())
        .collect();
    let total = paths.len() as u64;

    // par_iter + collect 保持原有顺序
    let entries = paths
        .into_par_iter()
        .take(max_results)
        .map(path_to_result)
        .collect();
    (entries, total)
}

/// stat 失败（索引快照里的文件已被删除）时仍保留该行，只是没有元数据
pub fn path_to_result(path: &str) -> SearchResult {
    let mut result = SearchResult::from_path(path);
    let meta = match fs::metadata(path) {
        Ok(m) => m,
        Err(e) => {
            debug!("stat 失败 {}: {}", path, e);
            return result;
        }
    };

    result.size = Some(meta.len());
    result.created = meta.created().ok().map(DateTime::<Local>::from);
    result.modified = meta.modified().ok().map(DateTime::<Local>::from);
    result.accessed = meta.accessed().ok().map(DateTime::<Local>::from);
    result.attributes = file_attributes(&meta);
    result
}

#[cfg(unix)]
fn file_attributes(meta: &fs::Metadata) -> Option<u32> {
    use std::os::unix::fs::MetadataExt;
    Some(meta.mode())
}

#[cfg(windows)]
fn file_attributes(meta: &fs::Metadata) -> Option<u32> {
    use std::os::windows::fs::MetadataExt;
    Some(meta.file_attributes())
}

#[cfg(not(any(unix, windows)))]
fn file_attributes(_meta: &fs::Metadata) -> Option<u32> {
    None
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// 返回预设输出并记录调用参数
    #[derive(Clone, Default)]
    pub struct FakeRunner {
        pub output: CommandOutput,
        pub calls: Arc<Mutex<Vec<(PathBuf, Vec<String>)>>>,
    }

    impl FakeRunner {
        pub fn with_stdout(stdout: &str) -> Self {
            Self {
                output: CommandOutput {
                    status: Some(0),
                    stdout: stdout.to_string(),
                    stderr: String::new(),
                },
                ..Default::default()
            }
        }

        pub fn failing(status: i32, stderr: &str) -> Self {
            Self {
                output: CommandOutput {
                    status: Some(status),
                    stdout: String::new(),
                    stderr: stderr.to_string(),
                },
                ..Default::default()
            }
        }

        pub fn last_args(&self) -> Vec<String> {
            self.calls.lock().unwrap().last().map(|(_, a)| a.clone()).unwrap_or_default()
        }
    }

    impl CommandRunner for FakeRunner {
        fn run(&self, program: &Path, args: &[String]) -> std::io::Result<CommandOutput> {
            self.calls.lock().unwrap().push((program.to_path_buf(), args.to_vec()));
            Ok(self.output.clone())
        }
    }
}
