//! 通过 libloading 加载 Everything64.dll / Everything32.dll
//!
//! 所有导出函数在加载时一次性解析，缺任何一个都视为启动失败。

use std::path::Path;

use libloading::Library;
use tracing::info;

use super::api::EverythingApi;
use crate::error::SearchError;

type Bool = i32;
type Dword = u32;

type SetSearchW = unsafe extern "system" fn(*const u16);
type SetBool = unsafe extern "system" fn(Bool);
type SetDword = unsafe extern "system" fn(Dword);
type QueryW = unsafe extern "system" fn(Bool) -> Bool;
type GetDword = unsafe extern "system" fn() -> Dword;
type GetResultFullPathNameW = unsafe extern "system" fn(Dword, *mut u16, Dword) -> Dword;
type GetResultStrW = unsafe extern "system" fn(Dword) -> *const u16;
type GetResultSize = unsafe extern "system" fn(Dword, *mut i64) -> Bool;
type GetResultDate = unsafe extern "system" fn(Dword, *mut u64) -> Bool;
type GetResultDword = unsafe extern "system" fn(Dword) -> Dword;
type Reset = unsafe extern "system" fn();

/// Win32 长路径上限（宽字符）
const PATH_BUFFER_LEN: usize = 32_768;
const INVALID_FILE_ATTRIBUTES: u32 = 0xFFFF_FFFF;

/// 已加载的 SDK 会话；`_lib` 必须比函数指针活得久
pub struct EverythingDll {
    set_search: SetSearchW,
    set_match_path: SetBool,
    set_match_case: SetBool,
    set_match_whole_word: SetBool,
    set_regex: SetBool,
    set_sort: SetDword,
    set_max: SetDword,
    set_request_flags: SetDword,
    query: QueryW,
    get_last_error: GetDword,
    get_num_results: GetDword,
    get_full_path: GetResultFullPathNameW,
    get_file_name: GetResultStrW,
    get_extension: GetResultStrW,
    get_size: GetResultSize,
    get_date_created: GetResultDate,
    get_date_modified: GetResultDate,
    get_date_accessed: GetResultDate,
    get_attributes: GetResultDword,
    get_run_count: GetResultDword,
    get_highlighted_file_name: GetResultStrW,
    get_highlighted_path: GetResultStrW,
    reset: Reset,
    _lib: Library,
}

/// 解析单个导出函数
///
/// # Safety
/// `T` 必须与该导出函数的真实签名一致。
unsafe fn symbol<T: Copy>(lib: &Library, name: &'static str) -> Result<T, SearchError> {
    let mut raw = Vec::with_capacity(name.len() + 1);
    raw.extend_from_slice(name.as_bytes());
    raw.push(0);
    lib.get::<T>(&raw)
        .map(|s| *s)
        .map_err(|source| SearchError::LibrarySymbol { name, source })
}

impl EverythingDll {
    pub fn load(path: &Path) -> Result<Self, SearchError> {
        // SAFETY: 加载的是 Everything SDK 官方 DLL，其 DllMain 无副作用
        let lib = unsafe { Library::new(path) }.map_err(|source| SearchError::LibraryLoad {
            path: path.display().to_string(),
            source,
        })?;

        // SAFETY: 以下签名与 Everything.h 中的声明一一对应
        let dll = unsafe {
            Self {
                set_search: symbol(&lib, "Everything_SetSearchW")?,
                set_match_path: symbol(&lib, "Everything_SetMatchPath")?,
                set_match_case: symbol(&lib, "Everything_SetMatchCase")?,
                set_match_whole_word: symbol(&lib, "Everything_SetMatchWholeWord")?,
                set_regex: symbol(&lib, "Everything_SetRegex")?,
                set_sort: symbol(&lib, "Everything_SetSort")?,
                set_max: symbol(&lib, "Everything_SetMax")?,
                set_request_flags: symbol(&lib, "Everything_SetRequestFlags")?,
                query: symbol(&lib, "Everything_QueryW")?,
                get_last_error: symbol(&lib, "Everything_GetLastError")?,
                get_num_results: symbol(&lib, "Everything_GetNumResults")?,
                get_full_path: symbol(&lib, "Everything_GetResultFullPathNameW")?,
                get_file_name: symbol(&lib, "Everything_GetResultFileNameW")?,
                get_extension: symbol(&lib, "Everything_GetResultExtensionW")?,
                get_size: symbol(&lib, "Everything_GetResultSize")?,
                get_date_created: symbol(&lib, "Everything_GetResultDateCreated")?,
                get_date_modified: symbol(&lib, "Everything_GetResultDateModified")?,
                get_date_accessed: symbol(&lib, "Everything_GetResultDateAccessed")?,
                get_attributes: symbol(&lib, "Everything_GetResultAttributes")?,
                get_run_count: symbol(&lib, "Everything_GetResultRunCount")?,
                get_highlighted_file_name: symbol(&lib, "Everything_GetResultHighlightedFileNameW")?,
                get_highlighted_path: symbol(&lib, "Everything_GetResultHighlightedPathW")?,
                reset: symbol(&lib, "Everything_Reset")?,
                _lib: lib,
            }
        };

        info!("Everything SDK 已加载: {}", path.display());
        Ok(dll)
    }
}

fn to_wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

/// 读取以 0 结尾的宽字符串，空指针或空串返回 None
///
/// # Safety
/// `p` 为空或指向 SDK 持有的、以 0 结尾的 UTF-16 缓冲区。
unsafe fn from_wide_ptr(p: *const u16) -> Option<String> {
    if p.is_null() {
        return None;
    }
    let mut len = 0;
    while *p.add(len) != 0 {
        len += 1;
    }
    if len == 0 {
        return None;
    }
    Some(String::from_utf16_lossy(std::slice::from_raw_parts(p, len)))
}

impl EverythingApi for EverythingDll {
    fn set_search(&mut self, text: &str) {
        let wide = to_wide(text);
        // SAFETY: SDK 会复制该字符串
        unsafe { (self.set_search)(wide.as_ptr()) }
    }

    fn set_match_path(&mut self, enable: bool) {
        unsafe { (self.set_match_path)(enable as Bool) }
    }

    fn set_match_case(&mut self, enable: bool) {
        unsafe { (self.set_match_case)(enable as Bool) }
    }

    fn set_match_whole_word(&mut self, enable: bool) {
        unsafe { (self.set_match_whole_word)(enable as Bool) }
    }

    fn set_regex(&mut self, enable: bool) {
        unsafe { (self.set_regex)(enable as Bool) }
    }

    fn set_sort(&mut self, sort: u32) {
        unsafe { (self.set_sort)(sort) }
    }

    fn set_max(&mut self, max: u32) {
        unsafe { (self.set_max)(max) }
    }

    fn set_request_flags(&mut self, flags: u32) {
        unsafe { (self.set_request_flags)(flags) }
    }

    fn query(&mut self) -> bool {
        unsafe { (self.query)(1) != 0 }
    }

    fn last_error(&self) -> u32 {
        unsafe { (self.get_last_error)() }
    }

    fn num_results(&self) -> u32 {
        unsafe { (self.get_num_results)() }
    }

    fn result_full_path(&self, index: u32) -> Option<String> {
        let mut buf = vec![0u16; PATH_BUFFER_LEN];
        // 返回写入的字符数（不含结尾 0），0 表示失败
        let len = unsafe { (self.get_full_path)(index, buf.as_mut_ptr(), buf.len() as Dword) } as usize;
        if len == 0 {
            return None;
        }
        Some(String::from_utf16_lossy(&buf[..len.min(buf.len())]))
    }

    fn result_file_name(&self, index: u32) -> Option<String> {
        unsafe { from_wide_ptr((self.get_file_name)(index)) }
    }

    fn result_extension(&self, index: u32) -> Option<String> {
        unsafe { from_wide_ptr((self.get_extension)(index)) }
    }

    fn result_size(&self, index: u32) -> Option<i64> {
        let mut size = 0i64;
        let ok = unsafe { (self.get_size)(index, &mut size) };
        // 文件夹或未索引大小时为 -1
        (ok != 0 && size >= 0).then_some(size)
    }

    fn result_date_created(&self, index: u32) -> Option<u64> {
        read_date(self.get_date_created, index)
    }

    fn result_date_modified(&self, index: u32) -> Option<u64> {
        read_date(self.get_date_modified, index)
    }

    fn result_date_accessed(&self, index: u32) -> Option<u64> {
        read_date(self.get_date_accessed, index)
    }

    fn result_attributes(&self, index: u32) -> Option<u32> {
        let attrs = unsafe { (self.get_attributes)(index) };
        (attrs != INVALID_FILE_ATTRIBUTES).then_some(attrs)
    }

    fn result_run_count(&self, index: u32) -> Option<u32> {
        Some(unsafe { (self.get_run_count)(index) })
    }

    fn result_highlighted_file_name(&self, index: u32) -> Option<String> {
        unsafe { from_wide_ptr((self.get_highlighted_file_name)(index)) }
    }

    fn result_highlighted_path(&self, index: u32) -> Option<String> {
        unsafe { from_wide_ptr((self.get_highlighted_path)(index)) }
    }

    fn reset(&mut self) {
        unsafe { (self.reset)() }
    }
}

fn read_date(f: GetResultDate, index: u32) -> Option<u64> {
    // FILETIME 是两个 DWORD，按小端 u64 读取
    let mut ticks = 0u64;
    let ok = unsafe { f(index, &mut ticks) };
    (ok != 0).then_some(ticks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wide_round_trip() {
        let wide = to_wide("C:\\文档\\a.txt");
        assert_eq!(*wide.last().unwrap(), 0);
        let back = unsafe { from_wide_ptr(wide.as_ptr()) };
        assert_eq!(back.as_deref(), Some("C:\\文档\\a.txt"));
        assert!(unsafe { from_wide_ptr(std::ptr::null()) }.is_none());
    }

    #[test]
    fn test_missing_library_is_load_error() {
        let err = EverythingDll::load(Path::new("/nonexistent/Everything64.dll")).err().unwrap();
        assert!(matches!(err, SearchError::LibraryLoad { .. }));
        assert!(err.to_string().contains("Everything64.dll"));
    }
}
