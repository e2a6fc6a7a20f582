/// Everything SDK 入口函数的类型化封装
///
/// SDK 内部维护一份进程级的全局搜索状态，任意时刻只有一组配置生效，
/// 因此实现者无需自身可重入，由 `EverythingSearcher` 负责串行化。
/// 每个方法对应一个导出函数，结果字段读取失败用 `None` 表示。
pub trait EverythingApi: Send {
    fn set_search(&mut self, text: &str);
    fn set_match_path(&mut self, enable: bool);
    fn set_match_case(&mut self, enable: bool);
    fn set_match_whole_word(&mut self, enable: bool);
    fn set_regex(&mut self, enable: bool);
    fn set_sort(&mut self, sort: u32);
    fn set_max(&mut self, max: u32);
    fn set_request_flags(&mut self, flags: u32);

    /// 同步执行查询 (Everything_QueryW(TRUE))
    fn query(&mut self) -> bool;
    fn last_error(&self) -> u32;
    fn num_results(&self) -> u32;

    fn result_full_path(&self, index: u32) -> Option<String>;
    fn result_file_name(&self, index: u32) -> Option<String>;
    fn result_extension(&self, index: u32) -> Option<String>;
    fn result_size(&self, index: u32) -> Option<i64>;
    /// 原始 FILETIME 刻度
    fn result_date_created(&self, index: u32) -> Option<u64>;
    fn result_date_modified(&self, index: u32) -> Option<u64>;
    fn result_date_accessed(&self, index: u32) -> Option<u64>;
    fn result_attributes(&self, index: u32) -> Option<u32>;
    fn result_run_count(&self, index: u32) -> Option<u32>;
    fn result_highlighted_file_name(&self, index: u32) -> Option<String>;
    fn result_highlighted_path(&self, index: u32) -> Option<String>;

    /// 清空 SDK 内部搜索状态
    fn reset(&mut self);
}
