//! Windows FILETIME (1601-01-01 起的 100ns 刻度) 与本地时间互转

use chrono::{DateTime, Local, TimeZone, Utc};

/// 每秒刻度数
pub const TICKS_PER_SECOND: i64 = 10_000_000;

/// 1601-01-01 到 1970-01-01 的秒数
pub const EPOCH_DIFF_SECONDS: i64 = 11_644_473_600;

/// 1970-01-01 对应的 FILETIME 刻度
pub const TICKS_TO_POSIX_EPOCH: i64 = EPOCH_DIFF_SECONDS * TICKS_PER_SECOND;

/// 0 与全 1 都表示"无此字段"，不能解码成 1601 年
pub fn filetime_to_local(ticks: u64) -> Option<DateTime<Local>> {
    if ticks == 0 || ticks == u64::MAX {
        return None;
    }
    let ticks = i64::try_from(ticks).ok()?;
    let since_posix = ticks - TICKS_TO_POSIX_EPOCH;
    let secs = since_posix.div_euclid(TICKS_PER_SECOND);
    let nanos = (since_posix.rem_euclid(TICKS_PER_SECOND) * 100) as u32;
    Utc.timestamp_opt(secs, nanos)
        .single()
        .map(|t| t.with_timezone(&Local))
}

/// 逆向编码，亚刻度部分截断
pub fn filetime_from_datetime(time: &DateTime<Local>) -> u64 {
    let secs = time.timestamp();
    let sub_ticks = i64::from(time.timestamp_subsec_nanos()) / 100;
    (secs * TICKS_PER_SECOND + sub_ticks + TICKS_TO_POSIX_EPOCH) as u64
}
