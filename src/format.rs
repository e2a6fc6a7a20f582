//! 结果的人类可读文本，供 MCP 工具返回给模型

use chrono::{DateTime, Local};

use crate::types::{SearchOutcome, SearchResult};

pub fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

/// 千分位分隔：1234567 -> 1,234,567
fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn format_time(t: &Option<DateTime<Local>>) -> String {
    t.map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "N/A".to_string())
}

pub fn format_result(r: &SearchResult) -> String {
    let mut text = format!("Path: {}\nFilename: {}", r.path, r.filename);
    if let Some(ext) = &r.extension {
        text.push_str(&format!(" ({})", ext));
    }
    text.push('\n');
    match r.size {
        Some(size) => text.push_str(&format!(
            "Size: {} bytes ({})\n",
            group_thousands(size),
            format_size(size)
        )),
        None => text.push_str("Size: N/A\n"),
    }
    text.push_str(&format!("Created: {}\n", format_time(&r.created)));
    text.push_str(&format!("Modified: {}\n", format_time(&r.modified)));
    text.push_str(&format!("Accessed: {}\n", format_time(&r.accessed)));
    if let Some(count) = r.run_count {
        text.push_str(&format!("Run count: {}\n", count));
    }
    text
}

pub fn format_outcome(outcome: &SearchOutcome) -> String {
    if outcome.entries.is_empty() {
        return if outcome.total_found > 0 {
            format!("Found {} matches", outcome.total_found)
        } else {
            "No results found".to_string()
        };
    }
    outcome
        .entries
        .iter()
        .map(format_result)
        .collect::<Vec<_>>()
        .join("\n")
}
