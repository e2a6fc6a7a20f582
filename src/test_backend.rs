use serde_json::{json, Value};

use starsearch_mcp::{provider, FileSearcher};

fn main() {
    starsearch_mcp::init_tracing();
    println!("=== 搜索后端深度测试 (自动化场景验证) ===");

    let searcher = match provider::init() {
        Ok(s) => s,
        Err(e) => {
            println!("错误: 后端未就绪: {}", e);
            return;
        }
    };
    println!("后端状态: {} ({})", searcher.name(), std::env::consts::OS);

    // 场景 1: 普通关键词，验证路径与后缀完整性
    test_scenario(searcher, "通用关键词: log", json!({ "query": "log", "max_results": 10 }));

    // 场景 2: 上限钳制
    test_scenario(searcher, "结果上限: 5", json!({ "query": "lib", "max_results": 5 }));

    // 场景 3: 各平台专属参数
    let (name, args) = match std::env::consts::OS {
        "windows" => (
            "Everything: 按大小降序",
            json!({ "query": "ext:dll", "max_results": 10, "sort_by": "SIZE_DESC" }),
        ),
        "macos" => (
            "mdfind: 限定目录",
            json!({ "query": "readme", "mac_params": { "search_directory": "/Applications" } }),
        ),
        _ => (
            "locate: 仅存在的文件",
            json!({ "query": "bin", "max_results": 10, "linux_params": { "existing_files": true } }),
        ),
    };
    test_scenario(searcher, name, args);

    // 场景 4: 正则
    test_scenario(
        searcher,
        "正则: 以 .conf 结尾",
        json!({ "query": "\\.conf$", "max_results": 10, "match_regex": true }),
    );

    // 场景 5: 非法参数应直接报错
    test_scenario(searcher, "非法参数: max_results=0", json!({ "query": "x", "max_results": 0 }));

    println!("\n=== 所有场景测试完成 ===");
}

fn test_scenario(searcher: &dyn FileSearcher, name: &str, args: Value) {
    println!("\n[场景测试] {}", name);
    println!("参数: {}", args);

    let outcome = match starsearch_mcp::search_with(searcher, &args) {
        Ok(o) => o,
        Err(e) => {
            println!("  >>> [结论] 搜索返回错误: {}", e);
            return;
        }
    };
    println!(
        "获取结果: {} 条 (共 {} 条匹配, {}ms)",
        outcome.entries.len(),
        outcome.total_found,
        outcome.elapsed_ms
    );

    let mut fail_count = 0;
    for (i, res) in outcome.entries.iter().take(10).enumerate() {
        // 核心校验 1: 路径是否存在 (验证解析出的路径是否被截断或损坏)
        let exists = std::path::Path::new(&res.path).exists();
        let status = if exists { "✅ 正常" } else { "❌ 路径损坏/不存在" };

        if !exists {
            fail_count += 1;
        }

        println!("  {}. {}", i + 1, res.filename);
        println!("     路径: {}", res.path);
        println!("     状态: {}", status);

        // 核心校验 2: 后缀名是否丢失
        if res.extension.is_none() && res.filename.contains('.') && !res.filename.starts_with('.') {
            println!("     ⚠️ 警告: 文件名看起来有后缀但解析结果丢失 extension");
        }
    }

    if fail_count > 0 {
        println!("  >>> [结论] 场景测试失败: 存在 {} 个损坏路径", fail_count);
    } else if outcome.entries.is_empty() {
        println!("  >>> [结论] 场景测试跳过: 未找到匹配项");
    } else {
        println!("  >>> [结论] 场景测试通过");
    }
}
