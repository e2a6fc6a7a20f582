/// 控制台输出设置：UTF-8 代码页 + 虚拟终端序列
#[cfg(target_os = "windows")]
pub fn configure() {
    use windows::Win32::System::Console::{
        GetConsoleMode, GetStdHandle, SetConsoleMode, SetConsoleOutputCP, CONSOLE_MODE,
        ENABLE_VIRTUAL_TERMINAL_PROCESSING, STD_OUTPUT_HANDLE,
    };
    const CP_UTF8: u32 = 65001;

    unsafe {
        // 中文路径在默认 GBK 代码页下会乱码
        let _ = SetConsoleOutputCP(CP_UTF8);

        if let Ok(handle) = GetStdHandle(STD_OUTPUT_HANDLE) {
            let mut mode = CONSOLE_MODE(0);
            // stdout 被重定向为管道时 GetConsoleMode 失败，直接跳过
            if GetConsoleMode(handle, &mut mode).is_ok() {
                let _ = SetConsoleMode(handle, mode | ENABLE_VIRTUAL_TERMINAL_PROCESSING);
            }
        }
    }
}

#[cfg(not(target_os = "windows"))]
pub fn configure() {}
