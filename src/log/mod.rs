//! 日志模块，支持在不同环境下的日志打印
//! - QEMU / 调试器环境：使用cortex-m-semihosting的hprint
//! - 测试环境：使用标准库的print
//! - 其他环境：空操作
//!
//! 日志宏可以在完成回调（中断上下文）中使用，写入过程不会阻塞等待。

use core::fmt::{self, Write};
use core::sync::atomic::{AtomicUsize, Ordering};

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(usize)]
pub enum LogLevel {
    /// 错误级别
    Error = 0,
    /// 警告级别
    Warn = 1,
    /// 信息级别
    Info = 2,
    /// 调试级别
    Debug = 3,
    /// 跟踪级别
    Trace = 4,
}

impl LogLevel {
    const fn from_usize(value: usize) -> Self {
        match value {
            0 => LogLevel::Error,
            1 => LogLevel::Warn,
            2 => LogLevel::Info,
            3 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }
}

/// 全局日志级别，默认为Info
static GLOBAL_LOG_LEVEL: AtomicUsize = AtomicUsize::new(LogLevel::Info as usize);

/// 设置全局日志级别
pub fn set_log_level(level: LogLevel) {
    GLOBAL_LOG_LEVEL.store(level as usize, Ordering::Relaxed);
}

/// 获取全局日志级别
pub fn get_log_level() -> LogLevel {
    LogLevel::from_usize(GLOBAL_LOG_LEVEL.load(Ordering::Relaxed))
}

/// semihosting 输出
#[cfg(all(feature = "cortex_m3", not(test)))]
#[inline(always)]
pub fn log_write(s: &str) -> fmt::Result {
    cortex_m_semihosting::hprint!("{}", s);
    Ok(())
}

/// 测试环境与无调试输出的环境
#[cfg(any(test, not(feature = "cortex_m3")))]
#[inline(always)]
pub fn log_write(_s: &str) -> fmt::Result {
    #[cfg(test)]
    print!("{}", _s);
    Ok(())
}

/// 打印日志的宏，根据日志级别打印
#[macro_export]
macro_rules! log {
    ($level:expr, $($arg:tt)*) => {
        {
            if $level as usize <= $crate::log::get_log_level() as usize {
                use core::fmt::Write;
                let mut writer = $crate::log::LogWriter;
                let _ = write!(writer, $($arg)*);
            }
        }
    };
}

/// 日志写入器
pub struct LogWriter;

impl Write for LogWriter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        log_write(s)
    }
}

/// 错误级别日志
#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {{
        $crate::log!($crate::log::LogLevel::Error, "[ERROR] ");
        $crate::log!($crate::log::LogLevel::Error, $($arg)*);
        $crate::log!($crate::log::LogLevel::Error, "\n");
    }};
}

/// 警告级别日志
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {{
        $crate::log!($crate::log::LogLevel::Warn, "[WARN] ");
        $crate::log!($crate::log::LogLevel::Warn, $($arg)*);
        $crate::log!($crate::log::LogLevel::Warn, "\n");
    }};
}

/// 信息级别日志
#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {{
        $crate::log!($crate::log::LogLevel::Info, "[INFO] ");
        $crate::log!($crate::log::LogLevel::Info, $($arg)*);
        $crate::log!($crate::log::LogLevel::Info, "\n");
    }};
}

/// 调试级别日志
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {{
        $crate::log!($crate::log::LogLevel::Debug, "[DEBUG] ");
        $crate::log!($crate::log::LogLevel::Debug, $($arg)*);
        $crate::log!($crate::log::LogLevel::Debug, "\n");
    }};
}

/// 跟踪级别日志
#[macro_export]
macro_rules! trace {
    ($($arg:tt)*) => {{
        $crate::log!($crate::log::LogLevel::Trace, "[TRACE] ");
        $crate::log!($crate::log::LogLevel::Trace, $($arg)*);
        $crate::log!($crate::log::LogLevel::Trace, "\n");
    }};
}
