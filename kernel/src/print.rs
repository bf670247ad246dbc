//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!
//! 控制台输出与 `log` 后端
//!
//! 调度核心不直接接触串口：嵌入方通过 [`set_console`] 注册一个输出函数，
//! `print!`/`println!` 和内核日志都经由它输出。

use core::fmt;
use log::{Level, LevelFilter, Log, Metadata, Record};
use spin::RwLock;

/// 控制台输出函数
static CONSOLE: RwLock<Option<fn(&str)>> = RwLock::new(default_console());

#[cfg(feature = "hosted")]
const fn default_console() -> Option<fn(&str)> {
    Some(host_write)
}

#[cfg(not(feature = "hosted"))]
const fn default_console() -> Option<fn(&str)> {
    None
}

#[cfg(feature = "hosted")]
fn host_write(s: &str) {
    std::eprint!("{}", s);
}

/// 注册控制台输出函数
pub fn set_console(writer: fn(&str)) {
    *CONSOLE.write() = Some(writer);
}

pub struct Console;

impl fmt::Write for Console {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        if let Some(writer) = *CONSOLE.read() {
            writer(s);
        }
        Ok(())
    }
}

#[macro_export]
macro_rules! print {
    ($($arg:tt)*) => ({
        use core::fmt::Write;
        let _ = write!(&mut $crate::print::Console, $($arg)*);
    });
}

#[macro_export]
macro_rules! println {
    () => ($crate::print!("\n"));
    ($($arg:tt)*) => ({
        let mut _console = $crate::print::Console;
        let _ = ::core::fmt::Write::write_fmt(&mut _console, ::core::format_args!($($arg)*)).ok();
        let _ = ::core::fmt::Write::write_str(&mut _console, "\n").ok();
    });
}

/// 内核日志器
///
/// 输出格式：`[LEVEL] target: message`
struct KernelLogger;

static LOGGER: KernelLogger = KernelLogger;

impl Log for KernelLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let prefix = match record.level() {
            Level::Error => "[ERROR]",
            Level::Warn => "[WARN ]",
            Level::Info => "[INFO ]",
            Level::Debug => "[DEBUG]",
            Level::Trace => "[TRACE]",
        };

        crate::println!("{} {}: {}", prefix, record.target(), record.args());
    }

    fn flush(&self) {}
}

/// 安装内核日志器
///
/// 日志器全局只能安装一次，重复调用返回错误但会更新日志级别。
pub fn init_logger(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    log::set_max_level(level);
    log::set_logger(&LOGGER)
}
