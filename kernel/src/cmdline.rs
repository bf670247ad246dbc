//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!

//! 内核命令行参数解析模块
//!
//! 支持两种写法：
//! - `key=value` / 单独的标志（如 `quiet`）
//! - `-o <option>` 选项，例如 `-o mlfqs` 选择多级反馈队列调度器

use alloc::vec::Vec;

/// 命令行参数视图
#[derive(Debug, Clone, Copy)]
pub struct Cmdline<'a> {
    raw: &'a str,
}

impl<'a> Cmdline<'a> {
    pub const fn new(raw: &'a str) -> Self {
        Self { raw }
    }

    pub fn as_str(&self) -> &'a str {
        self.raw
    }

    /// 解析命令行参数，获取指定键的值
    ///
    /// # 示例
    /// ```
    /// use kestrel::cmdline::Cmdline;
    ///
    /// let cmdline = Cmdline::new("loglevel=debug -o mlfqs");
    /// assert_eq!(cmdline.get_param("loglevel"), Some("debug"));
    /// assert_eq!(cmdline.get_param("quiet"), None);
    /// ```
    pub fn get_param(&self, key: &str) -> Option<&'a str> {
        self.raw.split_whitespace().find_map(|arg| {
            let (k, v) = arg.split_once('=')?;
            if k == key { Some(v) } else { None }
        })
    }

    /// 检查是否存在某个标志（不带值的参数）
    pub fn has_param(&self, flag: &str) -> bool {
        self.raw.split_whitespace().any(|arg| arg == flag)
    }

    /// 收集所有 `-o <option>` 选项的值
    pub fn options(&self) -> Vec<&'a str> {
        let mut options = Vec::new();
        let mut args = self.raw.split_whitespace();
        while let Some(arg) = args.next() {
            if arg == "-o" {
                if let Some(value) = args.next() {
                    options.push(value);
                }
            }
        }
        options
    }

    /// 是否指定了某个 `-o` 选项
    pub fn has_option(&self, option: &str) -> bool {
        self.options().iter().any(|o| *o == option)
    }
}
