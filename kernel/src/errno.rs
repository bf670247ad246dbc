//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!
//! 标准错误代码定义
//!
//! 调度核心只向调用者报告少数几种错误，其余不变量破坏直接 panic（系统停机）。
//! 数值与 include/uapi/asm-generic/errno.h 保持一致。

use core::fmt;

/// 标准错误代码
///
/// 使用方法：
/// ```rust
/// use kestrel::errno::Errno;
///
/// // 系统调用风格，返回负数
/// assert_eq!(Errno::OutOfMemory.as_neg_i32(), -12);
/// ```
#[repr(i32)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Errno {
    /// No such process (ESRCH, 3)
    NoSuchProcess = 3,

    /// No child process (ECHILD, 10)
    NoChild = 10,

    /// Try again (EAGAIN, 11)
    TryAgain = 11,

    /// Out of memory (ENOMEM, 12)
    OutOfMemory = 12,
}

impl Errno {
    /// 获取错误代码的正数值（用于比较）
    #[inline]
    pub const fn as_i32(self) -> i32 {
        self as i32
    }

    /// 获取错误代码的负数值（用于系统调用返回）
    #[inline]
    pub const fn as_neg_i32(self) -> i32 {
        -(self as i32)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Errno::NoSuchProcess => "no such thread",
            Errno::NoChild => "no child thread",
            Errno::TryAgain => "resource temporarily unavailable",
            Errno::OutOfMemory => "out of memory",
        }
    }
}

impl fmt::Display for Errno {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (errno {})", self.as_str(), self.as_i32())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errno_negative() {
        assert_eq!(Errno::NoSuchProcess.as_neg_i32(), -3);
        assert_eq!(Errno::OutOfMemory.as_neg_i32(), -12);
    }

    #[test]
    fn test_errno_codes() {
        assert_eq!(Errno::NoChild.as_i32(), 10);
        assert_eq!(Errno::TryAgain.as_i32(), 11);
        assert_eq!(Errno::OutOfMemory.as_i32(), 12);
    }
}
