//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!

//! TID 管理
//!
//! - TID 1: main 线程（启动线程）
//! - TID 2: idle 线程
//! - TID 3+: 普通线程
//!
//! TID 单调递增，不复用。

use spin::Mutex;

use crate::process::task::Tid;

pub const TID_MAX_LIMIT: Tid = 4194304; // 4M

pub const TID_INITIAL: Tid = 1;

/// TID 分配器
///
/// 分配只需要互斥，不需要关中断。
pub struct TidAllocator {
    next: Mutex<Tid>,
}

impl TidAllocator {
    /// 创建分配器，TID_INITIAL 预留给启动线程
    pub const fn new() -> Self {
        Self {
            next: Mutex::new(TID_INITIAL + 1),
        }
    }

    pub fn alloc(&self) -> Option<Tid> {
        let mut next = self.next.lock();
        if *next >= TID_MAX_LIMIT {
            None
        } else {
            let tid = *next;
            *next += 1;
            Some(tid)
        }
    }
}

impl Default for TidAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monotonic() {
        let tids = TidAllocator::new();
        assert_eq!(tids.alloc(), Some(TID_INITIAL + 1));
        assert_eq!(tids.alloc(), Some(TID_INITIAL + 2));
        assert_eq!(tids.alloc(), Some(TID_INITIAL + 3));
    }
}
