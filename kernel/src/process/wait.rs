//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!
//! 等待队列 (Wait Queue)
//!
//! 核心概念：
//! - 线程等待某个条件时，把自己的 tid 加入等待队列并阻塞
//! - 条件满足时唤醒有效优先级最高的等待者，同优先级按到达顺序
//!
//! 等待队列只保存 tid。优先级在唤醒时才读取，因为线程排队期间
//! 可能因为捐赠而改变优先级。

use alloc::vec::Vec;

use super::task::Tid;

/// 等待队列
#[derive(Debug, Default)]
pub struct WaitQueue {
    /// 按到达顺序排列的等待者
    waiters: Vec<Tid>,
}

impl WaitQueue {
    pub const fn new() -> Self {
        Self { waiters: Vec::new() }
    }

    /// 加入等待队列（已在队列中则忽略）
    pub fn push(&mut self, tid: Tid) {
        if !self.contains(tid) {
            self.waiters.push(tid);
        }
    }

    /// 取出优先级最高的等待者
    ///
    /// # 参数
    /// * `priority_of` - 查询线程当前有效优先级
    ///
    /// 多个等待者优先级相同时，先到者优先。
    pub fn pop_highest(&mut self, priority_of: impl Fn(Tid) -> i32) -> Option<Tid> {
        let mut best: Option<(usize, i32)> = None;
        for (index, &tid) in self.waiters.iter().enumerate() {
            let priority = priority_of(tid);
            if best.map_or(true, |(_, p)| priority > p) {
                best = Some((index, priority));
            }
        }
        best.map(|(index, _)| self.waiters.remove(index))
    }

    pub fn contains(&self, tid: Tid) -> bool {
        self.waiters.contains(&tid)
    }

    pub fn len(&self) -> usize {
        self.waiters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waiters.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Tid> + '_ {
        self.waiters.iter().copied()
    }
}
