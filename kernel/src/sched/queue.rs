//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!
//! 就绪队列与睡眠队列

use alloc::vec::Vec;

use crate::process::task::Tid;

#[derive(Debug, Clone, Copy)]
struct Entry {
    tid: Tid,
    priority: i32,
    /// 入队序号，保证同优先级先进先出
    seq: u64,
}

impl Entry {
    /// `self` 是否应排在 `other` 之前
    fn precedes(&self, other: &Entry) -> bool {
        self.priority > other.priority || (self.priority == other.priority && self.seq < other.seq)
    }
}

/// 就绪队列
///
/// 按有效优先级降序排列，同优先级按入队顺序。
/// 队列中线程的优先级变化（捐赠、MLFQS 重算）通过 [`ReadyQueue::update`]
/// 重新定位，入队序号保持不变。idle 线程从不入队。
#[derive(Debug, Default)]
pub struct ReadyQueue {
    entries: Vec<Entry>,
    next_seq: u64,
}

impl ReadyQueue {
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_seq: 0,
        }
    }

    fn place(&mut self, entry: Entry) {
        let index = self.entries.partition_point(|e| e.precedes(&entry));
        self.entries.insert(index, entry);
    }

    /// 按优先级插入，排在所有同优先级线程之后
    pub fn insert(&mut self, tid: Tid, priority: i32) {
        debug_assert!(!self.contains(tid), "thread {} queued twice", tid);
        let seq = self.next_seq;
        self.next_seq += 1;
        self.place(Entry { tid, priority, seq });
    }

    /// 取出队首（优先级最高）的线程
    pub fn pop(&mut self) -> Option<Tid> {
        if self.entries.is_empty() {
            None
        } else {
            Some(self.entries.remove(0).tid)
        }
    }

    /// 队首线程及其优先级
    pub fn head(&self) -> Option<(Tid, i32)> {
        self.entries.first().map(|e| (e.tid, e.priority))
    }

    /// 线程优先级变化后重新定位，返回线程是否在队列中
    pub fn update(&mut self, tid: Tid, priority: i32) -> bool {
        match self.entries.iter().position(|e| e.tid == tid) {
            Some(index) => {
                let mut entry = self.entries.remove(index);
                entry.priority = priority;
                self.place(entry);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, tid: Tid) -> bool {
        self.entries.iter().any(|e| e.tid == tid)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 按出队顺序遍历 (tid, priority)
    pub fn iter(&self) -> impl Iterator<Item = (Tid, i32)> + '_ {
        self.entries.iter().map(|e| (e.tid, e.priority))
    }
}

/// 睡眠队列
///
/// 不排序；缓存最早的唤醒时刻，时钟中断据此跳过大多数滴答的扫描。
#[derive(Debug)]
pub struct SleepQueue {
    sleepers: Vec<(Tid, i64)>,
    next_wakeup: i64,
}

impl SleepQueue {
    pub const fn new() -> Self {
        Self {
            sleepers: Vec::new(),
            next_wakeup: i64::MAX,
        }
    }

    pub fn push(&mut self, tid: Tid, wakeup_tick: i64) {
        debug_assert!(!self.contains(tid), "thread {} sleeps twice", tid);
        self.sleepers.push((tid, wakeup_tick));
        self.next_wakeup = self.next_wakeup.min(wakeup_tick);
    }

    /// 最早的唤醒时刻，队列为空时为 `i64::MAX`
    pub fn next_wakeup(&self) -> i64 {
        self.next_wakeup
    }

    /// 取出所有 `wakeup_tick <= now` 的线程（保持睡眠顺序）
    pub fn take_due(&mut self, now: i64) -> Vec<Tid> {
        if now < self.next_wakeup {
            return Vec::new();
        }

        let mut due = Vec::new();
        let mut next_wakeup = i64::MAX;
        self.sleepers.retain(|&(tid, wakeup)| {
            if wakeup <= now {
                due.push(tid);
                false
            } else {
                next_wakeup = next_wakeup.min(wakeup);
                true
            }
        });
        self.next_wakeup = next_wakeup;
        due
    }

    pub fn contains(&self, tid: Tid) -> bool {
        self.sleepers.iter().any(|&(t, _)| t == tid)
    }

    pub fn len(&self) -> usize {
        self.sleepers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sleepers.is_empty()
    }
}

impl Default for SleepQueue {
    fn default() -> Self {
        Self::new()
    }
}
