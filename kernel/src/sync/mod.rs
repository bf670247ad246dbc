//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!
//! 同步原语 (Synchronization Primitives)
//!
//! - `semaphore` - 计数信号量
//! - `lock` - 不可重入的互斥锁，支持优先级捐赠
//! - `condvar` - 条件变量（Mesa 语义）
//!
//! 每个原语分两层：调度器中的状态机（`Scheduler::sema_*` 等，返回调度决定），
//! 以及面向内核代码的阻塞句柄（`Semaphore<P>` 等，负责执行切换并重试）。

pub mod condvar;
pub mod lock;
pub mod semaphore;

pub use condvar::{CondId, Condition};
pub use lock::{Lock, LockGuard, LockId};
pub use semaphore::{SemaId, Semaphore};

use spin::Mutex;

use crate::sched::Dispatch;

/// 阻塞式获取的结果
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquire {
    /// 已获取，没有阻塞
    Acquired,
    /// 当前线程已阻塞；执行切换，被唤醒后重试
    Blocked(Dispatch),
}

/// 关中断临界区
///
/// 单 CPU 上关中断后不可能出现竞争，所以获取失败只可能是重入，
/// 这是内核 bug，直接 panic。
pub struct IrqLock<T> {
    inner: Mutex<T>,
}

impl<T> IrqLock<T> {
    pub const fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(value),
        }
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut guard = match self.inner.try_lock() {
            Some(guard) => guard,
            None => panic!("critical section re-entered"),
        };
        f(&mut guard)
    }
}
