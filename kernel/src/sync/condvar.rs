//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!
//! 条件变量 (Condition Variable)
//!
//! Mesa 语义：signal 只是把等待者放回就绪队列，等待者醒来后重新获取锁，
//! 条件可能已经变化，调用者需要循环检查。
//!
//! 每个等待者有一个私有的信号量，signal 唤醒优先级最高的等待者。

use alloc::vec::Vec;

use crate::arch::Port;
use crate::kthread::Kernel;
use crate::process::task::Tid;
use crate::sched::{Dispatch, Scheduler};

use super::lock::{Lock, LockId};
use super::semaphore::SemaId;

/// 条件变量句柄（调度器内部下标）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CondId(pub(crate) usize);

/// 条件变量状态：(等待线程, 私有信号量)，按到达顺序
#[derive(Debug, Default)]
pub struct CondState {
    waiters: Vec<(Tid, SemaId)>,
}

impl Scheduler {
    fn cond_state_mut(&mut self, id: CondId) -> &mut CondState {
        match self.conds.get_mut(id.0) {
            Some(cond) => cond,
            None => panic!("condition {:?} does not exist", id),
        }
    }

    pub fn cond_create(&mut self) -> CondId {
        CondId(self.conds.insert(CondState::default()))
    }

    pub fn cond_destroy(&mut self, id: CondId) {
        if let Some(cond) = self.conds.remove(id.0) {
            assert!(cond.waiters.is_empty(), "condition {:?} destroyed with waiters", id);
        }
    }

    pub fn cond_waiters(&self, id: CondId) -> usize {
        self.conds.get(id.0).map_or(0, |c| c.waiters.len())
    }

    /// 开始等待：登记私有信号量并释放锁
    ///
    /// 调用者随后执行返回的调度决定，down 私有信号量，销毁它，再重新获取锁。
    pub fn cond_wait(&mut self, id: CondId, lock: LockId) -> (SemaId, Dispatch) {
        assert!(self.lock_held_by_current(lock), "condition wait without holding lock {:?}", lock);
        let cur = self.current;
        let sema = self.sema_create(0);
        self.cond_state_mut(id).waiters.push((cur, sema));
        (sema, self.lock_release(lock))
    }

    /// 唤醒一个优先级最高的等待者（同优先级先到先醒）
    pub fn cond_signal(&mut self, id: CondId, lock: LockId) -> Option<Tid> {
        assert!(self.lock_held_by_current(lock), "condition signal without holding lock {:?}", lock);
        let threads = &self.threads;
        let cond = match self.conds.get_mut(id.0) {
            Some(cond) => cond,
            None => panic!("condition {:?} does not exist", id),
        };

        let mut best: Option<(usize, i32)> = None;
        for (index, (tid, _)) in cond.waiters.iter().enumerate() {
            let priority = threads.get(tid).map_or(i32::MIN, |t| t.priority);
            if best.map_or(true, |(_, p)| priority > p) {
                best = Some((index, priority));
            }
        }

        let (index, _) = best?;
        let (tid, sema) = cond.waiters.remove(index);
        self.sema_up(sema);
        Some(tid)
    }

    /// 唤醒所有等待者，返回唤醒数量
    pub fn cond_broadcast(&mut self, id: CondId, lock: LockId) -> usize {
        let mut woken = 0;
        while self.cond_signal(id, lock).is_some() {
            woken += 1;
        }
        woken
    }
}

/// 条件变量
pub struct Condition<P: Port + 'static> {
    kernel: &'static Kernel<P>,
    id: CondId,
}

impl<P: Port + 'static> Condition<P> {
    pub fn new(kernel: &'static Kernel<P>) -> Self {
        let id = kernel.with(|s| s.cond_create());
        Self { kernel, id }
    }

    pub fn id(&self) -> CondId {
        self.id
    }

    /// 释放 `lock` 并等待信号，返回前重新获取 `lock`
    pub fn wait(&self, lock: &Lock<P>) {
        let (sema, dispatch) = self.kernel.with(|s| s.cond_wait(self.id, lock.id));
        self.kernel.dispatch(dispatch);
        self.kernel.sema_down(sema);
        self.kernel.with(|s| s.sema_destroy(sema));
        lock.acquire();
    }

    pub fn signal(&self, lock: &Lock<P>) {
        self.kernel.with(|s| s.cond_signal(self.id, lock.id));
    }

    pub fn broadcast(&self, lock: &Lock<P>) {
        self.kernel.with(|s| s.cond_broadcast(self.id, lock.id));
    }
}

impl<P: Port + 'static> Drop for Condition<P> {
    fn drop(&mut self) {
        self.kernel.with(|s| s.cond_destroy(self.id));
    }
}
