//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!
//! 互斥锁
//!
//! 锁是容量为 1 的信号量加上持有者。与信号量不同：
//! - 只能由持有者释放
//! - 不可重入，持有者再次获取是内核 bug
//! - 竞争时向持有者捐赠优先级（MLFQS 模式除外）

use crate::arch::Port;
use crate::kthread::Kernel;
use crate::process::task::Tid;
use crate::sched::{Dispatch, Scheduler};

use super::semaphore::SemaId;
use super::Acquire;

/// 锁句柄（调度器内部下标）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LockId(pub(crate) usize);

/// 锁状态
#[derive(Debug)]
pub struct LockState {
    holder: Option<Tid>,
    sema: SemaId,
}

impl Scheduler {
    fn lock_state(&self, id: LockId) -> &LockState {
        match self.locks.get(id.0) {
            Some(lock) => lock,
            None => panic!("lock {:?} does not exist", id),
        }
    }

    fn lock_state_mut(&mut self, id: LockId) -> &mut LockState {
        match self.locks.get_mut(id.0) {
            Some(lock) => lock,
            None => panic!("lock {:?} does not exist", id),
        }
    }

    pub fn lock_create(&mut self) -> LockId {
        let sema = self.sema_create(1);
        LockId(self.locks.insert(LockState { holder: None, sema }))
    }

    pub fn lock_destroy(&mut self, id: LockId) {
        if let Some(lock) = self.locks.remove(id.0) {
            assert!(lock.holder.is_none(), "lock {:?} destroyed while held", id);
            self.sema_destroy(lock.sema);
        }
    }

    pub fn lock_holder(&self, id: LockId) -> Option<Tid> {
        self.lock_state(id).holder
    }

    pub fn lock_held_by_current(&self, id: LockId) -> bool {
        self.lock_state(id).holder == Some(self.current)
    }

    /// 获取锁
    ///
    /// 锁被占用时记录等待关系、向持有者捐赠优先级，然后阻塞。
    /// 被唤醒后重试是幂等的：锁若已被他人抢先获取，重新向新持有者捐赠。
    pub fn lock_acquire(&mut self, id: LockId) -> Acquire {
        let cur = self.current;
        let lock = self.lock_state(id);
        assert_ne!(lock.holder, Some(cur), "thread {} acquiring lock {:?} it already holds", cur, id);
        let holder = lock.holder;
        let sema = lock.sema;

        if let Some(holder) = holder {
            if !self.is_mlfqs() {
                self.get_mut(cur).waiting_on = Some(id);
                self.add_donor(holder, cur);
                self.donate_priority(cur);
            }
        }

        match self.sema_down(sema) {
            Acquire::Acquired => {
                self.get_mut(cur).waiting_on = None;
                self.lock_state_mut(id).holder = Some(cur);
                Acquire::Acquired
            }
            blocked => blocked,
        }
    }

    /// 非阻塞获取锁
    pub fn lock_try_acquire(&mut self, id: LockId) -> bool {
        let cur = self.current;
        let lock = self.lock_state(id);
        assert_ne!(lock.holder, Some(cur), "thread {} acquiring lock {:?} it already holds", cur, id);
        let sema = lock.sema;
        if self.sema_try_down(sema) {
            self.lock_state_mut(id).holder = Some(cur);
            true
        } else {
            false
        }
    }

    /// 释放锁
    ///
    /// 撤销等待该锁的捐赠并恢复优先级，唤醒一个等待者；
    /// 如果因此低于就绪队列队首，让出 CPU。
    pub fn lock_release(&mut self, id: LockId) -> Dispatch {
        let cur = self.current;
        let lock = self.lock_state_mut(id);
        assert_eq!(lock.holder, Some(cur), "lock {:?} released by thread {} that does not hold it", id, cur);
        lock.holder = None;
        let sema = lock.sema;

        if !self.is_mlfqs() {
            self.remove_donations_for(cur, id);
            self.refresh_priority(cur);
        }

        self.sema_up(sema);
        self.preempt_check()
    }
}

/// 互斥锁
pub struct Lock<P: Port + 'static> {
    kernel: &'static Kernel<P>,
    pub(crate) id: LockId,
}

impl<P: Port + 'static> Lock<P> {
    pub fn new(kernel: &'static Kernel<P>) -> Self {
        let id = kernel.with(|s| s.lock_create());
        Self { kernel, id }
    }

    pub fn id(&self) -> LockId {
        self.id
    }

    pub fn acquire(&self) {
        loop {
            match self.kernel.with(|s| s.lock_acquire(self.id)) {
                Acquire::Acquired => return,
                Acquire::Blocked(dispatch) => self.kernel.dispatch(dispatch),
            }
        }
    }

    pub fn try_acquire(&self) -> bool {
        self.kernel.with(|s| s.lock_try_acquire(self.id))
    }

    pub fn release(&self) {
        let dispatch = self.kernel.with(|s| s.lock_release(self.id));
        self.kernel.dispatch(dispatch);
    }

    pub fn held_by_current(&self) -> bool {
        self.kernel.with(|s| s.lock_held_by_current(self.id))
    }

    /// 获取锁并返回守卫，守卫析构时释放
    pub fn lock(&self) -> LockGuard<'_, P> {
        self.acquire();
        LockGuard { lock: self }
    }
}

impl<P: Port + 'static> Drop for Lock<P> {
    fn drop(&mut self) {
        self.kernel.with(|s| s.lock_destroy(self.id));
    }
}

/// 锁守卫
pub struct LockGuard<'a, P: Port + 'static> {
    lock: &'a Lock<P>,
}

impl<P: Port + 'static> Drop for LockGuard<'_, P> {
    fn drop(&mut self) {
        self.lock.release();
    }
}
