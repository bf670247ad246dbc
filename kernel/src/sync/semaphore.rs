//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!
//! 信号量 (Semaphore) 机制
//!
//! 核心概念：
//! - P 操作 (down): 值大于 0 时减 1，否则阻塞等待
//! - V 操作 (up): 唤醒优先级最高的等待者，然后值加 1
//!
//! up 从不主动让出 CPU，被唤醒的高优先级线程在下一个抢占检查点运行。

use crate::arch::Port;
use crate::kthread::Kernel;
use crate::process::task::Tid;
use crate::process::wait::WaitQueue;
use crate::sched::Scheduler;

use super::Acquire;

/// 信号量句柄（调度器内部下标）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SemaId(pub(crate) usize);

/// 信号量状态
#[derive(Debug)]
pub struct SemaState {
    value: u32,
    waiters: WaitQueue,
}

impl Scheduler {
    fn sema(&self, id: SemaId) -> &SemaState {
        match self.semas.get(id.0) {
            Some(sema) => sema,
            None => panic!("semaphore {:?} does not exist", id),
        }
    }

    fn sema_mut(&mut self, id: SemaId) -> &mut SemaState {
        match self.semas.get_mut(id.0) {
            Some(sema) => sema,
            None => panic!("semaphore {:?} does not exist", id),
        }
    }

    pub fn sema_create(&mut self, value: u32) -> SemaId {
        SemaId(self.semas.insert(SemaState {
            value,
            waiters: WaitQueue::new(),
        }))
    }

    /// 销毁信号量，不允许还有等待者
    pub fn sema_destroy(&mut self, id: SemaId) {
        if let Some(sema) = self.semas.remove(id.0) {
            assert!(sema.waiters.is_empty(), "semaphore {:?} destroyed with waiters", id);
        }
    }

    pub fn sema_value(&self, id: SemaId) -> u32 {
        self.sema(id).value
    }

    pub fn sema_waiters(&self, id: SemaId) -> usize {
        self.sema(id).waiters.len()
    }

    /// P 操作（非阻塞）
    pub fn sema_try_down(&mut self, id: SemaId) -> bool {
        let sema = self.sema_mut(id);
        if sema.value > 0 {
            sema.value -= 1;
            true
        } else {
            false
        }
    }

    /// P 操作
    ///
    /// 值为 0 时当前线程加入等待队列并阻塞，被唤醒后由调用者重试。
    pub fn sema_down(&mut self, id: SemaId) -> Acquire {
        if self.sema_try_down(id) {
            return Acquire::Acquired;
        }
        let cur = self.current;
        self.sema_mut(id).waiters.push(cur);
        Acquire::Blocked(self.block_current())
    }

    /// V 操作，返回被唤醒的线程
    pub fn sema_up(&mut self, id: SemaId) -> Option<Tid> {
        let threads = &self.threads;
        let sema = match self.semas.get_mut(id.0) {
            Some(sema) => sema,
            None => panic!("semaphore {:?} does not exist", id),
        };
        let woken = sema
            .waiters
            .pop_highest(|tid| threads.get(&tid).map_or(i32::MIN, |t| t.priority));
        sema.value += 1;
        if let Some(tid) = woken {
            self.unblock(tid);
        }
        woken
    }
}

/// 信号量
///
/// ```no_run
/// # use kestrel::arch::hosted::HostedPort;
/// # use kestrel::kthread::Kernel;
/// # use kestrel::sched::SchedConfig;
/// # use kestrel::sync::Semaphore;
/// let kernel = Kernel::boot(HostedPort::new(), SchedConfig::default());
/// let sema = Semaphore::new(kernel, 1);
/// sema.down();  // 获取信号量
/// // ... 临界区 ...
/// sema.up();    // 释放信号量
/// ```
pub struct Semaphore<P: Port + 'static> {
    kernel: &'static Kernel<P>,
    id: SemaId,
}

impl<P: Port + 'static> Semaphore<P> {
    pub fn new(kernel: &'static Kernel<P>, value: u32) -> Self {
        let id = kernel.with(|s| s.sema_create(value));
        Self { kernel, id }
    }

    pub fn id(&self) -> SemaId {
        self.id
    }

    pub fn down(&self) {
        self.kernel.sema_down(self.id);
    }

    pub fn try_down(&self) -> bool {
        self.kernel.with(|s| s.sema_try_down(self.id))
    }

    pub fn up(&self) {
        self.kernel.with(|s| s.sema_up(self.id));
    }

    pub fn value(&self) -> u32 {
        self.kernel.with(|s| s.sema_value(self.id))
    }
}

impl<P: Port + 'static> Drop for Semaphore<P> {
    fn drop(&mut self) {
        self.kernel.with(|s| s.sema_destroy(self.id));
    }
}
