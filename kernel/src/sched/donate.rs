//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!
//! 优先级捐赠
//!
//! 高优先级线程等待低优先级线程持有的锁时，把自己的优先级借给持有者，
//! 并沿着持有者自己正在等待的锁继续传递，最多 `donation_depth` 层。
//! 超过深度的部分静默截断。
//!
//! MLFQS 模式下不做捐赠。

use crate::config::{PRI_MAX, PRI_MIN};
use crate::process::task::{ThreadState, Tid};
use crate::sync::lock::LockId;

use super::sched::{Dispatch, Scheduler};

impl Scheduler {
    /// 把 `donor` 加入 `holder` 的捐赠者列表，按捐赠者优先级降序插入
    pub(crate) fn add_donor(&mut self, holder: Tid, donor: Tid) {
        let priority = self.get(donor).priority;
        let threads = &self.threads;
        let donors = match self.threads.get(&holder) {
            Some(thread) if thread.donors.contains(&donor) => return,
            Some(thread) => &thread.donors,
            None => panic!("tid {} is not a live thread", holder),
        };
        let index = donors
            .iter()
            .position(|d| threads.get(d).map_or(PRI_MIN, |t| t.priority) < priority)
            .unwrap_or(donors.len());
        self.get_mut(holder).donors.insert(index, donor);
    }

    /// 沿 `waiter` 的等待链向上捐赠优先级
    pub fn donate_priority(&mut self, waiter: Tid) {
        let priority = self.get(waiter).priority;
        let mut lock = self.get(waiter).waiting_on;

        for _ in 0..self.config.donation_depth {
            let Some(id) = lock else {
                break;
            };
            let Some(holder) = self.lock_holder(id) else {
                break;
            };
            if self.get(holder).priority < priority {
                self.set_effective_priority(holder, priority);
            }
            lock = self.get(holder).waiting_on;
        }
    }

    /// 释放锁时移除等待该锁的捐赠者
    pub fn remove_donations_for(&mut self, holder: Tid, lock: LockId) {
        let mut donors = core::mem::take(&mut self.get_mut(holder).donors);
        donors.retain(|d| self.threads.get(d).map_or(false, |t| t.waiting_on != Some(lock)));
        self.get_mut(holder).donors = donors;
    }

    /// 重新计算有效优先级：max(base, 所有捐赠者)
    pub fn refresh_priority(&mut self, tid: Tid) {
        let thread = self.get(tid);
        let donated = thread
            .donors
            .iter()
            .filter_map(|d| self.threads.get(d))
            .map(|t| t.priority)
            .max();
        let priority = match donated {
            Some(p) if p > thread.base_priority => p,
            _ => thread.base_priority,
        };
        self.set_effective_priority(tid, priority);
    }

    /// 修改有效优先级，线程在就绪队列中时重新定位
    pub(crate) fn set_effective_priority(&mut self, tid: Tid, priority: i32) {
        let thread = self.get_mut(tid);
        thread.priority = priority;
        if thread.state == ThreadState::Ready {
            self.ready.update(tid, priority);
        }
    }

    /// 设置当前线程的基础优先级
    ///
    /// MLFQS 模式下忽略。没有捐赠时有效优先级立即跟随；有捐赠时有效优先级
    /// 不低于捐赠值。优先级降低后如果就绪队列队首更高，立即让出 CPU。
    pub fn set_priority(&mut self, priority: i32) -> Dispatch {
        if self.is_mlfqs() {
            return Dispatch::Stay;
        }
        assert!(
            (PRI_MIN..=PRI_MAX).contains(&priority),
            "thread priority {} out of range",
            priority
        );

        let tid = self.current;
        self.get_mut(tid).base_priority = priority;
        self.refresh_priority(tid);
        self.donate_priority(tid);
        self.preempt_check()
    }

    /// 当前线程的有效优先级
    pub fn priority(&self) -> i32 {
        self.get(self.current).priority
    }
}
