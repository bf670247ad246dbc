//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!
//! 多级反馈队列调度 (MLFQS)
//!
//! 优先级完全由 nice 与 recent_cpu 决定：
//!
//! ```text
//! priority   = PRI_MAX - recent_cpu / 4 - nice * 2
//! recent_cpu = (2 * load_avg) / (2 * load_avg + 1) * recent_cpu + nice
//! load_avg   = (59 / 60) * load_avg + (1 / 60) * ready_threads
//! ```
//!
//! - 每个滴答：运行线程 recent_cpu 加 1，并重算其优先级
//! - 每秒：先更新 load_avg，再重算所有线程的 recent_cpu 和优先级
//!
//! idle 线程不参与计算。

use crate::config::{NICE_MAX, NICE_MIN, PRI_MAX, PRI_MIN};
use crate::fixed_point::Fixed;
use crate::process::task::Tid;

use super::sched::{Dispatch, Scheduler};

/// 根据 recent_cpu 与 nice 计算优先级，结果截断到合法范围
pub(crate) fn priority_of(recent_cpu: Fixed, nice: i32) -> i32 {
    let priority = (Fixed::from_int(PRI_MAX) - recent_cpu / 4 - nice * 2).to_int_round();
    priority.clamp(PRI_MIN, PRI_MAX)
}

impl Scheduler {
    /// 时钟中断中的 MLFQS 计算
    pub(crate) fn mlfqs_tick(&mut self) {
        self.mlfqs_increment();
        if self.ticks % self.config.timer_freq == 0 {
            self.mlfqs_load_avg();
            self.mlfqs_recalc();
        } else {
            self.mlfqs_priority(self.current);
        }
    }

    fn is_idle_thread(&self, tid: Tid) -> bool {
        self.idle == Some(tid)
    }

    /// 运行线程 recent_cpu 加 1
    fn mlfqs_increment(&mut self) {
        let cur = self.current;
        if !self.is_idle_thread(cur) {
            let thread = self.get_mut(cur);
            thread.recent_cpu = thread.recent_cpu + 1;
        }
    }

    fn mlfqs_load_avg(&mut self) {
        let running = if self.is_idle_thread(self.current) { 0 } else { 1 };
        let ready_threads = self.ready.len() as i32 + running;
        self.load_avg = Fixed::from_int(59) / 60 * self.load_avg
            + Fixed::from_int(1) / 60 * ready_threads;
        debug_assert!(self.load_avg >= Fixed::ZERO, "load_avg went negative");
    }

    fn mlfqs_recent_cpu(&mut self, tid: Tid) {
        if self.is_idle_thread(tid) {
            return;
        }
        let twice_load = self.load_avg * 2;
        let coefficient = twice_load / (twice_load + 1);
        let thread = self.get_mut(tid);
        thread.recent_cpu = coefficient * thread.recent_cpu + thread.nice;
    }

    fn mlfqs_priority(&mut self, tid: Tid) {
        if self.is_idle_thread(tid) {
            return;
        }
        let thread = self.get_mut(tid);
        let priority = priority_of(thread.recent_cpu, thread.nice);
        thread.base_priority = priority;
        self.set_effective_priority(tid, priority);
    }

    /// 每秒重算所有已注册线程
    fn mlfqs_recalc(&mut self) {
        let tids = self.all_list.clone();
        for tid in tids {
            self.mlfqs_recent_cpu(tid);
            self.mlfqs_priority(tid);
        }
    }

    /// 设置当前线程的 nice 值
    ///
    /// MLFQS 模式下立即重算优先级，就绪队列队首更高时让出 CPU。
    pub fn set_nice(&mut self, nice: i32) -> Dispatch {
        assert!((NICE_MIN..=NICE_MAX).contains(&nice), "nice {} out of range", nice);
        let cur = self.current;
        self.get_mut(cur).nice = nice;
        if self.is_mlfqs() {
            self.mlfqs_priority(cur);
        }
        self.preempt_check()
    }

    pub fn nice(&self) -> i32 {
        self.get(self.current).nice
    }

    /// 系统负载的 100 倍（四舍五入）
    pub fn load_avg_x100(&self) -> i32 {
        (self.load_avg * 100).to_int_round()
    }

    /// 当前线程 recent_cpu 的 100 倍（四舍五入）
    pub fn recent_cpu_x100(&self) -> i32 {
        (self.get(self.current).recent_cpu * 100).to_int_round()
    }

    pub fn load_avg(&self) -> Fixed {
        self.load_avg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_formula() {
        assert_eq!(priority_of(Fixed::ZERO, 0), PRI_MAX);
        assert_eq!(priority_of(Fixed::from_int(40), 0), PRI_MAX - 10);
        assert_eq!(priority_of(Fixed::ZERO, 5), PRI_MAX - 10);
        // 63 - 6 / 4 = 61.5，四舍五入为 62
        assert_eq!(priority_of(Fixed::from_int(6), 0), PRI_MAX - 1);
    }

    #[test]
    fn test_priority_clamped() {
        assert_eq!(priority_of(Fixed::from_int(1000), 20), PRI_MIN);
        assert_eq!(priority_of(Fixed::ZERO, -20), PRI_MAX);
    }
}
