//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!
//! 调度器核心
//!
//! `Scheduler` 是一个纯状态机：线程表、就绪队列、睡眠队列以及同步原语的
//! 状态都在这里。持有 `&mut Scheduler` 即等价于"已关中断"。
//!
//! 调度入口: yield_current()/block_current()/exit_current() -> schedule()
//!
//! `schedule()` 不做物理上下文切换，只返回 [`Dispatch`]。调用者负责切换栈，
//! 然后在新线程的上下文里调用 [`Scheduler::finish_switch`]。

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use crate::cmdline::Cmdline;
use crate::collection::Slab;
use crate::config::{
    DONATION_MAX_DEPTH, ENABLE_MLFQS, MAX_THREADS, PRI_DEFAULT, PRI_MAX, PRI_MIN, TIMER_FREQ,
    TIME_SLICE_TICKS,
};
use crate::errno::Errno;
use crate::fixed_point::Fixed;
use crate::process::child::ChildRecord;
use crate::process::task::{Thread, ThreadFlags, ThreadState, Tid};
use crate::sync::condvar::CondState;
use crate::sync::lock::LockState;
use crate::sync::semaphore::SemaState;

use super::mlfqs;
use super::queue::{ReadyQueue, SleepQueue};
use super::tid::{TidAllocator, TID_INITIAL};

/// 调度策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedPolicy {
    /// 严格优先级 + 优先级捐赠
    Priority,
    /// 多级反馈队列
    Mlfqs,
}

/// 调度器运行时参数
#[derive(Debug, Clone, Copy)]
pub struct SchedConfig {
    pub policy: SchedPolicy,
    /// 时间片长度（滴答）
    pub time_slice: u32,
    /// 每秒滴答数
    pub timer_freq: i64,
    /// 线程描述符上限
    pub max_threads: usize,
    /// 捐赠链最大深度
    pub donation_depth: usize,
}

impl Default for SchedConfig {
    fn default() -> Self {
        Self {
            policy: if ENABLE_MLFQS { SchedPolicy::Mlfqs } else { SchedPolicy::Priority },
            time_slice: TIME_SLICE_TICKS,
            timer_freq: TIMER_FREQ,
            max_threads: MAX_THREADS,
            donation_depth: DONATION_MAX_DEPTH,
        }
    }
}

impl SchedConfig {
    /// 从启动命令行构造配置，`-o mlfqs` 选择 MLFQS
    pub fn from_cmdline(cmdline: &str) -> Self {
        let mut config = Self::default();
        if Cmdline::new(cmdline).has_option("mlfqs") {
            config.policy = SchedPolicy::Mlfqs;
        }
        config
    }

    pub fn with_policy(mut self, policy: SchedPolicy) -> Self {
        self.policy = policy;
        self
    }
}

/// 调度决定
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// 当前线程继续运行，切换后处理已经完成
    Stay,
    /// 从 `prev` 切换到 `next`；切换完成后由 `next` 调用 `finish_switch(Some(prev))`
    Switch { prev: Tid, next: Tid },
}

/// 时钟滴答统计
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickStats {
    pub idle_ticks: u64,
    pub kernel_ticks: u64,
    pub user_ticks: u64,
}

/// 调度器状态
pub struct Scheduler {
    pub(crate) config: SchedConfig,
    /// 线程表：所有尚未回收的描述符
    pub(crate) threads: BTreeMap<Tid, Thread>,
    /// 已注册（未退出）的线程，按创建顺序
    pub(crate) all_list: Vec<Tid>,
    pub(crate) ready: ReadyQueue,
    pub(crate) sleepers: SleepQueue,
    tids: TidAllocator,
    pub(crate) current: Tid,
    pub(crate) idle: Option<Tid>,
    /// 启动以来的滴答数
    pub(crate) ticks: i64,
    /// 当前线程自上次切换以来的滴答数
    thread_ticks: u32,
    pub(crate) load_avg: Fixed,
    stats: TickStats,
    pub(crate) semas: Slab<SemaState>,
    pub(crate) locks: Slab<LockState>,
    pub(crate) conds: Slab<CondState>,
}

impl Scheduler {
    /// 初始化调度器，把调用者的执行上下文登记为 main 线程
    pub fn new(config: SchedConfig) -> Self {
        let mut main = Thread::new(TID_INITIAL, "main", PRI_DEFAULT);
        main.state = ThreadState::Running;
        main.flags = ThreadFlags::INITIAL;
        if config.policy == SchedPolicy::Mlfqs {
            let priority = mlfqs::priority_of(main.recent_cpu, main.nice);
            main.priority = priority;
            main.base_priority = priority;
        }

        let mut threads = BTreeMap::new();
        threads.insert(TID_INITIAL, main);

        log::debug!("sched: init, policy {:?}", config.policy);

        Self {
            config,
            threads,
            all_list: alloc::vec![TID_INITIAL],
            ready: ReadyQueue::new(),
            sleepers: SleepQueue::new(),
            tids: TidAllocator::new(),
            current: TID_INITIAL,
            idle: None,
            ticks: 0,
            thread_ticks: 0,
            load_avg: Fixed::ZERO,
            stats: TickStats::default(),
            semas: Slab::new(),
            locks: Slab::new(),
            conds: Slab::new(),
        }
    }

    /// 创建 idle 线程描述符
    ///
    /// idle 从不进入就绪队列，只在队列为空时被选中。
    pub fn start(&mut self) -> Tid {
        assert!(self.idle.is_none(), "scheduler already started");
        let tid = match self.tids.alloc() {
            Some(tid) => tid,
            None => panic!("no tid left for the idle thread"),
        };
        let mut idle = Thread::new(tid, "idle", PRI_MIN);
        idle.flags = ThreadFlags::IDLE;
        self.threads.insert(tid, idle);
        self.all_list.push(tid);
        self.idle = Some(tid);
        log::info!("sched: started, idle thread {}", tid);
        tid
    }

    pub fn config(&self) -> &SchedConfig {
        &self.config
    }

    pub fn policy(&self) -> SchedPolicy {
        self.config.policy
    }

    pub fn is_mlfqs(&self) -> bool {
        self.config.policy == SchedPolicy::Mlfqs
    }

    pub fn current(&self) -> Tid {
        self.current
    }

    pub fn idle(&self) -> Option<Tid> {
        self.idle
    }

    pub fn ticks(&self) -> i64 {
        self.ticks
    }

    pub fn stats(&self) -> TickStats {
        self.stats
    }

    pub fn ready_queue(&self) -> &ReadyQueue {
        &self.ready
    }

    pub fn sleep_queue(&self) -> &SleepQueue {
        &self.sleepers
    }

    /// 查找线程描述符（包括尚未回收的 Dying 线程）
    pub fn thread(&self, tid: Tid) -> Option<&Thread> {
        self.threads.get(&tid)
    }

    pub(crate) fn get(&self, tid: Tid) -> &Thread {
        match self.threads.get(&tid) {
            Some(thread) => thread,
            None => panic!("tid {} is not a live thread", tid),
        }
    }

    pub(crate) fn get_mut(&mut self, tid: Tid) -> &mut Thread {
        match self.threads.get_mut(&tid) {
            Some(thread) => thread,
            None => panic!("tid {} is not a live thread", tid),
        }
    }

    /// 当前运行线程，校验魔数与状态
    pub fn current_thread(&self) -> &Thread {
        let thread = self.get(self.current);
        assert!(thread.is_thread(), "thread {} descriptor corrupted", self.current);
        assert_eq!(thread.state, ThreadState::Running, "current thread {} is not running", self.current);
        thread
    }

    pub(crate) fn current_mut(&mut self) -> &mut Thread {
        let tid = self.current;
        let thread = self.get_mut(tid);
        assert!(thread.is_thread(), "thread {} descriptor corrupted", tid);
        thread
    }

    /// 遍历所有已注册线程
    pub fn for_each(&self, mut f: impl FnMut(&Thread)) {
        for tid in &self.all_list {
            if let Some(thread) = self.threads.get(tid) {
                f(thread);
            }
        }
    }

    /// 已注册线程数
    pub fn thread_count(&self) -> usize {
        self.all_list.len()
    }

    // ============================================================
    // 线程生命周期
    // ============================================================

    /// 分配并登记一个新线程，状态为 Blocked
    ///
    /// 调用者为新线程准备好执行上下文后调用 [`Scheduler::launch`]；
    /// 准备失败时调用 [`Scheduler::discard`]。
    pub fn alloc_thread(&mut self, name: &str, priority: i32) -> Result<Tid, Errno> {
        assert!(
            (PRI_MIN..=PRI_MAX).contains(&priority),
            "thread priority {} out of range",
            priority
        );
        if self.threads.len() >= self.config.max_threads {
            log::warn!("sched: thread table full ({} threads)", self.threads.len());
            return Err(Errno::OutOfMemory);
        }
        let tid = self.tids.alloc().ok_or(Errno::OutOfMemory)?;

        let parent = self.current;
        let mut thread = Thread::new(tid, name, priority);
        thread.parent = Some(parent);
        if self.is_mlfqs() {
            let priority = mlfqs::priority_of(thread.recent_cpu, thread.nice);
            thread.priority = priority;
            thread.base_priority = priority;
        }

        let record = ChildRecord::new(tid, self.sema_create(0), self.sema_create(0));
        self.get_mut(parent).children.push(record);
        self.threads.insert(tid, thread);
        self.all_list.push(tid);
        Ok(tid)
    }

    /// 撤销尚未启动的线程
    pub fn discard(&mut self, tid: Tid) {
        let Some(thread) = self.threads.remove(&tid) else {
            return;
        };
        assert_eq!(thread.state, ThreadState::Blocked, "discarding started thread {}", tid);
        self.all_list.retain(|&t| t != tid);
        if let Some(parent) = thread.parent {
            self.forget_child(parent, tid);
        }
    }

    /// 启动已分配的线程：放入就绪队列，新线程优先级更高时让出 CPU
    pub fn launch(&mut self, tid: Tid) -> Dispatch {
        self.unblock(tid);
        let thread = self.get(tid);
        log::debug!("sched: created thread {} '{}' priority {}", tid, thread.name, thread.priority);
        if self.get(self.current).priority < thread.priority {
            self.yield_current()
        } else {
            Dispatch::Stay
        }
    }

    /// 创建线程（不需要独立执行上下文的场景）
    pub fn create(&mut self, name: &str, priority: i32) -> Result<(Tid, Dispatch), Errno> {
        let tid = self.alloc_thread(name, priority)?;
        Ok((tid, self.launch(tid)))
    }

    /// 把 Blocked 线程放入就绪队列，不抢占当前线程
    pub fn unblock(&mut self, tid: Tid) {
        let thread = self.get_mut(tid);
        assert!(thread.is_thread(), "thread {} descriptor corrupted", tid);
        assert!(!thread.is_idle(), "idle thread is never queued");
        assert_eq!(
            thread.state,
            ThreadState::Blocked,
            "unblock of thread {} in state {}",
            tid,
            thread.state
        );
        thread.state = ThreadState::Ready;
        let priority = thread.priority;
        self.ready.insert(tid, priority);
    }

    /// 当前线程进入 Blocked 并调度
    pub fn block_current(&mut self) -> Dispatch {
        let thread = self.current_mut();
        assert_eq!(thread.state, ThreadState::Running, "blocking a thread that is not running");
        thread.state = ThreadState::Blocked;
        self.schedule()
    }

    /// 当前线程让出 CPU，回到就绪队列（idle 除外）
    pub fn yield_current(&mut self) -> Dispatch {
        let tid = self.current;
        let thread = self.current_mut();
        assert_eq!(thread.state, ThreadState::Running, "yielding a thread that is not running");
        thread.state = ThreadState::Ready;
        if !thread.is_idle() {
            let priority = thread.priority;
            self.ready.insert(tid, priority);
        }
        self.schedule()
    }

    /// 当前线程退出
    ///
    /// 线程从注册表移除并标记为 Dying，描述符由下一个线程在
    /// `finish_switch` 中回收。返回的调度决定一定是切换。
    pub fn exit_current(&mut self) -> Dispatch {
        let tid = self.current;
        assert!(!self.current_mut().is_idle(), "idle thread cannot exit");
        self.all_list.retain(|&t| t != tid);
        self.notify_exit(tid);
        self.get_mut(tid).state = ThreadState::Dying;
        log::debug!("sched: thread {} exiting", tid);
        self.schedule()
    }

    /// 选择下一个线程
    pub(crate) fn schedule(&mut self) -> Dispatch {
        let cur = self.current;
        assert_ne!(
            self.get(cur).state,
            ThreadState::Running,
            "schedule() while current thread is running"
        );

        let next = self.next_thread_to_run();
        if next == cur {
            let _ = self.finish_switch(None);
            Dispatch::Stay
        } else {
            #[cfg(feature = "debug_log")]
            log::trace!("sched: switch {} -> {}", cur, next);
            self.current = next;
            Dispatch::Switch { prev: cur, next }
        }
    }

    fn next_thread_to_run(&mut self) -> Tid {
        match self.ready.pop() {
            Some(tid) => tid,
            None => match self.idle {
                Some(idle) => idle,
                None => panic!("no runnable thread"),
            },
        }
    }

    /// 切换完成后在新线程上下文中调用
    ///
    /// 新线程标记为 Running 并重新开始时间片；如果 `prev` 已经退出
    /// 且不是启动线程，回收其描述符并返回，调用者在临界区外释放它。
    pub fn finish_switch(&mut self, prev: Option<Tid>) -> Option<Thread> {
        self.current_mut().state = ThreadState::Running;
        self.thread_ticks = 0;

        let prev = prev?;
        let dying = self.threads.get(&prev).map_or(false, |t| t.state == ThreadState::Dying);
        if dying && prev != TID_INITIAL {
            log::debug!("sched: reaped thread {}", prev);
            self.threads.remove(&prev)
        } else {
            None
        }
    }

    /// 就绪队列中是否有线程应当抢占当前线程
    pub fn should_preempt(&self) -> bool {
        let Some((_, head)) = self.ready.head() else {
            return false;
        };
        let cur = self.get(self.current);
        cur.is_idle() || head > cur.priority
    }

    /// 就绪队列队首优先级更高时让出 CPU
    pub fn preempt_check(&mut self) -> Dispatch {
        if self.should_preempt() {
            self.yield_current()
        } else {
            Dispatch::Stay
        }
    }

    // ============================================================
    // 睡眠与时钟
    // ============================================================

    /// 当前线程睡眠到 `wakeup_tick`
    ///
    /// 唤醒时刻不晚于当前时刻时直接返回；idle 线程从不睡眠。
    pub fn sleep_until(&mut self, wakeup_tick: i64) -> Dispatch {
        let tid = self.current;
        if wakeup_tick <= self.ticks || self.get(tid).is_idle() {
            return Dispatch::Stay;
        }
        self.get_mut(tid).wakeup_tick = wakeup_tick;
        self.sleepers.push(tid, wakeup_tick);
        self.block_current()
    }

    /// 唤醒所有到期的睡眠线程，返回唤醒数量
    pub fn wake_due(&mut self, now: i64) -> usize {
        let due = self.sleepers.take_due(now);
        for &tid in &due {
            #[cfg(feature = "debug_log")]
            log::trace!("sched: wake thread {} at tick {}", tid, now);
            self.unblock(tid);
        }
        due.len()
    }

    /// 时钟中断处理
    ///
    /// 返回 true 表示中断返回前应当让出 CPU：时间片用完，
    /// 或者就绪队列中有更高优先级的线程。
    pub fn tick(&mut self) -> bool {
        self.ticks += 1;

        let cur = self.get(self.current);
        if cur.is_idle() {
            self.stats.idle_ticks += 1;
        } else if cur.flags.contains(ThreadFlags::USER) {
            self.stats.user_ticks += 1;
        } else {
            self.stats.kernel_ticks += 1;
        }

        if self.sleepers.next_wakeup() <= self.ticks {
            self.wake_due(self.ticks);
        }

        if self.is_mlfqs() {
            self.mlfqs_tick();
        }

        self.thread_ticks += 1;
        self.thread_ticks >= self.config.time_slice || self.should_preempt()
    }

    // ============================================================
    // 分页层挂钩
    // ============================================================

    /// 给当前线程挂载地址空间表
    pub fn attach_vm(&mut self, table: alloc::boxed::Box<dyn core::any::Any + Send>) {
        let thread = self.current_mut();
        thread.vm = Some(table);
        thread.flags.insert(ThreadFlags::USER);
    }

    /// 卸下当前线程的地址空间表
    pub fn detach_vm(&mut self) -> Option<alloc::boxed::Box<dyn core::any::Any + Send>> {
        let thread = self.current_mut();
        thread.flags.remove(ThreadFlags::USER);
        thread.vm.take()
    }

    pub(crate) fn current_vm_mut(&mut self) -> Option<&mut (dyn core::any::Any + Send + 'static)> {
        self.current_mut().vm.as_deref_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = SchedConfig::default();
        assert_eq!(config.policy, SchedPolicy::Priority);
        assert_eq!(config.time_slice, TIME_SLICE_TICKS);
        assert_eq!(config.donation_depth, 8);
    }

    #[test]
    fn test_config_from_cmdline() {
        let config = SchedConfig::from_cmdline("kestrel -q -o mlfqs run alarm-single");
        assert_eq!(config.policy, SchedPolicy::Mlfqs);
        let config = SchedConfig::from_cmdline("kestrel -q run priority-donate-one");
        assert_eq!(config.policy, SchedPolicy::Priority);
    }

    #[test]
    fn test_main_priority_under_mlfqs() {
        let sched = Scheduler::new(SchedConfig::default().with_policy(SchedPolicy::Mlfqs));
        assert!(sched.is_mlfqs());
        assert_eq!(sched.current_thread().priority(), PRI_MAX);
    }
}
