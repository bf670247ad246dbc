//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!
//! 内核线程接口
//!
//! `Kernel<P>` 把调度器状态机与上下文切换 [`Port`] 组合起来，提供内核代码
//! 直接调用的线程 API：创建、退出、让出、睡眠、优先级与 nice、时钟中断。
//!
//! 所有状态修改都在 `with` 临界区内完成；物理切换一定在临界区之外进行，
//! 切换回来后在新线程的上下文中执行 `finish_switch`。

use alloc::boxed::Box;
use alloc::string::String;
use core::any::Any;

use crate::arch::{Entry, Port};
use crate::config::{KERNEL_NAME, KERNEL_VERSION};
use crate::errno::Errno;
use crate::process::task::{Thread, Tid};
use crate::sched::{Dispatch, SchedConfig, Scheduler, TickStats};
use crate::sync::semaphore::SemaId;
use crate::sync::{Acquire, IrqLock};

/// 内核线程运行时
///
/// 生命周期与系统相同：[`Kernel::boot`] 之后不再销毁。
pub struct Kernel<P: Port + 'static> {
    sched: IrqLock<Scheduler>,
    port: P,
}

impl<P: Port + 'static> Kernel<P> {
    /// 初始化线程系统，调用者成为 main 线程
    pub fn boot(port: P, config: SchedConfig) -> &'static Self {
        log::info!("{} {}: thread system init, policy {:?}", KERNEL_NAME, KERNEL_VERSION, config.policy);
        Box::leak(Box::new(Self {
            sched: IrqLock::new(Scheduler::new(config)),
            port,
        }))
    }

    /// 创建 idle 线程，开始抢占式调度
    pub fn start(&'static self) {
        let idle = self.with(|s| s.start());
        let entry: Entry = Box::new(move |prev| {
            self.finish_switch(prev);
            loop {
                // 没有其他线程可运行时才会回到这里
                let dispatch = self.with(|s| s.block_current());
                self.dispatch(dispatch);
                // 等待下一次时钟中断
                self.timer_interrupt();
            }
        });
        if let Err(err) = self.port.spawn(idle, "idle", entry) {
            panic!("cannot start idle thread: {}", err);
        }
    }

    /// 在关中断临界区内访问调度器
    pub fn with<R>(&self, f: impl FnOnce(&mut Scheduler) -> R) -> R {
        let level = self.port.intr_disable();
        let result = self.sched.with(f);
        self.port.intr_restore(level);
        result
    }

    /// 只读访问调度器
    pub fn inspect<R>(&self, f: impl FnOnce(&Scheduler) -> R) -> R {
        self.with(|s| f(s))
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    /// 执行调度决定
    pub(crate) fn dispatch(&self, dispatch: Dispatch) {
        if let Dispatch::Switch { prev, next } = dispatch {
            let from = self.port.switch(prev, next);
            self.finish_switch(from);
        }
    }

    fn finish_switch(&self, prev: Tid) {
        let reaped = self.with(|s| s.finish_switch(Some(prev)));
        // 描述符在临界区外释放
        drop(reaped);
    }

    /// 阻塞式 P 操作
    pub(crate) fn sema_down(&self, id: SemaId) {
        loop {
            match self.with(|s| s.sema_down(id)) {
                Acquire::Acquired => return,
                Acquire::Blocked(dispatch) => self.dispatch(dispatch),
            }
        }
    }

    // ============================================================
    // 线程生命周期
    // ============================================================

    /// 创建内核线程
    ///
    /// 新线程优先级高于调用者时，返回前调用者先让出 CPU。
    pub fn create<F>(&'static self, name: &str, priority: i32, f: F) -> Result<Tid, Errno>
    where
        F: FnOnce() + Send + 'static,
    {
        let tid = self.with(|s| s.alloc_thread(name, priority))?;

        let entry: Entry = Box::new(move |prev| {
            self.finish_switch(prev);
            f();
            self.exit();
        });
        if let Err(err) = self.port.spawn(tid, name, entry) {
            log::warn!("kthread: cannot spawn context for '{}': {}", name, err);
            self.with(|s| s.discard(tid));
            return Err(err);
        }

        let dispatch = self.with(|s| s.launch(tid));
        self.dispatch(dispatch);
        Ok(tid)
    }

    /// 当前线程退出，永不返回
    pub fn exit(&self) -> ! {
        match self.with(|s| s.exit_current()) {
            Dispatch::Switch { prev, next } => self.port.exit(prev, next),
            Dispatch::Stay => panic!("dying thread was rescheduled"),
        }
    }

    /// 让出 CPU
    pub fn yield_now(&self) {
        let dispatch = self.with(|s| s.yield_current());
        self.dispatch(dispatch);
    }

    /// 阻塞当前线程，直到其他线程调用 [`Kernel::unblock`]
    pub fn block(&self) {
        let dispatch = self.with(|s| s.block_current());
        self.dispatch(dispatch);
    }

    /// 把 Blocked 线程放回就绪队列，不抢占当前线程
    pub fn unblock(&self, tid: Tid) {
        self.with(|s| s.unblock(tid));
    }

    pub fn current(&self) -> Tid {
        self.with(|s| s.current_thread().tid())
    }

    pub fn name(&self) -> String {
        self.with(|s| String::from(s.current_thread().name()))
    }

    /// 遍历所有已注册线程
    pub fn for_each(&self, f: impl FnMut(&Thread)) {
        self.with(|s| s.for_each(f));
    }

    // ============================================================
    // 优先级与 MLFQS
    // ============================================================

    pub fn set_priority(&self, priority: i32) {
        let dispatch = self.with(|s| s.set_priority(priority));
        self.dispatch(dispatch);
    }

    pub fn priority(&self) -> i32 {
        self.with(|s| s.priority())
    }

    pub fn set_nice(&self, nice: i32) {
        let dispatch = self.with(|s| s.set_nice(nice));
        self.dispatch(dispatch);
    }

    pub fn nice(&self) -> i32 {
        self.with(|s| s.nice())
    }

    /// 系统负载的 100 倍
    pub fn load_avg(&self) -> i32 {
        self.with(|s| s.load_avg_x100())
    }

    /// 当前线程 recent_cpu 的 100 倍
    pub fn recent_cpu(&self) -> i32 {
        self.with(|s| s.recent_cpu_x100())
    }

    // ============================================================
    // 时钟
    // ============================================================

    pub fn ticks(&self) -> i64 {
        self.with(|s| s.ticks())
    }

    /// 睡眠 `ticks` 个滴答
    pub fn sleep(&self, ticks: i64) {
        let dispatch = self.with(|s| {
            let wakeup = s.ticks().saturating_add(ticks);
            s.sleep_until(wakeup)
        });
        self.dispatch(dispatch);
    }

    pub fn sleep_until(&self, wakeup_tick: i64) {
        let dispatch = self.with(|s| s.sleep_until(wakeup_tick));
        self.dispatch(dispatch);
    }

    /// 时钟中断，在被打断的线程上下文中执行
    ///
    /// 中断返回前按需让出 CPU。
    pub fn timer_interrupt(&self) {
        if self.with(|s| s.tick()) {
            self.yield_now();
        }
    }

    pub fn stats(&self) -> TickStats {
        self.with(|s| s.stats())
    }

    pub fn print_stats(&self) {
        let stats = self.stats();
        log::info!(
            "Thread: {} idle ticks, {} kernel ticks, {} user ticks",
            stats.idle_ticks,
            stats.kernel_ticks,
            stats.user_ticks
        );
    }

    // ============================================================
    // 进程层挂钩
    // ============================================================

    /// 以 `status` 退出当前线程
    pub fn process_exit(&self, status: i32) -> ! {
        let name = self.with(|s| {
            s.set_exit_status(status);
            String::from(s.current_thread().name())
        });
        crate::println!("{}: exit({})", name, status);
        self.exit()
    }

    /// 等待子线程退出并取得退出码，每个子线程只能等待一次
    pub fn process_wait(&self, child: Tid) -> Result<i32, Errno> {
        let sema = self.with(|s| s.child_exit_sema(child))?;
        self.sema_down(sema);
        self.with(|s| s.reap_child(child))
    }

    /// 子线程通知父线程加载结果
    pub fn notify_loaded(&self, success: bool) {
        self.with(|s| s.notify_loaded(success));
    }

    /// 等待子线程加载完成，返回是否成功
    pub fn wait_loaded(&self, child: Tid) -> Result<bool, Errno> {
        let sema = self.with(|s| s.child_load_sema(child))?;
        self.sema_down(sema);
        let status = self.with(|s| s.child_load_status(child))?;
        Ok(status == crate::process::child::LoadStatus::Loaded)
    }

    // ============================================================
    // 分页层挂钩
    // ============================================================

    pub fn attach_vm(&self, table: Box<dyn Any + Send>) {
        self.with(|s| s.attach_vm(table));
    }

    pub fn detach_vm(&self) -> Option<Box<dyn Any + Send>> {
        self.with(|s| s.detach_vm())
    }

    /// 访问当前线程的地址空间表
    pub fn with_vm<T: Any, R>(&self, f: impl FnOnce(Option<&mut T>) -> R) -> R {
        self.with(|s| f(s.current_vm_mut().and_then(|vm| vm.downcast_mut::<T>())))
    }
}
