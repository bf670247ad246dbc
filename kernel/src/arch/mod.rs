//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!
//! 架构相关代码
//!
//! 调度核心只通过 [`Port`] 接触硬件：保存/恢复寄存器、切换内核栈、
//! 开关中断。调度核心保证：
//! - 调用 `switch`/`exit` 时调度器状态已经指向 `next`，临界区已退出
//! - 同一时刻只有一个线程在执行内核代码
//!
//! 当前提供的实现：
//! - **hosted** - 每个内核线程对应一个宿主机 OS 线程，用于测试与仿真（默认启用）

#[cfg(feature = "hosted")]
pub mod hosted;

use alloc::boxed::Box;

use crate::errno::Errno;
use crate::process::task::Tid;

/// 新线程的入口，参数是切换过来之前运行的线程
pub type Entry = Box<dyn FnOnce(Tid) + Send + 'static>;

/// 中断状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntrLevel {
    On,
    Off,
}

/// 上下文切换接口
pub trait Port: Send + Sync {
    /// 为线程 `tid` 准备执行上下文
    ///
    /// 上下文第一次被切换到时调用 `entry(prev)`。
    fn spawn(&self, tid: Tid, name: &str, entry: Entry) -> Result<(), Errno>;

    /// 从 `prev` 切换到 `next`
    ///
    /// 在 `prev` 再次被切换回来时返回，返回值是切换回来之前运行的线程。
    fn switch(&self, prev: Tid, next: Tid) -> Tid;

    /// 已退出的 `prev` 切换到 `next`，永不返回
    fn exit(&self, prev: Tid, next: Tid) -> !;

    /// 关中断，返回之前的中断状态
    fn intr_disable(&self) -> IntrLevel;

    /// 恢复中断状态
    fn intr_restore(&self, level: IntrLevel);
}
