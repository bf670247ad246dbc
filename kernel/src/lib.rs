//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!
//! Kestrel 调度核心
//!
//! 单处理器内核的线程调度与同步子系统：
//! - `sched`: 线程注册表、就绪/睡眠队列、优先级捐赠、MLFQS
//! - `sync`: 信号量、互斥锁、条件变量
//! - `process`: 线程描述符与父子关系
//! - `kthread`: 面向内核代码的线程 API
//! - `arch`: 上下文切换接口与宿主机实现
//!
//! 调度器本身是纯状态机，不依赖任何执行上下文，可以直接在测试中驱动；
//! `kthread::Kernel` 把它与 [`arch::Port`] 组合成真正可切换的线程。

#![no_std]

extern crate alloc;

#[cfg(any(test, feature = "hosted"))]
extern crate std;

pub mod print;

pub mod arch;
pub mod cmdline;
pub mod collection;
pub mod config;
pub mod errno;
pub mod fixed_point;
pub mod kthread;
pub mod process;
pub mod sched;
pub mod sync;

#[cfg(test)]
mod tests;

pub use errno::Errno;
pub use fixed_point::Fixed;
pub use kthread::Kernel;
pub use process::{Thread, ThreadState, Tid};
pub use sched::{Dispatch, SchedConfig, SchedPolicy, Scheduler};
