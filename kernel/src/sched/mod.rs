//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!

//! 调度器模块
//!
//! - `sched`: 线程表与分发器 (schedule / finish_switch / tick)
//! - `queue`: 就绪队列与睡眠队列
//! - `donate`: 优先级捐赠
//! - `mlfqs`: 多级反馈队列调度
//! - `tid`: 线程 ID 分配
//!
//! 两种调度策略：
//! - 严格优先级：总是运行有效优先级最高的就绪线程，通过捐赠避免优先级反转
//! - MLFQS：按 nice 和 recent_cpu 动态计算优先级，不做捐赠

pub mod donate;
pub mod mlfqs;
pub mod queue;
#[allow(clippy::module_inception)]
pub mod sched;
pub mod tid;

pub use queue::{ReadyQueue, SleepQueue};
pub use sched::{Dispatch, SchedConfig, SchedPolicy, Scheduler, TickStats};
pub use tid::{TidAllocator, TID_INITIAL};
