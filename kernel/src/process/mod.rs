//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!
//! 线程与进程管理
//!
//! - `task`: 线程控制块
//! - `wait`: 按优先级唤醒的等待队列
//! - `child`: 父子关系、退出码与加载通知

pub mod child;
pub mod task;
pub mod wait;

pub use child::{ChildRecord, LoadStatus};
pub use task::{Thread, ThreadFlags, ThreadState, Tid};
pub use wait::WaitQueue;
