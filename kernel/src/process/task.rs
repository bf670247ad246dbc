//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!
//! 线程控制块 (Thread Control Block)
//!
//! 关键设计要点：
//! 1. 描述符存放在调度器的线程表中，队列只保存 tid
//! 2. `priority` 是有效优先级，`base_priority` 是线程自己设置的优先级，
//!    二者之差来自优先级捐赠
//! 3. 退出分两阶段：先标记 Dying，再由下一个线程在切换完成后回收

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;
use core::any::Any;
use core::fmt;

use crate::config::{NICE_DEFAULT, THREAD_NAME_MAX};
use crate::fixed_point::Fixed;
use crate::process::child::ChildRecord;
use crate::sync::lock::LockId;

pub use thread_flags::ThreadFlags;

/// 线程 ID
pub type Tid = u32;

/// 用于检测描述符损坏的魔数
pub const THREAD_MAGIC: u32 = 0xcd6a_bf4b;

/// 线程状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ThreadState {
    /// 正在 CPU 上运行
    Running = 0,

    /// 在就绪队列中等待 CPU
    Ready = 1,

    /// 等待某个事件（信号量、睡眠），不在就绪队列中
    Blocked = 2,

    /// 已退出，等待下一个线程回收
    Dying = 3,
}

impl fmt::Display for ThreadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ThreadState::Running => "running",
            ThreadState::Ready => "ready",
            ThreadState::Blocked => "blocked",
            ThreadState::Dying => "dying",
        };
        f.write_str(name)
    }
}

/// 线程标志
pub mod thread_flags {
    use bitflags::bitflags;

    bitflags! {
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct ThreadFlags: u32 {
            /// 空闲线程，只在就绪队列为空时运行
            const IDLE    = 0x0000_0001;
            /// 启动线程（main），描述符不回收
            const INITIAL = 0x0000_0002;
            /// 挂载了地址空间，时钟滴答计入用户时间
            const USER    = 0x0000_0004;
        }
    }
}

/// 线程控制块
pub struct Thread {
    pub(crate) magic: u32,
    pub(crate) tid: Tid,
    pub(crate) name: String,
    pub(crate) state: ThreadState,
    pub(crate) flags: ThreadFlags,

    /// 有效优先级（含捐赠）
    pub(crate) priority: i32,
    /// 线程自身设置的优先级
    pub(crate) base_priority: i32,
    pub(crate) nice: i32,
    pub(crate) recent_cpu: Fixed,
    /// 睡眠线程的唤醒时刻
    pub(crate) wakeup_tick: i64,

    /// 正在等待的锁
    pub(crate) waiting_on: Option<LockId>,
    /// 向本线程捐赠优先级的线程，按捐赠时的优先级降序
    pub(crate) donors: Vec<Tid>,

    pub(crate) parent: Option<Tid>,
    pub(crate) children: Vec<ChildRecord>,
    pub(crate) exit_status: i32,

    /// 分页层的地址空间表，调度核心不解释其内容
    pub(crate) vm: Option<Box<dyn Any + Send>>,
}

impl Thread {
    pub(crate) fn new(tid: Tid, name: &str, priority: i32) -> Self {
        Self {
            magic: THREAD_MAGIC,
            tid,
            name: name.chars().take(THREAD_NAME_MAX - 1).collect(),
            state: ThreadState::Blocked,
            flags: ThreadFlags::empty(),
            priority,
            base_priority: priority,
            nice: NICE_DEFAULT,
            recent_cpu: Fixed::ZERO,
            wakeup_tick: 0,
            waiting_on: None,
            donors: Vec::new(),
            parent: None,
            children: Vec::new(),
            exit_status: 0,
            vm: None,
        }
    }

    /// 描述符是否有效（魔数未被破坏）
    pub fn is_thread(&self) -> bool {
        self.magic == THREAD_MAGIC
    }

    pub fn tid(&self) -> Tid {
        self.tid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> ThreadState {
        self.state
    }

    pub fn flags(&self) -> ThreadFlags {
        self.flags
    }

    pub fn is_idle(&self) -> bool {
        self.flags.contains(ThreadFlags::IDLE)
    }

    /// 有效优先级
    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn base_priority(&self) -> i32 {
        self.base_priority
    }

    pub fn nice(&self) -> i32 {
        self.nice
    }

    pub fn recent_cpu(&self) -> Fixed {
        self.recent_cpu
    }

    pub fn wakeup_tick(&self) -> i64 {
        self.wakeup_tick
    }

    pub fn waiting_on(&self) -> Option<LockId> {
        self.waiting_on
    }

    pub fn donors(&self) -> &[Tid] {
        &self.donors
    }

    pub fn parent(&self) -> Option<Tid> {
        self.parent
    }

    pub fn children(&self) -> &[ChildRecord] {
        &self.children
    }

    pub fn exit_status(&self) -> i32 {
        self.exit_status
    }

    pub fn has_vm(&self) -> bool {
        self.vm.is_some()
    }

    /// 按具体类型访问地址空间表
    pub fn vm<T: Any>(&self) -> Option<&T> {
        self.vm.as_deref()?.downcast_ref::<T>()
    }

    pub fn vm_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.vm.as_deref_mut()?.downcast_mut::<T>()
    }
}

impl fmt::Debug for Thread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Thread")
            .field("tid", &self.tid)
            .field("name", &self.name)
            .field("state", &self.state)
            .field("priority", &self.priority)
            .field("base_priority", &self.base_priority)
            .field("nice", &self.nice)
            .field("waiting_on", &self.waiting_on)
            .field("donors", &self.donors)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_truncated() {
        let t = Thread::new(3, "a-very-long-thread-name", 31);
        assert_eq!(t.name().len(), THREAD_NAME_MAX - 1);
        assert_eq!(t.name(), "a-very-long-thr");
    }

    #[test]
    fn test_new_thread_defaults() {
        let t = Thread::new(7, "worker", 20);
        assert!(t.is_thread());
        assert_eq!(t.state(), ThreadState::Blocked);
        assert_eq!(t.priority(), 20);
        assert_eq!(t.base_priority(), 20);
        assert_eq!(t.nice(), NICE_DEFAULT);
        assert!(t.donors().is_empty());
        assert!(!t.has_vm());
    }

    #[test]
    fn test_vm_slot_downcast() {
        let mut t = Thread::new(8, "user", 31);
        t.vm = Some(Box::new(42u64));
        assert_eq!(t.vm::<u64>(), Some(&42));
        assert_eq!(t.vm::<u32>(), None);
        if let Some(v) = t.vm_mut::<u64>() {
            *v += 1;
        }
        assert_eq!(t.vm::<u64>(), Some(&43));
    }
}
