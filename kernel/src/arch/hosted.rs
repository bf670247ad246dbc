//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!
//! 宿主机上下文切换
//!
//! 每个内核线程是一个 OS 线程，一根"接力棒"（Mutex + Condvar）保证任意时刻
//! 只有持棒的线程在运行：
//! - `switch(prev, next)`: 把棒交给 `next`，然后等棒回到 `prev`
//! - `exit(prev, next)`: 交棒后永久挂起，栈上的值不再析构，如同泄漏一页内核栈
//!
//! 内核线程 panic 时整个内核停机：停机原因被记录下来，任何等待接力棒的线程
//! 都会以同样的原因 panic，测试线程因此失败而不是挂起。
//!
//! 启动线程（调用 `Kernel::boot` 的线程）不能调用 `exit`。

use alloc::format;
use alloc::string::String;
use alloc::sync::Arc;
use core::any::Any;
use core::sync::atomic::{AtomicBool, Ordering};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;

use crate::errno::Errno;
use crate::process::task::Tid;

use super::{Entry, IntrLevel, Port};

struct CpuState {
    /// 持有接力棒的线程
    running: Option<Tid>,
    /// 上一个交出接力棒的线程
    handed_from: Option<Tid>,
    /// 停机原因
    halted: Option<String>,
}

struct Cpu {
    state: Mutex<CpuState>,
    turn: Condvar,
    intr_enabled: AtomicBool,
}

impl Cpu {
    fn lock(&self) -> MutexGuard<'_, CpuState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn hand_off(&self, state: &mut CpuState, prev: Tid, next: Tid) {
        state.running = Some(next);
        state.handed_from = Some(prev);
        self.turn.notify_all();
    }

    /// 等待接力棒回到 `me`，返回交棒的线程
    fn wait_turn(&self, mut state: MutexGuard<'_, CpuState>, me: Tid) -> Tid {
        loop {
            if let Some(reason) = state.halted.clone() {
                drop(state);
                panic!("kernel halted: {}", reason);
            }
            if state.running == Some(me) {
                match state.handed_from {
                    Some(prev) => return prev,
                    None => panic!("thread {} resumed without a predecessor", me),
                }
            }
            state = self.turn.wait(state).unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn halt(&self, reason: String) {
        let mut state = self.lock();
        if state.halted.is_none() {
            state.halted = Some(reason);
        }
        self.turn.notify_all();
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        String::from(*msg)
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        String::from("unknown panic payload")
    }
}

/// 宿主机 Port
pub struct HostedPort {
    cpu: Arc<Cpu>,
}

impl HostedPort {
    pub fn new() -> Self {
        Self {
            cpu: Arc::new(Cpu {
                state: Mutex::new(CpuState {
                    running: None,
                    handed_from: None,
                    halted: None,
                }),
                turn: Condvar::new(),
                intr_enabled: AtomicBool::new(true),
            }),
        }
    }

    /// 停机原因
    pub fn halted(&self) -> Option<String> {
        self.cpu.lock().halted.clone()
    }
}

impl Default for HostedPort {
    fn default() -> Self {
        Self::new()
    }
}

impl Port for HostedPort {
    fn spawn(&self, tid: Tid, name: &str, entry: Entry) -> Result<(), Errno> {
        let cpu = Arc::clone(&self.cpu);
        let thread_name = format!("{}-{}", name, tid);
        let name = String::from(name);

        thread::Builder::new()
            .name(thread_name)
            .spawn(move || {
                let result = panic::catch_unwind(AssertUnwindSafe(|| {
                    let prev = cpu.wait_turn(cpu.lock(), tid);
                    entry(prev);
                }));
                if let Err(payload) = result {
                    let reason = format!("thread {} '{}' panicked: {}", tid, name, panic_message(&*payload));
                    cpu.halt(reason);
                }
            })
            .map(|_| ())
            .map_err(|_| Errno::TryAgain)
    }

    fn switch(&self, prev: Tid, next: Tid) -> Tid {
        let mut state = self.cpu.lock();
        self.cpu.hand_off(&mut state, prev, next);
        self.cpu.wait_turn(state, prev)
    }

    fn exit(&self, prev: Tid, next: Tid) -> ! {
        {
            let mut state = self.cpu.lock();
            self.cpu.hand_off(&mut state, prev, next);
        }
        // 交棒后不能再执行任何内核代码，包括栈上值的析构
        loop {
            thread::park();
        }
    }

    fn intr_disable(&self) -> IntrLevel {
        if self.cpu.intr_enabled.swap(false, Ordering::AcqRel) {
            IntrLevel::On
        } else {
            IntrLevel::Off
        }
    }

    fn intr_restore(&self, level: IntrLevel) {
        self.cpu.intr_enabled.store(level == IntrLevel::On, Ordering::Release);
    }
}
