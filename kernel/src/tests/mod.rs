//! 单元测试模块
//!
//! 场景测试直接驱动调度器状态机：`Dispatch::Switch` 之后由测试代替新线程
//! 调用 `finish_switch`，之后的操作就以新线程的身份执行。
//!
//! `hosted` 特性下另有端到端测试，线程真正运行在宿主机 OS 线程上。
//!
//! 运行测试：
//! ```bash
//! cargo test --package kestrel
//! ```

use static_assertions::{assert_impl_all, const_assert, const_assert_eq};

use crate::config::{DONATION_MAX_DEPTH, NICE_MAX, NICE_MIN, PRI_DEFAULT, PRI_MAX, PRI_MIN};
use crate::process::task::{Thread, Tid};
use crate::sched::{Dispatch, SchedConfig, SchedPolicy, Scheduler};

const_assert!(PRI_MIN < PRI_DEFAULT && PRI_DEFAULT < PRI_MAX);
const_assert!(NICE_MIN < 0 && NICE_MAX > 0);
const_assert_eq!(DONATION_MAX_DEPTH, 8);
assert_impl_all!(Scheduler: Send);

#[cfg(feature = "hosted")]
assert_impl_all!(crate::kthread::Kernel<crate::arch::hosted::HostedPort>: Sync);

pub mod process;
pub mod sleep_wakeup;


/// 启动一个调度器：main 线程正在运行，idle 线程已创建
pub fn boot(policy: SchedPolicy) -> Scheduler {
    boot_with(SchedConfig::default().with_policy(policy))
}

pub fn boot_with(config: SchedConfig) -> Scheduler {
    let mut sched = Scheduler::new(config);
    sched.start();
    sched
}

/// 完成一次调度决定，返回被回收的描述符
pub fn complete(sched: &mut Scheduler, dispatch: Dispatch) -> Option<Thread> {
    match dispatch {
        Dispatch::Stay => None,
        Dispatch::Switch { prev, .. } => sched.finish_switch(Some(prev)),
    }
}

/// 断言调度决定是切换到 `next`，并完成切换
pub fn switch_to(sched: &mut Scheduler, dispatch: Dispatch, next: Tid) -> Option<Thread> {
    match dispatch {
        Dispatch::Switch { next: target, .. } => assert_eq!(target, next, "switched to wrong thread"),
        Dispatch::Stay => panic!("expected a switch to thread {}, got Stay", next),
    }
    complete(sched, dispatch)
}

/// 创建线程并完成可能发生的切换
pub fn spawn(sched: &mut Scheduler, name: &str, priority: i32) -> Tid {
    let (tid, dispatch) = match sched.create(name, priority) {
        Ok(created) => created,
        Err(err) => panic!("create '{}' failed: {}", name, err),
    };
    complete(sched, dispatch);
    tid
}
