// 测试：父子线程关系
//
// 测试内容：
// 1. 子线程退出码交给父线程，只能取一次
// 2. 父线程先等待、子线程后退出
// 3. 加载结果通知
// 4. 父线程退出后子线程成为孤儿
// 5. 地址空间挂钩

use alloc::boxed::Box;

use super::{boot, complete, spawn, switch_to};
use crate::errno::Errno;
use crate::process::child::LoadStatus;
use crate::process::task::{ThreadFlags, Tid};
use crate::sched::{SchedPolicy, TID_INITIAL};
use crate::sync::Acquire;

const MAIN: Tid = TID_INITIAL;

#[test]
fn test_exit_status_collected_once() {
    let mut sched = boot(SchedPolicy::Priority);
    let child = spawn(&mut sched, "child", 40);
    assert_eq!(sched.thread(child).and_then(|t| t.parent()), Some(MAIN));

    sched.set_exit_status(7);
    let dispatch = sched.exit_current();
    switch_to(&mut sched, dispatch, MAIN);

    let sema = sched.child_exit_sema(child).unwrap();
    assert_eq!(sched.sema_down(sema), Acquire::Acquired);
    assert_eq!(sched.reap_child(child), Ok(7));

    // 记录已删除，子线程也已回收
    assert_eq!(sched.reap_child(child), Err(Errno::NoSuchProcess));
    assert!(sched.current_thread().children().is_empty());
}

#[test]
fn test_wait_before_child_exits() {
    let mut sched = boot(SchedPolicy::Priority);
    let child = spawn(&mut sched, "child", 20);
    assert_eq!(sched.current(), MAIN);
    assert_eq!(sched.reap_child(child), Err(Errno::TryAgain));

    let sema = sched.child_exit_sema(child).unwrap();
    let dispatch = match sched.sema_down(sema) {
        Acquire::Blocked(dispatch) => dispatch,
        Acquire::Acquired => panic!("child has not exited yet"),
    };
    switch_to(&mut sched, dispatch, child);

    sched.set_exit_status(-1);
    let dispatch = sched.exit_current();
    let reaped = switch_to(&mut sched, dispatch, MAIN);
    assert_eq!(reaped.map(|t| t.tid()), Some(child));

    assert_eq!(sched.sema_down(sema), Acquire::Acquired);
    assert_eq!(sched.reap_child(child), Ok(-1));
}

#[test]
fn test_wait_on_non_child() {
    let mut sched = boot(SchedPolicy::Priority);
    let idle = sched.idle().unwrap();
    assert_eq!(sched.child_exit_sema(idle), Err(Errno::NoChild));
    assert_eq!(sched.child_exit_sema(999), Err(Errno::NoSuchProcess));
}

#[test]
fn test_load_notification() {
    let mut sched = boot(SchedPolicy::Priority);
    let ok = spawn(&mut sched, "loader", 40);
    sched.notify_loaded(true);
    let dispatch = sched.exit_current();
    switch_to(&mut sched, dispatch, MAIN);

    let bad = spawn(&mut sched, "broken", 40);
    sched.notify_loaded(false);
    let dispatch = sched.block_current();
    switch_to(&mut sched, dispatch, MAIN);

    assert_eq!(sched.child_load_status(ok), Ok(LoadStatus::Loaded));
    assert_eq!(sched.child_load_status(bad), Ok(LoadStatus::Failed));
    let sema = sched.child_load_sema(bad).unwrap();
    assert!(sched.sema_try_down(sema));
}

#[test]
fn test_pending_load_blocks_parent() {
    let mut sched = boot(SchedPolicy::Priority);
    let child = spawn(&mut sched, "slow", 20);
    assert_eq!(sched.child_load_status(child), Ok(LoadStatus::Pending));

    let sema = sched.child_load_sema(child).unwrap();
    let dispatch = match sched.sema_down(sema) {
        Acquire::Blocked(dispatch) => dispatch,
        Acquire::Acquired => panic!("load already signalled"),
    };
    switch_to(&mut sched, dispatch, child);
    sched.notify_loaded(true);
    // 父线程优先级更高，但 up 不让出 CPU
    assert_eq!(sched.current(), child);
    assert!(sched.should_preempt());
}

#[test]
fn test_orphaned_children() {
    let mut sched = boot(SchedPolicy::Priority);
    let parent = spawn(&mut sched, "parent", 40);
    let orphan = spawn(&mut sched, "orphan", 20);
    assert_eq!(sched.current(), parent);

    let dispatch = sched.exit_current();
    switch_to(&mut sched, dispatch, MAIN);
    assert_eq!(sched.thread(orphan).and_then(|t| t.parent()), None);

    // orphan 退出时没有父线程可通知
    let dispatch = sched.set_priority(0);
    switch_to(&mut sched, dispatch, orphan);
    let dispatch = sched.exit_current();
    let reaped = complete(&mut sched, dispatch);
    assert_eq!(reaped.map(|t| t.tid()), Some(orphan));
    assert_eq!(sched.reap_child(parent), Ok(0));
}

#[test]
fn test_vm_hooks() {
    #[derive(Debug, PartialEq)]
    struct PageTable {
        root: usize,
    }

    let mut sched = boot(SchedPolicy::Priority);
    assert!(!sched.current_thread().has_vm());

    sched.attach_vm(Box::new(PageTable { root: 0x8000 }));
    assert!(sched.current_thread().flags().contains(ThreadFlags::USER));
    assert_eq!(sched.current_thread().vm::<PageTable>(), Some(&PageTable { root: 0x8000 }));
    assert!(sched.current_thread().vm::<u32>().is_none());

    let table = sched.detach_vm().and_then(|vm| vm.downcast::<PageTable>().ok());
    assert_eq!(table.map(|t| t.root), Some(0x8000));
    assert!(!sched.current_thread().flags().contains(ThreadFlags::USER));
}
