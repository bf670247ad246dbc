// 测试：定时睡眠与唤醒
//
// 测试内容：
// 1. sleep_until 阻塞到指定滴答，期间不在就绪队列
// 2. 同一滴答到期的线程按睡眠顺序唤醒
// 3. 唤醒时刻已过时立即返回

use alloc::vec::Vec;

use super::{boot, complete, spawn, switch_to};
use crate::process::task::{ThreadState, Tid};
use crate::sched::{Dispatch, SchedPolicy, TID_INITIAL};

const MAIN: Tid = TID_INITIAL;

#[test]
fn test_sleep_until_deadline() {
    let mut sched = boot(SchedPolicy::Priority);
    let idle = sched.idle().unwrap();
    for _ in 0..10 {
        sched.tick();
    }
    assert_eq!(sched.ticks(), 10);

    let dispatch = sched.sleep_until(100);
    switch_to(&mut sched, dispatch, idle);
    assert_eq!(sched.thread(MAIN).map(|t| t.wakeup_tick()), Some(100));
    assert_eq!(sched.sleep_queue().next_wakeup(), 100);

    while sched.ticks() < 99 {
        sched.tick();
        assert_eq!(sched.thread(MAIN).map(|t| t.state()), Some(ThreadState::Blocked));
        assert!(!sched.ready_queue().contains(MAIN));
    }

    assert!(sched.tick(), "woken thread should preempt idle");
    assert_eq!(sched.ticks(), 100);
    assert_eq!(sched.thread(MAIN).map(|t| t.state()), Some(ThreadState::Ready));
    assert!(sched.sleep_queue().is_empty());

    let dispatch = sched.yield_current();
    switch_to(&mut sched, dispatch, MAIN);
    assert_eq!(sched.stats().idle_ticks, 90);
}

#[test]
fn test_same_tick_wakes_in_sleep_order() {
    let mut sched = boot(SchedPolicy::Priority);

    let first = spawn(&mut sched, "first", 40);
    let dispatch = sched.sleep_until(5);
    switch_to(&mut sched, dispatch, MAIN);

    let second = spawn(&mut sched, "second", 40);
    let dispatch = sched.sleep_until(5);
    switch_to(&mut sched, dispatch, MAIN);

    let dispatch = sched.sleep_until(3);
    complete(&mut sched, dispatch);
    assert_eq!(sched.sleep_queue().len(), 3);

    for _ in 0..3 {
        sched.tick();
    }
    assert_eq!(sched.ready_queue().head().map(|(tid, _)| tid), Some(MAIN));

    sched.tick();
    sched.tick();
    let order: Vec<Tid> = sched.ready_queue().iter().map(|(tid, _)| tid).collect();
    assert_eq!(order, [first, second, MAIN]);
}

#[test]
fn test_sleep_in_past_returns_immediately() {
    let mut sched = boot(SchedPolicy::Priority);
    for _ in 0..5 {
        sched.tick();
    }
    assert_eq!(sched.sleep_until(5), Dispatch::Stay);
    assert_eq!(sched.sleep_until(0), Dispatch::Stay);
    assert_eq!(sched.current_thread().state(), ThreadState::Running);
    assert!(sched.sleep_queue().is_empty());
}

#[test]
fn test_idle_never_sleeps() {
    let mut sched = boot(SchedPolicy::Priority);
    let idle = sched.idle().unwrap();
    let dispatch = sched.block_current();
    switch_to(&mut sched, dispatch, idle);

    assert_eq!(sched.sleep_until(50), Dispatch::Stay);
    assert!(sched.sleep_queue().is_empty());
}

#[test]
fn test_wake_due_skips_future_sleepers() {
    let mut sched = boot(SchedPolicy::Priority);
    let sleeper = spawn(&mut sched, "sleeper", 40);
    let dispatch = sched.sleep_until(20);
    switch_to(&mut sched, dispatch, MAIN);

    assert_eq!(sched.wake_due(19), 0);
    assert_eq!(sched.wake_due(20), 1);
    assert!(sched.ready_queue().contains(sleeper));
}
