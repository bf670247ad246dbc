//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!
//! 调度核心的性质测试

use std::cmp::Reverse;

use kestrel::config::{DONATION_MAX_DEPTH, PRI_DEFAULT, PRI_MAX, PRI_MIN};
use kestrel::fixed_point::Fixed;
use kestrel::sched::{Dispatch, ReadyQueue, SchedConfig, Scheduler, SleepQueue};
use kestrel::sync::Acquire;
use proptest::prelude::*;

fn finish(sched: &mut Scheduler, dispatch: Dispatch) {
    if let Dispatch::Switch { prev, .. } = dispatch {
        let _ = sched.finish_switch(Some(prev));
    }
}

/// 构造长度为 `len` 的锁等待链，返回 main 最终的有效优先级
fn chain_priority(len: usize) -> i32 {
    let mut sched = Scheduler::new(SchedConfig::default());
    sched.start();

    let mut held = sched.lock_create();
    assert_eq!(sched.lock_acquire(held), Acquire::Acquired);
    for i in 1..=len {
        let (_, dispatch) = sched.create("link", PRI_DEFAULT + i as i32).unwrap();
        finish(&mut sched, dispatch);

        let own = sched.lock_create();
        assert_eq!(sched.lock_acquire(own), Acquire::Acquired);
        match sched.lock_acquire(held) {
            Acquire::Blocked(dispatch) => finish(&mut sched, dispatch),
            Acquire::Acquired => panic!("chain lock was free"),
        }
        held = own;
    }
    sched.priority()
}

proptest! {
    #[test]
    fn ready_queue_pops_by_priority_then_fifo(
        priorities in prop::collection::vec(PRI_MIN..=PRI_MAX, 0..64)
    ) {
        let mut rq = ReadyQueue::new();
        for (tid, &priority) in priorities.iter().enumerate() {
            rq.insert(tid as u32, priority);
        }

        let mut expected: Vec<u32> = (0..priorities.len() as u32).collect();
        expected.sort_by_key(|&tid| Reverse(priorities[tid as usize]));

        let popped: Vec<u32> = std::iter::from_fn(|| rq.pop()).collect();
        prop_assert_eq!(popped, expected);
    }

    #[test]
    fn sleepers_wake_exactly_at_deadline(
        deadlines in prop::collection::vec(1i64..200, 1..32)
    ) {
        let mut sq = SleepQueue::new();
        for (tid, &deadline) in deadlines.iter().enumerate() {
            sq.push(tid as u32, deadline);
        }

        for now in 0..200 {
            for tid in sq.take_due(now) {
                prop_assert_eq!(deadlines[tid as usize], now);
            }
        }
        prop_assert!(sq.is_empty());
    }

    #[test]
    fn fixed_integer_arithmetic_is_exact(a in -1_000i32..1_000, b in -100i32..100) {
        let x = Fixed::from_int(a);
        prop_assert_eq!(x.to_int(), a);
        prop_assert_eq!(x.to_int_round(), a);
        prop_assert_eq!((x + b).to_int(), a + b);
        prop_assert_eq!((x * b).to_int(), a * b);
        prop_assert_eq!((x * Fixed::from_int(b)).to_int(), a * b);
    }

    #[test]
    fn fixed_mul_div_round_trip_within_one_ulp(
        x in -(1i32 << 25)..(1i32 << 25),
        y in (1i32 << 14)..=(1i32 << 20),
        negate in any::<bool>(),
    ) {
        let x = Fixed::from_raw(x);
        let y = Fixed::from_raw(if negate { -y } else { y });
        let back = (x * y) / y;
        prop_assert!((back.raw() - x.raw()).abs() <= 1, "{:?} came back as {:?}", x, back);
    }

    #[test]
    fn fixed_rounding_is_nearest(n in -100_000i32..100_000, d in 1i32..1000) {
        let q = Fixed::from_int(n) / d;
        let exact = n as f64 / d as f64;
        prop_assert!((q.to_int_round() as f64 - exact).abs() <= 0.5 + 1e-3);
        prop_assert!((q.to_int() as f64).abs() <= exact.abs());
    }

    #[test]
    fn donation_reaches_at_most_eight_levels(len in 1usize..12) {
        let expected = PRI_DEFAULT + len.min(DONATION_MAX_DEPTH) as i32;
        prop_assert_eq!(chain_priority(len), expected);
    }
}
