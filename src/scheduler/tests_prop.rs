#![cfg(test)]
//! Property-based tests for the MLQ policy
//!
//! TEST_SCOPE:
//!   - Random operation sequences keep every run queue invariant
//!   - Picks always come from the most urgent non-empty level
//!   - Round-robin rotation happens exactly once per slice
//!   - Level 3 tasks are never moved by the tick handler

use alloc::vec::Vec;

use proptest::prelude::*;

use super::{
    CpuId, DequeueFlags, EnqueueFlags, HostSchedCtx, MlqConfig, MlqLevel, MlqPolicy, ReschedCause,
    TaskId, TickOutcome,
};

#[derive(Default)]
struct Host {
    now: u64,
    resched: usize,
}

impl HostSchedCtx for Host {
    fn now(&self) -> u64 {
        self.now
    }

    fn request_reschedule(&mut self, _cpu: CpuId, _cause: ReschedCause) {
        self.resched += 1;
    }
}

#[derive(Debug, Clone)]
enum Op {
    Admit(u8),
    Enqueue(usize, bool),
    Dequeue(usize),
    Requeue(usize),
    Yield,
    Tick(u8),
    Reconfigure(usize, u8),
    Switch,
    Release(usize),
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u8..=4).prop_map(Op::Admit),
        (any::<usize>(), any::<bool>()).prop_map(|(i, w)| Op::Enqueue(i, w)),
        any::<usize>().prop_map(Op::Dequeue),
        any::<usize>().prop_map(Op::Requeue),
        Just(Op::Yield),
        (1u8..8).prop_map(Op::Tick),
        (any::<usize>(), 0u8..=4).prop_map(|(i, c)| Op::Reconfigure(i, c)),
        Just(Op::Switch),
        any::<usize>().prop_map(Op::Release),
    ]
}

fn small_policy() -> MlqPolicy {
    // 2-tick / 4-tick slices keep expiry reachable in short sequences
    let config = MlqConfig::new()
        .with_tick_hz(40)
        .with_first_slice_ms(50)
        .with_second_slice_ms(100);
    MlqPolicy::new(CpuId::BSP, config).unwrap()
}

fn pick(tasks: &[TaskId], i: usize) -> Option<TaskId> {
    if tasks.is_empty() {
        None
    } else {
        Some(tasks[i % tasks.len()])
    }
}

fn apply(p: &mut MlqPolicy, host: &mut Host, tasks: &mut Vec<TaskId>, op: Op) {
    host.now += 1_000;
    match op {
        Op::Admit(class) => {
            let before = p.run_queue().tasks().len();
            match p.admit(class) {
                Ok(task) => tasks.push(task),
                Err(_) => assert_eq!(p.run_queue().tasks().len(), before),
            }
        }
        Op::Enqueue(i, wakeup) => {
            if let Some(task) = pick(tasks, i) {
                if p.current() != Some(task) {
                    let flags = if wakeup {
                        EnqueueFlags::WAKEUP
                    } else {
                        EnqueueFlags::empty()
                    };
                    p.enqueue(host, task, flags);
                }
            }
        }
        Op::Dequeue(i) => {
            if let Some(task) = pick(tasks, i) {
                p.dequeue(host, task, DequeueFlags::SLEEP);
            }
        }
        Op::Requeue(i) => {
            if let Some(task) = pick(tasks, i) {
                p.requeue(task);
            }
        }
        Op::Yield => {
            if let Some(curr) = p.current() {
                p.yield_task(host, curr);
            }
        }
        Op::Tick(n) => {
            if let Some(curr) = p.current() {
                for _ in 0..n {
                    p.on_tick(host, curr);
                }
            }
        }
        Op::Reconfigure(i, class) => {
            if let Some(task) = pick(tasks, i) {
                let level = p.level(task);
                if p.reconfigure(host, task, class).is_err() {
                    assert_eq!(p.level(task), level);
                }
            }
        }
        Op::Switch => {
            if let Some(curr) = p.current() {
                p.put_prev(host, curr);
            }
            p.pick_next_task(host);
        }
        Op::Release(i) => {
            if let Some(task) = pick(tasks, i) {
                p.release(host, task);
                tasks.retain(|t| *t != task);
            }
        }
    }
}

proptest! {
    #[test]
    fn random_operations_preserve_invariants(ops in proptest::collection::vec(arb_op(), 1..120)) {
        let mut p = small_policy();
        let mut host = Host::default();
        let mut tasks = Vec::new();

        for op in ops {
            apply(&mut p, &mut host, &mut tasks, op);
            prop_assert_eq!(p.check_invariants(), Ok(()));

            // A task appears in at most one queue
            let mut seen = Vec::new();
            for level in MlqLevel::ALL {
                for task in p.queued_tasks(level) {
                    prop_assert!(!seen.contains(&task));
                    prop_assert_eq!(p.level(task), level);
                    seen.push(task);
                }
            }
            prop_assert_eq!(seen.len(), p.nr_running());

            // The pick comes from the most urgent non-empty level
            if let Some(next) = p.pick_next() {
                for level in MlqLevel::ALL {
                    if level == p.level(next) {
                        break;
                    }
                    prop_assert!(p.queued_tasks(level).is_empty());
                }
                prop_assert_eq!(p.queued_tasks(p.level(next)).first().copied(), Some(next));
            } else {
                prop_assert_eq!(p.nr_running(), 0);
            }
        }
    }

    #[test]
    fn fifo_within_a_level(classes in proptest::collection::vec(1u8..=3, 1..24)) {
        let mut p = small_policy();
        let mut host = Host::default();
        let mut admitted = Vec::new();
        for class in classes {
            let task = p.admit(class).unwrap();
            p.enqueue(&mut host, task, EnqueueFlags::empty());
            admitted.push(task);
        }

        let mut dispatched = Vec::new();
        while let Some(task) = p.pick_next_task(&host) {
            p.put_prev(&host, task);
            dispatched.push(task);
        }

        // Dispatch order: by level, then admission order
        let mut expected = admitted.clone();
        expected.sort_by_key(|task| p.level(*task));
        prop_assert_eq!(dispatched, expected);
    }

    #[test]
    fn slice_expiry_rotates_once_per_slice(class in 1u8..=2, peers in 1usize..4, rounds in 1u32..6) {
        let mut p = small_policy();
        let mut host = Host::default();
        let runner = p.admit(class).unwrap();
        p.enqueue(&mut host, runner, EnqueueFlags::empty());
        for _ in 0..peers {
            let peer = p.admit(class).unwrap();
            p.enqueue(&mut host, peer, EnqueueFlags::empty());
        }
        prop_assert_eq!(p.pick_next_task(&host), Some(runner));

        // The host switches away after every requested reschedule
        let slice = p.config().slice_ticks(p.level(runner)).get();
        let mut current = runner;
        let mut requeues = 0;
        for tick in 1..=slice * rounds {
            let expired = tick % slice == 0;
            let outcome = p.on_tick(&mut host, current);
            prop_assert_eq!(outcome == TickOutcome::Requeued, expired);
            if expired {
                requeues += 1;
                prop_assert_eq!(p.queued_tasks(p.level(current)).last().copied(), Some(current));
                p.put_prev(&host, current);
                let next = p.pick_next_task(&host);
                prop_assert!(next.is_some() && next != Some(current));
                current = next.unwrap_or(current);
            }
        }
        prop_assert_eq!(requeues, rounds);
        prop_assert_eq!(host.resched, rounds as usize);
    }

    #[test]
    fn unsliced_level_never_moves_on_tick(ticks in 1u32..2000, peers in 0usize..4) {
        let mut p = small_policy();
        let mut host = Host::default();
        let runner = p.admit(3).unwrap();
        p.enqueue(&mut host, runner, EnqueueFlags::empty());
        for _ in 0..peers {
            let peer = p.admit(3).unwrap();
            p.enqueue(&mut host, peer, EnqueueFlags::empty());
        }
        let queue_before = p.queued_tasks(MlqLevel::Third);

        for _ in 0..ticks {
            prop_assert_eq!(p.on_tick(&mut host, runner), TickOutcome::Unsliced);
        }
        prop_assert_eq!(p.queued_tasks(MlqLevel::Third), queue_before);
        prop_assert_eq!(p.time_slice(runner), 0);
        prop_assert_eq!(host.resched, 0);
    }
}
