//! Host double shared by the integration tests

#![allow(dead_code)]

use mlq_sched::{CpuId, HostSchedCtx, Priority, ReschedCause};

/// Fake host: settable clock, optional foreign running task, and a log of
/// every reschedule request the core made
#[derive(Default)]
pub struct RecordingHost {
    pub now: u64,
    pub foreign_prio: Option<Priority>,
    pub resched: Vec<(CpuId, ReschedCause)>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the clock by `ms` milliseconds
    pub fn advance_ms(&mut self, ms: u64) {
        self.now += ms * 1_000_000;
    }

    pub fn causes(&self) -> Vec<ReschedCause> {
        self.resched.iter().map(|(_, cause)| *cause).collect()
    }
}

impl HostSchedCtx for RecordingHost {
    fn now(&self) -> u64 {
        self.now
    }

    fn request_reschedule(&mut self, cpu: CpuId, cause: ReschedCause) {
        self.resched.push((cpu, cause));
    }

    fn current_prio(&self, _cpu: CpuId) -> Option<Priority> {
        self.foreign_prio
    }
}
