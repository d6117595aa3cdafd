/*
 * MLQ Scheduling Core
 *
 * A multi-level queue CPU scheduling class for embedding in a host kernel's
 * dispatcher. The crate is no_std and only needs an allocator for the
 * per-processor task arenas.
 *
 * See the scheduler module for the policy and the host integration points.
 */

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod scheduler;

pub use scheduler::{
    is_mlq_prio, ConfigError, CpuId, DequeueFlags, EnqueueFlags, ExecStats, HostSchedCtx,
    InvariantViolation, MlqConfig, MlqError, MlqLevel, MlqPolicy, Priority, ReschedCause,
    SchedClass, SchedulerCore, TaskId, TickOutcome, TimeSliceTicks,
};
