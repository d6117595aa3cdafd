/*
 * Multi-Level Queue Scheduler
 *
 * This module implements the MLQ scheduling class: a processor-local core
 * that decides which task runs next and how long it may run before a peer
 * of the same or higher urgency gets a turn.
 *
 * LEVELS:
 * =======
 *
 *   Level 1 → round-robin, 50ms slice   (most urgent)
 *   Level 2 → round-robin, 100ms slice
 *   Level 3 → first-come first-served   (least urgent)
 *
 * A runnable task of a more urgent level always runs before any task of a
 * less urgent one. Inside a level, tasks run in the order they were queued.
 *
 * HOST INTEGRATION:
 * =================
 *
 * The host's dispatch loop calls into the core at fixed hook points:
 *
 * 1. Task becomes runnable / blocks    → enqueue / dequeue
 * 2. Processor needs a task            → pick_next_task
 * 3. Timer interrupt                   → on_tick (running task)
 * 4. Task's class changes              → reconfigure
 * 5. Task yields                       → yield_task
 *
 * The core consumes a monotonic clock and a reschedule sink through the
 * HostSchedCtx trait. Reschedule requests are advisory; the host decides
 * when the context switch actually happens.
 *
 * TASK LIFECYCLE:
 * ===============
 *
 *   admit → (off-queue) → enqueue → queued → pick_next_task → running
 *             ^                       ^                          |
 *             |                       +--- yield / slice expiry -+
 *             +------------ dequeue (block) ---------------------+
 *
 * Dispatch takes a task off its class queue; yield and slice expiry put it
 * back at the tail. release() drops the task's scheduling state once it
 * leaves the class.
 *
 * LOCKING:
 * ========
 *
 * Every run queue is owned by one processor. Operations take &mut on the
 * per-CPU policy, i.e. they run with that processor's lock held, never
 * block, and are O(1) apart from pick_next (one pass over three levels).
 */

pub mod config;
pub mod error;
pub mod events;
pub mod policies;
pub mod run_queue;
pub mod sched_core;
pub mod task;
pub mod traits;
pub mod types;

#[cfg(test)]
mod tests_prop;

pub use config::{
    is_mlq_prio, MlqConfig, DEFAULT_TICK_HZ, FIRST_TIMESLICE_MS, MAX_CPUS, MLQ_PRIO_BASE,
    MLQ_WIDTH, SECOND_TIMESLICE_MS,
};
pub use error::{ConfigError, InvariantViolation, MlqError};
pub use events::{ReschedCause, TickOutcome};
pub use policies::MlqPolicy;
pub use run_queue::MlqRunQueue;
pub use sched_core::SchedulerCore;
pub use task::{ExecStats, MlqEntity, TaskArena};
pub use traits::{HostSchedCtx, SchedClass};
pub use types::{CpuId, DequeueFlags, EnqueueFlags, MlqLevel, Priority, TaskId, TimeSliceTicks};
