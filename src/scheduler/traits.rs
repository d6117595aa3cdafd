/*
 * Scheduler Trait Definitions
 *
 * This module defines the two seams between the MLQ core and its host:
 *
 * - HostSchedCtx: the services the core consumes from the host (clock,
 *   reschedule sink, priority of a foreign running task)
 * - SchedClass: the hook table the host's dispatch loop calls into, one
 *   instance per processor
 *
 * This separation allows:
 * 1. Registering the MLQ class next to other policies in the host's own table
 * 2. Testing the policy in isolation with a mock host
 * 3. Clear ownership boundaries (the core never reaches into host task objects)
 */

use core::time::Duration;

use super::{
    error::MlqError,
    events::{ReschedCause, TickOutcome},
    types::{CpuId, DequeueFlags, EnqueueFlags, Priority, TaskId},
};

/// Host services used by the scheduling core
///
/// The host implements this trait once and passes it into every operation
/// that needs the clock or may request a reschedule.
pub trait HostSchedCtx {
    /// Monotonic clock in nanoseconds
    fn now(&self) -> u64;

    /// Ask the dispatch loop of `cpu` to reschedule at the next opportunity
    ///
    /// This must not switch synchronously; the core may still be in the
    /// middle of an operation when it calls this.
    fn request_reschedule(&mut self, cpu: CpuId, cause: ReschedCause);

    /// Priority of the task running on `cpu` when it belongs to another
    /// scheduling class
    ///
    /// Returns None when the processor is idle or runs one of our tasks.
    fn current_prio(&self, _cpu: CpuId) -> Option<Priority> {
        None
    }
}

/// Scheduling class hook table
///
/// The host's dispatch loop calls these hooks with the processor's run queue
/// lock held (i.e. through `&mut self`). None of them block.
pub trait SchedClass: Send {
    /// Task became runnable
    fn enqueue_task(&mut self, ctx: &mut dyn HostSchedCtx, task: TaskId, flags: EnqueueFlags);

    /// Task stopped being runnable
    fn dequeue_task(&mut self, ctx: &mut dyn HostSchedCtx, task: TaskId, flags: DequeueFlags);

    /// Running task yields the CPU
    fn yield_task(&mut self, ctx: &mut dyn HostSchedCtx, task: TaskId);

    /// Should `task` preempt whatever runs now? Requests the reschedule itself.
    fn check_preempt_curr(&mut self, ctx: &mut dyn HostSchedCtx, task: TaskId) -> bool;

    /// Choose, dispatch and return the next task to run
    fn pick_next_task(&mut self, ctx: &mut dyn HostSchedCtx) -> Option<TaskId>;

    /// Running task is being switched out
    fn put_prev_task(&mut self, ctx: &mut dyn HostSchedCtx, task: TaskId);

    /// Task was made current by the host without going through pick_next_task
    fn set_next_task(&mut self, ctx: &mut dyn HostSchedCtx, task: TaskId);

    /// Periodic timer tick for the running task
    fn task_tick(&mut self, ctx: &mut dyn HostSchedCtx, task: TaskId) -> TickOutcome;

    /// Task's class number changed
    fn prio_changed(
        &mut self,
        ctx: &mut dyn HostSchedCtx,
        task: TaskId,
        new_class: u8,
    ) -> Result<(), MlqError>;

    /// Bring the running task's accounting up to date
    fn update_curr(&mut self, ctx: &mut dyn HostSchedCtx);

    /// Round-robin interval of a task (zero when not time-sliced)
    fn get_rr_interval(&self, task: TaskId) -> Duration;

    /// Processor a waking task should be placed on
    ///
    /// Placement is the host's decision; the default keeps the task on the
    /// processor that admitted it.
    fn select_task_cpu(&self, task: TaskId) -> CpuId {
        task.cpu()
    }

    /// Pull work from other processors before picking
    ///
    /// Load balancing is not implemented; returns whether anything was pulled.
    fn balance(&mut self, _ctx: &mut dyn HostSchedCtx) -> bool {
        false
    }

    /// Get the policy name for debugging
    fn name(&self) -> &'static str;
}
