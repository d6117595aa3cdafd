/*
 * Multi-Level Queue Scheduling Policy
 *
 * Strict priority across three levels, round-robin inside a level:
 *
 *   Level 1 → 50ms slice  (most urgent)
 *   Level 2 → 100ms slice
 *   Level 3 → no slice, first-come first-served (least urgent)
 *
 * A task of a more urgent level always runs before any task of a less urgent
 * one. Inside a level, tasks run in queue order. When a level 1/2 task uses
 * up its slice it is moved to the tail of its level, but only if a peer is
 * actually waiting there; otherwise the slice is refilled and the task keeps
 * the CPU without a context switch.
 *
 * One MlqPolicy instance exists per processor and owns that processor's run
 * queue. The host serialises all calls by holding the instance's lock.
 */

use core::time::Duration;

use super::super::{
    config::MlqConfig,
    error::{InvariantViolation, MlqError},
    events::{ReschedCause, TickOutcome},
    run_queue::MlqRunQueue,
    task::{ExecStats, MlqEntity},
    traits::{HostSchedCtx, SchedClass},
    types::{CpuId, DequeueFlags, EnqueueFlags, MlqLevel, Priority, TaskId},
};

/// Per-processor MLQ policy
pub struct MlqPolicy {
    rq: MlqRunQueue,
    config: MlqConfig,
}

impl MlqPolicy {
    /// Create the policy for one processor
    ///
    /// Fails if the configuration cannot drive the tick handler.
    pub fn new(cpu: CpuId, config: MlqConfig) -> Result<Self, MlqError> {
        config.validate()?;
        Ok(Self {
            rq: MlqRunQueue::new(cpu),
            config,
        })
    }

    pub fn cpu(&self) -> CpuId {
        self.rq.cpu()
    }

    pub fn config(&self) -> &MlqConfig {
        &self.config
    }

    pub fn run_queue(&self) -> &MlqRunQueue {
        &self.rq
    }

    // ========================================================================
    // ADMISSION AND RECONFIGURATION
    // ========================================================================

    /// Admit a task into the MLQ class with raw class number `class` (1..=3)
    ///
    /// The task starts off-queue with its level's default slice; the host
    /// enqueues it once it is runnable.
    pub fn admit(&mut self, class: u8) -> Result<TaskId, MlqError> {
        let level = MlqLevel::try_from(class)?;
        let slice = self.config.slice_ticks(level);
        let task = self.rq.insert(MlqEntity::new(level, slice));
        log::debug!(
            "[MLQ] {}: admitted {} at {} (slice {} ticks)",
            self.cpu(),
            task,
            level,
            slice.get()
        );
        Ok(task)
    }

    /// Move a task to another level
    ///
    /// A queued task is detached and appended at the tail of the new level.
    /// The slice restarts from the new level's default either way. Invalid
    /// class numbers are rejected with the task untouched.
    pub fn reconfigure(
        &mut self,
        ctx: &mut dyn HostSchedCtx,
        task: TaskId,
        new_class: u8,
    ) -> Result<(), MlqError> {
        let new_level = MlqLevel::try_from(new_class)?;
        let (old_level, queued) = {
            let entity = self.rq.entity(task);
            (entity.level, entity.on_rq)
        };

        if queued {
            self.dequeue(ctx, task, DequeueFlags::SAVE);
        }
        let slice = self.config.slice_ticks(new_level);
        {
            let entity = self.rq.entity_mut(task);
            entity.level = new_level;
            entity.time_slice = slice.get();
        }
        if queued {
            self.enqueue(ctx, task, EnqueueFlags::RESTORE);
        }

        log::debug!(
            "[MLQ] {}: {} moved {} -> {}",
            self.cpu(),
            task,
            old_level,
            new_level
        );

        if self.rq.curr() == Some(task) {
            if old_level.prio().is_more_urgent_than(new_level.prio()) {
                self.resched(ctx, ReschedCause::PriorityLowered);
            }
        } else if queued {
            let current = self.current_prio(ctx);
            self.preempt_if_more_urgent(
                ctx,
                new_level.prio(),
                current,
                ReschedCause::PriorityRaised,
            );
        }
        Ok(())
    }

    /// Forget a task that left the class or died
    ///
    /// Detaches it, settles its accounting if it was running, frees its slot
    /// and returns its final statistics. The handle is stale afterwards.
    pub fn release(&mut self, ctx: &dyn HostSchedCtx, task: TaskId) -> ExecStats {
        if self.rq.curr() == Some(task) {
            self.update_runtime(task, ctx.now());
        }
        let entity = self.rq.remove(task);
        log::debug!("[MLQ] {}: released {}", self.cpu(), task);
        entity.stats
    }

    // ========================================================================
    // QUEUE OPERATIONS
    // ========================================================================

    /// Put a task at the tail of its level
    ///
    /// Enqueueing a task that is already queued moves it to the tail. With
    /// `WAKEUP`, the task is also checked against the running one.
    pub fn enqueue(&mut self, ctx: &mut dyn HostSchedCtx, task: TaskId, flags: EnqueueFlags) {
        self.rq.enqueue_entity(task);
        log::trace!("[MLQ] {}: enqueue {} ({:?})", self.cpu(), task, flags);

        if flags.contains(EnqueueFlags::WAKEUP) {
            self.check_preempt_curr(ctx, task);
        }
    }

    /// Take a task off its queue; no-op when it is not queued
    pub fn dequeue(&mut self, ctx: &mut dyn HostSchedCtx, task: TaskId, flags: DequeueFlags) {
        if self.rq.curr() == Some(task) {
            self.update_runtime(task, ctx.now());
        }
        self.rq.dequeue_entity(task);
        log::trace!("[MLQ] {}: dequeue {} ({:?})", self.cpu(), task, flags);
    }

    /// Rotate a task to the tail of its level
    pub fn requeue(&mut self, task: TaskId) {
        self.rq.requeue_entity(task);
    }

    /// Voluntary yield: rotate to the tail, slice untouched
    pub fn yield_task(&mut self, ctx: &mut dyn HostSchedCtx, task: TaskId) {
        self.rq.requeue_entity(task);
        self.resched(ctx, ReschedCause::Yield);
    }

    // ========================================================================
    // DISPATCH
    // ========================================================================

    /// Head of the most urgent non-empty level, without dispatching it
    pub fn pick_next(&self) -> Option<TaskId> {
        self.rq.peek_next()
    }

    /// Pick the next task, take it off its queue and dispatch it
    pub fn pick_next_task(&mut self, ctx: &dyn HostSchedCtx) -> Option<TaskId> {
        let task = self.pick_next()?;
        self.rq.dequeue_entity(task);
        self.on_dispatch(ctx, task);
        Some(task)
    }

    /// Record that `task` starts executing now
    ///
    /// A previous task still marked current (the host skipped `put_prev`)
    /// has its last interval settled first.
    pub fn on_dispatch(&mut self, ctx: &dyn HostSchedCtx, task: TaskId) {
        let now = ctx.now();
        if let Some(prev) = self.rq.curr() {
            if prev != task {
                self.update_runtime(prev, now);
            }
        }
        self.rq.entity_mut(task).stats.exec_start = now;
        self.rq.set_curr(Some(task));
        log::trace!("[MLQ] {}: dispatch {} at {}", self.cpu(), task, now);
    }

    /// The running task is being switched out
    pub fn put_prev(&mut self, ctx: &dyn HostSchedCtx, task: TaskId) {
        self.update_runtime(task, ctx.now());
        if self.rq.curr() == Some(task) {
            self.rq.set_curr(None);
        }
    }

    /// Request a reschedule if `candidate` is strictly more urgent than
    /// `current`; returns whether it did
    pub fn check_preempt(
        &mut self,
        ctx: &mut dyn HostSchedCtx,
        candidate: TaskId,
        current: TaskId,
    ) -> bool {
        let candidate_prio = self.rq.entity(candidate).level.prio();
        let current_prio = self.rq.entity(current).level.prio();
        self.preempt_if_more_urgent(
            ctx,
            candidate_prio,
            Some(current_prio),
            ReschedCause::Wakeup,
        )
    }

    /// Like `check_preempt`, against whatever runs on this processor now
    ///
    /// An idle processor is always preempted.
    pub fn check_preempt_curr(&mut self, ctx: &mut dyn HostSchedCtx, candidate: TaskId) -> bool {
        if self.rq.curr() == Some(candidate) {
            return false;
        }
        let candidate_prio = self.rq.entity(candidate).level.prio();
        let current_prio = self.current_prio(ctx);
        self.preempt_if_more_urgent(ctx, candidate_prio, current_prio, ReschedCause::Wakeup)
    }

    /// An idle processor (`current == None`) is always preempted
    fn preempt_if_more_urgent(
        &mut self,
        ctx: &mut dyn HostSchedCtx,
        candidate: Priority,
        current: Option<Priority>,
        cause: ReschedCause,
    ) -> bool {
        let preempt = match current {
            Some(current) => candidate.is_more_urgent_than(current),
            None => true,
        };
        if preempt {
            self.resched(ctx, cause);
        }
        preempt
    }

    fn current_prio(&self, ctx: &dyn HostSchedCtx) -> Option<Priority> {
        match self.rq.curr() {
            Some(curr) => Some(self.rq.entity(curr).level.prio()),
            None => ctx.current_prio(self.cpu()),
        }
    }

    // ========================================================================
    // TIME ACCOUNTING
    // ========================================================================

    /// Fold the time since the task's last update into its runtime
    ///
    /// Returns the interval that was accounted.
    pub fn update_runtime(&mut self, task: TaskId, now: u64) -> u64 {
        let delta = self.rq.entity_mut(task).account(now);
        log::trace!("[MLQ] {}: {} ran {}ns", self.cpu(), task, delta);
        delta
    }

    /// Bring the running task's accounting up to date
    pub fn update_curr(&mut self, ctx: &dyn HostSchedCtx) {
        if let Some(curr) = self.rq.curr() {
            self.update_runtime(curr, ctx.now());
        }
    }

    /// Timer tick for the running task
    ///
    /// Level 3 tasks are only accounted. Level 1/2 tasks burn one tick of
    /// their slice; on expiry the slice is refilled and, if a peer of the
    /// same level is waiting, the task is rotated to the tail and a
    /// reschedule is requested.
    pub fn on_tick(&mut self, ctx: &mut dyn HostSchedCtx, task: TaskId) -> TickOutcome {
        self.update_runtime(task, ctx.now());

        let level = self.rq.entity(task).level;
        if !level.is_timesliced() {
            return TickOutcome::Unsliced;
        }

        let refill = self.config.slice_ticks(level).get();
        let entity = self.rq.entity_mut(task);
        entity.time_slice = entity.time_slice.saturating_sub(1);
        if entity.time_slice > 0 {
            return TickOutcome::Continue {
                remaining: entity.time_slice,
            };
        }
        entity.time_slice = refill;

        if !self.rq.has_waiting_peers(task) {
            log::trace!("[MLQ] {}: {} slice refilled, no peer waiting", self.cpu(), task);
            return TickOutcome::SliceReset;
        }

        self.rq.requeue_entity(task);
        self.resched(ctx, ReschedCause::SliceExpired);
        TickOutcome::Requeued
    }

    /// Round-robin interval of a task (zero for level 3)
    pub fn query_slice_length(&self, task: TaskId) -> Duration {
        self.config.slice_duration(self.rq.entity(task).level)
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    pub fn contains(&self, task: TaskId) -> bool {
        self.rq.contains(task)
    }

    pub fn level(&self, task: TaskId) -> MlqLevel {
        self.rq.entity(task).level()
    }

    pub fn time_slice(&self, task: TaskId) -> u32 {
        self.rq.entity(task).time_slice()
    }

    pub fn is_queued(&self, task: TaskId) -> bool {
        self.rq.entity(task).is_queued()
    }

    pub fn stats(&self, task: TaskId) -> ExecStats {
        self.rq.entity(task).stats()
    }

    /// Task currently dispatched on this processor
    pub fn current(&self) -> Option<TaskId> {
        self.rq.curr()
    }

    /// Number of queued tasks
    pub fn nr_running(&self) -> usize {
        self.rq.nr_running()
    }

    /// Queued tasks of one level, head first
    pub fn queued_tasks(&self, level: MlqLevel) -> alloc::vec::Vec<TaskId> {
        self.rq.queued_tasks(level)
    }

    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        self.rq
            .check_invariants(|level| self.config.slice_ticks(level).get())
    }

    fn resched(&self, ctx: &mut dyn HostSchedCtx, cause: ReschedCause) {
        log::debug!(
            "[MLQ] {}: reschedule requested ({})",
            self.cpu(),
            cause.name()
        );
        ctx.request_reschedule(self.cpu(), cause);
    }
}

impl SchedClass for MlqPolicy {
    fn enqueue_task(&mut self, ctx: &mut dyn HostSchedCtx, task: TaskId, flags: EnqueueFlags) {
        self.enqueue(ctx, task, flags);
    }

    fn dequeue_task(&mut self, ctx: &mut dyn HostSchedCtx, task: TaskId, flags: DequeueFlags) {
        self.dequeue(ctx, task, flags);
    }

    fn yield_task(&mut self, ctx: &mut dyn HostSchedCtx, task: TaskId) {
        MlqPolicy::yield_task(self, ctx, task);
    }

    fn check_preempt_curr(&mut self, ctx: &mut dyn HostSchedCtx, task: TaskId) -> bool {
        MlqPolicy::check_preempt_curr(self, ctx, task)
    }

    fn pick_next_task(&mut self, ctx: &mut dyn HostSchedCtx) -> Option<TaskId> {
        MlqPolicy::pick_next_task(self, ctx)
    }

    fn put_prev_task(&mut self, ctx: &mut dyn HostSchedCtx, task: TaskId) {
        self.put_prev(ctx, task);
    }

    fn set_next_task(&mut self, ctx: &mut dyn HostSchedCtx, task: TaskId) {
        self.rq.dequeue_entity(task);
        self.on_dispatch(ctx, task);
    }

    fn task_tick(&mut self, ctx: &mut dyn HostSchedCtx, task: TaskId) -> TickOutcome {
        self.on_tick(ctx, task)
    }

    fn prio_changed(
        &mut self,
        ctx: &mut dyn HostSchedCtx,
        task: TaskId,
        new_class: u8,
    ) -> Result<(), MlqError> {
        self.reconfigure(ctx, task, new_class)
    }

    fn update_curr(&mut self, ctx: &mut dyn HostSchedCtx) {
        MlqPolicy::update_curr(self, ctx);
    }

    fn get_rr_interval(&self, task: TaskId) -> Duration {
        self.query_slice_length(task)
    }

    fn name(&self) -> &'static str {
        "MLQ"
    }
}

impl core::fmt::Debug for MlqPolicy {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MlqPolicy")
            .field("rq", &self.rq)
            .field("config", &self.config)
            .finish()
    }
}
