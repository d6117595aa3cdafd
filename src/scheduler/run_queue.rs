/*
 * MLQ Run Queue
 *
 * One MlqRunQueue exists per processor. It owns:
 *
 * 1. CLASS QUEUES: one FIFO per level, indexed by level - 1
 * 2. TASK ARENA: the entities of every task placed on this processor
 * 3. CURRENT TASK: the task this processor dispatched last, if it is ours
 *
 * QUEUE PRIMITIVES:
 * =================
 *
 * - enqueue: detach if already linked, then append at the tail of the
 *            task's level (idempotent)
 * - dequeue: detach if linked (no-op otherwise)
 * - requeue: detach and append at the tail of the task's level; a task that
 *            is off-queue simply lands at the tail
 *
 * A running task is kept off the class queues. It comes back through
 * enqueue (preempted / woken) or requeue (yield / slice expiry).
 *
 * All primitives are O(1). Nothing here blocks; callers serialise access by
 * holding &mut, which for a shared run queue means holding its lock.
 */

use alloc::vec::Vec;

use super::{
    config::MLQ_WIDTH,
    error::InvariantViolation,
    task::{MlqEntity, TaskArena},
    types::{CpuId, MlqLevel, TaskId},
};

/// Doubly linked FIFO of arena slots
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ClassQueue {
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
}

impl ClassQueue {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn front(&self) -> Option<usize> {
        self.head
    }

    /// Link `index` at the tail. The entity must not be linked anywhere.
    pub fn push_back(&mut self, tasks: &mut TaskArena, index: usize) {
        let old_tail = self.tail;
        {
            let entity = tasks.at_mut(index);
            entity.link.prev = old_tail;
            entity.link.next = None;
            entity.on_rq = true;
        }
        match old_tail {
            Some(tail) => tasks.at_mut(tail).link.next = Some(index),
            None => self.head = Some(index),
        }
        self.tail = Some(index);
        self.len += 1;
    }

    /// Unlink `index`. The entity must be linked into this queue.
    pub fn unlink(&mut self, tasks: &mut TaskArena, index: usize) {
        let link = tasks.at(index).link;
        match link.prev {
            Some(prev) => tasks.at_mut(prev).link.next = link.next,
            None => self.head = link.next,
        }
        match link.next {
            Some(next) => tasks.at_mut(next).link.prev = link.prev,
            None => self.tail = link.prev,
        }
        let entity = tasks.at_mut(index);
        entity.link = Default::default();
        entity.on_rq = false;
        self.len -= 1;
    }
}

/// Per-processor multi-level run queue
pub struct MlqRunQueue {
    cpu: CpuId,
    queues: [ClassQueue; MLQ_WIDTH],
    tasks: TaskArena,
    curr: Option<TaskId>,
    nr_running: usize,
}

impl MlqRunQueue {
    pub fn new(cpu: CpuId) -> Self {
        Self {
            cpu,
            queues: [ClassQueue::default(); MLQ_WIDTH],
            tasks: TaskArena::new(cpu),
            curr: None,
            nr_running: 0,
        }
    }

    /// The processor owning this run queue
    pub fn cpu(&self) -> CpuId {
        self.cpu
    }

    /// Number of queued tasks across all levels
    pub fn nr_running(&self) -> usize {
        self.nr_running
    }

    /// Number of queued tasks on one level
    pub fn level_len(&self, level: MlqLevel) -> usize {
        self.queues[level.index()].len()
    }

    pub fn is_empty(&self) -> bool {
        self.nr_running == 0
    }

    /// Task currently dispatched on this processor
    pub fn curr(&self) -> Option<TaskId> {
        self.curr
    }

    pub(crate) fn set_curr(&mut self, task: Option<TaskId>) {
        self.curr = task;
    }

    pub fn tasks(&self) -> &TaskArena {
        &self.tasks
    }

    pub fn contains(&self, task: TaskId) -> bool {
        self.tasks.contains(task)
    }

    // ========================================================================
    // ENTITY ACCESS
    // ========================================================================

    /// Entity behind a handle
    ///
    /// # Panics
    /// If the handle is stale or belongs to another processor. Both mean the
    /// host broke the calling contract.
    pub fn entity(&self, task: TaskId) -> &MlqEntity {
        match self.tasks.get(task) {
            Some(entity) => entity,
            None => panic!("{} is not a live task of {}", task, self.cpu),
        }
    }

    pub(crate) fn entity_mut(&mut self, task: TaskId) -> &mut MlqEntity {
        let cpu = self.cpu;
        match self.tasks.get_mut(task) {
            Some(entity) => entity,
            None => panic!("{} is not a live task of {}", task, cpu),
        }
    }

    pub(crate) fn insert(&mut self, entity: MlqEntity) -> TaskId {
        self.tasks.insert(entity)
    }

    /// Detach and free a task. Returns its entity.
    pub(crate) fn remove(&mut self, task: TaskId) -> MlqEntity {
        self.dequeue_entity(task);
        if self.curr == Some(task) {
            self.curr = None;
        }
        match self.tasks.remove(task) {
            Some(entity) => entity,
            None => panic!("{} is not a live task of {}", task, self.cpu),
        }
    }

    // ========================================================================
    // QUEUE PRIMITIVES
    // ========================================================================

    /// Append at the tail of the task's level, detaching first if queued
    pub fn enqueue_entity(&mut self, task: TaskId) {
        self.dequeue_entity(task);
        let level = self.entity(task).level;
        self.queues[level.index()].push_back(&mut self.tasks, task.slot());
        self.nr_running += 1;
    }

    /// Detach from the task's queue; no-op when not queued
    pub fn dequeue_entity(&mut self, task: TaskId) {
        let entity = self.entity(task);
        if !entity.on_rq {
            return;
        }
        let level = entity.level;
        self.queues[level.index()].unlink(&mut self.tasks, task.slot());
        self.nr_running -= 1;
    }

    /// Move to the tail of the task's level (round-robin rotation)
    pub fn requeue_entity(&mut self, task: TaskId) {
        self.enqueue_entity(task);
        self.entity_mut(task).stats.nr_requeues += 1;
    }

    /// Head of the most urgent non-empty level
    pub fn peek_next(&self) -> Option<TaskId> {
        self.queues
            .iter()
            .find_map(|queue| queue.front())
            .map(|index| self.tasks.id_at(index))
    }

    /// Whether another task of the same level is waiting behind `task`
    ///
    /// For a queued task that means it is not the last entry of its queue;
    /// for an off-queue (running) task it means its level's queue is not
    /// empty. When this is false, rotating the task would put it straight
    /// back where it is.
    pub fn has_waiting_peers(&self, task: TaskId) -> bool {
        let entity = self.entity(task);
        if entity.on_rq {
            entity.link.next.is_some()
        } else {
            !self.queues[entity.level.index()].is_empty()
        }
    }

    /// Queued tasks of one level, head first
    pub fn queued_tasks(&self, level: MlqLevel) -> Vec<TaskId> {
        let mut out = Vec::with_capacity(self.level_len(level));
        let mut cursor = self.queues[level.index()].front();
        while let Some(index) = cursor {
            out.push(self.tasks.id_at(index));
            cursor = self.tasks.at(index).link.next;
        }
        out
    }

    // ========================================================================
    // CONSISTENCY CHECK
    // ========================================================================

    /// Walk every queue and entity and report the first broken invariant
    ///
    /// Checked: queue lengths match their links, prev/next agree, every
    /// linked task belongs to the queue's level, the queued flag matches
    /// membership (so no task can be in two queues), and slices are in range.
    pub fn check_invariants(
        &self,
        slice_of: impl Fn(MlqLevel) -> u32,
    ) -> Result<(), InvariantViolation> {
        let mut linked_total = 0;

        for level in MlqLevel::ALL {
            let queue = &self.queues[level.index()];
            let mut linked = 0;
            let mut prev = None;
            let mut cursor = queue.front();

            while let Some(index) = cursor {
                let task = self.tasks.id_at(index);
                let entity = self.tasks.at(index);
                if entity.link.prev != prev || !entity.on_rq {
                    return Err(InvariantViolation::BrokenLink { level, task });
                }
                if entity.level != level {
                    return Err(InvariantViolation::WrongQueue {
                        task,
                        queue: level,
                        entity: entity.level,
                    });
                }
                linked += 1;
                if linked > queue.len() {
                    return Err(InvariantViolation::LengthMismatch {
                        level,
                        recorded: queue.len(),
                        linked,
                    });
                }
                prev = Some(index);
                cursor = entity.link.next;
            }

            if linked != queue.len() || queue.tail != prev {
                return Err(InvariantViolation::LengthMismatch {
                    level,
                    recorded: queue.len(),
                    linked,
                });
            }
            linked_total += linked;
        }

        for (task, entity) in self.tasks.iter() {
            if entity.on_rq && !self.queued_tasks(entity.level).contains(&task) {
                return Err(InvariantViolation::QueuedFlagMismatch { task });
            }
        }
        if linked_total != self.nr_running {
            return Err(InvariantViolation::RunningCountMismatch {
                recorded: self.nr_running,
                linked: linked_total,
            });
        }

        for (task, entity) in self.tasks.iter() {
            let slice = entity.time_slice;
            let in_range = if entity.level.is_timesliced() {
                slice >= 1 && slice <= slice_of(entity.level)
            } else {
                slice == 0
            };
            if !in_range {
                return Err(InvariantViolation::SliceOutOfRange { task, slice });
            }
        }

        Ok(())
    }
}

impl core::fmt::Debug for MlqRunQueue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MlqRunQueue")
            .field("cpu", &self.cpu)
            .field("curr", &self.curr)
            .field("nr_running", &self.nr_running)
            .field("l1", &self.queues[0].len())
            .field("l2", &self.queues[1].len())
            .field("l3", &self.queues[2].len())
            .finish()
    }
}
