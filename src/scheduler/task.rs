/*
 * Task Entities
 *
 * This module defines the per-task scheduling state (MlqEntity) and the arena
 * that stores it (TaskArena).
 *
 * QUEUE LINKAGE:
 * ==============
 *
 * Each entity carries its own prev/next links, like an intrusive list node.
 * Links are arena slot indices instead of pointers, so a class queue only
 * needs head/tail indices and every detach is O(1) without any aliasing.
 *
 * HANDLES:
 * ========
 *
 * The arena hands out TaskId handles (cpu, slot, generation). Releasing a
 * task bumps the slot's generation, so a stale handle is recognised instead
 * of silently naming whatever task reuses the slot.
 */

use alloc::vec::Vec;

use super::types::{CpuId, MlqLevel, TaskId, TimeSliceTicks};

/// Position of an entity inside its class queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct QueueLink {
    pub prev: Option<usize>,
    pub next: Option<usize>,
}

/// Runtime accounting snapshot of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExecStats {
    /// Total time consumed on the CPU (nanoseconds)
    pub sum_exec_runtime: u64,
    /// Longest single accounted interval (nanoseconds)
    pub exec_max: u64,
    /// Timestamp of the last dispatch or accounting update
    pub exec_start: u64,
    /// Number of round-robin rotations (tick expiry or yield)
    pub nr_requeues: u64,
}

/// Scheduling state of one task
#[derive(Debug, Clone)]
pub struct MlqEntity {
    pub(crate) level: MlqLevel,
    pub(crate) time_slice: u32,
    pub(crate) link: QueueLink,
    pub(crate) on_rq: bool,
    pub(crate) stats: ExecStats,
}

impl MlqEntity {
    /// Fresh entity with the level's default slice
    pub(crate) fn new(level: MlqLevel, slice: TimeSliceTicks) -> Self {
        Self {
            level,
            time_slice: slice.get(),
            link: QueueLink::default(),
            on_rq: false,
            stats: ExecStats::default(),
        }
    }

    pub fn level(&self) -> MlqLevel {
        self.level
    }

    /// Ticks left before the slice expires (always 0 on level 3)
    pub fn time_slice(&self) -> u32 {
        self.time_slice
    }

    /// True iff the entity is linked into a class queue
    pub fn is_queued(&self) -> bool {
        self.on_rq
    }

    pub fn stats(&self) -> ExecStats {
        self.stats
    }

    /// Fold the interval since the last update into the accounting
    ///
    /// A clock reading older than `exec_start` counts as zero elapsed time.
    pub(crate) fn account(&mut self, now: u64) -> u64 {
        let delta = now.saturating_sub(self.stats.exec_start);
        self.stats.sum_exec_runtime = self.stats.sum_exec_runtime.saturating_add(delta);
        self.stats.exec_max = self.stats.exec_max.max(delta);
        self.stats.exec_start = now;
        delta
    }
}

enum Slot {
    Occupied { generation: u32, entity: MlqEntity },
    Free { generation: u32, next_free: Option<usize> },
}

/// Slab of task entities owned by one run queue
pub struct TaskArena {
    cpu: CpuId,
    slots: Vec<Slot>,
    free_head: Option<usize>,
    len: usize,
}

impl TaskArena {
    pub fn new(cpu: CpuId) -> Self {
        Self {
            cpu,
            slots: Vec::new(),
            free_head: None,
            len: 0,
        }
    }

    /// Number of live entities
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Store an entity and return its handle, reusing freed slots first
    pub(crate) fn insert(&mut self, entity: MlqEntity) -> TaskId {
        self.len += 1;
        match self.free_head {
            Some(index) => {
                let generation = match self.slots[index] {
                    Slot::Free {
                        generation,
                        next_free,
                    } => {
                        self.free_head = next_free;
                        generation
                    }
                    Slot::Occupied { .. } => panic!("free list points at occupied slot {}", index),
                };
                self.slots[index] = Slot::Occupied { generation, entity };
                TaskId::new(self.cpu, index, generation)
            }
            None => {
                let index = self.slots.len();
                self.slots.push(Slot::Occupied {
                    generation: 0,
                    entity,
                });
                TaskId::new(self.cpu, index, 0)
            }
        }
    }

    /// Drop an entity; its handle (and every copy of it) becomes stale
    pub(crate) fn remove(&mut self, id: TaskId) -> Option<MlqEntity> {
        self.get(id)?;
        let index = id.slot();
        let next_generation = id.generation().wrapping_add(1);
        let old = core::mem::replace(
            &mut self.slots[index],
            Slot::Free {
                generation: next_generation,
                next_free: self.free_head,
            },
        );
        self.free_head = Some(index);
        self.len -= 1;
        match old {
            Slot::Occupied { entity, .. } => Some(entity),
            Slot::Free { .. } => None,
        }
    }

    /// Look up a live entity by handle
    pub fn get(&self, id: TaskId) -> Option<&MlqEntity> {
        if id.cpu() != self.cpu {
            return None;
        }
        match self.slots.get(id.slot()) {
            Some(Slot::Occupied { generation, entity }) if *generation == id.generation() => {
                Some(entity)
            }
            _ => None,
        }
    }

    pub(crate) fn get_mut(&mut self, id: TaskId) -> Option<&mut MlqEntity> {
        if id.cpu() != self.cpu {
            return None;
        }
        match self.slots.get_mut(id.slot()) {
            Some(Slot::Occupied { generation, entity }) if *generation == id.generation() => {
                Some(entity)
            }
            _ => None,
        }
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.get(id).is_some()
    }

    // Slot-index access used by queue links. Links only ever point at live
    // slots, so a free slot here means the queue is corrupt.

    pub(crate) fn at(&self, index: usize) -> &MlqEntity {
        match &self.slots[index] {
            Slot::Occupied { entity, .. } => entity,
            Slot::Free { .. } => panic!("queue link points at free slot {}", index),
        }
    }

    pub(crate) fn at_mut(&mut self, index: usize) -> &mut MlqEntity {
        match &mut self.slots[index] {
            Slot::Occupied { entity, .. } => entity,
            Slot::Free { .. } => panic!("queue link points at free slot {}", index),
        }
    }

    /// Handle of the live entity in `index`
    pub(crate) fn id_at(&self, index: usize) -> TaskId {
        match self.slots[index] {
            Slot::Occupied { generation, .. } => TaskId::new(self.cpu, index, generation),
            Slot::Free { .. } => panic!("queue link points at free slot {}", index),
        }
    }

    /// Iterate over all live entities
    pub fn iter(&self) -> impl Iterator<Item = (TaskId, &MlqEntity)> + '_ {
        let cpu = self.cpu;
        self.slots
            .iter()
            .enumerate()
            .filter_map(move |(index, slot)| match slot {
                Slot::Occupied { generation, entity } => {
                    Some((TaskId::new(cpu, index, *generation), entity))
                }
                Slot::Free { .. } => None,
            })
    }
}
