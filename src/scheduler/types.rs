/*
 * MLQ Scheduler Type Definitions
 *
 * This module defines the core types used throughout the MLQ scheduling core.
 * These types are designed to be lightweight, Copy-able, and suitable for
 * use by both the policy and the host that drives it.
 */

use core::fmt;

use bitflags::bitflags;

use super::{config::MLQ_PRIO_BASE, error::MlqError};

/// CPU identifier
///
/// Represents a logical processor. Every run queue belongs to exactly one
/// CPU, and every task handle records the CPU whose run queue admitted it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CpuId(pub u32);

impl CpuId {
    /// Bootstrap processor (CPU 0)
    pub const BSP: CpuId = CpuId(0);

    /// Get the CPU ID as a usize for indexing
    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for CpuId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CPU{}", self.0)
    }
}

/// Stable handle to a task entity
///
/// Handles are issued by a run queue at admission and stay valid until the
/// task is released. The generation counter makes a handle that outlived its
/// task detectable instead of silently aliasing a newer task in the same slot.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct TaskId {
    cpu: CpuId,
    slot: u32,
    generation: u32,
}

impl TaskId {
    pub(crate) const fn new(cpu: CpuId, slot: usize, generation: u32) -> Self {
        Self {
            cpu,
            slot: slot as u32,
            generation,
        }
    }

    /// The processor whose run queue owns this task
    pub fn cpu(self) -> CpuId {
        self.cpu
    }

    pub(crate) fn slot(self) -> usize {
        self.slot as usize
    }

    pub(crate) fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Task({}:{})", self.cpu.0, self.slot)
    }
}

/// Priority class of a task
///
/// Level 1 is the most urgent. Levels 1 and 2 are round-robin with a time
/// slice (level 2's slice is twice level 1's); level 3 is first-come
/// first-served and never time-sliced.
///
/// The discriminants are the raw class numbers the host passes in.
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MlqLevel {
    First = 1,
    Second = 2,
    Third = 3,
}

impl MlqLevel {
    /// All levels, most urgent first (the pick order)
    pub const ALL: [MlqLevel; 3] = [MlqLevel::First, MlqLevel::Second, MlqLevel::Third];

    /// Index into the run queue's class array
    pub const fn index(self) -> usize {
        self as usize - 1
    }

    /// Raw class number (1..=3)
    pub const fn raw(self) -> u8 {
        self as u8
    }

    /// Whether tasks of this level are preempted when their slice runs out
    pub const fn is_timesliced(self) -> bool {
        !matches!(self, MlqLevel::Third)
    }

    /// Effective priority of the level; lower is more urgent
    pub const fn prio(self) -> Priority {
        Priority(MLQ_PRIO_BASE + self.index() as i32)
    }
}

impl TryFrom<u8> for MlqLevel {
    type Error = MlqError;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        match raw {
            1 => Ok(MlqLevel::First),
            2 => Ok(MlqLevel::Second),
            3 => Ok(MlqLevel::Third),
            requested => Err(MlqError::InvalidClass { requested }),
        }
    }
}

impl fmt::Display for MlqLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.raw())
    }
}

/// Effective scheduling priority
///
/// Lower values indicate MORE urgent tasks, matching the host's priority
/// numbering where real-time priorities sit below the MLQ band.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Priority(pub i32);

impl Priority {
    /// True if `self` should preempt a task running at `other`
    pub fn is_more_urgent_than(self, other: Priority) -> bool {
        self.0 < other.0
    }
}

/// Time slice duration in timer ticks
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct TimeSliceTicks(pub u32);

impl TimeSliceTicks {
    /// No slice (first-come first-served level)
    pub const NONE: TimeSliceTicks = TimeSliceTicks(0);

    /// Get the value as u32
    pub fn get(self) -> u32 {
        self.0
    }
}

bitflags! {
    /// Modifiers passed by the host when a task is put on a run queue
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct EnqueueFlags: u32 {
        /// The task just became runnable; check whether it should preempt
        const WAKEUP  = 1 << 0;
        /// Second half of a SAVE/RESTORE pair (attribute change in flight)
        const RESTORE = 1 << 1;
    }
}

bitflags! {
    /// Modifiers passed by the host when a task is taken off a run queue
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct DequeueFlags: u32 {
        /// The task is blocking
        const SLEEP = 1 << 0;
        /// First half of a SAVE/RESTORE pair; the task comes straight back
        const SAVE  = 1 << 1;
    }
}
