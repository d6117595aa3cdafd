/*
 * MLQ Scheduler Errors
 *
 * Rejected requests are reported through MlqError and leave all scheduler
 * state untouched. Broken internal invariants are not runtime errors: the
 * operations panic on them, and check_invariants() reports them as an
 * InvariantViolation for tests and debugging hosts.
 */

use core::fmt;

use super::types::{CpuId, MlqLevel, TaskId};

/// Errors returned by scheduler operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MlqError {
    /// Admission or reconfiguration asked for an unsupported class
    InvalidClass { requested: u8 },
    /// The processor is not managed by this scheduler core
    InvalidCpu { cpu: CpuId },
    /// The configuration cannot drive the tick handler
    InvalidConfig(ConfigError),
    /// More processors requested than the per-CPU table holds
    TooManyCpus { max: usize },
    /// A scheduler core needs at least one processor
    NoCpus,
}

impl fmt::Display for MlqError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MlqError::InvalidClass { requested } => {
                write!(f, "Invalid scheduling class {}", requested)
            }
            MlqError::InvalidCpu { cpu } => write!(f, "Unknown processor {}", cpu),
            MlqError::InvalidConfig(err) => write!(f, "Invalid configuration: {}", err),
            MlqError::TooManyCpus { max } => write!(f, "Too many processors (max {})", max),
            MlqError::NoCpus => write!(f, "No processors to schedule on"),
        }
    }
}

impl From<ConfigError> for MlqError {
    fn from(err: ConfigError) -> Self {
        MlqError::InvalidConfig(err)
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    ZeroTickRate,
    ZeroSlice { level: MlqLevel },
    SliceOverflow { level: MlqLevel },
    SlicesNotIncreasing { first: u32, second: u32 },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ZeroTickRate => write!(f, "tick rate is zero"),
            ConfigError::ZeroSlice { level } => {
                write!(f, "{} slice rounds down to zero ticks", level)
            }
            ConfigError::SliceOverflow { level } => {
                write!(f, "{} slice does not fit in a 32-bit tick count", level)
            }
            ConfigError::SlicesNotIncreasing { first, second } => write!(
                f,
                "level 2 slice ({} ticks) must be longer than level 1 slice ({} ticks)",
                second, first
            ),
        }
    }
}

/// Broken run queue invariant found by `check_invariants()`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvariantViolation {
    /// A queue's recorded length disagrees with the number of linked entries
    LengthMismatch {
        level: MlqLevel,
        recorded: usize,
        linked: usize,
    },
    /// A prev/next link does not point back where it should
    BrokenLink { level: MlqLevel, task: TaskId },
    /// A task sits in the queue of a level it does not belong to
    WrongQueue {
        task: TaskId,
        queue: MlqLevel,
        entity: MlqLevel,
    },
    /// A task is linked into a queue but not flagged as queued, or vice versa
    QueuedFlagMismatch { task: TaskId },
    /// The run queue's task count disagrees with its queues
    RunningCountMismatch { recorded: usize, linked: usize },
    /// A level 1/2 task holds an empty slice, or a level 3 task holds one
    SliceOutOfRange { task: TaskId, slice: u32 },
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvariantViolation::LengthMismatch {
                level,
                recorded,
                linked,
            } => write!(
                f,
                "{} queue records {} entries but links {}",
                level, recorded, linked
            ),
            InvariantViolation::BrokenLink { level, task } => {
                write!(f, "{} queue link broken at {}", level, task)
            }
            InvariantViolation::WrongQueue {
                task,
                queue,
                entity,
            } => write!(f, "{} of level {} found in {} queue", task, entity, queue),
            InvariantViolation::QueuedFlagMismatch { task } => {
                write!(f, "{} queued flag disagrees with queue membership", task)
            }
            InvariantViolation::RunningCountMismatch { recorded, linked } => write!(
                f,
                "run queue records {} tasks but queues link {}",
                recorded, linked
            ),
            InvariantViolation::SliceOutOfRange { task, slice } => {
                write!(f, "{} holds out-of-range slice {}", task, slice)
            }
        }
    }
}
