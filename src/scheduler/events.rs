/*
 * Scheduler Event Definitions
 *
 * This module defines what the MLQ core reports back to its host:
 *
 * - ReschedCause: why a reschedule was requested (passed to the host's
 *   reschedule sink together with the processor)
 * - TickOutcome: which branch of the tick handler ran
 *
 * Reschedule requests are advisory. The host's dispatch loop decides when
 * the actual context switch happens.
 */

/// Reason attached to a reschedule request
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ReschedCause {
    /// The running task used up its slice and a peer of its level is waiting
    SliceExpired,

    /// The running task voluntarily gave up the CPU
    Yield,

    /// A task became runnable and is more urgent than the running one
    /// (or the processor is idle)
    Wakeup,

    /// The running task was reconfigured to a less urgent level
    PriorityLowered,

    /// A waiting task was reconfigured to a level more urgent than the
    /// running one (or the processor is idle)
    PriorityRaised,
}

impl ReschedCause {
    /// Get a short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            ReschedCause::SliceExpired => "SliceExpired",
            ReschedCause::Yield => "Yield",
            ReschedCause::Wakeup => "Wakeup",
            ReschedCause::PriorityLowered => "PriorityLowered",
            ReschedCause::PriorityRaised => "PriorityRaised",
        }
    }
}

/// Result of one tick of the running task
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Level 3 task: runtime accounted, nothing else to do
    Unsliced,

    /// Slice still has ticks left
    Continue { remaining: u32 },

    /// Slice expired but no peer of the same level is waiting; the slice was
    /// refilled and the task keeps running without a context switch
    SliceReset,

    /// Slice expired and the task was rotated to the tail of its level;
    /// a reschedule was requested
    Requeued,
}

impl TickOutcome {
    /// Whether the tick asked the host to reschedule
    pub fn requested_reschedule(&self) -> bool {
        matches!(self, TickOutcome::Requeued)
    }
}
