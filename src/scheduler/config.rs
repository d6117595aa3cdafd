/*
 * MLQ Scheduler Configuration
 *
 * Fixed constants of the scheduling core plus the tunable slice lengths.
 *
 * Slice lengths are given in milliseconds and converted to timer ticks at the
 * configured tick rate, the same way the host kernel derives its timeslice
 * constants from HZ:
 *
 *   level 1 slice =  50ms * HZ / 1000
 *   level 2 slice = 100ms * HZ / 1000
 *   level 3       =  no slice (first-come first-served)
 */

use core::time::Duration;

use super::{
    error::ConfigError,
    types::{MlqLevel, Priority, TimeSliceTicks},
};

/// Number of priority levels (run queue width)
pub const MLQ_WIDTH: usize = 3;

/// Effective priority of level 1; levels 2 and 3 follow consecutively.
///
/// Priorities below this value belong to the real-time band.
pub const MLQ_PRIO_BASE: i32 = 100;

/// Maximum number of processors a `SchedulerCore` can manage
pub const MAX_CPUS: usize = 64;

/// Default timer frequency (1 tick = 1ms)
pub const DEFAULT_TICK_HZ: u32 = 1000;

/// Default level 1 slice in milliseconds
pub const FIRST_TIMESLICE_MS: u32 = 50;

/// Default level 2 slice in milliseconds
pub const SECOND_TIMESLICE_MS: u32 = 100;

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Check whether a host priority falls in the MLQ band
pub fn is_mlq_prio(prio: Priority) -> bool {
    prio.0 >= MLQ_PRIO_BASE && prio.0 < MLQ_PRIO_BASE + MLQ_WIDTH as i32
}

/// Tunables of the MLQ policy
///
/// # Examples
///
/// ```rust
/// use mlq_sched::{MlqConfig, MlqLevel};
///
/// let config = MlqConfig::new().with_tick_hz(250);
/// assert_eq!(config.slice_ticks(MlqLevel::First).get(), 12);
/// assert_eq!(config.slice_ticks(MlqLevel::Second).get(), 25);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MlqConfig {
    /// Timer interrupt frequency driving `on_tick`
    pub tick_hz: u32,

    /// Level 1 slice length in milliseconds
    pub first_slice_ms: u32,

    /// Level 2 slice length in milliseconds
    pub second_slice_ms: u32,
}

impl MlqConfig {
    /// Default configuration (1000Hz, 50ms / 100ms slices)
    pub const fn new() -> Self {
        Self {
            tick_hz: DEFAULT_TICK_HZ,
            first_slice_ms: FIRST_TIMESLICE_MS,
            second_slice_ms: SECOND_TIMESLICE_MS,
        }
    }

    pub const fn with_tick_hz(mut self, tick_hz: u32) -> Self {
        self.tick_hz = tick_hz;
        self
    }

    pub const fn with_first_slice_ms(mut self, ms: u32) -> Self {
        self.first_slice_ms = ms;
        self
    }

    pub const fn with_second_slice_ms(mut self, ms: u32) -> Self {
        self.second_slice_ms = ms;
        self
    }

    /// Default slice of a level in ticks (zero for level 3)
    pub fn slice_ticks(&self, level: MlqLevel) -> TimeSliceTicks {
        match level {
            MlqLevel::First => TimeSliceTicks(self.ms_to_ticks(self.first_slice_ms)),
            MlqLevel::Second => TimeSliceTicks(self.ms_to_ticks(self.second_slice_ms)),
            MlqLevel::Third => TimeSliceTicks::NONE,
        }
    }

    /// Default slice of a level as wall-clock time (zero for level 3)
    pub fn slice_duration(&self, level: MlqLevel) -> Duration {
        if self.tick_hz == 0 {
            return Duration::ZERO;
        }
        let ticks = self.slice_ticks(level).get() as u64;
        Duration::from_nanos(ticks * NANOS_PER_SEC / self.tick_hz as u64)
    }

    /// Reject configurations the tick handler cannot run with
    ///
    /// A zero-tick slice would make the decrement-then-test logic wrap, and
    /// level 2 must stay strictly longer than level 1.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_hz == 0 {
            return Err(ConfigError::ZeroTickRate);
        }
        for (level, ms) in [
            (MlqLevel::First, self.first_slice_ms),
            (MlqLevel::Second, self.second_slice_ms),
        ] {
            match self.checked_ticks(ms) {
                None => return Err(ConfigError::SliceOverflow { level }),
                Some(0) => return Err(ConfigError::ZeroSlice { level }),
                Some(_) => {}
            }
        }
        let first = self.slice_ticks(MlqLevel::First).get();
        let second = self.slice_ticks(MlqLevel::Second).get();
        if second <= first {
            return Err(ConfigError::SlicesNotIncreasing { first, second });
        }
        Ok(())
    }

    /// None when the tick count does not fit in a u32
    fn checked_ticks(&self, ms: u32) -> Option<u32> {
        u32::try_from(ms as u64 * self.tick_hz as u64 / 1000).ok()
    }

    // Saturates; validate() rejects configs where this would clamp
    fn ms_to_ticks(&self, ms: u32) -> u32 {
        self.checked_ticks(ms).unwrap_or(u32::MAX)
    }
}

impl Default for MlqConfig {
    fn default() -> Self {
        Self::new()
    }
}
