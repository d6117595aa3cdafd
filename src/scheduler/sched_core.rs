/*
 * Scheduler Core - Per-CPU Table
 *
 * This module implements SchedulerCore, the table of per-processor MLQ
 * instances a host keeps next to its other scheduling classes:
 *
 * 1. Holds one MlqPolicy per processor, each behind its own spin lock
 * 2. Routes admission to the processor the host's placement chose
 * 3. Hands out the lock guard for a task's processor, so every hook runs
 *    with that run queue locked
 *
 * Run queues are shared-nothing: no operation ever holds two processors'
 * locks at once, and tasks never move between processors here.
 */

use heapless::Vec;
use spin::{Mutex, MutexGuard};

use super::{
    config::{MlqConfig, MAX_CPUS},
    error::MlqError,
    policies::MlqPolicy,
    traits::SchedClass,
    types::{CpuId, MlqLevel, TaskId},
};

/// Per-processor MLQ instances
pub struct SchedulerCore {
    per_cpu: Vec<Mutex<MlqPolicy>, MAX_CPUS>,
    config: MlqConfig,
}

impl SchedulerCore {
    /// Create a SchedulerCore managing `cpu_count` processors
    ///
    /// # Arguments
    /// - `cpu_count`: Number of processors (1..=MAX_CPUS)
    /// - `config`: Slice configuration shared by all processors
    pub fn new(cpu_count: usize, config: MlqConfig) -> Result<Self, MlqError> {
        if cpu_count == 0 {
            return Err(MlqError::NoCpus);
        }
        if cpu_count > MAX_CPUS {
            return Err(MlqError::TooManyCpus { max: MAX_CPUS });
        }

        let mut per_cpu = Vec::new();
        for i in 0..cpu_count {
            let policy = MlqPolicy::new(CpuId(i as u32), config)?;
            if per_cpu.push(Mutex::new(policy)).is_err() {
                return Err(MlqError::TooManyCpus { max: MAX_CPUS });
            }
        }

        log::info!(
            "SchedulerCore initialized: {} CPU(s), {}Hz tick, slices {}/{} ticks",
            cpu_count,
            config.tick_hz,
            config.slice_ticks(MlqLevel::First).get(),
            config.slice_ticks(MlqLevel::Second).get()
        );

        Ok(Self { per_cpu, config })
    }

    pub fn cpu_count(&self) -> usize {
        self.per_cpu.len()
    }

    pub fn config(&self) -> &MlqConfig {
        &self.config
    }

    /// Get the name of the policy
    pub fn policy_name(&self) -> &'static str {
        "MLQ"
    }

    /// Lock a processor's run queue
    pub fn lock(&self, cpu: CpuId) -> Result<MutexGuard<'_, MlqPolicy>, MlqError> {
        self.per_cpu
            .get(cpu.as_usize())
            .map(|slot| slot.lock())
            .ok_or(MlqError::InvalidCpu { cpu })
    }

    /// Lock a processor's run queue if nobody else holds it
    ///
    /// Interrupt-context callers (tick, wakeup from an ISR) use this to avoid
    /// spinning on a lock the interrupted code already holds.
    pub fn try_lock(&self, cpu: CpuId) -> Result<Option<MutexGuard<'_, MlqPolicy>>, MlqError> {
        self.per_cpu
            .get(cpu.as_usize())
            .map(|slot| slot.try_lock())
            .ok_or(MlqError::InvalidCpu { cpu })
    }

    /// Lock the run queue owning `task`
    pub fn lock_task(&self, task: TaskId) -> Result<MutexGuard<'_, MlqPolicy>, MlqError> {
        self.lock(task.cpu())
    }

    /// Admit a task on the processor chosen by the host's placement
    pub fn admit_on(&self, cpu: CpuId, class: u8) -> Result<TaskId, MlqError> {
        self.lock(cpu)?.admit(class)
    }

    /// Run `f` with the hook table of `cpu`, lock held
    pub fn with_class<R>(
        &self,
        cpu: CpuId,
        f: impl FnOnce(&mut dyn SchedClass) -> R,
    ) -> Result<R, MlqError> {
        let mut guard = self.lock(cpu)?;
        Ok(f(&mut *guard))
    }

    /// Queued tasks across all processors
    ///
    /// Locks each processor in turn, so the sum is not an atomic snapshot.
    pub fn total_running(&self) -> usize {
        self.per_cpu.iter().map(|slot| slot.lock().nr_running()).sum()
    }
}

impl core::fmt::Debug for SchedulerCore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SchedulerCore")
            .field("policy", &self.policy_name())
            .field("cpu_count", &self.per_cpu.len())
            .field("config", &self.config)
            .finish()
    }
}
