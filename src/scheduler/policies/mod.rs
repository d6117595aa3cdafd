/*
 * Scheduling Policies Module
 *
 * This module contains the scheduling policy implementations. Each policy
 * implements the SchedClass trait and is instantiated once per processor.
 *
 * Available policies:
 * - MlqPolicy: three-level queue, strict priority across levels,
 *   round-robin (levels 1-2) or first-come first-served (level 3) inside
 */

pub mod mlq;

pub use mlq::MlqPolicy;
