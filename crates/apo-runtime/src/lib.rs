// SPDX-License-Identifier: MIT OR Apache-2.0
//! apo-runtime
//!
//! The workflow engine: drives one job through the fourteen canonical stages
//! (§4.1), owns the quality-gate regeneration loop (§4.2 step 6), and keeps
//! the job store's lifecycle fields in sync as the run progresses.
//!
//! Responsibilities:
//! - build a [`StageRegistry`] satisfying the `StageFactory` contract (§4.3)
//! - run a job's [`apo_core::ExecutionContext`] through it end to end
//! - observe cooperative cancellation between stages (§5)
//! - classify stage failures as critical or advisory per [`apo_error::ErrorCode::is_critical`]
//! - feed every completed attempt's score into the process-scoped [`apo_quality::QualityMonitor`]

#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Cancellation primitives for job runs.
pub mod cancel;
/// The workflow engine proper: [`WorkflowEngine`] and [`EngineError`].
pub mod engine;
/// Typed stage registry built via the `StageFactory` contract.
pub mod registry;

pub use cancel::{CancellableRun, CancellationReason, CancellationToken};
pub use engine::{EngineError, WorkflowEngine};
pub use registry::{StageRegistry, StageRegistryBuilder, StageRegistryError};
