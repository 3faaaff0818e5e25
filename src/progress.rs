//! Progress-callback trait for per-stage pipeline events.
//!
//! Attach an [`Arc<dyn PipelineProgressCallback>`] with
//! [`crate::pipeline::Pipeline::with_progress`] to be told when each stage
//! starts and what it produced.
//!
//! # Example
//!
//! ```rust
//! use officepdf::{Artifact, PipelineProgressCallback, Stage};
//! use std::sync::Mutex;
//!
//! #[derive(Default)]
//! struct StageLog(Mutex<Vec<Stage>>);
//!
//! impl PipelineProgressCallback for StageLog {
//!     fn on_stage_complete(&self, stage: Stage, _artifacts: &[Artifact]) {
//!         self.0.lock().unwrap().push(stage);
//!     }
//! }
//!
//! let log = StageLog::default();
//! log.on_stage_complete(Stage::Render, &[]);
//! assert_eq!(*log.0.lock().unwrap(), vec![Stage::Render]);
//! ```

use crate::artifact::Artifact;
use crate::pipeline::Stage;
use std::path::PathBuf;
use std::sync::Arc;

/// Called by the pipeline as it moves through its stages.
///
/// Stages run one after another, so calls for a single run never overlap;
/// the `Send + Sync` bound lets one callback be shared by concurrent runs.
/// All methods default to no-ops.
pub trait PipelineProgressCallback: Send + Sync {
    /// Called once before the first stage.
    fn on_pipeline_start(&self, inputs: &[PathBuf]) {
        let _ = inputs;
    }

    /// Called when a stage's guard holds and the stage begins.
    fn on_stage_start(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called when a stage succeeds, with the artifacts now active.
    fn on_stage_complete(&self, stage: Stage, artifacts: &[Artifact]) {
        let _ = (stage, artifacts);
    }

    /// Called once with the final output set.
    fn on_pipeline_complete(&self, artifacts: &[Artifact]) {
        let _ = artifacts;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl PipelineProgressCallback for NoopProgressCallback {}

/// Shared callback handle stored by [`crate::pipeline::Pipeline`].
pub type ProgressCallback = Arc<dyn PipelineProgressCallback>;
