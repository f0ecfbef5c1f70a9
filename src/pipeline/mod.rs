//! Extraction pipeline and batch coordination

pub mod batch;
pub mod naming;
pub mod orchestrator;
pub mod state;

pub use batch::{BatchComponent, BatchDefaults, BatchJobResult, BatchResult, BatchRunner, BatchSpec};
pub use naming::{derive_component_name, FALLBACK_NAME};
pub use orchestrator::{normalize_url, Pipeline, MISSING_LOCATE_MODE};
pub use state::{OutcomeReport, PipelineOutcome, PipelineOutput, PipelineState, PipelineTiming, Stage};
