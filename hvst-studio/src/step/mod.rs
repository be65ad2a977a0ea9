//! Step engine: executor contract, factories and the pipeline runner

pub mod executor;
pub mod registry;
pub mod runner;

pub use executor::{parse_kwargs, StepContext, StepExecutor};
pub use registry::{StepFactory, StepRegistry, StepServices};
pub use runner::{PipelineRunner, PipelineStatus};
