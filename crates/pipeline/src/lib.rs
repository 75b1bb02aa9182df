pub mod consumer;
pub mod error;
pub mod runner;

pub use consumer::{JobConsumer, JobOutcome, JobStage};
pub use error::PipelineError;
pub use runner::run_consumer_loop;
