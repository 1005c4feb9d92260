mod actors;
pub mod config;
pub mod error;
pub mod events;
mod job;
mod runner;
mod status;
mod store;
pub mod types;

#[cfg(test)]
mod test_support;

// re-export the actor handles as if they are the queue and hub themselves.
pub use actors::broadcaster::{LogHubHandle as LogHub, Subscription};
pub use actors::coordinator::JobQueueHandle as JobQueue;
pub use actors::worker::{ContainerRunner, ContainerSpec, INPUT_PLACEHOLDER, JOB_ID_PLACEHOLDER};
pub use config::QueueConfig;
pub use error::{Error, LaunchError, Result, RuntimeFailure, StreamingFault, SubmissionError};
pub use events::{Frame, JobStatus, LineKind, TaggedLine};
pub use job::Job;
pub use runner::{LineSink, ProcessRunner, RunSink};
pub use status::{QueuedJob, StatusSnapshot};
pub use store::LogStore;
