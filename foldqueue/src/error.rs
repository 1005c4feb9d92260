use crate::types::JobId;
use std::{io, path::PathBuf, result};
use thiserror::Error;

/// A submission that never becomes a job.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmissionError {
    #[error("input reference is empty")]
    EmptyInput,
    #[error("input reference contains a NUL byte")]
    NulByte,
    #[error("input reference {0:?} does not name a file")]
    NotAFile(String),
}

/// The runner could not start the external process.
#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("input artifact {} does not exist", .0.display())]
    MissingInput(PathBuf),
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("launch rejected: {0}")]
    Rejected(String),
}

/// The external process started but did not succeed.
///
/// The `Display` output is the failure reason recorded on the job.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeFailure {
    #[error("process exited with code {0}")]
    ExitCode(i32),
    #[error("process killed by signal {0}")]
    Signal(i32),
    #[error("{0}")]
    Message(String),
}

/// Log persistence or delivery problems. These are logged, never propagated.
#[derive(Error, Debug)]
pub enum StreamingFault {
    #[error("durable write for job {job_id} failed: {source}")]
    Persist {
        job_id: JobId,
        #[source]
        source: io::Error,
    },
    #[error("subscriber buffer full, dropped a line of job {job_id}")]
    Dropped { job_id: JobId },
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("no such job {0}")]
    NotFound(JobId),
    #[error(transparent)]
    Submission(#[from] SubmissionError),
    #[error("job queue has shut down")]
    QueueClosed,
    #[error("log hub has shut down")]
    HubClosed,
    #[error("failed to read log history: {0}")]
    History(#[source] io::Error),
}

pub type Result<T> = result::Result<T, Error>;
