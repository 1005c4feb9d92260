use crate::types::JobId;
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed { reason: String },
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed { .. } => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Failed { reason } => write!(f, "failed: {}", reason),
            other => f.write_str(other.label()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineKind {
    /// Informational notice emitted when a job takes over the unified channel.
    Marker,
    /// A line the external process wrote.
    Output,
    /// The active job retired; the text is its outcome.
    End,
}

/// A line on the unified channel, attributed to the job that produced it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaggedLine {
    pub job_id: JobId,
    pub kind: LineKind,
    pub text: String,
}

impl TaggedLine {
    pub fn marker(job_id: JobId, text: impl Into<String>) -> Self {
        Self {
            job_id,
            kind: LineKind::Marker,
            text: text.into(),
        }
    }

    pub fn output(job_id: JobId, text: impl Into<String>) -> Self {
        Self {
            job_id,
            kind: LineKind::Output,
            text: text.into(),
        }
    }

    pub fn end(job_id: JobId, text: impl Into<String>) -> Self {
        Self {
            job_id,
            kind: LineKind::End,
            text: text.into(),
        }
    }
}

/// What a subscriber receives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Frame {
    Line(TaggedLine),
    /// Nothing was broadcast for a whole keepalive interval.
    Keepalive,
}
