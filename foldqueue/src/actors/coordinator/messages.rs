use crate::job::Job;
use crate::status::StatusSnapshot;
use crate::types::{InputRef, JobId};
use tokio::sync::oneshot;

#[derive(Debug)]
pub enum CoordinatorMessage {
    Enqueue {
        input: InputRef,
        response: oneshot::Sender<JobId>,
    },
    GetStatus {
        response: oneshot::Sender<StatusSnapshot>,
    },
    GetJob {
        job_id: JobId,
        response: oneshot::Sender<Option<Job>>,
    },
}
