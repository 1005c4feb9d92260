use crate::events::JobStatus;
use crate::job::{Job, JobRegistry};
use crate::types::JobId;
use std::collections::VecDeque;

/// A pending job and its 1-based rank in the queue.
#[derive(Clone, Debug)]
pub struct QueuedJob {
    pub position: usize,
    pub job: Job,
}

/// Read-only picture of the queue at a single instant.
#[derive(Clone, Debug, Default)]
pub struct StatusSnapshot {
    pub busy: bool,
    pub current: Option<Job>,
    pub pending: Vec<QueuedJob>,
    pub completed: Vec<Job>,
    pub failed: Vec<Job>,
}

impl StatusSnapshot {
    pub(crate) fn project(
        registry: &JobRegistry,
        pending: &VecDeque<JobId>,
        current: Option<JobId>,
        busy: bool,
    ) -> Self {
        let pending = pending
            .iter()
            .filter_map(|id| registry.get(id))
            .enumerate()
            .map(|(index, job)| QueuedJob {
                position: index + 1,
                job: job.clone(),
            })
            .collect();
        let (completed, failed) = registry
            .finished()
            .cloned()
            .partition(|job| job.status == JobStatus::Completed);
        Self {
            busy,
            current: current.and_then(|id| registry.get(&id)).cloned(),
            pending,
            completed,
            failed,
        }
    }

    pub fn position_of(&self, job_id: JobId) -> Option<usize> {
        self.pending
            .iter()
            .find(|queued| queued.job.id == job_id)
            .map(|queued| queued.position)
    }

    /// Look a job up wherever it currently sits.
    pub fn find(&self, job_id: JobId) -> Option<&Job> {
        self.current
            .iter()
            .chain(self.pending.iter().map(|queued| &queued.job))
            .chain(self.completed.iter())
            .chain(self.failed.iter())
            .find(|job| job.id == job_id)
    }

    /// Jobs whose status is `Processing`. Never more than one.
    pub fn processing(&self) -> impl Iterator<Item = &Job> {
        self.current
            .iter()
            .chain(self.pending.iter().map(|queued| &queued.job))
            .filter(|job| job.status == JobStatus::Processing)
    }
}
