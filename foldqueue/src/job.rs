use crate::events::JobStatus;
use crate::types::{InputRef, JobId, ProcessRef};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

#[derive(Clone, Debug)]
pub struct Job {
    pub id: JobId,
    pub input: InputRef,
    pub status: JobStatus,
    /// Set once, when the runner reports the process.
    pub process_ref: Option<ProcessRef>,
    pub submitted_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Job {
    fn new(id: JobId, input: InputRef) -> Self {
        Self {
            id,
            input,
            status: JobStatus::Queued,
            process_ref: None,
            submitted_at: Utc::now(),
            started_at: None,
            finished_at: None,
        }
    }
}

/// Every job the queue has seen, terminal ones included.
#[derive(Default)]
pub(crate) struct JobRegistry {
    jobs: HashMap<JobId, Job>,
    // order in which jobs reached a terminal state
    finished: Vec<JobId>,
}

impl JobRegistry {
    /// Create a queued job under a fresh id.
    pub fn create(&mut self, input: InputRef) -> JobId {
        let mut id = uuid::Uuid::new_v4();
        while self.jobs.contains_key(&id) {
            id = uuid::Uuid::new_v4();
        }
        self.jobs.insert(id, Job::new(id, input));
        id
    }

    pub fn get(&self, id: &JobId) -> Option<&Job> {
        self.jobs.get(id)
    }

    /// Record the process reference and enter `Processing`.
    ///
    /// Returns false if the job is unknown, already has a process, or is no longer queued.
    pub fn mark_started(&mut self, id: &JobId, process_ref: ProcessRef) -> bool {
        match self.jobs.get_mut(id) {
            Some(job) if job.process_ref.is_none() && job.status == JobStatus::Queued => {
                job.process_ref = Some(process_ref);
                job.status = JobStatus::Processing;
                job.started_at = Some(Utc::now());
                true
            }
            _ => false,
        }
    }

    /// Move a job into a terminal state. Terminal jobs are never touched again.
    pub fn mark_finished(&mut self, id: &JobId, status: JobStatus) -> bool {
        debug_assert!(status.is_terminal());
        match self.jobs.get_mut(id) {
            Some(job) if !job.status.is_terminal() => {
                job.status = status;
                job.finished_at = Some(Utc::now());
                self.finished.push(*id);
                true
            }
            _ => false,
        }
    }

    /// Terminal jobs in the order they finished.
    pub fn finished(&self) -> impl Iterator<Item = &Job> {
        self.finished.iter().filter_map(move |id| self.jobs.get(id))
    }
}
