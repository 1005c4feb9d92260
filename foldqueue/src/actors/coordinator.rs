mod actor;
mod messages;

use self::{
    actor::JobCoordinator,
    messages::CoordinatorMessage::{self, Enqueue, GetJob, GetStatus},
};
use crate::actors::broadcaster::{LogHubHandle, Subscription};
use crate::config::QueueConfig;
use crate::error::{Error, Result};
use crate::job::Job;
use crate::runner::ProcessRunner;
use crate::status::StatusSnapshot;
use crate::types::{InputRef, JobId, LogBlob};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// A `JobQueue` which runs submitted jobs one at a time and exposes their status and logs.
///
/// This struct is actually an actor handle, the real work is done in the actor spawned by `JobQueue::spawn`,
/// but from the user perspective all that matters is that this struct provides methods for managing jobs.
/// The actor-handle abstraction allows this struct to be cloned freely in a multi-thread async context,
/// without requiring an `Arc<Mutex>` or any other means of synchronization.
#[derive(Clone)]
pub struct JobQueueHandle {
    sender: mpsc::Sender<CoordinatorMessage>,
    hub: LogHubHandle,
}

impl JobQueueHandle {
    /// Spawn a new queue, together with its log hub.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(config: QueueConfig, runner: Arc<dyn ProcessRunner>) -> Self {
        let config = config.clamped();
        let hub = LogHubHandle::spawn(&config);
        let (sender, receiver) = mpsc::channel(config.mailbox_capacity);
        JobCoordinator::spawn(receiver, runner, hub.clone());
        Self { sender, hub }
    }

    /// Queue a job. Returns as soon as the job is registered; it runs later.
    pub async fn enqueue(&self, input: InputRef) -> Result<JobId> {
        self.request(|response| Enqueue { input, response }).await
    }

    /// Validate a raw input reference and queue it.
    pub async fn submit(&self, raw_input: &str) -> Result<JobId> {
        let input = InputRef::parse(raw_input)?;
        self.enqueue(input).await
    }

    pub async fn status(&self) -> Result<StatusSnapshot> {
        self.request(|response| GetStatus { response }).await
    }

    pub async fn job(&self, job_id: JobId) -> Result<Job> {
        self.request(|response| GetJob { job_id, response })
            .await?
            .ok_or(Error::NotFound(job_id))
    }

    /// Attach to the unified live log channel.
    pub async fn subscribe(&self) -> Result<Subscription> {
        self.hub.subscribe().await
    }

    /// The job whose lines are currently broadcast.
    pub async fn active_stream(&self) -> Result<Option<JobId>> {
        self.hub.active_stream().await
    }

    /// Recent persisted output of a known job; empty if it has not written anything yet.
    pub async fn history(&self, job_id: JobId, byte_limit: u64) -> Result<LogBlob> {
        self.job(job_id).await?;
        self.hub.history(job_id, byte_limit).await
    }

    async fn request<T>(
        &self,
        message: impl FnOnce(oneshot::Sender<T>) -> CoordinatorMessage,
    ) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(message(tx))
            .await
            .map_err(|_| Error::QueueClosed)?;
        rx.await.map_err(|_| Error::QueueClosed)
    }
}
