use super::messages::CoordinatorMessage;
use crate::actors::broadcaster::LogHubHandle;
use crate::error::RuntimeFailure;
use crate::events::JobStatus;
use crate::job::JobRegistry;
use crate::runner::{ProcessRunner, RunSink, RunnerEvent};
use crate::status::StatusSnapshot;
use crate::types::{InputRef, JobId, ProcessRef};

use std::collections::VecDeque;
use std::sync::Arc;
use tokio::select;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Owns all queue state. Being the only task that touches `busy`/`current`, it is the
/// mutual exclusion that keeps more than one job from being in flight.
pub struct JobCoordinator {
    inbox: mpsc::Receiver<CoordinatorMessage>,
    runner_events: mpsc::UnboundedReceiver<RunnerEvent>,
    events_tx: mpsc::UnboundedSender<RunnerEvent>,
    runner: Arc<dyn ProcessRunner>,
    hub: LogHubHandle,
    jobs: JobRegistry,
    pending: VecDeque<JobId>,
    current: Option<JobId>,
    busy: bool,
}

impl JobCoordinator {
    pub fn spawn(
        inbox: mpsc::Receiver<CoordinatorMessage>,
        runner: Arc<dyn ProcessRunner>,
        hub: LogHubHandle,
    ) {
        let (events_tx, runner_events) = mpsc::unbounded_channel();
        let actor = Self {
            inbox,
            runner_events,
            events_tx,
            runner,
            hub,
            jobs: JobRegistry::default(),
            pending: VecDeque::new(),
            current: None,
            busy: false,
        };
        tokio::spawn(async move { actor.run().await });
    }

    async fn run(mut self) {
        use self::CoordinatorMessage::*;
        loop {
            select! {
                // runner callbacks first, so a reader that saw a callback fire also sees its effect
                biased;
                Some(event) = self.runner_events.recv() => match event {
                    RunnerEvent::Started { job_id, process_ref } => {
                        self.on_started(job_id, process_ref)
                    }
                    RunnerEvent::Exited { job_id, outcome } => self.on_exited(job_id, outcome),
                },
                maybe_msg = self.inbox.recv() => match maybe_msg {
                    Some(Enqueue { input, response }) => {
                        let job_id = self.enqueue(input);
                        let _ = response.send(job_id);
                        self.drain();
                    }
                    Some(GetStatus { response }) => {
                        let _ = response.send(self.status());
                    }
                    Some(GetJob { job_id, response }) => {
                        let _ = response.send(self.jobs.get(&job_id).cloned());
                    }
                    None => {
                        debug!("all queue handles dropped, coordinator exiting");
                        return;
                    }
                },
            }
        }
    }

    fn enqueue(&mut self, input: InputRef) -> JobId {
        let job_id = self.jobs.create(input);
        self.pending.push_back(job_id);
        info!(%job_id, position = self.pending.len(), "job queued");
        job_id
    }

    fn status(&self) -> StatusSnapshot {
        StatusSnapshot::project(&self.jobs, &self.pending, self.current, self.busy)
    }

    /// Launch pending jobs until one is in flight or the queue is empty.
    ///
    /// Safe to call from any trigger point: it does nothing while a job is in flight.
    fn drain(&mut self) {
        while !self.busy {
            let job_id = match self.pending.pop_front() {
                Some(job_id) => job_id,
                None => return,
            };
            let input = match self.jobs.get(&job_id) {
                Some(job) => job.input.clone(),
                None => continue,
            };

            self.busy = true;
            self.current = Some(job_id);
            let sink = RunSink::new(job_id, self.hub.clone(), self.events_tx.clone());
            match self.runner.launch(job_id, &input, sink) {
                Ok(()) => info!(%job_id, %input, "job launched"),
                Err(err) => {
                    warn!(%job_id, %input, error = %err, "job failed to launch");
                    self.finish(
                        job_id,
                        JobStatus::Failed {
                            reason: err.to_string(),
                        },
                    );
                }
            }
        }
    }

    fn on_started(&mut self, job_id: JobId, process_ref: ProcessRef) {
        if self.current != Some(job_id) {
            debug!(%job_id, "ignoring start of a job that is not in flight");
            return;
        }
        if self.jobs.mark_started(&job_id, process_ref.clone()) {
            info!(%job_id, %process_ref, "job processing");
        } else {
            warn!(%job_id, %process_ref, "job already has a process");
        }
    }

    fn on_exited(&mut self, job_id: JobId, outcome: Result<(), RuntimeFailure>) {
        if self.current != Some(job_id) {
            debug!(%job_id, "ignoring outcome of a job that is not in flight");
            return;
        }
        let status = match outcome {
            Ok(()) => JobStatus::Completed,
            Err(failure) => JobStatus::Failed {
                reason: failure.to_string(),
            },
        };
        self.finish(job_id, status);
        self.drain();
    }

    /// Record a terminal status, retire the job's log tail and free the queue.
    fn finish(&mut self, job_id: JobId, status: JobStatus) {
        match &status {
            JobStatus::Failed { reason } => warn!(%job_id, %reason, "job failed"),
            _ => info!(%job_id, "job completed"),
        }
        let summary = status.to_string();
        self.jobs.mark_finished(&job_id, status);
        self.hub.retire(job_id, summary);
        self.current = None;
        self.busy = false;
    }
}
