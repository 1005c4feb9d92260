use crate::actors::broadcaster::LogHubHandle;
use crate::error::{LaunchError, RuntimeFailure};
use crate::types::{InputRef, JobId, ProcessRef};
use tokio::sync::mpsc;
use tracing::warn;

/// Launches the external process for a job.
///
/// `launch` must either fail synchronously, before any process exists, or take ownership
/// of the `RunSink` and report through it:
/// 1. `started` once the process identifier is known,
/// 2. every output line, in emission order, via `line` or a `LineSink`,
/// 3. exactly one terminal outcome via `finish`, after the last line.
pub trait ProcessRunner: Send + Sync + 'static {
    fn launch(&self, job_id: JobId, input: &InputRef, sink: RunSink) -> Result<(), LaunchError>;
}

#[derive(Debug)]
pub(crate) enum RunnerEvent {
    Started {
        job_id: JobId,
        process_ref: ProcessRef,
    },
    Exited {
        job_id: JobId,
        outcome: Result<(), RuntimeFailure>,
    },
}

/// The callbacks of one launch: process start, output lines, terminal outcome.
///
/// Dropping a sink without calling `finish` reports a failure, so a job can never be
/// left in flight by a runner that lost track of it.
pub struct RunSink {
    job_id: JobId,
    hub: LogHubHandle,
    events: Option<mpsc::UnboundedSender<RunnerEvent>>,
    started: bool,
}

impl RunSink {
    pub(crate) fn new(
        job_id: JobId,
        hub: LogHubHandle,
        events: mpsc::UnboundedSender<RunnerEvent>,
    ) -> Self {
        Self {
            job_id,
            hub,
            events: Some(events),
            started: false,
        }
    }

    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    /// Report the process identifier. Tailing begins here, before any line can arrive.
    pub fn started(&mut self, process_ref: ProcessRef) {
        if self.started {
            warn!(job_id = %self.job_id, %process_ref, "process start reported twice");
            return;
        }
        self.started = true;
        self.hub.begin_tail(self.job_id);
        if let Some(events) = &self.events {
            let _ = events.send(RunnerEvent::Started {
                job_id: self.job_id,
                process_ref,
            });
        }
    }

    pub fn line(&self, line: impl Into<String>) {
        self.hub.ingest(self.job_id, line);
    }

    /// A cloneable line writer, for runners that read several pipes at once.
    pub fn lines(&self) -> LineSink {
        LineSink {
            job_id: self.job_id,
            hub: self.hub.clone(),
        }
    }

    pub fn finish(mut self, outcome: Result<(), RuntimeFailure>) {
        self.report(outcome);
    }

    fn report(&mut self, outcome: Result<(), RuntimeFailure>) {
        if let Some(events) = self.events.take() {
            let _ = events.send(RunnerEvent::Exited {
                job_id: self.job_id,
                outcome,
            });
        }
    }
}

impl Drop for RunSink {
    fn drop(&mut self) {
        if self.events.is_some() {
            self.report(Err(RuntimeFailure::Message(
                "runner abandoned the job without reporting an outcome".into(),
            )));
        }
    }
}

#[derive(Clone)]
pub struct LineSink {
    job_id: JobId,
    hub: LogHubHandle,
}

impl LineSink {
    pub fn push(&self, line: impl Into<String>) {
        self.hub.ingest(self.job_id, line);
    }
}
