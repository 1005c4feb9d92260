use crate::error::{LaunchError, RuntimeFailure};
use crate::runner::{ProcessRunner, RunSink};
use crate::types::{InputRef, JobId, ProcessRef};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// A runner driven by the test: every launch is handed over as a `Launch`.
#[derive(Clone)]
pub struct ScriptedRunner {
    launches: mpsc::UnboundedSender<Launch>,
    failing: Arc<Mutex<HashSet<PathBuf>>>,
    launched: Arc<AtomicUsize>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl ScriptedRunner {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Launch>) {
        let (launches, rx) = mpsc::unbounded_channel();
        let runner = Self {
            launches,
            failing: Arc::default(),
            launched: Arc::default(),
            in_flight: Arc::default(),
            max_in_flight: Arc::default(),
        };
        (runner, rx)
    }

    /// Make launches for this input fail synchronously.
    pub fn fail_input(&self, path: &str) {
        self.failing.lock().unwrap().insert(PathBuf::from(path));
    }

    pub fn launch_count(&self) -> usize {
        self.launched.load(Ordering::SeqCst)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl ProcessRunner for ScriptedRunner {
    fn launch(&self, job_id: JobId, input: &InputRef, sink: RunSink) -> Result<(), LaunchError> {
        if self.failing.lock().unwrap().contains(input.as_path()) {
            return Err(LaunchError::MissingInput(input.as_path().to_path_buf()));
        }
        self.launched.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _ = self.launches.send(Launch {
            job_id,
            input: input.clone(),
            sink: Some(sink),
            in_flight: self.in_flight.clone(),
        });
        Ok(())
    }
}

pub struct Launch {
    pub job_id: JobId,
    pub input: InputRef,
    sink: Option<RunSink>,
    in_flight: Arc<AtomicUsize>,
}

impl Launch {
    pub fn started(&mut self, process_ref: ProcessRef) {
        if let Some(sink) = self.sink.as_mut() {
            sink.started(process_ref);
        }
    }

    pub fn line(&self, line: &str) {
        if let Some(sink) = self.sink.as_ref() {
            sink.line(line);
        }
    }

    pub fn finish(mut self, outcome: Result<(), RuntimeFailure>) {
        if let Some(sink) = self.sink.take() {
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            sink.finish(outcome);
        }
    }
}

impl Drop for Launch {
    fn drop(&mut self) {
        if let Some(sink) = self.sink.take() {
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            drop(sink);
        }
    }
}
