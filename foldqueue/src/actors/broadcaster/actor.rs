use super::messages::Message;
use crate::error::StreamingFault;
use crate::events::TaggedLine;
use crate::store::LogStore;
use crate::types::JobId;

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, trace, warn};

/// A job whose output is being captured.
struct Tail {
    // None when the backing file could not be opened; lines are then only broadcast
    file: Option<File>,
    lines: u64,
}

pub struct Actor {
    inbox: mpsc::UnboundedReceiver<Message>,
    store: Arc<LogStore>,
    subscribers: Vec<mpsc::Sender<TaggedLine>>,
    subscriber_capacity: usize,
    tails: HashMap<JobId, Tail>,
    retired: HashSet<JobId>,
    active: Option<JobId>,
    rotation: VecDeque<JobId>,
}

impl Actor {
    pub fn spawn(
        inbox: mpsc::UnboundedReceiver<Message>,
        store: Arc<LogStore>,
        subscriber_capacity: usize,
    ) {
        let actor = Actor {
            inbox,
            store,
            subscribers: Vec::new(),
            subscriber_capacity,
            tails: HashMap::new(),
            retired: HashSet::new(),
            active: None,
            rotation: VecDeque::new(),
        };
        tokio::spawn(async move { actor.run().await });
    }

    async fn run(mut self) {
        use self::Message::*;
        while let Some(msg) = self.inbox.recv().await {
            match msg {
                BeginTail { job_id } => self.begin_tail(job_id).await,
                Ingest { job_id, line } => self.ingest(job_id, line).await,
                Retire { job_id, summary } => self.retire(job_id, summary).await,
                Subscribe { response } => {
                    let _ = response.send(self.subscribe());
                }
                ActiveStream { response } => {
                    let _ = response.send(self.active);
                }
            }
        }
        debug!("log hub stopped");
    }

    fn subscribe(&mut self) -> mpsc::Receiver<TaggedLine> {
        // an idle hub never broadcasts, so detached subscribers are also dropped here
        self.subscribers.retain(|sub| !sub.is_closed());
        let (tx, rx) = mpsc::channel(self.subscriber_capacity);
        self.subscribers.push(tx);
        debug!(subscribers = self.subscribers.len(), "subscriber attached");
        rx
    }

    async fn begin_tail(&mut self, job_id: JobId) {
        if self.tails.contains_key(&job_id) {
            debug!(%job_id, "already tailing");
            return;
        }
        if self.retired.contains(&job_id) {
            warn!(%job_id, "ignoring tail request for a retired job");
            return;
        }

        let file = match self.store.open(job_id).await {
            Ok(file) => Some(file),
            Err(source) => {
                let fault = StreamingFault::Persist { job_id, source };
                warn!(error = %fault, "log history will not be kept for this job");
                None
            }
        };
        self.tails.insert(job_id, Tail { file, lines: 0 });

        match self.active {
            None => self.activate(job_id),
            Some(active) => {
                info!(%job_id, %active, "log stream queued behind the active job");
                self.rotation.push_back(job_id);
            }
        }
    }

    async fn ingest(&mut self, job_id: JobId, line: String) {
        let tail = match self.tails.get_mut(&job_id) {
            Some(tail) => tail,
            None => {
                if self.retired.contains(&job_id) {
                    debug!(%job_id, line = %line, "late line from a retired job");
                } else {
                    warn!(%job_id, line = %line, "line from a job that is not being tailed");
                }
                return;
            }
        };

        trace!(%job_id, "{}", line);
        if let Some(file) = tail.file.as_mut() {
            if let Err(source) = LogStore::append(file, &line).await {
                let fault = StreamingFault::Persist { job_id, source };
                warn!(error = %fault, "skipping durable write");
            }
        }
        tail.lines += 1;

        if self.active == Some(job_id) {
            self.broadcast(TaggedLine::output(job_id, line));
        }
    }

    async fn retire(&mut self, job_id: JobId, summary: String) {
        match self.tails.remove(&job_id) {
            Some(Tail { file, lines }) => {
                if let Some(mut file) = file {
                    if let Err(source) = file.flush().await {
                        let fault = StreamingFault::Persist { job_id, source };
                        warn!(error = %fault, "final flush failed");
                    }
                }
                debug!(%job_id, lines, "tail retired");
            }
            None => debug!(%job_id, "retiring a job that never produced a tail"),
        }
        self.retired.insert(job_id);
        self.rotation.retain(|queued| *queued != job_id);

        if self.active == Some(job_id) {
            self.broadcast(TaggedLine::end(job_id, summary));
            self.active = None;
            match self.rotation.pop_front() {
                Some(next) => self.activate(next),
                None => debug!("no log stream is active"),
            }
        }
    }

    fn activate(&mut self, job_id: JobId) {
        self.active = Some(job_id);
        info!(%job_id, "log stream active");
        self.broadcast(TaggedLine::marker(
            job_id,
            format!("streaming logs for job {}", job_id),
        ));
    }

    fn broadcast(&mut self, line: TaggedLine) {
        self.subscribers.retain(|sub| match sub.try_send(line.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(line)) => {
                let fault = StreamingFault::Dropped {
                    job_id: line.job_id,
                };
                warn!(error = %fault, "slow subscriber");
                true
            }
            // only retain subscribers who have not dropped
            Err(TrySendError::Closed(_)) => false,
        });
    }
}
