mod actor;
mod messages;

use crate::config::QueueConfig;
use crate::error::{Error, Result};
use crate::events::{Frame, TaggedLine};
use crate::store::LogStore;
use crate::types::{JobId, LogBlob};
use actor::Actor;
use messages::Message;

use futures::Stream;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

/// A `LogHub` which captures job output, persists it per job and fans the active job's
/// lines out to every subscriber of the unified channel.
///
/// This struct is actually an actor handle. The real work is done in the actor spawned by
/// `LogHubHandle::spawn`. All mutations (`begin_tail`, `ingest`, `retire`, subscriber
/// registration) go through one mailbox, so they are applied in the order they were sent.
#[derive(Clone)]
pub struct LogHubHandle {
    sender: mpsc::UnboundedSender<Message>,
    store: Arc<LogStore>,
    keepalive: Duration,
}

impl LogHubHandle {
    pub fn spawn(config: &QueueConfig) -> Self {
        let config = config.clamped();
        let (sender, inbox) = mpsc::unbounded_channel();
        let store = Arc::new(LogStore::new(&config.log_dir));
        Actor::spawn(inbox, store.clone(), config.subscriber_capacity);
        Self {
            sender,
            store,
            keepalive: config.keepalive,
        }
    }

    /// Start capturing a job's output. The first job to begin tailing owns the unified
    /// channel; later ones wait their turn.
    pub fn begin_tail(&self, job_id: JobId) {
        let _ = self.sender.send(Message::BeginTail { job_id });
    }

    pub fn ingest(&self, job_id: JobId, line: impl Into<String>) {
        let _ = self.sender.send(Message::Ingest {
            job_id,
            line: line.into(),
        });
    }

    /// Stop capturing a job and hand the unified channel to the next tailing job.
    pub fn retire(&self, job_id: JobId, summary: impl Into<String>) {
        let _ = self.sender.send(Message::Retire {
            job_id,
            summary: summary.into(),
        });
    }

    /// Attach to the unified channel. History is never replayed, see `history`.
    pub async fn subscribe(&self) -> Result<Subscription> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(Message::Subscribe { response: tx })
            .map_err(|_| Error::HubClosed)?;
        let lines = rx.await.map_err(|_| Error::HubClosed)?;
        Ok(Subscription {
            lines,
            keepalive: self.keepalive,
        })
    }

    /// The job currently owning the unified channel.
    pub async fn active_stream(&self) -> Result<Option<JobId>> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(Message::ActiveStream { response: tx })
            .map_err(|_| Error::HubClosed)?;
        rx.await.map_err(|_| Error::HubClosed)
    }

    /// Up to `byte_limit` trailing bytes of a job's persisted output.
    ///
    /// Reads the backing store directly, concurrently with ingestion, so the result is
    /// whatever prefix has been written so far.
    pub async fn history(&self, job_id: JobId, byte_limit: u64) -> Result<LogBlob> {
        self.store
            .tail(job_id, byte_limit)
            .await
            .map_err(Error::History)
    }
}

/// A live listener on the unified channel.
///
/// Dropping or closing it detaches it from the hub.
pub struct Subscription {
    lines: mpsc::Receiver<TaggedLine>,
    keepalive: Duration,
}

impl Subscription {
    /// Wait for the next frame. Yields `Frame::Keepalive` whenever nothing arrived for a
    /// whole keepalive interval, and `None` once the hub has gone away.
    pub async fn recv(&mut self) -> Option<Frame> {
        match tokio::time::timeout(self.keepalive, self.lines.recv()).await {
            Ok(Some(line)) => Some(Frame::Line(line)),
            Ok(None) => None,
            Err(_) => Some(Frame::Keepalive),
        }
    }

    /// Stop receiving. Lines already buffered can still be drained with `recv`.
    pub fn close(&mut self) {
        self.lines.close();
    }

    pub fn into_stream(self) -> impl Stream<Item = Frame> {
        futures::stream::unfold(self, |mut sub| async move {
            sub.recv().await.map(|frame| (frame, sub))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::LineKind;

    fn hub(dir: &tempfile::TempDir) -> LogHubHandle {
        LogHubHandle::spawn(
            &QueueConfig::new(dir.path()).with_keepalive(Duration::from_secs(60)),
        )
    }

    async fn next_line(sub: &mut Subscription) -> TaggedLine {
        match sub.recv().await {
            Some(Frame::Line(line)) => line,
            other => panic!("expected a line, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn marker_precedes_output_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let hub = hub(&dir);
        let mut sub = hub.subscribe().await.unwrap();
        let job = uuid::Uuid::new_v4();

        hub.begin_tail(job);
        for line in ["L1", "L2", "L3"] {
            hub.ingest(job, line);
        }

        let marker = next_line(&mut sub).await;
        assert_eq!((marker.job_id, marker.kind), (job, LineKind::Marker));
        for expected in ["L1", "L2", "L3"] {
            assert_eq!(next_line(&mut sub).await, TaggedLine::output(job, expected));
        }

        hub.retire(job, "completed");
        let end = next_line(&mut sub).await;
        assert_eq!(end, TaggedLine::end(job, "completed"));

        let history = hub.history(job, 1024).await.unwrap();
        assert_eq!(&history[..], b"L1\nL2\nL3\n");
        assert_eq!(hub.active_stream().await.unwrap(), None);
    }

    #[tokio::test]
    async fn second_stream_waits_for_the_active_one() {
        let dir = tempfile::tempdir().unwrap();
        let hub = hub(&dir);
        let mut sub = hub.subscribe().await.unwrap();
        let (first, second) = (uuid::Uuid::new_v4(), uuid::Uuid::new_v4());

        hub.begin_tail(first);
        hub.begin_tail(second);
        hub.ingest(second, "early from second");
        hub.ingest(first, "from first");
        assert_eq!(hub.active_stream().await.unwrap(), Some(first));

        assert_eq!(next_line(&mut sub).await.kind, LineKind::Marker);
        assert_eq!(
            next_line(&mut sub).await,
            TaggedLine::output(first, "from first")
        );

        hub.retire(first, "completed");
        hub.ingest(second, "later from second");

        assert_eq!(next_line(&mut sub).await.kind, LineKind::End);
        let marker = next_line(&mut sub).await;
        assert_eq!((marker.job_id, marker.kind), (second, LineKind::Marker));
        assert_eq!(
            next_line(&mut sub).await,
            TaggedLine::output(second, "later from second")
        );
        assert_eq!(hub.active_stream().await.unwrap(), Some(second));

        // the line broadcast was skipped for is still in the job's history
        let history = hub.history(second, 1024).await.unwrap();
        assert_eq!(&history[..], b"early from second\nlater from second\n");
    }

    #[tokio::test]
    async fn dropped_subscribers_do_not_disturb_the_others() {
        let dir = tempfile::tempdir().unwrap();
        let hub = hub(&dir);
        let job = uuid::Uuid::new_v4();
        let mut stays = hub.subscribe().await.unwrap();
        let mut leaves = hub.subscribe().await.unwrap();

        hub.begin_tail(job);
        hub.ingest(job, "one");
        assert_eq!(next_line(&mut leaves).await.kind, LineKind::Marker);
        leaves.close();
        leaves.close();
        drop(leaves);

        hub.ingest(job, "two");
        let mut rejoined = hub.subscribe().await.unwrap();
        hub.ingest(job, "three");

        assert_eq!(next_line(&mut stays).await.kind, LineKind::Marker);
        for expected in ["one", "two", "three"] {
            assert_eq!(next_line(&mut stays).await.text, expected);
        }
        // a new subscription starts from the live edge
        assert_eq!(next_line(&mut rejoined).await.text, "three");

        let history = hub.history(job, 1024).await.unwrap();
        assert_eq!(&history[..], b"one\ntwo\nthree\n");
    }

    #[tokio::test]
    async fn lines_are_captured_without_subscribers() {
        let dir = tempfile::tempdir().unwrap();
        let hub = hub(&dir);
        let job = uuid::Uuid::new_v4();

        assert!(hub.history(job, 1024).await.unwrap().is_empty());
        hub.begin_tail(job);
        hub.ingest(job, "nobody is watching");
        hub.retire(job, "completed");
        hub.ingest(job, "too late");

        // the actor has processed everything sent before this reply
        assert_eq!(hub.active_stream().await.unwrap(), None);
        let history = hub.history(job, 1024).await.unwrap();
        assert_eq!(&history[..], b"nobody is watching\n");
    }

    #[tokio::test]
    async fn persistence_failure_keeps_the_live_channel() {
        let dir = tempfile::tempdir().unwrap();
        // a regular file where the log directory should be
        let blocked = dir.path().join("not-a-dir");
        std::fs::write(&blocked, b"").unwrap();
        let hub = LogHubHandle::spawn(&QueueConfig::new(&blocked));
        let mut sub = hub.subscribe().await.unwrap();
        let job = uuid::Uuid::new_v4();

        hub.begin_tail(job);
        hub.ingest(job, "still delivered");

        assert_eq!(next_line(&mut sub).await.kind, LineKind::Marker);
        assert_eq!(next_line(&mut sub).await.text, "still delivered");
    }

    #[tokio::test]
    async fn idle_subscription_yields_keepalives() {
        let dir = tempfile::tempdir().unwrap();
        let hub = LogHubHandle::spawn(
            &QueueConfig::new(dir.path()).with_keepalive(Duration::from_millis(20)),
        );
        let mut sub = hub.subscribe().await.unwrap();
        assert_eq!(sub.recv().await, Some(Frame::Keepalive));

        let job = uuid::Uuid::new_v4();
        hub.begin_tail(job);
        loop {
            match sub.recv().await {
                Some(Frame::Keepalive) => continue,
                Some(Frame::Line(line)) => {
                    assert_eq!((line.job_id, line.kind), (job, LineKind::Marker));
                    break;
                }
                None => panic!("hub went away"),
            }
        }
    }

    #[tokio::test]
    async fn zero_keepalive_is_raised_to_the_minimum() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = QueueConfig::new(dir.path());
        config.keepalive = Duration::ZERO;
        let hub = LogHubHandle::spawn(&config);
        let mut sub = hub.subscribe().await.unwrap();

        let begin = tokio::time::Instant::now();
        assert_eq!(sub.recv().await, Some(Frame::Keepalive));
        assert!(begin.elapsed() >= crate::config::MIN_KEEPALIVE);
    }
}
