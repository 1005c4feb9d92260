use crate::events::TaggedLine;
use crate::types::JobId;
use tokio::sync::{mpsc, oneshot};

#[derive(Debug)]
pub enum Message {
    BeginTail {
        job_id: JobId,
    },
    Ingest {
        job_id: JobId,
        line: String,
    },
    Retire {
        job_id: JobId,
        summary: String,
    },
    Subscribe {
        response: oneshot::Sender<mpsc::Receiver<TaggedLine>>,
    },
    ActiveStream {
        response: oneshot::Sender<Option<JobId>>,
    },
}
