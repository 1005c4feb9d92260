use foldqueue::error::Error;
use foldqueue::types::JobId;
use foldqueue::{Frame, Job, JobQueue, JobStatus, LineKind, TaggedLine};
use foldqueue_proto::fold_queue_server::FoldQueue;
use foldqueue_proto::{
    job_info, log_frame, log_line, JobInfo, JobStatusRequest, Keepalive, LogFrame,
    LogHistoryRequest, LogHistoryResponse, LogLine, QueueStatusRequest, QueueStatusResponse,
    StreamLogsRequest, SubmitRequest, SubmitResponse,
};
use futures::Stream;
use std::pin::Pin;
use tokio_stream::StreamExt;
use tonic::{Request, Response, Status};
use tracing::{debug, info};
use uuid::Uuid;

// tonic wraps this in Arc anyway internally, so we don't need Arc
pub struct FoldQueueService {
    queue: JobQueue,
    history_bytes: u64,
}

impl FoldQueueService {
    pub fn new(queue: JobQueue, history_bytes: u64) -> Self {
        Self {
            queue,
            history_bytes,
        }
    }
}

#[tonic::async_trait]
impl FoldQueue for FoldQueueService {
    type StreamLogsStream = Pin<Box<dyn Stream<Item = Result<LogFrame, Status>> + Send>>;

    async fn submit(
        &self,
        req: Request<SubmitRequest>,
    ) -> Result<Response<SubmitResponse>, Status> {
        let SubmitRequest { input_path } = req.into_inner();
        let job_id = self.queue.submit(&input_path).await.map_err(to_status)?;
        info!(%job_id, %input_path, "job submitted");
        Ok(Response::new(SubmitResponse {
            job_id: job_id.as_bytes().to_vec(),
        }))
    }

    async fn queue_status(
        &self,
        _req: Request<QueueStatusRequest>,
    ) -> Result<Response<QueueStatusResponse>, Status> {
        let status = self.queue.status().await.map_err(to_status)?;
        let active_stream = self.queue.active_stream().await.map_err(to_status)?;
        Ok(Response::new(QueueStatusResponse {
            busy: status.busy,
            current: status.current.as_ref().map(|job| job_info(job, 0)),
            pending: status
                .pending
                .iter()
                .map(|queued| job_info(&queued.job, queued.position))
                .collect(),
            completed: status.completed.iter().map(|job| job_info(job, 0)).collect(),
            failed: status.failed.iter().map(|job| job_info(job, 0)).collect(),
            active_stream: active_stream
                .map(|job_id| job_id.as_bytes().to_vec())
                .unwrap_or_default(),
        }))
    }

    async fn job_status(
        &self,
        req: Request<JobStatusRequest>,
    ) -> Result<Response<JobInfo>, Status> {
        let job_id = parse_job_id(&req.get_ref().job_id)?;
        // one snapshot, so the position and the job agree
        let status = self.queue.status().await.map_err(to_status)?;
        let job = status
            .find(job_id)
            .ok_or_else(|| to_status(Error::NotFound(job_id)))?;
        let position = status.position_of(job_id).unwrap_or(0);
        Ok(Response::new(job_info(job, position)))
    }

    async fn stream_logs(
        &self,
        _req: Request<StreamLogsRequest>,
    ) -> Result<Response<Self::StreamLogsStream>, Status> {
        let subscription = self.queue.subscribe().await.map_err(to_status)?;
        debug!("log stream subscriber connected");
        let frames = subscription.into_stream().map(|frame| Ok(log_frame(frame)));
        Ok(Response::new(Box::pin(frames) as Self::StreamLogsStream))
    }

    async fn log_history(
        &self,
        req: Request<LogHistoryRequest>,
    ) -> Result<Response<LogHistoryResponse>, Status> {
        let LogHistoryRequest { job_id, byte_limit } = req.into_inner();
        let job_id = parse_job_id(&job_id)?;
        let byte_limit = match byte_limit {
            0 => self.history_bytes,
            limit => limit,
        };
        let data = self
            .queue
            .history(job_id, byte_limit)
            .await
            .map_err(to_status)?;
        Ok(Response::new(LogHistoryResponse {
            data: data.to_vec(),
        }))
    }
}

fn parse_job_id(raw: &[u8]) -> Result<JobId, Status> {
    Uuid::from_slice(raw).map_err(|err| Status::invalid_argument(err.to_string()))
}

fn to_status(err: Error) -> Status {
    match &err {
        Error::NotFound(_) => Status::not_found(err.to_string()),
        Error::Submission(_) => Status::invalid_argument(err.to_string()),
        Error::QueueClosed | Error::HubClosed => Status::unavailable(err.to_string()),
        Error::History(_) => Status::internal(err.to_string()),
    }
}

fn job_info(job: &Job, position: usize) -> JobInfo {
    let (state, failure_reason) = match &job.status {
        JobStatus::Queued => (job_info::State::Queued, String::new()),
        JobStatus::Processing => (job_info::State::Processing, String::new()),
        JobStatus::Completed => (job_info::State::Completed, String::new()),
        JobStatus::Failed { reason } => (job_info::State::Failed, reason.clone()),
    };
    let mut info = JobInfo {
        job_id: job.id.as_bytes().to_vec(),
        input_path: job.input.to_string(),
        input_name: job.input.file_name(),
        failure_reason,
        process_ref: job
            .process_ref
            .as_ref()
            .map(|process_ref| process_ref.to_string())
            .unwrap_or_default(),
        position: position as u32,
        submitted_at_ms: job.submitted_at.timestamp_millis(),
        finished_at_ms: job
            .finished_at
            .map_or(0, |finished_at| finished_at.timestamp_millis()),
        ..Default::default()
    };
    info.set_state(state);
    info
}

fn log_frame(frame: Frame) -> LogFrame {
    let frame = match frame {
        Frame::Line(TaggedLine { job_id, kind, text }) => {
            let mut line = LogLine {
                job_id: job_id.as_bytes().to_vec(),
                text,
                ..Default::default()
            };
            line.set_kind(match kind {
                LineKind::Output => log_line::Kind::Output,
                LineKind::Marker => log_line::Kind::Marker,
                LineKind::End => log_line::Kind::End,
            });
            log_frame::Frame::Line(line)
        }
        Frame::Keepalive => log_frame::Frame::Keepalive(Keepalive {}),
    };
    LogFrame { frame: Some(frame) }
}
