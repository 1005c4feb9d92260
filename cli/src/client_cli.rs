use foldqueue_proto::{
    fold_queue_client::FoldQueueClient, job_info::State, log_frame::Frame, log_line::Kind,
    JobInfo, JobStatusRequest, LogHistoryRequest, QueueStatusRequest, StreamLogsRequest,
    SubmitRequest,
};
use std::error;
use std::io::{self, Write};
use tonic::{transport::Channel, Request, Status};
use uuid::Uuid;

pub struct ClientCli {
    inner: FoldQueueClient<Channel>,
}

impl ClientCli {
    pub async fn connect(server_addr: &str) -> Result<Self, tonic::transport::Error> {
        let inner = FoldQueueClient::connect(server_addr.to_string()).await?;
        Ok(Self { inner })
    }

    pub async fn submit(&mut self, input: &str) -> Result<(), Status> {
        let request = Request::new(SubmitRequest {
            input_path: input.into(),
        });
        let job_id = self.inner.submit(request).await?.into_inner().job_id;
        println!("Queued job id: {}", format_id(&job_id));
        Ok(())
    }

    pub async fn queue_status(&mut self) -> Result<(), Status> {
        let status = self
            .inner
            .queue_status(Request::new(QueueStatusRequest {}))
            .await?
            .into_inner();
        match &status.current {
            Some(job) => println!("Currently processing: {}", describe(job)),
            None => println!("No job is currently processing."),
        }
        if status.pending.is_empty() {
            println!("No jobs in the queue.");
        } else {
            println!("Pending jobs:");
            for job in &status.pending {
                println!("  Position {}: {}", job.position, describe(job));
            }
        }
        for (title, jobs) in [("Completed", &status.completed), ("Failed", &status.failed)] {
            if !jobs.is_empty() {
                println!("{} jobs:", title);
                for job in jobs {
                    println!("  {}", describe(job));
                }
            }
        }
        Ok(())
    }

    pub async fn job_status(&mut self, job_id: Uuid) -> Result<(), Status> {
        let job = self
            .inner
            .job_status(Request::new(JobStatusRequest {
                job_id: job_id.as_bytes().to_vec(),
            }))
            .await?
            .into_inner();
        println!("{}", describe(&job));
        println!("Input: {}", job.input_path);
        if job.position > 0 {
            println!("Queue position: {}", job.position);
        }
        if !job.process_ref.is_empty() {
            println!("Process: {}", job.process_ref);
        }
        Ok(())
    }

    /// Follow the unified log stream until the server closes it
    pub async fn stream_logs(&mut self, only: Option<Uuid>, keepalives: bool) -> Result<(), Status> {
        let mut stream = self
            .inner
            .stream_logs(Request::new(StreamLogsRequest {}))
            .await?
            .into_inner();
        while let Some(frame) = stream.message().await? {
            match frame.frame {
                Some(Frame::Line(line)) => {
                    if only.map_or(false, |id| id.as_bytes()[..] != line.job_id[..]) {
                        continue;
                    }
                    let job = format_id(&line.job_id);
                    match line.kind() {
                        Kind::Output => println!("{}", line.text),
                        Kind::Marker => println!("[{}] {}", job, line.text),
                        Kind::End => println!("[{}] finished: {}", job, line.text),
                    }
                }
                Some(Frame::Keepalive(_)) if keepalives => println!("[keepalive]"),
                _ => {}
            }
        }
        Ok(())
    }

    pub async fn log_history(
        &mut self,
        job_id: Uuid,
        byte_limit: u64,
    ) -> Result<(), Box<dyn error::Error>> {
        let data = self
            .inner
            .log_history(Request::new(LogHistoryRequest {
                job_id: job_id.as_bytes().to_vec(),
                byte_limit,
            }))
            .await?
            .into_inner()
            .data;
        write_history(&mut io::stdout().lock(), &data)?;
        Ok(())
    }
}

fn write_history(out: &mut impl Write, data: &[u8]) -> io::Result<()> {
    out.write_all(data)?;
    out.flush()
}

fn format_id(raw: &[u8]) -> String {
    Uuid::from_slice(raw)
        .map(|id| id.to_string())
        .unwrap_or_else(|_| "<invalid id>".to_string())
}

fn describe(job: &JobInfo) -> String {
    let state = match job.state() {
        State::Queued => "queued".to_string(),
        State::Processing => "processing".to_string(),
        State::Completed => "completed".to_string(),
        State::Failed => format!("failed: {}", job.failure_reason),
    };
    format!("{} {} ({})", format_id(&job.job_id), job.input_name, state)
}
