mod config;
mod services;

use clap::Parser;
use config::ServerConfig;
use foldqueue::{ContainerRunner, JobQueue};
use foldqueue_proto::fold_queue_server::FoldQueueServer;
use services::queueservice::FoldQueueService;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "foldqueue=info,foldqueued=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::parse();
    let listener = TcpListener::bind(config.listen).await?;
    serve(config, listener).await
}

async fn serve(config: ServerConfig, listener: TcpListener) -> Result<(), Box<dyn std::error::Error>> {
    let addr = listener.local_addr()?;
    let runner = ContainerRunner::new(config.container_spec());
    info!(
        program = %runner.spec().program,
        args = ?runner.spec().args,
        log_dir = %config.log_dir.display(),
        "job runner configured"
    );

    let queue = JobQueue::spawn(config.queue_config(), Arc::new(runner));
    let service = FoldQueueService::new(queue, config.history_bytes());
    info!(%addr, "listening");

    Server::builder()
        .add_service(FoldQueueServer::new(service))
        .serve_with_incoming(TcpListenerStream::new(listener))
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use foldqueue_proto::fold_queue_client::FoldQueueClient;
    use foldqueue_proto::{
        job_info, log_frame, log_line, JobStatusRequest, LogHistoryRequest, QueueStatusRequest,
        StreamLogsRequest, SubmitRequest,
    };
    use std::net::SocketAddr;
    use std::path::PathBuf;
    use tonic::transport::Channel;

    fn config(log_dir: PathBuf, program: &str, args: &[&str]) -> ServerConfig {
        ServerConfig {
            listen: "127.0.0.1:0".parse().unwrap(),
            log_dir,
            keepalive_secs: 60,
            subscriber_buffer: 64,
            mailbox_capacity: 16,
            history_bytes: Some(4096),
            program: Some(program.to_string()),
            args: args.iter().map(|arg| arg.to_string()).collect(),
            workdir: None,
            envs: vec![],
        }
    }

    // start the server on an ephemeral port
    async fn start_server(config: ServerConfig) -> SocketAddr {
        let listener = TcpListener::bind(config.listen).await.expect("bind");
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = serve(config, listener).await;
        });
        addr
    }

    async fn build_client(addr: SocketAddr) -> FoldQueueClient<Channel> {
        FoldQueueClient::connect(format!("http://{}", addr))
            .await
            .expect("channel connect")
    }

    #[tokio::test]
    async fn submitted_job_streams_and_keeps_history() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("fold.json");
        std::fs::write(&input, "line one\nline two\n").unwrap();
        let addr = start_server(config(
            dir.path().join("logs"),
            "sh",
            &["-c", r#"cat "$1""#, "job", "{input}"],
        ))
        .await;
        let mut client = build_client(addr).await;

        // subscribe before submitting so nothing is missed
        let mut stream = client
            .stream_logs(StreamLogsRequest {})
            .await
            .expect("no stream response")
            .into_inner();
        let job_id = client
            .submit(SubmitRequest {
                input_path: input.to_string_lossy().into_owned(),
            })
            .await
            .expect("Bad submit response")
            .into_inner()
            .job_id;

        let mut received = vec![];
        while let Some(frame) = stream.message().await.unwrap() {
            let line = match frame.frame {
                Some(log_frame::Frame::Line(line)) => line,
                _ => continue,
            };
            assert_eq!(line.job_id, job_id);
            match line.kind() {
                log_line::Kind::Marker => assert!(received.is_empty()),
                log_line::Kind::Output => received.push(line.text),
                log_line::Kind::End => {
                    assert_eq!(line.text, "completed");
                    break;
                }
            }
        }
        assert_eq!(received, ["line one", "line two"]);

        let info = client
            .job_status(JobStatusRequest {
                job_id: job_id.clone(),
            })
            .await
            .unwrap()
            .into_inner();
        assert_eq!(info.state(), job_info::State::Completed);
        assert!(!info.process_ref.is_empty());
        assert_eq!(info.input_name, "fold.json");
        assert!(info.finished_at_ms >= info.submitted_at_ms);

        let history = client
            .log_history(LogHistoryRequest {
                job_id,
                byte_limit: 0,
            })
            .await
            .unwrap()
            .into_inner();
        assert_eq!(String::from_utf8_lossy(&history.data), "line one\nline two\n");
    }

    #[tokio::test]
    async fn missing_input_is_reported_as_failed() {
        let dir = tempfile::tempdir().unwrap();
        let addr = start_server(config(dir.path().join("logs"), "true", &[])).await;
        let mut client = build_client(addr).await;

        let missing = dir.path().join("nowhere.json");
        let job_id = client
            .submit(SubmitRequest {
                input_path: missing.to_string_lossy().into_owned(),
            })
            .await
            .unwrap()
            .into_inner()
            .job_id;

        let status = client
            .queue_status(QueueStatusRequest {})
            .await
            .unwrap()
            .into_inner();
        assert!(!status.busy);
        assert!(status.current.is_none());
        assert_eq!(status.failed.len(), 1);
        let failed = &status.failed[0];
        assert_eq!(failed.job_id, job_id);
        assert_eq!(failed.state(), job_info::State::Failed);
        assert!(failed.failure_reason.contains("nowhere.json"));
        assert!(failed.process_ref.is_empty());

        // known job without output: empty history, not an error
        let history = client
            .log_history(LogHistoryRequest {
                job_id,
                byte_limit: 128,
            })
            .await
            .unwrap()
            .into_inner();
        assert!(history.data.is_empty());
    }

    #[tokio::test]
    async fn bad_requests_map_to_status_codes() {
        let dir = tempfile::tempdir().unwrap();
        let addr = start_server(config(dir.path().join("logs"), "true", &[])).await;
        let mut client = build_client(addr).await;

        let err = client
            .submit(SubmitRequest {
                input_path: "   ".into(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), tonic::Code::InvalidArgument);

        let err = client
            .job_status(JobStatusRequest {
                job_id: vec![1, 2, 3],
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), tonic::Code::InvalidArgument);

        let unknown = uuid::Uuid::new_v4().as_bytes().to_vec();
        let err = client
            .job_status(JobStatusRequest {
                job_id: unknown.clone(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), tonic::Code::NotFound);

        let err = client
            .log_history(LogHistoryRequest {
                job_id: unknown,
                byte_limit: 0,
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), tonic::Code::NotFound);
    }
}
