use clap::Parser;
use foldqueue::config::DEFAULT_HISTORY_BYTES;
use foldqueue::{ContainerSpec, QueueConfig};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Run a single-worker job queue behind a gRPC endpoint
#[derive(Debug, Parser)]
#[clap(name = "foldqueued")]
pub struct ServerConfig {
    /// Address to listen on
    #[clap(long, env = "FOLDQUEUE_LISTEN", default_value = "[::1]:50051")]
    pub listen: SocketAddr,

    /// Directory for per-job log files
    #[clap(long, env = "FOLDQUEUE_LOG_DIR", default_value = "job-logs")]
    pub log_dir: PathBuf,

    /// Seconds of silence before a log subscriber gets a keepalive frame
    #[clap(long, env = "FOLDQUEUE_KEEPALIVE_SECS", default_value = "25")]
    pub keepalive_secs: u64,

    /// Lines buffered per log subscriber
    #[clap(long, env = "FOLDQUEUE_SUBSCRIBER_BUFFER", default_value = "1024")]
    pub subscriber_buffer: usize,

    /// Requests the queue buffers before submitters wait
    #[clap(long, env = "FOLDQUEUE_MAILBOX", default_value = "256")]
    pub mailbox_capacity: usize,

    /// Default size of a log history read, in bytes [default: 65536]
    #[clap(long, env = "FOLDQUEUE_HISTORY_BYTES")]
    pub history_bytes: Option<u64>,

    /// Program run for each job [default: docker]
    #[clap(long, env = "FOLDQUEUE_PROGRAM")]
    pub program: Option<String>,

    /// Argument passed to the program, repeatable. `{input}` and `{job_id}` are
    /// substituted per job. Without any, the alphafold3 container invocation is used.
    #[clap(long = "arg", allow_hyphen_values = true)]
    pub args: Vec<String>,

    /// Working directory for the program
    #[clap(long, env = "FOLDQUEUE_WORKDIR")]
    pub workdir: Option<PathBuf>,

    /// Environment variable for the program, VAR=VAL, repeatable
    #[clap(long = "env", parse(try_from_str = var_eq_val))]
    pub envs: Vec<(String, String)>,
}

impl ServerConfig {
    pub fn queue_config(&self) -> QueueConfig {
        QueueConfig::new(&self.log_dir)
            .with_keepalive(Duration::from_secs(self.keepalive_secs.max(1)))
            .with_subscriber_capacity(self.subscriber_buffer)
            .with_mailbox_capacity(self.mailbox_capacity)
    }

    pub fn history_bytes(&self) -> u64 {
        self.history_bytes.unwrap_or(DEFAULT_HISTORY_BYTES).max(1)
    }

    pub fn container_spec(&self) -> ContainerSpec {
        let mut spec = match (&self.program, self.args.is_empty()) {
            (None, true) => ContainerSpec::alphafold3(),
            (program, _) => ContainerSpec::new(
                program.clone().unwrap_or_else(|| "docker".to_string()),
                self.args.clone(),
            ),
        };
        spec.dir = self.workdir.clone();
        spec.envs = self.envs.clone();
        spec
    }
}

/// try_from_str parse function for command env variables
fn var_eq_val(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((var, val)) if !var.is_empty() => Ok((var.to_string(), val.to_string())),
        _ => Err("Required format is VAR=VAL".to_string()),
    }
}
