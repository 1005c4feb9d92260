use clap::{Parser, Subcommand};
use uuid::Uuid;

/// Talk to a foldqueue job server
#[derive(Debug, Parser)]
#[clap(name = "foldq")]
pub struct ArgParser {
    /// The address of the server
    #[clap(
        short = 's',
        long = "server",
        env = "FOLDQUEUE_SERVER",
        default_value = "http://[::1]:50051"
    )]
    pub server: String,
    /// The sub-command to use
    #[clap(subcommand)]
    pub sub_command: SubCommand,
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Subcommand)]
pub enum SubCommand {
    /// queue a new job
    Submit {
        /// path of the job's input file, as seen by the server
        input: String,
    },
    /// show the running job, the pending queue and finished jobs
    Status,
    /// show one job
    Job {
        /// Uuid v4 string
        job_id: Uuid,
    },
    /// follow the live log stream
    Logs {
        /// only print lines of this job
        #[clap(long)]
        job: Option<Uuid>,

        /// print keepalive frames too
        #[clap(long)]
        keepalives: bool,
    },
    /// print the recent log of a job
    History {
        /// Uuid v4 string
        job_id: Uuid,

        /// how many trailing bytes to fetch; 0 uses the server default
        #[clap(long, default_value = "0")]
        bytes: u64,
    },
}
