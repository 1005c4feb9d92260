mod arg_parser;
mod client_cli;

use arg_parser::{ArgParser, SubCommand};
use client_cli::ClientCli;

use clap::Parser;
use std::error;

#[tokio::main]
async fn main() -> Result<(), Box<dyn error::Error>> {
    let args = ArgParser::parse();
    let mut client = ClientCli::connect(&args.server).await?;

    match args.sub_command {
        SubCommand::Submit { input } => client.submit(&input).await?,
        SubCommand::Status => client.queue_status().await?,
        SubCommand::Job { job_id } => client.job_status(job_id).await?,
        SubCommand::Logs { job, keepalives } => client.stream_logs(job, keepalives).await?,
        SubCommand::History { job_id, bytes } => client.log_history(job_id, bytes).await?,
    }

    Ok(())
}
