use crate::error::RuntimeFailure;
use crate::runner::{LineSink, RunSink};

use std::process::ExitStatus;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Child;
use tracing::{debug, warn};

/// Supervises one spawned process: pumps its output into the hub, reaps it, and reports
/// the outcome only once both pipes are drained.
pub struct Actor;

impl Actor {
    pub fn spawn(mut child: Child, sink: RunSink) {
        // grab stdout and stderr, if they've been piped
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let lines = sink.lines();
        tokio::spawn(async move {
            let job_id = sink.job_id();
            let (_, _, exit_status) = tokio::join!(
                pipe(stdout, lines.clone(), "stdout"),
                pipe(stderr, lines, "stderr"),
                child.wait(),
            );
            let outcome = match exit_status {
                Ok(status) => outcome_of(status),
                Err(err) => Err(RuntimeFailure::Message(format!(
                    "failed to wait for the process: {}",
                    err
                ))),
            };
            debug!(%job_id, ?outcome, "process reaped");
            sink.finish(outcome);
        });
    }
}

async fn pipe<R>(reader: Option<R>, lines: LineSink, stream: &'static str)
where
    R: AsyncRead + Unpin,
{
    let mut reader = match reader {
        Some(reader) => BufReader::new(reader),
        None => return,
    };
    let mut buf = Vec::with_capacity(4096);
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                while matches!(buf.last(), Some(b'\n') | Some(b'\r')) {
                    buf.pop();
                }
                lines.push(String::from_utf8_lossy(&buf).into_owned());
            }
            Err(err) => {
                warn!(stream, error = %err, "stopped reading process output");
                break;
            }
        }
    }
}

fn outcome_of(status: ExitStatus) -> Result<(), RuntimeFailure> {
    if status.success() {
        return Ok(());
    }
    if let Some(code) = status.code() {
        return Err(RuntimeFailure::ExitCode(code));
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return Err(RuntimeFailure::Signal(signal));
        }
    }
    Err(RuntimeFailure::Message(format!(
        "process ended abnormally: {}",
        status
    )))
}
