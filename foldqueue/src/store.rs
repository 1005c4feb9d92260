use crate::types::{JobId, LogBlob};
use std::io::{self, SeekFrom};
use std::path::PathBuf;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

/// Append-only, one file per job.
#[derive(Debug)]
pub struct LogStore {
    dir: PathBuf,
}

impl LogStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, job_id: JobId) -> PathBuf {
        self.dir.join(format!("{}.log", job_id))
    }

    /// Open (creating if needed) the backing file of a job for appending.
    pub async fn open(&self, job_id: JobId) -> io::Result<File> {
        fs::create_dir_all(&self.dir).await?;
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path_for(job_id))
            .await
    }

    /// Append one line and wait until it has reached the file.
    pub async fn append(file: &mut File, line: &str) -> io::Result<()> {
        let mut buf = Vec::with_capacity(line.len() + 1);
        buf.extend_from_slice(line.as_bytes());
        buf.push(b'\n');
        file.write_all(&buf).await?;
        // tokio writes in the background; flush so readers see the whole line
        file.flush().await
    }

    /// At most `byte_limit` trailing bytes of a job's log, starting on a line boundary
    /// whenever a whole line fits in the window.
    ///
    /// A job without a backing file reads as empty.
    pub async fn tail(&self, job_id: JobId, byte_limit: u64) -> io::Result<LogBlob> {
        let mut file = match File::open(self.path_for(job_id)).await {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(LogBlob::new()),
            Err(err) => return Err(err),
        };
        let len = file.metadata().await?.len();
        let start = len.saturating_sub(byte_limit);
        // read one byte early to tell whether `start` falls on a line boundary
        let from = start.saturating_sub(1);
        file.seek(SeekFrom::Start(from)).await?;
        let mut buf = Vec::with_capacity((len - from) as usize);
        file.take(len - from).read_to_end(&mut buf).await?;

        if start > 0 {
            // drop the partial first line, unless the window holds no line end before
            // its last byte, in which case the raw trailing bytes are all there is
            let last = buf.len().saturating_sub(1);
            match buf[..last].iter().position(|&b| b == b'\n') {
                Some(i) => {
                    buf.drain(..=i);
                }
                None => {
                    buf.drain(..(start - from) as usize);
                }
            }
        }
        Ok(LogBlob::from(buf))
    }
}
