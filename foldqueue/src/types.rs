use crate::error::SubmissionError;
use std::fmt;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub type Program = String;
pub type Args = Vec<String>;
pub type Dir = Option<PathBuf>;
pub type Envs = Vec<(String, String)>;
pub type JobId = Uuid;
pub type LogBlob = bytes::Bytes;

/// Reference to a job's input artifact.
///
/// The queue never looks inside the artifact, it only hands the path to the runner.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct InputRef(PathBuf);

impl InputRef {
    /// Validate a raw submission. Existence of the file is checked later, at launch time.
    pub fn parse(raw: &str) -> Result<Self, SubmissionError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(SubmissionError::EmptyInput);
        }
        if raw.contains('\0') {
            return Err(SubmissionError::NulByte);
        }
        let path = PathBuf::from(raw);
        if path.file_name().is_none() {
            return Err(SubmissionError::NotAFile(raw.to_string()));
        }
        Ok(Self(path))
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// The artifact's file name, which is what status listings show.
    pub fn file_name(&self) -> String {
        self.0
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

impl fmt::Display for InputRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// Opaque identifier of an external process, as reported by the runner.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ProcessRef(String);

impl ProcessRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl From<u32> for ProcessRef {
    fn from(pid: u32) -> Self {
        Self(pid.to_string())
    }
}

impl fmt::Display for ProcessRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
