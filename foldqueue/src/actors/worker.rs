mod actor;

use crate::error::LaunchError;
use crate::runner::{ProcessRunner, RunSink};
use crate::types::{Args, Dir, Envs, InputRef, JobId, ProcessRef, Program};
use actor::Actor;
use std::process::Stdio;
use tokio::process;
use tracing::debug;

pub const INPUT_PLACEHOLDER: &str = "{input}";
pub const JOB_ID_PLACEHOLDER: &str = "{job_id}";

/// How to invoke the containerized job. `{input}` and `{job_id}` in the arguments are
/// replaced per job.
#[derive(Clone, Debug)]
pub struct ContainerSpec {
    pub program: Program,
    pub args: Args,
    pub dir: Dir,
    pub envs: Envs,
}

impl ContainerSpec {
    pub fn new(program: impl Into<Program>, args: Args) -> Self {
        Self {
            program: program.into(),
            args,
            dir: None,
            envs: Vec::new(),
        }
    }

    /// The alphafold3 prediction container with its model, database and output mounts.
    pub fn alphafold3() -> Self {
        let args = [
            "run",
            "--rm",
            "-v",
            "/home/entropy/output_alphafold3:/home/entropy/output_alphafold3",
            "-v",
            "/opt/alphafold3_database:/opt/alphafold3_database",
            "-v",
            "/opt/alphafold3_model:/opt/alphafold3_model",
            "--gpus",
            "all",
            "alphafold3",
            "python3",
            "run_alphafold.py",
            "--json_path={input}",
            "--model_dir=/opt/alphafold3_model",
            "--db_dir=/opt/alphafold3_database",
            "--output_dir=/home/entropy/output_alphafold3",
        ];
        Self::new("docker", args.iter().map(|arg| arg.to_string()).collect())
    }

    pub fn render_args(&self, job_id: JobId, input: &InputRef) -> Args {
        let input = input.to_string();
        let job_id = job_id.to_string();
        self.args
            .iter()
            .map(|arg| {
                arg.replace(INPUT_PLACEHOLDER, &input)
                    .replace(JOB_ID_PLACEHOLDER, &job_id)
            })
            .collect()
    }
}

/// Runs each job as a child process described by a `ContainerSpec`.
#[derive(Clone, Debug)]
pub struct ContainerRunner {
    spec: ContainerSpec,
}

impl ContainerRunner {
    pub fn new(spec: ContainerSpec) -> Self {
        Self { spec }
    }

    pub fn spec(&self) -> &ContainerSpec {
        &self.spec
    }
}

impl ProcessRunner for ContainerRunner {
    fn launch(
        &self,
        job_id: JobId,
        input: &InputRef,
        mut sink: RunSink,
    ) -> Result<(), LaunchError> {
        if !input.as_path().is_file() {
            return Err(LaunchError::MissingInput(input.as_path().to_path_buf()));
        }

        let args = self.spec.render_args(job_id, input);
        debug!(%job_id, program = %self.spec.program, ?args, "spawning process");
        let mut command = process::Command::new(&self.spec.program);
        command
            .args(args)
            .envs(self.spec.envs.iter().cloned())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &self.spec.dir {
            command.current_dir(dir);
        }
        let child = command.spawn().map_err(|source| LaunchError::Spawn {
            program: self.spec.program.clone(),
            source,
        })?;

        let process_ref = child
            .id()
            .map(ProcessRef::from)
            .unwrap_or_else(|| ProcessRef::new("unknown"));
        sink.started(process_ref);
        Actor::spawn(child, sink);
        Ok(())
    }
}
