use std::io::Write;
use std::process::{Command, Stdio};

use log::info;

use crate::error::SubmitError;
use crate::job::JobId;

/// A submission backend.
///
/// The real backend is [`Sbatch`]; tests substitute an in-memory
/// implementation to drive the submission protocol without a cluster.
pub trait Scheduler {
    /// Submit a rendered job script, returning the assigned job id.
    fn submit(&self, script: &str) -> Result<JobId, SubmitError>;
}

/// Submits scripts with the `sbatch` command line tool.
///
/// The script is fed to sbatch on stdin. `--parsable` is always passed so
/// stdout is the bare job id (optionally suffixed with `;cluster`).
pub struct Sbatch {
    program: String,
}

impl Sbatch {
    /// Use a specific sbatch executable, e.g. an absolute path.
    pub fn new(program: impl Into<String>) -> Sbatch {
        Sbatch {
            program: program.into(),
        }
    }
}

impl Default for Sbatch {
    fn default() -> Sbatch {
        Sbatch::new("sbatch")
    }
}

impl Scheduler for Sbatch {
    fn submit(&self, script: &str) -> Result<JobId, SubmitError> {
        info!("running {} --parsable", self.program);
        let mut child = Command::new(&self.program)
            .arg("--parsable")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        if let Some(stdin) = child.stdin.as_mut() {
            stdin.write_all(script.as_bytes())?;
        }
        let output = child.wait_with_output()?;

        if !output.status.success() {
            return Err(SubmitError::SbatchFailed {
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        parse_job_id(&String::from_utf8_lossy(&output.stdout))
    }
}

/// With `--parsable` sbatch prints `<id>` or `<id>;<cluster>`.
fn parse_job_id(stdout: &str) -> Result<JobId, SubmitError> {
    let id = stdout.trim().split(';').next().unwrap_or_default();
    id.parse().map_err(|_| SubmitError::MalformedJobId {
        output: stdout.trim().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_bare_job_id() {
        assert_eq!(parse_job_id("12345\n").unwrap(), 12345);
    }

    #[test]
    fn parses_a_job_id_with_cluster_suffix() {
        assert_eq!(parse_job_id("987;cluster\n").unwrap(), 987);
    }

    #[test]
    fn rejects_output_without_an_id() {
        let err = parse_job_id("Submitted batch job 42\n").unwrap_err();
        assert!(matches!(err, SubmitError::MalformedJobId { .. }));
    }
}
