use thiserror::Error;

/// Things that can go wrong while rendering or submitting a job.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// A job was reached again while its own submission was still in
    /// progress, i.e. the dependency graph contains a cycle.
    #[error("dependency cycle detected at job {name:?}")]
    DependencyCycle { name: String },

    /// A dependency clause points at a job that has no assigned id.
    #[error("dependency on job {name:?} which has not been submitted")]
    UnresolvedDependency { name: String },

    /// sbatch ran but rejected the script.
    #[error("sbatch failed with {status}: {stderr}")]
    SbatchFailed {
        status: std::process::ExitStatus,
        stderr: String,
    },

    /// sbatch exited 0 but its output did not contain a job id.
    #[error("could not parse a job id from sbatch output {output:?}")]
    MalformedJobId { output: String },

    /// The submission command could not be run at all.
    #[error("failed to run the submission command")]
    Spawn(#[from] std::io::Error),

    #[error("failed to render the job script")]
    Render(#[from] tinytemplate::error::Error),
}
