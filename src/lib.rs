//! Build SLURM batch jobs programmatically and submit them with `sbatch`.
//!
//! A [`Job`] collects sbatch options, shell commands and dependencies on other
//! jobs. Dependencies may point at `Job` values that have not been submitted
//! yet: submitting a job first submits its prerequisites (depth-first, each
//! one exactly once) and wires their freshly assigned ids into the
//! `--dependency` directive.
//!
//! ```
//! use slurmrs::{AfterKind, Job};
//!
//! let prep = Job::new("prep");
//! prep.add_option("ntasks", 1).add_commands(["./prepare.sh"]);
//!
//! let analyse = Job::new("analyse");
//! analyse
//!     .add_option("ntasks", 8)
//!     .add_commands(["./analyse.sh"])
//!     .add_dependency(AfterKind::AfterOk, &prep);
//!
//! // analyse.submit() would submit prep first, then analyse with
//! // `#SBATCH --dependency=afterok:<prep's job id>`.
//! ```

pub mod error;
pub mod job;
pub mod slurm;

pub use error::SubmitError;
pub use job::dependency::{AfterKind, DepCombinator, DependencyTarget};
pub use job::options::OptionValue;
pub use job::{Job, JobId};
pub use slurm::sbatch::{Sbatch, Scheduler};
