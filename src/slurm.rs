//! Render job scripts and submit them to SLURM

/// Render the job script from a template
pub mod render;

/// Run the submission command and parse the assigned job id
pub mod sbatch;
