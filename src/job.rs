//! The job model and the recursive submission protocol.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use log::info;

use crate::error::SubmitError;
use crate::job::dependency::{
    render_expression, AfterKind, DepCombinator, Dependency, DependencyTarget,
};
use crate::job::options::{OptionValue, SbatchOptions};
use crate::slurm::render;
use crate::slurm::sbatch::{Sbatch, Scheduler};

/// Attach sbatch options to a job
pub mod options;

/// Model dependency clauses and render `--dependency` expressions
pub mod dependency;

/// Identifier assigned by the SLURM controller when a job is accepted.
pub type JobId = u64;

const DEFAULT_SHEBANG: &str = "/bin/bash -l";

/// Submission state of a job. `Submitting` marks a job whose prerequisites
/// are currently being submitted, which is how dependency cycles are caught
/// instead of recursing forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SubmitState {
    Unsubmitted,
    Submitting,
    Submitted(JobId),
}

struct JobInner {
    name: String,
    shebang: String,
    options: SbatchOptions,
    commands: Vec<String>,
    deps: Vec<Dependency>,
    combinator: DepCombinator,
    state: SubmitState,
}

/// A batch job under construction.
///
/// `Job` is a shared handle: clones refer to the same underlying job, which
/// is what lets several dependents point at one prerequisite without owning
/// it. Mutators take `&self` and return `&Self` so calls chain.
///
/// A job transitions to submitted at most once. Calling [`Job::submit`] on an
/// already submitted job returns the stored id without touching the backend,
/// so diamond-shaped dependency graphs submit each shared prerequisite
/// exactly once.
///
/// Jobs are single-threaded by design; mutating one while a submission that
/// can reach it is in flight is a misuse.
#[derive(Clone)]
pub struct Job {
    inner: Rc<RefCell<JobInner>>,
}

impl Job {
    /// Create an empty job. The name is for display and logging only, it is
    /// never used as an identifier.
    pub fn new(name: impl Into<String>) -> Job {
        Job {
            inner: Rc::new(RefCell::new(JobInner {
                name: name.into(),
                shebang: DEFAULT_SHEBANG.to_string(),
                options: SbatchOptions::default(),
                commands: Vec::new(),
                deps: Vec::new(),
                combinator: DepCombinator::All,
                state: SubmitState::Unsubmitted,
            })),
        }
    }

    pub fn name(&self) -> String {
        self.inner.borrow().name.clone()
    }

    /// Interpreter line of the generated script, without the leading `#!`.
    pub fn set_shebang(&self, shebang: impl Into<String>) -> &Self {
        self.inner.borrow_mut().shebang = shebang.into();
        self
    }

    /// Add one sbatch option. Names are accepted with or without leading
    /// dashes and with `_` or `-` as the word separator; an existing entry
    /// under the same normalised name is overwritten.
    pub fn add_option(&self, name: &str, value: impl Into<OptionValue>) -> &Self {
        self.inner.borrow_mut().options.set(name, value.into());
        self
    }

    /// Add a valueless option such as `--exclusive`.
    pub fn add_flag(&self, name: &str) -> &Self {
        self.add_option(name, OptionValue::Flag)
    }

    pub fn add_options<I, K, V>(&self, pairs: I) -> &Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<OptionValue>,
    {
        let mut inner = self.inner.borrow_mut();
        for (name, value) in pairs {
            inner.options.set(name.as_ref(), value.into());
        }
        self
    }

    /// Remove options by name, with or without leading dashes. Names not
    /// present are silently ignored.
    pub fn remove_options<I, S>(&self, names: I) -> &Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut inner = self.inner.borrow_mut();
        for name in names {
            inner.options.unset(name.as_ref());
        }
        self
    }

    /// Append shell commands, one script line each, preserving order.
    pub fn add_commands<I, S>(&self, commands: I) -> &Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inner
            .borrow_mut()
            .commands
            .extend(commands.into_iter().map(Into::into));
        self
    }

    pub fn commands(&self) -> Vec<String> {
        self.inner.borrow().commands.clone()
    }

    /// Declare that this job must wait on `target`. The target is either a
    /// known job id or another [`Job`], submitted or not; an unsubmitted job
    /// is submitted automatically when this job is.
    ///
    /// Clauses are not deduplicated, and `target` is ignored for
    /// [`AfterKind::Singleton`].
    pub fn add_dependency(&self, after: AfterKind, target: impl Into<DependencyTarget>) -> &Self {
        let target = match after {
            AfterKind::Singleton => None,
            _ => Some(target.into()),
        };
        self.inner.borrow_mut().deps.push(Dependency {
            kind: after,
            target,
            minutes: None,
        });
        self
    }

    /// Declare an `after:<id>+<minutes>` dependency: start `minutes` minutes
    /// after `target` has started or been cancelled.
    pub fn add_timed_dependency(&self, target: impl Into<DependencyTarget>, minutes: u32) -> &Self {
        self.inner.borrow_mut().deps.push(Dependency {
            kind: AfterKind::After,
            target: Some(target.into()),
            minutes: Some(minutes),
        });
        self
    }

    /// Declare a singleton dependency: wait until no other job with this
    /// job's name and user is running.
    pub fn add_singleton_dependency(&self) -> &Self {
        self.inner.borrow_mut().deps.push(Dependency {
            kind: AfterKind::Singleton,
            target: None,
            minutes: None,
        });
        self
    }

    pub fn set_dependency_combinator(&self, combinator: DepCombinator) -> &Self {
        self.inner.borrow_mut().combinator = combinator;
        self
    }

    /// The id assigned by the controller, or `None` while unsubmitted.
    pub fn job_id(&self) -> Option<JobId> {
        match self.inner.borrow().state {
            SubmitState::Submitted(id) => Some(id),
            _ => None,
        }
    }

    /// The equivalent shell script for this job: shebang, `#SBATCH`
    /// directives (including the dependency directive, if any clauses exist)
    /// and the commands in execution order.
    ///
    /// The live option and command state is read at call time, never a
    /// snapshot. Fails with [`SubmitError::UnresolvedDependency`] if a clause
    /// targets a job that has no id yet.
    pub fn script_body(&self) -> Result<String, SubmitError> {
        let inner = self.inner.borrow();
        let mut directives = inner.options.directives();
        if !inner.deps.is_empty() {
            let expr = render_expression(&inner.deps, inner.combinator)?;
            directives.push(format!("--dependency={expr}"));
        }
        render::script(&inner.shebang, &directives, &inner.commands)
    }

    /// Submit this job with the `sbatch` command line tool.
    ///
    /// See [`Job::submit_with`] for the submission protocol.
    pub fn submit(&self) -> Result<JobId, SubmitError> {
        self.submit_with(&Sbatch::default())
    }

    /// Submit this job through `scheduler`, submitting unsubmitted
    /// prerequisites first.
    ///
    /// The protocol, in order:
    ///
    /// 1. An already submitted job returns its stored id immediately, with no
    ///    backend call.
    /// 2. Every dependency clause holding a job handle is submitted
    ///    recursively, depth-first. Step 1 makes this a DAG traversal that
    ///    submits each job at most once; a cycle fails with
    ///    [`SubmitError::DependencyCycle`].
    /// 3. The script is rendered with every dependency resolved to a real id
    ///    and handed to the scheduler.
    ///
    /// On any failure this job stays unsubmitted and the error propagates to
    /// the outermost caller. Prerequisites that already succeeded keep their
    /// ids and are skipped by a later retry; there is no rollback of
    /// submitted jobs.
    pub fn submit_with(&self, scheduler: &dyn Scheduler) -> Result<JobId, SubmitError> {
        {
            let mut inner = self.inner.borrow_mut();
            match inner.state {
                SubmitState::Submitted(id) => return Ok(id),
                SubmitState::Submitting => {
                    return Err(SubmitError::DependencyCycle {
                        name: inner.name.clone(),
                    })
                }
                SubmitState::Unsubmitted => inner.state = SubmitState::Submitting,
            }
        }

        let outcome = self.submit_prerequisites(scheduler).and_then(|_| {
            let script = self.script_body()?;
            scheduler.submit(&script)
        });

        let mut inner = self.inner.borrow_mut();
        match outcome {
            Ok(id) => {
                if inner.name.is_empty() {
                    info!("submitted batch job {id}");
                } else {
                    info!("{}: submitted batch job {id}", inner.name);
                }
                inner.state = SubmitState::Submitted(id);
                Ok(id)
            }
            Err(err) => {
                inner.state = SubmitState::Unsubmitted;
                Err(err)
            }
        }
    }

    fn submit_prerequisites(&self, scheduler: &dyn Scheduler) -> Result<(), SubmitError> {
        // clone the handles out so no borrow is held across the recursion
        let prerequisites: Vec<Job> = self
            .inner
            .borrow()
            .deps
            .iter()
            .filter_map(Dependency::pending_job)
            .collect();
        for job in prerequisites {
            job.submit_with(scheduler)?;
        }
        Ok(())
    }
}

impl Default for Job {
    /// An unnamed job with the default shebang and nothing else.
    fn default() -> Job {
        Job::new("")
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Job")
            .field("name", &inner.name)
            .field("state", &inner.state)
            .finish_non_exhaustive()
    }
}
