use std::fmt;

use crate::error::SubmitError;
use crate::job::{Job, JobId};

/// Dependency condition kinds understood by `sbatch --dependency`.
///
/// Unlike option names, these are a closed vocabulary: the kind drives the
/// directive syntax, so it is an enum rather than a pass-through string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AfterKind {
    /// Begin after the target has started (or after a delay, see
    /// [`Job::add_timed_dependency`]).
    After,
    /// Begin after the target has terminated, successfully or not.
    AfterAny,
    /// Begin after the target's burst buffer stage-out has completed.
    AfterBurstBuffer,
    /// Array jobs: each task begins after the corresponding task of the
    /// target has completed successfully.
    AfterCorr,
    /// Begin only if the target failed.
    AfterNotOk,
    /// Begin only if the target completed successfully.
    AfterOk,
    /// Begin once no other job with the same name and user is running.
    Singleton,
}

impl AfterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AfterKind::After => "after",
            AfterKind::AfterAny => "afterany",
            AfterKind::AfterBurstBuffer => "afterburstbuffer",
            AfterKind::AfterCorr => "aftercorr",
            AfterKind::AfterNotOk => "afternotok",
            AfterKind::AfterOk => "afterok",
            AfterKind::Singleton => "singleton",
        }
    }
}

impl fmt::Display for AfterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How multiple dependency terms combine: all must be satisfied (`,`) or any
/// single one is enough (`?`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DepCombinator {
    #[default]
    All,
    Any,
}

impl DepCombinator {
    pub fn as_str(&self) -> &'static str {
        match self {
            DepCombinator::All => ",",
            DepCombinator::Any => "?",
        }
    }
}

/// The job a dependency clause waits on: either an id that is already known
/// (e.g. a job tracked outside this process) or a handle to a [`Job`] that
/// only receives an id once it has been submitted.
#[derive(Debug, Clone)]
pub enum DependencyTarget {
    Id(JobId),
    Job(Job),
}

impl From<JobId> for DependencyTarget {
    fn from(id: JobId) -> DependencyTarget {
        DependencyTarget::Id(id)
    }
}

impl From<&Job> for DependencyTarget {
    fn from(job: &Job) -> DependencyTarget {
        DependencyTarget::Job(job.clone())
    }
}

impl From<Job> for DependencyTarget {
    fn from(job: Job) -> DependencyTarget {
        DependencyTarget::Job(job)
    }
}

/// One dependency clause: a condition kind plus its target.
///
/// Clauses are never deduplicated; adding the same clause twice renders the
/// target twice, which sbatch tolerates.
#[derive(Debug, Clone)]
pub struct Dependency {
    pub(crate) kind: AfterKind,
    /// `None` only for singleton clauses, which take no target.
    pub(crate) target: Option<DependencyTarget>,
    /// Minutes after the target starts, rendered as `after:<id>+<minutes>`.
    pub(crate) minutes: Option<u32>,
}

impl Dependency {
    /// The referenced job handle, if this clause targets one.
    pub(crate) fn pending_job(&self) -> Option<Job> {
        match &self.target {
            Some(DependencyTarget::Job(job)) => Some(job.clone()),
            _ => None,
        }
    }

    /// Resolve the target to a concrete id. A job handle resolves only after
    /// that job has been submitted.
    fn resolved_id(&self) -> Result<Option<JobId>, SubmitError> {
        match &self.target {
            None => Ok(None),
            Some(DependencyTarget::Id(id)) => Ok(Some(*id)),
            Some(DependencyTarget::Job(job)) => job
                .job_id()
                .ok_or_else(|| SubmitError::UnresolvedDependency { name: job.name() })
                .map(Some),
        }
    }
}

/// Render clauses as one `--dependency` list. Clauses sharing a condition
/// kind collapse into a single term (`afterok:11:22`); terms are joined by
/// the combinator. Kinds appear in the order they were first added.
pub(crate) fn render_expression(
    deps: &[Dependency],
    combinator: DepCombinator,
) -> Result<String, SubmitError> {
    let mut groups: Vec<(AfterKind, Vec<String>)> = Vec::new();
    for dep in deps {
        let rendered = match dep.resolved_id()? {
            Some(id) => match dep.minutes {
                Some(minutes) => Some(format!("{id}+{minutes}")),
                None => Some(id.to_string()),
            },
            None => None,
        };
        match groups.iter_mut().find(|(kind, _)| *kind == dep.kind) {
            Some((_, ids)) => ids.extend(rendered),
            None => groups.push((dep.kind, rendered.into_iter().collect())),
        }
    }

    let terms: Vec<String> = groups
        .iter()
        .map(|(kind, ids)| {
            if ids.is_empty() {
                kind.to_string()
            } else {
                format!("{kind}:{}", ids.join(":"))
            }
        })
        .collect();
    Ok(terms.join(combinator.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clause(kind: AfterKind, id: JobId) -> Dependency {
        Dependency {
            kind,
            target: Some(DependencyTarget::Id(id)),
            minutes: None,
        }
    }

    #[test]
    fn same_kind_clauses_group_into_one_term() {
        let deps = [clause(AfterKind::AfterOk, 11), clause(AfterKind::AfterOk, 22)];
        let expr = render_expression(&deps, DepCombinator::All).unwrap();
        assert_eq!(expr, "afterok:11:22");
    }

    #[test]
    fn distinct_kinds_are_separate_terms() {
        let deps = [
            clause(AfterKind::AfterOk, 11),
            clause(AfterKind::AfterNotOk, 22),
            clause(AfterKind::AfterOk, 33),
        ];
        let expr = render_expression(&deps, DepCombinator::All).unwrap();
        assert_eq!(expr, "afterok:11:33,afternotok:22");
    }

    #[test]
    fn any_combinator_joins_terms_with_a_question_mark() {
        let deps = [
            clause(AfterKind::AfterOk, 11),
            clause(AfterKind::AfterAny, 22),
        ];
        let expr = render_expression(&deps, DepCombinator::Any).unwrap();
        assert_eq!(expr, "afterok:11?afterany:22");
    }

    #[test]
    fn timed_after_renders_a_plus_suffix() {
        let deps = [Dependency {
            kind: AfterKind::After,
            target: Some(DependencyTarget::Id(100)),
            minutes: Some(30),
        }];
        let expr = render_expression(&deps, DepCombinator::All).unwrap();
        assert_eq!(expr, "after:100+30");
    }

    #[test]
    fn singleton_renders_without_a_target() {
        let deps = [Dependency {
            kind: AfterKind::Singleton,
            target: None,
            minutes: None,
        }];
        let expr = render_expression(&deps, DepCombinator::All).unwrap();
        assert_eq!(expr, "singleton");
    }

    #[test]
    fn duplicate_clauses_are_kept() {
        let deps = [clause(AfterKind::AfterOk, 11), clause(AfterKind::AfterOk, 11)];
        let expr = render_expression(&deps, DepCombinator::All).unwrap();
        assert_eq!(expr, "afterok:11:11");
    }
}
