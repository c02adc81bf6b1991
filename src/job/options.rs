use std::collections::BTreeMap;
use std::fmt;

/// Value of a single sbatch option.
///
/// Option names are not validated against the installed SLURM version: any
/// name is passed through to sbatch, so new scheduler options work without a
/// library change. Invalid names surface when sbatch rejects the script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    /// An option with no value, e.g. `--exclusive`.
    Flag,
    Int(i64),
    Text(String),
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Flag => Ok(()),
            OptionValue::Int(n) => write!(f, "{n}"),
            OptionValue::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<()> for OptionValue {
    fn from(_: ()) -> OptionValue {
        OptionValue::Flag
    }
}

impl From<i64> for OptionValue {
    fn from(n: i64) -> OptionValue {
        OptionValue::Int(n)
    }
}

impl From<i32> for OptionValue {
    fn from(n: i32) -> OptionValue {
        OptionValue::Int(n.into())
    }
}

impl From<u32> for OptionValue {
    fn from(n: u32) -> OptionValue {
        OptionValue::Int(n.into())
    }
}

impl From<&str> for OptionValue {
    fn from(s: &str) -> OptionValue {
        OptionValue::Text(s.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(s: String) -> OptionValue {
        OptionValue::Text(s)
    }
}

/// The set of sbatch options attached to a job, keyed by normalised name.
#[derive(Debug, Clone, Default)]
pub struct SbatchOptions {
    args: BTreeMap<String, OptionValue>,
}

impl SbatchOptions {
    /// Store an option, overwriting any previous value under the same
    /// normalised name.
    pub fn set(&mut self, name: &str, value: OptionValue) {
        self.args.insert(normalise(name), value);
    }

    /// Remove an option if present. Unknown names are ignored, so removal is
    /// idempotent cleanup rather than an error.
    pub fn unset(&mut self, name: &str) {
        self.args.remove(&normalise(name));
    }

    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.args.get(&normalise(name))
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Format every option as it appears after `#SBATCH`, e.g. `--ntasks=2`,
    /// `-N 2` or `--exclusive`.
    pub fn directives(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|(name, value)| format_arg(name, value))
            .collect()
    }
}

/// Strip leading dashes and use `-` as the canonical word separator, so
/// `--cpus_per_task`, `cpus-per-task` and `cpus_per_task` all address the
/// same entry.
fn normalise(name: &str) -> String {
    name.trim_start_matches('-').replace('_', "-")
}

fn format_arg(name: &str, value: &OptionValue) -> String {
    let flag = if name.len() == 1 {
        format!("-{name}")
    } else {
        format!("--{name}")
    };
    match value {
        OptionValue::Flag => flag,
        OptionValue::Text(s) if s.is_empty() => flag,
        value if name.len() == 1 => format!("{flag} {value}"),
        value => format!("{flag}={value}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalises_dashes_and_underscores_to_one_key() {
        let mut opts = SbatchOptions::default();
        opts.set("--cpus_per_task", 10.into());
        assert_eq!(opts.get("cpus-per-task"), Some(&OptionValue::Int(10)));

        opts.unset("cpus_per_task");
        assert!(opts.is_empty());
    }

    #[test]
    fn setting_an_existing_key_overwrites() {
        let mut opts = SbatchOptions::default();
        opts.set("ntasks", 1.into());
        opts.set("--ntasks", 2.into());
        assert_eq!(opts.directives(), vec!["--ntasks=2"]);
    }

    #[test]
    fn unset_ignores_unknown_names() {
        let mut opts = SbatchOptions::default();
        opts.set("ntasks", 2.into());
        opts.unset("mem");
        assert_eq!(opts.directives(), vec!["--ntasks=2"]);
    }

    #[test]
    fn short_options_are_space_separated() {
        let mut opts = SbatchOptions::default();
        opts.set("N", 2.into());
        assert_eq!(opts.directives(), vec!["-N 2"]);
    }

    #[test]
    fn valueless_options_render_as_bare_flags() {
        let mut opts = SbatchOptions::default();
        opts.set("exclusive", OptionValue::Flag);
        opts.set("requeue", "".into());
        assert_eq!(opts.directives(), vec!["--exclusive", "--requeue"]);
    }
}
