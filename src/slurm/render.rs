use serde::Serialize;
use tinytemplate::{format_unescaped, TinyTemplate};

use crate::error::SubmitError;

/// included job script template
static TEMPLATE: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/data/templates/job.txt"));

/// Rendering context for the job script
#[derive(Serialize)]
struct ScriptContext {
    shebang: String,
    has_directives: bool,
    directives: String,
    has_commands: bool,
    commands: String,
}

/// Render the full script body: the shebang line, one `#SBATCH` line per
/// directive, then the commands in execution order. Empty sections are
/// omitted entirely.
pub fn script(
    shebang: &str,
    directives: &[String],
    commands: &[String],
) -> Result<String, SubmitError> {
    let mut tt = TinyTemplate::new();
    // shell text, not html
    tt.set_default_formatter(&format_unescaped);
    tt.add_template("job", TEMPLATE)?;

    let directives: Vec<String> = directives.iter().map(|d| format!("#SBATCH {d}")).collect();
    let context = ScriptContext {
        shebang: shebang.to_string(),
        has_directives: !directives.is_empty(),
        directives: directives.join("\n"),
        has_commands: !commands.is_empty(),
        commands: commands.join("\n"),
    };

    Ok(tt.render("job", &context)?)
}
