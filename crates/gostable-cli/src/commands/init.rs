//! Init command implementation.

use anyhow::{bail, Result};
use std::path::Path;

use crate::config_resolver;

const DEFAULT_CONFIG: &str = r#"# gostable configuration
# Checks Go code against the MongoDB Stable API (version 1)

# Fail the run on violations at or above this severity
fail_on = "error"

[analyzer]
# Root directory to analyze (default: current directory)
# root = "./services"

# Glob patterns to exclude from analysis
exclude = [
    "**/vendor/**",
    "**/testdata/**",
]

# Respect .gitignore files
respect_gitignore = true

# Abort instead of skipping Go files that do not parse
fail_on_parse_error = false

# Rule configurations, keyed by name or code
# Each rule can be enabled/disabled and have its severity overridden

[rules.command-review]
enabled = true
# severity = "error"

# [rules.banned-constant]
# enabled = false

# Additions to the built-in policy
# [policy]
# stages = ["$collStats"]
# commands = ["serverStatus"]
#
# [policy.operators]
# "$project" = ["$function"]
#
# [[policy.functions]]
# package = "mongo"
# type = "Collection"
# members = ["EstimatedDocumentCount"]
"#;

/// Runs the init command in `dir`.
pub fn run(dir: &Path, force: bool) -> Result<()> {
    let config_path = write_config(dir, force)?;

    println!("Created {}", config_path.display());
    println!("\nNext steps:");
    println!("  1. Edit gostable.toml to configure rules");
    println!("  2. Run: gostable check");

    Ok(())
}

/// Writes the starter config where `check` will look for it first.
///
/// Any existing project config, including a `.gostable.toml` that the new
/// file would shadow, is only replaced with `force`.
fn write_config(dir: &Path, force: bool) -> Result<std::path::PathBuf> {
    let existing = config_resolver::existing_project_files(dir);
    if let Some(found) = existing.first().filter(|_| !force) {
        bail!(
            "Configuration file already exists at {}. Use --force to overwrite.",
            found.display()
        );
    }

    let target = config_resolver::init_target(dir);
    std::fs::write(&target, DEFAULT_CONFIG)?;
    Ok(target)
}
