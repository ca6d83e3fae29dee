//! Policy command: prints the effective policy as TOML.

use anyhow::{Context, Result};
use gostable_core::{PolicyDto, PolicyTable};
use serde::Serialize;

use crate::config_resolver::ConfigSource;

#[derive(Serialize)]
struct PolicyFile<'a> {
    policy: &'a PolicyDto,
}

/// Runs the policy command.
pub fn run(source: &ConfigSource) -> Result<()> {
    let config = source.load()?;
    let policy = config.build_policy().context("Invalid [policy] section")?;
    print!("{}", render(&policy)?);
    Ok(())
}

/// Renders `policy` as a `[policy]` table that replaces the built-in one.
fn render(policy: &PolicyTable) -> Result<String> {
    let dto = policy.to_dto();
    toml::to_string_pretty(&PolicyFile { policy: &dto }).context("Failed to render policy")
}

#[cfg(test)]
mod tests {
    use super::*;
    use gostable_core::Config;

    #[test]
    fn rendered_policy_loads_back_unchanged() {
        let builtin = PolicyTable::stable_api_v1();
        let text = render(&builtin).unwrap();
        assert!(text.contains("[policy]"));
        assert!(text.contains("replace = true"));

        let config = Config::parse(&text).unwrap();
        assert_eq!(config.build_policy().unwrap(), builtin);
    }
}
