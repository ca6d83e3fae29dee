//! Discovers Go packages and runs the checker over each of them.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use gostable_core::utils::check_allow_with_reason;
use gostable_core::{
    Config, ConfigError, LintResult, Location, PolicyError, PolicyTable, RuleId, Severity,
    Suggestion, Violation,
};
use gostable_go::GoUnit;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that can occur during analysis.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    /// IO error reading files.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error walking the source tree.
    #[error("Failed to walk source tree: {0}")]
    Walk(#[from] ignore::Error),

    /// Error parsing a Go source file.
    #[error("Parse error in {path}: {message}")]
    Parse {
        /// Path to the file that failed to parse.
        path: PathBuf,
        /// Parse error message.
        message: String,
    },

    /// Glob pattern error.
    #[error("Invalid glob pattern: {0}")]
    Glob(#[from] glob::PatternError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Invalid `[policy]` section.
    #[error("Invalid policy: {0}")]
    Policy(#[from] PolicyError),
}

/// Builder for configuring an [`Analyzer`].
#[derive(Debug, Default)]
pub struct AnalyzerBuilder {
    root: Option<PathBuf>,
    exclude_patterns: Vec<String>,
    config: Option<Config>,
    rules: Option<BTreeSet<RuleId>>,
    policy: Option<PolicyTable>,
    fail_on_parse_error: Option<bool>,
}

impl AnalyzerBuilder {
    /// Creates a new builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the root directory to analyze.
    #[must_use]
    pub fn root(mut self, path: impl Into<PathBuf>) -> Self {
        self.root = Some(path.into());
        self
    }

    /// Adds an exclude glob pattern.
    #[must_use]
    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.exclude_patterns.push(pattern.into());
        self
    }

    /// Adds multiple exclude glob patterns.
    #[must_use]
    pub fn excludes<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_patterns
            .extend(patterns.into_iter().map(Into::into));
        self
    }

    /// Sets the configuration.
    #[must_use]
    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Restricts the run to `rules`. All rules run when never called.
    #[must_use]
    pub fn rules<I: IntoIterator<Item = RuleId>>(mut self, rules: I) -> Self {
        self.rules.get_or_insert_with(BTreeSet::new).extend(rules);
        self
    }

    /// Uses `policy` instead of the one built from the configuration.
    #[must_use]
    pub fn policy(mut self, policy: PolicyTable) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Sets whether to fail on parse errors (default: from config, else false).
    #[must_use]
    pub fn fail_on_parse_error(mut self, fail: bool) -> Self {
        self.fail_on_parse_error = Some(fail);
        self
    }

    /// Builds the analyzer.
    ///
    /// # Errors
    ///
    /// Returns an error if the current directory cannot be read, an exclude
    /// pattern is invalid or the `[policy]` section is invalid.
    pub fn build(self) -> Result<Analyzer, AnalyzerError> {
        let config = self.config.unwrap_or_default();

        let root = self.root.unwrap_or_else(|| config.analyzer.root.clone());
        let root = if root.is_absolute() {
            root
        } else {
            std::env::current_dir()?.join(&root)
        };

        let excludes = self
            .exclude_patterns
            .iter()
            .chain(&config.analyzer.exclude)
            .map(|p| glob::Pattern::new(p))
            .collect::<Result<Vec<_>, _>>()?;

        for key in config.unknown_rules() {
            warn!("Unknown rule in configuration: {key}");
        }

        let policy = match self.policy {
            Some(policy) => policy,
            None => config.build_policy()?,
        };

        Ok(Analyzer {
            root,
            excludes,
            rules: self.rules,
            policy,
            fail_on_parse_error: self
                .fail_on_parse_error
                .unwrap_or(config.analyzer.fail_on_parse_error),
            config,
        })
    }
}

/// Runs the Stable API checker over a directory tree.
///
/// Use [`Analyzer::builder()`] to construct an instance.
#[derive(Debug)]
pub struct Analyzer {
    root: PathBuf,
    excludes: Vec<glob::Pattern>,
    rules: Option<BTreeSet<RuleId>>,
    policy: PolicyTable,
    config: Config,
    fail_on_parse_error: bool,
}

impl Analyzer {
    /// Creates a new builder for configuring an analyzer.
    #[must_use]
    pub fn builder() -> AnalyzerBuilder {
        AnalyzerBuilder::new()
    }

    /// Returns the root directory being analyzed.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The policy the analyzer checks against.
    #[must_use]
    pub fn policy(&self) -> &PolicyTable {
        &self.policy
    }

    /// Severity at or above which the run counts as failed.
    #[must_use]
    pub fn fail_threshold(&self) -> Severity {
        self.config.fail_threshold()
    }

    /// Returns true if `rule` is selected and not disabled.
    #[must_use]
    pub fn is_rule_active(&self, rule: RuleId) -> bool {
        self.rules.as_ref().map_or(true, |r| r.contains(&rule)) && self.config.is_rule_enabled(rule)
    }

    /// Analyzes every Go package under the root.
    ///
    /// # Errors
    ///
    /// Returns an error if discovery or reading fails, or if a file does not
    /// parse and `fail_on_parse_error` is set.
    pub fn analyze(&self) -> Result<LintResult, AnalyzerError> {
        info!("Starting analysis at {}", self.root.display());

        let files = self.discover_files()?;
        info!("Found {} Go files to analyze", files.len());

        let mut sources = Vec::with_capacity(files.len());
        for path in files {
            let content = std::fs::read_to_string(self.root.join(&path))?;
            sources.push((path, content));
        }
        self.analyze_sources(sources)
    }

    /// Analyzes in-memory sources, keyed by path relative to the root.
    ///
    /// Files are grouped into one unit per directory.
    ///
    /// # Errors
    ///
    /// Returns an error if a file does not parse and `fail_on_parse_error`
    /// is set.
    pub fn analyze_sources<I, P, S>(&self, sources: I) -> Result<LintResult, AnalyzerError>
    where
        I: IntoIterator<Item = (P, S)>,
        P: Into<PathBuf>,
        S: Into<String>,
    {
        let mut packages: BTreeMap<PathBuf, Vec<(PathBuf, String)>> = BTreeMap::new();
        for (path, source) in sources {
            let path = path.into();
            let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
            packages.entry(dir).or_default().push((path, source.into()));
        }

        let mut result = LintResult::new();
        for (dir, mut files) in packages {
            files.sort_by(|a, b| a.0.cmp(&b.0));
            result.extend(self.analyze_package(&dir, &files)?);
        }
        result.sort();

        info!(
            "Analysis complete: {} violations in {} files",
            result.violations.len(),
            result.files_checked
        );
        Ok(result)
    }

    fn analyze_package(
        &self,
        dir: &Path,
        files: &[(PathBuf, String)],
    ) -> Result<LintResult, AnalyzerError> {
        let mut unit = GoUnit::new();
        let mut result = LintResult::new();

        for (path, source) in files {
            match unit.add_source(path, source) {
                Ok(_) => result.files_checked += 1,
                Err(e) => {
                    warn!("Failed to parse {}: {e}", path.display());
                    if self.fail_on_parse_error {
                        return Err(AnalyzerError::Parse {
                            path: path.clone(),
                            message: e.to_string(),
                        });
                    }
                }
            }
        }
        if unit.is_empty() {
            return Ok(result);
        }

        let violations = unit.check(&self.policy);
        debug!(
            "Checked package {}: {} raw violations",
            dir.display(),
            violations.len()
        );

        for violation in violations {
            let content = files
                .iter()
                .find(|(path, _)| *path == violation.location.file)
                .map_or("", |(_, source)| source.as_str());
            result.violations.extend(self.settle(violation, content));
        }
        Ok(result)
    }

    /// Applies rule selection, allow directives and severity overrides.
    fn settle(&self, violation: Violation, content: &str) -> Option<Violation> {
        let rule = violation.rule;
        if !self.is_rule_active(rule) {
            return None;
        }
        let severity = self
            .config
            .rule_severity(rule)
            .unwrap_or(violation.severity);

        let allow = check_allow_with_reason(content, violation.location.line, rule);
        if allow.is_allowed() {
            debug!(
                "{} suppressed at {}:{}",
                rule.name(),
                violation.location.file.display(),
                violation.location.line
            );
            if severity == Severity::Error && allow.reason().is_none() {
                let location = Location::new(
                    violation.location.file.clone(),
                    violation.location.line,
                    violation.location.column,
                );
                return Some(
                    Violation::new(
                        rule,
                        location,
                        format!("Allow directive for '{}' is missing required reason", rule.name()),
                    )
                    .with_severity(Severity::Warning)
                    .with_suggestion(Suggestion::new(
                        "Add reason=\"...\" to explain why this exception is necessary",
                    )),
                );
            }
            return None;
        }

        Some(violation.with_severity(severity))
    }

    /// Discovers Go files, relative to the root, in sorted order.
    fn discover_files(&self) -> Result<Vec<PathBuf>, AnalyzerError> {
        let mut builder = ignore::WalkBuilder::new(&self.root);
        builder
            .hidden(false)
            .git_ignore(self.config.analyzer.respect_gitignore)
            .git_exclude(self.config.analyzer.respect_gitignore)
            .require_git(false);

        let mut files = Vec::new();
        for entry in builder.build() {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() || path.extension().map_or(true, |e| e != "go") {
                continue;
            }
            let relative = path.strip_prefix(&self.root).unwrap_or(path);
            if self.should_exclude(relative) {
                debug!("Excluding: {}", relative.display());
                continue;
            }
            files.push(relative.to_path_buf());
        }

        files.sort();
        Ok(files)
    }

    /// Checks a root-relative path against the exclude patterns.
    fn should_exclude(&self, path: &Path) -> bool {
        let absolute = self.root.join(path);
        self.excludes
            .iter()
            .any(|p| p.matches_path(path) || p.matches_path(&absolute))
    }
}
