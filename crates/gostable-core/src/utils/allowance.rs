//! Comment-based allowance directives in Go source.
//!
//! Supports directives like:
//! ```text
//! // gostable: allow(banned-function) reason="legacy analytics job, not on the Stable API client"
//! ```
//!
//! A directive applies to its own line and to the line below it. Rules are
//! named by rule name, by code (`GS001`) or with `all`.

use std::collections::HashSet;

use crate::rule::RuleId;

/// Result of checking for an allow directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowCheck {
    /// Rule is not allowed.
    Denied,
    /// Rule is allowed with optional reason.
    Allowed {
        /// The reason provided (if any).
        reason: Option<String>,
    },
}

impl AllowCheck {
    /// Returns true if allowed.
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }

    /// Returns the reason if allowed.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Allowed { reason } => reason.as_deref(),
            Self::Denied => None,
        }
    }
}

/// Parsed allowance directive.
#[derive(Debug, Clone)]
struct AllowDirective {
    rules: HashSet<String>,
    reason: Option<String>,
}

impl AllowDirective {
    fn covers(&self, rule: RuleId) -> bool {
        self.rules.iter().any(|r| {
            r == "all" || r == rule.name() || r.eq_ignore_ascii_case(rule.code())
        })
    }
}

/// Checks Go source for an allowance comment covering `rule` at `line`.
///
/// `line` is 1-indexed. The line itself (trailing comment) and the line
/// before it are checked.
#[must_use]
pub fn check_allow_with_reason(content: &str, line: usize, rule: RuleId) -> AllowCheck {
    let lines: Vec<&str> = content.lines().collect();

    for check_line in [line.saturating_sub(1), line] {
        if check_line == 0 || check_line > lines.len() {
            continue;
        }

        if let Some(directive) = parse_allow_directive(lines[check_line - 1]) {
            if directive.covers(rule) {
                return AllowCheck::Allowed {
                    reason: directive.reason,
                };
            }
        }
    }

    AllowCheck::Denied
}

/// Parses an allowance directive from a `//` comment on a line, if any.
fn parse_allow_directive(line: &str) -> Option<AllowDirective> {
    // `//` also shows up inside string literals such as connection URIs.
    line.match_indices("//")
        .find_map(|(start, _)| parse_comment(&line[start + 2..]))
}

fn parse_comment(comment: &str) -> Option<AllowDirective> {
    let directive = comment.trim().strip_prefix("gostable:")?.trim();
    let allow_content = directive.strip_prefix("allow(")?.trim();

    let paren_end = allow_content.find(')')?;
    let rules: HashSet<String> = allow_content[..paren_end]
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    if rules.is_empty() {
        return None;
    }

    let rest = allow_content[paren_end + 1..].trim();
    let reason = rest
        .strip_prefix("reason=")
        .map(str::trim)
        .and_then(|r| r.strip_prefix('"'))
        .and_then(|r| r.find('"').map(|end| r[..end].to_string()))
        .filter(|r| !r.trim().is_empty());

    Some(AllowDirective { rules, reason })
}
