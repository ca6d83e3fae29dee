//! The rules the checker reports under.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::types::Severity;

/// Identifies which policy rule produced a violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleId {
    /// Call to a driver method excluded from the Stable API.
    BannedFunction,
    /// Options struct literal setting an excluded field.
    BannedField,
    /// Excluded aggregation stage named in a string literal or document.
    BannedStage,
    /// Excluded operator used inside a pipeline stage.
    BannedOperator,
    /// Database command that is not part of the Stable API.
    UnsupportedCommand,
    /// Arbitrary command execution that needs a human to check it.
    CommandReview,
    /// Package constant excluded from the Stable API.
    BannedConstant,
}

impl RuleId {
    /// All rules, in code order.
    pub const ALL: [RuleId; 7] = [
        Self::BannedFunction,
        Self::BannedField,
        Self::BannedStage,
        Self::BannedOperator,
        Self::UnsupportedCommand,
        Self::CommandReview,
        Self::BannedConstant,
    ];

    /// Rule code (e.g., "GS001").
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::BannedFunction => "GS001",
            Self::BannedField => "GS002",
            Self::BannedStage => "GS003",
            Self::BannedOperator => "GS004",
            Self::UnsupportedCommand => "GS005",
            Self::CommandReview => "GS006",
            Self::BannedConstant => "GS007",
        }
    }

    /// Kebab-case rule name (e.g., "banned-function").
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::BannedFunction => "banned-function",
            Self::BannedField => "banned-field",
            Self::BannedStage => "banned-stage",
            Self::BannedOperator => "banned-operator",
            Self::UnsupportedCommand => "unsupported-command",
            Self::CommandReview => "command-review",
            Self::BannedConstant => "banned-constant",
        }
    }

    /// One-line description for `list-rules`.
    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::BannedFunction => "Driver methods excluded from the Stable API",
            Self::BannedField => "Options struct fields excluded from the Stable API",
            Self::BannedStage => "Aggregation stages excluded from the Stable API",
            Self::BannedOperator => "Operators excluded inside specific pipeline stages",
            Self::UnsupportedCommand => "RunCommand documents naming non-Stable API commands",
            Self::CommandReview => "Arbitrary command execution that needs manual review",
            Self::BannedConstant => "Package constants excluded from the Stable API",
        }
    }

    /// Severity used when configuration does not override it.
    #[must_use]
    pub fn default_severity(self) -> Severity {
        match self {
            Self::CommandReview => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error for an unknown rule name or code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown rule `{0}`")]
pub struct UnknownRule(pub String);

impl FromStr for RuleId {
    type Err = UnknownRule;

    /// Accepts either the rule name or its code, case-insensitively for codes.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|r| r.name() == s || r.code().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownRule(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_unique_and_ordered() {
        let codes: Vec<&str> = RuleId::ALL.iter().map(|r| r.code()).collect();
        let mut sorted = codes.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(codes, sorted);
    }

    #[test]
    fn parses_name_and_code() {
        assert_eq!("banned-stage".parse::<RuleId>(), Ok(RuleId::BannedStage));
        assert_eq!("gs005".parse::<RuleId>(), Ok(RuleId::UnsupportedCommand));
        assert_eq!(
            "no-such-rule".parse::<RuleId>(),
            Err(UnknownRule("no-such-rule".to_string()))
        );
    }

    #[test]
    fn only_command_review_is_a_warning() {
        for rule in RuleId::ALL {
            let expected = if rule == RuleId::CommandReview {
                Severity::Warning
            } else {
                Severity::Error
            };
            assert_eq!(rule.default_severity(), expected, "{rule}");
        }
    }
}
