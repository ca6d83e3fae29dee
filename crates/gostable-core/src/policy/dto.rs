//! TOML form of the policy (the `[policy]` table of `gostable.toml`).
//!
//! ```toml
//! [policy]
//! stages = ["$collStats"]
//!
//! [[policy.functions]]
//! package = "mongo"
//! type = "Collection"
//! members = ["EstimatedDocumentCount"]
//! ```
//!
//! Entries extend the built-in Stable API v1 tables unless `replace = true`.
//! The package names `mongo` and `options` are shorthand for the driver's
//! import paths.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{MemberSets, PolicyTable, MONGO_PACKAGE, OPTIONS_PACKAGE};
use crate::resolve::NamedType;

/// Serialized policy extension.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyDto {
    /// Start from an empty policy instead of the built-in tables.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub replace: bool,
    /// Banned aggregation stage names.
    pub stages: Vec<String>,
    /// Stable command names.
    pub commands: Vec<String>,
    /// Stage name to operators banned inside it.
    pub operators: BTreeMap<String, Vec<String>>,
    /// Banned methods.
    pub functions: Vec<MemberSetDto>,
    /// Banned struct fields.
    pub fields: Vec<MemberSetDto>,
    /// Banned package constants, grouped by their type.
    pub constants: Vec<MemberSetDto>,
    /// Methods that run arbitrary commands.
    pub command_entry_points: Vec<MemberSetDto>,
    /// Methods that take an aggregation pipeline.
    pub pipeline_entry_points: Vec<MemberSetDto>,
}

/// Members of one type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberSetDto {
    /// Import path, or `mongo` / `options`.
    pub package: String,
    /// Type name.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Member names.
    pub members: Vec<String>,
}

/// Invalid policy entries.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyError {
    /// A package or type name is empty.
    #[error("{context}: package and type must not be empty")]
    EmptyName {
        /// Where the error occurred (e.g., "functions[0]").
        context: String,
    },

    /// A member list is empty or contains an empty name.
    #[error("{context}: members must be a non-empty list of names")]
    EmptyMembers {
        /// Where the error occurred.
        context: String,
    },

    /// A stage or operator name does not start with `$`.
    #[error("{context}: `{value}` is not a `$`-prefixed stage or operator")]
    NotAnOperator {
        /// Where the error occurred.
        context: String,
        /// The invalid value.
        value: String,
    },
}

fn expand_package(package: &str) -> String {
    match package {
        "mongo" => MONGO_PACKAGE.to_string(),
        "options" => OPTIONS_PACKAGE.to_string(),
        other => other.to_string(),
    }
}

fn check_operator(context: &str, value: &str) -> Result<(), PolicyError> {
    if value.len() > 1 && value.starts_with('$') {
        Ok(())
    } else {
        Err(PolicyError::NotAnOperator {
            context: context.to_string(),
            value: value.to_string(),
        })
    }
}

fn merge_sets(target: &mut MemberSets, entries: &[MemberSetDto], table: &str) -> Result<(), PolicyError> {
    for (i, entry) in entries.iter().enumerate() {
        let context = format!("{table}[{i}]");
        if entry.package.trim().is_empty() || entry.type_name.trim().is_empty() {
            return Err(PolicyError::EmptyName { context });
        }
        if entry.members.is_empty() || entry.members.iter().any(|m| m.trim().is_empty()) {
            return Err(PolicyError::EmptyMembers { context });
        }
        let owner = NamedType::new(expand_package(entry.package.trim()), entry.type_name.trim());
        target
            .entry(owner)
            .or_default()
            .extend(entry.members.iter().map(|m| m.trim().to_string()));
    }
    Ok(())
}

fn sets_to_dto(sets: &MemberSets) -> Vec<MemberSetDto> {
    sets.iter()
        .map(|(owner, members)| MemberSetDto {
            package: owner.package.clone(),
            type_name: owner.name.clone(),
            members: members.iter().cloned().collect(),
        })
        .collect()
}

impl PolicyTable {
    /// Builds a policy from its serialized form.
    ///
    /// # Errors
    ///
    /// Returns an error for empty names or stage/operator names without `$`.
    pub fn from_dto(dto: &PolicyDto) -> Result<Self, PolicyError> {
        let mut policy = if dto.replace {
            Self::empty()
        } else {
            Self::stable_api_v1()
        };
        policy.extend(dto)?;
        Ok(policy)
    }

    /// Adds every entry of `dto` to this policy. `dto.replace` is ignored.
    ///
    /// # Errors
    ///
    /// Returns the first invalid entry. The policy is left unchanged on error.
    pub fn extend(&mut self, dto: &PolicyDto) -> Result<(), PolicyError> {
        let mut next = self.clone();

        merge_sets(&mut next.functions, &dto.functions, "functions")?;
        merge_sets(&mut next.fields, &dto.fields, "fields")?;
        merge_sets(&mut next.constants, &dto.constants, "constants")?;
        merge_sets(
            &mut next.command_entry_points,
            &dto.command_entry_points,
            "command_entry_points",
        )?;
        merge_sets(
            &mut next.pipeline_entry_points,
            &dto.pipeline_entry_points,
            "pipeline_entry_points",
        )?;

        for (i, stage) in dto.stages.iter().enumerate() {
            check_operator(&format!("stages[{i}]"), stage)?;
            next.stages.insert(stage.clone());
        }
        for (stage, operators) in &dto.operators {
            let context = format!("operators.{stage}");
            check_operator(&context, stage)?;
            if operators.is_empty() {
                return Err(PolicyError::EmptyMembers { context });
            }
            for op in operators {
                check_operator(&context, op)?;
            }
            next.operators
                .entry(stage.clone())
                .or_default()
                .extend(operators.iter().cloned());
        }
        for (i, command) in dto.commands.iter().enumerate() {
            if command.trim().is_empty() {
                return Err(PolicyError::EmptyMembers {
                    context: format!("commands[{i}]"),
                });
            }
            next.commands.insert(command.trim().to_string());
        }

        *self = next;
        Ok(())
    }

    /// The complete policy in serialized form, with `replace = true`.
    #[must_use]
    pub fn to_dto(&self) -> PolicyDto {
        PolicyDto {
            replace: true,
            stages: self.stages.iter().cloned().collect(),
            commands: self.commands.iter().cloned().collect(),
            operators: self
                .operators
                .iter()
                .map(|(stage, ops)| (stage.clone(), ops.iter().cloned().collect()))
                .collect(),
            functions: sets_to_dto(&self.functions),
            fields: sets_to_dto(&self.fields),
            constants: sets_to_dto(&self.constants),
            command_entry_points: sets_to_dto(&self.command_entry_points),
            pipeline_entry_points: sets_to_dto(&self.pipeline_entry_points),
        }
    }
}
