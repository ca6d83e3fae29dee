//! The compatibility policy: what the checker reports.
//!
//! A [`PolicyTable`] is built once, either from the built-in Stable API v1
//! tables or from those tables extended by configuration, and is only read
//! afterwards. It is `Send + Sync` and is shared by reference across units.

mod builtin;
pub mod dto;

use std::collections::{BTreeMap, BTreeSet};

use crate::resolve::NamedType;
use crate::symbol::QualifiedSymbol;

pub use builtin::{MONGO_PACKAGE, OPTIONS_PACKAGE};
pub use dto::{MemberSetDto, PolicyDto, PolicyError};

/// Members keyed by their owning type.
pub type MemberSets = BTreeMap<NamedType, BTreeSet<String>>;

/// Immutable policy tables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyTable {
    functions: MemberSets,
    fields: MemberSets,
    constants: MemberSets,
    stages: BTreeSet<String>,
    operators: BTreeMap<String, BTreeSet<String>>,
    commands: BTreeSet<String>,
    command_entry_points: MemberSets,
    pipeline_entry_points: MemberSets,
}

impl PolicyTable {
    /// A policy that bans nothing.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// The MongoDB Stable API v1 policy for the Go driver.
    #[must_use]
    pub fn stable_api_v1() -> Self {
        builtin::stable_api_v1()
    }

    /// Whether a resolved call target is a banned driver method.
    #[must_use]
    pub fn is_banned_function(&self, symbol: &QualifiedSymbol) -> bool {
        Self::contains(&self.functions, symbol)
    }

    /// Banned fields of a struct type, if the type has any.
    #[must_use]
    pub fn banned_fields(&self, owner: &NamedType) -> Option<&BTreeSet<String>> {
        self.fields.get(owner)
    }

    /// The owning type of a banned package constant, if `package.name` is one.
    #[must_use]
    pub fn banned_constant(&self, package: &str, name: &str) -> Option<&NamedType> {
        self.constants
            .iter()
            .find(|(owner, names)| owner.package == package && names.contains(name))
            .map(|(owner, _)| owner)
    }

    /// Banned stage names contained anywhere in `text`, in table order.
    pub fn stages_in<'p>(&'p self, text: &'p str) -> impl Iterator<Item = &'p str> + 'p {
        self.stages
            .iter()
            .filter(move |stage| text.contains(stage.as_str()))
            .map(String::as_str)
    }

    /// Whether `key` is exactly a banned stage name.
    #[must_use]
    pub fn is_banned_stage(&self, key: &str) -> bool {
        self.stages.contains(key)
    }

    /// Operators banned inside `stage`.
    #[must_use]
    pub fn operators_for(&self, stage: &str) -> Option<&BTreeSet<String>> {
        self.operators.get(stage)
    }

    /// Whether `name` is a command in the stable command set.
    #[must_use]
    pub fn is_stable_command(&self, name: &str) -> bool {
        self.commands.contains(name)
    }

    /// Whether a resolved call target runs an arbitrary database command.
    #[must_use]
    pub fn is_command_entry(&self, symbol: &QualifiedSymbol) -> bool {
        Self::contains(&self.command_entry_points, symbol)
    }

    /// Whether a resolved call target takes an aggregation pipeline.
    #[must_use]
    pub fn is_pipeline_entry(&self, symbol: &QualifiedSymbol) -> bool {
        Self::contains(&self.pipeline_entry_points, symbol)
    }

    /// Number of entries across all tables, for logging.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        let members = |sets: &MemberSets| sets.values().map(BTreeSet::len).sum::<usize>();
        members(&self.functions)
            + members(&self.fields)
            + members(&self.constants)
            + self.stages.len()
            + self.operators.values().map(BTreeSet::len).sum::<usize>()
            + self.commands.len()
            + members(&self.command_entry_points)
            + members(&self.pipeline_entry_points)
    }

    fn contains(sets: &MemberSets, symbol: &QualifiedSymbol) -> bool {
        symbol
            .owner()
            .and_then(|owner| sets.get(&owner))
            .is_some_and(|members| members.contains(&symbol.member))
    }
}
