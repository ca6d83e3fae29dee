//! The traversal dispatcher: one preorder pass per unit.

use std::collections::HashSet;
use std::path::PathBuf;

use tracing::debug;

use crate::inspector::{Finding, Inspector};
use crate::policy::PolicyTable;
use crate::resolve::TypeResolver;
use crate::rule::RuleId;
use crate::symbol::{qualify, qualify_package_member};
use crate::syntax::{NodeId, NodeKind, SyntaxTree};
use crate::types::{sort_violations, Location, Suggestion, Violation, STABLE_API_DOC};
use crate::visit::{walk_children, walk_tree, Visit};

/// Checks analysis units against a policy.
#[derive(Debug, Clone, Copy)]
pub struct Checker<'p> {
    policy: &'p PolicyTable,
}

impl<'p> Checker<'p> {
    /// Creates a checker for `policy`.
    #[must_use]
    pub fn new(policy: &'p PolicyTable) -> Self {
        Self { policy }
    }

    /// Runs one pass over every file of `tree`.
    ///
    /// The result is sorted by file, line, column, code and message, and
    /// holds at most one violation per anchor node, rule and subject.
    #[must_use]
    pub fn run(&self, tree: &SyntaxTree, resolver: &dyn TypeResolver) -> Vec<Violation> {
        let mut pass = Pass {
            tree,
            resolver,
            policy: self.policy,
            seen: HashSet::new(),
            violations: Vec::new(),
        };
        walk_tree(&mut pass, tree);

        let mut violations = pass.violations;
        sort_violations(&mut violations);
        debug!(
            files = tree.files().len(),
            nodes = tree.len(),
            violations = violations.len(),
            "checked unit"
        );
        violations
    }
}

/// Checks `tree` against `policy`.
#[must_use]
pub fn run(policy: &PolicyTable, tree: &SyntaxTree, resolver: &dyn TypeResolver) -> Vec<Violation> {
    Checker::new(policy).run(tree, resolver)
}

struct Pass<'a> {
    tree: &'a SyntaxTree,
    resolver: &'a dyn TypeResolver,
    policy: &'a PolicyTable,
    seen: HashSet<(NodeId, RuleId, String)>,
    violations: Vec<Violation>,
}

impl Pass<'_> {
    fn report(&mut self, anchor: NodeId, rule: RuleId, subject: &str, message: String) {
        if !self.seen.insert((anchor, rule, subject.to_string())) {
            return;
        }
        let file = self
            .tree
            .file_path(anchor)
            .map(PathBuf::from)
            .unwrap_or_default();
        let location = Location::from_span(file, self.tree.span(anchor));
        let violation = Violation::new(rule, location, message)
            .with_suggestion(Suggestion::new(help_for(rule)))
            .with_doc_ref(STABLE_API_DOC);
        self.violations.push(violation);
    }

    fn report_findings(&mut self, findings: Vec<Finding>) {
        for finding in findings {
            match finding {
                Finding::Stage { anchor, stage } => {
                    self.report(anchor, RuleId::BannedStage, &stage, stage_message(&stage));
                }
                Finding::Operator {
                    anchor,
                    stage,
                    operator,
                } => {
                    let message = format!(
                        "Operator '{operator}' in stage '{stage}' is not supported by the MongoDB Stable API"
                    );
                    self.report(anchor, RuleId::BannedOperator, &operator, message);
                }
                Finding::Command { anchor, command } => {
                    let message =
                        format!("Command '{command}' is not supported by the MongoDB Stable API");
                    self.report(anchor, RuleId::UnsupportedCommand, &command, message);
                }
            }
        }
    }
}

impl Visit for Pass<'_> {
    fn visit_invocation(&mut self, tree: &SyntaxTree, node: NodeId) {
        let symbol = qualify(tree, self.resolver, node);
        if symbol.is_resolved() {
            let args = match tree.kind(node) {
                NodeKind::Invocation { args, .. } => args.as_slice(),
                _ => &[],
            };

            if self.policy.is_banned_function(&symbol) {
                let message = format!(
                    "use of {}.{} is not supported by the MongoDB Stable API",
                    symbol.type_name, symbol.member
                );
                self.report(node, RuleId::BannedFunction, &symbol.to_string(), message);
            }
            if self.policy.is_command_entry(&symbol) {
                let message = format!(
                    "{symbol} runs an arbitrary command and requires manual review against the MongoDB Stable API"
                );
                self.report(node, RuleId::CommandReview, &symbol.to_string(), message);
                let findings = Inspector::new(tree, self.policy).inspect_command(args);
                self.report_findings(findings);
            }
            if self.policy.is_pipeline_entry(&symbol) {
                let findings = Inspector::new(tree, self.policy).inspect_pipeline(args);
                self.report_findings(findings);
            }
        }
        walk_children(self, tree, node);
    }

    fn visit_member_access(&mut self, tree: &SyntaxTree, node: NodeId) {
        if let Some((package, member)) = qualify_package_member(tree, self.resolver, node) {
            if let Some(owner) = self.policy.banned_constant(&package, &member) {
                let message = format!(
                    "{}.{member} is not supported by the MongoDB Stable API",
                    owner.name
                );
                self.report(node, RuleId::BannedConstant, &member, message);
            }
        }
        walk_children(self, tree, node);
    }

    fn visit_structured_literal(&mut self, tree: &SyntaxTree, node: NodeId) {
        let policy = self.policy;
        let owner = self
            .resolver
            .type_of(node)
            .and_then(|ty| ty.named_type().cloned());
        let banned = owner
            .as_ref()
            .and_then(|owner| policy.banned_fields(owner).map(|f| (owner, f)));

        if let (Some((owner, fields)), NodeKind::StructuredLiteral { elements, .. }) =
            (banned, tree.kind(node))
        {
            for element in elements {
                let NodeKind::KeyValue { key, .. } = tree.kind(*element) else {
                    continue;
                };
                let Some(field) = tree.identifier(*key) else {
                    continue;
                };
                if fields.contains(field) {
                    let message = format!(
                        "{}.{field} is not supported by the MongoDB Stable API",
                        owner.name
                    );
                    self.report(*element, RuleId::BannedField, field, message);
                }
            }
        }
        walk_children(self, tree, node);
    }

    fn visit_literal(&mut self, tree: &SyntaxTree, node: NodeId) {
        let Some(text) = tree.string_literal(node) else {
            return;
        };
        let policy = self.policy;
        for stage in policy.stages_in(text) {
            self.report(node, RuleId::BannedStage, stage, stage_message(stage));
        }
    }
}

fn stage_message(stage: &str) -> String {
    format!("Aggregation stage '{stage}' is not supported by the MongoDB Stable API")
}

fn help_for(rule: RuleId) -> &'static str {
    match rule {
        RuleId::BannedFunction | RuleId::BannedField => {
            "remove the call or option, or run this code on a client without the Stable API"
        }
        RuleId::BannedStage | RuleId::BannedOperator => {
            "rewrite the pipeline using stages and operators from the Stable API"
        }
        RuleId::UnsupportedCommand => "use a Stable API command or a driver helper instead",
        RuleId::CommandReview => "check that the command document only names Stable API commands",
        RuleId::BannedConstant => "use a non-tailable cursor (options.NonTailable) instead",
    }
}
