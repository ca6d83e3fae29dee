//! Looks inside document-shaped literals passed to the driver.
//!
//! Documents are recognised in three shapes:
//!
//! ```text
//! bson.M{"$group": v}                  map entry
//! bson.D{{Key: "$group", Value: v}}    keyed element (typed bson.E or untyped)
//! bson.D{{"$group", v}}                positional element
//! ```
//!
//! Values and other elements that are literals, or identifiers the
//! [`Tracer`] resolves to literals, are walked recursively. A stage with
//! banned operators stays in force for everything nested below it.

use std::collections::HashSet;

use crate::policy::PolicyTable;
use crate::syntax::{NodeId, NodeKind, SyntaxTree, TypeExpr};
use crate::tracer::Tracer;

/// Something the inspector found inside a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finding {
    /// A banned stage used as a document key; anchored at the key literal.
    Stage {
        /// Key literal.
        anchor: NodeId,
        /// Stage name.
        stage: String,
    },
    /// A banned operator inside the stage in force; anchored at the entry.
    Operator {
        /// Entry element.
        anchor: NodeId,
        /// Stage in force.
        stage: String,
        /// Operator name.
        operator: String,
    },
    /// A command document naming a non-stable command; anchored at the entry.
    Command {
        /// First entry of the command document.
        anchor: NodeId,
        /// Command name.
        command: String,
    },
}

/// One entry of a document.
struct Entry {
    element: NodeId,
    key_node: NodeId,
    key: String,
    value: Option<NodeId>,
}

/// Recursive walker over document literals.
pub struct Inspector<'a> {
    tree: &'a SyntaxTree,
    policy: &'a PolicyTable,
    tracer: Tracer<'a>,
    /// Literals already walked, with the stage in force at the time.
    visited: HashSet<(NodeId, Option<String>)>,
    findings: Vec<Finding>,
}

impl<'a> Inspector<'a> {
    /// Creates an inspector for one unit.
    #[must_use]
    pub fn new(tree: &'a SyntaxTree, policy: &'a PolicyTable) -> Self {
        Self {
            tree,
            policy,
            tracer: Tracer::new(tree),
            visited: HashSet::new(),
            findings: Vec::new(),
        }
    }

    /// Inspects the arguments of a pipeline entry point.
    #[must_use]
    pub fn inspect_pipeline(mut self, args: &[NodeId]) -> Vec<Finding> {
        for arg in args {
            self.walk_value(*arg, None);
        }
        self.findings
    }

    /// Inspects the arguments of a command entry point.
    ///
    /// The first argument resolving to a non-empty document is the command;
    /// its first element names it. A name that cannot be read is not
    /// reported, but the document is still walked for stages.
    #[must_use]
    pub fn inspect_command(mut self, args: &[NodeId]) -> Vec<Finding> {
        let command = args.iter().find_map(|arg| {
            let doc = self.resolve(*arg)?;
            let first = *self.elements(doc).first()?;
            Some((doc, first))
        });

        if let Some((doc, first)) = command {
            if let Some(entry) = self.entry(first) {
                if !self.policy.is_stable_command(&entry.key) {
                    self.findings.push(Finding::Command {
                        anchor: entry.element,
                        command: entry.key,
                    });
                }
            }
            self.walk_literal(doc, None);
        }
        self.findings
    }

    fn walk_value(&mut self, value: NodeId, stage: Option<&str>) {
        if let Some(literal) = self.resolve(value) {
            self.walk_literal(literal, stage);
        }
    }

    fn walk_literal(&mut self, literal: NodeId, stage: Option<&str>) {
        if !self.visited.insert((literal, stage.map(str::to_string))) {
            return;
        }
        for &element in self.elements(literal) {
            let Some(entry) = self.entry(element) else {
                self.walk_value(element, stage);
                continue;
            };

            if self.policy.is_banned_stage(&entry.key) {
                self.findings.push(Finding::Stage {
                    anchor: entry.key_node,
                    stage: entry.key.clone(),
                });
            }
            if let Some(current) = stage {
                let banned = self
                    .policy
                    .operators_for(current)
                    .is_some_and(|ops| ops.contains(&entry.key));
                if banned {
                    self.findings.push(Finding::Operator {
                        anchor: entry.element,
                        stage: current.to_string(),
                        operator: entry.key.clone(),
                    });
                }
            }

            if let Some(value) = entry.value {
                if self.policy.operators_for(&entry.key).is_some() {
                    self.walk_value(value, Some(&entry.key));
                } else {
                    self.walk_value(value, stage);
                }
            }
        }
    }

    /// The structured literal behind `node`, looking through `&` and
    /// tracing identifiers.
    fn resolve(&self, node: NodeId) -> Option<NodeId> {
        let node = self.tree.strip_address_of(node);
        match self.tree.kind(node) {
            NodeKind::StructuredLiteral { .. } => Some(node),
            NodeKind::Identifier { .. } => self.tracer.trace(node),
            _ => None,
        }
    }

    fn elements(&self, literal: NodeId) -> &'a [NodeId] {
        let tree: &'a SyntaxTree = self.tree;
        match tree.kind(literal) {
            NodeKind::StructuredLiteral { elements, .. } => elements,
            _ => &[],
        }
    }

    fn entry(&self, element: NodeId) -> Option<Entry> {
        match self.tree.kind(element) {
            NodeKind::KeyValue { key, value } => {
                let text = self.tree.string_literal(*key)?;
                Some(Entry {
                    element,
                    key_node: *key,
                    key: text.to_string(),
                    value: Some(*value),
                })
            }
            NodeKind::StructuredLiteral { ty, elements } if is_element_type(ty.as_ref()) => {
                self.keyed_element(element, elements)
                    .or_else(|| self.positional_element(element, elements))
            }
            _ => None,
        }
    }

    /// `{Key: "k", Value: v}`
    fn keyed_element(&self, element: NodeId, fields: &[NodeId]) -> Option<Entry> {
        let mut key = None;
        let mut value = None;
        for field in fields {
            let NodeKind::KeyValue { key: name, value: v } = self.tree.kind(*field) else {
                return None;
            };
            match self.tree.identifier(*name)? {
                "Key" => key = Some(*v),
                "Value" => value = Some(*v),
                _ => return None,
            }
        }
        let key_node = key?;
        Some(Entry {
            element,
            key_node,
            key: self.tree.string_literal(key_node)?.to_string(),
            value,
        })
    }

    /// `{"k", v}`
    fn positional_element(&self, element: NodeId, items: &[NodeId]) -> Option<Entry> {
        let [key_node, value] = items else {
            return None;
        };
        Some(Entry {
            element,
            key_node: *key_node,
            key: self.tree.string_literal(*key_node)?.to_string(),
            value: Some(*value),
        })
    }
}

/// Untyped elements and `E` / `bson.E` literals can be document entries.
fn is_element_type(ty: Option<&TypeExpr>) -> bool {
    match ty {
        None => true,
        Some(TypeExpr::Named { name, .. }) => name == "E",
        Some(_) => false,
    }
}
