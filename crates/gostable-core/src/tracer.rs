//! Follows a variable back to the literal it was assigned.
//!
//! The trace is one assignment hop deep and ignores control flow. Enclosing
//! scopes are searched innermost first, each one only among the statements
//! before the use, nearest first. When no scope binds the name, top-level
//! declarations of every file in the unit are scanned in order. That fallback
//! matches by name only, so an unrelated package-level variable with the same
//! name can be picked up.

use tracing::trace;

use crate::syntax::{NodeId, NodeKind, SyntaxTree};

/// Resolves identifiers to the structured literal assigned to them.
#[derive(Debug, Clone, Copy)]
pub struct Tracer<'t> {
    tree: &'t SyntaxTree,
}

impl<'t> Tracer<'t> {
    /// Creates a tracer over one analysis unit.
    #[must_use]
    pub fn new(tree: &'t SyntaxTree) -> Self {
        Self { tree }
    }

    /// The structured literal `ident` was last bound to, if any.
    ///
    /// Returns `None` for non-identifiers and for names bound only to
    /// non-literal values.
    #[must_use]
    pub fn trace(&self, ident: NodeId) -> Option<NodeId> {
        let name = self.tree.identifier(ident)?;

        let mut on_path = ident;
        for ancestor in self.tree.ancestors(ident) {
            if let NodeKind::Scope { body } = self.tree.kind(ancestor) {
                let before = body
                    .iter()
                    .position(|stmt| *stmt == on_path)
                    .unwrap_or(body.len());
                let found = body[..before]
                    .iter()
                    .rev()
                    .find_map(|stmt| self.last_literal_binding(*stmt, name));
                if let Some(literal) = found {
                    trace!(%name, %literal, scope = %ancestor, "traced to local literal");
                    return Some(literal);
                }
            }
            on_path = ancestor;
        }

        let found = self
            .tree
            .top_level_items()
            .find_map(|item| self.first_literal_binding(item, name));
        if let Some(literal) = found {
            trace!(%name, %literal, "traced to top-level literal");
        }
        found
    }

    fn last_literal_binding(&self, stmt: NodeId, name: &str) -> Option<NodeId> {
        self.assignments(stmt)
            .into_iter()
            .rev()
            .find_map(|a| self.literal_binding(a, name))
    }

    fn first_literal_binding(&self, stmt: NodeId, name: &str) -> Option<NodeId> {
        self.assignments(stmt)
            .into_iter()
            .find_map(|a| self.literal_binding(a, name))
    }

    /// The statement itself, or the specs of a grouped declaration.
    fn assignments(&self, stmt: NodeId) -> Vec<NodeId> {
        match self.tree.kind(stmt) {
            NodeKind::Assignment { .. } => vec![stmt],
            NodeKind::Other { children } => children
                .iter()
                .copied()
                .filter(|c| matches!(self.tree.kind(*c), NodeKind::Assignment { .. }))
                .collect(),
            _ => Vec::new(),
        }
    }

    fn literal_binding(&self, assignment: NodeId, name: &str) -> Option<NodeId> {
        let NodeKind::Assignment { lhs, rhs, .. } = self.tree.kind(assignment) else {
            return None;
        };
        let ([target], [value]) = (lhs.as_slice(), rhs.as_slice()) else {
            return None;
        };
        if self.tree.identifier(*target)? != name {
            return None;
        }
        let value = self.tree.strip_address_of(*value);
        matches!(self.tree.kind(value), NodeKind::StructuredLiteral { .. }).then_some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{TreeBuilder, TypeExpr};

    #[test]
    fn finds_preceding_local_literal() {
        let mut b = TreeBuilder::new();
        let lit = b.literal(Some(TypeExpr::qualified("bson", "D")), vec![]);
        let assign = b.define("cmd", lit);
        let use_site = b.ident("cmd");
        let stmt = b.other(vec![use_site]);
        let body = b.scope(vec![assign, stmt]);
        b.file("main.go", vec![body]);
        let tree = b.finish();

        assert_eq!(Tracer::new(&tree).trace(use_site), Some(lit));
    }

    #[test]
    fn ignores_assignments_after_the_use() {
        let mut b = TreeBuilder::new();
        let use_site = b.ident("cmd");
        let stmt = b.other(vec![use_site]);
        let lit = b.literal(None, vec![]);
        let later = b.define("cmd", lit);
        let body = b.scope(vec![stmt, later]);
        b.file("main.go", vec![body]);
        let tree = b.finish();

        assert_eq!(Tracer::new(&tree).trace(use_site), None);
    }

    #[test]
    fn nearest_binding_wins() {
        let mut b = TreeBuilder::new();
        let first = b.literal(None, vec![]);
        let a1 = b.define("cmd", first);
        let second = b.literal(None, vec![]);
        let inner = b.address_of(second);
        let a2 = b.assign("cmd", inner);
        let use_site = b.ident("cmd");
        let stmt = b.other(vec![use_site]);
        let body = b.scope(vec![a1, a2, stmt]);
        b.file("main.go", vec![body]);
        let tree = b.finish();

        assert_eq!(Tracer::new(&tree).trace(use_site), Some(second));
    }

    #[test]
    fn inner_scope_searched_before_outer() {
        let mut b = TreeBuilder::new();
        let outer_lit = b.literal(None, vec![]);
        let outer = b.define("pipeline", outer_lit);
        let inner_lit = b.literal(None, vec![]);
        let inner = b.define("pipeline", inner_lit);
        let use_site = b.ident("pipeline");
        let stmt = b.other(vec![use_site]);
        let block = b.scope(vec![inner, stmt]);
        let body = b.scope(vec![outer, block]);
        b.file("main.go", vec![body]);
        let tree = b.finish();

        assert_eq!(Tracer::new(&tree).trace(use_site), Some(inner_lit));
    }

    #[test]
    fn outer_scope_reached_from_nested_block() {
        let mut b = TreeBuilder::new();
        let lit = b.literal(None, vec![]);
        let outer = b.define("pipeline", lit);
        let use_site = b.ident("pipeline");
        let stmt = b.other(vec![use_site]);
        let block = b.scope(vec![stmt]);
        let body = b.scope(vec![outer, block]);
        b.file("main.go", vec![body]);
        let tree = b.finish();

        assert_eq!(Tracer::new(&tree).trace(use_site), Some(lit));
    }

    #[test]
    fn falls_back_to_top_level_of_other_files() {
        let mut b = TreeBuilder::new();
        let use_site = b.ident("stages");
        let stmt = b.other(vec![use_site]);
        let body = b.scope(vec![stmt]);
        b.file("main.go", vec![body]);
        let lit = b.literal(None, vec![]);
        let decl = b.define("stages", lit);
        let group = b.other(vec![decl]);
        b.file("pipelines.go", vec![group]);
        let tree = b.finish();

        assert_eq!(Tracer::new(&tree).trace(use_site), Some(lit));
    }

    #[test]
    fn non_literal_bindings_are_skipped() {
        let mut b = TreeBuilder::new();
        let callee = b.ident("buildCommand");
        let call = b.call(callee, vec![]);
        let assign = b.define("cmd", call);
        let use_site = b.ident("cmd");
        let stmt = b.other(vec![use_site]);
        let body = b.scope(vec![assign, stmt]);
        b.file("main.go", vec![body]);
        let tree = b.finish();

        assert_eq!(Tracer::new(&tree).trace(use_site), None);
    }

    #[test]
    fn non_identifiers_are_not_traced() {
        let mut b = TreeBuilder::new();
        let lit = b.literal(None, vec![]);
        let tree = b.finish();

        assert_eq!(Tracer::new(&tree).trace(lit), None);
    }
}
