//! Preorder traversal over a [`SyntaxTree`].
//!
//! Implementors override the `visit_*` methods for the node kinds they care
//! about and call the matching `walk_*` function to keep descending. Every
//! node is visited exactly once per walk.

use crate::syntax::{NodeId, NodeKind, SyntaxTree};

/// Per-kind callbacks for a preorder walk.
pub trait Visit {
    /// Entry point for every node. Dispatches on the node kind.
    fn visit_node(&mut self, tree: &SyntaxTree, node: NodeId) {
        walk_node(self, tree, node);
    }

    /// `callee(args...)`
    fn visit_invocation(&mut self, tree: &SyntaxTree, node: NodeId) {
        walk_children(self, tree, node);
    }

    /// `operand.member` outside of a call position.
    fn visit_member_access(&mut self, tree: &SyntaxTree, node: NodeId) {
        walk_children(self, tree, node);
    }

    /// `T{...}`
    fn visit_structured_literal(&mut self, tree: &SyntaxTree, node: NodeId) {
        walk_children(self, tree, node);
    }

    /// Scalar literals.
    fn visit_literal(&mut self, tree: &SyntaxTree, node: NodeId) {
        walk_children(self, tree, node);
    }

    /// Every other kind.
    fn visit_other(&mut self, tree: &SyntaxTree, node: NodeId) {
        walk_children(self, tree, node);
    }
}

/// Dispatches `node` to the visitor method for its kind.
pub fn walk_node<V: Visit + ?Sized>(visitor: &mut V, tree: &SyntaxTree, node: NodeId) {
    match tree.kind(node) {
        NodeKind::Invocation { .. } => visitor.visit_invocation(tree, node),
        NodeKind::MemberAccess { .. } => visitor.visit_member_access(tree, node),
        NodeKind::StructuredLiteral { .. } => visitor.visit_structured_literal(tree, node),
        NodeKind::Literal { .. } => visitor.visit_literal(tree, node),
        _ => visitor.visit_other(tree, node),
    }
}

/// Visits the children of `node` in source order.
pub fn walk_children<V: Visit + ?Sized>(visitor: &mut V, tree: &SyntaxTree, node: NodeId) {
    for child in tree.children(node) {
        visitor.visit_node(tree, child);
    }
}

/// Visits every file of the tree in the order they were added.
pub fn walk_tree<V: Visit + ?Sized>(visitor: &mut V, tree: &SyntaxTree) {
    for file in tree.files() {
        visitor.visit_node(tree, *file);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::TreeBuilder;

    #[derive(Default)]
    struct Counter {
        calls: usize,
        literals: usize,
        seen: Vec<NodeId>,
    }

    impl Visit for Counter {
        fn visit_node(&mut self, tree: &SyntaxTree, node: NodeId) {
            self.seen.push(node);
            walk_node(self, tree, node);
        }

        fn visit_invocation(&mut self, tree: &SyntaxTree, node: NodeId) {
            self.calls += 1;
            walk_children(self, tree, node);
        }

        fn visit_literal(&mut self, _tree: &SyntaxTree, _node: NodeId) {
            self.literals += 1;
        }
    }

    #[test]
    fn visits_each_node_once_in_preorder() {
        let mut b = TreeBuilder::new();
        let recv = b.ident("coll");
        let arg = b.string("$match");
        let call = b.method_call(recv, "Aggregate", vec![arg]);
        let body = b.scope(vec![call]);
        let file = b.file("main.go", vec![body]);
        let tree = b.finish();

        let mut counter = Counter::default();
        walk_tree(&mut counter, &tree);

        assert_eq!(counter.calls, 1);
        assert_eq!(counter.literals, 1);
        assert_eq!(counter.seen.len(), tree.len());
        assert_eq!(counter.seen[0], file);
        assert_eq!(counter.seen[1], body);
        assert_eq!(counter.seen[2], call);
    }
}
