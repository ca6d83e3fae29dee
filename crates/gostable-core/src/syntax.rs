//! Syntax model consumed by the checker.
//!
//! Front-ends lower their parse trees into a [`SyntaxTree`]: an arena of
//! [`Node`]s addressed by [`NodeId`]. One tree holds every file of an
//! analysis unit, so identifiers can be traced across files of the same
//! package.
//!
//! The checker only ever reads the tree. Child lists are stored inside each
//! [`NodeKind`]; parent links are filled in when a node is pushed, which is
//! why children must be pushed before their parents.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Handle to a node inside a [`SyntaxTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    /// Position of the node in the arena.
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Source span of a node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    /// Line number (1-indexed).
    pub line: usize,
    /// Column number (1-indexed).
    pub column: usize,
    /// Byte offset from the start of the file.
    pub offset: usize,
    /// Length of the span in bytes.
    pub length: usize,
}

impl Span {
    /// Creates a span at the given line and column.
    #[must_use]
    pub fn new(line: usize, column: usize) -> Self {
        Self {
            line,
            column,
            offset: 0,
            length: 0,
        }
    }

    /// Sets the byte range of this span.
    #[must_use]
    pub fn with_bytes(mut self, offset: usize, length: usize) -> Self {
        self.offset = offset;
        self.length = length;
        self
    }
}

/// Kind of a scalar literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralKind {
    /// String literal; the stored value has its quotes removed.
    String,
    /// Integer, float or imaginary literal.
    Number,
    /// Anything else (runes, `true`, `nil`, ...).
    Other,
}

/// A type as written in source, e.g. on a composite literal or a `var`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeExpr {
    /// `Name` or `pkg.Name`.
    Named {
        /// Package qualifier as written (an import alias), if any.
        qualifier: Option<String>,
        /// Type name.
        name: String,
    },
    /// `*T`
    Pointer(Box<TypeExpr>),
    /// `[]T` or `[N]T`
    Slice(Box<TypeExpr>),
    /// `map[K]V`
    Map {
        /// Key type.
        key: Box<TypeExpr>,
        /// Value type.
        value: Box<TypeExpr>,
    },
    /// Function, channel, interface and struct types.
    Other,
}

impl TypeExpr {
    /// `qualifier.name`
    #[must_use]
    pub fn qualified(qualifier: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Named {
            qualifier: Some(qualifier.into()),
            name: name.into(),
        }
    }

    /// An unqualified type name.
    #[must_use]
    pub fn local(name: impl Into<String>) -> Self {
        Self::Named {
            qualifier: None,
            name: name.into(),
        }
    }

    /// Wraps this type in a pointer.
    #[must_use]
    pub fn pointer(self) -> Self {
        Self::Pointer(Box::new(self))
    }

    /// Wraps this type in a slice.
    #[must_use]
    pub fn slice(self) -> Self {
        Self::Slice(Box::new(self))
    }
}

/// The shape of a node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Root of one source file.
    File {
        /// Path of the file, as reported in violations.
        path: PathBuf,
        /// Top-level declarations and statements.
        items: Vec<NodeId>,
    },
    /// A lexical scope: a block, a function, or a statement that opens an
    /// implicit block (`if`, `for`, `switch` and their clauses).
    Scope {
        /// Statements in source order.
        body: Vec<NodeId>,
    },
    /// A call `callee(args...)`.
    Invocation {
        /// The called expression.
        callee: NodeId,
        /// Arguments in order.
        args: Vec<NodeId>,
    },
    /// `operand.member`
    MemberAccess {
        /// Receiver expression.
        operand: NodeId,
        /// Selected name.
        member: String,
    },
    /// A composite literal `T{...}` or an untyped nested `{...}`.
    StructuredLiteral {
        /// Written type, absent for elided nested literals.
        ty: Option<TypeExpr>,
        /// Elements in order.
        elements: Vec<NodeId>,
    },
    /// `key: value` inside a structured literal.
    KeyValue {
        /// Key expression (identifier for struct fields, literal for maps).
        key: NodeId,
        /// Value expression.
        value: NodeId,
    },
    /// A scalar literal.
    Literal {
        /// Literal kind.
        kind: LiteralKind,
        /// Literal text; string literals are unquoted.
        value: String,
    },
    /// A bare name.
    Identifier {
        /// The name.
        name: String,
    },
    /// `lhs = rhs`, `lhs := rhs`, `var lhs T = rhs` or a parameter.
    Assignment {
        /// Assigned expressions.
        lhs: Vec<NodeId>,
        /// Values, empty for declarations without initialiser.
        rhs: Vec<NodeId>,
        /// Declared type, if written.
        declared: Option<TypeExpr>,
        /// True for declarations (`:=`, `var`, `const`, parameters).
        define: bool,
    },
    /// A prefix operator such as `&x`.
    Unary {
        /// Operator text.
        op: String,
        /// Operand expression.
        operand: NodeId,
    },
    /// Any other construct; only its children are of interest.
    Other {
        /// Child nodes in source order.
        children: Vec<NodeId>,
    },
}

impl NodeKind {
    /// Child nodes in source order.
    #[must_use]
    pub fn children(&self) -> Vec<NodeId> {
        match self {
            Self::File { items: list, .. }
            | Self::Scope { body: list }
            | Self::StructuredLiteral { elements: list, .. }
            | Self::Other { children: list } => list.clone(),
            Self::Invocation { callee, args } => {
                let mut out = Vec::with_capacity(args.len() + 1);
                out.push(*callee);
                out.extend(args.iter().copied());
                out
            }
            Self::MemberAccess { operand, .. } | Self::Unary { operand, .. } => vec![*operand],
            Self::KeyValue { key, value } => vec![*key, *value],
            Self::Assignment { lhs, rhs, .. } => lhs.iter().chain(rhs).copied().collect(),
            Self::Literal { .. } | Self::Identifier { .. } => Vec::new(),
        }
    }
}

/// A node in the arena.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Shape of the node.
    pub kind: NodeKind,
    /// Source position.
    pub span: Span,
    parent: Option<NodeId>,
}

impl Node {
    /// Enclosing node, `None` for files.
    #[must_use]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }
}

/// Arena holding all files of one analysis unit.
#[derive(Debug, Clone, Default)]
pub struct SyntaxTree {
    nodes: Vec<Node>,
    files: Vec<NodeId>,
}

impl SyntaxTree {
    /// Creates an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a node and links its children to it.
    ///
    /// # Panics
    ///
    /// Panics if `kind` references a node id that does not belong to this tree.
    #[allow(clippy::cast_possible_truncation)] // units stay far below u32::MAX nodes
    pub fn push(&mut self, kind: NodeKind, span: Span) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        for child in kind.children() {
            self.nodes[child.index()].parent = Some(id);
        }
        if matches!(kind, NodeKind::File { .. }) {
            self.files.push(id);
        }
        self.nodes.push(Node {
            kind,
            span,
            parent: None,
        });
        id
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the tree has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the node for `id`, if it belongs to this tree.
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// Returns the node for `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not produced by this tree.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    /// Shape of the node.
    #[must_use]
    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.node(id).kind
    }

    /// Source span of the node.
    #[must_use]
    pub fn span(&self, id: NodeId) -> Span {
        self.node(id).span
    }

    /// Enclosing node.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    /// File roots in the order they were added.
    #[must_use]
    pub fn files(&self) -> &[NodeId] {
        &self.files
    }

    /// Children of a node in source order.
    #[must_use]
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.kind(id).children()
    }

    /// Iterates the enclosing nodes of `id`, innermost first.
    #[must_use]
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: self.parent(id),
        }
    }

    /// The file root containing `id`.
    #[must_use]
    pub fn file_of(&self, id: NodeId) -> Option<NodeId> {
        if matches!(self.kind(id), NodeKind::File { .. }) {
            return Some(id);
        }
        self.ancestors(id)
            .find(|a| matches!(self.kind(*a), NodeKind::File { .. }))
    }

    /// Path of the file containing `id`.
    #[must_use]
    pub fn file_path(&self, id: NodeId) -> Option<&Path> {
        match self.kind(self.file_of(id)?) {
            NodeKind::File { path, .. } => Some(path),
            _ => None,
        }
    }

    /// Name of an identifier node.
    #[must_use]
    pub fn identifier(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            NodeKind::Identifier { name } => Some(name),
            _ => None,
        }
    }

    /// Unquoted value of a string literal node.
    #[must_use]
    pub fn string_literal(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            NodeKind::Literal {
                kind: LiteralKind::String,
                value,
            } => Some(value),
            _ => None,
        }
    }

    /// Looks through any number of `&` operators.
    #[must_use]
    pub fn strip_address_of(&self, mut id: NodeId) -> NodeId {
        while let NodeKind::Unary { op, operand } = self.kind(id) {
            if op != "&" {
                break;
            }
            id = *operand;
        }
        id
    }

    /// Every node id in push order.
    #[allow(clippy::cast_possible_truncation)]
    pub fn ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len()).map(|i| NodeId(i as u32))
    }

    /// Top-level items of every file, file by file.
    pub fn top_level_items(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.files.iter().flat_map(|f| match self.kind(*f) {
            NodeKind::File { items, .. } => items.clone(),
            _ => Vec::new(),
        })
    }
}

/// Iterator over enclosing nodes, see [`SyntaxTree::ancestors`].
pub struct Ancestors<'t> {
    tree: &'t SyntaxTree,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.tree.parent(current);
        Some(current)
    }
}

/// Builds trees by hand, for tests and for embedding the checker without a
/// parser.
///
/// Every node gets a synthetic span whose line is its creation order, so
/// positions in violations can be compared against [`SyntaxTree::span`].
#[derive(Debug, Default)]
pub struct TreeBuilder {
    tree: SyntaxTree,
}

impl TreeBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn add(&mut self, kind: NodeKind) -> NodeId {
        let n = self.tree.len();
        self.tree.push(kind, Span::new(n + 1, 1).with_bytes(n, 1))
    }

    /// `name`
    pub fn ident(&mut self, name: &str) -> NodeId {
        self.add(NodeKind::Identifier {
            name: name.to_string(),
        })
    }

    /// A string literal with the given unquoted value.
    pub fn string(&mut self, value: &str) -> NodeId {
        self.add(NodeKind::Literal {
            kind: LiteralKind::String,
            value: value.to_string(),
        })
    }

    /// A numeric literal.
    pub fn number(&mut self, value: &str) -> NodeId {
        self.add(NodeKind::Literal {
            kind: LiteralKind::Number,
            value: value.to_string(),
        })
    }

    /// `operand.member`
    pub fn member(&mut self, operand: NodeId, member: &str) -> NodeId {
        self.add(NodeKind::MemberAccess {
            operand,
            member: member.to_string(),
        })
    }

    /// `callee(args...)`
    pub fn call(&mut self, callee: NodeId, args: Vec<NodeId>) -> NodeId {
        self.add(NodeKind::Invocation { callee, args })
    }

    /// `receiver.method(args...)`; returns the invocation.
    pub fn method_call(&mut self, receiver: NodeId, method: &str, args: Vec<NodeId>) -> NodeId {
        let callee = self.member(receiver, method);
        self.call(callee, args)
    }

    /// `T{elements...}` or `{elements...}`.
    pub fn literal(&mut self, ty: Option<TypeExpr>, elements: Vec<NodeId>) -> NodeId {
        self.add(NodeKind::StructuredLiteral { ty, elements })
    }

    /// `key: value`
    pub fn key_value(&mut self, key: NodeId, value: NodeId) -> NodeId {
        self.add(NodeKind::KeyValue { key, value })
    }

    /// Struct field `Name: value`.
    pub fn field(&mut self, name: &str, value: NodeId) -> NodeId {
        let key = self.ident(name);
        self.key_value(key, value)
    }

    /// Map entry `"key": value`.
    pub fn pair(&mut self, key: &str, value: NodeId) -> NodeId {
        let key = self.string(key);
        self.key_value(key, value)
    }

    /// Document element `{Key: "key", Value: value}`.
    pub fn entry(&mut self, key: &str, value: NodeId) -> NodeId {
        let key = self.string(key);
        let key_field = self.field("Key", key);
        let value_field = self.field("Value", value);
        self.literal(None, vec![key_field, value_field])
    }

    /// `&operand`
    pub fn address_of(&mut self, operand: NodeId) -> NodeId {
        self.add(NodeKind::Unary {
            op: "&".to_string(),
            operand,
        })
    }

    /// `name := value`
    pub fn define(&mut self, name: &str, value: NodeId) -> NodeId {
        let lhs = self.ident(name);
        self.add(NodeKind::Assignment {
            lhs: vec![lhs],
            rhs: vec![value],
            declared: None,
            define: true,
        })
    }

    /// `name = value`
    pub fn assign(&mut self, name: &str, value: NodeId) -> NodeId {
        let lhs = self.ident(name);
        self.add(NodeKind::Assignment {
            lhs: vec![lhs],
            rhs: vec![value],
            declared: None,
            define: false,
        })
    }

    /// `var name T`
    pub fn declare(&mut self, name: &str, ty: TypeExpr) -> NodeId {
        let lhs = self.ident(name);
        self.add(NodeKind::Assignment {
            lhs: vec![lhs],
            rhs: Vec::new(),
            declared: Some(ty),
            define: true,
        })
    }

    /// A block of statements.
    pub fn scope(&mut self, body: Vec<NodeId>) -> NodeId {
        self.add(NodeKind::Scope { body })
    }

    /// An uninterpreted node wrapping `children`.
    pub fn other(&mut self, children: Vec<NodeId>) -> NodeId {
        self.add(NodeKind::Other { children })
    }

    /// A file root.
    pub fn file(&mut self, path: impl Into<PathBuf>, items: Vec<NodeId>) -> NodeId {
        self.add(NodeKind::File {
            path: path.into(),
            items,
        })
    }

    /// Read access to the tree built so far.
    #[must_use]
    pub fn tree(&self) -> &SyntaxTree {
        &self.tree
    }

    /// Finishes building.
    #[must_use]
    pub fn finish(self) -> SyntaxTree {
        self.tree
    }
}
