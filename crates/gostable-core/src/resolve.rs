//! Type identities and the type-resolution oracle.
//!
//! The checker never infers types itself. It asks a [`TypeResolver`] for the
//! identity of receiver expressions and literals, and treats `None` as
//! "unknown": unknown identities are never matched against the policy.

use std::collections::HashMap;
use std::fmt;

use crate::syntax::NodeId;

/// A named type identified by its package path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NamedType {
    /// Full import path, e.g. `go.mongodb.org/mongo-driver/mongo`.
    pub package: String,
    /// Type name, e.g. `Collection`.
    pub name: String,
}

impl NamedType {
    /// Creates a named type.
    #[must_use]
    pub fn new(package: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for NamedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.package, self.name)
    }
}

/// The type of an expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeIdentity {
    /// A named type.
    Named(NamedType),
    /// A pointer to another type.
    Pointer(Box<TypeIdentity>),
    /// Slices, maps, builtins and everything else without a package identity.
    Unnamed,
}

impl TypeIdentity {
    /// `package.name`
    #[must_use]
    pub fn named(package: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Named(NamedType::new(package, name))
    }

    /// `*package.name`
    #[must_use]
    pub fn pointer_to(package: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Pointer(Box::new(Self::named(package, name)))
    }

    /// Wraps this type in a pointer.
    #[must_use]
    pub fn into_pointer(self) -> Self {
        Self::Pointer(Box::new(self))
    }

    /// The named type, looking through one level of pointer.
    #[must_use]
    pub fn named_type(&self) -> Option<&NamedType> {
        match self {
            Self::Named(n) => Some(n),
            Self::Pointer(inner) => match inner.as_ref() {
                Self::Named(n) => Some(n),
                _ => None,
            },
            Self::Unnamed => None,
        }
    }

    /// Removes one level of pointer, if present.
    #[must_use]
    pub fn deref(self) -> Self {
        match self {
            Self::Pointer(inner) => *inner,
            other => other,
        }
    }
}

impl fmt::Display for TypeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(n) => write!(f, "{n}"),
            Self::Pointer(inner) => write!(f, "*{inner}"),
            Self::Unnamed => write!(f, "<unnamed>"),
        }
    }
}

/// Oracle mapping expressions to type identities.
pub trait TypeResolver {
    /// Type of the expression at `node`, `None` when unknown.
    fn type_of(&self, node: NodeId) -> Option<TypeIdentity>;

    /// Import path of the package an identifier refers to, if it names one.
    fn package_of(&self, _node: NodeId) -> Option<String> {
        None
    }
}

/// A resolver that knows nothing. Every symbol stays unresolved.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTypes;

impl TypeResolver for NoTypes {
    fn type_of(&self, _node: NodeId) -> Option<TypeIdentity> {
        None
    }
}

/// Precomputed answers for a [`TypeResolver`].
#[derive(Debug, Clone, Default)]
pub struct TypeTable {
    types: HashMap<NodeId, TypeIdentity>,
    packages: HashMap<NodeId, String>,
}

impl TypeTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the type of `node`.
    pub fn insert_type(&mut self, node: NodeId, ty: TypeIdentity) {
        self.types.insert(node, ty);
    }

    /// Records that identifier `node` names the package at `path`.
    pub fn insert_package(&mut self, node: NodeId, path: impl Into<String>) {
        self.packages.insert(node, path.into());
    }

    /// Builder-style [`Self::insert_type`].
    #[must_use]
    pub fn with_type(mut self, node: NodeId, ty: TypeIdentity) -> Self {
        self.insert_type(node, ty);
        self
    }

    /// Builder-style [`Self::insert_package`].
    #[must_use]
    pub fn with_package(mut self, node: NodeId, path: impl Into<String>) -> Self {
        self.insert_package(node, path);
        self
    }

    /// Number of typed nodes.
    #[must_use]
    pub fn typed_nodes(&self) -> usize {
        self.types.len()
    }
}

impl TypeResolver for TypeTable {
    fn type_of(&self, node: NodeId) -> Option<TypeIdentity> {
        self.types.get(&node).cloned()
    }

    fn package_of(&self, node: NodeId) -> Option<String> {
        self.packages.get(&node).cloned()
    }
}
