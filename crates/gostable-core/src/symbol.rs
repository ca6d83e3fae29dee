//! Turning calls and member accesses into qualified symbols.

use std::fmt;

use crate::resolve::{NamedType, TypeResolver};
use crate::syntax::{NodeId, NodeKind, SyntaxTree};

/// `(package, type, member)` identity of an API element.
///
/// An empty `package` or `type_name` means resolution failed; such symbols
/// never match a policy entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QualifiedSymbol {
    /// Import path of the receiver type's package.
    pub package: String,
    /// Receiver type name.
    pub type_name: String,
    /// Selected member.
    pub member: String,
}

impl QualifiedSymbol {
    /// A resolved symbol.
    #[must_use]
    pub fn new(owner: &NamedType, member: impl Into<String>) -> Self {
        Self {
            package: owner.package.clone(),
            type_name: owner.name.clone(),
            member: member.into(),
        }
    }

    /// A symbol whose receiver could not be resolved.
    #[must_use]
    pub fn unresolved(member: impl Into<String>) -> Self {
        Self {
            package: String::new(),
            type_name: String::new(),
            member: member.into(),
        }
    }

    /// Whether the receiver type is known.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        !self.package.is_empty() && !self.type_name.is_empty()
    }

    /// The receiver type, if resolved.
    #[must_use]
    pub fn owner(&self) -> Option<NamedType> {
        self.is_resolved()
            .then(|| NamedType::new(self.package.clone(), self.type_name.clone()))
    }
}

impl fmt::Display for QualifiedSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_resolved() {
            write!(f, "{}.{}", self.type_name, self.member)
        } else {
            write!(f, "?.{}", self.member)
        }
    }
}

/// Qualifies an invocation or member access.
///
/// For an invocation the callee must be a member access; its operand is the
/// receiver. Pointer receivers are dereferenced once. Any other shape, or an
/// operand of unknown type, yields an unresolved symbol.
#[must_use]
pub fn qualify(tree: &SyntaxTree, resolver: &dyn TypeResolver, node: NodeId) -> QualifiedSymbol {
    let access = match tree.kind(node) {
        NodeKind::Invocation { callee, .. } => *callee,
        NodeKind::MemberAccess { .. } => node,
        _ => return QualifiedSymbol::unresolved(""),
    };

    match tree.kind(access) {
        NodeKind::MemberAccess { operand, member } => resolver
            .type_of(*operand)
            .and_then(|ty| ty.named_type().map(|owner| QualifiedSymbol::new(owner, member)))
            .unwrap_or_else(|| QualifiedSymbol::unresolved(member.as_str())),
        NodeKind::Identifier { name } => QualifiedSymbol::unresolved(name.as_str()),
        _ => QualifiedSymbol::unresolved(""),
    }
}

/// Resolves `pkg.Member` where `pkg` is an imported package.
///
/// Returns the package import path and the member name.
#[must_use]
pub fn qualify_package_member(
    tree: &SyntaxTree,
    resolver: &dyn TypeResolver,
    node: NodeId,
) -> Option<(String, String)> {
    let NodeKind::MemberAccess { operand, member } = tree.kind(node) else {
        return None;
    };
    tree.identifier(*operand)?;
    let package = resolver.package_of(*operand)?;
    Some((package, member.clone()))
}
