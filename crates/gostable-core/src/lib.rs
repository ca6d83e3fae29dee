//! # gostable-core
//!
//! Policy-matching engine for the MongoDB Stable API checker.
//!
//! The engine works on a language-neutral [`SyntaxTree`] plus a
//! [`TypeResolver`] oracle, both supplied by a front-end. It provides:
//!
//! - [`PolicyTable`] with the Stable API v1 tables for the Go driver
//! - [`qualify`] to turn calls into `package.Type.Member` symbols
//! - [`Tracer`] to follow variables back to their literal
//! - [`Inspector`] to look inside pipelines and command documents
//! - [`Checker`] and [`run`] to produce sorted [`Violation`]s
//!
//! ## Example
//!
//! ```
//! use gostable_core::{run, PolicyTable, TreeBuilder, TypeIdentity, TypeTable, MONGO_PACKAGE};
//!
//! let mut b = TreeBuilder::new();
//! let coll = b.ident("coll");
//! let call = b.method_call(coll, "Distinct", vec![]);
//! let body = b.scope(vec![call]);
//! b.file("report.go", vec![body]);
//! let tree = b.finish();
//!
//! let types = TypeTable::new().with_type(coll, TypeIdentity::pointer_to(MONGO_PACKAGE, "Collection"));
//! let violations = run(&PolicyTable::stable_api_v1(), &tree, &types);
//! assert_eq!(violations.len(), 1);
//! assert_eq!(violations[0].code, "GS001");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod checker;
mod config;
mod inspector;
mod resolve;
mod rule;
mod symbol;
mod syntax;
mod tracer;
mod types;

pub mod policy;
/// Helpers shared by the host crates.
pub mod utils;
pub mod visit;

pub use checker::{run, Checker};
pub use config::{AnalyzerConfig, Config, ConfigError, RuleConfig};
pub use inspector::{Finding, Inspector};
pub use policy::{PolicyDto, PolicyError, PolicyTable, MONGO_PACKAGE, OPTIONS_PACKAGE};
pub use resolve::{NamedType, NoTypes, TypeIdentity, TypeResolver, TypeTable};
pub use rule::{RuleId, UnknownRule};
pub use symbol::{qualify, qualify_package_member, QualifiedSymbol};
pub use syntax::{
    Ancestors, LiteralKind, Node, NodeId, NodeKind, Span, SyntaxTree, TreeBuilder, TypeExpr,
};
pub use tracer::Tracer;
pub use types::{
    sort_violations, LintResult, Location, Severity, Suggestion, Violation, ViolationDiagnostic,
    STABLE_API_DOC,
};
pub use utils::allowance::AllowCheck;
