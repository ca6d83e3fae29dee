//! # gostable-go
//!
//! Tree-sitter based Go front-end for gostable.
//!
//! A [`GoUnit`] collects the files of one Go package, lowers them into the
//! engine's [`SyntaxTree`] and derives a [`TypeTable`] for the receivers and
//! literals the policy looks at.
//!
//! ## Example
//!
//! ```
//! use gostable_core::PolicyTable;
//! use gostable_go::GoUnit;
//!
//! let src = r#"package main
//!
//! import "go.mongodb.org/mongo-driver/mongo/options"
//!
//! func main() {
//!     opts := options.Find().SetMax(nil)
//!     _ = opts
//! }
//! "#;
//!
//! let mut unit = GoUnit::new();
//! unit.add_source("main.go", src).unwrap();
//! let violations = unit.check(&PolicyTable::stable_api_v1());
//! assert_eq!(violations[0].code, "GS001");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod driver;
mod parse;
mod resolve;

use std::path::Path;

use gostable_core::{PolicyTable, SyntaxTree, TypeTable, Violation};
use tracing::debug;

pub use driver::{method_result, package_function};
pub use parse::{lower_source, GoFile, Import, ParseError, StructDecl};

/// The files of one Go package, lowered into a single syntax tree.
#[derive(Debug, Clone, Default)]
pub struct GoUnit {
    tree: SyntaxTree,
    files: Vec<GoFile>,
}

impl GoUnit {
    /// Creates an empty unit.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a Go source file and adds it to the unit.
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not parse. The unit is unchanged.
    pub fn add_source(
        &mut self,
        path: impl AsRef<Path>,
        source: &str,
    ) -> Result<&GoFile, ParseError> {
        let path = path.as_ref();
        let file = lower_source(&mut self.tree, path, source)?;
        debug!(path = %path.display(), imports = file.imports.len(), "lowered Go file");
        self.files.push(file);
        Ok(&self.files[self.files.len() - 1])
    }

    /// The lowered syntax tree.
    #[must_use]
    pub fn tree(&self) -> &SyntaxTree {
        &self.tree
    }

    /// Files in the order they were added.
    #[must_use]
    pub fn files(&self) -> &[GoFile] {
        &self.files
    }

    /// Returns true if no file has been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Resolves the types the checker asks about.
    #[must_use]
    pub fn resolve_types(&self) -> TypeTable {
        resolve::resolve(&self.tree, &self.files)
    }

    /// Resolves types and checks the unit against `policy`.
    #[must_use]
    pub fn check(&self, policy: &PolicyTable) -> Vec<Violation> {
        let types = self.resolve_types();
        gostable_core::run(policy, &self.tree, &types)
    }
}
