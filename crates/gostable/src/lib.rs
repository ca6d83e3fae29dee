//! # gostable
//!
//! Static checker for MongoDB Stable API compliance in Go code.
//!
//! This is the facade crate: it re-exports the engine, the Go front-end and
//! the [`Analyzer`], which discovers Go packages on disk and checks each of
//! them as one unit.
//!
//! ## Suppression Comments
//!
//! ```go
//! // gostable: allow(banned-function) reason="reporting job runs without the Stable API"
//! names, err := coll.Distinct(ctx, "name", filter)
//! ```
//!
//! A directive covers its own line and the line below. Suppressing an
//! error without a `reason` leaves a warning in its place.
//!
//! ## Programmatic Usage
//!
//! ```no_run
//! use gostable::Analyzer;
//!
//! let analyzer = Analyzer::builder().root("./services").build()?;
//! let result = analyzer.analyze()?;
//! for violation in &result.violations {
//!     println!("{violation}");
//! }
//! # Ok::<(), gostable::AnalyzerError>(())
//! ```

#![forbid(unsafe_code)]

pub use gostable_core::*;
pub use gostable_go::{GoFile, GoUnit, Import, ParseError};

mod analyzer;

pub use analyzer::{Analyzer, AnalyzerBuilder, AnalyzerError};
