//! jsdoc: extract a documentation symbol model from annotated JavaScript.
//!
//! Doc comments (`/** ... */`) are paired with the code that follows them,
//! their `@tag` clauses are parsed, and the resulting symbols are linked into
//! classes, members and free functions:
//!
//! ```
//! let model = jsdoc::parse_source(
//!     "shape.js",
//!     "/** A shape\n * @constructor */\nfunction Shape() {}\n",
//! )
//! .unwrap();
//! assert_eq!(model.classes()[0].name, "Shape");
//! ```
//!
//! Rendering the model is left to callers.

pub mod error;
pub mod model;
pub mod parser;

pub use error::{Error, Result};
pub use model::{
    ClassInfo, Clause, Diagnostic, DiagnosticKind, DocletModel, FileInfo, LinkState, Location,
    Param, Reference, Role, SeeAlso, Severity, Symbol, TypedDescription, UnattachedComment,
    UnattachedReason,
};
pub use parser::{parse_project, parse_source, Source};
