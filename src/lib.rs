//! makevar: make-style variable expansion
//!
//! A library and command-line tool implementing the expansion semantics of
//! make variables: `$(VAR)` and `${VAR}` references, nested references,
//! substitution references like `$(SRC:.c=.o)`, recursive and simple
//! flavors, `+=` accumulation across scopes, built-in text and control
//! functions, and a layered warning policy over the diagnostics the
//! expansion raises.
//!
//! ```
//! use makevar::{Expander, Flavor, Origin};
//!
//! let mut exp = Expander::new();
//! exp.define("objects", "main.o util.o", Flavor::Recursive, Origin::File).unwrap();
//! assert_eq!(exp.expand("$(objects:.o=.c)").unwrap(), "main.c util.c");
//! ```

pub mod diagnostics;
pub mod engine;
pub mod errors;
pub mod expand;
pub mod functions;
pub mod vars;

pub use diagnostics::{Diagnostics, Warning, WarningAction, WarningKind};
pub use engine::{Expander, ScopeContext, MAX_EXPANSION_DEPTH};
pub use errors::{ExpandError, SourceLocation};
pub use expand::buffer::{OutputBuffer, SavedBuffer, OUTPUT_BUFFER_ZONE};
pub use functions::{FunctionEntry, FunctionImpl, FunctionTable};
pub use vars::store::{FoundVar, ScopeId, VariableStore};
pub use vars::variable::{Flavor, Origin, Variable, EXP_COUNT_MAX};
