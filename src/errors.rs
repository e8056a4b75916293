//! Expansion Errors
//!
//! Fatal conditions raised during variable expansion:
//! - unterminated `$(...)` / `${...}` references
//! - recursive variables that reference themselves past their re-entry budget
//! - malformed or under-supplied built-in function calls
//! - warnings escalated to errors by the active warning policy
//!
//! Every variant carries the source location that was most recently entered
//! when the condition was detected, so messages can point at the definition
//! or input line whose expansion failed.

use crate::diagnostics::WarningKind;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// A file/line pair naming where a definition or a piece of input came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceLocation {
    pub file: String,
    pub line: u64,
}

impl SourceLocation {
    pub fn new(file: impl Into<String>, line: u64) -> Self {
        Self { file: file.into(), line }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// Fatal expansion errors.
///
/// These abort the whole expansion; the engine guarantees that buffer and
/// scope contexts are restored while the error propagates, so a caller can
/// keep using the engine after catching one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpandError {
    /// A `$(` or `${` whose closing delimiter never appears.
    #[error("unterminated variable reference")]
    UnterminatedReference { location: Option<SourceLocation> },

    /// A recursive variable re-entered its own expansion with no budget left.
    #[error("Recursive variable '{name}' references itself (eventually)")]
    SelfReference {
        name: String,
        location: Option<SourceLocation>,
    },

    /// A built-in function call whose closing delimiter never appears.
    #[error("unterminated call to function '{name}': missing '{missing}'")]
    UnterminatedCall {
        name: String,
        missing: char,
        location: Option<SourceLocation>,
    },

    /// A built-in function invoked with fewer arguments than it requires.
    #[error("insufficient number of arguments ({found}) to function '{name}'")]
    InsufficientArguments {
        name: String,
        found: usize,
        location: Option<SourceLocation>,
    },

    /// A built-in function invoked with an argument it cannot use.
    /// The message is complete on its own, e.g. "non-numeric first argument
    /// to 'word' function".
    #[error("{message}")]
    InvalidFunctionArgument {
        message: String,
        location: Option<SourceLocation>,
    },

    /// A definition was attempted with an empty variable name.
    #[error("empty variable name")]
    EmptyVariableName { location: Option<SourceLocation> },

    /// Expansion nesting exceeded the engine's depth rail. This fires on
    /// adversarially nested input before the native stack can overflow; it
    /// is distinct from [`ExpandError::SelfReference`], which only the
    /// per-variable re-entry budget can raise.
    #[error("expansion nesting too deep (limit is {limit})")]
    DepthLimit {
        limit: usize,
        location: Option<SourceLocation>,
    },

    /// A diagnostic whose configured action is `error`.
    #[error("{message}")]
    EscalatedWarning {
        kind: WarningKind,
        message: String,
        location: Option<SourceLocation>,
    },

    /// An unrecognized warning kind in a `--warn`-style specification.
    #[error("unknown warning '{name}'")]
    UnknownWarning { name: String },

    /// An unrecognized action in a `--warn`-style specification.
    #[error("unknown warning action '{name}'")]
    UnknownWarningAction { name: String },
}

impl ExpandError {
    /// The location the error should be reported at, when one was known.
    pub fn location(&self) -> Option<&SourceLocation> {
        match self {
            ExpandError::UnterminatedReference { location }
            | ExpandError::SelfReference { location, .. }
            | ExpandError::UnterminatedCall { location, .. }
            | ExpandError::InsufficientArguments { location, .. }
            | ExpandError::InvalidFunctionArgument { location, .. }
            | ExpandError::EmptyVariableName { location }
            | ExpandError::DepthLimit { location, .. }
            | ExpandError::EscalatedWarning { location, .. } => location.as_ref(),
            ExpandError::UnknownWarning { .. } | ExpandError::UnknownWarningAction { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_location_display() {
        let loc = SourceLocation::new("Makefile", 12);
        assert_eq!(loc.to_string(), "Makefile:12");
    }

    #[test]
    fn test_self_reference_message() {
        let err = ExpandError::SelfReference {
            name: "CFLAGS".to_string(),
            location: None,
        };
        assert_eq!(
            err.to_string(),
            "Recursive variable 'CFLAGS' references itself (eventually)"
        );
    }

    #[test]
    fn test_unterminated_call_message() {
        let err = ExpandError::UnterminatedCall {
            name: "if".to_string(),
            missing: ')',
            location: None,
        };
        assert_eq!(
            err.to_string(),
            "unterminated call to function 'if': missing ')'"
        );
    }

    #[test]
    fn test_location_accessor() {
        let loc = SourceLocation::new("rules.mk", 3);
        let err = ExpandError::UnterminatedReference {
            location: Some(loc.clone()),
        };
        assert_eq!(err.location(), Some(&loc));

        let err = ExpandError::UnknownWarning { name: "nope".to_string() };
        assert_eq!(err.location(), None);
    }
}
