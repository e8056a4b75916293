//! Variable Definitions
//!
//! The record stored per variable name:
//! - flavor (recursive text vs. simple, pre-expanded text)
//! - origin (who defined it, for `$(origin ...)`)
//! - append and private markers
//! - the self-reference bookkeeping used during recursive expansion

use crate::errors::SourceLocation;

/// Budget granted to a variable so it may legally appear inside its own
/// expansion. Each nested self-reference spends one unit; at zero the
/// expansion is reported as infinite.
pub const EXP_COUNT_MAX: u16 = 32767;

/// How a variable's value is treated when the variable is referenced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flavor {
    /// The value is stored verbatim and re-expanded at every reference.
    Recursive,
    /// The value was expanded at definition time and is used verbatim.
    Simple,
}

impl Flavor {
    /// The keyword reported by `$(flavor ...)`.
    pub fn keyword(self) -> &'static str {
        match self {
            Flavor::Recursive => "recursive",
            Flavor::Simple => "simple",
        }
    }
}

/// Where a variable's definition came from, in increasing precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Origin {
    Default,
    Environment,
    File,
    CommandLine,
    Automatic,
}

impl Origin {
    /// The keyword reported by `$(origin ...)`.
    pub fn keyword(self) -> &'static str {
        match self {
            Origin::Default => "default",
            Origin::Environment => "environment",
            Origin::File => "file",
            Origin::CommandLine => "command line",
            Origin::Automatic => "automatic",
        }
    }
}

/// One variable definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub name: String,
    pub value: String,
    pub flavor: Flavor,
    pub origin: Origin,
    /// This definition extends an outer one instead of replacing it.
    pub append: bool,
    /// Invisible to lookups that crossed a scope boundary.
    pub private: bool,
    /// Where the definition was made, if known.
    pub location: Option<SourceLocation>,
    /// Set while this variable's value is being expanded. A reference that
    /// finds it set has looped back into the variable itself.
    pub(crate) expanding: bool,
    /// Remaining self-reference budget, normally zero. `$(call ...)` grants
    /// the called variable a full budget for the duration of the call.
    pub(crate) exp_count: u16,
}

impl Variable {
    pub fn new(name: impl Into<String>, value: impl Into<String>, flavor: Flavor, origin: Origin) -> Self {
        Variable {
            name: name.into(),
            value: value.into(),
            flavor,
            origin,
            append: false,
            private: false,
            location: None,
            expanding: false,
            exp_count: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flavor_keywords() {
        assert_eq!(Flavor::Recursive.keyword(), "recursive");
        assert_eq!(Flavor::Simple.keyword(), "simple");
    }

    #[test]
    fn test_origin_keywords() {
        assert_eq!(Origin::Default.keyword(), "default");
        assert_eq!(Origin::Environment.keyword(), "environment");
        assert_eq!(Origin::File.keyword(), "file");
        assert_eq!(Origin::CommandLine.keyword(), "command line");
        assert_eq!(Origin::Automatic.keyword(), "automatic");
    }

    #[test]
    fn test_origin_precedence_order() {
        assert!(Origin::Default < Origin::Environment);
        assert!(Origin::Environment < Origin::File);
        assert!(Origin::File < Origin::CommandLine);
        assert!(Origin::CommandLine < Origin::Automatic);
    }

    #[test]
    fn test_new_variable_defaults() {
        let v = Variable::new("CC", "gcc", Flavor::Recursive, Origin::File);
        assert_eq!(v.name, "CC");
        assert_eq!(v.value, "gcc");
        assert!(!v.append);
        assert!(!v.private);
        assert!(v.location.is_none());
        assert!(!v.expanding);
        assert_eq!(v.exp_count, 0);
    }
}
