//! Reference Resolution
//!
//! What happens after the scanner has isolated a variable name:
//! - simple values are copied through verbatim, recursive values are
//!   re-scanned
//! - a recursive value that loops back into itself is caught via the
//!   in-progress mark, unless the variable still has reference budget
//! - append-mode definitions collect every segment along the scope
//!   chain, outermost first
//! - diagnostics blame the referenced variable's own definition site

use crate::engine::Expander;
use crate::errors::ExpandError;
use crate::expand::scanner::scan_into;
use crate::vars::store::{FoundVar, ScopeId};
use crate::vars::variable::Flavor;

/// Look up `name` and append its expansion to the output buffer. Missing
/// variables expand to nothing after a diagnostic.
pub(crate) fn expand_variable_ref(exp: &mut Expander, name: &str) -> Result<(), ExpandError> {
    let found = match exp.store.lookup(name) {
        Some(found) => found,
        None => return exp.report_missing_ref(name),
    };

    if found.var.value.is_empty() && !found.var.append {
        return Ok(());
    }

    match found.var.flavor {
        Flavor::Recursive => {
            let value = recursively_expand(exp, &found)?;
            exp.out.append(&value);
        }
        Flavor::Simple => {
            exp.out.append(&found.var.value);
        }
    }
    Ok(())
}

/// Expand a recursive variable's value to a string. Installs the variable's
/// own definition site as the blame location for nested diagnostics, and as
/// the reading location if there is none.
pub(crate) fn recursively_expand(
    exp: &mut Expander,
    found: &FoundVar,
) -> Result<String, ExpandError> {
    let var_location = found.var.location.clone();

    let saved_blame = exp.expanding_location.clone();
    if var_location.is_some() {
        exp.expanding_location = var_location.clone();
    }
    let set_reading = exp.location.is_none() && var_location.is_some();
    if set_reading {
        exp.location = var_location;
    }

    let result = expand_marked(exp, found);

    if set_reading {
        exp.location = None;
    }
    exp.expanding_location = saved_blame;
    result
}

/// The expansion proper, with the in-progress mark set around it.
fn expand_marked(exp: &mut Expander, found: &FoundVar) -> Result<String, ExpandError> {
    let name = found.var.name.as_str();
    // The caller has already made this variable's definition site the blame
    // location, so a self-reference points at the definition that loops.
    let blame = exp.blame();

    // Work on the live definition; the caller's snapshot does not carry
    // the in-progress state.
    let (value, append) = match exp.store.var_mut(found.scope, name) {
        Some(live) => {
            if live.expanding {
                if live.exp_count == 0 {
                    return Err(ExpandError::SelfReference {
                        name: name.to_string(),
                        location: blame,
                    });
                }
                live.exp_count -= 1;
            }
            live.expanding = true;
            (live.value.clone(), live.append)
        }
        None => (found.var.value.clone(), found.var.append),
    };

    let result = if append {
        append_chain(exp, name)
    } else {
        exp.expand_fresh(&value)
    };

    // Clear the mark even when the expansion failed.
    if let Some(live) = exp.store.var_mut(found.scope, name) {
        live.expanding = false;
    }
    result
}

/// Build the full value of an append-mode variable: walk the scope chain
/// from the current scope, find the nearest non-append definition as the
/// base, and paste each append segment after it, separated by spaces.
fn append_chain(exp: &mut Expander, name: &str) -> Result<String, ExpandError> {
    let saved = exp.out.install_fresh();
    let start = exp.store.current_scope();
    match append_segments(exp, name, Some(start), true) {
        Ok(()) => Ok(exp.out.swap(saved)),
        Err(e) => {
            exp.out.restore(saved);
            Err(e)
        }
    }
}

fn append_segments(
    exp: &mut Expander,
    name: &str,
    scope: Option<ScopeId>,
    local: bool,
) -> Result<(), ExpandError> {
    let id = match scope {
        Some(id) => id,
        None => return Ok(()),
    };
    let (parent, boundary) = exp.store.scope_links(id);
    let nextlocal = local && !boundary;

    // Private definitions only count while the walk is still local.
    let var = match exp.store.lookup_only_in(id, name) {
        Some(v) if local || !v.private => v.clone(),
        _ => return append_segments(exp, name, parent, nextlocal),
    };

    // Append segments come after everything defined above them; a
    // non-append definition is the base and ends the walk.
    if var.append {
        append_segments(exp, name, parent, nextlocal)?;
    }

    if !exp.out.is_empty() {
        exp.out.push(' ');
    }
    match var.flavor {
        Flavor::Simple => {
            exp.out.append(&var.value);
        }
        Flavor::Recursive => scan_into(exp, &var.value)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::engine::Expander;
    use crate::errors::ExpandError;
    use crate::vars::variable::{Flavor, Origin, Variable};

    fn define(exp: &mut Expander, name: &str, value: &str) {
        exp.store_mut().define(name, value, Flavor::Recursive, Origin::File);
    }

    #[test]
    fn test_recursive_value_rescans() {
        let mut exp = Expander::new();
        define(&mut exp, "inner", "deep");
        define(&mut exp, "outer", "<$(inner)>");
        assert_eq!(exp.expand("$(outer)").unwrap(), "<deep>");
    }

    fn define_simple_raw(exp: &mut Expander, name: &str, value: &str) {
        // Install a simple variable without definition-time expansion, to
        // show reference time leaves the value alone.
        let global = exp.store().global_scope();
        let var = Variable::new(name, value, Flavor::Simple, Origin::File);
        exp.store_mut().insert(global, var);
    }

    #[test]
    fn test_simple_value_is_verbatim() {
        let mut exp = Expander::new();
        define(&mut exp, "X", "expanded");
        define_simple_raw(&mut exp, "S", "a $(X) b");
        assert_eq!(exp.expand("$(S)").unwrap(), "a $(X) b");
    }

    #[test]
    fn test_direct_self_reference_fails() {
        let mut exp = Expander::new();
        define(&mut exp, "V", "$(V)");
        let err = exp.expand("$(V)").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Recursive variable 'V' references itself (eventually)"
        );
    }

    #[test]
    fn test_eventual_self_reference_fails() {
        let mut exp = Expander::new();
        define(&mut exp, "A", "$(B)");
        define(&mut exp, "B", "$(A)");
        let err = exp.expand("$(A)").unwrap_err();
        assert!(matches!(err, ExpandError::SelfReference { ref name, .. } if name == "A"));
    }

    #[test]
    fn test_in_progress_marks_cleared_after_error() {
        let mut exp = Expander::new();
        define(&mut exp, "A", "$(B)");
        define(&mut exp, "B", "$(A)");
        assert!(exp.expand("$(A)").is_err());
        assert!(!exp.store().lookup("A").unwrap().var.expanding);
        assert!(!exp.store().lookup("B").unwrap().var.expanding);
        // The engine still works afterward.
        define(&mut exp, "C", "fine");
        assert_eq!(exp.expand("$(C)").unwrap(), "fine");
    }

    #[test]
    fn test_self_reference_error_blames_definition_site() {
        use crate::errors::SourceLocation;
        let mut exp = Expander::new();
        define(&mut exp, "V", "$(V)");
        let loc = SourceLocation::new("vars.mk", 12);
        let global = exp.store().global_scope();
        exp.store_mut().var_mut(global, "V").unwrap().location = Some(loc.clone());
        let err = exp.expand("$(V)").unwrap_err();
        assert_eq!(err.location(), Some(&loc));
    }

    #[test]
    fn test_repeated_references_are_not_self_references() {
        let mut exp = Expander::new();
        define(&mut exp, "word", "hi");
        define(&mut exp, "twice", "$(word) $(word)");
        assert_eq!(exp.expand("$(twice)").unwrap(), "hi hi");
    }

    #[test]
    fn test_append_collects_outer_segment_first() {
        let mut exp = Expander::new();
        define(&mut exp, "X", "1");
        exp.store_mut().push_scope(false);
        let mut inner = Variable::new("X", "2", Flavor::Recursive, Origin::File);
        inner.append = true;
        let scope = exp.store().current_scope();
        exp.store_mut().insert(scope, inner);
        assert_eq!(exp.expand("$(X)").unwrap(), "1 2");
    }

    #[test]
    fn test_append_segments_expand_recursively() {
        let mut exp = Expander::new();
        define(&mut exp, "base", "core");
        define(&mut exp, "X", "$(base)");
        exp.store_mut().push_scope(false);
        let mut inner = Variable::new("X", "extra $(base)", Flavor::Recursive, Origin::File);
        inner.append = true;
        let scope = exp.store().current_scope();
        exp.store_mut().insert(scope, inner);
        assert_eq!(exp.expand("$(X)").unwrap(), "core extra core");
    }

    #[test]
    fn test_append_with_no_outer_definition() {
        let mut exp = Expander::new();
        let mut var = Variable::new("X", "only", Flavor::Recursive, Origin::File);
        var.append = true;
        let global = exp.store().global_scope();
        exp.store_mut().insert(global, var);
        assert_eq!(exp.expand("$(X)").unwrap(), "only");
    }

    #[test]
    fn test_append_chain_skips_private_outer_definition() {
        let mut exp = Expander::new();
        let global = exp.store().global_scope();
        let mut outer = Variable::new("X", "hidden", Flavor::Recursive, Origin::File);
        outer.private = true;
        exp.store_mut().insert(global, outer);

        exp.store_mut().push_scope(true);
        let mut inner = Variable::new("X", "mine", Flavor::Recursive, Origin::File);
        inner.append = true;
        let scope = exp.store().current_scope();
        exp.store_mut().insert(scope, inner);

        assert_eq!(exp.expand("$(X)").unwrap(), "mine");
    }

    #[test]
    fn test_empty_value_skipped_without_append() {
        let mut exp = Expander::new();
        define(&mut exp, "empty", "");
        assert_eq!(exp.expand("a$(empty)b").unwrap(), "ab");
    }

    #[test]
    fn test_missing_variable_records_diagnostic() {
        let mut exp = Expander::new();
        assert_eq!(exp.expand("$(ghost)").unwrap(), "");
        let reported = exp.diagnostics().reported();
        assert_eq!(reported.len(), 1);
        assert_eq!(reported[0].message, "undefined variable 'ghost'");
    }

    #[test]
    fn test_whitespace_in_missing_name_is_invalid_ref() {
        use crate::diagnostics::WarningKind;
        let mut exp = Expander::new();
        assert_eq!(exp.expand("$(two words)").unwrap(), "");
        let reported = exp.diagnostics().reported();
        assert_eq!(reported.len(), 1);
        assert_eq!(reported[0].kind, WarningKind::InvalidRef);
        assert_eq!(reported[0].message, "invalid variable reference 'two words'");
    }

    #[test]
    fn test_defined_name_with_whitespace_resolves() {
        let mut exp = Expander::new();
        define(&mut exp, "two words", "odd but legal");
        assert_eq!(exp.expand("$(two words)").unwrap(), "odd but legal");
        assert!(exp.diagnostics().reported().is_empty());
    }
}
