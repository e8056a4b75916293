//! Control Functions
//!
//! The functions that receive raw arguments and drive expansion
//! themselves, plus call and the introspection pair:
//! - if/or/and decide on trimmed conditions and expand only what the
//!   decision selects
//! - foreach rebinds its loop variable in a fresh scope per word
//! - call binds `$(0)`..`$(N)` in a fresh scope and expands the named
//!   variable with a self-reference budget, so user functions may recurse
//! - origin and flavor look a name up without expanding its value

use crate::engine::Expander;
use crate::errors::ExpandError;
use crate::vars::variable::{Flavor, Origin, EXP_COUNT_MAX};

pub(crate) fn func_if(exp: &mut Expander, args: &[String]) -> Result<String, ExpandError> {
    let condition = args[0].trim_ascii();
    let truthy = !condition.is_empty() && !exp.expand_fresh(condition)?.is_empty();
    let branch = if truthy { args.get(1) } else { args.get(2) };
    match branch {
        Some(text) => exp.expand_fresh(text),
        None => Ok(String::new()),
    }
}

pub(crate) fn func_or(exp: &mut Expander, args: &[String]) -> Result<String, ExpandError> {
    for arg in args {
        let condition = arg.trim_ascii();
        if condition.is_empty() {
            continue;
        }
        let expansion = exp.expand_fresh(condition)?;
        if !expansion.is_empty() {
            // First true condition wins; the rest stay unexpanded.
            return Ok(expansion);
        }
    }
    Ok(String::new())
}

pub(crate) fn func_and(exp: &mut Expander, args: &[String]) -> Result<String, ExpandError> {
    let mut expansion = String::new();
    for arg in args {
        let condition = arg.trim_ascii();
        if condition.is_empty() {
            return Ok(String::new());
        }
        expansion = exp.expand_fresh(condition)?;
        if expansion.is_empty() {
            return Ok(String::new());
        }
    }
    // All conditions true: the value is the last one's expansion.
    Ok(expansion)
}

pub(crate) fn func_foreach(exp: &mut Expander, args: &[String]) -> Result<String, ExpandError> {
    let varname = exp.expand_fresh(&args[0])?;
    let list = exp.expand_fresh(&args[1])?;
    let body = &args[2];
    let var = varname.split_ascii_whitespace().next().unwrap_or("");

    exp.store.push_scope(false);
    exp.store.define(var, "", Flavor::Simple, Origin::Automatic);
    let scope = exp.store.current_scope();

    let mut out = String::new();
    let mut doneany = false;
    let mut failed = None;
    for word in list.split_ascii_whitespace() {
        if let Some(live) = exp.store.var_mut(scope, var) {
            live.value = word.to_string();
        }
        match exp.expand_fresh(body) {
            Ok(text) => {
                out.push_str(&text);
                out.push(' ');
                doneany = true;
            }
            Err(e) => {
                failed = Some(e);
                break;
            }
        }
    }
    exp.store.pop_scope();

    if let Some(e) = failed {
        return Err(e);
    }
    if doneany {
        // Kill the last separator.
        out.pop();
    }
    Ok(out)
}

pub(crate) fn func_call(exp: &mut Expander, args: &[String]) -> Result<String, ExpandError> {
    let fname = args[0].split_ascii_whitespace().next().unwrap_or("");

    // Calling nothing is a no-op.
    if fname.is_empty() {
        return Ok(String::new());
    }

    // A built-in name dispatches directly, with the rest of the arguments
    // passed through as-is.
    if let Some(entry) = exp.functions.get(fname) {
        return super::invoke(exp, fname, entry, &args[1..]);
    }

    // Otherwise bind the numbered argument variables in a fresh scope.
    exp.store.push_scope(false);
    exp.store.define("0", fname, Flavor::Simple, Origin::Automatic);
    let mut i = 1;
    for arg in &args[1..] {
        exp.store.define(i.to_string(), arg.as_str(), Flavor::Simple, Origin::Automatic);
        i += 1;
    }
    // Inside a recursive call, hide the outer invocation's higher-numbered
    // arguments behind empty values.
    while i < exp.call_max_args {
        exp.store.define(i.to_string(), "", Flavor::Simple, Origin::Automatic);
        i += 1;
    }

    let saved_max = exp.call_max_args;
    exp.call_max_args = i;

    let result = call_named(exp, fname);

    exp.call_max_args = saved_max;
    exp.store.pop_scope();
    result
}

fn call_named(exp: &mut Expander, fname: &str) -> Result<String, ExpandError> {
    let found = match exp.store.lookup(fname) {
        Some(found) => found,
        None => {
            exp.warn_undefined(fname)?;
            return Ok(String::new());
        }
    };
    if found.var.value.is_empty() {
        return Ok(String::new());
    }

    // Grant the called variable a self-reference budget for the duration
    // of this call, then expand a reference to it so the usual expansion
    // bookkeeping applies.
    if let Some(live) = exp.store.var_mut(found.scope, fname) {
        live.exp_count = EXP_COUNT_MAX;
    }
    let reference = format!("$({})", fname);
    let result = exp.expand_fresh(&reference);
    if let Some(live) = exp.store.var_mut(found.scope, fname) {
        live.exp_count = 0;
    }
    result
}

pub(crate) fn func_origin(exp: &mut Expander, args: &[String]) -> Result<String, ExpandError> {
    Ok(match exp.store.lookup(&args[0]) {
        Some(found) => found.var.origin.keyword().to_string(),
        None => "undefined".to_string(),
    })
}

pub(crate) fn func_flavor(exp: &mut Expander, args: &[String]) -> Result<String, ExpandError> {
    Ok(match exp.store.lookup(&args[0]) {
        Some(found) => found.var.flavor.keyword().to_string(),
        None => "undefined".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use crate::engine::Expander;
    use crate::errors::ExpandError;
    use crate::vars::variable::{Flavor, Origin};

    fn expander() -> Expander {
        Expander::new()
    }

    fn define(exp: &mut Expander, name: &str, value: &str) {
        exp.store_mut().define(name, value, Flavor::Recursive, Origin::File);
    }

    #[test]
    fn test_if_takes_then_branch() {
        let mut exp = expander();
        assert_eq!(exp.expand("$(if yes,then,else)").unwrap(), "then");
        assert_eq!(exp.expand("$(if ,then,else)").unwrap(), "else");
    }

    #[test]
    fn test_if_without_else_branch() {
        let mut exp = expander();
        assert_eq!(exp.expand("$(if ,then)").unwrap(), "");
    }

    #[test]
    fn test_if_condition_is_expanded() {
        let mut exp = expander();
        define(&mut exp, "empty", "");
        assert_eq!(exp.expand("$(if $(empty),then,else)").unwrap(), "else");
    }

    #[test]
    fn test_if_untaken_branch_is_never_expanded() {
        let mut exp = expander();
        // Expanding the bomb would blow up, so taking the other branch
        // proves it stayed untouched.
        define(&mut exp, "bomb", "$(bomb)");
        assert_eq!(exp.expand("$(if yes,safe,$(bomb))").unwrap(), "safe");
        assert_eq!(exp.expand("$(if ,$(bomb),safe)").unwrap(), "safe");
    }

    #[test]
    fn test_or_returns_first_truthy_expansion() {
        let mut exp = expander();
        define(&mut exp, "A", "");
        define(&mut exp, "B", "bee");
        assert_eq!(exp.expand("$(or $(A),$(B),$(bomb))").unwrap(), "bee");
    }

    #[test]
    fn test_or_all_empty() {
        let mut exp = expander();
        assert_eq!(exp.expand("$(or ,,)").unwrap(), "");
    }

    #[test]
    fn test_or_is_lazy_past_the_first_truthy() {
        let mut exp = expander();
        define(&mut exp, "bomb", "$(bomb)");
        assert_eq!(exp.expand("$(or win,$(bomb))").unwrap(), "win");
    }

    #[test]
    fn test_and_returns_last_expansion_when_all_truthy() {
        let mut exp = expander();
        define(&mut exp, "A", "aaa");
        define(&mut exp, "B", "bbb");
        assert_eq!(exp.expand("$(and $(A),$(B))").unwrap(), "bbb");
    }

    #[test]
    fn test_and_stops_at_first_empty() {
        let mut exp = expander();
        define(&mut exp, "bomb", "$(bomb)");
        define(&mut exp, "empty", "");
        assert_eq!(exp.expand("$(and $(empty),$(bomb))").unwrap(), "");
        assert_eq!(exp.expand("$(and ,$(bomb))").unwrap(), "");
    }

    #[test]
    fn test_foreach_expands_body_per_word() {
        let mut exp = expander();
        assert_eq!(exp.expand("$(foreach v,a b c,[$(v)])").unwrap(), "[a] [b] [c]");
    }

    #[test]
    fn test_foreach_empty_list() {
        let mut exp = expander();
        assert_eq!(exp.expand("$(foreach v,,[$(v)])").unwrap(), "");
    }

    #[test]
    fn test_foreach_loop_variable_shadows_outer() {
        let mut exp = expander();
        define(&mut exp, "v", "outer");
        assert_eq!(exp.expand("$(foreach v,x y,$(v))").unwrap(), "x y");
        assert_eq!(exp.expand("$(v)").unwrap(), "outer");
    }

    #[test]
    fn test_foreach_list_is_expanded_once() {
        let mut exp = expander();
        define(&mut exp, "list", "1 2");
        assert_eq!(exp.expand("$(foreach n,$(list),<$(n)>)").unwrap(), "<1> <2>");
    }

    #[test]
    fn test_call_binds_numbered_arguments() {
        let mut exp = expander();
        define(&mut exp, "join2", "$(1)-$(2)");
        assert_eq!(exp.expand("$(call join2,a,b)").unwrap(), "a-b");
    }

    #[test]
    fn test_call_zero_is_function_name() {
        let mut exp = expander();
        define(&mut exp, "me", "I am $(0)");
        assert_eq!(exp.expand("$(call me)").unwrap(), "I am me");
    }

    #[test]
    fn test_call_missing_argument_is_empty() {
        let mut exp = expander();
        define(&mut exp, "pair", "[$(1)][$(2)]");
        assert_eq!(exp.expand("$(call pair,only)").unwrap(), "[only][]");
    }

    #[test]
    fn test_call_empty_name_is_noop() {
        let mut exp = expander();
        assert_eq!(exp.expand("$(call )").unwrap(), "");
    }

    #[test]
    fn test_call_undefined_name_warns() {
        let mut exp = expander();
        assert_eq!(exp.expand("$(call nothing,a)").unwrap(), "");
        let reported = exp.diagnostics().reported();
        assert_eq!(reported.len(), 1);
        assert_eq!(reported[0].message, "undefined variable 'nothing'");
    }

    #[test]
    fn test_call_builtin_by_name() {
        let mut exp = expander();
        assert_eq!(exp.expand("$(call words,a b c)").unwrap(), "3");
    }

    #[test]
    fn test_call_variable_may_reference_itself() {
        let mut exp = expander();
        // Without the budget granted by call, a self-reference like this
        // would be fatal.
        define(&mut exp, "dup", "$(1)$(if $(2),$(call dup,$(2)))");
        assert_eq!(exp.expand("$(call dup,a,b)").unwrap(), "ab");
    }

    #[test]
    fn test_inner_call_hides_outer_arguments() {
        let mut exp = expander();
        define(&mut exp, "inner", "<$(2)>");
        define(&mut exp, "outer", "$(call inner,$(1))");
        assert_eq!(exp.expand("$(call outer,x,y)").unwrap(), "<>");
    }

    #[test]
    fn test_call_scope_is_removed_afterward() {
        let mut exp = expander();
        define(&mut exp, "fn", "$(1)");
        assert_eq!(exp.expand("$(call fn,arg)").unwrap(), "arg");
        assert_eq!(exp.expand("$(1)").unwrap(), "");
        assert_eq!(exp.store().current_scope(), exp.store().global_scope());
    }

    #[test]
    fn test_origin_keywords() {
        let mut exp = expander();
        define(&mut exp, "filevar", "x");
        exp.store_mut().define("cmdvar", "y", Flavor::Recursive, Origin::CommandLine);
        assert_eq!(exp.expand("$(origin filevar)").unwrap(), "file");
        assert_eq!(exp.expand("$(origin cmdvar)").unwrap(), "command line");
        assert_eq!(exp.expand("$(origin nosuch)").unwrap(), "undefined");
    }

    #[test]
    fn test_flavor_keywords() {
        let mut exp = expander();
        define(&mut exp, "rec", "x");
        exp.store_mut().define("sim", "y", Flavor::Simple, Origin::File);
        assert_eq!(exp.expand("$(flavor rec)").unwrap(), "recursive");
        assert_eq!(exp.expand("$(flavor sim)").unwrap(), "simple");
        assert_eq!(exp.expand("$(flavor nosuch)").unwrap(), "undefined");
    }

    #[test]
    fn test_origin_does_not_expand_the_variable() {
        let mut exp = expander();
        define(&mut exp, "bomb", "$(bomb)");
        assert_eq!(exp.expand("$(origin bomb)").unwrap(), "file");
    }
}
