//! Reference Scanner
//!
//! The scan loop that turns text containing `$` references into output:
//! - literal runs are copied through untouched
//! - `$$` collapses to a single `$`; a `$` at the end of the input or
//!   before whitespace also stands for itself
//! - `$(...)` and `${...}` go through function dispatch first, then
//!   substitution-reference parsing, then plain variable lookup
//! - `$x` is a reference to the one-character variable `x`
//! - a `$` inside a delimited body pre-expands the body before lookup

use crate::engine::Expander;
use crate::errors::ExpandError;
use crate::expand::subst::substref_expand;
use crate::expand::value;
use crate::functions;
use crate::vars::variable::Flavor;

/// Expand `input`, appending the result to the engine's output buffer.
pub(crate) fn scan_into(exp: &mut Expander, input: &str) -> Result<(), ExpandError> {
    exp.enter_nested()?;
    let result = scan_inner(exp, input);
    exp.leave_nested();
    result
}

fn scan_inner(exp: &mut Expander, s: &str) -> Result<(), ExpandError> {
    let bytes = s.as_bytes();
    let mut p = 0;

    loop {
        // Copy the literal run up to the next reference.
        let dollar = match s[p..].find('$') {
            Some(off) => p + off,
            None => {
                exp.out.append(&s[p..]);
                break;
            }
        };
        exp.out.append(&s[p..dollar]);
        p = dollar + 1;

        if p >= s.len() {
            // A trailing dollar stands for itself.
            exp.out.push('$');
            break;
        }

        match bytes[p] {
            b'$' => {
                // $$ collapses to one dollar.
                exp.out.push('$');
                p += 1;
            }
            b'(' | b'{' => {
                let open = bytes[p];
                let close = if open == b'(' { b')' } else { b'}' };
                p = resolve_reference(exp, s, p + 1, open, close)?;
                if p >= s.len() {
                    break;
                }
                p += 1;
            }
            b if b.is_ascii_whitespace() => {
                // A dollar before whitespace stands for itself; the
                // whitespace is left for the next literal run.
                exp.out.push('$');
            }
            _ => {
                // A dollar followed by any other character is a reference
                // to the one-character variable it names.
                let len = s[p..].chars().next().map_or(1, |c| c.len_utf8());
                value::expand_variable_ref(exp, &s[p..p + len])?;
                p += len;
            }
        }
    }
    Ok(())
}

/// Resolve one delimited reference whose body starts at `beg`. Returns the
/// input offset of the last character consumed, or the input length when
/// the rest of the input was swallowed by an unmatched opener.
fn resolve_reference(
    exp: &mut Expander,
    s: &str,
    beg: usize,
    open: u8,
    close: u8,
) -> Result<usize, ExpandError> {
    // Built-in functions are recognized before anything else.
    if let Some(end) = functions::handle_function(exp, s, beg, open, close)? {
        return Ok(end);
    }

    let end = match s[beg..].find(close as char) {
        Some(off) => beg + off,
        None => return Err(ExpandError::UnterminatedReference { location: exp.blame() }),
    };

    // A reference inside the body is expanded before the body is used.
    // That needs the matching closer, which may lie beyond the first one.
    let mut expanded_body: Option<String> = None;
    let mut resume = end;
    if s[beg..end].contains('$') {
        let bytes = s.as_bytes();
        let mut count = 0i32;
        let mut matched = None;
        let mut q = beg;
        while q < s.len() {
            if bytes[q] == open {
                count += 1;
            } else if bytes[q] == close {
                count -= 1;
                if count < 0 {
                    matched = Some(q);
                    break;
                }
            }
            q += 1;
        }
        match matched {
            Some(q) => {
                expanded_body = Some(exp.expand_fresh(&s[beg..q])?);
                resume = q;
            }
            // Unmatched openers: fall back to treating the text up to the
            // first closer as a plain name, and end the scan here.
            None => resume = s.len(),
        }
    }
    let body = expanded_body.as_deref().unwrap_or(&s[beg..end]);

    // A colon followed later by an equals sign makes this a substitution
    // reference; a colon without one is an ordinary part of the name.
    let subst = body
        .find(':')
        .and_then(|c| body[c + 1..].find('=').map(|e| (c, c + 1 + e)));

    match subst {
        Some((colon, eq)) => {
            let name = &body[..colon];
            let pattern = &body[colon + 1..eq];
            let replace = &body[eq + 1..];
            match exp.store.lookup(name) {
                None => exp.warn_undefined(name)?,
                Some(found) => {
                    // The raw value decides whether there is anything to
                    // substitute at all.
                    if !found.var.value.is_empty() {
                        let value = if found.var.flavor == Flavor::Recursive {
                            value::recursively_expand(exp, &found)?
                        } else {
                            found.var.value.clone()
                        };
                        exp.out.append(&substref_expand(&value, pattern, replace));
                    }
                }
            }
        }
        None => value::expand_variable_ref(exp, body)?,
    }
    Ok(resume)
}

#[cfg(test)]
mod tests {
    use crate::engine::Expander;
    use crate::errors::ExpandError;
    use crate::vars::variable::{Flavor, Origin};

    fn expander_with(defs: &[(&str, &str)]) -> Expander {
        let mut exp = Expander::new();
        for (name, value) in defs {
            exp.store_mut().define(*name, *value, Flavor::Recursive, Origin::File);
        }
        exp
    }

    fn expand(exp: &mut Expander, text: &str) -> String {
        exp.expand(text).unwrap()
    }

    #[test]
    fn test_literal_text_passes_through() {
        let mut exp = expander_with(&[]);
        assert_eq!(expand(&mut exp, "plain text, no references"), "plain text, no references");
        assert_eq!(expand(&mut exp, ""), "");
    }

    #[test]
    fn test_dollar_dollar_collapses() {
        let mut exp = expander_with(&[]);
        assert_eq!(expand(&mut exp, "a$$b"), "a$b");
        assert_eq!(expand(&mut exp, "$$$$"), "$$");
    }

    #[test]
    fn test_trailing_dollar_is_literal() {
        let mut exp = expander_with(&[]);
        assert_eq!(expand(&mut exp, "abc$"), "abc$");
        assert_eq!(expand(&mut exp, "$"), "$");
    }

    #[test]
    fn test_dollar_before_whitespace_is_literal() {
        let mut exp = expander_with(&[]);
        assert_eq!(expand(&mut exp, "a$ b"), "a$ b");
        assert_eq!(expand(&mut exp, "a$\tb"), "a$\tb");
    }

    #[test]
    fn test_single_character_reference() {
        let mut exp = expander_with(&[("x", "hello")]);
        assert_eq!(expand(&mut exp, "$xY"), "helloY");
    }

    #[test]
    fn test_parenthesized_and_braced_references() {
        let mut exp = expander_with(&[("VAR", "value")]);
        assert_eq!(expand(&mut exp, "$(VAR)"), "value");
        assert_eq!(expand(&mut exp, "${VAR}"), "value");
    }

    #[test]
    fn test_mismatched_delimiter_is_part_of_name() {
        // ${VAR) never closes the brace reference.
        let mut exp = expander_with(&[("VAR", "value")]);
        let err = exp.expand("${VAR)").unwrap_err();
        assert!(matches!(err, ExpandError::UnterminatedReference { .. }));
    }

    #[test]
    fn test_unterminated_reference_fails() {
        let mut exp = expander_with(&[]);
        let err = exp.expand("$(FOO").unwrap_err();
        assert!(matches!(err, ExpandError::UnterminatedReference { .. }));
        let err = exp.expand("${FOO").unwrap_err();
        assert!(matches!(err, ExpandError::UnterminatedReference { .. }));
    }

    #[test]
    fn test_nested_reference_builds_name() {
        let mut exp = expander_with(&[("B", "oo"), ("fool", "win")]);
        assert_eq!(expand(&mut exp, "$(f$(B)l)"), "win");
    }

    #[test]
    fn test_unmatched_nested_opener_swallows_rest() {
        let mut exp = expander_with(&[("a", "anything")]);
        assert_eq!(expand(&mut exp, "$($(a) trailing text"), "");
        let reported = exp.diagnostics().reported();
        assert_eq!(reported.len(), 1);
        assert!(reported[0].message.contains("$(a"));
    }

    #[test]
    fn test_substitution_reference_suffix_form() {
        let mut exp = expander_with(&[("objects", "main.o util.o")]);
        assert_eq!(expand(&mut exp, "$(objects:.o=.c)"), "main.c util.c");
    }

    #[test]
    fn test_substitution_reference_percent_form() {
        let mut exp = expander_with(&[("sources", "a.c b.c")]);
        assert_eq!(expand(&mut exp, "$(sources:%.c=%.o)"), "a.o b.o");
    }

    #[test]
    fn test_substitution_reference_expands_recursive_value() {
        let mut exp = expander_with(&[("stem", "main"), ("files", "$(stem).txt notes.txt")]);
        assert_eq!(expand(&mut exp, "$(files:.txt=.md)"), "main.md notes.md");
    }

    #[test]
    fn test_substitution_reference_nested_pattern() {
        let mut exp = expander_with(&[("A", "x.c y.c"), ("B", ".c")]);
        assert_eq!(expand(&mut exp, "$(A:$(B)=.z)"), "x.z y.z");
    }

    #[test]
    fn test_substitution_reference_undefined_name_warns() {
        let mut exp = expander_with(&[]);
        assert_eq!(expand(&mut exp, "$(nope:.o=.c)"), "");
        let reported = exp.diagnostics().reported();
        assert_eq!(reported.len(), 1);
        assert_eq!(reported[0].message, "undefined variable 'nope'");
    }

    #[test]
    fn test_substitution_reference_empty_value_is_skipped() {
        let mut exp = expander_with(&[("empty", "")]);
        assert_eq!(expand(&mut exp, "$(empty:.o=.c)"), "");
        assert!(exp.diagnostics().reported().is_empty());
    }

    #[test]
    fn test_colon_without_equals_is_a_name() {
        let mut exp = expander_with(&[("a:b", "colon name")]);
        assert_eq!(expand(&mut exp, "$(a:b)"), "colon name");
    }

    #[test]
    fn test_equals_before_colon_is_a_name() {
        let mut exp = expander_with(&[("a=b", "equals name")]);
        assert_eq!(expand(&mut exp, "$(a=b)"), "equals name");
    }

    #[test]
    fn test_braces_and_parens_do_not_mix() {
        // The parenthesized body sees the brace pair as opaque text.
        let mut exp = expander_with(&[("VAR{1}", "odd")]);
        assert_eq!(expand(&mut exp, "$(VAR{1})"), "odd");
    }

    #[test]
    fn test_multibyte_single_character_reference() {
        let mut exp = expander_with(&[("é", "accent")]);
        assert_eq!(expand(&mut exp, "$é!"), "accent!");
    }

    #[test]
    fn test_undefined_reference_expands_empty() {
        let mut exp = expander_with(&[]);
        assert_eq!(expand(&mut exp, "a$(missing)b"), "ab");
    }
}
