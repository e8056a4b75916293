//! Built-in Functions
//!
//! The function table and the dispatch path the scanner calls into:
//! - a name directly after `$(` or `${`, followed by whitespace, is a
//!   candidate function invocation
//! - the invocation runs to the matching closing delimiter, counting
//!   nested delimiters of the same kind only
//! - arguments split at top-level commas; once the table's maximum is
//!   reached the rest of the text rides along in the last argument
//! - arguments are pre-expanded unless the entry opts out, which is how
//!   the conditionals get their laziness

use crate::engine::Expander;
use crate::errors::ExpandError;
use std::collections::HashMap;

mod control;
mod text;

/// Signature shared by every built-in function.
pub type FunctionImpl = fn(&mut Expander, &[String]) -> Result<String, ExpandError>;

/// One table entry: arity bounds and argument policy.
#[derive(Debug, Clone, Copy)]
pub struct FunctionEntry {
    pub min_args: usize,
    /// Zero means unbounded.
    pub max_args: usize,
    /// Expand each argument before the call. When false the function
    /// receives the raw text and decides what to expand itself.
    pub expand_args: bool,
    pub func: FunctionImpl,
}

static DEFAULT_FUNCTIONS: &[(&str, FunctionEntry)] = &[
    ("subst", FunctionEntry { min_args: 3, max_args: 3, expand_args: true, func: text::func_subst }),
    ("patsubst", FunctionEntry { min_args: 3, max_args: 3, expand_args: true, func: text::func_patsubst }),
    ("strip", FunctionEntry { min_args: 1, max_args: 1, expand_args: true, func: text::func_strip }),
    ("filter", FunctionEntry { min_args: 2, max_args: 2, expand_args: true, func: text::func_filter }),
    ("filter-out", FunctionEntry { min_args: 2, max_args: 2, expand_args: true, func: text::func_filter_out }),
    ("words", FunctionEntry { min_args: 1, max_args: 1, expand_args: true, func: text::func_words }),
    ("word", FunctionEntry { min_args: 2, max_args: 2, expand_args: true, func: text::func_word }),
    ("firstword", FunctionEntry { min_args: 1, max_args: 1, expand_args: true, func: text::func_firstword }),
    ("lastword", FunctionEntry { min_args: 1, max_args: 1, expand_args: true, func: text::func_lastword }),
    ("if", FunctionEntry { min_args: 2, max_args: 3, expand_args: false, func: control::func_if }),
    ("or", FunctionEntry { min_args: 1, max_args: 0, expand_args: false, func: control::func_or }),
    ("and", FunctionEntry { min_args: 1, max_args: 0, expand_args: false, func: control::func_and }),
    ("foreach", FunctionEntry { min_args: 3, max_args: 3, expand_args: false, func: control::func_foreach }),
    ("call", FunctionEntry { min_args: 1, max_args: 0, expand_args: true, func: control::func_call }),
    ("origin", FunctionEntry { min_args: 1, max_args: 1, expand_args: true, func: control::func_origin }),
    ("flavor", FunctionEntry { min_args: 1, max_args: 1, expand_args: true, func: control::func_flavor }),
];

/// The set of functions an engine dispatches to, extensible at runtime.
#[derive(Debug, Clone)]
pub struct FunctionTable {
    entries: HashMap<String, FunctionEntry>,
}

impl Default for FunctionTable {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl FunctionTable {
    /// A table holding every built-in.
    pub fn with_defaults() -> Self {
        let entries = DEFAULT_FUNCTIONS
            .iter()
            .map(|(name, entry)| (name.to_string(), *entry))
            .collect();
        FunctionTable { entries }
    }

    /// A table with no functions at all; every `$(name ...)` is then an
    /// ordinary variable reference.
    pub fn empty() -> Self {
        FunctionTable { entries: HashMap::new() }
    }

    /// Add or replace a function.
    pub fn register(&mut self, name: impl Into<String>, entry: FunctionEntry) {
        self.entries.insert(name.into(), entry);
    }

    pub fn get(&self, name: &str) -> Option<FunctionEntry> {
        self.entries.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }
}

/// Try to treat the reference body starting at `beg` as a function
/// invocation. On success the result has been appended to the output
/// buffer and the offset of the invocation's closing delimiter is
/// returned; `None` means this is not a function and the caller should
/// parse a variable reference instead.
pub(crate) fn handle_function(
    exp: &mut Expander,
    s: &str,
    beg: usize,
    open: u8,
    close: u8,
) -> Result<Option<usize>, ExpandError> {
    let bytes = s.as_bytes();

    // Function names are lowercase words, possibly hyphenated, and must
    // be followed by whitespace or the end of the input.
    let mut ne = beg;
    while ne < s.len() && (bytes[ne].is_ascii_lowercase() || bytes[ne] == b'-') {
        ne += 1;
    }
    if ne == beg || (ne < s.len() && !bytes[ne].is_ascii_whitespace()) {
        return Ok(None);
    }
    let name = &s[beg..ne];
    let entry = match exp.functions.get(name) {
        Some(entry) => entry,
        None => return Ok(None),
    };

    // Arguments start after the blanks that follow the name.
    let mut argbeg = ne;
    while argbeg < s.len() && (bytes[argbeg] == b' ' || bytes[argbeg] == b'\t') {
        argbeg += 1;
    }

    // Find the invocation's closing delimiter, skipping balanced pairs
    // of the same kind.
    let mut count = 0i32;
    let mut end = None;
    let mut q = argbeg;
    while q < s.len() {
        if bytes[q] == open {
            count += 1;
        } else if bytes[q] == close {
            count -= 1;
            if count < 0 {
                end = Some(q);
                break;
            }
        }
        q += 1;
    }
    let end = match end {
        Some(end) => end,
        None => {
            return Err(ExpandError::UnterminatedCall {
                name: name.to_string(),
                missing: close as char,
                location: exp.blame(),
            })
        }
    };

    let raw = split_args(&s[argbeg..end], open, close, entry.max_args);
    let args = if entry.expand_args {
        let mut expanded = Vec::with_capacity(raw.len());
        for arg in &raw {
            expanded.push(exp.expand_fresh(arg)?);
        }
        expanded
    } else {
        raw
    };

    let result = invoke(exp, name, entry, &args)?;
    exp.out.append(&result);
    Ok(Some(end))
}

/// Check arity and call the function.
pub(crate) fn invoke(
    exp: &mut Expander,
    name: &str,
    entry: FunctionEntry,
    args: &[String],
) -> Result<String, ExpandError> {
    if args.len() < entry.min_args {
        return Err(ExpandError::InsufficientArguments {
            name: name.to_string(),
            found: args.len(),
            location: exp.blame(),
        });
    }
    tracing::trace!(function = name, argc = args.len(), "dispatching builtin");
    (entry.func)(exp, args)
}

/// Split an invocation body at top-level commas. Only delimiters of the
/// invocation's own kind shield a comma. With a nonzero `max`, the split
/// stops one short of it and the rest stays in the final argument. There
/// is always at least one argument, possibly empty.
fn split_args(body: &str, open: u8, close: u8, max: usize) -> Vec<String> {
    let bytes = body.as_bytes();
    let mut args = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, &b) in bytes.iter().enumerate() {
        if b == open {
            depth += 1;
        } else if b == close {
            depth = depth.saturating_sub(1);
        } else if b == b',' && depth == 0 {
            if max > 0 && args.len() + 1 == max {
                break;
            }
            args.push(body[start..i].to_string());
            start = i + 1;
        }
    }
    args.push(body[start..].to_string());
    args
}
