//! Text Functions
//!
//! Word-list and substitution builtins. All of them receive their
//! arguments already expanded; words are runs of non-whitespace.

use crate::engine::Expander;
use crate::errors::ExpandError;
use crate::expand::subst::{pattern_matches, patsubst_expand, subst_expand};

pub(crate) fn func_subst(_exp: &mut Expander, args: &[String]) -> Result<String, ExpandError> {
    Ok(subst_expand(&args[2], &args[0], &args[1], false))
}

pub(crate) fn func_patsubst(_exp: &mut Expander, args: &[String]) -> Result<String, ExpandError> {
    Ok(patsubst_expand(&args[2], &args[0], &args[1]))
}

pub(crate) fn func_strip(_exp: &mut Expander, args: &[String]) -> Result<String, ExpandError> {
    let words: Vec<&str> = args[0].split_ascii_whitespace().collect();
    Ok(words.join(" "))
}

pub(crate) fn func_filter(_exp: &mut Expander, args: &[String]) -> Result<String, ExpandError> {
    Ok(filter_words(&args[1], &args[0], true))
}

pub(crate) fn func_filter_out(_exp: &mut Expander, args: &[String]) -> Result<String, ExpandError> {
    Ok(filter_words(&args[1], &args[0], false))
}

/// Keep or drop each word of `text` according to whether any pattern
/// matches it.
fn filter_words(text: &str, patterns: &str, keep_matching: bool) -> String {
    let patterns: Vec<&str> = patterns.split_ascii_whitespace().collect();
    let mut out = String::new();
    for word in text.split_ascii_whitespace() {
        let matched = patterns.iter().any(|p| pattern_matches(word, p));
        if matched == keep_matching {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(word);
        }
    }
    out
}

pub(crate) fn func_words(_exp: &mut Expander, args: &[String]) -> Result<String, ExpandError> {
    Ok(args[0].split_ascii_whitespace().count().to_string())
}

pub(crate) fn func_word(exp: &mut Expander, args: &[String]) -> Result<String, ExpandError> {
    let spec = args[0].trim_ascii();
    if spec.is_empty() || !spec.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ExpandError::InvalidFunctionArgument {
            message: "non-numeric first argument to 'word' function".to_string(),
            location: exp.blame(),
        });
    }
    // After the digit check only overflow can make the parse fail.
    let n = spec.parse::<usize>().unwrap_or(usize::MAX);
    if n == 0 {
        return Err(ExpandError::InvalidFunctionArgument {
            message: "first argument to 'word' function must be greater than 0".to_string(),
            location: exp.blame(),
        });
    }
    Ok(args[1]
        .split_ascii_whitespace()
        .nth(n - 1)
        .unwrap_or("")
        .to_string())
}

pub(crate) fn func_firstword(_exp: &mut Expander, args: &[String]) -> Result<String, ExpandError> {
    Ok(args[0].split_ascii_whitespace().next().unwrap_or("").to_string())
}

pub(crate) fn func_lastword(_exp: &mut Expander, args: &[String]) -> Result<String, ExpandError> {
    Ok(args[0].split_ascii_whitespace().next_back().unwrap_or("").to_string())
}
