//! Substitution Engine
//!
//! The text rewriting behind substitution references and the subst and
//! patsubst functions:
//! - straight find/replace, plain or anchored to word boundaries
//! - `%` patterns that split each word into prefix, stem, and suffix
//! - substitution references, where `a=b` means `%a=%b`

/// Offset of the first `%` in `s`, if any.
pub fn find_percent(s: &str) -> Option<usize> {
    s.find('%')
}

/// True when `word` matches `pattern`: equality, unless the pattern has a
/// `%`, which matches any stem between the pattern's prefix and suffix.
pub fn pattern_matches(word: &str, pattern: &str) -> bool {
    match find_percent(pattern) {
        Some(p) => {
            let prefix = &pattern[..p];
            let suffix = &pattern[p + 1..];
            word.len() >= prefix.len() + suffix.len()
                && word.starts_with(prefix)
                && word.ends_with(suffix)
        }
        None => word == pattern,
    }
}

fn is_word_char_boundary(text: &str, idx: usize) -> bool {
    idx == 0
        || text[..idx]
            .chars()
            .next_back()
            .map(|c| c.is_ascii_whitespace())
            .unwrap_or(true)
}

fn is_word_end_boundary(text: &str, idx: usize) -> bool {
    idx == text.len()
        || text[idx..]
            .chars()
            .next()
            .map(|c| c.is_ascii_whitespace())
            .unwrap_or(true)
}

/// Replace occurrences of `from` with `to` in `text`. With `by_word` only
/// occurrences delimited by whitespace or the ends of the text qualify;
/// others are copied through unchanged.
///
/// An empty `from` without `by_word` appends `to` once. With `by_word`
/// there is nothing to anchor on and the text is returned unchanged.
pub fn subst_expand(text: &str, from: &str, to: &str, by_word: bool) -> String {
    if from.is_empty() {
        if by_word {
            return text.to_string();
        }
        let mut out = String::with_capacity(text.len() + to.len());
        out.push_str(text);
        out.push_str(to);
        return out;
    }

    let mut out = String::with_capacity(text.len());
    let mut pos = 0;
    while let Some(found) = text[pos..].find(from) {
        let at = pos + found;
        out.push_str(&text[pos..at]);
        let qualifies =
            !by_word || (is_word_char_boundary(text, at) && is_word_end_boundary(text, at + from.len()));
        out.push_str(if qualifies { to } else { from });
        pos = at + from.len();
    }
    out.push_str(&text[pos..]);
    out
}

/// One side of a `%` pattern, split at its wildcard.
#[derive(Debug, Clone, Copy)]
struct SplitPattern<'a> {
    prefix: &'a str,
    suffix: &'a str,
}

/// Rewrite each whitespace-separated word of `text` that matches
/// `prefix`...`suffix` into `rep_pre` stem `rep_post`. A `rep_post` of
/// `None` means the replacement has no `%` and is emitted literally.
/// Non-matching words are copied through. Matching words whose
/// replacement is literally empty are dropped entirely. Word separators
/// collapse to single spaces.
fn percent_rewrite(
    text: &str,
    pattern: SplitPattern<'_>,
    rep_pre: &str,
    rep_post: Option<&str>,
) -> String {
    let mut out = String::with_capacity(text.len());
    let mut doneany = false;

    for word in text.split_ascii_whitespace() {
        let matched = word.len() >= pattern.prefix.len() + pattern.suffix.len()
            && word.starts_with(pattern.prefix)
            && word.ends_with(pattern.suffix);
        if matched {
            let stem = &word[pattern.prefix.len()..word.len() - pattern.suffix.len()];
            out.push_str(rep_pre);
            if let Some(post) = rep_post {
                out.push_str(stem);
                out.push_str(post);
            }
        } else {
            out.push_str(word);
        }

        // A matched word rewritten to nothing contributes no separator.
        let deleted = matched && rep_pre.is_empty() && rep_post.is_none();
        if !deleted {
            out.push(' ');
            doneany = true;
        }
    }
    if doneany {
        out.pop();
    }
    out
}

/// Expand a substitution reference suffix pair against `text`. The pair
/// `a=b` behaves as the pattern `%a` with replacement `%b`; an explicit
/// `%` in `pattern` switches to full pattern matching, where `replace`
/// keeps its leading literal and everything from its own `%` on.
pub fn substref_expand(text: &str, pattern: &str, replace: &str) -> String {
    match find_percent(pattern) {
        Some(_) => patsubst_expand(text, pattern, replace),
        // No wildcard: the whole pattern is a suffix and the whole
        // replacement follows the stem.
        None => percent_rewrite(text, SplitPattern { prefix: "", suffix: pattern }, "", Some(replace)),
    }
}

/// Expand a patsubst-style pattern against `text`. Without a `%` in
/// `pattern` this degenerates to whole-word find/replace.
pub fn patsubst_expand(text: &str, pattern: &str, replace: &str) -> String {
    match find_percent(pattern) {
        Some(p) => {
            let split = SplitPattern { prefix: &pattern[..p], suffix: &pattern[p + 1..] };
            match find_percent(replace) {
                Some(r) => percent_rewrite(text, split, &replace[..r], Some(&replace[r + 1..])),
                None => percent_rewrite(text, split, replace, None),
            }
        }
        None => subst_expand(text, pattern, replace, true),
    }
}
