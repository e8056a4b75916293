//! Expansion Machinery
//!
//! - `buffer`: the shared output buffer and its save/restore discipline
//! - `scanner`: the `$`-reference scan loop
//! - `subst`: pattern and substitution text rewriting
//! - `value`: variable lookup, self-reference detection, append chains

pub mod buffer;
pub(crate) mod scanner;
pub mod subst;
pub(crate) mod value;
