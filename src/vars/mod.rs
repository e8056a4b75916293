//! Variables and Scopes
//!
//! - `variable`: the per-variable record, flavors, and origins
//! - `store`: the scope arena, chain lookups, and privacy boundaries

pub mod store;
pub mod variable;
