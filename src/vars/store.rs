//! Variable Store
//!
//! An arena of variable scopes linked into chains:
//! - every scope holds its definitions in insertion order
//! - lookups walk from a scope toward the global root
//! - a link may be marked as a boundary, which hides private variables
//!   defined above it
//! - appends are pasted onto an existing value with a single space

use crate::errors::SourceLocation;
use crate::vars::variable::{Flavor, Origin, Variable};
use indexmap::IndexMap;
use lazy_static::lazy_static;
use regex_lite::Regex;

lazy_static! {
    /// A variable name is any non-empty run of non-whitespace characters.
    static ref VALID_NAME: Regex = Regex::new(r"^\S+$").unwrap();
}

/// True when `name` is acceptable as a variable name.
pub fn valid_variable_name(name: &str) -> bool {
    VALID_NAME.is_match(name)
}

/// Index of a scope inside a `VariableStore`.
pub type ScopeId = usize;

#[derive(Debug, Clone)]
struct Scope {
    vars: IndexMap<String, Variable>,
    parent: Option<ScopeId>,
    /// Private variables defined in the parent chain are invisible from
    /// here on.
    parent_is_boundary: bool,
}

/// A successful lookup: a snapshot of the variable plus where it lives.
#[derive(Debug, Clone)]
pub struct FoundVar {
    pub var: Variable,
    pub scope: ScopeId,
}

/// All scopes, with one distinguished global root and one current scope
/// that lookups and definitions default to.
#[derive(Debug, Clone)]
pub struct VariableStore {
    scopes: Vec<Scope>,
    global: ScopeId,
    current: ScopeId,
}

impl Default for VariableStore {
    fn default() -> Self {
        Self::new()
    }
}

impl VariableStore {
    pub fn new() -> Self {
        let root = Scope {
            vars: IndexMap::new(),
            parent: None,
            parent_is_boundary: false,
        };
        VariableStore {
            scopes: vec![root],
            global: 0,
            current: 0,
        }
    }

    pub fn global_scope(&self) -> ScopeId {
        self.global
    }

    pub fn current_scope(&self) -> ScopeId {
        self.current
    }

    /// Create a scope chained under `parent`.
    pub fn new_scope(&mut self, parent: ScopeId, parent_is_boundary: bool) -> ScopeId {
        let id = self.scopes.len();
        self.scopes.push(Scope {
            vars: IndexMap::new(),
            parent: Some(parent),
            parent_is_boundary,
        });
        id
    }

    /// Create a scope under the current one and make it current.
    pub fn push_scope(&mut self, parent_is_boundary: bool) -> ScopeId {
        let id = self.new_scope(self.current, parent_is_boundary);
        self.current = id;
        id
    }

    /// Make the current scope's parent current again. At the global root
    /// this is a no-op.
    pub fn pop_scope(&mut self) {
        if let Some(parent) = self.scopes[self.current].parent {
            self.current = parent;
        }
    }

    /// Switch the current scope, returning the previous one.
    pub fn set_current(&mut self, scope: ScopeId) -> ScopeId {
        std::mem::replace(&mut self.current, scope)
    }

    /// The parent link of a scope and whether crossing it is a boundary.
    pub fn scope_links(&self, scope: ScopeId) -> (Option<ScopeId>, bool) {
        let s = &self.scopes[scope];
        (s.parent, s.parent_is_boundary)
    }

    /// Look `name` up starting at the current scope.
    pub fn lookup(&self, name: &str) -> Option<FoundVar> {
        self.lookup_from(self.current, name)
    }

    /// Look `name` up starting at `scope`, walking parent links. Once the
    /// walk crosses a boundary link, private definitions no longer match.
    pub fn lookup_from(&self, scope: ScopeId, name: &str) -> Option<FoundVar> {
        let mut cursor = Some(scope);
        let mut is_parent = false;
        while let Some(id) = cursor {
            let s = &self.scopes[id];
            if let Some(var) = s.vars.get(name) {
                if !(var.private && is_parent) {
                    return Some(FoundVar { var: var.clone(), scope: id });
                }
            }
            is_parent |= s.parent_is_boundary;
            cursor = s.parent;
        }
        None
    }

    /// Look `name` up in exactly one scope, without walking the chain.
    pub fn lookup_only_in(&self, scope: ScopeId, name: &str) -> Option<&Variable> {
        self.scopes[scope].vars.get(name)
    }

    /// In-place access to a definition in a known scope.
    pub fn var_mut(&mut self, scope: ScopeId, name: &str) -> Option<&mut Variable> {
        self.scopes[scope].vars.get_mut(name)
    }

    /// Install `var` in `scope`, replacing any same-name definition there.
    pub fn insert(&mut self, scope: ScopeId, var: Variable) {
        self.scopes[scope].vars.insert(var.name.clone(), var);
    }

    /// Define a variable in the current scope.
    pub fn define(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
        flavor: Flavor,
        origin: Origin,
    ) -> &mut Variable {
        let var = Variable::new(name, value, flavor, origin);
        let scope = self.current;
        match self.scopes[scope].vars.entry(var.name.clone()) {
            indexmap::map::Entry::Occupied(mut e) => {
                e.insert(var);
                e.into_mut()
            }
            indexmap::map::Entry::Vacant(e) => e.insert(var),
        }
    }

    /// Paste `segment` onto the value of an existing definition, separated
    /// by one space unless the old value is empty.
    pub fn append_to(&mut self, scope: ScopeId, name: &str, segment: &str) -> bool {
        match self.scopes[scope].vars.get_mut(name) {
            Some(var) => {
                if var.value.is_empty() {
                    var.value = segment.to_string();
                } else {
                    var.value.push(' ');
                    var.value.push_str(segment);
                }
                true
            }
            None => false,
        }
    }

    /// All names defined in one scope, in definition order.
    pub fn names_in(&self, scope: ScopeId) -> impl Iterator<Item = &str> {
        self.scopes[scope].vars.keys().map(|s| s.as_str())
    }
}

/// Convenience for tests and command-line setup: a definition that also
/// records where it came from.
pub fn define_at(
    store: &mut VariableStore,
    name: &str,
    value: &str,
    flavor: Flavor,
    origin: Origin,
    location: Option<SourceLocation>,
) {
    let var = store.define(name, value, flavor, origin);
    var.location = location;
}
