//! Expansion Engine
//!
//! The engine object that owns everything one expansion session needs:
//! the variable store, the function table, the warning policy, the shared
//! output buffer, and the location bookkeeping for diagnostics. Public
//! entry points cover expanding text, expanding a named variable, and
//! defining variables with make-style `=`, `:=`, and `+=` semantics.

use crate::diagnostics::{Diagnostics, WarningKind};
use crate::errors::{ExpandError, SourceLocation};
use crate::expand::buffer::OutputBuffer;
use crate::expand::scanner;
use crate::expand::value;
use crate::functions::FunctionTable;
use crate::vars::store::{valid_variable_name, ScopeId, VariableStore};
use crate::vars::variable::{Flavor, Origin, Variable};

/// Hard ceiling on nested expansion, independent of the per-variable
/// self-reference accounting.
pub const MAX_EXPANSION_DEPTH: usize = 500;

/// Defining this variable adjusts the runtime warning settings.
const WARNINGS_VAR: &str = ".WARNINGS";

/// Saved state for a temporary switch to another scope.
#[derive(Debug)]
pub struct ScopeContext {
    prev_scope: ScopeId,
    prev_location: Option<SourceLocation>,
}

pub struct Expander {
    pub(crate) store: VariableStore,
    pub(crate) functions: FunctionTable,
    pub(crate) diagnostics: Diagnostics,
    pub(crate) out: OutputBuffer,
    /// Where the text being expanded comes from, if known.
    pub(crate) location: Option<SourceLocation>,
    /// The definition site of the variable currently being expanded;
    /// diagnostics prefer it over the reading location.
    pub(crate) expanding_location: Option<SourceLocation>,
    depth: usize,
    /// Highest numbered argument bound by the innermost `call`.
    pub(crate) call_max_args: usize,
}

impl Default for Expander {
    fn default() -> Self {
        Self::new()
    }
}

impl Expander {
    pub fn new() -> Self {
        Expander {
            store: VariableStore::new(),
            functions: FunctionTable::with_defaults(),
            diagnostics: Diagnostics::new(),
            out: OutputBuffer::new(),
            location: None,
            expanding_location: None,
            depth: 0,
            call_max_args: 0,
        }
    }

    pub fn store(&self) -> &VariableStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut VariableStore {
        &mut self.store
    }

    pub fn functions(&self) -> &FunctionTable {
        &self.functions
    }

    pub fn functions_mut(&mut self) -> &mut FunctionTable {
        &mut self.functions
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn diagnostics_mut(&mut self) -> &mut Diagnostics {
        &mut self.diagnostics
    }

    pub fn location(&self) -> Option<&SourceLocation> {
        self.location.as_ref()
    }

    pub fn set_location(&mut self, location: Option<SourceLocation>) {
        self.location = location;
    }

    /// Expand `text` in the current scope.
    pub fn expand(&mut self, text: &str) -> Result<String, ExpandError> {
        tracing::trace!(len = text.len(), "expanding text");
        self.expand_fresh(text)
    }

    /// Expand `text` with `scope` temporarily made current.
    pub fn expand_for_scope(&mut self, scope: ScopeId, text: &str) -> Result<String, ExpandError> {
        let ctx = self.enter_scope_context(scope, None);
        let result = self.expand_fresh(text);
        self.leave_scope_context(ctx);
        result
    }

    /// Expand the value of the variable `name`, as a `$(name)` reference
    /// would, including append accumulation and all diagnostics.
    pub fn expand_variable(&mut self, name: &str) -> Result<String, ExpandError> {
        let saved = self.out.install_fresh();
        match value::expand_variable_ref(self, name) {
            Ok(()) => Ok(self.out.swap(saved)),
            Err(e) => {
                self.out.restore(saved);
                Err(e)
            }
        }
    }

    /// Expand the value of `name` with `scope` temporarily made current.
    pub fn expand_variable_for_scope(
        &mut self,
        scope: ScopeId,
        name: &str,
    ) -> Result<String, ExpandError> {
        let ctx = self.enter_scope_context(scope, None);
        let result = self.expand_variable(name);
        self.leave_scope_context(ctx);
        result
    }

    /// Switch to `scope` and make `location` the reading location, which
    /// may be absent. The returned context must be handed back to
    /// `leave_scope_context`.
    pub fn enter_scope_context(
        &mut self,
        scope: ScopeId,
        location: Option<SourceLocation>,
    ) -> ScopeContext {
        let prev_scope = self.store.set_current(scope);
        let prev_location = std::mem::replace(&mut self.location, location);
        ScopeContext { prev_scope, prev_location }
    }

    pub fn leave_scope_context(&mut self, ctx: ScopeContext) {
        self.store.set_current(ctx.prev_scope);
        self.location = ctx.prev_location;
    }

    /// Define `name` in the current scope. Recursive values are stored
    /// verbatim; simple values are expanded here and now.
    pub fn define(
        &mut self,
        name: &str,
        value: &str,
        flavor: Flavor,
        origin: Origin,
    ) -> Result<(), ExpandError> {
        self.define_in_scope(self.store.current_scope(), name, value, flavor, origin)
    }

    /// Define `name` in an explicit scope. Simple values are expanded in
    /// the current scope chain before being stored.
    pub fn define_in_scope(
        &mut self,
        scope: ScopeId,
        name: &str,
        value: &str,
        flavor: Flavor,
        origin: Origin,
    ) -> Result<(), ExpandError> {
        let name = name.trim_ascii();
        if name.is_empty() {
            return Err(ExpandError::EmptyVariableName { location: self.blame() });
        }
        if !valid_variable_name(name) {
            let message = format!("invalid variable name '{}'", name);
            self.diagnostics.report(WarningKind::InvalidVar, self.blame(), message)?;
        }

        let stored = match flavor {
            Flavor::Simple => self.expand_fresh(value)?,
            Flavor::Recursive => value.to_string(),
        };
        let mut var = Variable::new(name, stored, flavor, origin);
        var.location = self.location.clone();
        self.store.insert(scope, var);

        self.sync_warning_settings(scope, name, flavor)?;
        Ok(())
    }

    /// Append to `name` in the current scope, make-style. With a
    /// definition already in this scope, the segment is pasted onto it.
    /// Otherwise a new definition is created here that extends whatever
    /// the chain provides, keeping the nearest definition's flavor. With
    /// no prior definition anywhere this is a plain recursive definition.
    pub fn append_define(
        &mut self,
        name: &str,
        value: &str,
        origin: Origin,
    ) -> Result<(), ExpandError> {
        let name = name.trim_ascii();
        if name.is_empty() {
            return Err(ExpandError::EmptyVariableName { location: self.blame() });
        }
        if !valid_variable_name(name) {
            let message = format!("invalid variable name '{}'", name);
            self.diagnostics.report(WarningKind::InvalidVar, self.blame(), message)?;
        }

        let scope = self.store.current_scope();
        let here = self.store.lookup_only_in(scope, name).map(|v| v.flavor);
        let flavor = match here {
            Some(flavor) => {
                // Simple variables take expanded text, recursive ones
                // take it verbatim; either way it lands on the old value.
                let segment = match flavor {
                    Flavor::Simple => self.expand_fresh(value)?,
                    Flavor::Recursive => value.to_string(),
                };
                self.store.append_to(scope, name, &segment);
                if let Some(live) = self.store.var_mut(scope, name) {
                    live.location = self.location.clone();
                }
                flavor
            }
            None => {
                let outer = self.store.lookup(name);
                let flavor = outer.as_ref().map(|f| f.var.flavor).unwrap_or(Flavor::Recursive);
                let stored = match flavor {
                    Flavor::Simple => self.expand_fresh(value)?,
                    Flavor::Recursive => value.to_string(),
                };
                let mut var = Variable::new(name, stored, flavor, origin);
                var.append = outer.is_some();
                var.location = self.location.clone();
                self.store.insert(scope, var);
                flavor
            }
        };

        self.sync_warning_settings(scope, name, flavor)?;
        Ok(())
    }

    /// When the warning-settings variable changes, re-decode its expanded
    /// value into the runtime layer.
    fn sync_warning_settings(
        &mut self,
        scope: ScopeId,
        name: &str,
        flavor: Flavor,
    ) -> Result<(), ExpandError> {
        if name != WARNINGS_VAR {
            return Ok(());
        }
        let raw = self
            .store
            .lookup_only_in(scope, name)
            .map(|v| v.value.clone())
            .unwrap_or_default();
        let spec = match flavor {
            Flavor::Simple => raw,
            Flavor::Recursive => self.expand_fresh(&raw)?,
        };
        self.diagnostics.decode_runtime(&spec);
        Ok(())
    }

    /// Expand into a fresh buffer, restoring the caller's buffer either way.
    pub(crate) fn expand_fresh(&mut self, input: &str) -> Result<String, ExpandError> {
        let saved = self.out.install_fresh();
        match scanner::scan_into(self, input) {
            Ok(()) => Ok(self.out.swap(saved)),
            Err(e) => {
                self.out.restore(saved);
                Err(e)
            }
        }
    }

    pub(crate) fn enter_nested(&mut self) -> Result<(), ExpandError> {
        if self.depth >= MAX_EXPANSION_DEPTH {
            return Err(ExpandError::DepthLimit {
                limit: MAX_EXPANSION_DEPTH,
                location: self.blame(),
            });
        }
        self.depth += 1;
        Ok(())
    }

    pub(crate) fn leave_nested(&mut self) {
        self.depth -= 1;
    }

    /// The location diagnostics should carry right now.
    pub(crate) fn blame(&self) -> Option<SourceLocation> {
        self.expanding_location.clone().or_else(|| self.location.clone())
    }

    pub(crate) fn warn_undefined(&mut self, name: &str) -> Result<(), ExpandError> {
        let message = format!("undefined variable '{}'", name);
        let location = self.blame();
        self.diagnostics.report(WarningKind::UndefinedVar, location, message)
    }

    /// A missing plain reference: whitespace in the name means the text
    /// was probably never meant to be a variable reference at all.
    pub(crate) fn report_missing_ref(&mut self, name: &str) -> Result<(), ExpandError> {
        if name.chars().any(|c| c.is_ascii_whitespace()) {
            let message = format!("invalid variable reference '{}'", name);
            let location = self.blame();
            self.diagnostics.report(WarningKind::InvalidRef, location, message)
        } else {
            self.warn_undefined(name)
        }
    }
}
