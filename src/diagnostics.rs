//! Warning Policy
//!
//! Layered control over the engine's non-fatal diagnostics:
//! - four warning kinds, each resolvable to ignore/warn/error
//! - two override layers (command line beats runtime settings beat defaults)
//! - a decoder for `kind[:action]` specification lists
//! - `report`, which drops, records, or escalates a diagnostic
//!
//! Every call to `report` is recorded regardless of the resolved action, so
//! callers can inspect exactly which diagnostics a given expansion raised;
//! the action only controls logging and escalation.

use crate::errors::{ExpandError, SourceLocation};
use serde::Serialize;
use std::fmt;

/// Number of distinct warning kinds.
const KIND_COUNT: usize = 4;

/// The diagnostics the engine and its collaborators can raise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum WarningKind {
    /// A circular prerequisite was dropped. Raised by the dependency graph,
    /// never by the expansion engine; carried here so one policy covers both.
    CircularDep,
    /// A reference used a name no variable could legally have.
    InvalidRef,
    /// A definition used a name no variable should have.
    InvalidVar,
    /// A reference to a variable with no definition anywhere in scope.
    UndefinedVar,
}

impl WarningKind {
    pub const ALL: [WarningKind; KIND_COUNT] = [
        WarningKind::CircularDep,
        WarningKind::InvalidRef,
        WarningKind::InvalidVar,
        WarningKind::UndefinedVar,
    ];

    /// The canonical name used in warning specifications.
    pub fn name(self) -> &'static str {
        match self {
            WarningKind::CircularDep => "circular-dep",
            WarningKind::InvalidRef => "invalid-ref",
            WarningKind::InvalidVar => "invalid-var",
            WarningKind::UndefinedVar => "undefined-var",
        }
    }

    fn from_name(name: &str) -> Option<WarningKind> {
        WarningKind::ALL
            .iter()
            .copied()
            .find(|k| k.name().eq_ignore_ascii_case(name))
    }

    fn index(self) -> usize {
        match self {
            WarningKind::CircularDep => 0,
            WarningKind::InvalidRef => 1,
            WarningKind::InvalidVar => 2,
            WarningKind::UndefinedVar => 3,
        }
    }
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// What to do when a given warning is reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WarningAction {
    /// No opinion at this layer; defer to the next one down.
    #[default]
    Unset,
    Ignore,
    Warn,
    Error,
}

impl WarningAction {
    /// The canonical name used in warning specifications. `Unset` has none.
    pub fn name(self) -> &'static str {
        match self {
            WarningAction::Unset => "",
            WarningAction::Ignore => "ignore",
            WarningAction::Warn => "warn",
            WarningAction::Error => "error",
        }
    }

    fn from_name(name: &str) -> Option<WarningAction> {
        [WarningAction::Ignore, WarningAction::Warn, WarningAction::Error]
            .iter()
            .copied()
            .find(|a| a.name().eq_ignore_ascii_case(name))
    }
}

/// One layer of settings: a global action plus per-kind overrides.
#[derive(Debug, Clone, Copy, Default)]
struct WarningSettings {
    global: WarningAction,
    actions: [WarningAction; KIND_COUNT],
}

/// A diagnostic that went through `report`.
#[derive(Debug, Clone, Serialize)]
pub struct Warning {
    pub kind: WarningKind,
    pub action: WarningAction,
    pub location: Option<SourceLocation>,
    pub message: String,
}

/// The resolved warning policy plus the record of everything reported.
#[derive(Debug, Clone)]
pub struct Diagnostics {
    defaults: WarningSettings,
    runtime: WarningSettings,
    flag: WarningSettings,
    active: [WarningAction; KIND_COUNT],
    reported: Vec<Warning>,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new()
    }
}

impl Diagnostics {
    pub fn new() -> Self {
        // Every kind needs a default. Undefined references are common in
        // real makefiles, so they stay quiet unless asked for.
        let mut defaults = WarningSettings {
            global: WarningAction::Warn,
            actions: [WarningAction::Warn; KIND_COUNT],
        };
        defaults.actions[WarningKind::UndefinedVar.index()] = WarningAction::Ignore;

        let mut d = Diagnostics {
            defaults,
            runtime: WarningSettings::default(),
            flag: WarningSettings::default(),
            active: [WarningAction::Unset; KIND_COUNT],
            reported: Vec::new(),
        };
        d.recompute();
        d
    }

    /// The action currently in effect for a kind.
    pub fn action(&self, kind: WarningKind) -> WarningAction {
        self.active[kind.index()]
    }

    /// Decode a command-line warning specification. Unknown names are fatal.
    pub fn decode_flag(&mut self, spec: &str) -> Result<(), ExpandError> {
        let mut settings = self.flag;
        decode_into(&mut settings, spec, true)?;
        self.flag = settings;
        self.recompute();
        Ok(())
    }

    /// Decode a runtime warning specification (the settable-variable layer).
    /// Unknown names are logged and skipped; an empty specification resets
    /// the whole layer.
    pub fn decode_runtime(&mut self, spec: &str) {
        if spec.trim().is_empty() {
            self.runtime = WarningSettings::default();
        } else {
            let mut settings = self.runtime;
            // Errors are impossible in lenient mode.
            let _ = decode_into(&mut settings, spec, false);
            self.runtime = settings;
        }
        self.recompute();
    }

    /// Report a diagnostic. The resolved action decides whether it is
    /// dropped, logged, or returned as a fatal error; either way the call
    /// is recorded.
    pub fn report(
        &mut self,
        kind: WarningKind,
        location: Option<SourceLocation>,
        message: impl Into<String>,
    ) -> Result<(), ExpandError> {
        let action = self.action(kind);
        let message = message.into();
        self.reported.push(Warning {
            kind,
            action,
            location: location.clone(),
            message: message.clone(),
        });

        match action {
            WarningAction::Error => Err(ExpandError::EscalatedWarning { kind, message, location }),
            WarningAction::Warn => {
                match &location {
                    Some(loc) => tracing::warn!(kind = kind.name(), "{}: warning: {}", loc, message),
                    None => tracing::warn!(kind = kind.name(), "warning: {}", message),
                }
                Ok(())
            }
            WarningAction::Ignore | WarningAction::Unset => Ok(()),
        }
    }

    /// Everything reported so far, in order.
    pub fn reported(&self) -> &[Warning] {
        &self.reported
    }

    /// Drop the report record, keeping the policy.
    pub fn clear_reported(&mut self) {
        self.reported.clear();
    }

    /// Resolve the effective action per kind: command-line overrides beat
    /// runtime overrides beat defaults, and within each layer a per-kind
    /// action beats the layer's global one.
    fn recompute(&mut self) {
        for kind in WarningKind::ALL {
            let i = kind.index();
            self.active[i] = [
                self.flag.actions[i],
                self.flag.global,
                self.runtime.actions[i],
                self.runtime.global,
                self.defaults.actions[i],
            ]
            .into_iter()
            .find(|a| *a != WarningAction::Unset)
            .unwrap_or(WarningAction::Warn);
        }
    }
}

/// Parse a comma/blank separated list of `action` or `kind[:action]` items
/// into one settings layer. A bare kind enables it at `warn`.
fn decode_into(
    settings: &mut WarningSettings,
    spec: &str,
    strict: bool,
) -> Result<(), ExpandError> {
    for item in spec.split(|c: char| c == ',' || c.is_ascii_whitespace()) {
        if item.is_empty() {
            continue;
        }

        // A bare action applies globally.
        if let Some(action) = WarningAction::from_name(item) {
            settings.global = action;
            continue;
        }

        let (name, action_name) = match item.split_once(':') {
            None => (item, None),
            Some((name, action)) => (name, Some(action)),
        };

        let kind = match WarningKind::from_name(name) {
            Some(kind) => kind,
            None => {
                if strict {
                    return Err(ExpandError::UnknownWarning { name: name.to_string() });
                }
                tracing::warn!("unknown warning '{}': ignored", name);
                continue;
            }
        };
        let action = match action_name {
            None => WarningAction::Warn,
            Some(text) => match WarningAction::from_name(text) {
                Some(action) => action,
                None => {
                    if strict {
                        return Err(ExpandError::UnknownWarningAction { name: text.to_string() });
                    }
                    tracing::warn!("unknown warning action '{}': ignored", text);
                    continue;
                }
            },
        };

        settings.actions[kind.index()] = action;
    }
    Ok(())
}
