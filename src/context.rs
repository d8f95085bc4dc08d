//! Session context shared across one pipeline run.
//!
//! [`SessionContext`] is a mutable, versioned bag of named fields. Steps
//! write to it; providers and the assistance facade only ever see a
//! [`ContextSnapshot`] taken at request time. Once a field is set, its value
//! type is fixed for the session: a later `set` with a different type fails
//! with [`ContextError::TypeConflict`] and leaves the stored value intact.

use crate::config::Mode;
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;

/// Errors from context mutation.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ContextError {
    #[error("field '{field}' already holds a {existing} value, refusing to store {incoming}")]
    TypeConflict {
        field: String,
        existing: &'static str,
        incoming: &'static str,
    },
}

/// A typed value stored in the session context.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ContextValue {
    Bool(bool),
    Int(i64),
    Text(String),
    List(Vec<String>),
    Json(serde_json::Value),
}

impl ContextValue {
    /// Type label used in conflict errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Text(_) => "text",
            Self::List(_) => "list",
            Self::Json(_) => "json",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for ContextValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for ContextValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for ContextValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ContextValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<String>> for ContextValue {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}

/// Mutable, versioned state bag owned by a pipeline run.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    fields: HashMap<String, ContextValue>,
    version: u64,
}

/// Immutable copy of the context handed to providers and the facade.
///
/// Never aliases the live context; a snapshot taken before a step's writes
/// does not observe them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextSnapshot {
    fields: HashMap<String, ContextValue>,
    version: u64,
}

impl ContextSnapshot {
    /// Read a field; `None` means the field was never set.
    pub fn get(&self, field: &str) -> Option<&ContextValue> {
        self.fields.get(field)
    }

    /// Context version this snapshot was taken at.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a field; `None` means the field was never set.
    pub fn get(&self, field: &str) -> Option<&ContextValue> {
        self.fields.get(field)
    }

    /// Set a field.
    ///
    /// Fails with [`ContextError::TypeConflict`] if the field already holds
    /// a value of a different type; the stored value is left untouched.
    pub fn set(
        &mut self,
        field: impl Into<String>,
        value: impl Into<ContextValue>,
    ) -> Result<(), ContextError> {
        let field = field.into();
        let value = value.into();
        if let Some(existing) = self.fields.get(&field) {
            if existing.kind() != value.kind() {
                return Err(ContextError::TypeConflict {
                    field,
                    existing: existing.kind(),
                    incoming: value.kind(),
                });
            }
        }
        self.fields.insert(field, value);
        self.version += 1;
        Ok(())
    }

    /// Take an immutable copy of the current state.
    pub fn snapshot(&self) -> ContextSnapshot {
        ContextSnapshot {
            fields: self.fields.clone(),
            version: self.version,
        }
    }

    /// Merge all fields from another context (a fan-out member's clone).
    ///
    /// Fields go through [`set`](Self::set), so the type-conflict rule
    /// applies when two siblings introduced the same field with different
    /// types.
    pub fn merge_from(&mut self, other: SessionContext) -> Result<(), ContextError> {
        for (field, value) in other.fields {
            if self.fields.get(&field) == Some(&value) {
                continue;
            }
            self.set(field, value)?;
        }
        Ok(())
    }

    /// Bumped on every successful `set`.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Set the well-known `mode` field.
    pub fn set_mode(&mut self, mode: Mode) -> Result<(), ContextError> {
        self.set("mode", mode.as_str())
    }

    /// Read the well-known `mode` field.
    pub fn mode(&self) -> Option<Mode> {
        self.get("mode")?.as_text()?.parse().ok()
    }

    /// Set the well-known `tracking` field.
    pub fn set_tracking(&mut self, tracking: bool) -> Result<(), ContextError> {
        self.set("tracking", tracking)
    }

    /// Read the well-known `tracking` field.
    pub fn tracking(&self) -> Option<bool> {
        self.get("tracking")?.as_bool()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_then_get() {
        let mut ctx = SessionContext::new();
        ctx.set("tracking", true).unwrap();
        assert_eq!(ctx.get("tracking"), Some(&ContextValue::Bool(true)));
    }

    #[test]
    fn test_get_before_set_is_absent() {
        let ctx = SessionContext::new();
        assert_eq!(ctx.get("mode"), None);
        assert_eq!(ctx.mode(), None);
    }

    #[test]
    fn test_type_conflict_keeps_original() {
        let mut ctx = SessionContext::new();
        ctx.set("mode", "advanced").unwrap();
        let err = ctx.set("mode", true).unwrap_err();
        assert_eq!(
            err,
            ContextError::TypeConflict {
                field: "mode".to_string(),
                existing: "text",
                incoming: "bool",
            }
        );
        assert_eq!(ctx.get("mode").unwrap().as_text(), Some("advanced"));
    }

    #[test]
    fn test_same_type_overwrite_allowed() {
        let mut ctx = SessionContext::new();
        ctx.set("mode", "basic").unwrap();
        ctx.set("mode", "advanced").unwrap();
        assert_eq!(ctx.mode(), Some(Mode::Advanced));
    }

    #[test]
    fn test_version_bumps_on_set() {
        let mut ctx = SessionContext::new();
        assert_eq!(ctx.version(), 0);
        ctx.set("a", 1i64).unwrap();
        ctx.set("b", 2i64).unwrap();
        assert_eq!(ctx.version(), 2);
    }

    #[test]
    fn test_snapshot_does_not_alias() {
        let mut ctx = SessionContext::new();
        ctx.set("mode", "basic").unwrap();
        let snap = ctx.snapshot();
        ctx.set("mode", "advanced").unwrap();
        assert_eq!(snap.get("mode").unwrap().as_text(), Some("basic"));
        assert_eq!(snap.version(), 1);
        assert_eq!(ctx.version(), 2);
    }

    #[test]
    fn test_merge_from_new_fields() {
        let mut ctx = SessionContext::new();
        ctx.set("mode", "advanced").unwrap();

        let mut member = ctx.clone();
        member.set("manifest", "written").unwrap();

        ctx.merge_from(member).unwrap();
        assert_eq!(ctx.get("manifest").unwrap().as_text(), Some("written"));
    }

    #[test]
    fn test_merge_conflicting_types_fails() {
        let mut ctx = SessionContext::new();
        ctx.set("flag", true).unwrap();

        let mut member = SessionContext::new();
        member.set("flag", "yes").unwrap();

        assert!(ctx.merge_from(member).is_err());
        assert_eq!(ctx.get("flag"), Some(&ContextValue::Bool(true)));
    }

    #[test]
    fn test_well_known_helpers() {
        let mut ctx = SessionContext::new();
        ctx.set_mode(Mode::Advanced).unwrap();
        ctx.set_tracking(true).unwrap();
        assert_eq!(ctx.mode(), Some(Mode::Advanced));
        assert_eq!(ctx.tracking(), Some(true));
    }
}
