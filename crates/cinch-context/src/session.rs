//! Per-session side tables.
//!
//! The host owns its session type; this crate never adds fields to it.
//! Instead, engine state is bound to a [`SessionHandle`] in a
//! [`SessionRegistry`]. The lifecycle is explicit: the host binds a value
//! when a session opens and removes it when the session closes. Registries
//! are process-local and hold nothing serialized, so after a restart the
//! host must bind again; an unbound session reads back as `None` and the
//! engine treats it as "do nothing".
//!
//! Two handles never share a binding, even when their bound values are
//! structurally equal.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

// ── SessionHandle ──────────────────────────────────────────────────

/// Stable identifier for one conversation session.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct SessionHandle(String);

impl SessionHandle {
    /// Wrap an existing host identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random handle.
    pub fn generate() -> Self {
        Self(format!("ses-{}", uuid::Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionHandle {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for SessionHandle {
    fn from(id: String) -> Self {
        Self(id)
    }
}

// ── SessionRegistry ────────────────────────────────────────────────

/// A shared `SessionHandle -> T` map.
///
/// Cloning a registry shares the underlying table, so the host and any
/// hooks holding a clone see the same bindings. Every operation accepts an
/// optional handle; `None` reads as absent and writes are ignored.
pub struct SessionRegistry<T> {
    entries: Arc<Mutex<HashMap<SessionHandle, T>>>,
}

impl<T> Clone for SessionRegistry<T> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
        }
    }
}

impl<T> Default for SessionRegistry<T> {
    fn default() -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<T> std::fmt::Debug for SessionRegistry<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("sessions", &self.len())
            .finish()
    }
}

impl<T> SessionRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SessionHandle, T>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Bind `value` to `handle`, or remove the binding when `value` is
    /// `None`. A `None` handle is a no-op.
    pub fn set(&self, handle: Option<&SessionHandle>, value: Option<T>) {
        let Some(handle) = handle else {
            return;
        };
        let mut entries = self.lock();
        match value {
            Some(value) => {
                entries.insert(handle.clone(), value);
            }
            None => {
                entries.remove(handle);
            }
        }
    }

    /// Remove and return the binding for `handle`.
    pub fn remove(&self, handle: Option<&SessionHandle>) -> Option<T> {
        self.lock().remove(handle?)
    }

    /// Mutate the binding for `handle` in place. Returns `None` (and does
    /// not call `f`) when nothing is bound.
    pub fn update<R>(
        &self,
        handle: Option<&SessionHandle>,
        f: impl FnOnce(&mut T) -> R,
    ) -> Option<R> {
        let handle = handle?;
        self.lock().get_mut(handle).map(f)
    }

    pub fn contains(&self, handle: Option<&SessionHandle>) -> bool {
        handle.is_some_and(|h| self.lock().contains_key(h))
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

impl<T: Clone> SessionRegistry<T> {
    /// Read a copy of the binding for `handle`.
    pub fn get(&self, handle: Option<&SessionHandle>) -> Option<T> {
        self.lock().get(handle?).cloned()
    }
}
