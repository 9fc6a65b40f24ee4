//! Scope identifiers and per-scope instance storage

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use crate::contextual::ContextualId;
use crate::error::InstanceDestroyError;
use crate::handle::ContextInstanceHandle;

/// The scope a contextual type declares itself to live in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
	Request,
	Singleton,
}

impl fmt::Display for Scope {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Scope::Request => write!(f, "request"),
			Scope::Singleton => write!(f, "singleton"),
		}
	}
}

/// The handle map backing one active scope.
///
/// Existence of a `ScopeStorage` for an execution strand is what makes
/// that strand "active" — absence means "not active", never "empty".
/// The storage is cheaply cloneable; clones share the same underlying
/// map, so a detached storage can be re-attached later with its
/// contents intact.
#[derive(Clone, Default)]
pub struct ScopeStorage {
	handles: Arc<RwLock<HashMap<ContextualId, Arc<ContextInstanceHandle>>>>,
}

impl ScopeStorage {
	/// Creates an empty storage.
	pub fn new() -> Self {
		Self {
			handles: Arc::new(RwLock::new(HashMap::new())),
		}
	}

	/// Returns the handle for the given contextual identity, if present.
	pub fn get(&self, id: ContextualId) -> Option<Arc<ContextInstanceHandle>> {
		let handles = self.handles.read().unwrap_or_else(PoisonError::into_inner);
		handles.get(&id).cloned()
	}

	/// Inserts a handle, keeping any handle already present for the same
	/// identity. Returns the handle that is in the map after the call.
	pub fn insert_if_absent(
		&self,
		id: ContextualId,
		handle: Arc<ContextInstanceHandle>,
	) -> Arc<ContextInstanceHandle> {
		let mut handles = self.handles.write().unwrap_or_else(PoisonError::into_inner);
		Arc::clone(handles.entry(id).or_insert(handle))
	}

	/// Removes and returns the handle for the given identity, if present.
	pub fn remove(&self, id: ContextualId) -> Option<Arc<ContextInstanceHandle>> {
		let mut handles = self.handles.write().unwrap_or_else(PoisonError::into_inner);
		handles.remove(&id)
	}

	/// Returns a snapshot copy of all current handles.
	///
	/// The snapshot is the state at call time, not a live view; insertion
	/// order is not meaningful.
	pub fn snapshot(&self) -> Vec<Arc<ContextInstanceHandle>> {
		let handles = self.handles.read().unwrap_or_else(PoisonError::into_inner);
		handles.values().cloned().collect()
	}

	/// True if no handles are stored.
	pub fn is_empty(&self) -> bool {
		let handles = self.handles.read().unwrap_or_else(PoisonError::into_inner);
		handles.is_empty()
	}

	/// Number of stored handles.
	pub fn len(&self) -> usize {
		let handles = self.handles.read().unwrap_or_else(PoisonError::into_inner);
		handles.len()
	}

	/// Destroys every stored handle and clears the map, holding the write
	/// lock for the whole loop so a concurrent `snapshot` through a shared
	/// storage never observes mid-destruction state.
	///
	/// Failures are collected, never short-circuiting sibling destructions.
	pub(crate) fn destroy_all(&self) -> Vec<InstanceDestroyError> {
		let mut handles = self.handles.write().unwrap_or_else(PoisonError::into_inner);
		let mut failures = Vec::new();
		for handle in handles.values() {
			handle.destroy_into(&mut failures);
		}
		handles.clear();
		failures
	}
}
