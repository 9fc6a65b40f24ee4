//! Scoped instance storage: the request and singleton contexts

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::thread::{self, ThreadId};

use crate::contextual::{Contextual, ContextualId, CreationContext, Instance};
use crate::error::{ContextError, ContextResult};
use crate::handle::ContextInstanceHandle;
use crate::scope::{Scope, ScopeStorage};

/// The lookup and lifecycle surface of a context.
///
/// Implemented by every context kind; injection sites call
/// [`get`](InjectableContext::get), inspection tooling calls
/// [`get_all`](InjectableContext::get_all).
pub trait InjectableContext: Send + Sync {
	/// The scope this context implements.
	fn scope(&self) -> Scope;

	/// Returns the existing instance for `contextual`, creating one when
	/// absent and a creation context is supplied.
	///
	/// With `creational` set to `None` this is a non-creating lookup:
	/// a miss returns `Ok(None)` and stores nothing. An existing handle
	/// is never overwritten.
	///
	/// # Errors
	///
	/// [`ContextError::ContextNotActive`] when the calling thread has no
	/// active scope storage.
	fn get(
		&self,
		contextual: &Arc<dyn Contextual>,
		creational: Option<&CreationContext>,
	) -> ContextResult<Option<Instance>>;

	/// Snapshot of all current handles.
	///
	/// Returns an empty vec when the context is not active; never fails.
	fn get_all(&self) -> Vec<Arc<ContextInstanceHandle>>;

	/// True iff the calling thread currently has an active scope storage.
	fn is_active(&self) -> bool;

	/// Removes and destroys the handle for `contextual`, if present.
	///
	/// Absence of the handle is a silent no-op.
	///
	/// # Errors
	///
	/// [`ContextError::ContextNotActive`] when the context is not active;
	/// [`ContextError::DestructionFailed`] when the destroy callback fails.
	fn destroy_contextual(&self, contextual: &Arc<dyn Contextual>) -> ContextResult<()>;

	/// Destroys every held handle exactly once, then clears the storage.
	///
	/// A no-op when the context is not active. Individual destruction
	/// failures are collected; after all destructions have been attempted
	/// the failures, if any, surface as one
	/// [`ContextError::DestructionFailed`] wrapping every cause.
	fn destroy(&self) -> ContextResult<()>;
}

/// A context whose lifecycle is driven by an external scope boundary.
///
/// The boundary calls [`activate`](ManagedContext::activate) when a
/// logical unit of work begins, and either
/// [`deactivate`](ManagedContext::deactivate) (suspend, keeping the
/// instances alive for later reactivation) or
/// [`destroy`](InjectableContext::destroy) (terminate) when it ends.
pub trait ManagedContext: InjectableContext {
	/// Allocates a fresh storage for the calling thread, replacing any
	/// existing one without destroying its contents.
	///
	/// Supplied initial-state handles are validated against this
	/// context's scope before anything is installed: on a mismatch the
	/// call fails with [`ContextError::InvalidBeanScope`] and the thread
	/// keeps whatever activation state it had before the call.
	fn activate(
		&self,
		initial_state: Option<Vec<Arc<ContextInstanceHandle>>>,
	) -> ContextResult<()>;

	/// Detaches the calling thread's storage without destroying any
	/// instance it holds. A no-op when not active.
	///
	/// The handles stay alive inside any previously captured
	/// [`get_all`](InjectableContext::get_all) snapshot and can be fed
	/// back into [`activate`](ManagedContext::activate) to resume the
	/// scope, possibly on another thread.
	fn deactivate(&self);
}

/// The built-in context for [`Scope::Request`].
///
/// Each thread owns at most one active scope at a time; there is no
/// cross-thread sharing of a scope's contents unless the caller shares
/// captured handles explicitly.
///
/// # Examples
///
/// ```
/// use nuages_di::{
/// 	Contextual, CreationContext, InjectableContext, Instance, ManagedContext,
/// 	RequestContext, Scope,
/// };
/// use std::sync::Arc;
///
/// struct Greeting;
///
/// impl Contextual for Greeting {
/// 	fn name(&self) -> &str {
/// 		"Greeting"
/// 	}
/// 	fn scope(&self) -> Scope {
/// 		Scope::Request
/// 	}
/// 	fn create(&self, _ctx: &CreationContext) -> Instance {
/// 		Arc::new("hello".to_string())
/// 	}
/// }
///
/// let context = RequestContext::new();
/// let greeting: Arc<dyn Contextual> = Arc::new(Greeting);
///
/// context.activate(None).unwrap();
/// let creational = CreationContext::new();
/// let instance = context.get(&greeting, Some(&creational)).unwrap().unwrap();
/// assert_eq!(instance.downcast_ref::<String>().unwrap(), "hello");
/// context.destroy().unwrap();
/// assert!(!context.is_active());
/// ```
#[derive(Default)]
pub struct RequestContext {
	// One storage per thread that currently holds an active scope.
	// Absence of an entry signals "not active", never "empty".
	current: RwLock<HashMap<ThreadId, ScopeStorage>>,
}

impl RequestContext {
	/// Creates a context with no active scopes.
	pub fn new() -> Self {
		Self::default()
	}

	fn storage(&self) -> Option<ScopeStorage> {
		let current = self.current.read().unwrap_or_else(PoisonError::into_inner);
		current.get(&thread::current().id()).cloned()
	}
}

impl InjectableContext for RequestContext {
	fn scope(&self) -> Scope {
		Scope::Request
	}

	fn get(
		&self,
		contextual: &Arc<dyn Contextual>,
		creational: Option<&CreationContext>,
	) -> ContextResult<Option<Instance>> {
		let storage = self.storage().ok_or(ContextError::ContextNotActive)?;
		let id = ContextualId::of(contextual);
		if let Some(handle) = storage.get(id) {
			return Ok(Some(handle.instance()));
		}
		let Some(creational) = creational else {
			// Non-creating lookup: report the miss without storing anything.
			return Ok(None);
		};
		let instance = contextual.create(creational);
		let handle = Arc::new(ContextInstanceHandle::new(
			Arc::clone(contextual),
			instance,
			creational.clone(),
		));
		tracing::trace!("created request-scoped instance of `{}`", contextual.name());
		Ok(Some(storage.insert_if_absent(id, handle).instance()))
	}

	fn get_all(&self) -> Vec<Arc<ContextInstanceHandle>> {
		match self.storage() {
			Some(storage) => storage.snapshot(),
			None => Vec::new(),
		}
	}

	fn is_active(&self) -> bool {
		let current = self.current.read().unwrap_or_else(PoisonError::into_inner);
		current.contains_key(&thread::current().id())
	}

	fn destroy_contextual(&self, contextual: &Arc<dyn Contextual>) -> ContextResult<()> {
		let storage = self.storage().ok_or(ContextError::ContextNotActive)?;
		match storage.remove(ContextualId::of(contextual)) {
			Some(handle) => handle.destroy(),
			None => Ok(()),
		}
	}

	fn destroy(&self) -> ContextResult<()> {
		let detached = {
			let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
			current.remove(&thread::current().id())
		};
		let Some(storage) = detached else {
			return Ok(());
		};
		let count = storage.len();
		let failures = storage.destroy_all();
		tracing::debug!(
			"request context destroyed: {} instance(s), {} failure(s)",
			count,
			failures.len()
		);
		if failures.is_empty() {
			Ok(())
		} else {
			Err(ContextError::DestructionFailed { causes: failures })
		}
	}
}

impl ManagedContext for RequestContext {
	fn activate(
		&self,
		initial_state: Option<Vec<Arc<ContextInstanceHandle>>>,
	) -> ContextResult<()> {
		let storage = ScopeStorage::new();
		if let Some(handles) = initial_state {
			// Validate every handle before touching thread state, so a
			// mismatch leaves the previous activation untouched.
			for handle in &handles {
				let found = handle.contextual().scope();
				if found != self.scope() {
					return Err(ContextError::InvalidBeanScope {
						contextual: handle.contextual().name().to_owned(),
						expected: self.scope(),
						found,
					});
				}
			}
			for handle in handles {
				let id = ContextualId::of(handle.contextual());
				storage.insert_if_absent(id, handle);
			}
		}
		tracing::debug!("request context activated with {} instance(s)", storage.len());
		let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
		// Re-entrant activation replaces the previous storage without
		// destroying its contents.
		current.insert(thread::current().id(), storage);
		Ok(())
	}

	fn deactivate(&self) {
		let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
		if current.remove(&thread::current().id()).is_some() {
			tracing::debug!("request context deactivated");
		}
	}
}

/// The built-in context for [`Scope::Singleton`].
///
/// Always active, shared by every thread, and never deactivated; bulk
/// [`destroy`](InjectableContext::destroy) clears the instances but the
/// context stays active.
#[derive(Default)]
pub struct SingletonContext {
	storage: ScopeStorage,
}

impl SingletonContext {
	/// Creates an empty singleton context.
	pub fn new() -> Self {
		Self::default()
	}
}

impl InjectableContext for SingletonContext {
	fn scope(&self) -> Scope {
		Scope::Singleton
	}

	fn get(
		&self,
		contextual: &Arc<dyn Contextual>,
		creational: Option<&CreationContext>,
	) -> ContextResult<Option<Instance>> {
		let id = ContextualId::of(contextual);
		if let Some(handle) = self.storage.get(id) {
			return Ok(Some(handle.instance()));
		}
		let Some(creational) = creational else {
			return Ok(None);
		};
		let instance = contextual.create(creational);
		let handle = Arc::new(ContextInstanceHandle::new(
			Arc::clone(contextual),
			instance,
			creational.clone(),
		));
		let kept = self.storage.insert_if_absent(id, Arc::clone(&handle));
		if !Arc::ptr_eq(&kept, &handle) {
			// Lost a creation race with another thread; the winner's
			// instance is the singleton, ours is destroyed right away.
			if let Err(error) = handle.destroy() {
				tracing::warn!("failed to destroy raced singleton instance: {}", error);
			}
		}
		Ok(Some(kept.instance()))
	}

	fn get_all(&self) -> Vec<Arc<ContextInstanceHandle>> {
		self.storage.snapshot()
	}

	fn is_active(&self) -> bool {
		true
	}

	fn destroy_contextual(&self, contextual: &Arc<dyn Contextual>) -> ContextResult<()> {
		match self.storage.remove(ContextualId::of(contextual)) {
			Some(handle) => handle.destroy(),
			None => Ok(()),
		}
	}

	fn destroy(&self) -> ContextResult<()> {
		let count = self.storage.len();
		let failures = self.storage.destroy_all();
		tracing::debug!(
			"singleton context destroyed: {} instance(s), {} failure(s)",
			count,
			failures.len()
		);
		if failures.is_empty() {
			Ok(())
		} else {
			Err(ContextError::DestructionFailed { causes: failures })
		}
	}
}
