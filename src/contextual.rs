//! The capability interface for creatable, destroyable contextual types

use std::any::Any;
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::{BoxError, InstanceDestroyError};
use crate::handle::ContextInstanceHandle;
use crate::scope::Scope;

/// A type-erased contextual instance as stored in a scope.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// A creatable, destroyable kind of object with a declared owning scope.
///
/// Implemented by bean descriptors produced outside this crate. Identity
/// is by reference: two clones of one `Arc<dyn Contextual>` are the same
/// contextual type, two separately allocated descriptors are distinct
/// even if structurally equal (see [`ContextualId`]).
pub trait Contextual: Send + Sync + 'static {
	/// Diagnostic name, used in error messages and logging.
	fn name(&self) -> &str;

	/// The scope this contextual type declares itself to live in. Used
	/// only for validation during context activation.
	fn scope(&self) -> Scope;

	/// Creates a new instance. Dependent objects created along the way
	/// should be registered on `ctx` so they are destroyed alongside the
	/// primary instance.
	fn create(&self, ctx: &CreationContext) -> Instance;

	/// Destroys an instance previously returned by [`Contextual::create`].
	fn destroy(&self, instance: Instance, ctx: &CreationContext) -> Result<(), BoxError> {
		let _ = (instance, ctx);
		Ok(())
	}
}

/// Reference identity of a [`Contextual`] descriptor.
///
/// Derived from the descriptor's allocation address, so it is stable for
/// the lifetime of the `Arc` and equal only for clones of the same `Arc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextualId(usize);

impl ContextualId {
	/// Identity of the given descriptor.
	pub fn of(contextual: &Arc<dyn Contextual>) -> Self {
		Self(Arc::as_ptr(contextual) as *const () as usize)
	}
}

/// Opaque token passed through to [`Contextual::create`], tracking the
/// dependent instances created while constructing a primary instance so
/// they can be destroyed alongside it.
///
/// Cheap to clone; clones share the same dependent list.
#[derive(Clone, Default)]
pub struct CreationContext {
	inner: Arc<CreationContextInner>,
}

#[derive(Default)]
struct CreationContextInner {
	dependents: Mutex<Vec<Arc<ContextInstanceHandle>>>,
}

impl CreationContext {
	/// Creates an empty creation context.
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers a dependent instance to be destroyed when the primary
	/// instance built with this context is destroyed.
	pub fn push_dependent(&self, handle: Arc<ContextInstanceHandle>) {
		let mut dependents = self
			.inner
			.dependents
			.lock()
			.unwrap_or_else(PoisonError::into_inner);
		dependents.push(handle);
	}

	/// Number of registered dependents not yet released.
	pub fn dependent_count(&self) -> usize {
		let dependents = self
			.inner
			.dependents
			.lock()
			.unwrap_or_else(PoisonError::into_inner);
		dependents.len()
	}

	/// Destroys all registered dependents in reverse registration order.
	///
	/// Invoked by handle destruction; calling it again is a no-op since
	/// the dependent list is drained on the first call.
	pub fn release(&self) -> Result<(), Vec<InstanceDestroyError>> {
		let mut failures = Vec::new();
		self.release_into(&mut failures);
		if failures.is_empty() {
			Ok(())
		} else {
			Err(failures)
		}
	}

	pub(crate) fn release_into(&self, failures: &mut Vec<InstanceDestroyError>) {
		// Drain under the lock, destroy outside it: a destroy callback may
		// touch this same context.
		let drained: Vec<_> = {
			let mut dependents = self
				.inner
				.dependents
				.lock()
				.unwrap_or_else(PoisonError::into_inner);
			dependents.drain(..).collect()
		};
		for handle in drained.into_iter().rev() {
			handle.destroy_into(failures);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	struct Bean(&'static str);

	impl Contextual for Bean {
		fn name(&self) -> &str {
			self.0
		}

		fn scope(&self) -> Scope {
			Scope::Request
		}

		fn create(&self, _ctx: &CreationContext) -> Instance {
			Arc::new(self.0)
		}
	}

	#[rstest]
	fn test_contextual_id_is_reference_identity() {
		let a: Arc<dyn Contextual> = Arc::new(Bean("a"));
		let b: Arc<dyn Contextual> = Arc::new(Bean("a"));
		let a_clone = Arc::clone(&a);

		assert_eq!(ContextualId::of(&a), ContextualId::of(&a_clone));
		assert_ne!(ContextualId::of(&a), ContextualId::of(&b));
	}

	#[rstest]
	fn test_default_destroy_is_a_no_op() {
		let bean = Bean("a");
		let creational = CreationContext::new();
		let instance = bean.create(&creational);
		assert!(bean.destroy(instance, &creational).is_ok());
	}

	#[rstest]
	fn test_release_drains_dependents() {
		let contextual: Arc<dyn Contextual> = Arc::new(Bean("dep"));
		let creational = CreationContext::new();
		let dep_creational = CreationContext::new();
		let instance = contextual.create(&dep_creational);
		creational.push_dependent(Arc::new(ContextInstanceHandle::new(
			contextual,
			instance,
			dep_creational,
		)));

		assert_eq!(creational.dependent_count(), 1);
		assert!(creational.release().is_ok());
		assert_eq!(creational.dependent_count(), 0);
		// Second release has nothing left to do.
		assert!(creational.release().is_ok());
	}
}
