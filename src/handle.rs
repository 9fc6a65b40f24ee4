//! Instance handles: one created instance plus its creation metadata

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::contextual::{Contextual, CreationContext, Instance};
use crate::error::{ContextError, ContextResult, InstanceDestroyError};

/// Owns exactly one created instance together with the [`Contextual`]
/// that produced it and the [`CreationContext`] used to produce it.
///
/// The instance reference never changes after construction. Destruction
/// is terminal: the first [`destroy`](ContextInstanceHandle::destroy)
/// runs the contextual's destroy callback and releases the creation
/// context's dependents; later calls are no-ops.
pub struct ContextInstanceHandle {
	contextual: Arc<dyn Contextual>,
	instance: Instance,
	creational: CreationContext,
	destroyed: AtomicBool,
}

impl ContextInstanceHandle {
	/// Wraps a freshly created instance.
	pub fn new(
		contextual: Arc<dyn Contextual>,
		instance: Instance,
		creational: CreationContext,
	) -> Self {
		Self {
			contextual,
			instance,
			creational,
			destroyed: AtomicBool::new(false),
		}
	}

	/// The contextual type that produced this instance.
	pub fn contextual(&self) -> &Arc<dyn Contextual> {
		&self.contextual
	}

	/// The live instance.
	pub fn instance(&self) -> Instance {
		Arc::clone(&self.instance)
	}

	/// The creation context the instance was produced with.
	pub fn creation_context(&self) -> &CreationContext {
		&self.creational
	}

	/// True once [`destroy`](ContextInstanceHandle::destroy) has run.
	pub fn is_destroyed(&self) -> bool {
		self.destroyed.load(Ordering::Acquire)
	}

	/// Destroys the instance and its registered dependents.
	///
	/// Idempotent: only the first call reaches the destroy callback.
	/// All failures (primary and dependents) are collected and returned
	/// together as [`ContextError::DestructionFailed`].
	pub fn destroy(&self) -> ContextResult<()> {
		let mut failures = Vec::new();
		self.destroy_into(&mut failures);
		if failures.is_empty() {
			Ok(())
		} else {
			Err(ContextError::DestructionFailed { causes: failures })
		}
	}

	pub(crate) fn destroy_into(&self, failures: &mut Vec<InstanceDestroyError>) {
		if self.destroyed.swap(true, Ordering::AcqRel) {
			return;
		}
		if let Err(source) = self
			.contextual
			.destroy(Arc::clone(&self.instance), &self.creational)
		{
			tracing::warn!(
				"destroy callback failed for contextual `{}`",
				self.contextual.name()
			);
			failures.push(InstanceDestroyError {
				contextual: self.contextual.name().to_owned(),
				source,
			});
		}
		self.creational.release_into(failures);
	}
}
