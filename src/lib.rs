//! # Nuages Dependency Injection
//!
//! Contextual instance storage and scoped lifecycle management: the
//! runtime core that associates at most one instance of a contextual
//! type with the current logical scope, creates it lazily on first
//! lookup, and destroys it exactly once when the scope ends.
//!
//! ## Features
//!
//! - **Scoped**: request-scoped and singleton contexts with a shared
//!   lookup surface ([`InjectableContext`])
//! - **Boundary-driven**: activate / deactivate / destroy protocol for
//!   scope boundaries ([`ManagedContext`])
//! - **Suspend/resume**: a deactivated scope's handles can be captured
//!   and fed back into a later activation, possibly on another thread
//! - **Exactly-once destruction**: handle destruction is terminal and
//!   idempotent; bulk destruction collects every failure before
//!   reporting
//!
//! ## Example
//!
//! ```
//! use nuages_di::{
//! 	Contextual, CreationContext, InjectableContext, Instance, ManagedContext,
//! 	RequestContext, Scope,
//! };
//! use std::sync::Arc;
//!
//! struct Counter;
//!
//! impl Contextual for Counter {
//! 	fn name(&self) -> &str {
//! 		"Counter"
//! 	}
//! 	fn scope(&self) -> Scope {
//! 		Scope::Request
//! 	}
//! 	fn create(&self, _ctx: &CreationContext) -> Instance {
//! 		Arc::new(0u64)
//! 	}
//! }
//!
//! let context = RequestContext::new();
//! let counter: Arc<dyn Contextual> = Arc::new(Counter);
//! let creational = CreationContext::new();
//!
//! // Open the scope, resolve twice, observe the same instance.
//! context.activate(None).unwrap();
//! let first = context.get(&counter, Some(&creational)).unwrap().unwrap();
//! let second = context.get(&counter, Some(&creational)).unwrap().unwrap();
//! assert!(Arc::ptr_eq(&first, &second));
//!
//! // Close the scope; instances are destroyed exactly once.
//! context.destroy().unwrap();
//! assert!(!context.is_active());
//! ```

pub mod context;
pub mod contextual;
pub mod error;
pub mod handle;
pub mod scope;

pub use context::{InjectableContext, ManagedContext, RequestContext, SingletonContext};
pub use contextual::{Contextual, ContextualId, CreationContext, Instance};
pub use error::{BoxError, ContextError, ContextResult, InstanceDestroyError};
pub use handle::ContextInstanceHandle;
pub use scope::{Scope, ScopeStorage};
