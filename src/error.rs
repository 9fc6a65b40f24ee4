//! Error types for contextual instance storage.

use thiserror::Error;

use crate::scope::Scope;

/// Boxed error returned by user-supplied destroy callbacks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised by context operations.
#[derive(Debug, Error)]
pub enum ContextError {
	/// The calling thread has no active scope storage.
	#[error("Context is not active on the current thread")]
	ContextNotActive,

	/// An initial-state handle declared a scope other than the one the
	/// context implements. Raised by `activate` before any handle is
	/// installed.
	#[error("Invalid scope for contextual `{contextual}`: expected {expected}, found {found}")]
	InvalidBeanScope {
		/// Diagnostic name of the offending contextual type.
		contextual: String,
		/// The scope this context implements.
		expected: Scope,
		/// The scope the handle actually declared.
		found: Scope,
	},

	/// One or more instance destructions failed. Raised only after every
	/// destruction has been attempted; wraps all causes, not just the first.
	#[error("Failed to destroy {} contextual instance(s)", .causes.len())]
	DestructionFailed {
		/// One entry per failing instance.
		causes: Vec<InstanceDestroyError>,
	},
}

/// A single instance destruction failure, tagged with the contextual
/// type that produced the instance.
#[derive(Debug, Error)]
#[error("Failed to destroy instance of `{contextual}`: {source}")]
pub struct InstanceDestroyError {
	/// Diagnostic name of the contextual type.
	pub contextual: String,
	/// The underlying destroy-callback failure.
	#[source]
	pub source: BoxError,
}

/// Result type alias for context operations.
pub type ContextResult<T> = Result<T, ContextError>;
