//! Property tests for the scoped-instance invariants
//!
//! Drives a `RequestContext` with arbitrary operation sequences and
//! checks it against a plain model: an `Option<HashMap>` where `None`
//! means "not active". The core invariant is at most one instance per
//! contextual type per active scope, with `ContextNotActive` exactly
//! when the model says the scope is absent.

use nuages_di::{
	ContextError, Contextual, CreationContext, InjectableContext, Instance, ManagedContext,
	RequestContext, Scope,
};
use proptest::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

struct SerialBean {
	serials: Arc<AtomicUsize>,
}

impl Contextual for SerialBean {
	fn name(&self) -> &str {
		"SerialBean"
	}

	fn scope(&self) -> Scope {
		Scope::Request
	}

	fn create(&self, _ctx: &CreationContext) -> Instance {
		// Serials are unique across all beans in the run.
		Arc::new(self.serials.fetch_add(1, Ordering::SeqCst))
	}
}

#[derive(Debug, Clone)]
enum Op {
	Activate,
	Deactivate,
	Get(usize),
	Lookup(usize),
	DestroyOne(usize),
	DestroyAll,
}

const BEANS: usize = 4;

fn op_strategy() -> impl Strategy<Value = Op> {
	prop_oneof![
		Just(Op::Activate),
		Just(Op::Deactivate),
		(0..BEANS).prop_map(Op::Get),
		(0..BEANS).prop_map(Op::Lookup),
		(0..BEANS).prop_map(Op::DestroyOne),
		Just(Op::DestroyAll),
	]
}

fn serial_of(instance: &Instance) -> usize {
	*instance.downcast_ref::<usize>().unwrap()
}

proptest! {
	#[test]
	fn context_matches_model(ops in proptest::collection::vec(op_strategy(), 1..48)) {
		let serials = Arc::new(AtomicUsize::new(0));
		let beans: Vec<Arc<dyn Contextual>> = (0..BEANS)
			.map(|_| {
				Arc::new(SerialBean {
					serials: Arc::clone(&serials),
				}) as Arc<dyn Contextual>
			})
			.collect();
		let creational = CreationContext::new();

		let context = RequestContext::new();
		// None = inactive; Some(map) = active with bean-index -> serial.
		let mut model: Option<HashMap<usize, usize>> = None;

		for op in ops {
			match op {
				Op::Activate => {
					context.activate(None).unwrap();
					model = Some(HashMap::new());
				}
				Op::Deactivate => {
					context.deactivate();
					model = None;
				}
				Op::Get(i) => match &mut model {
					Some(map) => {
						let instance =
							context.get(&beans[i], Some(&creational)).unwrap().unwrap();
						let serial = serial_of(&instance);
						match map.get(&i) {
							Some(known) => prop_assert_eq!(*known, serial),
							None => {
								map.insert(i, serial);
							}
						}
					}
					None => {
						prop_assert!(matches!(
							context.get(&beans[i], Some(&creational)),
							Err(ContextError::ContextNotActive)
						));
					}
				},
				Op::Lookup(i) => match &model {
					Some(map) => {
						let found = context.get(&beans[i], None).unwrap();
						match (map.get(&i), found) {
							(Some(known), Some(instance)) => {
								prop_assert_eq!(*known, serial_of(&instance));
							}
							(None, None) => {}
							(expected, actual) => prop_assert!(
								false,
								"model {:?} disagrees with lookup {:?}",
								expected,
								actual.map(|instance| serial_of(&instance))
							),
						}
					}
					None => {
						prop_assert!(matches!(
							context.get(&beans[i], None),
							Err(ContextError::ContextNotActive)
						));
					}
				},
				Op::DestroyOne(i) => match &mut model {
					Some(map) => {
						context.destroy_contextual(&beans[i]).unwrap();
						map.remove(&i);
					}
					None => {
						prop_assert!(matches!(
							context.destroy_contextual(&beans[i]),
							Err(ContextError::ContextNotActive)
						));
					}
				},
				Op::DestroyAll => {
					// No-op when inactive; detaches the scope otherwise.
					context.destroy().unwrap();
					model = None;
				}
			}

			prop_assert_eq!(context.is_active(), model.is_some());
			let expected_len = model.as_ref().map_or(0, HashMap::len);
			prop_assert_eq!(context.get_all().len(), expected_len);
		}
	}
}
