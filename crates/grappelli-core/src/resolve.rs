//! # Resolution Pass
//!
//! Fills every open provider slot by walking the frozen scope graph. One
//! worklist pass in arena insertion order keeps the outcome deterministic.
//!
//! Precedence per slot: own-source members first, then the owning scope's
//! registry with parent delegation. Optionals that stay unmatched become the
//! absent sentinel; required misses go into the build report and never abort
//! the pass.

use crate::dependant::{Dependant, DependantArena, DependantId};
use crate::descriptor::DependencyDescriptor;
use crate::error::BuildReport;
use crate::provider::DependencyProvider;
use crate::registry::ServiceSource;
use crate::scope::{FrozenScopes, SourceTable};

pub(crate) fn resolve(
	arena: &mut DependantArena,
	scopes: &FrozenScopes,
	sources: &SourceTable,
	report: &mut BuildReport,
) {
	let mut filled = 0usize;
	for id in arena.ids() {
		let fills = {
			let dependant = arena.get(id);
			let mut fills = Vec::new();
			for (index, descriptor) in dependant.dependencies().iter().enumerate() {
				let slot = dependant.slot_of(index);
				if dependant.provider(slot).is_some() {
					continue;
				}
				match lookup_provider(dependant, id, descriptor, scopes, sources) {
					Some(provider) => fills.push((slot, provider)),
					None if descriptor.is_optional() => {
						fills.push((slot, DependencyProvider::Absent(descriptor.empty_repr())));
					}
					None => report.record_missing(
						descriptor.key().to_string(),
						descriptor.origin().to_string(),
					),
				}
			}
			fills
		};

		filled += fills.len();
		let dependant = arena.get_mut(id);
		for (slot, provider) in fills {
			dependant.fill_slot(slot, provider);
		}
	}
	tracing::debug!(dependants = arena.len(), slots = filled, "resolution pass complete");
}

/// A member never satisfies its own requirement; self-supply falls through to
/// the scope chain and surfaces as a cycle.
fn lookup_provider(
	dependant: &Dependant,
	id: DependantId,
	descriptor: &DependencyDescriptor,
	scopes: &FrozenScopes,
	sources: &SourceTable,
) -> Option<DependencyProvider> {
	if let Some(source) = dependant.source() {
		if let Some(member) = sources.find(source, descriptor.key(), id) {
			return Some(DependencyProvider::Service { dependant: member });
		}
	}

	let (found_in, entry) = scopes.lookup(dependant.scope(), descriptor.key())?;
	Some(match entry.source() {
		ServiceSource::Constant(value) => DependencyProvider::Constant {
			label: entry.label().into(),
			value: value.clone(),
		},
		ServiceSource::Dependant(target) if found_in == dependant.scope() => {
			DependencyProvider::Service { dependant: *target }
		}
		ServiceSource::Dependant(target) => DependencyProvider::Ancestor {
			dependant: *target,
			found_in,
		},
	})
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use super::*;
	use crate::dependant::{DependantKind, RawInvocable};
	use crate::descriptor::{Declared, EmptyRepr};
	use crate::key::ServiceKey;
	use crate::provider::BoxedValue;
	use crate::scope::GraphBuilder;

	fn noop() -> RawInvocable {
		RawInvocable::Bean(Arc::new(|_| Ok(Box::new(()) as BoxedValue)))
	}

	fn resolved_arena(builder: GraphBuilder) -> (DependantArena, BuildReport) {
		let frozen = builder.freeze().unwrap();
		let mut arena = frozen.arena;
		let mut report = frozen.report;
		resolve(&mut arena, &frozen.scopes, &frozen.sources, &mut report);
		(arena, report)
	}

	#[test]
	fn test_constant_lookup_yields_constant_provider() {
		let mut builder = GraphBuilder::new("root");
		let root = builder.root();
		builder
			.register_constant(root, ServiceKey::of::<i64>(), "amount", Arc::new(123i64))
			.unwrap();
		let consumer = builder
			.register_dependant(
				root,
				DependantKind::Constructor,
				"Widget::new",
				vec![Declared::value::<i64>()],
				noop(),
			)
			.unwrap();

		let (arena, report) = resolved_arena(builder);
		assert!(report.is_empty());
		assert!(matches!(
			arena.get(consumer).provider(0),
			Some(DependencyProvider::Constant { .. })
		));
	}

	#[test]
	fn test_child_registration_shadows_parent() {
		let mut builder = GraphBuilder::new("root");
		let root = builder.root();
		let child = builder.register_scope(root, "child").unwrap();

		let in_parent = builder
			.register_dependant(root, DependantKind::Constructor, "Parent::make", Vec::new(), noop())
			.unwrap();
		builder
			.bind(root, ServiceKey::of::<String>(), "Parent::make", in_parent)
			.unwrap();

		let in_child = builder
			.register_dependant(child, DependantKind::Constructor, "Child::make", Vec::new(), noop())
			.unwrap();
		builder
			.bind(child, ServiceKey::of::<String>(), "Child::make", in_child)
			.unwrap();

		let consumer = builder
			.register_dependant(
				child,
				DependantKind::Constructor,
				"Consumer::new",
				vec![Declared::value::<String>()],
				noop(),
			)
			.unwrap();

		let (arena, report) = resolved_arena(builder);
		assert!(report.is_empty());
		match arena.get(consumer).provider(0) {
			Some(DependencyProvider::Service { dependant }) => assert_eq!(*dependant, in_child),
			other => panic!("expected child-local service, got {other:?}"),
		}
	}

	#[test]
	fn test_parent_hit_is_an_ancestor_provider() {
		let mut builder = GraphBuilder::new("root");
		let root = builder.root();
		let child = builder.register_scope(root, "child").unwrap();

		let in_parent = builder
			.register_dependant(root, DependantKind::Constructor, "Parent::make", Vec::new(), noop())
			.unwrap();
		builder
			.bind(root, ServiceKey::of::<String>(), "Parent::make", in_parent)
			.unwrap();

		let consumer = builder
			.register_dependant(
				child,
				DependantKind::Constructor,
				"Consumer::new",
				vec![Declared::value::<String>()],
				noop(),
			)
			.unwrap();

		let (arena, report) = resolved_arena(builder);
		assert!(report.is_empty());
		match arena.get(consumer).provider(0) {
			Some(DependencyProvider::Ancestor { dependant, found_in }) => {
				assert_eq!(*dependant, in_parent);
				assert!(found_in.is_root());
			}
			other => panic!("expected ancestor provider, got {other:?}"),
		}
	}

	#[test]
	fn test_own_source_member_shadows_scope_registration() {
		let mut builder = GraphBuilder::new("root");
		let root = builder.root();

		let scope_level = builder
			.register_dependant(root, DependantKind::Constructor, "Scope::make", Vec::new(), noop())
			.unwrap();
		builder
			.bind(root, ServiceKey::of::<String>(), "Scope::make", scope_level)
			.unwrap();

		let source = builder.new_source();
		let sibling = builder
			.register_dependant(root, DependantKind::Constructor, "Source::make", Vec::new(), noop())
			.unwrap();
		builder.record_provides(source, ServiceKey::of::<String>(), sibling);

		let consumer = builder
			.register_dependant(
				root,
				DependantKind::Constructor,
				"Source::consume",
				vec![Declared::value::<String>()],
				noop(),
			)
			.unwrap();
		builder.record_provides(source, ServiceKey::of::<Vec<u8>>(), consumer);

		let (arena, report) = resolved_arena(builder);
		assert!(report.is_empty());
		match arena.get(consumer).provider(0) {
			Some(DependencyProvider::Service { dependant }) => assert_eq!(*dependant, sibling),
			other => panic!("expected own-source service, got {other:?}"),
		}
	}

	#[test]
	fn test_unmatched_optional_becomes_absent_sentinel() {
		let mut builder = GraphBuilder::new("root");
		let root = builder.root();
		let consumer = builder
			.register_dependant(
				root,
				DependantKind::Constructor,
				"Widget::new",
				vec![Declared::value::<String>().optional()],
				noop(),
			)
			.unwrap();

		let (arena, report) = resolved_arena(builder);
		assert!(report.is_empty());
		assert!(matches!(
			arena.get(consumer).provider(0),
			Some(DependencyProvider::Absent(EmptyRepr::EmptyOption))
		));
		assert!(arena.get(consumer).is_resolved());
	}

	#[test]
	fn test_missing_required_is_collected_not_thrown() {
		let mut builder = GraphBuilder::new("root");
		let root = builder.root();
		builder
			.register_dependant(
				root,
				DependantKind::Constructor,
				"Widget::new",
				vec![Declared::value::<String>()],
				noop(),
			)
			.unwrap();
		builder
			.register_dependant(
				root,
				DependantKind::Constructor,
				"Gadget::new",
				vec![Declared::value::<String>()],
				noop(),
			)
			.unwrap();

		let (_arena, report) = resolved_arena(builder);
		assert_eq!(report.missing().len(), 1);
		assert_eq!(report.missing()[0].requesters.len(), 2);
		assert!(report.missing()[0].requesters[0].contains("Widget::new"));
	}
}
