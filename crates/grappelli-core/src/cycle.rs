//! # Cycle Detection and Materialization Ordering
//!
//! Iterative depth-first search over provider edges, with an explicit frame
//! stack so arbitrarily deep graphs never touch the call stack.
//!
//! The first dependant found twice on the visiting path aborts the build; the
//! reported chain is truncated to the cyclic suffix, so A -> B -> C -> B
//! reports [B, C]. Post-order completion yields the materialization list:
//! every pool-dwelling dependant appears after everything it depends on.
//! Each dependant is marked done once; the pass is O(V + E).

use crate::dependant::{DependantArena, DependantId};
use crate::error::{BuildError, BuildResult};

pub(crate) fn detect_and_order(arena: &DependantArena) -> BuildResult<Vec<DependantId>> {
	let mut done = vec![false; arena.len()];
	let mut on_stack = vec![false; arena.len()];
	let mut materialization = Vec::new();

	for root in arena.ids() {
		if done[root.index()] || !arena.get(root).needs_cycle_check() {
			continue;
		}
		visit(root, arena, &mut done, &mut on_stack, &mut materialization)?;
	}

	// Pool dwellers nothing depends on (and that depend on nothing) were
	// never reached; any position is safe for them.
	for id in arena.ids() {
		if !done[id.index()] && arena.get(id).region_slot().is_some() {
			materialization.push(id);
		}
	}

	Ok(materialization)
}

fn visit(
	root: DependantId,
	arena: &DependantArena,
	done: &mut [bool],
	on_stack: &mut [bool],
	materialization: &mut Vec<DependantId>,
) -> BuildResult<()> {
	let mut frames: Vec<(DependantId, Vec<DependantId>, usize)> = Vec::new();
	let mut path: Vec<DependantId> = Vec::new();

	frames.push((root, edges_of(arena, root), 0));
	path.push(root);
	on_stack[root.index()] = true;

	while !frames.is_empty() {
		let top = frames.len() - 1;
		let descend = {
			let (_, edges, next) = &mut frames[top];
			if *next < edges.len() {
				let target = edges[*next];
				*next += 1;
				Some(target)
			} else {
				None
			}
		};

		match descend {
			Some(target) => {
				if on_stack[target.index()] {
					// Everything before the first occurrence is approach,
					// not cycle.
					let start = path.iter().position(|id| *id == target).unwrap_or(0);
					let chain = path[start..]
						.iter()
						.map(|id| arena.get(*id).label().to_string())
						.collect();
					return Err(BuildError::Cycle { chain });
				}
				if !done[target.index()] {
					frames.push((target, edges_of(arena, target), 0));
					path.push(target);
					on_stack[target.index()] = true;
				}
			}
			None => {
				if let Some((id, _, _)) = frames.pop() {
					path.pop();
					on_stack[id.index()] = false;
					done[id.index()] = true;
					if arena.get(id).region_slot().is_some() {
						materialization.push(id);
					}
				}
			}
		}
	}

	Ok(())
}

/// Edge set of a dependant: its own service-backed slots plus those of its
/// attached member setters, in slot order.
fn edges_of(arena: &DependantArena, id: DependantId) -> Vec<DependantId> {
	let dependant = arena.get(id);
	let mut edges: Vec<DependantId> = dependant.provider_edges().collect();
	for setter in dependant.setters() {
		edges.extend(arena.get(*setter).provider_edges());
	}
	edges
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use super::*;
	use crate::dependant::{Dependant, DependantKind, RawInvocable};
	use crate::descriptor::{extract, Declared, DependencyOrigin};
	use crate::key::KeyCache;
	use crate::provider::{BoxedValue, DependencyProvider};
	use crate::region::RegionSlot;
	use crate::scope::ScopeId;

	fn noop() -> RawInvocable {
		RawInvocable::Bean(Arc::new(|_| Ok(Box::new(()) as BoxedValue)))
	}

	fn unit(arena: &mut DependantArena, label: &str, dep_count: usize) -> DependantId {
		let mut cache = KeyCache::new();
		let dependencies = (0..dep_count)
			.map(|index| {
				extract(
					&Declared::value::<u8>(),
					DependencyOrigin::new(label, index),
					&mut cache,
				)
				.unwrap()
			})
			.collect();
		arena.alloc(Dependant::new(
			label,
			ScopeId::root(),
			DependantKind::Constructor,
			dependencies,
			noop(),
		))
	}

	fn link(arena: &mut DependantArena, from: DependantId, slot: usize, to: DependantId) {
		arena
			.get_mut(from)
			.fill_slot(slot, DependencyProvider::Service { dependant: to });
	}

	fn pooled(arena: &mut DependantArena, id: DependantId, slot: usize) {
		arena.get_mut(id).assign_region_slot(RegionSlot::new(slot));
	}

	fn chain_of(err: BuildError) -> Vec<String> {
		match err {
			BuildError::Cycle { chain } => chain,
			other => panic!("expected cycle, got {other}"),
		}
	}

	#[test]
	fn test_two_node_cycle_reports_both_nodes() {
		let mut arena = DependantArena::new();
		let a = unit(&mut arena, "A", 1);
		let b = unit(&mut arena, "B", 1);
		link(&mut arena, a, 0, b);
		link(&mut arena, b, 0, a);

		let chain = chain_of(detect_and_order(&arena).unwrap_err());
		assert_eq!(chain, vec!["A".to_string(), "B".to_string()]);
	}

	#[test]
	fn test_cycle_chain_is_truncated_to_the_cyclic_suffix() {
		let mut arena = DependantArena::new();
		let a = unit(&mut arena, "A", 1);
		let b = unit(&mut arena, "B", 1);
		let c = unit(&mut arena, "C", 1);
		link(&mut arena, a, 0, b);
		link(&mut arena, b, 0, c);
		link(&mut arena, c, 0, b);

		let chain = chain_of(detect_and_order(&arena).unwrap_err());
		assert_eq!(chain, vec!["B".to_string(), "C".to_string()]);
	}

	#[test]
	fn test_self_cycle_reports_a_single_node() {
		let mut arena = DependantArena::new();
		let a = unit(&mut arena, "A", 1);
		link(&mut arena, a, 0, a);

		let chain = chain_of(detect_and_order(&arena).unwrap_err());
		assert_eq!(chain, vec!["A".to_string()]);
	}

	#[test]
	fn test_materialization_puts_dependencies_first() {
		let mut arena = DependantArena::new();
		let a = unit(&mut arena, "A", 1);
		let b = unit(&mut arena, "B", 1);
		let c = unit(&mut arena, "C", 0);
		link(&mut arena, a, 0, b);
		link(&mut arena, b, 0, c);
		pooled(&mut arena, a, 0);
		pooled(&mut arena, b, 1);
		pooled(&mut arena, c, 2);

		let order = detect_and_order(&arena).unwrap();
		assert_eq!(order, vec![c, b, a]);
	}

	#[test]
	fn test_shared_dependency_is_materialized_once() {
		let mut arena = DependantArena::new();
		let shared = unit(&mut arena, "Shared", 0);
		let left = unit(&mut arena, "Left", 1);
		let right = unit(&mut arena, "Right", 1);
		link(&mut arena, left, 0, shared);
		link(&mut arena, right, 0, shared);
		pooled(&mut arena, shared, 0);
		pooled(&mut arena, left, 1);
		pooled(&mut arena, right, 2);

		let order = detect_and_order(&arena).unwrap();
		assert_eq!(order, vec![shared, left, right]);
	}

	#[test]
	fn test_unreferenced_pool_dwellers_are_appended() {
		let mut arena = DependantArena::new();
		let standalone = unit(&mut arena, "Standalone", 0);
		pooled(&mut arena, standalone, 0);

		let order = detect_and_order(&arena).unwrap();
		assert_eq!(order, vec![standalone]);
	}

	#[test]
	fn test_deferred_units_order_dependents_but_stay_out_of_the_pool() {
		let mut arena = DependantArena::new();
		let deferred = unit(&mut arena, "Deferred", 0);
		let eager = unit(&mut arena, "Eager", 1);
		link(&mut arena, eager, 0, deferred);
		pooled(&mut arena, eager, 0);

		let order = detect_and_order(&arena).unwrap();
		assert_eq!(order, vec![eager]);
	}

	#[test]
	fn test_setter_edges_participate_in_cycles() {
		let mut arena = DependantArena::new();
		let owner = unit(&mut arena, "Owner", 0);

		let mut cache = KeyCache::new();
		let setter_dep = extract(
			&Declared::value::<u8>(),
			DependencyOrigin::new("Owner::set_peer", 0),
			&mut cache,
		)
		.unwrap();
		let setter = arena.alloc(Dependant::new(
			"Owner::set_peer",
			ScopeId::root(),
			DependantKind::MemberSetter,
			vec![setter_dep],
			RawInvocable::Setter(Arc::new(|_, _| Ok(()))),
		));
		arena.get_mut(setter).fill_slot(0, DependencyProvider::Receiver);
		link(&mut arena, setter, 1, owner);
		let owner_dependant = arena.get_mut(owner);
		owner_dependant.attach_setter(setter);
		owner_dependant.flag_for_cycle_check();

		let chain = chain_of(detect_and_order(&arena).unwrap_err());
		assert_eq!(chain, vec!["Owner".to_string()]);
	}
}
