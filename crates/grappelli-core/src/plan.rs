//! # Invocation Plans
//!
//! Pure composition of `(region) -> value` callables out of resolved provider
//! slots. Each slot becomes a fragment that independently re-derives its value
//! from the shared region: constants clone, pooled services read their slot,
//! deferred services invoke their own compiled plan, absent sentinels yield
//! nothing.
//!
//! Compilation is memoized per dependant. Compiling a dependant with an
//! unfilled slot is an engine contract violation, reported as an internal
//! error and never mixed up with user failures.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::dependant::{DependantArena, DependantId, DependantKind, RawInvocable};
use crate::error::{BuildError, BuildResult, LaunchError, LaunchResult};
use crate::key::{Qualifier, ServiceKey};
use crate::provider::{DependencyProvider, Value};
use crate::region::{Region, RegionSlot};
use crate::registry::ServiceSource;
use crate::scope::{FrozenScopes, ScopeId};

/// A compiled callable unit for one dependant.
#[derive(Clone)]
pub struct CompiledPlan {
	label: Arc<str>,
	run: Arc<dyn Fn(&Region) -> LaunchResult<Value> + Send + Sync>,
}

impl CompiledPlan {
	pub fn label(&self) -> &str {
		&self.label
	}

	pub fn invoke(&self, region: &Region) -> LaunchResult<Value> {
		(self.run)(region)
	}
}

impl fmt::Debug for CompiledPlan {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "CompiledPlan({})", self.label)
	}
}

/// One argument slot's value derivation.
type Fragment = Arc<dyn Fn(&Region) -> LaunchResult<Option<Value>> + Send + Sync>;

/// A pool dweller paired with its compiled plan, in materialization order.
pub struct MaterializedUnit {
	id: DependantId,
	slot: RegionSlot,
	plan: CompiledPlan,
}

impl MaterializedUnit {
	pub fn id(&self) -> DependantId {
		self.id
	}

	pub fn slot(&self) -> RegionSlot {
		self.slot
	}

	pub fn label(&self) -> &str {
		self.plan.label()
	}
}

impl fmt::Debug for MaterializedUnit {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "MaterializedUnit({} -> {})", self.plan.label(), self.slot)
	}
}

/// How a root-visible service is accessed at runtime.
#[derive(Clone)]
pub enum ServiceBinding {
	/// Fixed value captured at registration
	Constant(Value),
	/// Read from the shared pool
	Materialized(RegionSlot),
	/// Recomputed at each access
	Deferred(CompiledPlan),
}

impl fmt::Debug for ServiceBinding {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Constant(_) => f.write_str("Constant"),
			Self::Materialized(slot) => write!(f, "Materialized({slot})"),
			Self::Deferred(plan) => write!(f, "Deferred({})", plan.label()),
		}
	}
}

/// The build output: everything needed to launch application instances.
pub struct PlanSet {
	region_len: usize,
	materialization: Vec<MaterializedUnit>,
	bindings: Arc<HashMap<ServiceKey, ServiceBinding>>,
	binding_order: Vec<ServiceKey>,
}

impl PlanSet {
	pub fn region_len(&self) -> usize {
		self.region_len
	}

	/// Pool dwellers in dependency-safe order.
	pub fn materialization(&self) -> &[MaterializedUnit] {
		&self.materialization
	}

	/// Root-visible service keys, in registration order.
	pub fn services(&self) -> impl Iterator<Item = &ServiceKey> {
		self.binding_order.iter()
	}

	pub fn binding(&self, key: &ServiceKey) -> Option<&ServiceBinding> {
		self.bindings.get(key)
	}

	/// Allocates a fresh region and populates it in materialization order.
	pub fn launch(&self) -> LaunchResult<RuntimeContext> {
		let region = Region::with_len(self.region_len);
		for unit in &self.materialization {
			let value = unit.plan.invoke(&region)?;
			region.set(unit.slot, value)?;
		}
		tracing::debug!(
			materialized = self.materialization.len(),
			services = self.binding_order.len(),
			"application instance launched"
		);
		Ok(RuntimeContext {
			region,
			bindings: Arc::clone(&self.bindings),
		})
	}
}

impl fmt::Debug for PlanSet {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("PlanSet")
			.field("region_len", &self.region_len)
			.field("materialized", &self.materialization.len())
			.field("services", &self.binding_order.len())
			.finish()
	}
}

/// A launched application instance: the populated region plus the service
/// access table. Values are shared handles; the context can be used from any
/// thread.
pub struct RuntimeContext {
	region: Region,
	bindings: Arc<HashMap<ServiceKey, ServiceBinding>>,
}

impl RuntimeContext {
	/// Typed access to an unqualified service.
	pub fn get<T: Send + Sync + 'static>(&self) -> LaunchResult<Arc<T>> {
		self.get_by_key(&ServiceKey::of::<T>())
	}

	/// Typed access to a qualified service.
	pub fn get_qualified<T: Send + Sync + 'static>(&self, qualifier: &str) -> LaunchResult<Arc<T>> {
		self.get_by_key(&ServiceKey::qualified::<T>(Qualifier::new(qualifier)))
	}

	/// Typed access by explicit key.
	pub fn get_by_key<T: Send + Sync + 'static>(&self, key: &ServiceKey) -> LaunchResult<Arc<T>> {
		self.raw(key)?
			.downcast::<T>()
			.map_err(|_| LaunchError::TypeMismatch {
				key: key.to_string(),
			})
	}

	/// Erased access by key. Deferred services are recomputed per call.
	pub fn raw(&self, key: &ServiceKey) -> LaunchResult<Value> {
		let binding = self
			.bindings
			.get(key)
			.ok_or_else(|| LaunchError::UnknownService {
				key: key.to_string(),
			})?;
		match binding {
			ServiceBinding::Constant(value) => Ok(value.clone()),
			ServiceBinding::Materialized(slot) => self.region.get(*slot),
			ServiceBinding::Deferred(plan) => plan.invoke(&self.region),
		}
	}

	pub fn region(&self) -> &Region {
		&self.region
	}
}

impl fmt::Debug for RuntimeContext {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RuntimeContext")
			.field("region", &self.region)
			.field("services", &self.bindings.len())
			.finish()
	}
}

/// Compiles every resolved unit and assembles the plan set.
pub(crate) fn compile_plan_set(
	arena: &DependantArena,
	scopes: &FrozenScopes,
	materialization: Vec<DependantId>,
	region_len: usize,
) -> BuildResult<PlanSet> {
	let mut memo: Vec<Option<CompiledPlan>> = vec![None; arena.len()];
	for id in arena.ids() {
		if arena.get(id).kind() != DependantKind::MemberSetter {
			compile(arena, id, &mut memo)?;
		}
	}

	let mut units = Vec::with_capacity(materialization.len());
	for id in materialization {
		let slot = arena.get(id).region_slot().ok_or_else(|| {
			BuildError::Internal(format!("'{}' ordered without a region slot", arena.get(id).label()))
		})?;
		let plan = memo[id.index()]
			.clone()
			.ok_or_else(|| BuildError::Internal(format!("'{}' ordered but not compiled", arena.get(id).label())))?;
		units.push(MaterializedUnit { id, slot, plan });
	}

	let root_registry = scopes.registry(ScopeId::root());
	let mut bindings = HashMap::new();
	let mut binding_order = Vec::new();
	for key in root_registry.keys() {
		let Some(entry) = root_registry.lookup_local(key) else {
			continue;
		};
		let binding = match entry.source() {
			ServiceSource::Constant(value) => ServiceBinding::Constant(value.clone()),
			ServiceSource::Dependant(id) => match arena.get(*id).region_slot() {
				Some(slot) => ServiceBinding::Materialized(slot),
				None => ServiceBinding::Deferred(memo[id.index()].clone().ok_or_else(|| {
					BuildError::Internal(format!(
						"'{}' bound but not compiled",
						arena.get(*id).label()
					))
				})?),
			},
		};
		binding_order.push(key.clone());
		bindings.insert(key.clone(), binding);
	}

	tracing::debug!(
		compiled = memo.iter().filter(|plan| plan.is_some()).count(),
		pooled = units.len(),
		"invocation plans compiled"
	);
	Ok(PlanSet {
		region_len,
		materialization: units,
		bindings: Arc::new(bindings),
		binding_order,
	})
}

/// Compiles one dependant, memoized. Cycle detection has already run, so the
/// recursion over deferred targets terminates.
fn compile(
	arena: &DependantArena,
	id: DependantId,
	memo: &mut Vec<Option<CompiledPlan>>,
) -> BuildResult<CompiledPlan> {
	if let Some(plan) = &memo[id.index()] {
		return Ok(plan.clone());
	}

	let dependant = arena.get(id);
	if dependant.kind() == DependantKind::MemberSetter {
		return Err(BuildError::Internal(format!(
			"member setter '{}' compiles into its owner, not alone",
			dependant.label()
		)));
	}
	let RawInvocable::Bean(factory) = dependant.invocable() else {
		return Err(BuildError::Internal(format!(
			"'{}' carries a setter invocable but is not a member setter",
			dependant.label()
		)));
	};

	let fragments = fragments_for(arena, dependant.label(), dependant.providers(), memo)?;

	let mut setter_units = Vec::with_capacity(dependant.setters().len());
	for setter_id in dependant.setters() {
		let setter = arena.get(*setter_id);
		let RawInvocable::Setter(apply) = setter.invocable() else {
			return Err(BuildError::Internal(format!(
				"'{}' attached as setter without a setter invocable",
				setter.label()
			)));
		};
		let setter_fragments =
			fragments_for(arena, setter.label(), &setter.providers()[1..], memo)?;
		let setter_label: Arc<str> = setter.label().into();
		setter_units.push((setter_label, apply.clone(), setter_fragments));
	}

	let label: Arc<str> = dependant.label().into();
	let factory = factory.clone();
	let collect = compose_arity(&fragments);
	let run_label = Arc::clone(&label);
	let run = Arc::new(move |region: &Region| -> LaunchResult<Value> {
		let args = collect(region)?;
		let mut value = factory(&args).map_err(|source| LaunchError::Factory {
			label: run_label.to_string(),
			source,
		})?;
		for (setter_label, apply, fragments) in &setter_units {
			let mut setter_args = Vec::with_capacity(fragments.len());
			for fragment in fragments {
				setter_args.push(fragment(region)?);
			}
			apply(&mut value, &setter_args).map_err(|source| LaunchError::Factory {
				label: setter_label.to_string(),
				source,
			})?;
		}
		Ok(Arc::from(value))
	});

	let plan = CompiledPlan { label, run };
	memo[id.index()] = Some(plan.clone());
	Ok(plan)
}

/// Zero-arg units become thunks that never touch the region; one-arg units
/// adapt their single fragment; multi-arg units assemble the fragment vector.
fn compose_arity(
	fragments: &[Fragment],
) -> Arc<dyn Fn(&Region) -> LaunchResult<Vec<Option<Value>>> + Send + Sync> {
	match fragments {
		[] => Arc::new(|_region| Ok(Vec::new())),
		[single] => {
			let fragment = single.clone();
			Arc::new(move |region| Ok(vec![fragment(region)?]))
		}
		many => {
			let fragments: Vec<Fragment> = many.to_vec();
			Arc::new(move |region| {
				let mut args = Vec::with_capacity(fragments.len());
				for fragment in &fragments {
					args.push(fragment(region)?);
				}
				Ok(args)
			})
		}
	}
}

fn fragments_for(
	arena: &DependantArena,
	owner: &str,
	slots: &[Option<DependencyProvider>],
	memo: &mut Vec<Option<CompiledPlan>>,
) -> BuildResult<Vec<Fragment>> {
	let mut fragments = Vec::with_capacity(slots.len());
	for (index, slot) in slots.iter().enumerate() {
		let provider = slot.as_ref().ok_or_else(|| {
			BuildError::Internal(format!("compiling '{owner}' with unfilled slot {index}"))
		})?;
		fragments.push(fragment_of(arena, owner, provider, memo)?);
	}
	Ok(fragments)
}

fn fragment_of(
	arena: &DependantArena,
	owner: &str,
	provider: &DependencyProvider,
	memo: &mut Vec<Option<CompiledPlan>>,
) -> BuildResult<Fragment> {
	Ok(match provider {
		DependencyProvider::Constant { value, .. } => {
			let value = value.clone();
			Arc::new(move |_region| Ok(Some(value.clone())))
		}
		DependencyProvider::Service { dependant }
		| DependencyProvider::Ancestor { dependant, .. } => {
			let target = *dependant;
			match arena.get(target).region_slot() {
				Some(slot) => Arc::new(move |region: &Region| region.get(slot).map(Some)),
				None => {
					let plan = compile(arena, target, memo)?;
					Arc::new(move |region: &Region| plan.invoke(region).map(Some))
				}
			}
		}
		DependencyProvider::Absent(_) => Arc::new(|_region| Ok(None)),
		DependencyProvider::Receiver => {
			return Err(BuildError::Internal(format!(
				"receiver provider outside a member setter in '{owner}'"
			)));
		}
	})
}
