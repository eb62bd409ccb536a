//! # Scope Graph
//!
//! The build-time state of a container: the scope tree, the dependant arena,
//! installation sources and the key cache, all owned by one [`GraphBuilder`].
//!
//! Registration runs against open scopes; closing a scope freezes its
//! registry and publishes its export view into the parent. `resolve_and_build`
//! consumes the builder and drives the whole pipeline: freeze, resolve, cycle
//! check, plan compilation.

use std::fmt;

use crate::cycle;
use crate::dependant::{Dependant, DependantArena, DependantId, DependantKind, RawInvocable, SourceId};
use crate::descriptor::{extract, Declared, DependencyOrigin};
use crate::error::{BuildError, BuildReport, BuildResult};
use crate::key::{KeyCache, ServiceKey, TypeInfo};
use crate::plan::{self, PlanSet};
use crate::provider::{DependencyProvider, Value};
use crate::region::RegionSlot;
use crate::registry::{ExportDecl, Registry, RegistryBuilder, ServiceEntry, ServiceSource};
use crate::resolve;

/// Index of a scope in the graph. The root is always scope 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(usize);

impl ScopeId {
	pub fn root() -> Self {
		Self(0)
	}

	pub fn new(index: usize) -> Self {
		Self(index)
	}

	pub fn index(&self) -> usize {
		self.0
	}

	pub fn is_root(&self) -> bool {
		self.0 == 0
	}
}

impl fmt::Display for ScopeId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "scope#{}", self.0)
	}
}

/// Well-known constant every scope registers about itself, so diagnostic
/// beans can observe where they live. Nearest scope wins like any other
/// registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeDescriptor {
	pub name: String,
	pub path: String,
}

enum RegistryState {
	Open(RegistryBuilder),
	Frozen(Registry),
}

struct ScopeState {
	name: String,
	path: String,
	parent: Option<ScopeId>,
	registry: RegistryState,
}

impl ScopeState {
	fn is_open(&self) -> bool {
		matches!(self.registry, RegistryState::Open(_))
	}
}

/// Member lists per installation source; members of one source shadow scope
/// registrations for each other.
#[derive(Debug, Default)]
pub struct SourceTable {
	members: Vec<Vec<(ServiceKey, DependantId)>>,
}

impl SourceTable {
	fn new_source(&mut self) -> SourceId {
		let id = SourceId::new(self.members.len());
		self.members.push(Vec::new());
		id
	}

	fn record(&mut self, source: SourceId, key: ServiceKey, id: DependantId) {
		self.members[source.index()].push((key, id));
	}

	/// First member providing `key`, excluding the requester itself.
	pub fn find(
		&self,
		source: SourceId,
		key: &ServiceKey,
		exclude: DependantId,
	) -> Option<DependantId> {
		self.members[source.index()]
			.iter()
			.find(|(member_key, id)| member_key == key && *id != exclude)
			.map(|(_, id)| *id)
	}
}

/// Frozen view of every scope, used by resolution and plan compilation.
pub struct FrozenScopes {
	scopes: Vec<(String, Option<ScopeId>, Registry)>,
}

impl FrozenScopes {
	pub fn registry(&self, scope: ScopeId) -> &Registry {
		&self.scopes[scope.index()].2
	}

	pub fn path(&self, scope: ScopeId) -> &str {
		&self.scopes[scope.index()].0
	}

	pub fn parent(&self, scope: ScopeId) -> Option<ScopeId> {
		self.scopes[scope.index()].1
	}

	pub fn len(&self) -> usize {
		self.scopes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.scopes.is_empty()
	}

	/// Nearest-scope-wins lookup: own entries first, then the parent chain.
	pub fn lookup(&self, from: ScopeId, key: &ServiceKey) -> Option<(ScopeId, &ServiceEntry)> {
		let mut cursor = Some(from);
		while let Some(scope) = cursor {
			if let Some(entry) = self.registry(scope).lookup_local(key) {
				return Some((scope, entry));
			}
			cursor = self.parent(scope);
		}
		None
	}
}

/// Everything the post-freeze pipeline stages work on.
pub(crate) struct FrozenBuild {
	pub(crate) scopes: FrozenScopes,
	pub(crate) arena: DependantArena,
	pub(crate) sources: SourceTable,
	pub(crate) report: BuildReport,
	pub(crate) region_len: usize,
}

/// Owns all build-time state and drives the pipeline.
pub struct GraphBuilder {
	scopes: Vec<ScopeState>,
	arena: DependantArena,
	sources: SourceTable,
	key_cache: KeyCache,
	report: BuildReport,
	next_region_slot: usize,
}

impl GraphBuilder {
	/// Creates a builder with an open root scope.
	pub fn new(root_name: impl Into<String>) -> Self {
		let root_name = root_name.into();
		let mut builder = Self {
			scopes: Vec::new(),
			arena: DependantArena::new(),
			sources: SourceTable::default(),
			key_cache: KeyCache::new(),
			report: BuildReport::new(),
			next_region_slot: 0,
		};
		builder.push_scope(None, root_name);
		builder
	}

	pub fn root(&self) -> ScopeId {
		ScopeId::root()
	}

	pub fn key_cache(&mut self) -> &mut KeyCache {
		&mut self.key_cache
	}

	pub fn scope_name(&self, scope: ScopeId) -> &str {
		&self.scopes[scope.index()].name
	}

	pub fn scope_path(&self, scope: ScopeId) -> &str {
		&self.scopes[scope.index()].path
	}

	pub fn arena(&self) -> &DependantArena {
		&self.arena
	}

	pub fn dependant(&self, id: DependantId) -> &Dependant {
		self.arena.get(id)
	}

	fn push_scope(&mut self, parent: Option<ScopeId>, name: String) -> ScopeId {
		let path = match parent {
			Some(parent_id) => format!("{}/{}", self.scopes[parent_id.index()].path, name),
			None => name.clone(),
		};
		let id = ScopeId::new(self.scopes.len());
		self.scopes.push(ScopeState {
			name: name.clone(),
			path: path.clone(),
			parent,
			registry: RegistryState::Open(RegistryBuilder::new(name.clone())),
		});
		let descriptor_key = self.key_cache.intern(TypeInfo::of::<ScopeDescriptor>());
		let descriptor = ScopeDescriptor { name, path };
		self.put_entry(
			id,
			descriptor_key,
			ServiceEntry::constant("scope descriptor", std::sync::Arc::new(descriptor)),
		);
		id
	}

	fn open_registry(&mut self, scope: ScopeId) -> BuildResult<&mut RegistryBuilder> {
		let state = &mut self.scopes[scope.index()];
		match &mut state.registry {
			RegistryState::Open(builder) => Ok(builder),
			RegistryState::Frozen(_) => Err(BuildError::Internal(format!(
				"registration against closed scope '{}'",
				state.path
			))),
		}
	}

	fn put_entry(&mut self, scope: ScopeId, key: ServiceKey, entry: ServiceEntry) {
		let report = &mut self.report;
		if let RegistryState::Open(builder) = &mut self.scopes[scope.index()].registry {
			builder.put(key, entry, report);
		}
	}

	/// Opens a child scope under an open parent.
	pub fn register_scope(
		&mut self,
		parent: ScopeId,
		name: impl Into<String>,
	) -> BuildResult<ScopeId> {
		self.open_registry(parent)?;
		Ok(self.push_scope(Some(parent), name.into()))
	}

	/// Registers a fixed value under the given key.
	pub fn register_constant(
		&mut self,
		scope: ScopeId,
		key: ServiceKey,
		label: impl Into<String>,
		value: Value,
	) -> BuildResult<()> {
		self.open_registry(scope)?;
		self.put_entry(scope, key, ServiceEntry::constant(label, value));
		Ok(())
	}

	/// Registers a buildable unit from a `(label, declared sites, invocable)`
	/// triple. Declaration problems fail fast here.
	pub fn register_dependant(
		&mut self,
		scope: ScopeId,
		kind: DependantKind,
		label: impl Into<String>,
		declared: Vec<Declared>,
		invocable: RawInvocable,
	) -> BuildResult<DependantId> {
		self.open_registry(scope)?;
		let label = label.into();
		let mut dependencies = Vec::with_capacity(declared.len());
		for (index, site) in declared.iter().enumerate() {
			let origin = DependencyOrigin::new(label.clone(), index);
			dependencies.push(extract(site, origin, &mut self.key_cache)?);
		}
		Ok(self
			.arena
			.alloc(Dependant::new(label, scope, kind, dependencies, invocable)))
	}

	/// Assigns the next region slot; the unit will be materialized at launch.
	pub fn materialize(&mut self, id: DependantId) {
		if self.arena.get(id).region_slot().is_none() {
			let slot = RegionSlot::new(self.next_region_slot);
			self.next_region_slot += 1;
			self.arena.get_mut(id).assign_region_slot(slot);
		}
	}

	/// Opts a unit out of the shared pool.
	pub fn defer(&mut self, id: DependantId) {
		self.arena.get_mut(id).clear_region_slot();
	}

	/// Opens a new installation source.
	pub fn new_source(&mut self) -> SourceId {
		self.sources.new_source()
	}

	/// Records that a member of `source` provides `key`, and tags the
	/// dependant with its source.
	pub fn record_provides(&mut self, source: SourceId, key: ServiceKey, id: DependantId) {
		self.arena.get_mut(id).set_source(source);
		self.sources.record(source, key, id);
	}

	/// The dependant bound under `key` in the scope's own registry, if any.
	/// Constants do not qualify.
	pub fn lookup_dependant(&self, scope: ScopeId, key: &ServiceKey) -> Option<DependantId> {
		let entry = match &self.scopes[scope.index()].registry {
			RegistryState::Open(builder) => builder.get_local(key),
			RegistryState::Frozen(registry) => registry.lookup_local(key),
		};
		entry.and_then(|entry| match entry.source() {
			ServiceSource::Dependant(id) => Some(*id),
			ServiceSource::Constant(_) => None,
		})
	}

	/// Associates a key with a dependant in a scope's registry.
	pub fn bind(
		&mut self,
		scope: ScopeId,
		key: ServiceKey,
		label: impl Into<String>,
		id: DependantId,
	) -> BuildResult<()> {
		self.open_registry(scope)?;
		self.put_entry(scope, key, ServiceEntry::dependant(label, id));
		Ok(())
	}

	/// Links a provider method's receiver slot to its declaring bean. The
	/// edge is a real service edge, so ordering and cycle detection see it.
	pub fn link_receiver(&mut self, method: DependantId, declaring: DependantId) -> BuildResult<()> {
		let dependant = self.arena.get(method);
		if dependant.kind() != DependantKind::ProviderMethod {
			return Err(BuildError::Internal(format!(
				"receiver link on non-method dependant '{}'",
				dependant.label()
			)));
		}
		self.arena
			.get_mut(method)
			.fill_slot(0, DependencyProvider::Service { dependant: declaring });
		Ok(())
	}

	/// Attaches a member setter to the bean it configures. The setter's
	/// receiver slot is bound to the value under construction and the owner
	/// is flagged for cycle checking since the setter's dependencies become
	/// its edges.
	pub fn attach_setter(&mut self, owner: DependantId, setter: DependantId) -> BuildResult<()> {
		let kind = self.arena.get(setter).kind();
		if kind != DependantKind::MemberSetter {
			return Err(BuildError::Internal(format!(
				"'{}' attached as setter but is {kind:?}",
				self.arena.get(setter).label()
			)));
		}
		self.arena
			.get_mut(setter)
			.fill_slot(0, DependencyProvider::Receiver);
		let owner_dependant = self.arena.get_mut(owner);
		owner_dependant.attach_setter(setter);
		owner_dependant.flag_for_cycle_check();
		Ok(())
	}

	/// Declares an export wiring on a scope; applied when the scope closes.
	pub fn declare_export(&mut self, scope: ScopeId, decl: ExportDecl) -> BuildResult<()> {
		if self.scopes[scope.index()].parent.is_none() {
			return Err(BuildError::Internal(format!(
				"export declared on root scope '{}'",
				self.scopes[scope.index()].path
			)));
		}
		self.open_registry(scope)?.declare_export(decl);
		Ok(())
	}

	/// Closes a scope: computes its export view, publishes it into the
	/// parent, and freezes the registry.
	pub fn close_scope(&mut self, scope: ScopeId) -> BuildResult<()> {
		if !self.scopes[scope.index()].is_open() {
			return Err(BuildError::Internal(format!(
				"scope '{}' closed twice",
				self.scopes[scope.index()].path
			)));
		}
		if let Some(child) = self
			.scopes
			.iter()
			.position(|state| state.parent == Some(scope) && state.is_open())
		{
			return Err(BuildError::Internal(format!(
				"scope '{}' closed before its child '{}'",
				self.scopes[scope.index()].path, self.scopes[child].path
			)));
		}
		let parent = self.scopes[scope.index()].parent;
		if let Some(parent_id) = parent {
			self.open_registry(parent_id)?;
		}

		let placeholder =
			RegistryState::Frozen(RegistryBuilder::new(self.scopes[scope.index()].name.clone()).freeze());
		let state = std::mem::replace(&mut self.scopes[scope.index()].registry, placeholder);
		let RegistryState::Open(builder) = state else {
			return Err(BuildError::Internal(format!(
				"scope '{}' closed twice",
				self.scopes[scope.index()].path
			)));
		};

		let view = builder.export_view();
		for key in view.missing_required() {
			self.report.record_missing(
				key.to_string(),
				format!("export from '{}'", self.scopes[scope.index()].path),
			);
		}
		if let Some(parent_id) = parent {
			for exported in view.entries() {
				self.put_entry(parent_id, exported.publish_key.clone(), exported.entry.clone());
			}
		}

		self.scopes[scope.index()].registry = RegistryState::Frozen(builder.freeze());
		tracing::debug!(scope = %self.scopes[scope.index()].path, "scope closed");
		Ok(())
	}

	/// Number of region slots assigned so far.
	pub fn region_len(&self) -> usize {
		self.next_region_slot
	}

	/// Sketches the declared graph for Graphviz rendering.
	#[cfg(feature = "dev-tools")]
	pub fn dependency_graph(&self) -> crate::visualization::DependencyGraph {
		let mut graph = crate::visualization::DependencyGraph::new();
		for (_, dependant) in self.arena.iter() {
			let role = match dependant.kind() {
				DependantKind::MemberSetter => "setter",
				_ if dependant.region_slot().is_some() => "pooled",
				_ => "deferred",
			};
			graph.add_node(dependant.label(), role);
		}
		for (_, dependant) in self.arena.iter() {
			for dependency in dependant.dependencies() {
				let key = dependency.key().to_string();
				graph.ensure_node(key.clone(), "service");
				if dependency.is_optional() {
					graph.add_optional_dependency(dependant.label(), key);
				} else {
					graph.add_dependency(dependant.label(), key);
				}
			}
		}
		graph
	}

	/// Closes whatever is still open and hands back the frozen build state.
	pub(crate) fn freeze(mut self) -> BuildResult<FrozenBuild> {
		// Children were created after their parents, so reverse creation
		// order closes leaves first.
		for index in (0..self.scopes.len()).rev() {
			if self.scopes[index].is_open() {
				self.close_scope(ScopeId::new(index))?;
			}
		}

		let scopes = FrozenScopes {
			scopes: self
				.scopes
				.into_iter()
				.map(|state| {
					let registry = match state.registry {
						RegistryState::Frozen(registry) => registry,
						RegistryState::Open(builder) => builder.freeze(),
					};
					(state.path, state.parent, registry)
				})
				.collect(),
		};
		tracing::debug!(
			scopes = scopes.len(),
			dependants = self.arena.len(),
			"registries frozen"
		);

		Ok(FrozenBuild {
			scopes,
			arena: self.arena,
			sources: self.sources,
			report: self.report,
			region_len: self.next_region_slot,
		})
	}

	/// Runs the whole pipeline: close remaining scopes, resolve every
	/// dependant, check for cycles, compile the plan set.
	pub fn resolve_and_build(self) -> BuildResult<PlanSet> {
		let FrozenBuild {
			scopes,
			mut arena,
			sources,
			mut report,
			region_len,
		} = self.freeze()?;

		resolve::resolve(&mut arena, &scopes, &sources, &mut report);
		report.into_result()?;

		let materialization = cycle::detect_and_order(&arena)?;
		tracing::debug!(materialized = materialization.len(), "dependency order computed");

		plan::compile_plan_set(&arena, &scopes, materialization, region_len)
	}
}

impl fmt::Debug for GraphBuilder {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("GraphBuilder")
			.field("scopes", &self.scopes.len())
			.field("dependants", &self.arena.len())
			.field("region_slots", &self.next_region_slot)
			.finish()
	}
}
