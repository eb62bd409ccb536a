//! # Dependants
//!
//! One record per buildable unit: a constructor, a provider method, or a
//! member setter. Dependants live in an arena and refer to one another by
//! integer id, never by reference, so arbitrary graphs (including the cyclic
//! ones we must reject) stay representable.
//!
//! The `dependencies` and `providers` arrays run in parallel, shifted by one
//! when slot 0 is reserved for an implicit receiver.

use std::fmt;
use std::sync::Arc;

use crate::descriptor::DependencyDescriptor;
use crate::provider::{BoxedValue, DependencyProvider, Value};
use crate::region::RegionSlot;
use crate::scope::ScopeId;

/// Arena index of a dependant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DependantId(usize);

impl DependantId {
	pub fn new(index: usize) -> Self {
		Self(index)
	}

	pub fn index(&self) -> usize {
		self.0
	}
}

impl fmt::Display for DependantId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "#{}", self.0)
	}
}

/// Identifies one installation; members of the same source shadow scope
/// registrations for each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceId(usize);

impl SourceId {
	pub fn new(index: usize) -> Self {
		Self(index)
	}

	pub fn index(&self) -> usize {
		self.0
	}
}

/// What kind of buildable unit a dependant is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependantKind {
	/// Produces the value of a service
	Constructor,
	/// Produces another service from an already built receiver
	ProviderMethod,
	/// Injects into an instance under construction; folded into the owning
	/// bean's plan
	MemberSetter,
}

impl DependantKind {
	/// Slot offset: 1 when slot 0 is reserved for the implicit receiver.
	pub fn receiver_delta(&self) -> usize {
		match self {
			Self::Constructor => 0,
			Self::ProviderMethod | Self::MemberSetter => 1,
		}
	}
}

/// The raw operation a dependant wraps.
///
/// Bean argument slices align with the full provider array, so a provider
/// method sees its receiver first. Setters take the receiver separately and
/// see the providers after it. `None` marks an optional dependency that
/// resolved to the absent sentinel.
#[derive(Clone)]
pub enum RawInvocable {
	/// Produces a new value
	Bean(BeanFactory),
	/// Mutates the receiver in place
	Setter(SetterFactory),
}

pub type BeanFactory =
	Arc<dyn Fn(&[Option<Value>]) -> anyhow::Result<BoxedValue> + Send + Sync>;

pub type SetterFactory =
	Arc<dyn Fn(&mut BoxedValue, &[Option<Value>]) -> anyhow::Result<()> + Send + Sync>;

/// One buildable unit.
pub struct Dependant {
	label: String,
	scope: ScopeId,
	source: Option<SourceId>,
	kind: DependantKind,
	dependencies: Vec<DependencyDescriptor>,
	providers: Vec<Option<DependencyProvider>>,
	needs_cycle_check: bool,
	region_slot: Option<RegionSlot>,
	setters: Vec<DependantId>,
	invocable: RawInvocable,
}

impl Dependant {
	/// Creates an unresolved dependant; every provider slot starts empty
	/// except the receiver slot, which the registrar fills structurally.
	pub fn new(
		label: impl Into<String>,
		scope: ScopeId,
		kind: DependantKind,
		dependencies: Vec<DependencyDescriptor>,
		invocable: RawInvocable,
	) -> Self {
		let delta = kind.receiver_delta();
		let needs_cycle_check = !dependencies.is_empty() || delta == 1;
		let providers = vec![None; dependencies.len() + delta];
		Self {
			label: label.into(),
			scope,
			source: None,
			kind,
			dependencies,
			providers,
			needs_cycle_check,
			region_slot: None,
			setters: Vec::new(),
			invocable,
		}
	}

	pub fn label(&self) -> &str {
		&self.label
	}

	pub fn scope(&self) -> ScopeId {
		self.scope
	}

	pub fn kind(&self) -> DependantKind {
		self.kind
	}

	pub fn source(&self) -> Option<SourceId> {
		self.source
	}

	pub fn set_source(&mut self, source: SourceId) {
		self.source = Some(source);
	}

	pub fn dependencies(&self) -> &[DependencyDescriptor] {
		&self.dependencies
	}

	/// Slot offset of the first real dependency.
	pub fn receiver_delta(&self) -> usize {
		self.kind.receiver_delta()
	}

	/// Provider slot index for dependency `index`.
	pub fn slot_of(&self, index: usize) -> usize {
		index + self.receiver_delta()
	}

	pub fn providers(&self) -> &[Option<DependencyProvider>] {
		&self.providers
	}

	pub fn provider(&self, slot: usize) -> Option<&DependencyProvider> {
		self.providers.get(slot).and_then(|slot| slot.as_ref())
	}

	pub fn fill_slot(&mut self, slot: usize, provider: DependencyProvider) {
		self.providers[slot] = Some(provider);
	}

	/// A dependant is resolved iff every provider slot is filled.
	pub fn is_resolved(&self) -> bool {
		self.providers.iter().all(Option::is_some)
	}

	pub fn needs_cycle_check(&self) -> bool {
		self.needs_cycle_check
	}

	pub fn flag_for_cycle_check(&mut self) {
		self.needs_cycle_check = true;
	}

	pub fn region_slot(&self) -> Option<RegionSlot> {
		self.region_slot
	}

	pub fn assign_region_slot(&mut self, slot: RegionSlot) {
		self.region_slot = Some(slot);
	}

	/// Opts the dependant out of the shared pool; its callable then runs at
	/// each use site.
	pub fn clear_region_slot(&mut self) {
		self.region_slot = None;
	}

	pub fn setters(&self) -> &[DependantId] {
		&self.setters
	}

	pub fn attach_setter(&mut self, setter: DependantId) {
		self.setters.push(setter);
	}

	pub fn invocable(&self) -> &RawInvocable {
		&self.invocable
	}

	/// Backing dependants of the filled slots, in slot order.
	pub fn provider_edges(&self) -> impl Iterator<Item = DependantId> + '_ {
		self.providers
			.iter()
			.flatten()
			.filter_map(DependencyProvider::backing_dependant)
	}
}

impl fmt::Debug for Dependant {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Dependant")
			.field("label", &self.label)
			.field("scope", &self.scope)
			.field("kind", &self.kind)
			.field("dependencies", &self.dependencies.len())
			.field("resolved", &self.is_resolved())
			.field("region_slot", &self.region_slot)
			.finish()
	}
}

/// Arena owning every dependant of a build.
#[derive(Debug, Default)]
pub struct DependantArena {
	items: Vec<Dependant>,
}

impl DependantArena {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn alloc(&mut self, dependant: Dependant) -> DependantId {
		let id = DependantId::new(self.items.len());
		self.items.push(dependant);
		id
	}

	pub fn get(&self, id: DependantId) -> &Dependant {
		&self.items[id.index()]
	}

	pub fn get_mut(&mut self, id: DependantId) -> &mut Dependant {
		&mut self.items[id.index()]
	}

	pub fn len(&self) -> usize {
		self.items.len()
	}

	pub fn is_empty(&self) -> bool {
		self.items.is_empty()
	}

	/// Ids in insertion order; every deterministic traversal starts here.
	pub fn ids(&self) -> impl Iterator<Item = DependantId> + use<> {
		(0..self.items.len()).map(DependantId::new)
	}

	pub fn iter(&self) -> impl Iterator<Item = (DependantId, &Dependant)> {
		self.items
			.iter()
			.enumerate()
			.map(|(index, dependant)| (DependantId::new(index), dependant))
	}
}
