//! # Container Builder
//!
//! The typed registration surface over the core graph builder. Registrations
//! run against a cursor scope; `scope` nests a child scope for the duration
//! of a closure and closes it (publishing its exports) on the way out.
//!
//! `bean` and friends return a [`BeanRegistration`] handle whose chained
//! methods shape the binding. The handle writes the binding when it drops, so
//! qualifier, pool policy and exports are all known by then. Errors raised
//! that late are stashed on the builder and surface at `build`.

use std::marker::PhantomData;
use std::sync::Arc;

use grappelli_core::dependant::{DependantId, DependantKind, RawInvocable, SourceId};
use grappelli_core::descriptor::Declared;
use grappelli_core::error::{BuildError, BuildResult, DeclarationError};
use grappelli_core::key::{Qualifier, ServiceKey};
use grappelli_core::provider::BoxedValue;
use grappelli_core::registry::ExportDecl;
use grappelli_core::scope::{GraphBuilder, ScopeId};

use crate::application::Application;
use crate::assembly::Assembly;
use crate::factory::{BeanFunction, FallibleBeanFunction, SetterFunction};

/// Builds a container: scopes, constants, beans and assemblies.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use grappelli_assembly::ContainerBuilder;
///
/// struct Greeter {
///     line: String,
/// }
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut builder = ContainerBuilder::new("app");
/// builder.constant("name", "world".to_string())?;
/// builder.bean("Greeter::new", |name: Arc<String>| Greeter {
///     line: format!("hello {name}"),
/// })?;
///
/// let context = builder.build()?.launch()?;
/// assert_eq!(context.get::<Greeter>()?.line, "hello world");
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ContainerBuilder {
	graph: GraphBuilder,
	cursor: ScopeId,
	source: Option<SourceId>,
	stashed: Option<BuildError>,
}

impl ContainerBuilder {
	/// Creates a builder whose root scope carries the given name.
	pub fn new(name: impl Into<String>) -> Self {
		let graph = GraphBuilder::new(name);
		let cursor = graph.root();
		Self {
			graph,
			cursor,
			source: None,
			stashed: None,
		}
	}

	/// Runs `body` against a child scope. The scope closes when the closure
	/// returns; its exported services publish into the current scope, and
	/// everything else becomes invisible to later registrations.
	pub fn scope<F>(&mut self, name: impl Into<String>, body: F) -> BuildResult<()>
	where
		F: FnOnce(&mut ContainerBuilder) -> BuildResult<()>,
	{
		let child = self.graph.register_scope(self.cursor, name)?;
		let parent = std::mem::replace(&mut self.cursor, child);
		let result = body(self);
		self.cursor = parent;
		result?;
		self.graph.close_scope(child)
	}

	/// Installs an assembly under a fresh installation source. Members of one
	/// assembly provide for each other before any scope lookup applies.
	pub fn install(&mut self, assembly: impl Assembly) -> BuildResult<()> {
		let source = self.graph.new_source();
		let previous = self.source.replace(source);
		tracing::debug!(assembly = assembly.name(), "installing assembly");
		let result = assembly.configure(self);
		self.source = previous;
		result
	}

	/// Registers a fixed value under its unqualified type key.
	pub fn constant<T: Send + Sync + 'static>(
		&mut self,
		label: impl Into<String>,
		value: T,
	) -> BuildResult<()> {
		self.graph
			.register_constant(self.cursor, ServiceKey::of::<T>(), label, Arc::new(value))
	}

	/// Registers a fixed value under a qualified key.
	pub fn qualified_constant<T: Send + Sync + 'static>(
		&mut self,
		label: impl Into<String>,
		qualifier: impl Into<Qualifier>,
		value: T,
	) -> BuildResult<()> {
		self.graph.register_constant(
			self.cursor,
			ServiceKey::qualified::<T>(qualifier.into()),
			label,
			Arc::new(value),
		)
	}

	/// Registers a bean. Dependency sites derive from the factory's parameter
	/// types: `Arc<T>` is required, `Option<Arc<T>>` optional.
	pub fn bean<F, Args>(
		&mut self,
		label: impl Into<String>,
		factory: F,
	) -> BuildResult<BeanRegistration<'_, F::Output>>
	where
		F: BeanFunction<Args>,
	{
		let invocable = RawInvocable::Bean(Arc::new(move |args| {
			Ok(Box::new(factory.call(args)?) as BoxedValue)
		}));
		self.register_bean(label.into(), F::declared_sites(), invocable)
	}

	/// Registers a bean with explicitly declared sites, for qualified or
	/// fallback-annotated dependencies the parameter types cannot express.
	/// The list must match the factory's arity.
	pub fn bean_with<F, Args>(
		&mut self,
		label: impl Into<String>,
		sites: Vec<Declared>,
		factory: F,
	) -> BuildResult<BeanRegistration<'_, F::Output>>
	where
		F: BeanFunction<Args>,
	{
		let label = label.into();
		let expected = F::declared_sites().len();
		if sites.len() != expected {
			return Err(DeclarationError::ArityMismatch {
				site: label,
				expected,
				actual: sites.len(),
			}
			.into());
		}
		let invocable = RawInvocable::Bean(Arc::new(move |args| {
			Ok(Box::new(factory.call(args)?) as BoxedValue)
		}));
		self.register_bean(label, sites, invocable)
	}

	/// Registers a bean whose factory can fail; the failure aborts the launch
	/// that runs it.
	pub fn try_bean<F, Args>(
		&mut self,
		label: impl Into<String>,
		factory: F,
	) -> BuildResult<BeanRegistration<'_, F::Output>>
	where
		F: FallibleBeanFunction<Args>,
	{
		let invocable = RawInvocable::Bean(Arc::new(move |args| {
			Ok(Box::new(factory.call(args)?) as BoxedValue)
		}));
		self.register_bean(label.into(), F::declared_sites(), invocable)
	}

	/// Registers a provider method: a unit produced from an already
	/// registered declaring bean, which arrives as the method's first
	/// argument. The declaring bean is located by that argument's type in the
	/// current scope.
	pub fn provider<F, Args>(
		&mut self,
		label: impl Into<String>,
		method: F,
	) -> BuildResult<BeanRegistration<'_, F::Output>>
	where
		F: BeanFunction<Args>,
	{
		let label = label.into();
		let mut sites = F::declared_sites();
		if sites.is_empty() {
			return Err(DeclarationError::ArityMismatch {
				site: label,
				expected: 1,
				actual: 0,
			}
			.into());
		}
		let receiver = sites.remove(0);
		let receiver_key = ServiceKey::from_type(receiver.type_info());
		let declaring = self
			.graph
			.lookup_dependant(self.cursor, &receiver_key)
			.ok_or_else(|| DeclarationError::UnknownReceiver {
				site: label.clone(),
				key: receiver_key.to_string(),
			})?;
		let invocable = RawInvocable::Bean(Arc::new(move |args| {
			Ok(Box::new(method.call(args)?) as BoxedValue)
		}));
		let id = self.graph.register_dependant(
			self.cursor,
			DependantKind::ProviderMethod,
			label.clone(),
			sites,
			invocable,
		)?;
		self.graph.link_receiver(id, declaring)?;
		Ok(BeanRegistration::new(self, id, label))
	}

	/// Escape hatch onto the underlying graph builder, for declarations the
	/// typed surface cannot express. Raw registrations land in whichever
	/// scope [`current_scope`](Self::current_scope) reports.
	pub fn graph(&mut self) -> &mut GraphBuilder {
		&mut self.graph
	}

	/// The scope the next registration lands in.
	pub fn current_scope(&self) -> ScopeId {
		self.cursor
	}

	/// Finishes registration and runs the build pipeline: freeze every scope,
	/// resolve, check for cycles, compile invocation plans.
	pub fn build(mut self) -> BuildResult<Application> {
		if let Some(err) = self.stashed.take() {
			return Err(err);
		}
		let plans = self.graph.resolve_and_build()?;
		Ok(Application::new(plans))
	}

	/// Sketches the declared graph for Graphviz rendering.
	#[cfg(feature = "dev-tools")]
	pub fn dependency_graph(&self) -> grappelli_core::visualization::DependencyGraph {
		self.graph.dependency_graph()
	}

	fn register_bean<T: Send + Sync + 'static>(
		&mut self,
		label: String,
		sites: Vec<Declared>,
		invocable: RawInvocable,
	) -> BuildResult<BeanRegistration<'_, T>> {
		let id = self.graph.register_dependant(
			self.cursor,
			DependantKind::Constructor,
			label.clone(),
			sites,
			invocable,
		)?;
		Ok(BeanRegistration::new(self, id, label))
	}

	fn stash(&mut self, err: BuildError) {
		tracing::warn!(error = %err, "deferred registration error");
		if self.stashed.is_none() {
			self.stashed = Some(err);
		}
	}
}

/// Handle over a just-registered bean. Chained methods shape the binding;
/// the binding itself is written when the handle goes out of scope.
pub struct BeanRegistration<'a, T: Send + Sync + 'static> {
	builder: &'a mut ContainerBuilder,
	id: DependantId,
	label: String,
	qualifier: Option<Qualifier>,
	deferred: bool,
	exports: Vec<(Option<Qualifier>, bool)>,
	applied: bool,
	_marker: PhantomData<fn() -> T>,
}

impl<'a, T: Send + Sync + 'static> BeanRegistration<'a, T> {
	fn new(builder: &'a mut ContainerBuilder, id: DependantId, label: String) -> Self {
		Self {
			builder,
			id,
			label,
			qualifier: None,
			deferred: false,
			exports: Vec::new(),
			applied: false,
			_marker: PhantomData,
		}
	}

	pub fn id(&self) -> DependantId {
		self.id
	}

	/// Binds the service under a qualified key instead of the bare type key.
	pub fn qualified(mut self, qualifier: impl Into<Qualifier>) -> Self {
		self.qualifier = Some(qualifier.into());
		self
	}

	/// Opts the bean out of the shared pool; its factory then runs at every
	/// use site instead of once at launch.
	pub fn deferred(mut self) -> Self {
		self.deferred = true;
		self
	}

	/// Exports the service to the parent scope when this scope closes. The
	/// build fails if the service is missing by then.
	pub fn export(mut self) -> Self {
		self.exports.push((None, true));
		self
	}

	/// Exports under a different qualifier.
	pub fn export_as(mut self, qualifier: impl Into<Qualifier>) -> Self {
		self.exports.push((Some(qualifier.into()), true));
		self
	}

	/// Exports the service if it is present when the scope closes; a missing
	/// service is skipped instead of failing the build.
	pub fn export_optional(mut self) -> Self {
		self.exports.push((None, false));
		self
	}

	/// Attaches a member setter, run right after the factory with its own
	/// resolved dependencies. Setter dependencies count as the bean's edges
	/// for ordering and cycle checks.
	pub fn with_setter<S, Args>(mut self, label: impl Into<String>, setter: S) -> Self
	where
		S: SetterFunction<T, Args>,
	{
		let invocable = RawInvocable::Setter(Arc::new(move |value, args| {
			let receiver = value.downcast_mut::<T>().ok_or_else(|| {
				anyhow::anyhow!("receiver is not a {}", std::any::type_name::<T>())
			})?;
			setter.apply(receiver, args)
		}));
		let cursor = self.builder.cursor;
		let result = self
			.builder
			.graph
			.register_dependant(
				cursor,
				DependantKind::MemberSetter,
				label.into(),
				S::declared_sites(),
				invocable,
			)
			.and_then(|setter_id| self.builder.graph.attach_setter(self.id, setter_id));
		if let Err(err) = result {
			self.builder.stash(err);
		}
		self
	}

	/// Writes the binding now instead of when the handle drops.
	pub fn finish(mut self) {
		self.flush();
	}

	fn service_key(&self) -> ServiceKey {
		match &self.qualifier {
			Some(qualifier) => ServiceKey::qualified::<T>(qualifier.clone()),
			None => ServiceKey::of::<T>(),
		}
	}

	fn flush(&mut self) {
		if self.applied {
			return;
		}
		self.applied = true;

		let cursor = self.builder.cursor;
		let key = self.service_key();
		if self.deferred {
			self.builder.graph.defer(self.id);
		} else {
			self.builder.graph.materialize(self.id);
		}
		if let Err(err) = self
			.builder
			.graph
			.bind(cursor, key.clone(), self.label.clone(), self.id)
		{
			self.builder.stash(err);
		}
		if let Some(source) = self.builder.source {
			self.builder.graph.record_provides(source, key.clone(), self.id);
		}

		let exports = std::mem::take(&mut self.exports);
		if !exports.is_empty() && cursor.is_root() {
			self.builder.stash(
				DeclarationError::RootExport {
					site: self.label.clone(),
				}
				.into(),
			);
			return;
		}
		for (publish_as, required) in exports {
			let mut decl = if required {
				ExportDecl::required(key.clone())
			} else {
				ExportDecl::optional(key.clone())
			};
			if let Some(qualifier) = publish_as {
				decl = decl.publish_as(ServiceKey::qualified::<T>(qualifier));
			}
			if let Err(err) = self.builder.graph.declare_export(cursor, decl) {
				self.builder.stash(err);
			}
		}
	}
}

impl<T: Send + Sync + 'static> Drop for BeanRegistration<'_, T> {
	fn drop(&mut self) {
		self.flush();
	}
}
