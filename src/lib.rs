//! # Grappelli
//!
//! A build-time dependency injection container and invocation-plan compiler for Rust.
//!
//! Grappelli wires an application together before it runs. Services, constants
//! and scopes are declared up front; every dependency edge is resolved and
//! cycle-checked while building; the finished build compiles into invocation
//! plans that launch without further lookups. A factory never observes a
//! half-wired container.
//!
//! ## Core Principles
//!
//! - **Fail at build time**: duplicate registrations, unsatisfied dependencies
//!   and dependency cycles are all reported before any factory runs
//! - **Scopes over globals**: services live in a scope tree, visible to their
//!   own scope and its descendants unless explicitly exported upward
//! - **Plans over reflection**: each constructor call compiles into a plan
//!   with its arguments prearranged, so launching is a straight walk
//! - **Typed surface**: factories are plain functions over `Arc<T>` arguments,
//!   with `Option<Arc<T>>` for dependencies that may be absent
//!
//! ## Feature Flags
//!
//! ### Presets
//!
//! - `minimal` - Engine only (keys, scopes, resolution, plan compilation)
//! - `assembly` (default) - Engine plus the container builder surface
//! - `full` - All features enabled
//!
//! ### Fine-grained Control
//!
//! - `assembly` - Assemblies, [`ContainerBuilder`] and typed factory traits
//! - `dev-tools` - Dependency graph export and build statistics
//!
//! ## Quick Example
//!
//! ```rust
//! use grappelli::prelude::*;
//!
//! struct Clock {
//!     tick_ms: i64,
//! }
//!
//! struct Reporter {
//!     line: String,
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut builder = ContainerBuilder::new("app");
//!     builder.constant("tick_ms", 250i64)?;
//!     builder
//!         .bean("Clock::new", |tick_ms: Arc<i64>| Clock { tick_ms: *tick_ms })?
//!         .finish();
//!     builder
//!         .bean("Reporter::new", |clock: Arc<Clock>| Reporter {
//!             line: format!("tick every {}ms", clock.tick_ms),
//!         })?
//!         .finish();
//!
//!     let application = builder.build()?;
//!     let context = application.launch()?;
//!     assert_eq!(context.get::<Reporter>()?.line, "tick every 250ms");
//!     Ok(())
//! }
//! ```

// Module re-exports following the workspace layout
#[cfg(feature = "assembly")]
pub mod assembly;
pub mod core;

// Re-export service identity
pub use grappelli_core::{KeyCache, Qualifier, ServiceKey, TypeInfo};

// Re-export dependency declarations
pub use grappelli_core::{Declared, DependencyDescriptor, DependencyOrigin, EmptyRepr};

// Re-export the registration surface
pub use grappelli_core::{FrozenScopes, GraphBuilder, ScopeDescriptor, ScopeId};

// Re-export registries and export views
pub use grappelli_core::{ExportDecl, ExportView, Registry, ServiceEntry, ServiceSource};

// Re-export launch types
pub use grappelli_core::{
	CompiledPlan, PlanSet, Region, RegionSlot, RuntimeContext, ServiceBinding,
};

// Re-export errors
pub use grappelli_core::{
	BuildError, BuildReport, BuildResult, DeclarationError, DuplicateService, LaunchError,
	LaunchResult, MissingDependency,
};

// Re-export the composition surface
#[cfg(feature = "assembly")]
pub use grappelli_assembly::{Application, Assembly, BeanRegistration, ContainerBuilder};

// Re-export typed factory traits
#[cfg(feature = "assembly")]
pub use grappelli_assembly::{BeanFunction, FallibleBeanFunction, FromResolved, SetterFunction};

// Re-export graph tooling
#[cfg(feature = "dev-tools")]
pub use grappelli_core::visualization::{DependencyGraph, GraphEdge, GraphNode, GraphStatistics};

pub mod prelude {
	// Engine types - always available
	pub use crate::{
		BuildError,
		BuildResult,
		Declared,
		GraphBuilder,
		LaunchError,
		LaunchResult,
		Qualifier,
		RuntimeContext,
		ScopeDescriptor,
		ServiceKey,
	};

	// Std - factory signatures exchange shared handles
	pub use std::sync::Arc;

	// Assembly feature - builder surface and typed factories
	#[cfg(feature = "assembly")]
	pub use crate::{Application, Assembly, BeanRegistration, ContainerBuilder};

	// Dev-tools feature - graph export
	#[cfg(feature = "dev-tools")]
	pub use crate::{DependencyGraph, GraphStatistics};
}
