//! # Grappelli Core
//!
//! Build-time container engine for Grappelli.
//!
//! ## Overview
//!
//! This crate turns declared services, constants and scopes into a launched
//! object graph. All wiring errors surface while building: duplicate
//! registrations and unsatisfied dependencies are collected into one report,
//! dependency cycles are rejected with the offending chain, and launching an
//! application only runs user factories that already have every argument.
//!
//! ## Features
//!
//! - **[`GraphBuilder`]**: Registration surface and pipeline driver
//! - **[`ServiceKey`]**: Type plus optional qualifier service identity
//! - **[`Dependant`]**: One record per buildable unit, arena-allocated
//! - **[`PlanSet`]**: Compiled invocation plans, ready to launch
//! - **[`RuntimeContext`]**: A launched instance with typed service access
//! - **Scope tree**: Nearest-scope-wins visibility with explicit exports
//!
//! ## Modules
//!
//! - [`key`]: Service identity and the unqualified-key cache
//! - [`descriptor`]: Declared dependency sites and their validation
//! - [`provider`]: Resolved provider slots and erased values
//! - [`dependant`]: Buildable units and the arena that owns them
//! - [`registry`]: Per-scope service tables and export views
//! - [`scope`]: The scope tree and [`GraphBuilder`]
//! - [`region`]: The write-once value pool of a launched instance
//! - [`plan`]: Invocation plan compilation and [`RuntimeContext`]
//! - [`error`]: Build and launch error taxonomy
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use grappelli_core::{GraphBuilder, ServiceKey};
//! use grappelli_core::dependant::{DependantKind, RawInvocable};
//! use grappelli_core::descriptor::Declared;
//! use grappelli_core::provider::BoxedValue;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut builder = GraphBuilder::new("app");
//! let root = builder.root();
//! builder.register_constant(root, ServiceKey::of::<i64>(), "port", Arc::new(8080i64))?;
//!
//! let id = builder.register_dependant(
//!     root,
//!     DependantKind::Constructor,
//!     "Banner::new",
//!     vec![Declared::value::<i64>()],
//!     RawInvocable::Bean(Arc::new(|args| {
//!         let port = args[0]
//!             .as_ref()
//!             .and_then(|value| value.downcast_ref::<i64>())
//!             .copied()
//!             .unwrap_or_default();
//!         Ok(Box::new(format!("listening on {port}")) as BoxedValue)
//!     })),
//! )?;
//! builder.materialize(id);
//! builder.bind(root, ServiceKey::of::<String>(), "Banner::new", id)?;
//!
//! let plans = builder.resolve_and_build()?;
//! let context = plans.launch()?;
//! assert_eq!(*context.get::<String>()?, "listening on 8080");
//! # Ok(())
//! # }
//! ```

pub mod dependant;
pub mod descriptor;
pub mod error;
pub mod key;
pub mod plan;
pub mod provider;
pub mod region;
pub mod registry;
pub mod scope;

mod cycle;
mod resolve;

// Development tools
#[cfg(feature = "dev-tools")]
pub mod visualization;

// Re-export from key module
pub use key::{KeyCache, Qualifier, ServiceKey, TypeInfo};

// Re-export from descriptor module
pub use descriptor::{Declared, DependencyDescriptor, DependencyOrigin, EmptyRepr};

// Re-export from provider module
pub use provider::{BoxedValue, DependencyProvider, Value};

// Re-export from dependant module
pub use dependant::{
	BeanFactory, Dependant, DependantArena, DependantId, DependantKind, RawInvocable,
	SetterFactory, SourceId,
};

// Re-export from registry module
pub use registry::{ExportDecl, ExportView, Registry, ServiceEntry, ServiceSource};

// Re-export from scope module
pub use scope::{FrozenScopes, GraphBuilder, ScopeDescriptor, ScopeId, SourceTable};

// Re-export from region module
pub use region::{Region, RegionSlot};

// Re-export from plan module
pub use plan::{CompiledPlan, PlanSet, RuntimeContext, ServiceBinding};

// Re-export from error module
pub use error::{
	BuildError, BuildReport, BuildResult, DeclarationError, DuplicateService, LaunchError,
	LaunchResult, MissingDependency,
};
