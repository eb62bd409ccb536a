//! # Grappelli Assembly
//!
//! Typed composition surface over the Grappelli container engine.
//!
//! ## Overview
//!
//! This crate is where containers are described: scopes, constants, beans,
//! provider methods, member setters and installable [`Assembly`] bundles.
//! The factory functions are ordinary Rust closures or `fn` items; their
//! parameter types declare the dependency sites (`Arc<T>` required,
//! `Option<Arc<T>>` optional). Everything is validated while building, so a
//! launched application never discovers a wiring mistake at runtime.
//!
//! ## Features
//!
//! - **[`ContainerBuilder`]**: Scoped registration surface and build driver
//! - **[`BeanRegistration`]**: Per-bean shaping: qualifiers, pool policy, exports
//! - **[`Assembly`]**: Installable registration bundles with source-local wiring
//! - **[`Application`]**: A built container, launchable many times over
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use grappelli_assembly::ContainerBuilder;
//!
//! struct ChildServ {
//!     greeting: String,
//! }
//!
//! struct Banner {
//!     line: String,
//! }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut builder = ContainerBuilder::new("app");
//! builder.constant("magic", 123i64)?;
//!
//! builder.scope("child", |scope| {
//!     scope
//!         .bean("ChildServ::new", |magic: Arc<i64>| ChildServ {
//!             greeting: format!("magic {magic}"),
//!         })?
//!         .export();
//!     Ok(())
//! })?;
//!
//! builder.bean("Banner::new", |serv: Arc<ChildServ>| Banner {
//!     line: serv.greeting.clone(),
//! })?;
//!
//! let application = builder.build()?;
//! let context = application.launch()?;
//! assert_eq!(context.get::<Banner>()?.line, "magic 123");
//! # Ok(())
//! # }
//! ```

pub mod application;
pub mod assembly;
pub mod container;
pub mod factory;

pub use application::Application;
pub use assembly::Assembly;
pub use container::{BeanRegistration, ContainerBuilder};
pub use factory::{BeanFunction, FallibleBeanFunction, FromResolved, SetterFunction};

// Re-export the engine types the surface hands out
pub use grappelli_core::descriptor::Declared;
pub use grappelli_core::error::{BuildError, BuildResult, LaunchError, LaunchResult};
pub use grappelli_core::key::{Qualifier, ServiceKey};
pub use grappelli_core::plan::RuntimeContext;
pub use grappelli_core::scope::ScopeDescriptor;
