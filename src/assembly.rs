//! Composition surface module.
//!
//! This module provides the container builder, reusable assemblies and
//! the typed factory traits that derive dependency sites from function
//! signatures.
//!
//! # Examples
//!
//! ```rust
//! use grappelli::assembly::{Assembly, ContainerBuilder};
//! use grappelli::BuildResult;
//!
//! struct Defaults;
//!
//! impl Assembly for Defaults {
//!     fn configure(&self, builder: &mut ContainerBuilder) -> BuildResult<()> {
//!         builder.constant("retries", 3i64)
//!     }
//! }
//!
//! # fn main() -> BuildResult<()> {
//! let mut builder = ContainerBuilder::new("app");
//! builder.install(Defaults)?;
//! # Ok(())
//! # }
//! ```

#[cfg(feature = "assembly")]
pub use grappelli_assembly::*;
