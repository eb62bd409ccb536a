//! # Assemblies
//!
//! Installable bundles of registrations. Installing an assembly opens a fresh
//! installation source: units registered during one `configure` call provide
//! for each other ahead of any scope lookup, so an assembly wires against its
//! own members even when the surrounding scope registers the same keys.

use grappelli_core::error::BuildResult;

use crate::container::ContainerBuilder;

/// A reusable bundle of container registrations.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use grappelli_assembly::{Assembly, BuildResult, ContainerBuilder};
///
/// struct Clock {
///     tick_ms: i64,
/// }
///
/// struct TimeAssembly;
///
/// impl Assembly for TimeAssembly {
///     fn configure(&self, container: &mut ContainerBuilder) -> BuildResult<()> {
///         container.constant("tick", 250i64)?;
///         container.bean("Clock::new", |tick: Arc<i64>| Clock { tick_ms: *tick })?;
///         Ok(())
///     }
/// }
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut builder = ContainerBuilder::new("app");
/// builder.install(TimeAssembly)?;
/// let context = builder.build()?.launch()?;
/// assert_eq!(context.get::<Clock>()?.tick_ms, 250);
/// # Ok(())
/// # }
/// ```
pub trait Assembly {
	/// Short name used in installation logs.
	fn name(&self) -> &'static str
	where
		Self: Sized,
	{
		let full = std::any::type_name::<Self>();
		full.rsplit("::").next().unwrap_or(full)
	}

	/// Registers this assembly's members against the builder.
	fn configure(&self, container: &mut ContainerBuilder) -> BuildResult<()>;
}
