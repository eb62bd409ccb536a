//! # Applications
//!
//! The output of a successful build: compiled invocation plans, ready to
//! launch independent application instances.

use grappelli_core::error::LaunchResult;
use grappelli_core::plan::{PlanSet, RuntimeContext};

/// A fully built container.
///
/// Building happens once; launching allocates a fresh region per call, so
/// one application can serve several isolated instances.
#[derive(Debug)]
pub struct Application {
	plans: PlanSet,
}

impl Application {
	pub(crate) fn new(plans: PlanSet) -> Self {
		Self { plans }
	}

	/// Launches one instance: allocates a region, materializes pooled
	/// services in dependency order and returns the typed access context.
	pub fn launch(&self) -> LaunchResult<RuntimeContext> {
		self.plans.launch()
	}

	/// The compiled plan set, for inspection.
	pub fn plan_set(&self) -> &PlanSet {
		&self.plans
	}
}
