//! # Dependency Providers
//!
//! What a resolved dependency slot points at. Cycle detection and plan
//! compilation pattern match on the variants; only service-backed variants
//! contribute graph edges.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::dependant::DependantId;
use crate::descriptor::EmptyRepr;
use crate::scope::ScopeId;

/// An erased, shareable service value.
pub type Value = Arc<dyn Any + Send + Sync>;

/// An erased value that is still exclusively owned, before member setters run.
pub type BoxedValue = Box<dyn Any + Send + Sync>;

/// A filled provider slot.
#[derive(Clone)]
pub enum DependencyProvider {
	/// A fixed value registered during assembly; contributes no edge, which is
	/// what lets constants break would-be cycles.
	Constant { label: Arc<str>, value: Value },

	/// Backed by a dependant reachable in the requester's own scope or own
	/// source.
	Service { dependant: DependantId },

	/// Backed by a dependant found through parent delegation; the scope it was
	/// found in is kept for diagnostics.
	Ancestor { dependant: DependantId, found_in: ScopeId },

	/// The instance under construction, for member setters. No edge; the
	/// receiver is the same node.
	Receiver,

	/// Sentinel for an optional dependency nothing provides. The slot still
	/// counts as resolved; invocation injects the declared empty
	/// representation.
	Absent(EmptyRepr),
}

impl DependencyProvider {
	/// The dependant this provider is backed by, where one exists. This is the
	/// edge relation the cycle detector and the materialization ordering walk.
	pub fn backing_dependant(&self) -> Option<DependantId> {
		match self {
			Self::Service { dependant } | Self::Ancestor { dependant, .. } => Some(*dependant),
			Self::Constant { .. } | Self::Receiver | Self::Absent(_) => None,
		}
	}

	pub fn is_absent(&self) -> bool {
		matches!(self, Self::Absent(_))
	}
}

impl fmt::Debug for DependencyProvider {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Constant { label, .. } => write!(f, "Constant({label})"),
			Self::Service { dependant } => write!(f, "Service({dependant})"),
			Self::Ancestor { dependant, found_in } => {
				write!(f, "Ancestor({dependant} in {found_in})")
			}
			Self::Receiver => f.write_str("Receiver"),
			Self::Absent(repr) => write!(f, "Absent({repr:?})"),
		}
	}
}
