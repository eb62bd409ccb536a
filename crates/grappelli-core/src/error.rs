//! # Build and Launch Errors
//!
//! Error taxonomy for the container build pipeline and the launch phase.
//!
//! Declaration problems (`DeclarationError`) abort the registration call that
//! caused them. Everything the resolver can recover from is accumulated into a
//! [`BuildReport`] so one build surfaces every duplicate registration and every
//! missing dependency at once. Cycles abort the build as soon as one is found.
//! Contract violations inside the engine are kept apart from user errors via
//! the `Internal` variants.

use std::fmt;

use thiserror::Error as ThisError;

/// Errors raised immediately while a dependency declaration is being extracted.
///
/// These indicate a malformed declaration, not a wiring problem, so they fail
/// fast instead of being collected.
#[derive(Debug, Clone, ThisError)]
pub enum DeclarationError {
	#[error("dependency '{site}' carries more than one qualifier: {}", .qualifiers.join(", "))]
	MultipleQualifiers { site: String, qualifiers: Vec<String> },

	#[error("dependency '{site}' nests one optional wrapper inside another")]
	NestedOptional { site: String },

	#[error("dependency '{site}' is both optional-wrapped and fallback-annotated; declare one or the other")]
	AmbiguousAbsence { site: String },

	#[error("'{site}' declares {actual} dependency site(s) for a factory taking {expected} argument(s)")]
	ArityMismatch {
		site: String,
		expected: usize,
		actual: usize,
	},

	#[error("provider method '{site}' has no declaring bean for '{key}' in its scope")]
	UnknownReceiver { site: String, key: String },

	#[error("'{site}' declares an export in the root scope; exports publish from a child scope to its parent")]
	RootExport { site: String },
}

/// A key registered twice within the same scope. The first registration stays
/// authoritative for lookups; the conflict is reported here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateService {
	/// Scope the collision happened in
	pub scope: String,
	/// Rendered service key
	pub key: String,
	/// Label of the registration that was kept
	pub existing: String,
	/// Label of the registration that was rejected
	pub incoming: String,
}

impl fmt::Display for DuplicateService {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"duplicate registration of '{}' in scope '{}' (kept '{}', rejected '{}')",
			self.key, self.scope, self.existing, self.incoming
		)
	}
}

/// A required key no provider could be found for, with every requester that
/// asked for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingDependency {
	/// Rendered service key
	pub key: String,
	/// Requesting sites, in resolution order
	pub requesters: Vec<String>,
}

impl fmt::Display for MissingDependency {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"no provider for '{}' (required by {})",
			self.key,
			self.requesters.join(", ")
		)
	}
}

/// Accumulates every recoverable build failure.
///
/// The collector is threaded through registration and resolution; entries keep
/// their insertion order so reports are deterministic.
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
	duplicates: Vec<DuplicateService>,
	missing: Vec<MissingDependency>,
}

impl BuildReport {
	pub fn new() -> Self {
		Self::default()
	}

	/// Records a duplicate-key conflict.
	pub fn record_duplicate(&mut self, entry: DuplicateService) {
		tracing::warn!(key = %entry.key, scope = %entry.scope, "duplicate service registration");
		self.duplicates.push(entry);
	}

	/// Records a missing required dependency, aggregating requesters per key.
	pub fn record_missing(&mut self, key: String, requester: String) {
		tracing::warn!(key = %key, requester = %requester, "missing dependency");
		if let Some(entry) = self.missing.iter_mut().find(|entry| entry.key == key) {
			entry.requesters.push(requester);
		} else {
			self.missing.push(MissingDependency {
				key,
				requesters: vec![requester],
			});
		}
	}

	pub fn duplicates(&self) -> &[DuplicateService] {
		&self.duplicates
	}

	pub fn missing(&self) -> &[MissingDependency] {
		&self.missing
	}

	pub fn is_empty(&self) -> bool {
		self.duplicates.is_empty() && self.missing.is_empty()
	}

	/// Converts the report into a build failure, or `Ok` when nothing was
	/// collected.
	pub fn into_result(self) -> Result<(), BuildError> {
		if self.is_empty() {
			Ok(())
		} else {
			Err(BuildError::Report(self))
		}
	}
}

impl fmt::Display for BuildReport {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"container build failed: {} duplicate registration(s), {} missing dependenc(ies)",
			self.duplicates.len(),
			self.missing.len()
		)?;
		for duplicate in &self.duplicates {
			write!(f, "\n  {duplicate}")?;
		}
		for missing in &self.missing {
			write!(f, "\n  {missing}")?;
		}
		Ok(())
	}
}

/// Errors surfaced by `resolve_and_build`.
#[derive(Debug, ThisError)]
pub enum BuildError {
	/// A malformed declaration reached the build surface
	#[error(transparent)]
	Declaration(#[from] DeclarationError),

	/// Aggregated duplicates and missing dependencies
	#[error("{0}")]
	Report(BuildReport),

	/// A dependency cycle, truncated to the cyclic part of the chain
	#[error("dependency cycle detected\n  Chain: {}\n  Hint: provide one of the links as a constant to break the loop", .chain.join(" -> "))]
	Cycle { chain: Vec<String> },

	/// Engine contract violation; never caused by user input
	#[error("internal invariant violated: {0}")]
	Internal(String),
}

/// Result type for the build pipeline
pub type BuildResult<T> = Result<T, BuildError>;

/// Errors surfaced while launching a compiled plan or invoking it afterwards.
#[derive(Debug, ThisError)]
pub enum LaunchError {
	/// A user factory returned an error
	#[error("factory for '{label}' failed: {source}")]
	Factory {
		label: String,
		#[source]
		source: anyhow::Error,
	},

	/// A key the caller asked for is not visible from the root scope
	#[error("no service registered for '{key}'")]
	UnknownService { key: String },

	/// A service value did not downcast to the requested type
	#[error("service '{key}' is not of the requested type")]
	TypeMismatch { key: String },

	/// Engine contract violation; never caused by user input
	#[error("internal invariant violated: {0}")]
	Internal(String),
}

/// Result type for the launch phase
pub type LaunchResult<T> = Result<T, LaunchError>;
