//! # Scope Registries
//!
//! Per-scope key → entry maps, built mutably during assembly and frozen when
//! the scope closes. Duplicate registrations are collected into the build
//! report; the first registration stays authoritative so later lookups are
//! stable. Closing a scope computes its export view, the subset of entries it
//! publishes into the parent.

use std::collections::HashMap;
use std::fmt;

use crate::dependant::DependantId;
use crate::error::{BuildReport, DuplicateService};
use crate::key::ServiceKey;
use crate::provider::Value;

/// What a registry entry is backed by.
#[derive(Clone)]
pub enum ServiceSource {
	/// A fixed value supplied at registration
	Constant(Value),
	/// A buildable unit
	Dependant(DependantId),
}

impl fmt::Debug for ServiceSource {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Constant(_) => f.write_str("Constant"),
			Self::Dependant(id) => write!(f, "Dependant({id})"),
		}
	}
}

/// One registered service.
#[derive(Debug, Clone)]
pub struct ServiceEntry {
	label: String,
	source: ServiceSource,
	exported_from: Option<String>,
}

impl ServiceEntry {
	pub fn constant(label: impl Into<String>, value: Value) -> Self {
		Self {
			label: label.into(),
			source: ServiceSource::Constant(value),
			exported_from: None,
		}
	}

	pub fn dependant(label: impl Into<String>, id: DependantId) -> Self {
		Self {
			label: label.into(),
			source: ServiceSource::Dependant(id),
			exported_from: None,
		}
	}

	pub fn label(&self) -> &str {
		&self.label
	}

	pub fn source(&self) -> &ServiceSource {
		&self.source
	}

	/// Name of the scope this entry was exported out of, if it arrived through
	/// an export view.
	pub fn exported_from(&self) -> Option<&str> {
		self.exported_from.as_deref()
	}

	fn exported(mut self, from: &str) -> Self {
		self.exported_from = Some(from.to_string());
		self
	}
}

/// One export wiring declared at composition time.
#[derive(Debug, Clone)]
pub struct ExportDecl {
	key: ServiceKey,
	publish_as: Option<ServiceKey>,
	required: bool,
}

impl ExportDecl {
	/// Export that must exist in the closing scope.
	pub fn required(key: ServiceKey) -> Self {
		Self {
			key,
			publish_as: None,
			required: true,
		}
	}

	/// Export that is silently skipped when the key is absent.
	pub fn optional(key: ServiceKey) -> Self {
		Self {
			key,
			publish_as: None,
			required: false,
		}
	}

	/// Publishes the entry under a different key (typically a re-qualified
	/// one).
	pub fn publish_as(mut self, key: ServiceKey) -> Self {
		self.publish_as = Some(key);
		self
	}

	pub fn key(&self) -> &ServiceKey {
		&self.key
	}

	pub fn is_required(&self) -> bool {
		self.required
	}
}

/// An entry selected by an export view, with the key it is published under.
#[derive(Debug, Clone)]
pub struct ExportedEntry {
	pub publish_key: ServiceKey,
	pub entry: ServiceEntry,
	pub required: bool,
}

/// The read-only subset of entries a closing scope publishes across its
/// boundary.
#[derive(Debug, Clone, Default)]
pub struct ExportView {
	entries: Vec<ExportedEntry>,
	missing_required: Vec<ServiceKey>,
}

impl ExportView {
	pub fn entries(&self) -> &[ExportedEntry] {
		&self.entries
	}

	/// Entries selected by required wirings.
	pub fn required_only(&self) -> impl Iterator<Item = &ExportedEntry> {
		self.entries.iter().filter(|entry| entry.required)
	}

	/// Entries selected by optional wirings.
	pub fn optional_only(&self) -> impl Iterator<Item = &ExportedEntry> {
		self.entries.iter().filter(|entry| !entry.required)
	}

	/// Keys of required wirings the scope could not satisfy.
	pub fn missing_required(&self) -> &[ServiceKey] {
		&self.missing_required
	}
}

/// Mutable per-scope registry, alive while the scope is open.
#[derive(Debug)]
pub struct RegistryBuilder {
	scope_name: String,
	entries: HashMap<ServiceKey, ServiceEntry>,
	order: Vec<ServiceKey>,
	exports: Vec<ExportDecl>,
}

impl RegistryBuilder {
	pub fn new(scope_name: impl Into<String>) -> Self {
		Self {
			scope_name: scope_name.into(),
			entries: HashMap::new(),
			order: Vec::new(),
			exports: Vec::new(),
		}
	}

	pub fn scope_name(&self) -> &str {
		&self.scope_name
	}

	/// Registers an entry. A key collision keeps the first registration and
	/// records the conflict instead of failing the call.
	pub fn put(&mut self, key: ServiceKey, entry: ServiceEntry, report: &mut BuildReport) {
		match self.entries.get(&key) {
			Some(existing) => report.record_duplicate(DuplicateService {
				scope: self.scope_name.clone(),
				key: key.to_string(),
				existing: existing.label().to_string(),
				incoming: entry.label().to_string(),
			}),
			None => {
				self.order.push(key.clone());
				self.entries.insert(key, entry);
			}
		}
	}

	pub fn get_local(&self, key: &ServiceKey) -> Option<&ServiceEntry> {
		self.entries.get(key)
	}

	pub fn declare_export(&mut self, decl: ExportDecl) {
		self.exports.push(decl);
	}

	/// Computes the export view from the wirings declared so far, in
	/// declaration order.
	pub fn export_view(&self) -> ExportView {
		let mut view = ExportView::default();
		for decl in &self.exports {
			match self.entries.get(&decl.key) {
				Some(entry) => view.entries.push(ExportedEntry {
					publish_key: decl.publish_as.clone().unwrap_or_else(|| decl.key.clone()),
					entry: entry.clone().exported(&self.scope_name),
					required: decl.required,
				}),
				None if decl.required => view.missing_required.push(decl.key.clone()),
				None => {}
			}
		}
		view
	}

	/// Freezes the registry; no further registration is possible afterwards.
	pub fn freeze(self) -> Registry {
		Registry {
			scope_name: self.scope_name,
			entries: self.entries,
			order: self.order,
		}
	}
}

/// Immutable per-scope registry, produced by [`RegistryBuilder::freeze`].
#[derive(Debug)]
pub struct Registry {
	scope_name: String,
	entries: HashMap<ServiceKey, ServiceEntry>,
	order: Vec<ServiceKey>,
}

impl Registry {
	pub fn scope_name(&self) -> &str {
		&self.scope_name
	}

	/// Looks up a key in this node only; delegation to the parent chain is the
	/// scope graph's job. Repeated lookups return the same entry.
	pub fn lookup_local(&self, key: &ServiceKey) -> Option<&ServiceEntry> {
		self.entries.get(key)
	}

	/// Registered keys in registration order.
	pub fn keys(&self) -> &[ServiceKey] {
		&self.order
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}
