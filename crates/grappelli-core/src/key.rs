//! # Service Keys
//!
//! Identity of injectable services: the raw type plus at most one qualifier.
//!
//! Keys are plain values. Unqualified keys are interned through a [`KeyCache`]
//! owned by the graph builder; there is no process-global interning table, so
//! two builders never share key state.

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Type identity paired with its rendered name for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeInfo {
	id: TypeId,
	name: &'static str,
}

impl TypeInfo {
	/// Captures the identity of `T`.
	///
	/// # Examples
	///
	/// ```
	/// use grappelli_core::key::TypeInfo;
	///
	/// let info = TypeInfo::of::<String>();
	/// assert!(info.name().ends_with("String"));
	/// ```
	pub fn of<T: 'static>() -> Self {
		Self {
			id: TypeId::of::<T>(),
			name: std::any::type_name::<T>(),
		}
	}

	pub fn id(&self) -> TypeId {
		self.id
	}

	/// Fully qualified type name
	pub fn name(&self) -> &'static str {
		self.name
	}

	/// Last path segment of the type name, for compact rendering
	pub fn short_name(&self) -> &'static str {
		self.name
			.rsplit("::")
			.next()
			.unwrap_or(self.name)
	}
}

impl fmt::Display for TypeInfo {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name)
	}
}

/// A value-equal marker distinguishing several services of the same type.
///
/// # Examples
///
/// ```
/// use grappelli_core::key::Qualifier;
///
/// let primary = Qualifier::new("primary");
/// assert_eq!(primary, Qualifier::new("primary"));
/// assert_ne!(primary, Qualifier::new("replica"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Qualifier(Arc<str>);

impl Qualifier {
	pub fn new(name: impl Into<Arc<str>>) -> Self {
		Self(name.into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for Qualifier {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for Qualifier {
	fn from(name: &str) -> Self {
		Self::new(name)
	}
}

/// Lookup identity of a service: type plus at most one qualifier.
///
/// # Examples
///
/// ```
/// use grappelli_core::key::{Qualifier, ServiceKey};
///
/// let plain = ServiceKey::of::<i64>();
/// let named = ServiceKey::qualified::<i64>(Qualifier::new("boot"));
/// assert_ne!(plain, named);
/// assert_eq!(plain.type_id(), named.type_id());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceKey {
	type_info: TypeInfo,
	qualifier: Option<Qualifier>,
}

impl ServiceKey {
	/// Unqualified key for `T`.
	pub fn of<T: 'static>() -> Self {
		Self::from_type(TypeInfo::of::<T>())
	}

	/// Qualified key for `T`.
	pub fn qualified<T: 'static>(qualifier: Qualifier) -> Self {
		Self {
			type_info: TypeInfo::of::<T>(),
			qualifier: Some(qualifier),
		}
	}

	/// Unqualified key from captured type identity.
	pub fn from_type(type_info: TypeInfo) -> Self {
		Self {
			type_info,
			qualifier: None,
		}
	}

	/// Attaches a qualifier, replacing any existing one.
	pub fn with_qualifier(mut self, qualifier: impl Into<Qualifier>) -> Self {
		self.qualifier = Some(qualifier.into());
		self
	}

	pub fn type_id(&self) -> TypeId {
		self.type_info.id()
	}

	pub fn type_info(&self) -> TypeInfo {
		self.type_info
	}

	pub fn qualifier(&self) -> Option<&Qualifier> {
		self.qualifier.as_ref()
	}
}

impl fmt::Display for ServiceKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match &self.qualifier {
			Some(qualifier) => write!(f, "{} @{}", self.type_info.short_name(), qualifier),
			None => f.write_str(self.type_info.short_name()),
		}
	}
}

/// Explicit intern cache for unqualified keys.
///
/// Owned by the graph builder and passed into key construction; dropping the
/// builder drops the cache.
///
/// # Examples
///
/// ```
/// use grappelli_core::key::{KeyCache, TypeInfo};
///
/// let mut cache = KeyCache::new();
/// let first = cache.intern(TypeInfo::of::<String>());
/// let second = cache.intern(TypeInfo::of::<String>());
/// assert_eq!(first, second);
/// assert_eq!(cache.len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct KeyCache {
	unqualified: HashMap<TypeId, ServiceKey>,
}

impl KeyCache {
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the interned unqualified key for the type, creating it on first
	/// use. Qualified keys are never interned; build them directly.
	pub fn intern(&mut self, type_info: TypeInfo) -> ServiceKey {
		self.unqualified
			.entry(type_info.id())
			.or_insert_with(|| ServiceKey::from_type(type_info))
			.clone()
	}

	/// Number of interned keys
	pub fn len(&self) -> usize {
		self.unqualified.len()
	}

	pub fn is_empty(&self) -> bool {
		self.unqualified.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_keys_are_value_equal() {
		assert_eq!(ServiceKey::of::<String>(), ServiceKey::of::<String>());
		assert_ne!(ServiceKey::of::<String>(), ServiceKey::of::<i64>());
	}

	#[test]
	fn test_qualifier_distinguishes_keys_of_same_type() {
		let plain = ServiceKey::of::<String>();
		let primary = ServiceKey::qualified::<String>(Qualifier::new("primary"));
		let replica = ServiceKey::qualified::<String>(Qualifier::new("replica"));

		assert_ne!(plain, primary);
		assert_ne!(primary, replica);
		assert_eq!(primary, ServiceKey::qualified::<String>(Qualifier::new("primary")));
	}

	#[test]
	fn test_intern_returns_the_same_key() {
		let mut cache = KeyCache::new();
		let a = cache.intern(TypeInfo::of::<Vec<u8>>());
		let b = cache.intern(TypeInfo::of::<Vec<u8>>());
		let c = cache.intern(TypeInfo::of::<Vec<u16>>());

		assert_eq!(a, b);
		assert_ne!(a, c);
		assert_eq!(cache.len(), 2);
	}

	#[test]
	fn test_display_uses_short_name_and_qualifier() {
		let key = ServiceKey::qualified::<String>(Qualifier::new("primary"));
		assert_eq!(key.to_string(), "String @primary");
		assert_eq!(ServiceKey::of::<String>().to_string(), "String");
	}

	#[test]
	fn test_generic_types_have_distinct_identity() {
		assert_ne!(
			ServiceKey::of::<Vec<String>>(),
			ServiceKey::of::<Vec<i64>>()
		);
	}
}
