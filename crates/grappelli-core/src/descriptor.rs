//! # Dependency Descriptors
//!
//! One descriptor per declared dependency site: the service key, whether the
//! site tolerates absence, and how absence is represented if it does.
//!
//! Extraction validates the declared shape and fails fast on malformed
//! declarations; everything downstream (resolution, cycle checks, plan
//! compilation) only ever sees well-formed descriptors.

use std::fmt;

use crate::error::DeclarationError;
use crate::key::{KeyCache, Qualifier, ServiceKey, TypeInfo};

/// How an optional dependency materializes when nothing provides it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyRepr {
	/// The site is required; absence is an error
	None,
	/// The site receives an empty `Option`
	EmptyOption,
	/// The site receives its declared fallback value
	Fallback,
}

/// Where a dependency was declared, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyOrigin {
	member: String,
	index: usize,
}

impl DependencyOrigin {
	pub fn new(member: impl Into<String>, index: usize) -> Self {
		Self {
			member: member.into(),
			index,
		}
	}

	pub fn member(&self) -> &str {
		&self.member
	}

	pub fn index(&self) -> usize {
		self.index
	}
}

impl fmt::Display for DependencyOrigin {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} (arg {})", self.member, self.index)
	}
}

/// A validated dependency site.
///
/// Descriptors are plain values; several dependants may hold structurally
/// equal ones.
#[derive(Debug, Clone)]
pub struct DependencyDescriptor {
	key: ServiceKey,
	optional: bool,
	empty: EmptyRepr,
	origin: DependencyOrigin,
}

impl DependencyDescriptor {
	pub fn key(&self) -> &ServiceKey {
		&self.key
	}

	pub fn is_optional(&self) -> bool {
		self.optional
	}

	pub fn empty_repr(&self) -> EmptyRepr {
		self.empty
	}

	pub fn origin(&self) -> &DependencyOrigin {
		&self.origin
	}
}

/// The raw shape of a dependency declaration, before validation.
///
/// Invalid combinations are representable here on purpose; [`extract`] is the
/// single place that rejects them.
///
/// # Examples
///
/// ```
/// use grappelli_core::descriptor::Declared;
///
/// let site = Declared::value::<String>().qualified("primary").shared();
/// assert!(site.is_shared());
/// ```
#[derive(Debug, Clone)]
pub struct Declared {
	type_info: TypeInfo,
	qualifiers: Vec<Qualifier>,
	optional_depth: u8,
	shared: bool,
	fallback: bool,
}

impl Declared {
	/// A plain value dependency on `T`.
	pub fn value<T: 'static>() -> Self {
		Self {
			type_info: TypeInfo::of::<T>(),
			qualifiers: Vec::new(),
			optional_depth: 0,
			shared: false,
			fallback: false,
		}
	}

	/// Adds a qualifier annotation. Adding more than one is representable and
	/// rejected at extraction.
	pub fn qualified(mut self, qualifier: impl Into<Qualifier>) -> Self {
		self.qualifiers.push(qualifier.into());
		self
	}

	/// Wraps the site in one more optional layer.
	pub fn optional(mut self) -> Self {
		self.optional_depth = self.optional_depth.saturating_add(1);
		self
	}

	/// Marks the site as declared through a shared handle (`Arc<T>`). The
	/// wrapping is normalized away so lookups stay keyed on `T`.
	pub fn shared(mut self) -> Self {
		self.shared = true;
		self
	}

	/// Marks the site with the explicit fallback annotation.
	pub fn with_fallback(mut self) -> Self {
		self.fallback = true;
		self
	}

	pub fn is_shared(&self) -> bool {
		self.shared
	}

	pub fn type_info(&self) -> TypeInfo {
		self.type_info
	}
}

/// Validates a declared shape into a descriptor.
///
/// Unqualified keys are interned through the supplied cache; qualified keys
/// are built directly.
///
/// # Examples
///
/// ```
/// use grappelli_core::descriptor::{extract, Declared, DependencyOrigin, EmptyRepr};
/// use grappelli_core::key::KeyCache;
///
/// let mut cache = KeyCache::new();
/// let descriptor = extract(
///     &Declared::value::<i64>().optional(),
///     DependencyOrigin::new("Billing::new", 0),
///     &mut cache,
/// )
/// .unwrap();
///
/// assert!(descriptor.is_optional());
/// assert_eq!(descriptor.empty_repr(), EmptyRepr::EmptyOption);
/// ```
pub fn extract(
	declared: &Declared,
	origin: DependencyOrigin,
	cache: &mut KeyCache,
) -> Result<DependencyDescriptor, DeclarationError> {
	if declared.qualifiers.len() > 1 {
		return Err(DeclarationError::MultipleQualifiers {
			site: origin.to_string(),
			qualifiers: declared
				.qualifiers
				.iter()
				.map(|qualifier| qualifier.to_string())
				.collect(),
		});
	}
	if declared.optional_depth > 1 {
		return Err(DeclarationError::NestedOptional {
			site: origin.to_string(),
		});
	}
	if declared.optional_depth == 1 && declared.fallback {
		return Err(DeclarationError::AmbiguousAbsence {
			site: origin.to_string(),
		});
	}

	let key = match declared.qualifiers.first() {
		Some(qualifier) => ServiceKey::from_type(declared.type_info).with_qualifier(qualifier.clone()),
		None => cache.intern(declared.type_info),
	};
	let empty = if declared.optional_depth == 1 {
		EmptyRepr::EmptyOption
	} else if declared.fallback {
		EmptyRepr::Fallback
	} else {
		EmptyRepr::None
	};

	Ok(DependencyDescriptor {
		key,
		optional: empty != EmptyRepr::None,
		empty,
		origin,
	})
}
