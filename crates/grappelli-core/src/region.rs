//! # Runtime Region
//!
//! The integer-slot value pool a launched application reads from. One region
//! is allocated per launch; each slot is written exactly once, in
//! materialization order, and may be read from any thread afterwards.

use std::fmt;
use std::sync::OnceLock;

use crate::error::{LaunchError, LaunchResult};
use crate::provider::Value;

/// Address of a materialized service inside a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionSlot(usize);

impl RegionSlot {
	pub fn new(index: usize) -> Self {
		Self(index)
	}

	pub fn index(&self) -> usize {
		self.0
	}
}

impl fmt::Display for RegionSlot {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "slot {}", self.0)
	}
}

/// Write-once pool of erased service values.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use grappelli_core::region::{Region, RegionSlot};
///
/// let region = Region::with_len(1);
/// region.set(RegionSlot::new(0), Arc::new(42i64)).unwrap();
/// let value = region.get(RegionSlot::new(0)).unwrap();
/// assert_eq!(*value.downcast::<i64>().unwrap(), 42);
/// ```
pub struct Region {
	slots: Vec<OnceLock<Value>>,
}

impl Region {
	pub fn with_len(len: usize) -> Self {
		let mut slots = Vec::with_capacity(len);
		slots.resize_with(len, OnceLock::new);
		Self { slots }
	}

	pub fn len(&self) -> usize {
		self.slots.len()
	}

	pub fn is_empty(&self) -> bool {
		self.slots.is_empty()
	}

	/// Populates a slot. Writing a slot twice or out of bounds is an engine
	/// contract violation, not a user error.
	pub fn set(&self, slot: RegionSlot, value: Value) -> LaunchResult<()> {
		let cell = self.slots.get(slot.index()).ok_or_else(|| {
			LaunchError::Internal(format!("{slot} written out of bounds (len {})", self.len()))
		})?;
		cell.set(value)
			.map_err(|_| LaunchError::Internal(format!("{slot} written twice")))
	}

	/// Reads a populated slot. Reading an unpopulated slot means the
	/// materialization order was violated.
	pub fn get(&self, slot: RegionSlot) -> LaunchResult<Value> {
		self.slots
			.get(slot.index())
			.and_then(|cell| cell.get())
			.cloned()
			.ok_or_else(|| LaunchError::Internal(format!("{slot} read before it was populated")))
	}

	pub fn try_get(&self, slot: RegionSlot) -> Option<&Value> {
		self.slots.get(slot.index()).and_then(|cell| cell.get())
	}
}

impl fmt::Debug for Region {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let populated = self.slots.iter().filter(|cell| cell.get().is_some()).count();
		f.debug_struct("Region")
			.field("len", &self.slots.len())
			.field("populated", &populated)
			.finish()
	}
}
