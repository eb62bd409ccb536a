//! Container engine module.
//!
//! This module provides access to service keys, dependency declarations,
//! the scope tree, resolution, cycle detection and plan compilation.
//!
//! # Examples
//!
//! ```rust
//! use grappelli::core::key::{Qualifier, ServiceKey};
//!
//! let plain = ServiceKey::of::<i64>();
//! let named = ServiceKey::qualified::<i64>(Qualifier::new("timeout"));
//! assert_ne!(plain, named);
//! ```

pub use grappelli_core::*;
