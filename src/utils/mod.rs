//! Utility Module
//!
//! This module provides small pure helpers used across the exporter:
//!
//! - [`natural_sort`]: digit-aware, case-insensitive name ordering
//! - [`format`]: `%.6g` float formatting for i3d attributes
//!
//! ```rust,ignore
//! use i3d_export::utils::natural_sort::natural_cmp;
//!
//! assert!(natural_cmp("Bolt2", "Bolt10").is_lt());
//! ```

pub mod format;
pub mod natural_sort;

pub use format::{g6, g6_vec3};
pub use natural_sort::{NaturalKey, natural_cmp, sort_by_natural_name};
