//! Validated positions and coordinate extraction.
//!
//! Person records arrive from several backends with coordinates stored under
//! different field names and nestings. This module defines the validated
//! [`ResolvedPosition`] type with its provenance tag, and the resolver that
//! probes a record's fields in a fixed priority order.

mod resolver;
mod types;

pub use resolver::{parse_coordinate, resolve_fields};
pub use types::{PositionSource, ResolvedPosition};
