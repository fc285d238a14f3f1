//! Joining the person collections into resolved rows.
//!
//! The directory exposes three collections - generic accounts, staff
//! profiles, patient profiles - linked by owning-account id and, for legacy
//! patient rows, by email or full name. This module joins them into one
//! resolved row per account, probing each linked record with the coordinate
//! resolver and falling back to the geocode cache for address-only records.

mod filter;
mod joiner;
mod records;

pub use filter::matches_org;
pub use joiner::{resolve_rows, ResolvedRow};
pub use records::PersonRecord;
