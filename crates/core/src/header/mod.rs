//! Header normalization and column mapping.
//!
//! Legacy callers address columns by a normalized form of the header text
//! (`"Full Name"` becomes `fullname`). This module owns that translation:
//! 1. **Normalization** -- [`normalize`] reduces a header to a lookup key.
//! 2. **Mapping** -- [`HeaderMap`] records normalized key -> canonical header.
//! 3. **Caching** -- [`HeaderMapper`] rebuilds the map only when the live
//!    header row changes.

pub mod mapper;
pub mod normalize;

pub use mapper::{rebuild_if_stale, HeaderMap, HeaderMapper, Refresh, RESERVED_FIELDS};
pub use normalize::{is_mappable, normalize};
