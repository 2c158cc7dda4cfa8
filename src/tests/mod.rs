//! Crate-level test suites.
//!
//! Unit tests live next to the code they cover; these modules hold the
//! cross-module suites: full pipeline runs, scanning against compiled
//! tables, table encoding, diagnostics, and property-based checks.
