//! Purpose: Shared core library crate used by the `h5scope` CLI and tests.
//! Exports: `api` (inspector client, export/search/schema types, errors)
//! and `core` (schema inference, bounded reads, planning, formatting).
//! Role: Internal library backing the binary; not yet a stable public SDK.
//! Invariants: Treat the crate API as internal until a dedicated library release.
//! Invariants: Source files are only ever opened read-only, scoped per operation.
pub mod api;
pub mod core;
