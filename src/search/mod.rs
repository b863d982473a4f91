//! Search layer: the canonical filter schema and the catalog search engine.
//!
//! - **[`filter`]**: the `Filter` value type, builder, and tolerant
//!   validation shared by the structured and translated paths.
//! - **[`engine`]**: deterministic matching, ordering, and pagination over
//!   the catalog snapshot.

pub mod engine;
pub mod filter;
