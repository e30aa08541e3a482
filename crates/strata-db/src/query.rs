//! Query compilation and execution.
//!
//! [`planner::QueryPlanner`] assembles the full statement — projection,
//! join chain, WHERE (type filter ∧ search ∧ parsed filters), ORDER BY,
//! LIMIT/OFFSET — from fragments produced by the filter compiler
//! ([`compiler`]) and search compiler ([`search`]). [`QueryEngine`] is the
//! caller-facing facade that loads the schema, plans, executes and maps.
//!
//! Statement generation is a pure function of `(schema snapshot, request,
//! config, dialect)`: identical inputs always yield identical SQL text and
//! parameter lists.

pub mod compiler;
pub mod engine;
pub mod fragment;
pub mod mapper;
pub mod planner;
pub mod search;
pub mod snapshot;
pub mod view;

pub use engine::QueryEngine;
pub use fragment::SqlFragment;
pub use planner::QueryPlanner;
pub use snapshot::SnapshotPager;
pub use view::View;
