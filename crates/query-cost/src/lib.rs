//! Static, rule-based cost classification for GraphQL field arguments.
//!
//! Each argument of a field is classified as free or disqualifying. A field whose
//! arguments are all free passes its children's cost through untouched, a field with
//! any disqualifying argument is priced so high that the operation can never fit under
//! the configured limit.
//!
//! The policy is built once ([`CostPolicyBuilder`]), optionally amended while the schema
//! is being finalized, and then frozen into a [`CostPolicy`] that can be shared between
//! any number of concurrent evaluations.

#![cfg_attr(test, allow(unused_crate_dependencies))]

mod coercion;
mod policy;
mod rules;

pub use policy::{CostPolicy, CostPolicyBuilder};
pub use rules::{ArgumentCostRules, ArgumentRule, FilterClauseRule};

/// Cost of a field or an argument. Zero means free.
pub type Cost = usize;

/// Cost of an unknown argument or of a filter clause combining too many predicates.
pub const DISQUALIFYING_COST: Cost = 100;

/// A field with a disqualifying argument costs this many times the maximum cost.
pub const PROHIBITIVE_COST_MULTIPLIER: Cost = 100;

/// Largest `first`/`last` page size that is still free.
pub const MAX_FREE_PAGE_SIZE: i64 = 50;

pub const DEFAULT_MAX_COST: Cost = 1000;

/// Deep enough for all regular content queries and the introspection query.
pub const DEFAULT_MAX_DEPTH: usize = 11;

/// Filter predicates that are free when used on their own.
pub const DEFAULT_RESTRICTED_WHERE_ARGS: &[&str] = &["location", "name", "orderby", "search", "slug", "tagSlugIn"];

/// Type specific aliases of the `id` argument.
pub const DEFAULT_ID_ALIASES: &[&str] = &["mediaItemId", "pageId", "postId"];
