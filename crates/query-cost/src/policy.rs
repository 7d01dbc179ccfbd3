use std::{collections::BTreeSet, sync::Arc};

use serde_json::Value;

use crate::{
    ArgumentCostRules, Cost, FilterClauseRule, DEFAULT_ID_ALIASES, DEFAULT_MAX_COST, DEFAULT_MAX_DEPTH,
    DEFAULT_RESTRICTED_WHERE_ARGS, PROHIBITIVE_COST_MULTIPLIER,
};

/// Cost policy in its configuration phase.
///
/// Thresholds and argument lists can be changed freely until [`CostPolicyBuilder::finish`]
/// freezes them.
#[derive(Debug, Clone)]
pub struct CostPolicyBuilder {
    max_cost: Cost,
    max_depth: usize,
    id_aliases: BTreeSet<String>,
    restricted_where_args: BTreeSet<String>,
    whitelisted_where_args: BTreeSet<String>,
}

impl Default for CostPolicyBuilder {
    fn default() -> Self {
        CostPolicyBuilder {
            max_cost: DEFAULT_MAX_COST,
            max_depth: DEFAULT_MAX_DEPTH,
            id_aliases: DEFAULT_ID_ALIASES.iter().map(|alias| alias.to_string()).collect(),
            restricted_where_args: DEFAULT_RESTRICTED_WHERE_ARGS.iter().map(|arg| arg.to_string()).collect(),
            whitelisted_where_args: BTreeSet::new(),
        }
    }
}

impl CostPolicyBuilder {
    /// Set the total cost an operation may reach. Defaults to 1000.
    #[must_use]
    pub fn with_max_cost(mut self, max_cost: Cost) -> Self {
        self.max_cost = max_cost;
        self
    }

    /// Set the deepest field nesting an operation may reach. Defaults to 11.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Add type specific aliases of the `id` argument, such as `bookId`.
    #[must_use]
    pub fn with_id_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.id_aliases.extend(aliases.into_iter().map(Into::into));
        self
    }

    /// Replace the filter predicates that are free when used alone.
    #[must_use]
    pub fn with_restricted_where_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.restricted_where_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the filter predicates that are always free.
    #[must_use]
    pub fn with_whitelisted_where_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.whitelisted_where_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn max_cost(&self) -> Cost {
        self.max_cost
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn restricted_where_args(&self) -> &BTreeSet<String> {
        &self.restricted_where_args
    }

    pub fn whitelisted_where_args(&self) -> &BTreeSet<String> {
        &self.whitelisted_where_args
    }

    /// Override either filter argument list. `None` keeps the current list. Meant to run
    /// once while the schema is finalized; calling it again overwrites the previous
    /// amendment.
    pub fn amend_filter_arg_lists<R, W>(&mut self, restricted: Option<R>, whitelisted: Option<W>) -> &mut Self
    where
        R: IntoIterator,
        R::Item: Into<String>,
        W: IntoIterator,
        W::Item: Into<String>,
    {
        if let Some(restricted) = restricted {
            self.restricted_where_args = restricted.into_iter().map(Into::into).collect();
        }

        if let Some(whitelisted) = whitelisted {
            self.whitelisted_where_args = whitelisted.into_iter().map(Into::into).collect();
        }

        self
    }

    /// Freeze the configuration.
    pub fn finish(self) -> CostPolicy {
        let overlap = self
            .restricted_where_args
            .intersection(&self.whitelisted_where_args)
            .collect::<Vec<_>>();

        if !overlap.is_empty() {
            tracing::warn!(
                "Filter arguments {overlap:?} are both restricted and whitelisted, they will be treated as whitelisted"
            );
        }

        if self.max_cost == 0 {
            tracing::warn!("Maximum query cost is zero, every query selecting a field will be rejected");
        }

        let filter_clause = FilterClauseRule::new(self.restricted_where_args, self.whitelisted_where_args);
        let rules = ArgumentCostRules::new(self.id_aliases.iter().map(String::as_str), filter_clause);

        CostPolicy(Arc::new(CostPolicyInner {
            max_cost: self.max_cost,
            max_depth: self.max_depth,
            rules,
        }))
    }
}

#[derive(Debug)]
struct CostPolicyInner {
    max_cost: Cost,
    max_depth: usize,
    rules: ArgumentCostRules,
}

/// A frozen cost policy. Read only, cloning is cheap.
#[derive(Debug, Clone)]
pub struct CostPolicy(Arc<CostPolicyInner>);

impl Default for CostPolicy {
    fn default() -> Self {
        CostPolicy::builder().finish()
    }
}

impl CostPolicy {
    pub fn builder() -> CostPolicyBuilder {
        CostPolicyBuilder::default()
    }

    pub fn max_cost(&self) -> Cost {
        self.0.max_cost
    }

    /// Handed to the host's depth validation, not enforced here.
    pub fn max_depth(&self) -> usize {
        self.0.max_depth
    }

    pub fn rules(&self) -> &ArgumentCostRules {
        &self.0.rules
    }

    /// Cost charged for a field with at least one disqualifying argument.
    pub fn prohibitive_cost(&self) -> Cost {
        self.0.max_cost.saturating_mul(PROHIBITIVE_COST_MULTIPLIER)
    }

    /// Cost of a field given the cost of its children and its arguments.
    ///
    /// All free arguments: the field adds nothing and `children_cost` is returned as is.
    /// Any argument with a cost: the field is priced at [`CostPolicy::prohibitive_cost`],
    /// regardless of its children and siblings.
    pub fn field_cost<'a, K>(&self, children_cost: Cost, arguments: impl IntoIterator<Item = (K, &'a Value)>) -> Cost
    where
        K: AsRef<str>,
    {
        for (name, value) in arguments {
            let name = name.as_ref();
            let cost = self.0.rules.cost_of_argument(name, value);

            if cost > 0 {
                tracing::debug!(argument = name, cost, "field rejected by a costly argument");
                return self.prohibitive_cost();
            }
        }

        children_cost
    }
}
