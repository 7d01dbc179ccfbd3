use std::collections::{BTreeSet, HashMap};

use serde_json::Value;

use crate::{coercion::coerce_to_int, Cost, DISQUALIFYING_COST, MAX_FREE_PAGE_SIZE};

/// How the cost of a known argument is determined.
#[derive(Clone, Copy)]
pub enum ArgumentRule {
    /// Always the same cost, whatever the value.
    Fixed(Cost),
    /// Derived from the argument value.
    Computed(fn(&Value) -> Cost),
    /// The value is a filter clause, priced by the [`FilterClauseRule`] from the names of its predicates.
    FilterClause,
}

impl std::fmt::Debug for ArgumentRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArgumentRule::Fixed(cost) => f.debug_tuple("Fixed").field(cost).finish(),
            ArgumentRule::Computed(_) => f.write_str("Computed"),
            ArgumentRule::FilterClause => f.write_str("FilterClause"),
        }
    }
}

/// `first` and `last`: free up to [`MAX_FREE_PAGE_SIZE`] records, then one point per
/// started block of 51. Negative limits are free.
pub(crate) fn page_size_cost(value: &Value) -> Cost {
    let limit = coerce_to_int(value).max(0);

    usize::try_from(limit / (MAX_FREE_PAGE_SIZE + 1)).unwrap_or(Cost::MAX)
}

/// Prices the combination of predicates used in a `where` argument.
///
/// Whitelisted predicates are always free and ignored. Of the remaining ones, a single
/// restricted predicate is free. Anything else is disqualifying.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterClauseRule {
    restricted: BTreeSet<String>,
    whitelisted: BTreeSet<String>,
}

impl FilterClauseRule {
    pub fn new(restricted: BTreeSet<String>, whitelisted: BTreeSet<String>) -> Self {
        FilterClauseRule { restricted, whitelisted }
    }

    pub fn restricted(&self) -> &BTreeSet<String> {
        &self.restricted
    }

    pub fn whitelisted(&self) -> &BTreeSet<String> {
        &self.whitelisted
    }

    pub fn cost<'a>(&self, predicates: impl IntoIterator<Item = &'a str>) -> Cost {
        let mut remaining = predicates
            .into_iter()
            .filter(|name| !self.whitelisted.contains(*name));

        match (remaining.next(), remaining.next()) {
            (None, _) => 0,
            (Some(name), None) if self.restricted.contains(name) => 0,
            _ => DISQUALIFYING_COST,
        }
    }

    fn cost_of_value(&self, value: &Value) -> Cost {
        match value {
            Value::Object(predicates) => self.cost(predicates.keys().map(String::as_str)),
            Value::Null => 0,
            _ => DISQUALIFYING_COST,
        }
    }
}

/// Name keyed table of argument rules. Names missing from the table are unvetted and
/// cost [`DISQUALIFYING_COST`].
#[derive(Debug, Clone)]
pub struct ArgumentCostRules {
    table: HashMap<String, ArgumentRule>,
    filter_clause: FilterClauseRule,
}

impl ArgumentCostRules {
    pub(crate) fn new<'a>(id_aliases: impl IntoIterator<Item = &'a str>, filter_clause: FilterClauseRule) -> Self {
        let mut table = HashMap::new();

        // pagination cursors
        table.insert("after".to_owned(), ArgumentRule::Fixed(0));
        table.insert("before".to_owned(), ArgumentRule::Fixed(0));

        table.insert("first".to_owned(), ArgumentRule::Computed(page_size_cost));
        table.insert("last".to_owned(), ArgumentRule::Computed(page_size_cost));

        // lookups of a single resource
        table.insert("id".to_owned(), ArgumentRule::Fixed(0));
        table.insert("slug".to_owned(), ArgumentRule::Fixed(0));
        table.insert("uri".to_owned(), ArgumentRule::Fixed(0));

        for alias in id_aliases {
            table.insert(alias.to_owned(), ArgumentRule::Fixed(0));
        }

        table.insert("where".to_owned(), ArgumentRule::FilterClause);

        ArgumentCostRules { table, filter_clause }
    }

    pub fn rule(&self, name: &str) -> Option<ArgumentRule> {
        self.table.get(name).copied()
    }

    pub fn filter_clause(&self) -> &FilterClauseRule {
        &self.filter_clause
    }

    pub fn cost_of_argument(&self, name: &str, value: &Value) -> Cost {
        match self.rule(name) {
            Some(ArgumentRule::Fixed(cost)) => cost,
            Some(ArgumentRule::Computed(compute)) => compute(value),
            Some(ArgumentRule::FilterClause) => self.filter_clause.cost_of_value(value),
            None => DISQUALIFYING_COST,
        }
    }
}
