//! Admission control for GraphQL operations.
//!
//! [`QueryGuard`] parses an operation, walks its fields bottom-up and asks the registered
//! [`FieldCostHook`] (by default a [`CostPolicy`]) for the cost of every hooked field. The
//! operation is refused when its total cost exceeds the maximum cost, when it is nested
//! deeper than the maximum depth, when it selects a root query that isn't allowed, or when
//! it is a mutation and mutations are disabled.

#![cfg_attr(test, allow(unused_crate_dependencies))]

mod error;
mod hook;
mod root_fields;
mod walk;

use std::sync::Arc;

use cynic_parser::{common::OperationType, executable::OperationDefinition, ExecutableDocument};
use query_cost::{Cost, CostPolicy, CostPolicyBuilder};
use query_guard_config::{Config, CostScope};
use serde_json::{Map, Value};

pub use error::GuardError;
pub use hook::FieldCostHook;
pub use query_cost;
pub use root_fields::{ContentType, RootFieldFilter, RootFieldFilterBuilder};

/// Maximum number of selection sets (of fields, inline fragments and fragment spreads)
/// nested inside each other.
pub const MAX_SELECTION_NESTING: usize = 256;

type SchemaReadyHook = Box<dyn FnOnce(&mut CostPolicyBuilder) + Send>;
type AllowedQueriesHook = Box<dyn FnOnce(&mut std::collections::BTreeSet<String>) + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Query,
    Mutation,
    Subscription,
}

impl From<OperationType> for OperationKind {
    fn from(operation_type: OperationType) -> Self {
        match operation_type {
            OperationType::Query => OperationKind::Query,
            OperationType::Mutation => OperationKind::Mutation,
            OperationType::Subscription => OperationKind::Subscription,
        }
    }
}

/// Measurements of an admitted operation.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct OperationReport {
    pub operation_name: Option<String>,
    pub operation_type: OperationKind,
    pub cost: Cost,
    pub depth: usize,
}

/// Guard builder
pub struct QueryGuardBuilder {
    policy: CostPolicyBuilder,
    scope: CostScope,
    disable_mutations: bool,
    root_fields: RootFieldFilterBuilder,
    cost_hook: Option<Arc<dyn FieldCostHook>>,
    schema_ready_hooks: Vec<SchemaReadyHook>,
    allowed_queries_hooks: Vec<AllowedQueriesHook>,
}

impl Default for QueryGuardBuilder {
    fn default() -> Self {
        QueryGuardBuilder {
            policy: CostPolicy::builder(),
            scope: CostScope::default(),
            disable_mutations: true,
            root_fields: RootFieldFilterBuilder::default(),
            cost_hook: None,
            schema_ready_hooks: Vec::new(),
            allowed_queries_hooks: Vec::new(),
        }
    }
}

impl From<&Config> for QueryGuardBuilder {
    fn from(config: &Config) -> Self {
        let cost = &config.query_cost;
        let mut policy = CostPolicy::builder().with_id_aliases(cost.id_aliases.iter().cloned());

        if let Some(max_cost) = cost.max_cost {
            policy = policy.with_max_cost(Cost::try_from(max_cost).unwrap_or(Cost::MAX));
        }

        if let Some(max_depth) = cost.max_depth {
            policy = policy.with_max_depth(usize::from(max_depth));
        }

        if let Some(restricted) = &cost.restricted_where_args {
            policy = policy.with_restricted_where_args(restricted.iter().cloned());
        }

        if let Some(whitelisted) = &cost.whitelisted_where_args {
            policy = policy.with_whitelisted_where_args(whitelisted.iter().cloned());
        }

        QueryGuardBuilder {
            policy,
            scope: cost.scope,
            disable_mutations: config.schema.disable_mutations,
            root_fields: RootFieldFilterBuilder::from(&config.schema),
            ..Default::default()
        }
    }
}

impl QueryGuardBuilder {
    #[must_use]
    pub fn with_policy(mut self, policy: CostPolicyBuilder) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn with_scope(mut self, scope: CostScope) -> Self {
        self.scope = scope;
        self
    }

    #[must_use]
    pub fn with_disabled_mutations(mut self, disable_mutations: bool) -> Self {
        self.disable_mutations = disable_mutations;
        self
    }

    #[must_use]
    pub fn with_root_fields(mut self, root_fields: RootFieldFilterBuilder) -> Self {
        self.root_fields = root_fields;
        self
    }

    /// Replace the cost policy as per field cost evaluator. The policy still provides the
    /// cost and depth limits.
    #[must_use]
    pub fn with_cost_hook(mut self, hook: impl FieldCostHook + 'static) -> Self {
        self.cost_hook = Some(Arc::new(hook));
        self
    }

    /// Register a callback amending the cost policy once the schema is known. Callbacks
    /// run once, in registration order, when the guard is built.
    #[must_use]
    pub fn on_schema_ready(mut self, hook: impl FnOnce(&mut CostPolicyBuilder) + Send + 'static) -> Self {
        self.schema_ready_hooks.push(Box::new(hook));
        self
    }

    /// Register a callback amending the root query allow-list. Registering one enables
    /// root field filtering even without declared content types.
    #[must_use]
    pub fn on_allowed_queries(
        mut self,
        hook: impl FnOnce(&mut std::collections::BTreeSet<String>) + Send + 'static,
    ) -> Self {
        self.allowed_queries_hooks.push(Box::new(hook));
        self
    }

    pub fn finish(self) -> QueryGuard {
        let QueryGuardBuilder {
            mut policy,
            scope,
            disable_mutations,
            root_fields,
            cost_hook,
            schema_ready_hooks,
            allowed_queries_hooks,
        } = self;

        for hook in schema_ready_hooks {
            hook(&mut policy);
        }

        let root_fields = if root_fields.is_empty() && allowed_queries_hooks.is_empty() {
            None
        } else {
            let mut allowed = root_fields.allowed_queries();
            for hook in allowed_queries_hooks {
                hook(&mut allowed);
            }
            Some(RootFieldFilter::from_allowed_queries(allowed))
        };

        let policy = policy.finish();

        tracing::debug!(
            max_cost = policy.max_cost(),
            max_depth = policy.max_depth(),
            ?scope,
            disable_mutations,
            filter_root_fields = root_fields.is_some(),
            "query guard ready"
        );

        QueryGuard(Arc::new(QueryGuardInner {
            max_cost: policy.max_cost(),
            max_depth: policy.max_depth(),
            cost_hook: cost_hook.unwrap_or_else(|| Arc::new(policy.clone()) as Arc<dyn FieldCostHook>),
            policy,
            scope,
            disable_mutations,
            root_fields,
        }))
    }
}

pub(crate) struct QueryGuardInner {
    pub(crate) max_cost: Cost,
    pub(crate) max_depth: usize,
    pub(crate) cost_hook: Arc<dyn FieldCostHook>,
    pub(crate) policy: CostPolicy,
    pub(crate) scope: CostScope,
    pub(crate) disable_mutations: bool,
    pub(crate) root_fields: Option<RootFieldFilter>,
}

/// Validates operations against the cost policy. Cloning is cheap and the guard can be
/// shared between threads.
#[derive(Clone)]
pub struct QueryGuard(Arc<QueryGuardInner>);

impl Default for QueryGuard {
    fn default() -> Self {
        QueryGuard::builder().finish()
    }
}

impl QueryGuard {
    pub fn builder() -> QueryGuardBuilder {
        QueryGuardBuilder::default()
    }

    pub fn policy(&self) -> &CostPolicy {
        &self.0.policy
    }

    pub fn root_fields(&self) -> Option<&RootFieldFilter> {
        self.0.root_fields.as_ref()
    }

    /// Check an operation without executing it. `variables` are the request variables,
    /// used to resolve variable arguments.
    pub fn validate(
        &self,
        query: &str,
        operation_name: Option<&str>,
        variables: &Map<String, Value>,
    ) -> Result<OperationReport, GuardError> {
        let result = self.validate_inner(query, operation_name, variables);

        match &result {
            Ok(report) => tracing::debug!(
                operation_name = report.operation_name.as_deref(),
                cost = report.cost,
                depth = report.depth,
                "operation admitted"
            ),
            Err(error) => tracing::debug!(operation_name, "operation rejected: {error}"),
        }

        result
    }

    fn validate_inner(
        &self,
        query: &str,
        operation_name: Option<&str>,
        variables: &Map<String, Value>,
    ) -> Result<OperationReport, GuardError> {
        let document =
            cynic_parser::parse_executable_document(query).map_err(|error| GuardError::Parse(error.to_string()))?;

        let operation = select_operation(&document, operation_name)?;
        let operation_type = OperationKind::from(operation.operation_type());

        if operation_type == OperationKind::Mutation && self.0.disable_mutations {
            return Err(GuardError::MutationsDisabled);
        }

        let measure = walk::Walker::new(&self.0, operation, variables, operation_type == OperationKind::Query).measure()?;

        if measure.cost > self.0.max_cost {
            return Err(GuardError::QueryTooComplex {
                cost: measure.cost,
                max_cost: self.0.max_cost,
            });
        }

        Ok(OperationReport {
            operation_name: operation.name().map(str::to_owned),
            operation_type,
            cost: measure.cost,
            depth: measure.depth,
        })
    }
}

fn select_operation<'a>(
    document: &'a ExecutableDocument,
    operation_name: Option<&str>,
) -> Result<OperationDefinition<'a>, GuardError> {
    if let Some(name) = operation_name {
        return document
            .operations()
            .find(|operation| operation.name() == Some(name))
            .ok_or_else(|| GuardError::UnknownOperation { name: name.to_owned() });
    }

    let mut operations = document.operations();

    match (operations.next(), operations.next()) {
        (Some(operation), None) => Ok(operation),
        (None, _) => Err(GuardError::MissingOperation),
        (Some(_), Some(_)) => Err(GuardError::OperationNameRequired),
    }
}
