use itertools::Itertools;
use query_cost::Cost;

/// Reasons an operation is refused. All of them are raised before anything is executed.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GuardError {
    #[error("Could not parse the operation: {0}")]
    Parse(String),
    #[error("The document does not contain any operation.")]
    MissingOperation,
    #[error(r#"Unknown operation named "{name}""#)]
    UnknownOperation { name: String },
    #[error("Operation name required in request.")]
    OperationNameRequired,
    #[error("Mutations are disabled.")]
    MutationsDisabled,
    #[error("Querying '{name}' is not allowed.")]
    RootFieldNotAllowed { name: String },
    #[error("Unknown fragment named '{name}'")]
    UnknownFragment { name: String },
    #[error("Fragment cycle detected: {}", .cycle.iter().join(", "))]
    FragmentCycle { cycle: Vec<String> },
    #[error("Query is too complex. Max query cost is {max_cost} but got {cost}.")]
    QueryTooComplex { cost: Cost, max_cost: Cost },
    #[error("Query is nested too deep. Max query depth is {max_depth} but got {depth}.")]
    QueryTooDeep { depth: usize, max_depth: usize },
    #[error("Query selections are nested too deep. Max nesting is {max_nesting} but got {nesting}.")]
    SelectionsTooDeep { nesting: usize, max_nesting: usize },
}

impl GuardError {
    /// Whether the operation was well formed but exceeded a configured limit.
    pub fn is_limit_exceeded(&self) -> bool {
        matches!(
            self,
            GuardError::QueryTooComplex { .. }
                | GuardError::QueryTooDeep { .. }
                | GuardError::SelectionsTooDeep { .. }
        )
    }
}
