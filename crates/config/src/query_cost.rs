/// Which fields the argument cost hook is registered on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostScope {
    /// Only root query fields classify their arguments, nested fields cost one point each.
    #[default]
    RootFields,
    /// Every field classifies its arguments.
    AllFields,
}

#[derive(Clone, Debug, Default, PartialEq, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QueryCostConfig {
    /// Total cost an operation may reach. Default: 1000.
    pub max_cost: Option<u32>,
    /// Deepest nesting of fields with a selection set. Default: 11.
    pub max_depth: Option<u16>,
    /// Fields on which arguments are classified. Default: root fields.
    pub scope: CostScope,
    /// Filter predicates that are free when used alone. Replaces the built-in list.
    pub restricted_where_args: Option<Vec<String>>,
    /// Filter predicates that are always free. Replaces the built-in (empty) list.
    pub whitelisted_where_args: Option<Vec<String>>,
    /// Extra aliases of the `id` argument, added to the built-in ones.
    pub id_aliases: Vec<String>,
}
