use query_cost::{Cost, CostPolicy};
use serde_json::{Map, Value};

/// Per field cost evaluator, called once for every field it is registered on, after the
/// cost of the field's children is known.
pub trait FieldCostHook: Send + Sync {
    fn field_cost(&self, children_cost: Cost, arguments: &Map<String, Value>) -> Cost;
}

impl FieldCostHook for CostPolicy {
    fn field_cost(&self, children_cost: Cost, arguments: &Map<String, Value>) -> Cost {
        CostPolicy::field_cost(self, children_cost, arguments)
    }
}
