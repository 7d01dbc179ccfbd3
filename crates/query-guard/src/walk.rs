use std::collections::HashMap;

use cynic_parser::{
    executable::{FieldSelection, FragmentSpread, Iter, OperationDefinition, Selection},
    Value as GraphqlValue,
};
use query_cost::Cost;
use query_guard_config::CostScope;
use serde_json::{Map, Number, Value};

use crate::{GuardError, QueryGuardInner, MAX_SELECTION_NESTING};

type WalkResult<T> = Result<T, GuardError>;

/// Fragments are measured once per name, enclosing field count and nesting.
type FragmentKey<'p> = (&'p str, usize, usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Measure {
    pub cost: Cost,
    pub depth: usize,
}

/// Walks an operation bottom-up: the cost of every field is computed once the cost of
/// its children is known, and depth is checked on the way down.
pub(crate) struct Walker<'p, 'g> {
    guard: &'g QueryGuardInner,
    operation: OperationDefinition<'p>,
    variables: &'g Map<String, Value>,
    // Arguments are only classified for queries.
    evaluate_arguments: bool,
    enclosing_fields: usize,
    nesting: usize,
    depth: usize,
    current_fragments_stack: Vec<&'p str>,
    fragment_measures: HashMap<FragmentKey<'p>, Measure>,
}

impl<'p, 'g> Walker<'p, 'g> {
    pub(crate) fn new(
        guard: &'g QueryGuardInner,
        operation: OperationDefinition<'p>,
        variables: &'g Map<String, Value>,
        evaluate_arguments: bool,
    ) -> Self {
        Walker {
            guard,
            operation,
            variables,
            evaluate_arguments,
            enclosing_fields: 0,
            nesting: 0,
            depth: 0,
            current_fragments_stack: Vec::new(),
            fragment_measures: HashMap::new(),
        }
    }

    pub(crate) fn measure(mut self) -> WalkResult<Measure> {
        let cost = self.selection_set_cost(self.operation.selection_set())?;

        Ok(Measure {
            cost,
            depth: self.depth,
        })
    }

    fn selection_set_cost(&mut self, selection_set: Iter<'p, Selection<'p>>) -> WalkResult<Cost> {
        let mut cost: Cost = 0;

        for selection in selection_set {
            let selection_cost = match selection {
                Selection::Field(field) => self.field_cost(field)?,
                Selection::InlineFragment(inline_fragment) => {
                    self.enter_selection_set()?;
                    let cost = self.selection_set_cost(inline_fragment.selection_set())?;
                    self.nesting -= 1;
                    cost
                }
                Selection::FragmentSpread(fragment_spread) => self.fragment_spread_cost(fragment_spread)?,
            };

            cost = cost.saturating_add(selection_cost);
        }

        Ok(cost)
    }

    fn field_cost(&mut self, field: FieldSelection<'p>) -> WalkResult<Cost> {
        let name = field.name();
        let is_root = self.enclosing_fields == 0;
        let is_meta_field = name.starts_with("__");

        if is_root && self.evaluate_arguments {
            if let Some(root_fields) = &self.guard.root_fields {
                if !root_fields.is_allowed(name) {
                    return Err(GuardError::RootFieldNotAllowed { name: name.to_owned() });
                }
            }
        }

        // Leaf fields don't add depth, root fields with a selection set are at depth 0.
        let has_selection_set = field.selection_set().next().is_some();

        if has_selection_set {
            let depth = self.enclosing_fields;

            if depth > self.guard.max_depth {
                return Err(GuardError::QueryTooDeep {
                    depth,
                    max_depth: self.guard.max_depth,
                });
            }

            self.depth = self.depth.max(depth);
            self.enter_selection_set()?;
        }

        self.enclosing_fields += 1;
        let children_cost = self.selection_set_cost(field.selection_set())?;
        self.enclosing_fields -= 1;

        if has_selection_set {
            self.nesting -= 1;
        }

        let hooked = self.evaluate_arguments
            && !is_meta_field
            && (is_root || self.guard.scope == CostScope::AllFields);

        if !hooked {
            return Ok(children_cost.saturating_add(1));
        }

        let arguments = field
            .arguments()
            .map(|argument| (argument.name().to_owned(), self.to_json(argument.value())))
            .collect::<Map<_, _>>();

        Ok(self.guard.cost_hook.field_cost(children_cost, &arguments))
    }

    fn fragment_spread_cost(&mut self, fragment_spread: FragmentSpread<'p>) -> WalkResult<Cost> {
        let fragment_name = fragment_spread.fragment_name();

        if self.current_fragments_stack.contains(&fragment_name) {
            self.current_fragments_stack.push(fragment_name);
            return Err(GuardError::FragmentCycle {
                cycle: std::mem::take(&mut self.current_fragments_stack)
                    .into_iter()
                    .map(str::to_string)
                    .collect(),
            });
        }

        let key = (fragment_name, self.enclosing_fields, self.nesting);

        if let Some(measure) = self.fragment_measures.get(&key) {
            self.depth = self.depth.max(measure.depth);
            return Ok(measure.cost);
        }

        let Some(fragment) = fragment_spread.fragment() else {
            return Err(GuardError::UnknownFragment {
                name: fragment_name.to_string(),
            });
        };

        self.enter_selection_set()?;
        self.current_fragments_stack.push(fragment_name);
        let outer_depth = std::mem::take(&mut self.depth);

        let cost = self.selection_set_cost(fragment.selection_set())?;

        let depth = self.depth;
        self.depth = outer_depth.max(depth);
        self.current_fragments_stack.pop();
        self.nesting -= 1;

        self.fragment_measures.insert(key, Measure { cost, depth });

        Ok(cost)
    }

    /// Inline fragments and fragment spreads nest without adding depth, so every selection
    /// set entered counts against a fixed nesting limit.
    fn enter_selection_set(&mut self) -> WalkResult<()> {
        self.nesting += 1;

        if self.nesting > MAX_SELECTION_NESTING {
            return Err(GuardError::SelectionsTooDeep {
                nesting: self.nesting,
                max_nesting: MAX_SELECTION_NESTING,
            });
        }

        Ok(())
    }

    fn to_json(&self, value: GraphqlValue<'_>) -> Value {
        match value {
            GraphqlValue::Variable(variable) => self.variable_value(variable.name()),
            GraphqlValue::Int(number) => Value::from(number.as_i64()),
            GraphqlValue::Float(number) => Number::from_f64(number.as_f64())
                .map(Value::Number)
                .unwrap_or(Value::Null),
            GraphqlValue::String(s) => Value::from(s.as_str()),
            GraphqlValue::Boolean(b) => Value::Bool(b.value()),
            GraphqlValue::Null(_) => Value::Null,
            GraphqlValue::Enum(value) => Value::from(value.name()),
            GraphqlValue::List(list) => Value::Array(list.items().map(|item| self.to_json(item)).collect()),
            GraphqlValue::Object(object) => Value::Object(
                object
                    .fields()
                    .map(|field| (field.name().to_owned(), self.to_json(field.value())))
                    .collect(),
            ),
        }
    }

    /// Request variables first, then the variable's default value.
    fn variable_value(&self, name: &str) -> Value {
        if let Some(value) = self.variables.get(name) {
            return value.clone();
        }

        self.operation
            .variable_definitions()
            .find(|definition| definition.name() == name)
            .and_then(|definition| definition.default_value())
            .map(|default_value| self.to_json(default_value.into()))
            .unwrap_or(Value::Null)
    }
}
