//! Plan modifiers and schema-driven resource planning

use crate::schema::{PlanModifier, PlanModifierRequest, PlanModifierResponse, Schema};
use crate::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};

/// Marks an attribute as requiring replacement when it changes
pub struct RequiresReplaceIfChanged;

impl PlanModifier for RequiresReplaceIfChanged {
    fn description(&self) -> String {
        "changing this attribute forces replacement".to_string()
    }

    fn modify(&self, request: PlanModifierRequest) -> PlanModifierResponse {
        let requires_replace = !matches!(
            (&request.state_value.value, &request.plan_value.value),
            (Dynamic::Null, _) | (Dynamic::Unknown, _) | (_, Dynamic::Unknown)
        ) && !values_equal(&request.state_value.value, &request.plan_value.value);

        PlanModifierResponse {
            plan_value: request.plan_value,
            requires_replace,
            diagnostics: vec![],
        }
    }
}

/// Uses the prior state value when the planned value is unknown
///
/// For computed attributes that never change after creation, such as
/// generated identifiers.
pub struct UseStateForUnknown;

impl PlanModifier for UseStateForUnknown {
    fn description(&self) -> String {
        "once set, the value of this attribute in state will not change".to_string()
    }

    fn modify(&self, request: PlanModifierRequest) -> PlanModifierResponse {
        let plan_value = match (&request.plan_value.value, &request.state_value.value) {
            (Dynamic::Unknown, Dynamic::Null) => request.plan_value,
            (Dynamic::Unknown, _) => request.state_value,
            _ => request.plan_value,
        };

        PlanModifierResponse {
            plan_value,
            requires_replace: false,
            diagnostics: vec![],
        }
    }
}

/// Outcome of planning one resource change
#[derive(Debug, Clone)]
pub struct PlannedChange {
    pub planned_state: DynamicValue,
    pub requires_replace: Vec<AttributePath>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Computes the planned state for a resource from its config and prior state
///
/// A null config plans a destroy. Otherwise the plan starts from config,
/// computed attributes left unset become unknown, and every attribute's plan
/// modifiers run in declaration order.
pub fn plan_resource(
    schema: &Schema,
    config: &DynamicValue,
    prior_state: &DynamicValue,
) -> PlannedChange {
    if config.is_null() {
        return PlannedChange {
            planned_state: DynamicValue::null(),
            requires_replace: vec![],
            diagnostics: vec![],
        };
    }

    let mut planned_state = DynamicValue::object();
    let mut requires_replace = vec![];
    let mut diagnostics = vec![];

    for attr in &schema.block.attributes {
        let path = AttributePath::new(&attr.name);
        let config_value = config.get(&path).cloned().unwrap_or(Dynamic::Null);
        let state_value = prior_state.get(&path).cloned().unwrap_or(Dynamic::Null);

        let mut plan_value = if attr.computed && config_value.is_null() {
            DynamicValue::unknown()
        } else {
            DynamicValue::new(config_value.clone())
        };

        for modifier in &attr.plan_modifiers {
            let response = modifier.modify(PlanModifierRequest {
                config_value: DynamicValue::new(config_value.clone()),
                state_value: DynamicValue::new(state_value.clone()),
                plan_value,
                path: path.clone(),
            });
            plan_value = response.plan_value;
            diagnostics.extend(response.diagnostics);
            if response.requires_replace && !prior_state.is_null() {
                requires_replace.push(path.clone());
            }
        }

        if let Err(e) = planned_state.set_value(&path, plan_value.value) {
            diagnostics.push(
                Diagnostic::error("Failed to plan attribute", e.to_string()).with_attribute(path),
            );
        }
    }

    PlannedChange {
        planned_state,
        requires_replace,
        diagnostics,
    }
}

/// Structural equality with a float tolerance for numbers
fn values_equal(a: &Dynamic, b: &Dynamic) -> bool {
    match (a, b) {
        (Dynamic::Null, Dynamic::Null) => true,
        (Dynamic::Bool(a), Dynamic::Bool(b)) => a == b,
        (Dynamic::Number(a), Dynamic::Number(b)) => (a - b).abs() < f64::EPSILON,
        (Dynamic::String(a), Dynamic::String(b)) => a == b,
        (Dynamic::List(a), Dynamic::List(b)) => {
            a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| values_equal(x, y))
        }
        (Dynamic::Map(a), Dynamic::Map(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(k, v)| b.get(k).is_some_and(|v2| values_equal(v, v2)))
        }
        _ => false,
    }
}
