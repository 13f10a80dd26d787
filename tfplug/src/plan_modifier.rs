//! Built-in attribute plan modifiers
//!
//! Plan modifiers run after defaults are applied and computed attributes are
//! marked unknown. They can rewrite the planned value or flag the attribute
//! as forcing replacement of the resource.

use crate::schema::{PlanModifier, PlanModifierRequest, PlanModifierResponse};
use crate::types::Dynamic;

/// Marks the resource for replacement when the attribute changes
pub struct RequiresReplace;

impl RequiresReplace {
    pub fn create() -> Box<dyn PlanModifier> {
        Box::new(Self)
    }
}

impl PlanModifier for RequiresReplace {
    fn description(&self) -> String {
        "changing this value forces replacement of the resource".to_string()
    }

    fn modify(&self, request: PlanModifierRequest) -> PlanModifierResponse {
        // Nothing to replace on create; unknown plans are decided at apply
        let requires_replace = !request.state_value.is_null()
            && !request.plan_value.value.contains_unknown()
            && request.state_value.value != request.plan_value.value;

        PlanModifierResponse {
            plan_value: request.plan_value,
            requires_replace,
            diagnostics: vec![],
        }
    }
}

/// Copies the prior state value into the plan when the plan would
/// otherwise be unknown. Use for computed values that never change after
/// creation, such as server-assigned IDs.
pub struct UseStateForUnknown;

impl UseStateForUnknown {
    pub fn create() -> Box<dyn PlanModifier> {
        Box::new(Self)
    }
}

impl PlanModifier for UseStateForUnknown {
    fn description(&self) -> String {
        "once set, the value of this attribute in state will not change".to_string()
    }

    fn modify(&self, request: PlanModifierRequest) -> PlanModifierResponse {
        let keep_state = request.plan_value.is_unknown()
            && !matches!(request.state_value.value, Dynamic::Null)
            && request.config_value.is_null();

        PlanModifierResponse {
            plan_value: if keep_state {
                request.state_value
            } else {
                request.plan_value
            },
            requires_replace: false,
            diagnostics: vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AttributePath, DynamicValue};

    fn request(state: Dynamic, plan: Dynamic) -> PlanModifierRequest {
        PlanModifierRequest {
            config_value: DynamicValue::null(),
            state_value: DynamicValue::new(state),
            plan_value: DynamicValue::new(plan),
            path: AttributePath::new("challenge_id"),
        }
    }

    #[test]
    fn requires_replace_when_value_changes() {
        let response = RequiresReplace.modify(request(
            Dynamic::String("1".to_string()),
            Dynamic::String("2".to_string()),
        ));
        assert!(response.requires_replace);
    }

    #[test]
    fn requires_replace_ignores_identical_values() {
        let response = RequiresReplace.modify(request(
            Dynamic::String("1".to_string()),
            Dynamic::String("1".to_string()),
        ));
        assert!(!response.requires_replace);
    }

    #[test]
    fn requires_replace_ignores_create() {
        let response =
            RequiresReplace.modify(request(Dynamic::Null, Dynamic::String("1".to_string())));
        assert!(!response.requires_replace);
    }

    #[test]
    fn requires_replace_waits_for_known_plan() {
        let response =
            RequiresReplace.modify(request(Dynamic::String("1".to_string()), Dynamic::Unknown));
        assert!(!response.requires_replace);
        assert!(response.plan_value.is_unknown());
    }

    #[test]
    fn use_state_for_unknown_keeps_prior_value() {
        let response = UseStateForUnknown
            .modify(request(Dynamic::String("42".to_string()), Dynamic::Unknown));
        assert_eq!(response.plan_value.value, Dynamic::String("42".to_string()));
        assert!(!response.requires_replace);
    }

    #[test]
    fn use_state_for_unknown_leaves_create_unknown() {
        let response = UseStateForUnknown.modify(request(Dynamic::Null, Dynamic::Unknown));
        assert!(response.plan_value.is_unknown());
    }
}
