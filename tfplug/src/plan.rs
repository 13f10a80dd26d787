//! Schema-driven planning, validation and state conformance
//!
//! These functions implement the framework side of PlanResourceChange,
//! the Validate*Config RPCs and UpgradeResourceState so that resources only
//! describe their schema and CRUD behavior.

use crate::schema::{
    Attribute, DefaultRequest, ObjectNestingMode, PlanModifierRequest, Schema, ValidatorRequest,
};
use crate::types::{AttributePath, Diagnostic, Dynamic, DynamicValue, RawState};

static NULL: Dynamic = Dynamic::Null;

/// Outcome of planning a single resource change
#[derive(Debug)]
pub struct PlannedChange {
    pub planned_state: DynamicValue,
    pub requires_replace: Vec<AttributePath>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Attribute `name` of an object value, null when absent or not an object
fn field<'a>(value: &'a Dynamic, name: &str) -> &'a Dynamic {
    match value {
        Dynamic::Map(fields) => fields.get(name).unwrap_or(&NULL),
        _ => &NULL,
    }
}

fn single_nested(attr: &Attribute) -> Option<&[Attribute]> {
    attr.nested_type
        .as_ref()
        .filter(|nested| nested.nesting == ObjectNestingMode::Single)
        .map(|nested| nested.attributes.as_slice())
}

/// Plan a change from `prior` to `proposed`.
///
/// Destroy plans are returned untouched. Otherwise defaults fill null
/// configuration values, computed attributes without configuration become
/// unknown when the resource is created or changed, and attribute plan
/// modifiers have the last word.
pub fn plan_resource_change(
    schema: &Schema,
    prior: &DynamicValue,
    proposed: &DynamicValue,
    config: &DynamicValue,
) -> PlannedChange {
    let mut change = PlannedChange {
        planned_state: proposed.clone(),
        requires_replace: vec![],
        diagnostics: vec![],
    };

    if proposed.is_null() {
        return change;
    }

    let attributes = &schema.block.attributes;
    let mut planned = proposed.value.clone();

    apply_defaults(attributes, &config.value, &mut planned, &AttributePath::root());

    if prior.is_null() || planned != prior.value {
        mark_computed_unknown(attributes, &config.value, &mut planned);
    }

    run_plan_modifiers(
        attributes,
        &config.value,
        &prior.value,
        &mut planned,
        &AttributePath::root(),
        &mut change,
    );

    change.planned_state = DynamicValue::new(planned);
    change
}

fn apply_defaults(
    attributes: &[Attribute],
    config: &Dynamic,
    planned: &mut Dynamic,
    path: &AttributePath,
) {
    let Dynamic::Map(planned_fields) = planned else {
        return;
    };

    for attr in attributes {
        let attr_path = path.clone().attribute(&attr.name);
        let config_value = field(config, &attr.name);

        if config_value.is_null() {
            if let Some(default) = &attr.default {
                let response = default.default_value(DefaultRequest {
                    path: attr_path.clone(),
                });
                planned_fields.insert(attr.name.clone(), response.value.value);
            }
        }

        if let Some(nested) = single_nested(attr) {
            if let Some(child) = planned_fields.get_mut(&attr.name) {
                apply_defaults(nested, config_value, child, &attr_path);
            }
        }
    }
}

fn mark_computed_unknown(attributes: &[Attribute], config: &Dynamic, planned: &mut Dynamic) {
    let Dynamic::Map(planned_fields) = planned else {
        return;
    };

    for attr in attributes {
        let config_value = field(config, &attr.name);

        if attr.computed && attr.default.is_none() && config_value.is_null() {
            planned_fields.insert(attr.name.clone(), Dynamic::Unknown);
            continue;
        }

        if let Some(nested) = single_nested(attr) {
            if let Some(child) = planned_fields.get_mut(&attr.name) {
                mark_computed_unknown(nested, config_value, child);
            }
        }
    }
}

fn run_plan_modifiers(
    attributes: &[Attribute],
    config: &Dynamic,
    prior: &Dynamic,
    planned: &mut Dynamic,
    path: &AttributePath,
    change: &mut PlannedChange,
) {
    let Dynamic::Map(planned_fields) = planned else {
        return;
    };

    for attr in attributes {
        let attr_path = path.clone().attribute(&attr.name);
        let config_value = field(config, &attr.name);
        let prior_value = field(prior, &attr.name);

        if !attr.plan_modifiers.is_empty() {
            let mut plan_value =
                DynamicValue::new(planned_fields.get(&attr.name).cloned().unwrap_or(Dynamic::Null));

            for modifier in &attr.plan_modifiers {
                let response = modifier.modify(PlanModifierRequest {
                    config_value: DynamicValue::new(config_value.clone()),
                    state_value: DynamicValue::new(prior_value.clone()),
                    plan_value,
                    path: attr_path.clone(),
                });

                plan_value = response.plan_value;
                change.diagnostics.extend(response.diagnostics);

                if response.requires_replace
                    && !prior.is_null()
                    && !change.requires_replace.contains(&attr_path)
                {
                    change.requires_replace.push(attr_path.clone());
                }
            }

            planned_fields.insert(attr.name.clone(), plan_value.value);
        }

        if let Some(nested) = single_nested(attr) {
            if let Some(child) = planned_fields.get_mut(&attr.name) {
                run_plan_modifiers(nested, config_value, prior_value, child, &attr_path, change);
            }
        }
    }
}

/// Run attribute validators over known, non-null configuration values
pub fn validate_config(schema: &Schema, config: &DynamicValue) -> Vec<Diagnostic> {
    let mut diagnostics = vec![];
    validate_attributes(
        &schema.block.attributes,
        &config.value,
        &AttributePath::root(),
        &mut diagnostics,
    );
    diagnostics
}

fn validate_attributes(
    attributes: &[Attribute],
    value: &Dynamic,
    path: &AttributePath,
    diagnostics: &mut Vec<Diagnostic>,
) {
    for attr in attributes {
        let attr_path = path.clone().attribute(&attr.name);
        let attr_value = field(value, &attr.name);

        if attr_value.is_null() || attr_value.is_unknown() {
            continue;
        }

        if attr.deprecated {
            diagnostics.push(
                Diagnostic::warning(
                    "Attribute Deprecated",
                    format!("The attribute {} is deprecated", attr_path),
                )
                .with_attribute(attr_path.clone()),
            );
        }

        if !attr_value.contains_unknown() {
            for validator in &attr.validators {
                let response = validator.validate(ValidatorRequest {
                    config_value: DynamicValue::new(attr_value.clone()),
                    path: attr_path.clone(),
                });
                diagnostics.extend(response.diagnostics);
            }
        }

        let Some(nested) = &attr.nested_type else {
            continue;
        };
        match (nested.nesting, attr_value) {
            (ObjectNestingMode::Single, _) => {
                validate_attributes(&nested.attributes, attr_value, &attr_path, diagnostics)
            }
            (ObjectNestingMode::List, Dynamic::List(items)) => {
                for (idx, item) in items.iter().enumerate() {
                    let item_path = attr_path.clone().index(idx as i64);
                    validate_attributes(&nested.attributes, item, &item_path, diagnostics);
                }
            }
            _ => {}
        }
    }
}

/// Reshape an object so it carries exactly the schema's attributes.
/// Unknown attributes are dropped and missing ones become null.
pub fn conform_to_schema(schema: &Schema, value: Dynamic) -> Dynamic {
    conform_object(&schema.block.attributes, value)
}

fn conform_object(attributes: &[Attribute], value: Dynamic) -> Dynamic {
    let Dynamic::Map(mut fields) = value else {
        return value;
    };

    let conformed = attributes
        .iter()
        .map(|attr| {
            let value = fields.remove(&attr.name).unwrap_or(Dynamic::Null);
            let value = match (&attr.nested_type, value) {
                (Some(nested), value) if nested.nesting == ObjectNestingMode::Single => {
                    conform_object(&nested.attributes, value)
                }
                (Some(nested), Dynamic::List(items))
                    if nested.nesting == ObjectNestingMode::List =>
                {
                    Dynamic::List(
                        items
                            .into_iter()
                            .map(|item| conform_object(&nested.attributes, item))
                            .collect(),
                    )
                }
                (_, value) => value,
            };
            (attr.name.clone(), value)
        })
        .collect();

    Dynamic::Map(conformed)
}

/// Upgrade stored JSON state to the current schema
pub fn upgrade_state(
    schema: &Schema,
    version: i64,
    raw_state: &RawState,
) -> Result<DynamicValue, Diagnostic> {
    if version > schema.version {
        return Err(Diagnostic::error(
            "Unable to Upgrade Resource State",
            format!(
                "State version {} is newer than the schema version {}; upgrade the provider",
                version, schema.version
            ),
        ));
    }

    let json = match &raw_state.json {
        Some(json) if !json.is_empty() => json,
        _ => {
            return Err(Diagnostic::error(
                "Unable to Upgrade Resource State",
                "Only JSON encoded state can be upgraded",
            ))
        }
    };

    let state = DynamicValue::decode_json(json).map_err(|e| {
        Diagnostic::error(
            "Unable to Read Previously Saved State for UpgradeResourceState",
            e.to_string(),
        )
    })?;

    Ok(DynamicValue::new(conform_to_schema(schema, state.value)))
}
