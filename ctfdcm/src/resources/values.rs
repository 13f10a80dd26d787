//! Typed reads over Terraform values
//!
//! Null and unknown values both read as absent; planned state carries
//! unknowns for computed attributes the server has yet to fill.

use std::collections::BTreeMap;
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};

pub fn string_attr(value: &DynamicValue, name: &str) -> Option<String> {
    value
        .get_dynamic(&AttributePath::new(name))
        .as_str()
        .map(str::to_string)
}

/// Whole-number attribute; fractions and values outside `i64` are rejected
pub fn number_attr(value: &DynamicValue, name: &str) -> Result<Option<i64>, Diagnostic> {
    match value.get_dynamic(&AttributePath::new(name)).as_number() {
        None => Ok(None),
        Some(n) => whole_number(n).map(Some).ok_or_else(|| {
            Diagnostic::error(
                format!("Invalid {}", name),
                format!("The '{}' attribute must be a whole number, got: {}", name, n),
            )
            .with_attribute(AttributePath::new(name))
        }),
    }
}

fn whole_number(n: f64) -> Option<i64> {
    // i64::MAX is not representable, its f64 cast rounds up to 2^63
    (n.fract() == 0.0 && n >= i64::MIN as f64 && n < i64::MAX as f64).then_some(n as i64)
}

pub fn bool_attr(value: &DynamicValue, name: &str) -> Option<bool> {
    value.get_dynamic(&AttributePath::new(name)).as_bool()
}

pub fn string_list(value: &Dynamic) -> Vec<String> {
    value
        .as_list()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

pub fn string_list_attr(value: &DynamicValue, name: &str) -> Vec<String> {
    string_list(&value.get_dynamic(&AttributePath::new(name)))
}

pub fn string_map_attr(value: &DynamicValue, name: &str) -> BTreeMap<String, String> {
    value
        .get_dynamic(&AttributePath::new(name))
        .as_map()
        .map(|entries| {
            entries
                .iter()
                .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

pub fn required_string(value: &DynamicValue, name: &str) -> Result<String, Diagnostic> {
    string_attr(value, name).ok_or_else(|| missing(name))
}

pub fn required_number(value: &DynamicValue, name: &str) -> Result<i64, Diagnostic> {
    number_attr(value, name)?.ok_or_else(|| missing(name))
}

fn missing(name: &str) -> Diagnostic {
    Diagnostic::error(
        format!("Missing {}", name),
        format!("The '{}' attribute is required", name),
    )
    .with_attribute(AttributePath::new(name))
}

pub fn string_list_value(values: &[String]) -> Dynamic {
    Dynamic::List(values.iter().cloned().map(Dynamic::String).collect())
}

pub fn string_map_value(values: &BTreeMap<String, String>) -> Dynamic {
    Dynamic::Map(
        values
            .iter()
            .map(|(k, v)| (k.clone(), Dynamic::String(v.clone())))
            .collect(),
    )
}
