//! Built-in attribute validators

use crate::schema::{Validator, ValidatorRequest, ValidatorResponse};
use crate::types::{Diagnostic, Dynamic};

/// Accepts only strings from a fixed set of values
pub struct StringOneOf {
    allowed: Vec<String>,
}

impl StringOneOf {
    pub fn create(allowed: &[&str]) -> Box<dyn Validator> {
        Box::new(Self {
            allowed: allowed.iter().map(|s| s.to_string()).collect(),
        })
    }
}

impl Validator for StringOneOf {
    fn description(&self) -> String {
        format!("value must be one of: {}", self.allowed.join(", "))
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let mut diagnostics = vec![];

        if let Dynamic::String(value) = &request.config_value.value {
            if !self.allowed.iter().any(|allowed| allowed == value) {
                diagnostics.push(
                    Diagnostic::error(
                        "Invalid Attribute Value Match",
                        format!(
                            "Attribute {} value must be one of: {:?}, got: {:?}",
                            request.path, self.allowed, value
                        ),
                    )
                    .with_attribute(request.path),
                );
            }
        }

        ValidatorResponse { diagnostics }
    }
}

/// Accepts only whole numbers that fit in an `i64`
pub struct Int64Value;

impl Int64Value {
    pub fn create() -> Box<dyn Validator> {
        Box::new(Self)
    }
}

impl Validator for Int64Value {
    fn description(&self) -> String {
        "value must be a whole number".to_string()
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let mut diagnostics = vec![];

        if let Dynamic::Number(n) = request.config_value.value {
            // i64::MAX as f64 rounds up to 2^63
            let whole = n.fract() == 0.0 && n >= i64::MIN as f64 && n < i64::MAX as f64;
            if !whole {
                diagnostics.push(
                    Diagnostic::error(
                        "Invalid Attribute Value",
                        format!(
                            "Attribute {} value must be a whole number, got: {}",
                            request.path, n
                        ),
                    )
                    .with_attribute(request.path),
                );
            }
        }

        ValidatorResponse { diagnostics }
    }
}
