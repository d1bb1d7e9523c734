//! Checks dynamic field answers against the subtype's declarations

use movement_types::{DynamicFields, FieldDescriptor, FieldKind, FieldValue};

/// Validate `answers` against `declared` and return the normalized answers.
///
/// Keys the subtype does not declare are dropped. Numeric and boolean answers
/// typed as text are coerced to their declared kind. On failure every
/// violation is returned, not just the first one.
pub fn normalize(declared: &[FieldDescriptor], answers: &DynamicFields) -> Result<DynamicFields, Vec<String>> {
    let mut normalized = DynamicFields::new();
    let mut violations = Vec::new();

    for field in declared {
        match answers.get(&field.key).filter(|value| !value.is_blank()) {
            None => {
                if field.required {
                    violations.push(format!("{} is required", field.label));
                }
            }
            Some(value) => match coerce(field, value) {
                Ok(value) => {
                    normalized.insert(field.key.clone(), value);
                }
                Err(violation) => violations.push(violation),
            },
        }
    }

    let undeclared: Vec<&String> = answers
        .keys()
        .filter(|key| !declared.iter().any(|field| &field.key == *key))
        .collect();
    if !undeclared.is_empty() {
        log::debug!("Pruning undeclared dynamic fields: {:?}", undeclared);
    }

    if violations.is_empty() {
        Ok(normalized)
    } else {
        Err(violations)
    }
}

fn coerce(field: &FieldDescriptor, value: &FieldValue) -> Result<FieldValue, String> {
    match (field.kind, value) {
        (FieldKind::Text, FieldValue::Text(_)) => Ok(value.clone()),
        (FieldKind::Text, FieldValue::Number(n)) => Ok(FieldValue::Text(n.to_string())),
        (FieldKind::Number, FieldValue::Number(n)) if n.is_finite() => Ok(value.clone()),
        (FieldKind::Number, FieldValue::Number(_)) => Err(format!("{} must be a number", field.label)),
        // NaN and infinities parse as f64 but serialize as null
        (FieldKind::Number, FieldValue::Text(text)) => text
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .map(FieldValue::Number)
            .ok_or_else(|| format!("{} must be a number", field.label)),
        (FieldKind::Checkbox, FieldValue::Bool(_)) => Ok(value.clone()),
        (FieldKind::Checkbox, FieldValue::Text(text)) => match text.trim() {
            "true" => Ok(FieldValue::Bool(true)),
            "false" => Ok(FieldValue::Bool(false)),
            _ => Err(format!("{} must be checked or unchecked", field.label)),
        },
        (FieldKind::Select, FieldValue::Text(text)) => {
            if field.options.is_empty() || field.options.iter().any(|o| o == text) {
                Ok(value.clone())
            } else {
                Err(format!("{} must be one of: {}", field.label, field.options.join(", ")))
            }
        }
        (kind, _) => Err(format!("{} expects a {} value", field.label, kind)),
    }
}
