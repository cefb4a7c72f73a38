//! Random leaf values

use apollo_compiler::schema::EnumType;
use rand::Rng;
use serde_json::Value;

use super::ScalarMocks;

/// Mock for any scalar without a better idea of what it holds
pub(crate) const DEFAULT_STRING: &str = "Hello World";

/// Generate a value for the named scalar.
///
/// Configured scalar mocks win over the built-in defaults.
pub(crate) fn scalar(name: &str, scalar_mocks: &ScalarMocks, rng: &mut impl Rng) -> Value {
    if let Some(value) = scalar_mocks.get(name) {
        return value.clone();
    }

    match name {
        "Int" => Value::from(rng.random_range(-100..=100_i64)),
        "Float" => Value::from(rng.random_range(-100.0..100.0_f64)),
        "Boolean" => Value::Bool(rng.random_bool(0.5)),
        "ID" => Value::String(uuid(rng)),
        _ => Value::String(DEFAULT_STRING.to_string()),
    }
}

/// Pick one of the enum's declared values
pub(crate) fn enum_value(enum_type: &EnumType, rng: &mut impl Rng) -> Value {
    if enum_type.values.is_empty() {
        return Value::Null;
    }
    let index = rng.random_range(0..enum_type.values.len());
    enum_type
        .values
        .get_index(index)
        .map(|(name, _)| Value::String(name.to_string()))
        .unwrap_or(Value::Null)
}

/// A version 4 UUID drawn from `rng`, so seeded runs stay reproducible
pub(crate) fn uuid(rng: &mut impl Rng) -> String {
    let mut bytes = [0u8; 16];
    rng.fill(&mut bytes);
    uuid::Builder::from_random_bytes(bytes)
        .into_uuid()
        .hyphenated()
        .to_string()
}
