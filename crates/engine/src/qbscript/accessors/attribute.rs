//! Attribute proxy: `Owner.Attribute("HP")` and `Self`.
//!
//! Every mutating method returns the new value and writes through
//! [`RuntimeState::write_attribute`]. Values are never coerced across types.

use questbound_domain::{Attribute, AttributeId, AttributeType, AttributeValue, CharacterId};

use super::runtime_state::RuntimeState;
use crate::qbscript::error::EvaluationError;
use crate::qbscript::value::Value;

impl RuntimeState {
    pub(crate) fn attribute_property(
        &self,
        character_id: CharacterId,
        attribute_id: AttributeId,
        property: &str,
    ) -> Result<Value, EvaluationError> {
        let definition = self.attribute_definition(attribute_id)?;
        let value = match property {
            "value" => Value::from(&self.character_attribute(character_id, attribute_id)?.value),
            "title" => Value::from(definition.title.as_str()),
            "type" => Value::from(definition.attribute_type.as_str()),
            "min" => definition.min.map(Value::Number).unwrap_or(Value::Null),
            "max" => definition.max.map(Value::Number).unwrap_or(Value::Null),
            "options" => Value::List(
                definition
                    .options
                    .iter()
                    .map(|o| Value::from(o.as_str()))
                    .collect(),
            ),
            other => {
                return Err(EvaluationError::new(format!(
                    "Unknown property '{}' on attribute '{}'",
                    other, definition.title
                )))
            }
        };
        Ok(value)
    }

    pub(crate) fn call_attribute_method(
        &mut self,
        character_id: CharacterId,
        attribute_id: AttributeId,
        method: &str,
        args: &[Value],
    ) -> Result<Value, EvaluationError> {
        let definition = self.attribute_definition(attribute_id)?.clone();
        let current = self.character_attribute(character_id, attribute_id)?.value.clone();

        let new_value = match method {
            "set" => coerce_for(&definition, single_arg(&definition, method, args)?)?,
            "add" | "subtract" | "multiply" | "divide" => {
                let operand = number_arg(&definition, method, args)?;
                let base = number_value(&definition, method, &current)?;
                AttributeValue::Number(apply_arithmetic(method, base, operand)?)
            }
            "max" => {
                expect_no_args(method, args)?;
                let bound = definition.max.ok_or_else(|| missing_bound(&definition, "max"))?;
                number_value(&definition, method, &current)?;
                AttributeValue::Number(bound)
            }
            "min" => {
                expect_no_args(method, args)?;
                let bound = definition.min.ok_or_else(|| missing_bound(&definition, "min"))?;
                number_value(&definition, method, &current)?;
                AttributeValue::Number(bound)
            }
            "flip" => {
                expect_no_args(method, args)?;
                match (definition.attribute_type, &current) {
                    (AttributeType::Boolean, AttributeValue::Boolean(b)) => {
                        AttributeValue::Boolean(!b)
                    }
                    _ => return Err(wrong_type(&definition, method, "boolean")),
                }
            }
            "next" | "prev" => {
                expect_no_args(method, args)?;
                let options = list_options(&definition, method)?;
                let position = current
                    .as_text()
                    .and_then(|text| options.iter().position(|o| o == text));
                let len = options.len();
                let index = match (method, position) {
                    ("next", Some(i)) => (i + 1) % len,
                    ("next", None) => 0,
                    (_, Some(i)) => (i + len - 1) % len,
                    (_, None) => len - 1,
                };
                AttributeValue::Text(options[index].clone())
            }
            "setRandom" => {
                expect_no_args(method, args)?;
                let options = list_options(&definition, method)?;
                let last = i32::try_from(options.len() - 1).unwrap_or(i32::MAX);
                let picked = usize::try_from(self.random.gen_range(0, last))
                    .unwrap_or(0)
                    .min(options.len() - 1);
                AttributeValue::Text(options[picked].clone())
            }
            other => {
                return Err(EvaluationError::new(format!(
                    "Unknown method '{}' on attribute '{}'",
                    other, definition.title
                )))
            }
        };

        self.write_attribute(character_id, attribute_id, new_value.clone())?;
        Ok(Value::from(&new_value))
    }
}

fn single_arg<'a>(
    definition: &Attribute,
    method: &str,
    args: &'a [Value],
) -> Result<&'a Value, EvaluationError> {
    match args {
        [value] => Ok(value),
        _ => Err(EvaluationError::new(format!(
            "Attribute '{}'.{}() expects 1 argument, got {}",
            definition.title,
            method,
            args.len()
        ))),
    }
}

fn expect_no_args(method: &str, args: &[Value]) -> Result<(), EvaluationError> {
    if args.is_empty() {
        Ok(())
    } else {
        Err(EvaluationError::new(format!(
            "{}() takes no arguments, got {}",
            method,
            args.len()
        )))
    }
}

fn number_arg(definition: &Attribute, method: &str, args: &[Value]) -> Result<f64, EvaluationError> {
    let value = single_arg(definition, method, args)?;
    value.as_number().ok_or_else(|| {
        EvaluationError::new(format!(
            "Attribute '{}'.{}() expects a number, got {}",
            definition.title,
            method,
            value.type_name()
        ))
    })
}

fn number_value(
    definition: &Attribute,
    method: &str,
    current: &AttributeValue,
) -> Result<f64, EvaluationError> {
    match (definition.attribute_type, current) {
        (AttributeType::Number, AttributeValue::Number(n)) => Ok(*n),
        _ => Err(wrong_type(definition, method, "number")),
    }
}

fn apply_arithmetic(method: &str, base: f64, operand: f64) -> Result<f64, EvaluationError> {
    Ok(match method {
        "add" => base + operand,
        "subtract" => base - operand,
        "multiply" => base * operand,
        _ => {
            if operand == 0.0 {
                return Err(EvaluationError::new("Cannot divide by zero"));
            }
            base / operand
        }
    })
}

fn list_options<'a>(definition: &'a Attribute, method: &str) -> Result<&'a [String], EvaluationError> {
    if definition.attribute_type != AttributeType::List {
        return Err(wrong_type(definition, method, "list"));
    }
    if definition.options.is_empty() {
        return Err(EvaluationError::new(format!(
            "Attribute '{}' has no options defined",
            definition.title
        )));
    }
    Ok(&definition.options)
}

/// Check a value against the attribute's declared type.
fn coerce_for(definition: &Attribute, value: &Value) -> Result<AttributeValue, EvaluationError> {
    let mismatch = || {
        EvaluationError::new(format!(
            "Attribute '{}' expects a {} value, got {}",
            definition.title,
            definition.attribute_type,
            value.type_name()
        ))
    };
    match (definition.attribute_type, value) {
        (AttributeType::Number, Value::Number(n)) => Ok(AttributeValue::Number(*n)),
        (AttributeType::Boolean, Value::Boolean(b)) => Ok(AttributeValue::Boolean(*b)),
        (AttributeType::String, Value::String(s)) => Ok(AttributeValue::Text(s.clone())),
        (AttributeType::List, Value::String(s)) => {
            if definition.options.is_empty() || definition.options.contains(s) {
                Ok(AttributeValue::Text(s.clone()))
            } else {
                Err(EvaluationError::new(format!(
                    "'{}' is not an option of attribute '{}'",
                    s, definition.title
                )))
            }
        }
        _ => Err(mismatch()),
    }
}

fn missing_bound(definition: &Attribute, bound: &str) -> EvaluationError {
    EvaluationError::new(format!(
        "Attribute '{}' has no {} value defined",
        definition.title, bound
    ))
}

fn wrong_type(definition: &Attribute, method: &str, expected: &str) -> EvaluationError {
    EvaluationError::new(format!(
        "Cannot call {}() on {} attribute '{}': expected a {} attribute",
        method, definition.attribute_type, definition.title, expected
    ))
}
