use serde_json::Value;
use waypoint_types::chain::{Chain, HANDLER_KWARG, PREDICATE_KWARG, StepSignature};

use super::ChainError;
use crate::step::StepRegistry;

/// The remaining-chain wire form: an ordered JSON list of signatures.
pub fn serialize(chain: &Chain) -> Value {
    Value::Array(chain.steps().iter().map(StepSignature::to_value).collect())
}

/// Rebuild an invokable chain from its wire form.
///
/// Every step name must be registered. Checkpoint markers must carry a
/// predicate and a handler that are themselves registered steps.
pub fn deserialize(value: Value, registry: &StepRegistry) -> Result<Chain, ChainError> {
    let Value::Array(entries) = value else {
        return Err(ChainError::Malformed(format!(
            "expected a list of steps, got {}",
            kind(&value)
        )));
    };

    let mut steps = Vec::with_capacity(entries.len());
    for (index, entry) in entries.into_iter().enumerate() {
        let signature = StepSignature::from_value(entry)
            .map_err(|e| ChainError::Malformed(format!("entry {index}: {e}")))?;
        resolve(&signature, registry)?;
        if signature.is_checkpoint() {
            for key in [PREDICATE_KWARG, HANDLER_KWARG] {
                let nested = signature.kwargs.get(key).cloned().ok_or_else(|| {
                    ChainError::Malformed(format!("checkpoint at entry {index} has no {key}"))
                })?;
                let nested = StepSignature::from_value(nested).map_err(|e| {
                    ChainError::Malformed(format!("checkpoint {key} at entry {index}: {e}"))
                })?;
                resolve(&nested, registry)?;
            }
        }
        steps.push(signature);
    }

    Ok(Chain::new(steps))
}

/// Serialize straight to JSON text, as written to payload files.
pub fn to_json_string(chain: &Chain) -> Result<String, ChainError> {
    serde_json::to_string_pretty(&serialize(chain)).map_err(|e| ChainError::Malformed(e.to_string()))
}

pub fn from_json_str(text: &str, registry: &StepRegistry) -> Result<Chain, ChainError> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| ChainError::Malformed(e.to_string()))?;
    deserialize(value, registry)
}

fn resolve(signature: &StepSignature, registry: &StepRegistry) -> Result<(), ChainError> {
    if registry.contains(&signature.step_name) {
        Ok(())
    } else {
        Err(ChainError::UnknownStep(signature.step_name.clone()))
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
