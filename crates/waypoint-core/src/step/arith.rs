//! Arithmetic steps used by the demo operation (`add(1, 2) | mult(4)`).
//!
//! A null running value counts as the identity, so `add` can start a chain
//! that is invoked without an initial value.

use serde_json::{Number, Value};

use super::{Step, StepCall, StepContext, StepError, StepOutput};

/// Sums the running value and every bound argument.
pub struct AddStep;

/// Multiplies the running value by every bound argument.
pub struct MultStep;

impl Step for AddStep {
    fn name(&self) -> &str {
        "add"
    }

    async fn run(&self, call: StepCall, _ctx: &StepContext) -> Result<StepOutput, StepError> {
        combine(&call, 0, |a, b| a.checked_add(b), |a, b| a + b).map(StepOutput::Value)
    }
}

impl Step for MultStep {
    fn name(&self) -> &str {
        "mult"
    }

    async fn run(&self, call: StepCall, _ctx: &StepContext) -> Result<StepOutput, StepError> {
        combine(&call, 1, |a, b| a.checked_mul(b), |a, b| a * b).map(StepOutput::Value)
    }
}

#[derive(Clone, Copy)]
enum Num {
    Int(i64),
    Float(f64),
}

fn as_num(value: &Value, identity: i64) -> Result<Num, StepError> {
    match value {
        Value::Null => Ok(Num::Int(identity)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Ok(Num::Int(i)),
            None => n
                .as_f64()
                .map(Num::Float)
                .ok_or_else(|| StepError::InvalidInput(format!("unsupported number {n}"))),
        },
        other => Err(StepError::InvalidInput(format!("expected a number, got {other}"))),
    }
}

fn combine(
    call: &StepCall,
    identity: i64,
    int_op: impl Fn(i64, i64) -> Option<i64>,
    float_op: impl Fn(f64, f64) -> f64,
) -> Result<Value, StepError> {
    let mut acc = as_num(&call.input, identity)?;
    for arg in &call.args {
        acc = match (acc, as_num(arg, identity)?) {
            (Num::Int(a), Num::Int(b)) => Num::Int(
                int_op(a, b).ok_or_else(|| StepError::ExecutionFailed("integer overflow".into()))?,
            ),
            (Num::Int(a), Num::Float(b)) => Num::Float(float_op(a as f64, b)),
            (Num::Float(a), Num::Int(b)) => Num::Float(float_op(a, b as f64)),
            (Num::Float(a), Num::Float(b)) => Num::Float(float_op(a, b)),
        };
    }
    match acc {
        Num::Int(i) => Ok(Value::Number(i.into())),
        Num::Float(f) => Number::from_f64(f)
            .map(Value::Number)
            .ok_or_else(|| StepError::ExecutionFailed(format!("non-finite result {f}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::StepRegistry;
    use crate::substrate::Dispatcher;
    use serde_json::{json, Map};
    use std::sync::Arc;
    use uuid::Uuid;
    use waypoint_types::chain::Chain;
    use waypoint_types::config::EngineConfig;

    fn ctx() -> StepContext {
        let (dispatcher, _jobs) = Dispatcher::channel();
        StepContext::new(
            Uuid::nil(),
            0,
            Chain::default(),
            Arc::new(StepRegistry::new()),
            dispatcher,
            Arc::new(EngineConfig::default()),
        )
    }

    fn call(input: Value, args: Vec<Value>) -> StepCall {
        StepCall::new(input, args, Map::new())
    }

    #[tokio::test]
    async fn add_treats_null_input_as_zero() {
        let out = AddStep.run(call(Value::Null, vec![json!(1), json!(2)]), &ctx()).await.unwrap();
        assert_eq!(out, StepOutput::Value(json!(3)));
    }

    #[tokio::test]
    async fn mult_multiplies_running_value() {
        let out = MultStep.run(call(json!(3), vec![json!(4)]), &ctx()).await.unwrap();
        assert_eq!(out, StepOutput::Value(json!(12)));
    }

    #[tokio::test]
    async fn mixed_numbers_promote_to_float() {
        let out = AddStep.run(call(json!(1), vec![json!(0.5)]), &ctx()).await.unwrap();
        assert_eq!(out, StepOutput::Value(json!(1.5)));
    }

    #[tokio::test]
    async fn non_numeric_input_is_rejected() {
        let err = MultStep.run(call(json!("three"), vec![json!(4)]), &ctx()).await.unwrap_err();
        assert!(matches!(err, StepError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn overflow_fails_the_step() {
        let err = MultStep
            .run(call(json!(i64::MAX), vec![json!(2)]), &ctx())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("overflow"));
    }
}
