//! Steps: named units of work the engine composes into chains.
//!
//! - `Step` -- the trait every step implements (RPITIT, Rust 2024 edition)
//! - `BoxStep` -- object-safe wrapper used by the registry for dynamic dispatch
//! - `StepContext` -- explicit execution context handed to every step
//! - `StepRegistry` -- name -> step lookup used to resolve signatures
//! - `arith` -- small arithmetic steps used by the demo operation

pub mod arith;
pub mod context;
pub mod registry;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

pub use context::StepContext;
pub use registry::StepRegistry;

// ---------------------------------------------------------------------------
// StepCall
// ---------------------------------------------------------------------------

/// The arguments a step is invoked with: the running value plus the bound
/// positional and keyword arguments of its signature.
#[derive(Debug, Clone, Default)]
pub struct StepCall {
    pub input: Value,
    pub args: Vec<Value>,
    pub kwargs: Map<String, Value>,
}

impl StepCall {
    pub fn new(input: Value, args: Vec<Value>, kwargs: Map<String, Value>) -> Self {
        Self { input, args, kwargs }
    }

    /// Deserialize the running value.
    pub fn input_as<T: DeserializeOwned>(&self) -> Result<T, StepError> {
        serde_json::from_value(self.input.clone())
            .map_err(|e| StepError::InvalidInput(format!("running value: {e}")))
    }

    /// Deserialize positional argument `index`.
    pub fn arg_as<T: DeserializeOwned>(&self, index: usize) -> Result<T, StepError> {
        let value = self
            .args
            .get(index)
            .ok_or_else(|| StepError::InvalidInput(format!("missing argument {index}")))?;
        serde_json::from_value(value.clone())
            .map_err(|e| StepError::InvalidInput(format!("argument {index}: {e}")))
    }

    /// Deserialize keyword argument `key`.
    pub fn kwarg_as<T: DeserializeOwned>(&self, key: &str) -> Result<T, StepError> {
        let value = self
            .kwargs
            .get(key)
            .ok_or_else(|| StepError::InvalidInput(format!("missing keyword argument '{key}'")))?;
        serde_json::from_value(value.clone())
            .map_err(|e| StepError::InvalidInput(format!("keyword argument '{key}': {e}")))
    }
}

// ---------------------------------------------------------------------------
// StepOutput
// ---------------------------------------------------------------------------

/// Output from a step execution.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutput {
    /// Pass this value to the next step of the chain.
    Value(Value),
    /// Discard the rest of the enclosing chain; nothing further runs.
    Halt,
}

impl StepOutput {
    pub fn into_value(self) -> Option<Value> {
        match self {
            StepOutput::Value(v) => Some(v),
            StepOutput::Halt => None,
        }
    }
}

// ---------------------------------------------------------------------------
// StepError
// ---------------------------------------------------------------------------

/// Errors that can occur during step execution.
#[derive(Debug, thiserror::Error)]
pub enum StepError {
    /// The running value or a bound argument has the wrong shape.
    #[error("invalid step input: {0}")]
    InvalidInput(String),

    /// A signature names a step that is not registered.
    #[error("unknown step '{0}'")]
    UnknownStep(String),

    /// Durable state could not be read or written.
    #[error("persistence failed: {0}")]
    Persistence(String),

    /// The step could not hand follow-up work to the substrate.
    #[error("dispatch failed: {0}")]
    Dispatch(String),

    /// Step execution failed.
    #[error("step execution failed: {0}")]
    ExecutionFailed(String),
}

// ---------------------------------------------------------------------------
// Step trait
// ---------------------------------------------------------------------------

/// A named unit of work.
///
/// Steps never run other steps of their chain themselves; the substrate
/// threads the returned value into the next step.
pub trait Step: Send + Sync {
    /// Registry name of this step.
    fn name(&self) -> &str;

    /// Execute the step.
    fn run(
        &self,
        call: StepCall,
        ctx: &StepContext,
    ) -> impl Future<Output = Result<StepOutput, StepError>> + Send;
}

/// Object-safe version of [`Step`] with boxed futures.
///
/// A blanket implementation is provided for all types implementing `Step`.
pub trait StepDyn: Send + Sync {
    fn name(&self) -> &str;

    fn run_boxed<'a>(
        &'a self,
        call: StepCall,
        ctx: &'a StepContext,
    ) -> Pin<Box<dyn Future<Output = Result<StepOutput, StepError>> + Send + 'a>>;
}

impl<T: Step> StepDyn for T {
    fn name(&self) -> &str {
        Step::name(self)
    }

    fn run_boxed<'a>(
        &'a self,
        call: StepCall,
        ctx: &'a StepContext,
    ) -> Pin<Box<dyn Future<Output = Result<StepOutput, StepError>> + Send + 'a>> {
        Box::pin(self.run(call, ctx))
    }
}

/// Type-erased step, cheap to clone.
#[derive(Clone)]
pub struct BoxStep {
    inner: Arc<dyn StepDyn>,
}

impl BoxStep {
    pub fn new<T: Step + 'static>(step: T) -> Self {
        Self {
            inner: Arc::new(step),
        }
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub async fn run(&self, call: StepCall, ctx: &StepContext) -> Result<StepOutput, StepError> {
        self.inner.run_boxed(call, ctx).await
    }
}

impl std::fmt::Debug for BoxStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxStep").field("name", &self.name()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn call_accessors_report_missing_and_mistyped_arguments() {
        let call = StepCall::new(json!(3), vec![json!("x")], Map::new());
        assert_eq!(call.input_as::<i64>().unwrap(), 3);
        assert_eq!(call.arg_as::<String>(0).unwrap(), "x");

        let err = call.arg_as::<String>(1).unwrap_err();
        assert!(err.to_string().contains("missing argument 1"));

        let err = call.arg_as::<i64>(0).unwrap_err();
        assert!(matches!(err, StepError::InvalidInput(_)));

        let err = call.kwarg_as::<String>("group_by").unwrap_err();
        assert!(err.to_string().contains("group_by"));
    }

    #[test]
    fn step_output_into_value() {
        assert_eq!(StepOutput::Value(json!(1)).into_value(), Some(json!(1)));
        assert_eq!(StepOutput::Halt.into_value(), None);
    }

    #[test]
    fn step_error_display() {
        let err = StepError::UnknownStep("frobnicate".to_string());
        assert_eq!(err.to_string(), "unknown step 'frobnicate'");

        let err = StepError::Persistence("disk full".to_string());
        assert!(err.to_string().contains("disk full"));
    }
}
