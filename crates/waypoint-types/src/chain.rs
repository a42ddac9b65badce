//! Step signatures and chains.
//!
//! A `StepSignature` is a step name plus its bound arguments. A `Chain` is an
//! ordered list of signatures where each step's output becomes the next
//! step's input. Both serialize to the persisted remaining-chain format:
//!
//! ```json
//! [{"step_name": "mult", "args": [4], "kwargs": {}}, ...]
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Reserved step name of the synthetic checkpoint marker.
pub const CHECKPOINT_STEP: &str = "waypoint.checkpoint";

/// Keyword argument holding the pause-predicate signature on a marker.
pub const PREDICATE_KWARG: &str = "predicate";

/// Keyword argument holding the pause-handler signature on a marker.
pub const HANDLER_KWARG: &str = "handler";

// ---------------------------------------------------------------------------
// StepSignature
// ---------------------------------------------------------------------------

/// A named unit of work plus its bound positional and keyword arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepSignature {
    pub step_name: String,
    #[serde(default)]
    pub args: Vec<Value>,
    #[serde(default)]
    pub kwargs: Map<String, Value>,
}

impl StepSignature {
    pub fn new(step_name: impl Into<String>) -> Self {
        Self {
            step_name: step_name.into(),
            args: Vec::new(),
            kwargs: Map::new(),
        }
    }

    /// Bind an additional positional argument.
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }

    /// Bind a keyword argument.
    pub fn kwarg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.kwargs.insert(key.into(), value.into());
        self
    }

    /// Build a checkpoint marker carrying the given predicate and handler.
    pub fn checkpoint(predicate: &StepSignature, handler: &StepSignature) -> Self {
        Self::new(CHECKPOINT_STEP)
            .kwarg(PREDICATE_KWARG, predicate.to_value())
            .kwarg(HANDLER_KWARG, handler.to_value())
    }

    pub fn is_checkpoint(&self) -> bool {
        self.step_name == CHECKPOINT_STEP
    }

    /// JSON form of this signature.
    pub fn to_value(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("step_name".to_string(), Value::String(self.step_name.clone()));
        obj.insert("args".to_string(), Value::Array(self.args.clone()));
        obj.insert("kwargs".to_string(), Value::Object(self.kwargs.clone()));
        Value::Object(obj)
    }

    /// Parse a signature from its JSON form.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}

// ---------------------------------------------------------------------------
// Chain
// ---------------------------------------------------------------------------

/// An ordered sequence of steps. Building a chain never executes it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Chain {
    steps: Vec<StepSignature>,
}

impl Chain {
    pub fn new(steps: Vec<StepSignature>) -> Self {
        Self { steps }
    }

    /// Append a step (the `a | b` composition).
    pub fn then(mut self, step: StepSignature) -> Self {
        self.steps.push(step);
        self
    }

    pub fn steps(&self) -> &[StepSignature] {
        &self.steps
    }

    pub fn into_steps(self) -> Vec<StepSignature> {
        self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// The not-yet-executed remainder after position `index`.
    pub fn suffix_after(&self, index: usize) -> Chain {
        Chain {
            steps: self.steps.iter().skip(index + 1).cloned().collect(),
        }
    }

    pub fn has_checkpoints(&self) -> bool {
        self.steps.iter().any(StepSignature::is_checkpoint)
    }

    pub fn checkpoint_count(&self) -> usize {
        self.steps.iter().filter(|s| s.is_checkpoint()).count()
    }

    /// The chain with every checkpoint marker removed.
    pub fn without_checkpoints(&self) -> Chain {
        Chain {
            steps: self
                .steps
                .iter()
                .filter(|s| !s.is_checkpoint())
                .cloned()
                .collect(),
        }
    }

    /// Step names in order, markers included.
    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.step_name.as_str()).collect()
    }
}

impl FromIterator<StepSignature> for Chain {
    fn from_iter<I: IntoIterator<Item = StepSignature>>(iter: I) -> Self {
        Chain {
            steps: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Chain {
    type Item = StepSignature;
    type IntoIter = std::vec::IntoIter<StepSignature>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.into_iter()
    }
}
