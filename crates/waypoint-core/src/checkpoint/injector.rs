//! Structural checkpoint injection.

use waypoint_types::chain::{Chain, StepSignature};

use crate::chain::ChainError;

/// Insert a checkpoint marker after every `interval`-th original step.
///
/// Markers go after original positions `interval-1, 2*interval-1, ...` and
/// never after the final step, so a chain of length `L` receives
/// `(L - 1) / interval` markers. Markers already present in `chain` are
/// stripped first, which makes re-injecting a resumed chain safe.
///
/// Nothing is executed; the result is a new chain value.
pub fn inject(
    chain: &Chain,
    predicate: &StepSignature,
    handler: &StepSignature,
    interval: usize,
) -> Result<Chain, ChainError> {
    if interval == 0 {
        return Err(ChainError::ZeroInterval);
    }

    let original = chain.without_checkpoints().into_steps();
    let last = original.len().saturating_sub(1);
    let marker = StepSignature::checkpoint(predicate, handler);

    let mut steps = Vec::with_capacity(original.len() + original.len() / interval);
    for (index, step) in original.into_iter().enumerate() {
        steps.push(step);
        if index < last && (index + 1) % interval == 0 {
            steps.push(marker.clone());
        }
    }

    Ok(Chain::new(steps))
}
