//! Streaming continuation over large delimited inputs.
//!
//! ```text
//! read_start(src)              -> [schema, offset, records]
//! read_next(progress, src)     -> [schema, offset, records] | [records]
//! read_finish_continue(progress, callback, src, op)
//!     pending  -> submit checkpointed (read_next(src) | read_finish_continue(..)) seeded with progress
//!     finished -> submit callback seeded with the final records
//! ```
//!
//! Each resubmitted pair is its own chain, so every iteration is an
//! independently checkpointable unit and no loop ever holds more than one
//! read window of input.

pub mod parser;
pub mod steps;

pub use steps::{
    READ_FINISH_CONTINUE_STEP, READ_NEXT_STEP, READ_START_STEP, ReadFinishContinueStep,
    ReadNextStep, ReadStartStep, read_finish_continue, read_next, read_start,
};
