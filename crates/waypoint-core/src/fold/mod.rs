//! Chunked fold aggregation.
//!
//! A materialized record list is split into near-equal slices and turned
//! into a chain of one `tally` step per slice, each taking the running
//! accumulator and returning the updated one, followed by `completion`. The
//! accumulator is seeded once from the whole input's key space so no slice
//! ever discovers a new key.

pub mod steps;

use std::collections::BTreeMap;

use waypoint_types::chain::Chain;
use waypoint_types::operation::OperationId;
use waypoint_types::record::Record;

use crate::chain::ChainError;
use crate::chunk::chunks_of;
use crate::operation::steps::{checkpointed, completion};

pub use steps::{START_PARSING_STEP, StartParsingStep, TALLY_STEP, TallyStep, start_parsing};

/// Per-group category counts: `{group: {category: count}}`.
pub type Tally = BTreeMap<String, BTreeMap<String, u64>>;

/// Which fields a tally groups and counts by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TallySpec {
    pub group_by: String,
    pub count_by: String,
}

impl TallySpec {
    pub fn new(group_by: impl Into<String>, count_by: impl Into<String>) -> Self {
        Self {
            group_by: group_by.into(),
            count_by: count_by.into(),
        }
    }

    fn keys<'a>(&self, record: &'a Record) -> (&'a str, &'a str) {
        let field = |name: &str| record.get(name).map(String::as_str).unwrap_or_default();
        (field(&self.group_by), field(&self.count_by))
    }

    /// Every group seen in `records` mapped to every category seen, all zero.
    pub fn seed(&self, records: &[Record]) -> Tally {
        let mut groups = Vec::new();
        let mut categories = BTreeMap::new();
        for record in records {
            let (group, category) = self.keys(record);
            groups.push(group);
            categories.insert(category.to_string(), 0);
        }
        groups
            .into_iter()
            .map(|group| (group.to_string(), categories.clone()))
            .collect()
    }

    /// Count `slice` into `acc`.
    pub fn apply(&self, mut acc: Tally, slice: &[Record]) -> Tally {
        for record in slice {
            let (group, category) = self.keys(record);
            *acc.entry(group.to_string())
                .or_default()
                .entry(category.to_string())
                .or_default() += 1;
        }
        acc
    }

    /// The whole-input fold the chunked chain must agree with.
    pub fn fold(&self, records: &[Record]) -> Tally {
        self.apply(self.seed(records), records)
    }
}

/// `tally(slice_1) | ... | tally(slice_n) | completion(id)`, checkpointed
/// every `interval` steps.
pub fn build_fold_chain(
    records: &[Record],
    chunk_amount: usize,
    spec: &TallySpec,
    id: OperationId,
    interval: usize,
) -> Result<Chain, ChainError> {
    let chain: Chain = chunks_of(records, chunk_amount)
        .into_iter()
        .map(|slice| steps::tally(&slice, spec))
        .chain(std::iter::once(Ok(completion(id))))
        .collect::<Result<_, _>>()?;
    checkpointed(&chain, id, interval)
}
