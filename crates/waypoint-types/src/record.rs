//! Records produced by the streaming reader.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One parsed record: field name -> raw field text.
pub type Record = BTreeMap<String, String>;

/// Value threaded between the streaming steps.
///
/// On the wire this is either a 3-element list `[schema, next_offset, records]`
/// while input remains, or a 1-element list `[records]` once the end of the
/// input has been reached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReadProgress {
    Pending(Vec<String>, u64, Vec<Record>),
    Finished((Vec<Record>,)),
}

impl ReadProgress {
    pub fn pending(schema: Vec<String>, next_offset: u64, records: Vec<Record>) -> Self {
        ReadProgress::Pending(schema, next_offset, records)
    }

    pub fn finished(records: Vec<Record>) -> Self {
        ReadProgress::Finished((records,))
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, ReadProgress::Finished(_))
    }

    /// Records accumulated so far.
    pub fn records(&self) -> &[Record] {
        match self {
            ReadProgress::Pending(_, _, records) => records,
            ReadProgress::Finished((records,)) => records,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(pairs: &[(&str, &str)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn pending_is_a_three_element_list() {
        let progress = ReadProgress::pending(
            vec!["name".to_string()],
            12,
            vec![record(&[("name", "ada")])],
        );
        let json = serde_json::to_value(&progress).unwrap();
        assert_eq!(json, json!([["name"], 12, [{"name": "ada"}]]));
        assert_eq!(serde_json::from_value::<ReadProgress>(json).unwrap(), progress);
    }

    #[test]
    fn finished_is_a_one_element_list() {
        let progress = ReadProgress::finished(vec![record(&[("name", "ada")])]);
        let json = serde_json::to_value(&progress).unwrap();
        assert_eq!(json, json!([[{"name": "ada"}]]));

        let parsed: ReadProgress = serde_json::from_value(json).unwrap();
        assert!(parsed.is_finished());
        assert_eq!(parsed.records().len(), 1);
    }
}
