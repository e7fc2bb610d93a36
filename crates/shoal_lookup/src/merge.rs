//! Deterministic fold of settled page outcomes into a single aggregate.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::hash::Hash;

use crate::dispatch::PageOutcome;

/// One failed page, identified by its plan index.
#[derive(Debug)]
pub struct PageFailure {
    pub page: usize,
    pub cause: anyhow::Error,
}

/// Output of the merge step: the deduplicated aggregate plus the failures
/// carried forward for the policy step.
#[derive(Debug)]
pub struct MergedPages<K, R> {
    pub aggregate: HashMap<K, R>,
    pub failures: Vec<PageFailure>,
}

/// Fold outcomes in plan-index order into a key-to-record aggregate.
///
/// Within and across pages the first record seen for a key wins; later
/// duplicates are ignored, not overwritten. When pages can overlap (cost
/// history rows ordered by descending date) this keeps the most recent row
/// authoritative.
pub fn merge<K, R, KF>(outcomes: Vec<PageOutcome<R>>, key_of: KF) -> MergedPages<K, R>
where
    K: Eq + Hash,
    KF: Fn(&R) -> K,
{
    let mut aggregate = HashMap::new();
    let mut failures = Vec::new();
    for (page, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            PageOutcome::Success { records } => {
                for record in records {
                    if let Entry::Vacant(slot) = aggregate.entry(key_of(&record)) {
                        slot.insert(record);
                    }
                }
            }
            PageOutcome::Failure { cause } => failures.push(PageFailure { page, cause }),
        }
    }
    MergedPages {
        aggregate,
        failures,
    }
}
