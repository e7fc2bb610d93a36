//! Partial-failure policy applied after the merge step.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::merge::{MergedPages, PageFailure};

/// Whether a single page failure invalidates the whole aggregate or only
/// reduces its completeness.
///
/// Financial aggregation wants `Strict` (all-or-nothing); a permission list
/// degrading gracefully wants `Lenient` rather than blocking login.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    Strict,
    Lenient,
}

/// Final result of one bulk lookup run. `complete` is true iff no page failed.
#[derive(Debug)]
pub struct BulkLookupResult<K, R> {
    pub aggregate: HashMap<K, R>,
    pub failed_pages: Vec<PageFailure>,
    pub complete: bool,
}

impl<K, R> BulkLookupResult<K, R> {
    /// The empty, complete result returned without contacting the remote.
    pub fn empty() -> Self {
        Self {
            aggregate: HashMap::new(),
            failed_pages: Vec::new(),
            complete: true,
        }
    }
}

impl FailurePolicy {
    /// Shape the merged pages into the final result.
    ///
    /// `Strict` discards every merged entry as soon as any page failed;
    /// `Lenient` always exposes the merged successes and reports the
    /// failures alongside for the caller to act on.
    pub fn apply<K, R>(self, merged: MergedPages<K, R>) -> BulkLookupResult<K, R> {
        let MergedPages {
            aggregate,
            failures,
        } = merged;
        if self == Self::Strict && !failures.is_empty() {
            tracing::warn!(
                failed_pages = failures.len(),
                discarded = aggregate.len(),
                "strict policy discarding partial aggregate"
            );
            return BulkLookupResult {
                aggregate: HashMap::new(),
                failed_pages: failures,
                complete: false,
            };
        }
        let complete = failures.is_empty();
        BulkLookupResult {
            aggregate,
            failed_pages: failures,
            complete,
        }
    }
}
