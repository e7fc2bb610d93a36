//! Orchestration: plan, dispatch, merge, apply policy.
//!
//! Both entry points are a single-pass pipeline. The only `Err` they return
//! is an invalid size, raised before any request; page failures travel
//! inside the result, shaped by the selected policy.

use crate::dispatch::{self, PageOutcome};
use crate::fetcher::RemoteFetcher;
use crate::merge;
use crate::partition::{self, ConfigError};
use crate::policy::{BulkLookupResult, FailurePolicy};

/// Look up `keys` in concurrent chunks of at most `chunk_size`.
///
/// Empty input short-circuits to an empty, complete result without
/// contacting the fetcher.
pub async fn run_chunked<F: RemoteFetcher>(
    fetcher: &F,
    keys: &[F::Key],
    chunk_size: usize,
    policy: FailurePolicy,
    ctx: &F::Context,
) -> anyhow::Result<BulkLookupResult<F::Key, F::Record>> {
    let plan = partition::plan_chunked(keys, chunk_size)?;
    if plan.is_empty() {
        return Ok(BulkLookupResult::empty());
    }
    let outcomes = dispatch::dispatch(&plan, fetcher, ctx).await;
    let merged = merge::merge(outcomes, F::merge_key);
    Ok(policy.apply(merged))
}

/// Drain an unknown-sized result set in concurrent pages of `page_size`.
///
/// The server-reported total is only known from the first response, so page
/// zero is fetched on its own before the rest of the plan exists; the
/// remaining pages are then dispatched concurrently and merged behind it.
pub async fn run_paged<F: RemoteFetcher>(
    fetcher: &F,
    page_size: u64,
    policy: FailurePolicy,
    ctx: &F::Context,
) -> anyhow::Result<BulkLookupResult<F::Key, F::Record>> {
    if page_size == 0 {
        return Err(ConfigError::positive("page_size", 0).into());
    }

    let mut outcomes = Vec::new();
    match fetcher.fetch_page(0, page_size, ctx).await {
        Ok(slice) => {
            let fetched = slice.records.len() as u64;
            // An empty first page means the server has nothing more to give,
            // whatever total it reported.
            let rest = if slice.records.is_empty() {
                Vec::new()
            } else {
                partition::plan_offset::<F::Key>(slice.total, page_size, fetched)?
            };
            outcomes.push(PageOutcome::Success {
                records: slice.records,
            });
            if !rest.is_empty() {
                outcomes.extend(dispatch::dispatch(&rest, fetcher, ctx).await);
            }
        }
        Err(cause) => {
            // Without a total there is nothing further to plan; the run
            // degenerates to this one failure and the policy shapes it.
            tracing::debug!(error = ?cause, "first page fetch failed");
            outcomes.push(PageOutcome::Failure { cause });
        }
    }

    let merged = merge::merge(outcomes, F::merge_key);
    Ok(policy.apply(merged))
}
