//! Settle-all concurrent dispatch of a page plan.
//!
//! Every planned request is issued at once and every outcome is collected;
//! a slow or failed page never blocks or cancels its siblings.

use futures_util::stream::{FuturesUnordered, StreamExt};

use crate::fetcher::RemoteFetcher;
use crate::partition::PageDescriptor;

/// The settled result of one page request. Produced once per descriptor;
/// a failure is terminal for that page within the run.
#[derive(Debug)]
pub enum PageOutcome<R> {
    Success { records: Vec<R> },
    Failure { cause: anyhow::Error },
}

/// Issue every descriptor in `plan` concurrently and collect one outcome per
/// descriptor, index-aligned with the plan regardless of completion order.
pub async fn dispatch<F: RemoteFetcher>(
    plan: &[PageDescriptor<F::Key>],
    fetcher: &F,
    ctx: &F::Context,
) -> Vec<PageOutcome<F::Record>> {
    let mut futs = FuturesUnordered::new();
    for (page, descriptor) in plan.iter().enumerate() {
        futs.push(async move {
            let result = match descriptor {
                PageDescriptor::Chunk { keys } => fetcher.fetch_chunk(keys, ctx).await,
                PageDescriptor::Page { offset, size } => fetcher
                    .fetch_page(*offset, *size, ctx)
                    .await
                    .map(|slice| slice.records),
            };
            (page, result)
        });
    }

    // Completion order is arbitrary; re-index into plan-order slots so the
    // merge step stays deterministic.
    let mut slots: Vec<Option<PageOutcome<F::Record>>> = Vec::new();
    slots.resize_with(plan.len(), || None);
    while let Some((page, result)) = futs.next().await {
        let outcome = match result {
            Ok(records) => PageOutcome::Success { records },
            Err(cause) => {
                tracing::debug!(page, error = ?cause, "page fetch failed");
                PageOutcome::Failure { cause }
            }
        };
        slots[page] = Some(outcome);
    }

    slots.into_iter().flatten().collect()
}
