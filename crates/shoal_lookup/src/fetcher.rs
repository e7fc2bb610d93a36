//! Remote fetch capability consumed by the lookup engine.
//!
//! Transport concerns (base URLs, auth headers, serialization) live entirely
//! behind this trait; the engine only sees typed records and errors.

use std::hash::Hash;

use async_trait::async_trait;

/// One bounded slice of a server-side result set.
///
/// `total` is the server-reported total record count; the first page's value
/// seeds the plan for the remaining pages.
#[derive(Debug, Clone)]
pub struct PageSlice<R> {
    pub records: Vec<R>,
    pub total: u64,
}

/// Capability for fetching one bounded page or chunk from a remote service.
///
/// `Context` carries caller-supplied parameters opaque to the engine (a
/// facility id, a date filter); it is passed through untouched.
#[async_trait]
pub trait RemoteFetcher: Send + Sync + 'static {
    type Key: Clone + Eq + Hash + Send + Sync + 'static;
    type Record: Send + 'static;
    type Context: Send + Sync;

    /// Project the dominant merge key out of a record.
    fn merge_key(record: &Self::Record) -> Self::Key;

    /// Fetch the records for one chunk of keys.
    async fn fetch_chunk(
        &self,
        keys: &[Self::Key],
        ctx: &Self::Context,
    ) -> anyhow::Result<Vec<Self::Record>>;

    /// Fetch one offset-addressed page of an unknown-sized result set.
    async fn fetch_page(
        &self,
        offset: u64,
        size: u64,
        ctx: &Self::Context,
    ) -> anyhow::Result<PageSlice<Self::Record>>;
}
