//! Key-space partitioning: split a flat key collection into bounded chunks,
//! or derive the offset pages still needed once the total is known.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One planned remote request. Immutable once created; exactly one descriptor
/// maps to exactly one fetcher invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageDescriptor<K> {
    /// A bounded slice of the input key collection (chunked strategy).
    Chunk { keys: Vec<K> },
    /// A bounded slice of a server-side result set (offset strategy).
    Page { offset: u64, size: u64 },
}

/// Invalid chunk/page size, raised before any request is dispatched.
#[derive(Debug, Clone)]
pub struct ConfigError {
    parameter: &'static str,
    value: u64,
}

impl ConfigError {
    pub(crate) fn positive(parameter: &'static str, value: u64) -> Self {
        Self { parameter, value }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} must be a positive integer, got {}",
            self.parameter, self.value
        )
    }
}

impl std::error::Error for ConfigError {}

/// Split `keys` into consecutive chunks of at most `chunk_size`, preserving
/// input order. The last chunk may be short; empty input yields an empty plan.
pub fn plan_chunked<K: Clone>(
    keys: &[K],
    chunk_size: usize,
) -> Result<Vec<PageDescriptor<K>>, ConfigError> {
    if chunk_size == 0 {
        return Err(ConfigError::positive("chunk_size", 0));
    }
    Ok(keys
        .chunks(chunk_size)
        .map(|chunk| PageDescriptor::Chunk {
            keys: chunk.to_vec(),
        })
        .collect())
}

/// Plan the offset pages still needed to cover `known_total` records when
/// `already_fetched` of them are in hand. Offsets start at `already_fetched`
/// and advance by `page_size`; a fully covered total yields an empty plan.
pub fn plan_offset<K>(
    known_total: u64,
    page_size: u64,
    already_fetched: u64,
) -> Result<Vec<PageDescriptor<K>>, ConfigError> {
    if page_size == 0 {
        return Err(ConfigError::positive("page_size", 0));
    }
    if known_total <= already_fetched {
        return Ok(Vec::new());
    }
    let remaining = known_total - already_fetched;
    let pages = remaining.div_ceil(page_size);
    let mut plan = Vec::with_capacity(pages as usize);
    for idx in 0..pages {
        plan.push(PageDescriptor::Page {
            offset: already_fetched + idx * page_size,
            size: page_size,
        });
    }
    Ok(plan)
}
