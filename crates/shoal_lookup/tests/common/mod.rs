//! Shared helpers for integration tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use shoal_lookup::{PageSlice, RemoteFetcher};

/// One cost row as the remote returns it, most recent first per sku.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CostRow {
    pub sku: String,
    pub unit_cost: u32,
}

/// Deterministic sku naming used across the tests.
pub fn sku(idx: usize) -> String {
    format!("sku_{idx:05}")
}

/// Deterministic unit cost for a generated sku.
pub fn cost_of(idx: usize) -> u32 {
    100 + idx as u32
}

/// Generate `count` distinct skus.
pub fn skus(count: usize) -> Vec<String> {
    (0..count).map(sku).collect()
}

/// Generate `count` rows in server order, one per sku.
pub fn rows(count: usize) -> Vec<CostRow> {
    (0..count)
        .map(|idx| CostRow {
            sku: sku(idx),
            unit_cost: cost_of(idx),
        })
        .collect()
}

/// In-memory remote with scripted failures and latency.
///
/// Chunk requests answer from a sku -> cost catalog; page requests slice a
/// fixed row list and report its length (or an overridden value) as the
/// total. Failures and delays are keyed by a contained sku (chunks) or by
/// offset (pages) so scripting stays deterministic whatever the completion
/// order.
pub struct ScriptedRemote {
    calls: AtomicUsize,
    offsets_seen: Mutex<Vec<u64>>,
    catalog: HashMap<String, u32>,
    rows: Vec<CostRow>,
    total: u64,
    fail_chunks_containing: Vec<String>,
    fail_offsets: Vec<u64>,
    delay_chunks_containing: Vec<(String, Duration)>,
    delay_offsets: Vec<(u64, Duration)>,
}

impl ScriptedRemote {
    /// Remote answering chunk lookups for `count` generated skus.
    pub fn with_catalog(count: usize) -> Self {
        let catalog = (0..count).map(|idx| (sku(idx), cost_of(idx))).collect();
        Self {
            calls: AtomicUsize::new(0),
            offsets_seen: Mutex::new(Vec::new()),
            catalog,
            rows: Vec::new(),
            total: 0,
            fail_chunks_containing: Vec::new(),
            fail_offsets: Vec::new(),
            delay_chunks_containing: Vec::new(),
            delay_offsets: Vec::new(),
        }
    }

    /// Remote answering page lookups from a fixed row list.
    pub fn with_rows(rows: Vec<CostRow>) -> Self {
        let total = rows.len() as u64;
        Self {
            calls: AtomicUsize::new(0),
            offsets_seen: Mutex::new(Vec::new()),
            catalog: HashMap::new(),
            rows,
            total,
            fail_chunks_containing: Vec::new(),
            fail_offsets: Vec::new(),
            delay_chunks_containing: Vec::new(),
            delay_offsets: Vec::new(),
        }
    }

    /// Override the server-reported total.
    pub fn reporting_total(mut self, total: u64) -> Self {
        self.total = total;
        self
    }

    /// Fail any chunk request containing `key`.
    pub fn fail_chunk_containing(mut self, key: &str) -> Self {
        self.fail_chunks_containing.push(key.to_string());
        self
    }

    /// Fail the page request at `offset`.
    pub fn fail_offset(mut self, offset: u64) -> Self {
        self.fail_offsets.push(offset);
        self
    }

    /// Delay any chunk request containing `key`.
    pub fn delay_chunk_containing(mut self, key: &str, delay: Duration) -> Self {
        self.delay_chunks_containing.push((key.to_string(), delay));
        self
    }

    /// Delay the page request at `offset`.
    pub fn delay_offset(mut self, offset: u64, delay: Duration) -> Self {
        self.delay_offsets.push((offset, delay));
        self
    }

    /// Number of fetch calls issued so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Offsets requested so far, in arrival order.
    pub fn offsets_seen(&self) -> Vec<u64> {
        self.offsets_seen.lock().expect("offsets lock").clone()
    }
}

#[async_trait]
impl RemoteFetcher for ScriptedRemote {
    type Key = String;
    type Record = CostRow;
    type Context = String;

    fn merge_key(record: &CostRow) -> String {
        record.sku.clone()
    }

    async fn fetch_chunk(&self, keys: &[String], _ctx: &String) -> anyhow::Result<Vec<CostRow>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        for (key, delay) in &self.delay_chunks_containing {
            if keys.iter().any(|k| k == key) {
                tokio::time::sleep(*delay).await;
            }
        }
        for key in &self.fail_chunks_containing {
            if keys.iter().any(|k| k == key) {
                anyhow::bail!("injected failure for chunk containing {key}");
            }
        }
        Ok(keys
            .iter()
            .filter_map(|k| {
                self.catalog.get(k).map(|cost| CostRow {
                    sku: k.clone(),
                    unit_cost: *cost,
                })
            })
            .collect())
    }

    async fn fetch_page(
        &self,
        offset: u64,
        size: u64,
        _ctx: &String,
    ) -> anyhow::Result<PageSlice<CostRow>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.offsets_seen.lock().expect("offsets lock").push(offset);
        for (delayed, delay) in &self.delay_offsets {
            if *delayed == offset {
                tokio::time::sleep(*delay).await;
            }
        }
        if self.fail_offsets.contains(&offset) {
            anyhow::bail!("injected failure for page at offset {offset}");
        }
        let start = (offset as usize).min(self.rows.len());
        let end = (start + size as usize).min(self.rows.len());
        Ok(PageSlice {
            records: self.rows[start..end].to_vec(),
            total: self.total,
        })
    }
}
