//! Workload generator for exercising the bulk lookup engine.
//!
//! This binary drives chunked and paged lookups against an in-process
//! simulated remote with seeded latency and failure injection, and writes a
//! JSON report of each run for offline inspection.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use anyhow::Context;
use async_trait::async_trait;
use clap::{Parser, Subcommand, ValueEnum};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use shoal_lookup::{FailurePolicy, PageSlice, RemoteFetcher};

/// CLI entry point wrapper.
#[derive(Parser, Debug)]
#[command(name = "shoal-workload")]
struct Args {
    #[command(subcommand)]
    cmd: Command,
}

/// Top-level CLI subcommands.
#[derive(Subcommand, Debug)]
enum Command {
    Run(RunArgs),
}

/// Lookup strategy exercised by the workload.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
enum Mode {
    Chunked,
    Paged,
}

/// Partial-failure policy selection.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum Policy {
    Strict,
    Lenient,
}

impl From<Policy> for FailurePolicy {
    fn from(policy: Policy) -> Self {
        match policy {
            Policy::Strict => FailurePolicy::Strict,
            Policy::Lenient => FailurePolicy::Lenient,
        }
    }
}

/// CLI options for running the workload.
#[derive(Parser, Debug, Clone)]
struct RunArgs {
    /// Lookup strategy to exercise.
    #[arg(long, value_enum, default_value = "chunked")]
    mode: Mode,

    /// Partial-failure policy.
    #[arg(long, value_enum, default_value = "strict")]
    policy: Policy,

    /// Number of input keys (chunked mode).
    #[arg(long, default_value_t = 250)]
    keys: usize,

    /// Maximum keys per chunk request (chunked mode).
    #[arg(long, default_value_t = 100)]
    chunk_size: usize,

    /// Server-side result set size (paged mode).
    #[arg(long, default_value_t = 450)]
    total: u64,

    /// Records per page request (paged mode).
    #[arg(long, default_value_t = 200)]
    page_size: u64,

    /// Percent of page requests that fail.
    #[arg(long, default_value_t = 0)]
    fail_pct: u8,

    /// Lower bound for simulated per-page latency.
    #[arg(long, default_value = "2ms")]
    latency_min: humantime::Duration,

    /// Upper bound for simulated per-page latency.
    #[arg(long, default_value = "20ms")]
    latency_max: humantime::Duration,

    /// Number of lookup runs to perform.
    #[arg(long, default_value_t = 10)]
    iterations: usize,

    /// Random seed (0 picks a random seed).
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Facility identifier passed through to the remote untouched.
    #[arg(long, default_value = "FAC_MAIN")]
    facility_id: String,

    /// Write a JSON report to this path.
    #[arg(long, default_value = ".tmp/shoal/report.json")]
    out: PathBuf,
}

/// Configuration echo embedded in the report for reproducibility.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone)]
struct ReportMeta {
    mode: Mode,
    policy: String,
    keys: usize,
    chunk_size: usize,
    total: u64,
    page_size: u64,
    fail_pct: u8,
    latency_min_ms: u64,
    latency_max_ms: u64,
    iterations: usize,
    seed: u64,
    facility_id: String,
}

/// Outcome of one lookup run.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone)]
struct RunRecord {
    iteration: usize,
    aggregate_len: usize,
    failed_pages: Vec<usize>,
    complete: bool,
    elapsed_us: u64,
}

/// Full workload report.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone)]
struct Report {
    meta: ReportMeta,
    runs: Vec<RunRecord>,
}

/// Synthetic cost record served by the simulated remote.
#[derive(Debug, Clone)]
struct SimRow {
    sku: String,
    unit_cost: u32,
}

/// In-process remote with seeded latency and failure injection.
///
/// Latency and failure decisions are derived from the base seed mixed with
/// the page identity, so a given seed reproduces the same per-page behavior
/// whatever order the dispatcher's requests land in.
struct SimRemote {
    seed: u64,
    round: AtomicUsize,
    calls: AtomicUsize,
    total: u64,
    fail_pct: u8,
    latency_min: Duration,
    latency_max: Duration,
}

impl SimRemote {
    fn new(args: &RunArgs, seed: u64) -> Self {
        Self {
            seed,
            round: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
            total: args.total,
            fail_pct: args.fail_pct,
            latency_min: args.latency_min.into(),
            latency_max: args.latency_max.into(),
        }
    }

    /// Advance to the next lookup run so page identities re-roll.
    fn next_round(&self) {
        self.round.fetch_add(1, Ordering::SeqCst);
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Deterministic RNG for one page identity within the current round.
    fn page_rng(&self, identity: u64) -> SmallRng {
        let round = self.round.load(Ordering::SeqCst) as u64;
        let mixed = self
            .seed
            .wrapping_mul(0x9e3779b97f4a7c15)
            .wrapping_add(identity)
            .wrapping_add(round.wrapping_mul(0x2545f4914f6cdd1d));
        SmallRng::seed_from_u64(mixed)
    }

    async fn simulate(&self, rng: &mut SmallRng, what: &str) -> anyhow::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let min = self.latency_min.as_micros() as u64;
        let max = self.latency_max.as_micros().max(self.latency_min.as_micros()) as u64;
        let latency = Duration::from_micros(rng.gen_range(min..=max));
        tokio::time::sleep(latency).await;
        if self.fail_pct > 0 && rng.gen_range(0..100) < self.fail_pct as u32 {
            anyhow::bail!("injected remote failure for {what}");
        }
        Ok(())
    }
}

fn sim_sku(idx: u64) -> String {
    format!("sku_{idx:06}")
}

fn sim_cost(idx: u64) -> u32 {
    1_000 + (idx % 977) as u32
}

fn hash_str(value: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

#[async_trait]
impl RemoteFetcher for SimRemote {
    type Key = String;
    type Record = SimRow;
    type Context = String;

    fn merge_key(record: &SimRow) -> String {
        record.sku.clone()
    }

    async fn fetch_chunk(&self, keys: &[String], _ctx: &String) -> anyhow::Result<Vec<SimRow>> {
        let identity = keys.first().map(|k| hash_str(k)).unwrap_or(0);
        let mut rng = self.page_rng(identity);
        self.simulate(&mut rng, "chunk").await?;
        Ok(keys
            .iter()
            .map(|sku| SimRow {
                sku: sku.clone(),
                unit_cost: sim_cost(hash_str(sku)),
            })
            .collect())
    }

    async fn fetch_page(
        &self,
        offset: u64,
        size: u64,
        _ctx: &String,
    ) -> anyhow::Result<PageSlice<SimRow>> {
        let mut rng = self.page_rng(offset);
        self.simulate(&mut rng, "page").await?;
        let start = offset.min(self.total);
        let end = (offset + size).min(self.total);
        Ok(PageSlice {
            records: (start..end)
                .map(|idx| SimRow {
                    sku: sim_sku(idx),
                    unit_cost: sim_cost(idx),
                })
                .collect(),
            total: self.total,
        })
    }
}

#[tokio::main]
/// Parse CLI args, initialize logging, and dispatch to the subcommand.
async fn main() -> anyhow::Result<()> {
    // Enable ANSI colors only when stdout is a terminal and NO_COLOR is unset.
    let ansi = std::io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none();
    tracing_subscriber::fmt()
        .with_ansi(ansi)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();
    match args.cmd {
        Command::Run(args) => run(args).await,
    }
}

/// Run the workload and write the JSON report.
async fn run(args: RunArgs) -> anyhow::Result<()> {
    anyhow::ensure!(args.iterations > 0, "--iterations must be > 0");
    anyhow::ensure!(args.fail_pct <= 100, "--fail-pct must be <= 100");
    anyhow::ensure!(
        args.latency_min.as_secs_f64() <= args.latency_max.as_secs_f64(),
        "--latency-min must not exceed --latency-max"
    );

    // Use a random seed when the user provides zero.
    let seed = if args.seed == 0 {
        rand::thread_rng().gen()
    } else {
        args.seed
    };

    let keys: Vec<String> = (0..args.keys as u64).map(sim_sku).collect();
    let remote = SimRemote::new(&args, seed);
    let policy: FailurePolicy = args.policy.into();

    let mut runs = Vec::with_capacity(args.iterations);
    for iteration in 0..args.iterations {
        remote.next_round();
        let calls_before = remote.calls();
        let started = Instant::now();
        let result = match args.mode {
            Mode::Chunked => {
                shoal_lookup::run_chunked(
                    &remote,
                    &keys,
                    args.chunk_size,
                    policy,
                    &args.facility_id,
                )
                .await
            }
            Mode::Paged => {
                shoal_lookup::run_paged(&remote, args.page_size, policy, &args.facility_id).await
            }
        }
        .context("lookup run failed")?;
        let elapsed = started.elapsed();

        tracing::info!(
            iteration,
            aggregate = result.aggregate.len(),
            failed_pages = result.failed_pages.len(),
            complete = result.complete,
            requests = remote.calls() - calls_before,
            elapsed_ms = elapsed.as_millis() as u64,
            "lookup run finished"
        );

        runs.push(RunRecord {
            iteration,
            aggregate_len: result.aggregate.len(),
            failed_pages: result.failed_pages.iter().map(|f| f.page).collect(),
            complete: result.complete,
            elapsed_us: elapsed.as_micros() as u64,
        });
    }

    let meta = ReportMeta {
        mode: args.mode,
        policy: format!("{:?}", args.policy).to_lowercase(),
        keys: args.keys,
        chunk_size: args.chunk_size,
        total: args.total,
        page_size: args.page_size,
        fail_pct: args.fail_pct,
        latency_min_ms: Duration::from(args.latency_min).as_millis() as u64,
        latency_max_ms: Duration::from(args.latency_max).as_millis() as u64,
        iterations: args.iterations,
        seed,
        facility_id: args.facility_id.clone(),
    };
    let report = Report { meta, runs };
    write_report(&args.out, &report).context("write report")?;
    eprintln!("wrote report: {}", args.out.display());
    Ok(())
}

fn write_report(path: &PathBuf, report: &Report) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        // Ensure the output directory exists before writing.
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create dir {}", parent.display()))?;
    }
    let data = serde_json::to_vec_pretty(report).context("serialize report")?;
    std::fs::write(path, data).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}
