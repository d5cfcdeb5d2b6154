//! Load generator for the KV server.
//!
//! Runs N client threads against one endpoint for a fixed duration, prints a
//! summary and appends it to a CSV file.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

const CSV_HEADER: &str =
    "Clients,Requests,Successful,TotalTime(s),Throughput(req/s),AvgResp(ms),Endpoint";

#[derive(Parser, Debug, Clone)]
#[command(name = "loadgen", about = "HTTP load generator for the KV server")]
struct Args {
    /// Number of concurrent client threads
    #[arg(long, default_value_t = 20)]
    clients: usize,

    /// How long to generate load, in seconds
    #[arg(long, default_value_t = 30)]
    duration_secs: u64,

    /// Endpoint to hit, e.g. /compute or /read?key=a
    #[arg(long, default_value = "/compute")]
    endpoint: String,

    /// Server base URL
    #[arg(long, default_value = "http://127.0.0.1:8080")]
    base_url: String,

    /// Timeout in seconds per HTTP request
    #[arg(long, default_value_t = 10)]
    timeout_secs: u64,

    /// CSV file the summary row is appended to
    #[arg(long, default_value = "results/loadtest.csv")]
    results: PathBuf,
}

#[derive(Debug, Default)]
struct Stats {
    total_requests: AtomicU64,
    success: AtomicU64,
    total_latency_ns: AtomicU64,
}

#[derive(Debug)]
struct Summary {
    clients: usize,
    requests: u64,
    successful: u64,
    total_secs: f64,
    throughput: f64,
    avg_resp_ms: f64,
    endpoint: String,
}

impl Summary {
    fn csv_row(&self) -> String {
        format!(
            "{},{},{},{:.3},{:.3},{:.3},{}",
            self.clients,
            self.requests,
            self.successful,
            self.total_secs,
            self.throughput,
            self.avg_resp_ms,
            self.endpoint
        )
    }
}

/// Joins `base` and `endpoint` without doubling the slash.
fn join_url(base: &str, endpoint: &str) -> String {
    match (base.ends_with('/'), endpoint.starts_with('/')) {
        (true, true) => format!("{}{}", base, &endpoint[1..]),
        (false, false) if !endpoint.is_empty() => format!("{base}/{endpoint}"),
        _ => format!("{base}{endpoint}"),
    }
}

/// `/create` URLs get a fresh key per request so every call reaches the store.
fn request_url(base: &str, endpoint: &str, client: usize, seq: u64) -> String {
    let url = join_url(base, endpoint);
    if !endpoint.starts_with("/create") {
        return url;
    }
    let ts = chrono::Utc::now().timestamp_millis();
    let sep = if url.contains('?') { '&' } else { '?' };
    format!("{url}{sep}key=client{client}_{seq}_{ts}&value=val{seq}_{ts}")
}

fn client_loop(
    args: &Args,
    client_id: usize,
    deadline: Instant,
    stats: &Stats,
    stop: &AtomicBool,
) -> anyhow::Result<()> {
    let http = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(args.timeout_secs))
        .build()
        .context("failed to build HTTP client")?;

    let mut seq = 0u64;
    while !stop.load(Ordering::Relaxed) && Instant::now() < deadline {
        let url = request_url(&args.base_url, &args.endpoint, client_id, seq);

        let started = Instant::now();
        let ok = http
            .get(&url)
            .send()
            .and_then(|resp| resp.bytes())
            .is_ok();
        let elapsed = u64::try_from(started.elapsed().as_nanos()).unwrap_or(u64::MAX);

        stats.total_requests.fetch_add(1, Ordering::Relaxed);
        stats.total_latency_ns.fetch_add(elapsed, Ordering::Relaxed);
        if ok {
            stats.success.fetch_add(1, Ordering::Relaxed);
        }
        seq += 1;
    }
    Ok(())
}

fn append_csv(path: &PathBuf, summary: &Summary) -> anyhow::Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    if file.metadata()?.len() == 0 {
        writeln!(file, "{CSV_HEADER}")?;
    }
    writeln!(file, "{}", summary.csv_row())?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "loadgen=info".into()),
        )
        .init();

    let args = Arc::new(Args::parse());
    anyhow::ensure!(!args.base_url.trim().is_empty(), "base URL is empty");
    anyhow::ensure!(args.clients > 0, "need at least one client");

    info!(
        "Starting loadgen: clients={} duration={}s endpoint={} base={}",
        args.clients, args.duration_secs, args.endpoint, args.base_url
    );

    let stats = Arc::new(Stats::default());
    let stop = Arc::new(AtomicBool::new(false));
    let started = Instant::now();
    let deadline = started + Duration::from_secs(args.duration_secs);

    let handles: Vec<_> = (0..args.clients)
        .map(|id| {
            let (args, stats, stop) = (Arc::clone(&args), Arc::clone(&stats), Arc::clone(&stop));
            thread::spawn(move || client_loop(&args, id, deadline, &stats, &stop))
        })
        .collect();

    thread::sleep(deadline.saturating_duration_since(Instant::now()));
    stop.store(true, Ordering::Relaxed);

    for handle in handles {
        match handle.join() {
            Ok(Ok(())) => {}
            Ok(Err(err)) => warn!(error = %err, "client failed"),
            Err(_) => warn!("client thread panicked"),
        }
    }

    let total_secs = started.elapsed().as_secs_f64();
    let requests = stats.total_requests.load(Ordering::Relaxed);
    let successful = stats.success.load(Ordering::Relaxed);
    let summary = Summary {
        clients: args.clients,
        requests,
        successful,
        total_secs,
        throughput: if total_secs > 0.0 {
            successful as f64 / total_secs
        } else {
            0.0
        },
        avg_resp_ms: if successful > 0 {
            stats.total_latency_ns.load(Ordering::Relaxed) as f64 / successful as f64 / 1e6
        } else {
            0.0
        },
        endpoint: args.endpoint.clone(),
    };

    println!("=== Load Test Summary ===");
    println!("Clients: {}", summary.clients);
    println!("Requests: {}", summary.requests);
    println!("Successful: {}", summary.successful);
    println!("Total(s): {:.3}", summary.total_secs);
    println!("Throughput(req/s): {:.3}", summary.throughput);
    println!("AvgResp(ms): {:.3}", summary.avg_resp_ms);

    append_csv(&args.results, &summary)?;
    println!("Results saved to {}", args.results.display());
    Ok(())
}
