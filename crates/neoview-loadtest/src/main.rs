//! neoview-loadtest - Hammer a running neoview daemon with block requests
//!
//! Every request must come back with `200 OK`; the tool prints a latency
//! summary and exits non-zero when any request fails.

use clap::Parser;
use futures_util::stream::{self, StreamExt};
use std::time::{Duration, Instant};
use url::Url;

#[derive(Parser, Debug)]
#[command(name = "neoview-loadtest")]
#[command(about = "Load test the neoview block endpoint")]
#[command(version)]
struct Args {
    /// Endpoint to request
    #[arg(
        long,
        default_value = "http://127.0.0.1:8000/api/blockdata/?url=https://gin.g-node.org/NeuralEnsemble/ephy_testing_data/raw/master/brainwaresrc/block_300ms_4rep_1clust_part_ch1.src"
    )]
    target: String,

    /// Total number of requests
    #[arg(short = 'n', long, default_value = "100")]
    requests: usize,

    /// Requests in flight at once
    #[arg(short, long, default_value = "10")]
    concurrency: usize,

    /// Per-request timeout in seconds
    #[arg(long, default_value = "60")]
    timeout: u64,
}

/// Outcome of a single request
enum Outcome {
    Ok(Duration),
    Status(u16),
    Failed(String),
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let target = match Url::parse(&args.target) {
        Ok(url) => url,
        Err(e) => {
            eprintln!("Error: invalid target {}: {}", args.target, e);
            std::process::exit(2);
        }
    };

    let client = match reqwest::Client::builder()
        .timeout(Duration::from_secs(args.timeout))
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Error: failed to create HTTP client: {}", e);
            std::process::exit(2);
        }
    };

    println!(
        "Sending {} requests ({} concurrent) to {}",
        args.requests, args.concurrency, target
    );

    let started = Instant::now();
    let outcomes: Vec<Outcome> = stream::iter(0..args.requests)
        .map(|_| request_once(&client, target.clone()))
        .buffer_unordered(args.concurrency.max(1))
        .collect()
        .await;
    let elapsed = started.elapsed();

    let mut latencies = Vec::new();
    let mut failures = 0;
    for outcome in outcomes {
        match outcome {
            Outcome::Ok(latency) => latencies.push(latency),
            Outcome::Status(status) => {
                failures += 1;
                eprintln!("  unexpected status {}", status);
            }
            Outcome::Failed(e) => {
                failures += 1;
                eprintln!("  request failed: {}", e);
            }
        }
    }

    println!();
    println!("=== Results ===");
    println!("Succeeded: {}", latencies.len());
    println!("Failed:    {}", failures);
    println!("Elapsed:   {:.2?}", elapsed);
    if elapsed.as_secs_f64() > 0.0 {
        println!(
            "Rate:      {:.1} req/s",
            args.requests as f64 / elapsed.as_secs_f64()
        );
    }
    if let Some(summary) = LatencySummary::from_samples(&mut latencies) {
        println!(
            "Latency:   min {:.2?}  median {:.2?}  p95 {:.2?}  max {:.2?}",
            summary.min, summary.median, summary.p95, summary.max
        );
    }

    if failures > 0 {
        std::process::exit(1);
    }
}

async fn request_once(client: &reqwest::Client, target: Url) -> Outcome {
    let started = Instant::now();
    match client.get(target).send().await {
        Ok(resp) if resp.status() == reqwest::StatusCode::OK => {
            // Drain the body so timing covers the full response
            match resp.bytes().await {
                Ok(_) => Outcome::Ok(started.elapsed()),
                Err(e) => Outcome::Failed(e.to_string()),
            }
        }
        Ok(resp) => Outcome::Status(resp.status().as_u16()),
        Err(e) => Outcome::Failed(e.to_string()),
    }
}

struct LatencySummary {
    min: Duration,
    median: Duration,
    p95: Duration,
    max: Duration,
}

impl LatencySummary {
    fn from_samples(samples: &mut [Duration]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        samples.sort();
        let at = |fraction: f64| {
            let index = ((samples.len() - 1) as f64 * fraction).round() as usize;
            samples[index]
        };
        Some(Self {
            min: samples[0],
            median: at(0.5),
            p95: at(0.95),
            max: samples[samples.len() - 1],
        })
    }
}
