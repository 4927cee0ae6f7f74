//! Load generator for strategy comparison.
//!
//! Hammers one product through one strategy endpoint with N concurrent
//! workers for a fixed duration, then prints latency percentiles and the
//! origin hit count. Run it once per strategy against the same product to
//! compare how much origin load each one admits.
//!
//! Usage: `loadgen <strategy> <product-id> [workers] [seconds]`
//! The target server defaults to `http://localhost:3000`; override with
//! `STAMPEDE_TARGET_URL`.

use std::time::{Duration, Instant};

use stampede_api::OriginStatsResponse;

struct LoadgenArgs {
    base_url: String,
    strategy: String,
    product_id: String,
    workers: usize,
    duration: Duration,
}

fn parse_args() -> Result<LoadgenArgs, String> {
    let mut args = std::env::args().skip(1);

    let strategy = args
        .next()
        .ok_or_else(|| "usage: loadgen <strategy> <product-id> [workers] [seconds]".to_string())?;
    let product_id = args
        .next()
        .ok_or_else(|| "usage: loadgen <strategy> <product-id> [workers] [seconds]".to_string())?;

    let workers = match args.next() {
        Some(raw) => raw
            .parse()
            .map_err(|_| format!("invalid worker count: {raw}"))?,
        None => 20,
    };
    let seconds: u64 = match args.next() {
        Some(raw) => raw
            .parse()
            .map_err(|_| format!("invalid duration: {raw}"))?,
        None => 10,
    };

    Ok(LoadgenArgs {
        base_url: std::env::var("STAMPEDE_TARGET_URL")
            .unwrap_or_else(|_| "http://localhost:3000".to_string()),
        strategy,
        product_id,
        workers,
        duration: Duration::from_secs(seconds),
    })
}

struct WorkerReport {
    latencies_us: Vec<u64>,
    errors: u64,
    not_found: u64,
}

async fn run_worker(
    client: reqwest::Client,
    url: String,
    deadline: Instant,
) -> WorkerReport {
    let mut report = WorkerReport {
        latencies_us: Vec::new(),
        errors: 0,
        not_found: 0,
    };

    while Instant::now() < deadline {
        let started = Instant::now();
        match client.get(&url).send().await {
            Ok(response) if response.status().is_success() => {
                report.latencies_us.push(started.elapsed().as_micros() as u64);
            }
            Ok(response) if response.status() == reqwest::StatusCode::NOT_FOUND => {
                report.not_found += 1;
            }
            Ok(_) | Err(_) => {
                report.errors += 1;
            }
        }
    }
    report
}

fn percentile(sorted: &[u64], pct: f64) -> u64 {
    if sorted.is_empty() {
        return 0;
    }
    let rank = ((sorted.len() as f64 - 1.0) * pct / 100.0).round() as usize;
    sorted[rank.min(sorted.len() - 1)]
}

async fn fetch_origin_stats(
    client: &reqwest::Client,
    base_url: &str,
) -> Option<OriginStatsResponse> {
    let response = client
        .get(format!("{base_url}/admin/origin/stats"))
        .send()
        .await
        .ok()?;
    response.json().await.ok()
}

#[tokio::main]
async fn main() {
    let args = match parse_args() {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{message}");
            std::process::exit(2);
        }
    };

    let client = reqwest::Client::new();
    let url = format!(
        "{}/products/{}/{}",
        args.base_url, args.strategy, args.product_id
    );

    let hits_before = fetch_origin_stats(&client, &args.base_url)
        .await
        .map(|stats| stats.origin_hits);

    println!(
        "loadgen: {} workers on {} for {:?}",
        args.workers, url, args.duration
    );

    let deadline = Instant::now() + args.duration;
    let mut handles = Vec::with_capacity(args.workers);
    for _ in 0..args.workers {
        handles.push(tokio::spawn(run_worker(
            client.clone(),
            url.clone(),
            deadline,
        )));
    }

    let mut latencies = Vec::new();
    let mut errors = 0u64;
    let mut not_found = 0u64;
    for handle in handles {
        match handle.await {
            Ok(report) => {
                latencies.extend(report.latencies_us);
                errors += report.errors;
                not_found += report.not_found;
            }
            Err(join_error) => {
                eprintln!("worker crashed: {join_error}");
                errors += 1;
            }
        }
    }
    latencies.sort_unstable();

    println!("requests ok:  {}", latencies.len());
    println!("not found:    {not_found}");
    println!("errors:       {errors}");
    if !latencies.is_empty() {
        println!("p50 latency:  {} us", percentile(&latencies, 50.0));
        println!("p95 latency:  {} us", percentile(&latencies, 95.0));
        println!("p99 latency:  {} us", percentile(&latencies, 99.0));
    }

    if let (Some(before), Some(after)) = (
        hits_before,
        fetch_origin_stats(&client, &args.base_url)
            .await
            .map(|stats| stats.origin_hits),
    ) {
        println!("origin hits:  {} (+{})", after, after.saturating_sub(before));
    }
}
