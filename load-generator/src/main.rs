use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Parser;
use futures::stream::{self, StreamExt};
use reqwest::{Client, StatusCode};
use shared::BuyRequest;
use tracing::{info, warn};
use uuid::Uuid;

/// Fires a burst of concurrent purchase requests at the ticket service.
#[derive(Parser)]
#[command(name = "load-generator")]
struct Args {
    #[arg(long, env = "TARGET_URL", default_value = "http://localhost:8080/buy")]
    url: String,

    #[arg(long, env = "RESOURCE_ID")]
    resource_id: Uuid,

    #[arg(long, default_value = "100")]
    requests: usize,

    /// Requests in flight at once.
    #[arg(long, default_value = "100")]
    concurrency: usize,

    /// Send every request as this requester instead of a fresh id each time.
    #[arg(long)]
    requester_id: Option<String>,

    #[arg(long, default_value = "10")]
    timeout_secs: u64,
}

#[derive(Debug, Default, PartialEq, Eq)]
struct Tally {
    accepted: usize,
    rejected: usize,
    other: usize,
    errors: usize,
}

impl Tally {
    fn record(&mut self, result: &reqwest::Result<StatusCode>) {
        match result {
            Ok(status) if status.is_success() => self.accepted += 1,
            Ok(status) if *status == StatusCode::SERVICE_UNAVAILABLE => self.rejected += 1,
            Ok(_) => self.other += 1,
            Err(_) => self.errors += 1,
        }
    }

    fn total(&self) -> usize {
        self.accepted + self.rejected + self.other + self.errors
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let client = Client::builder()
        .timeout(Duration::from_secs(args.timeout_secs))
        .build()?;

    info!(
        "Sending {} requests to {} for resource {} ({} concurrent)",
        args.requests, args.url, args.resource_id, args.concurrency
    );
    let started = Instant::now();

    let results: Vec<reqwest::Result<StatusCode>> = stream::iter(0..args.requests)
        .map(|_| {
            let body = BuyRequest {
                resource_id: args.resource_id,
                requester_id: args
                    .requester_id
                    .clone()
                    .unwrap_or_else(|| Uuid::new_v4().to_string()),
            };
            let request = client.post(&args.url).json(&body);
            async move { request.send().await.map(|response| response.status()) }
        })
        .buffer_unordered(args.concurrency.max(1))
        .collect()
        .await;

    let mut tally = Tally::default();
    for result in &results {
        if let Err(e) = result {
            warn!("Request failed: {}", e);
        }
        tally.record(result);
    }

    info!(
        "Done in {:?}: {} sent, {} accepted, {} rejected (busy), {} other status, {} transport errors",
        started.elapsed(),
        tally.total(),
        tally.accepted,
        tally.rejected,
        tally.other,
        tally.errors
    );

    Ok(())
}
