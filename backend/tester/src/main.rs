use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result, bail};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tally::CounterSnapshot;
use tokio::{sync::Semaphore, task::JoinSet};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Base URL of the public API
    #[arg(long, default_value = "http://localhost:3000")]
    endpoint: String,

    #[arg(long, default_value_t = 100)]
    clicks: u64,

    #[arg(long, default_value_t = 8)]
    concurrency: usize,

    /// Send every click under its own `ar-real-ip` so the rate limit never kicks in
    #[arg(long)]
    spoof: bool,
}

#[derive(Debug, Default)]
struct Outcome {
    created: u64,
    limited: u64,
    failed: u64,
    achievements: u64,
}

enum Click {
    Created { achievement: bool },
    Limited,
    Failed,
}

async fn read_total(client: &Client, endpoint: &str) -> Result<CounterSnapshot> {
    client
        .get(endpoint)
        .send()
        .await
        .context("Failed to reach API")?
        .error_for_status()?
        .json()
        .await
        .context("Unexpected counter body")
}

async fn click(client: Client, url: String, spoof: Option<u64>) -> Click {
    let mut request = client.post(url);
    if let Some(n) = spoof {
        let address = format!("10.{}.{}.{}", (n >> 16) & 255, (n >> 8) & 255, n & 255);
        request = request.header("ar-real-ip", address);
    }

    let Ok(response) = request.send().await else {
        return Click::Failed;
    };

    match response.status() {
        StatusCode::CREATED => {
            let achievement = response
                .json::<Value>()
                .await
                .is_ok_and(|body| body.get("achievement").is_some());
            Click::Created { achievement }
        }
        StatusCode::TOO_MANY_REQUESTS => Click::Limited,
        _ => Click::Failed,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    if args.concurrency == 0 {
        bail!("concurrency must be at least 1");
    }

    let client = Client::builder().timeout(Duration::from_secs(5)).build()?;
    let endpoint = args.endpoint.trim_end_matches('/').to_string();

    let before = read_total(&client, &endpoint).await?;

    let pb = ProgressBar::new(args.clicks);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
        )?
        .progress_chars("#>-"),
    );

    let permits = Arc::new(Semaphore::new(args.concurrency));
    let mut tasks = JoinSet::new();

    for n in 0..args.clicks {
        let permit = permits.clone().acquire_owned().await?;
        let url = format!("{endpoint}/click");
        let spoof = args.spoof.then_some(n);
        let client = client.clone();

        tasks.spawn(async move {
            let result = click(client, url, spoof).await;
            drop(permit);
            result
        });
    }

    let mut outcome = Outcome::default();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Click::Created { achievement }) => {
                outcome.created += 1;
                outcome.achievements += u64::from(achievement);
            }
            Ok(Click::Limited) => outcome.limited += 1,
            Ok(Click::Failed) | Err(_) => outcome.failed += 1,
        }
        pb.inc(1);
        pb.set_message(format!("{} limited", outcome.limited));
    }
    pb.finish_with_message("done");

    // Let at least one sync run so the durable total catches up
    tokio::time::sleep(Duration::from_secs(1)).await;
    let after = read_total(&client, &endpoint).await?;

    println!("{outcome:?}");
    println!(
        "total {} -> {} (+{}), daily {} -> {}",
        before.total,
        after.total,
        after.total.saturating_sub(before.total),
        before.daily.amount,
        after.daily.amount
    );

    Ok(())
}
