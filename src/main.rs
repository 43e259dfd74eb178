use anyhow::Context;
use dependency_guard::{build_client, config::GuardConfig, init_tracing, transport::DependencyRequest};
use std::env;
use std::process;

const USAGE: &str = "Usage: dependency-guard <config_file> <service_name> <path> [key=value ...]";

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("dependency-guard error: {:#}", e);
        eprintln!("{}", USAGE);
        process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let mut args = env::args().skip(1);

    let config_path = args.next().unwrap_or_else(|| "config/guard.yaml".to_string());
    let config = GuardConfig::from_file(&config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path))?;

    init_tracing(&config.logging);

    let service_name = args.next().context("missing <service_name>")?;
    let path = args.next().context("missing <path>")?;

    let mut request = DependencyRequest::get(path);
    for pair in args {
        let (key, value) = pair
            .split_once('=')
            .with_context(|| format!("query parameter '{}' is not key=value", pair))?;
        request = request.with_query(key, value);
    }

    let client = build_client(&config)?;

    // A missing response is the degraded result, not a process failure
    match client.call_dependency(&service_name, &request).await {
        Some(response) => {
            println!("{}", serde_json::to_string_pretty(&response.body)?);
        }
        None => {
            println!("no data from {} (degraded)", service_name);
        }
    }

    Ok(())
}
