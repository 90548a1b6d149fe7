mod config;

use std::sync::Arc;

use anyhow::Context;
use mainbus::{Item, LogSink, ResourceBus};
use tokio::task::JoinSet;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::DemoConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cfg = match parse_config_path_from_args().or_else(|| std::env::var("MAINBUS_CONFIG").ok()) {
        Some(config_path) => {
            let cfg = DemoConfig::from_path(&config_path).context("loading config")?;
            info!(%config_path, "loaded config");
            cfg
        }
        None => DemoConfig::default(),
    };

    let buses: Vec<Arc<ResourceBus<String>>> = cfg
        .buses
        .iter()
        .map(|bus| Arc::new(ResourceBus::from_config(bus)))
        .collect();

    let mut consumers = JoinSet::new();
    for bus in &buses {
        bus.spawn_consumers(&mut consumers, |_| LogSink);
        info!(resource = bus.resource(), lanes = bus.lane_count(), "consumers started");
    }

    let mut ticker = tokio::time::interval(cfg.interval());
    for id in 0..cfg.items {
        ticker.tick().await;
        for bus in &buses {
            let payload = plate_name(bus.resource());
            bus.produce(Item::new(id, bus.resource(), payload)).await;
        }
    }

    tokio::time::sleep(cfg.settle()).await;
    for bus in &buses {
        bus.close();
    }

    let mut delivered = 0;
    while let Some(done) = consumers.join_next().await {
        delivered += done.context("consumer task failed")??;
    }
    info!(delivered, "All main buses completed processing.");

    Ok(())
}

/// "iron" becomes "Iron Plate".
fn plate_name(resource: &str) -> String {
    let mut chars = resource.chars();
    match chars.next() {
        Some(first) => format!("{}{} Plate", first.to_uppercase(), chars.as_str()),
        None => "Plate".to_string(),
    }
}

fn parse_config_path_from_args() -> Option<String> {
    let mut args = std::env::args().skip(1);
    while let Some(a) = args.next() {
        if a == "--config" {
            return args.next();
        }
        if let Some(v) = a.strip_prefix("--config=") {
            return Some(v.to_string());
        }
    }
    None
}
