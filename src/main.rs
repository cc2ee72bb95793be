// SPDX-License-Identifier: GPL-3.0-only

#[macro_use]
extern crate tracing;

use anyhow::Context;
use brightsync::{BrightnessService, Config};

fn setup_logs() {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let fmt_layer = fmt::layer().with_target(false);
    let filter_layer = EnvFilter::try_from_default_env().unwrap_or(EnvFilter::new(format!(
        "warn,{}=info",
        env!("CARGO_CRATE_NAME")
    )));

    if let Ok(journal_layer) = tracing_journald::layer() {
        tracing_subscriber::registry()
            .with(filter_layer)
            .with(fmt_layer)
            .with(journal_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter_layer)
            .with(fmt_layer)
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    setup_logs();

    let config = match Config::load() {
        Ok(config) => config,
        Err(err) => {
            error!("errors loading config: {}", err);
            Config::default()
        }
    };

    let service = BrightnessService::system(&config);
    service.initialize(config.simulate).await;

    let monitors = service
        .list_monitors()
        .await
        .context("Failed to enumerate monitors")?;

    if monitors.is_empty() {
        println!("No monitors found");
    }
    for monitor in &monitors {
        println!(
            "{:<22} {:<8} {:>3}  ({}..{})  {}",
            monitor.id, monitor.kind, monitor.current, monitor.min, monitor.max, monitor.name
        );
    }

    Ok(())
}
