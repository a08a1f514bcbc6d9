//! Basic telemetry usage example
//!
//! Sets up console logging, runs a few instrumented calls and reports a
//! failure with its traceback.
//!
//! Run with: cargo run --example basic_usage

use autopsy_instrument::{instrument, logged};
use autopsy_telemetry::{log_exception, report, LogFormat, LogLevel, TelemetryConfig, TelemetrySystem};
use autopsy_traceback::{context, frame, Fault, ResultExt};

#[derive(Debug)]
struct Order {
    id: u32,
    lines: Vec<(String, String)>,
}

#[logged]
fn parse_quantity(raw: &str) -> Result<u32, Fault> {
    raw.trim().parse::<u32>().at(|| frame!(raw))
}

#[logged(level = "info")]
fn order_total(order: &Order) -> Result<u32, Fault> {
    let mut total = 0;
    for (sku, quantity) in &order.lines {
        let quantity = parse_quantity(quantity).at(|| frame!(sku, total, order_id = order.id))?;
        total += quantity;
    }
    Ok(total)
}

#[logged(level = "info")]
async fn checkout(order: Order) -> Result<u32, Fault> {
    tokio::task::yield_now().await;
    order_total(&order).at(|| frame!(order))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    println!("Starting autopsy telemetry example");

    let mut config = TelemetryConfig::load(None).await?;
    config.logging.level = LogLevel::Debug;
    config.logging.format = LogFormat::Compact;

    let _guard = TelemetrySystem::init(config).await?;

    let double = instrument("double", |x: u32| x * 2);
    double.call(21);

    let good = Order {
        id: 1,
        lines: vec![("bolt".into(), "2".into()), ("nut".into(), "4".into())],
    };
    match checkout(good).await {
        Ok(total) => tracing::info!(total, "first order checked out"),
        Err(fault) => report(&fault),
    }

    let bad = Order {
        id: 2,
        lines: vec![("bolt".into(), "2".into()), ("washer".into(), "a dozen".into())],
    };
    if let Err(fault) = checkout(bad).await {
        report(&fault);
        context::handling(fault, || log_exception("second order rejected"));
    }

    println!("Example completed");
    Ok(())
}
