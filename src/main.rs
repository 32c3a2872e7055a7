//! This file defines the gridverify binary entry point.

use gridverify::app;
use gridverify::cli;
use gridverify::metrics;
use gridverify::server;
use gridverify::tracing;

/// Application entry point
#[tokio::main]
async fn main() {
    let args = cli::parse();
    tracing::init_tracing();
    metrics::register_metrics();
    let router = app::router(&args);
    server::serve(&args, router).await;
}
