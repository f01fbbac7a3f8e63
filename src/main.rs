//! Sequencing worker entry point.
//!
//! Initializes configuration, storage and the sequence engine, then starts the
//! HTTP server.

use sequencing_worker::run;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    run().await
}
