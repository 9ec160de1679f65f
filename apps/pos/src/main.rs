//! # Otica POS Entry Point
//!
//! Runs the counter as a JSON-lines process: the front end writes one
//! command per line on stdin and reads one response per line on stdout.
//!
//! ## Startup Sequence
//! 1. Initialize tracing (stderr)
//! 2. Load configuration (defaults → otica.toml → OTICA_* env)
//! 3. Open the document store and the blob store
//! 4. Answer commands until stdin closes
//! 5. Close the database pool

use otica_pos::state::ConfigState;
use otica_pos::{dispatch, init_tracing, PosApp};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = ConfigState::load(None)?;
    info!(
        store_id = %config.store_id,
        seller = %config.seller_name,
        "Starting Otica POS"
    );

    let app = PosApp::start(config).await?;

    dispatch::serve(&app, tokio::io::stdin(), tokio::io::stdout()).await?;

    info!("Input closed, shutting down");
    app.db.inner().close().await;
    Ok(())
}
