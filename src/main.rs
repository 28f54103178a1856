//! volume-swarm binary

use anyhow::Result;
use clap::Parser;

use volume_swarm::adapters::cli::{self, CliApp};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (secrets go here, not in the config file)
    dotenvy::dotenv().ok();

    let app = CliApp::parse();
    cli::execute(app).await
}
