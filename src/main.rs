use anyhow::Result;
use sheetchat::cli;

#[tokio::main]
async fn main() -> Result<()> {
    cli::run().await
}
