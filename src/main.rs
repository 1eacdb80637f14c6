use anyhow::Context;
use outfitcast::{OutfitConfig, OutfitService, console, logging};

fn main() -> anyhow::Result<()> {
    let config = OutfitConfig::load()?;
    logging::init(&config.logging);

    let runtime = tokio::runtime::Runtime::new().context("Failed to start the async runtime")?;
    let service = OutfitService::from_config(&config)?;

    console::run(&runtime, &service)?;
    Ok(())
}
