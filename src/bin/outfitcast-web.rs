use outfitcast::{OutfitConfig, OutfitService, logging, web};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = OutfitConfig::load()?;
    logging::init(&config.logging);

    let service = OutfitService::from_config(&config)?;
    web::run(&config.web, service).await?;
    Ok(())
}
