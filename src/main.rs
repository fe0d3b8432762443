use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{error, info};

use agri_advisor::prediction::ModelCache;
use agri_advisor::{
    Advisor, AdvisorConfig, AppState, ArtifactLocator, ArtifactProvisioner, ChatService,
    FileModelSource, GeminiClient, GoogleTranslateClient, HttpArtifactFetcher, PricePredictor,
    TextBridge, WeatherApiClient, telemetry, web,
};

const ARTIFACT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() -> Result<()> {
    let config = AdvisorConfig::load().context("Failed to load configuration")?;
    let _telemetry = telemetry::init_tracing(&config.logging)?;

    if let Err(e) = run(config).await {
        error!("Startup failed: {:#}", e);
        return Err(e);
    }
    Ok(())
}

async fn run(config: AdvisorConfig) -> Result<()> {
    info!("Starting agri-advisor v{}", agri_advisor::VERSION);

    let weather = Arc::new(WeatherApiClient::new(&config.weather)?);
    let generator = Arc::new(GeminiClient::new(&config.genai)?);
    let translator = Arc::new(GoogleTranslateClient::new(&config.translation)?);

    // The price model must be usable before the first request is accepted
    let locator = ArtifactLocator::from(&config.artifact);
    let model_path = locator.local_path.clone();
    let provisioner = ArtifactProvisioner::new(
        locator,
        Arc::new(HttpArtifactFetcher::new(ARTIFACT_DOWNLOAD_TIMEOUT)?),
    );
    provisioner
        .ensure_artifact()
        .await
        .context("Failed to provision price model")?;

    let cache = Arc::new(ModelCache::new(Arc::new(FileModelSource::new(model_path))));
    let model = cache.get_model().await.context("Failed to load price model")?;
    info!("Price model ready: {}", model.describe());

    let state = AppState {
        weather,
        advisor: Arc::new(Advisor::new(generator.clone())),
        chat: Arc::new(ChatService::new(
            Arc::new(TextBridge::new(translator)),
            generator,
        )),
        predictor: Arc::new(PricePredictor::new(cache)),
    };

    let app = web::app(state, &config.server);
    web::run(app, &config.server).await
}
