use streamgate::config::Settings;
use streamgate::services::ServiceContainer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables before settings are read.
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;
    streamgate::logging::init(settings.log_filter.as_deref());

    let container = ServiceContainer::new(settings).await?;

    let cached = container.resolver.cached_channel_names().await;
    tracing::info!(
        "streamgate initialized successfully, {} channels cached",
        cached.len()
    );

    Ok(())
}
