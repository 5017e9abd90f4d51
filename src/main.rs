use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use channelcast::{
    cache::spawn_housekeeper,
    config::Config,
    services::FeedService,
    sources::{HttpMediaProbe, YouTubeClient},
    utils::url::UrlUtils,
    web::WebServer,
};

#[derive(Parser)]
#[command(name = "channelcast")]
#[command(version)]
#[command(about = "Serves video channels as podcast RSS feeds")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Listening IP address
    #[arg(short = 'H', long, value_name = "IP")]
    host: Option<String>,

    /// Listening port
    #[arg(short, long, value_name = "PORT")]
    port: Option<u16>,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_filter = if cli.log_level == "trace" {
        format!("channelcast={},tower_http=trace", cli.log_level)
    } else {
        format!("channelcast={},tower_http=info", cli.log_level)
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    std::env::set_var("CONFIG_FILE", &cli.config);
    let mut config = Config::load()?;

    if let Some(host) = cli.host {
        config.web.host = host;
    }
    if let Some(port) = cli.port {
        config.web.port = port;
    }

    if cli.print_config {
        println!("{}", config.to_toml()?);
        return Ok(());
    }

    info!("Starting channelcast v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded from: {}", cli.config);
    info!(
        "YouTube API: {} (key {})",
        UrlUtils::obfuscate_credentials(&config.youtube.api_url),
        if config.youtube.api_key.is_empty() { "missing" } else { "set" }
    );
    info!(
        "Media base URL: {}, enrichment concurrency: {}",
        config.feed.media_base_url(&config.web),
        config.enrichment.concurrency
    );

    let provider = Arc::new(YouTubeClient::new(&config.youtube)?);
    let probe = Arc::new(HttpMediaProbe::new(config.enrichment.call_timeout)?);
    let feed_service = Arc::new(FeedService::new(&config, provider, probe));

    let _housekeeper = spawn_housekeeper(
        feed_service.caches(),
        config.cache.purge_interval,
        config.cache.stale_retention,
    );

    let web_server = WebServer::new(Arc::new(config), feed_service)?;

    info!(
        "Starting web server on {}:{}",
        web_server.host(),
        web_server.port()
    );
    web_server.serve().await?;

    Ok(())
}
