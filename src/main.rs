use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use miniboard::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Init logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    fmt().with_env_filter(filter).init();

    let config = AppConfig::from_env();
    info!(
        target: "miniboard",
        "miniboard starting: http_port={}, data_root='{}', token_ttl_days={}",
        config.http_port, config.data_root, config.token_ttl_days
    );

    miniboard::server::run(config).await
}
