use anyhow::Context;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use investment_web::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Init logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .context("invalid log filter")?;
    fmt().with_env_filter(filter).init();

    let config = Config::from_env().context("invalid configuration")?;

    // Startup banner at info level so something always prints at default verbosity
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    info!(
        target: "investment_web",
        "investment_web starting: RUST_LOG='{}', addr={}, session_ttl_secs={}, remember_ttl_secs={}, csrf={}, secure_cookies={}",
        rust_log,
        config.socket_addr(),
        config.session_ttl.as_secs(),
        config.remember_ttl.as_secs(),
        config.csrf_enabled,
        config.secure_cookies
    );

    investment_web::server::run(config).await
}
