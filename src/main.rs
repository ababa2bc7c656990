use activity_signups::{Server, ServerConfig, ServerError};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_target(false).init();

    let config = ServerConfig::from_env()?;
    Server::seeded().await?.run(&config).await
}
