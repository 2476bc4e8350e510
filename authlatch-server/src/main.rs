//! AuthLatch HTTP Server binary

use authlatch_core::LatchConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = LatchConfig::from_env()?;

    authlatch_server::tracing::init_logging(&config)?;

    authlatch_server::run(config).await
}
