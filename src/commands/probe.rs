use anyhow::Result;
use tracing::info;
use wlanauth_core::config::AppConfig;

pub async fn run(config: AppConfig) -> Result<()> {
    let portal = super::build_portal(&config)?;
    let outcome = portal.probe().await;
    info!(%outcome, "probe finished");
    println!("{}", outcome);
    Ok(())
}
