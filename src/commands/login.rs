use anyhow::{bail, Result};
use tracing::warn;
use wlanauth_core::config::AppConfig;

pub async fn run(config: AppConfig) -> Result<()> {
    let portal = super::build_portal(&config)?;
    if !portal.credentials().is_configured() {
        warn!("no credentials configured, the portal will reject the login");
    }

    let result = portal.login().await;
    match result.error {
        None if result.successful => {
            println!("Login was successful");
            Ok(())
        }
        Some(e) => bail!("login failed: {}", e),
        None => bail!("login failed"),
    }
}
