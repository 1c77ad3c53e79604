pub mod login;
pub mod probe;
pub mod watch;

use std::sync::Arc;

use anyhow::Result;
use wlanauth_core::config::AppConfig;
use wlanauth_portal::Portal;
use wlanauth_transport::ReqwestTransport;

pub(crate) fn build_portal(config: &AppConfig) -> Result<Portal> {
    let transport = Arc::new(ReqwestTransport::new(
        config.general.request_timeout(),
        config.general.max_body_size(),
    ));
    let portal = Portal::from_config(config, config.credentials.to_credentials(), transport)?;
    Ok(portal)
}
