use std::time::Duration;

use url::Url;

use wlanauth_core::{AppConfig, ConfigError};
use wlanauth_parser::{FailureMarker, LandingSignature, PortalTopology};

/// Compiled probe parameters
#[derive(Debug, Clone)]
pub struct ProbeSettings {
    pub wan_check_url: Url,
    pub proxy: String,
    pub intranet_url: Url,
    pub user_agent: String,
    pub timeout: Duration,
    pub signature: LandingSignature,
    pub topology: PortalTopology,
}

/// Compiled login parameters
#[derive(Debug, Clone)]
pub struct LoginSettings {
    pub bootstrap_url: Url,
    pub topology: PortalTopology,
    pub login_path: String,
    pub submit_value: String,
    pub verify_tls: bool,
    pub max_hops: usize,
    pub marker: FailureMarker,
    pub user_agent: String,
    pub timeout: Duration,
}

impl ProbeSettings {
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            wan_check_url: parse_url("probe.wan_check_url", &config.probe.wan_check_url)?,
            proxy: config.probe.proxy.clone(),
            intranet_url: parse_url("probe.intranet_url", &config.probe.intranet_url)?,
            user_agent: config.general.user_agent.clone(),
            timeout: config.general.request_timeout(),
            signature: LandingSignature::new(&config.probe.portal_signature)?,
            topology: PortalTopology::new(&config.portal.domain, config.portal.login_port)?,
        })
    }
}

impl LoginSettings {
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            bootstrap_url: parse_url("portal.bootstrap_url", &config.portal.bootstrap_url)?,
            topology: PortalTopology::new(&config.portal.domain, config.portal.login_port)?,
            login_path: config.portal.login_path.clone(),
            submit_value: config.portal.submit_value.clone(),
            verify_tls: config.portal.verify_tls,
            max_hops: config.portal.max_hops,
            marker: FailureMarker::new(config.portal.failure_marker.clone()),
            user_agent: config.general.user_agent.clone(),
            timeout: config.general.request_timeout(),
        })
    }
}

fn parse_url(field: &'static str, value: &str) -> Result<Url, ConfigError> {
    Url::parse(value).map_err(|_| ConfigError::InvalidUrl {
        field,
        value: value.to_string(),
    })
}
