use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::error::ConfigError;
use crate::types::Credentials;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub general: GeneralConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
    pub probe: ProbeConfig,
    pub portal: PortalConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeneralConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_max_body_kb")]
    pub max_body_size_kb: usize,
}

#[derive(Deserialize, Clone, Default)]
pub struct CredentialsConfig {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl std::fmt::Debug for CredentialsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(&self.to_credentials(), f)
    }
}

impl CredentialsConfig {
    pub fn to_credentials(&self) -> Credentials {
        Credentials::new(self.username.clone(), self.password.clone())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProbeConfig {
    /// Plain-HTTP page; HTTPS would bypass the portal's interception
    pub wan_check_url: String,
    pub proxy: String,
    pub intranet_url: String,
    pub portal_signature: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PortalConfig {
    pub bootstrap_url: String,
    pub domain: String,
    #[serde(default = "default_login_port")]
    pub login_port: u16,
    #[serde(default = "default_login_path")]
    pub login_path: String,
    #[serde(default = "default_submit_value")]
    pub submit_value: String,
    #[serde(default)]
    pub verify_tls: bool,
    #[serde(default = "default_max_hops")]
    pub max_hops: usize,
    #[serde(default = "default_failure_marker")]
    pub failure_marker: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    #[serde(default = "default_check_interval")]
    pub check_interval_seconds: u64,
    #[serde(default = "default_check_loop_timeout")]
    pub check_loop_timeout_seconds: u64,
    #[serde(default = "default_retry_limit")]
    pub retry_limit: u32,
}

fn default_user_agent() -> String { "wlanauth".to_string() }
fn default_timeout_ms() -> u64 { 4000 }
fn default_max_body_kb() -> usize { 2048 }
fn default_login_port() -> u16 { 9998 }
fn default_login_path() -> String { "/login".to_string() }
fn default_submit_value() -> String { "Login".to_string() }
fn default_max_hops() -> usize { 10 }
fn default_failure_marker() -> String { "auth=failed".to_string() }
fn default_check_interval() -> u64 { 2 }
fn default_check_loop_timeout() -> u64 { 60 }
fn default_retry_limit() -> u32 { 8 }

impl GeneralConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn max_body_size(&self) -> usize {
        self.max_body_size_kb * 1024
    }
}

impl SessionConfig {
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_seconds)
    }

    pub fn check_loop_timeout(&self) -> Duration {
        Duration::from_secs(self.check_loop_timeout_seconds)
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_url("probe.wan_check_url", &self.probe.wan_check_url)?;
        check_url("probe.proxy", &self.probe.proxy)?;
        check_url("probe.intranet_url", &self.probe.intranet_url)?;
        check_url("portal.bootstrap_url", &self.portal.bootstrap_url)?;

        if self.portal.domain.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "portal.domain",
                reason: "must not be empty".into(),
            });
        }
        if self.portal.max_hops == 0 {
            return Err(ConfigError::InvalidValue {
                field: "portal.max_hops",
                reason: "must be at least 1".into(),
            });
        }
        if self.session.check_interval_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "session.check_interval_seconds",
                reason: "must be at least 1".into(),
            });
        }
        if self.session.retry_limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "session.retry_limit",
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}

fn check_url(field: &'static str, value: &str) -> Result<(), ConfigError> {
    Url::parse(value).map(|_| ()).map_err(|_| ConfigError::InvalidUrl {
        field,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [general]

        [probe]
        wan_check_url = "http://odentools.github.io/online/"
        proxy = "http://172.25.250.41:8080/"
        intranet_url = "http://wlanlogin.mc2ed.sjn.osakac.ac.jp/"
        portal_signature = "無線LAN 利用者(認証|確認)ページ"

        [portal]
        bootstrap_url = "http://osakac.ac.jp/"
        domain = "mc2ed.sjn.osakac.ac.jp"

        [session]
    "#;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config: AppConfig = toml::from_str(MINIMAL).unwrap();
        assert_eq!(config.general.request_timeout(), Duration::from_millis(4000));
        assert_eq!(config.portal.login_port, 9998);
        assert_eq!(config.portal.max_hops, 10);
        assert_eq!(config.portal.failure_marker, "auth=failed");
        assert!(!config.portal.verify_tls);
        assert_eq!(config.session.retry_limit, 8);
        assert_eq!(config.session.check_loop_timeout(), Duration::from_secs(60));
        assert!(!config.credentials.to_credentials().is_configured());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_url() {
        let mut config: AppConfig = toml::from_str(MINIMAL).unwrap();
        config.probe.proxy = "not a url".into();
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidUrl {
                field: "probe.proxy",
                value: "not a url".into()
            })
        );
    }

    #[test]
    fn test_validate_rejects_zero_retry_limit() {
        let mut config: AppConfig = toml::from_str(MINIMAL).unwrap();
        config.session.retry_limit = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field: "session.retry_limit", .. })
        ));
    }

    #[test]
    fn test_shipped_default_config_is_valid() {
        let config: AppConfig =
            toml::from_str(include_str!("../../../config/default.toml")).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.probe.proxy, "http://172.25.250.41:8080/");
        assert_eq!(config.general.max_body_size(), 2048 * 1024);
    }
}
