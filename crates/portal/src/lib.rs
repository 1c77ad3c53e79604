pub mod authenticator;
pub mod probe;
pub mod settings;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use wlanauth_core::{AppConfig, ConfigError, Credentials, HttpTransport, LoginResult, ProbeOutcome};

pub use self::authenticator::{CaptivePortalAuthenticator, LoginAttemptState};
pub use self::probe::ConnectivityProbe;
pub use self::settings::{LoginSettings, ProbeSettings};

/// Probe and authenticator sharing one transport and one set of credentials.
pub struct Portal {
    probe: ConnectivityProbe,
    authenticator: CaptivePortalAuthenticator,
}

impl Portal {
    pub fn new(probe: ConnectivityProbe, authenticator: CaptivePortalAuthenticator) -> Self {
        Self {
            probe,
            authenticator,
        }
    }

    pub fn from_config(
        config: &AppConfig,
        credentials: Credentials,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self, ConfigError> {
        let probe = ConnectivityProbe::new(transport.clone(), ProbeSettings::from_config(config)?);
        let authenticator = CaptivePortalAuthenticator::new(
            transport,
            credentials,
            LoginSettings::from_config(config)?,
        );
        Ok(Self::new(probe, authenticator))
    }

    pub fn credentials(&self) -> &Credentials {
        self.authenticator.credentials()
    }

    pub async fn probe(&self) -> ProbeOutcome {
        self.probe.probe().await
    }

    pub async fn login(&self) -> LoginResult {
        self.authenticator.login().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{reply, test_config, ScriptedTransport, BOOTSTRAP, WAN};

    #[tokio::test]
    async fn test_probe_then_login_scenario() {
        let t = ScriptedTransport::new();
        t.on_get(WAN, reply::ok("<title>無線LAN 利用者認証ページ</title>"));
        t.on_get(
            BOOTSTRAP,
            reply::redirect(302, "http://mcwlct1s.mc2ed.sjn.osakac.ac.jp/user/index.jsp"),
        );
        t.on_post(
            "https://mcwlct1s.mc2ed.sjn.osakac.ac.jp:9998/login",
            reply::redirect(302, "https://mcwlct1s.mc2ed.sjn.osakac.ac.jp:9998/user/welcome.jsp"),
        );
        t.on_get(
            "https://mcwlct1s.mc2ed.sjn.osakac.ac.jp:9998/user/welcome.jsp",
            reply::ok("<html><body>Authenticated</body></html>"),
        );

        let config = test_config();
        let portal = Portal::from_config(&config, config.credentials.to_credentials(), t.clone()).unwrap();

        assert_eq!(portal.probe().await, ProbeOutcome::PortalBlocking);
        let result = portal.login().await;
        assert!(result.successful, "{:?}", result.error);
        assert!(result.error.is_none());
    }

    #[test]
    fn test_bad_signature_rejected_at_construction() {
        let mut config = test_config();
        config.probe.portal_signature = "(".into();
        let t = ScriptedTransport::new();
        assert!(Portal::from_config(&config, config.credentials.to_credentials(), t).is_err());
    }
}
