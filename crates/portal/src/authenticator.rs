use std::sync::Arc;

use tracing::{debug, info, warn};
use url::Url;

use wlanauth_core::{
    Credentials, HttpTransport, LoginError, LoginResult, PortalRequest, PortalResponse,
    RedirectKind,
};
use wlanauth_parser::{header_redirect, scan_response, PageScan};

use crate::settings::LoginSettings;

/// Accumulator for one in-flight login. Dropped when the attempt ends.
#[derive(Debug)]
pub struct LoginAttemptState {
    pub hop_count: usize,
    pub base_url: Url,
    pub last_error: Option<LoginError>,
}

impl LoginAttemptState {
    fn new(base_url: Url) -> Self {
        Self {
            hop_count: 0,
            base_url,
            last_error: None,
        }
    }

    fn fail(&mut self, error: LoginError) -> LoginError {
        self.last_error = Some(error.clone());
        error
    }
}

/// Drives bootstrap, credential submission and the redirect chain that
/// follows it. Nothing is retried here.
pub struct CaptivePortalAuthenticator {
    transport: Arc<dyn HttpTransport>,
    credentials: Credentials,
    settings: LoginSettings,
}

impl CaptivePortalAuthenticator {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        credentials: Credentials,
        settings: LoginSettings,
    ) -> Self {
        Self {
            transport,
            credentials,
            settings,
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub async fn login(&self) -> LoginResult {
        info!(user = %self.credentials.username, "starting portal login");
        let result = self.run().await;
        match &result {
            Ok(()) => info!("portal login successful"),
            Err(e) => warn!(error = %e, "portal login failed"),
        }
        result.into()
    }

    async fn run(&self) -> Result<(), LoginError> {
        let base_url = self.bootstrap().await?;
        let mut state = LoginAttemptState::new(base_url);

        let result = match self.submit(&mut state).await {
            Ok(next) => self.resolve_redirects(&mut state, next).await,
            Err(e) => Err(e),
        };
        debug!(hops = state.hop_count, last_error = ?state.last_error, "login attempt finished");
        result
    }

    /// First request of the sequence: the portal is expected to intercept it
    /// and redirect to one of its nodes.
    async fn bootstrap(&self) -> Result<Url, LoginError> {
        let url = self.settings.bootstrap_url.clone();
        debug!(url = %url, "bootstrap GET");
        let req = PortalRequest::get(url, self.settings.timeout)
            .header("User-Agent", self.settings.user_agent.clone());
        let resp = self.transport.execute(&req).await?;

        if resp.is_redirect() {
            let target = header_redirect(&resp).ok_or_else(|| {
                LoginError::UnrecognizedRedirect(resp.header("location").unwrap_or_default().to_string())
            })?;
            return match self.settings.topology.login_base_for(&target) {
                Some(base) => {
                    debug!(location = %target, base = %base, "portal node recognized");
                    Ok(base)
                }
                None => Err(LoginError::UnrecognizedRedirect(target.to_string())),
            };
        }

        match resp.status {
            200 => Err(LoginError::AlreadyAuthenticated),
            status => Err(LoginError::TransportFailure(status)),
        }
    }

    /// POST the credentials; yields the first hop of the redirect chain.
    async fn submit(&self, state: &mut LoginAttemptState) -> Result<Url, LoginError> {
        let url = state
            .base_url
            .join(&self.settings.login_path)
            .map_err(|e| state.fail(LoginError::InvalidUrl(e.to_string())))?;
        debug!(url = %url, "submitting credentials");

        let form = vec![
            ("username".to_string(), self.credentials.username.clone()),
            ("password".to_string(), self.credentials.password.clone()),
            ("submit".to_string(), self.settings.submit_value.clone()),
        ];
        let req = PortalRequest::post_form(url, form, self.settings.timeout)
            .header("User-Agent", self.settings.user_agent.clone())
            .verify_tls(self.settings.verify_tls);
        let resp = self
            .transport
            .execute(&req)
            .await
            .map_err(|e| state.fail(e.into()))?;

        let scan = self.scan(&resp, state);
        match (resp.status, scan.target.kind) {
            (_, RedirectKind::AuthFailureMarker) => Err(state.fail(LoginError::InvalidCredentials)),
            (301 | 302, RedirectKind::Http3xx) | (200, RedirectKind::ScriptRedirect) => {
                Ok(scan.target.url)
            }
            (200, _) => {
                debug!(body = %resp.body, "no redirect in submission response");
                Err(state.fail(LoginError::NoRedirectAfterSubmit))
            }
            (status, _) => Err(state.fail(LoginError::SubmissionFailed(status))),
        }
    }

    /// Follow HTTP and script redirects until a plain 200 page, a rejection,
    /// or the hop limit.
    async fn resolve_redirects(&self, state: &mut LoginAttemptState, mut next: Url) -> Result<(), LoginError> {
        loop {
            if state.hop_count >= self.settings.max_hops {
                warn!(hops = state.hop_count, url = %next, "redirect limit reached");
                return Err(state.fail(LoginError::RedirectLimitExceeded(self.settings.max_hops)));
            }
            state.hop_count += 1;

            debug!(hop = state.hop_count, url = %next, "following redirect");
            let req = PortalRequest::get(next, self.settings.timeout)
                .header("User-Agent", self.settings.user_agent.clone())
                .verify_tls(self.settings.verify_tls);
            let resp = self
                .transport
                .execute(&req)
                .await
                .map_err(|e| state.fail(e.into()))?;

            let scan = self.scan(&resp, state);
            next = match scan.target.kind {
                RedirectKind::AuthFailureMarker => return Err(state.fail(LoginError::InvalidCredentials)),
                RedirectKind::Http3xx | RedirectKind::ScriptRedirect => scan.target.url,
                RedirectKind::Terminal if resp.status == 200 => return Ok(()),
                RedirectKind::Terminal => return Err(state.fail(LoginError::TransportFailure(resp.status))),
            };
        }
    }

    fn scan(&self, resp: &PortalResponse, state: &LoginAttemptState) -> PageScan {
        let scan = scan_response(resp, &state.base_url, &self.settings.marker);
        debug!(status = resp.status, kind = ?scan.target.kind, target = %scan.target.url, "scanned response");
        if let Some(beacon) = &scan.beacon {
            self.fetch_beacon(beacon.clone());
        }
        scan
    }

    /// Load a page asset the way a browser would. Only the log sees the result.
    fn fetch_beacon(&self, url: Url) {
        let transport = Arc::clone(&self.transport);
        let req = PortalRequest::get(url, self.settings.timeout)
            .header("User-Agent", self.settings.user_agent.clone())
            .verify_tls(self.settings.verify_tls);
        tokio::spawn(async move {
            match transport.execute(&req).await {
                Ok(resp) => debug!(url = %req.url, status = resp.status, "beacon fetched"),
                Err(e) => warn!(url = %req.url, error = %e, "beacon fetch failed"),
            }
        });
    }
}
