use std::sync::Arc;

use tracing::{debug, info, warn};
use url::Url;

use wlanauth_core::{HttpTransport, PortalRequest, PortalResponse, ProbeOutcome};
use wlanauth_parser::header_redirect;

use crate::settings::ProbeSettings;

/// Classifies reachability from scratch on every call, cheapest test first:
/// direct WAN, WAN through the fixed proxy, then the portal's landing page.
pub struct ConnectivityProbe {
    transport: Arc<dyn HttpTransport>,
    settings: ProbeSettings,
}

impl ConnectivityProbe {
    pub fn new(transport: Arc<dyn HttpTransport>, settings: ProbeSettings) -> Self {
        Self {
            transport,
            settings,
        }
    }

    /// Never fails; every error only moves on to the next tier.
    pub async fn probe(&self) -> ProbeOutcome {
        if let Some(outcome) = self.direct_wan().await {
            info!(%outcome, tier = "direct", "probe finished");
            return outcome;
        }

        if self.proxied_wan().await {
            info!(outcome = %ProbeOutcome::Authenticated, tier = "proxy", "probe finished");
            return ProbeOutcome::Authenticated;
        }

        let outcome = if self.intranet().await {
            ProbeOutcome::PortalBlocking
        } else {
            ProbeOutcome::Indeterminate
        };
        info!(%outcome, tier = "intranet", "probe finished");
        outcome
    }

    async fn direct_wan(&self) -> Option<ProbeOutcome> {
        debug!(url = %self.settings.wan_check_url, "checking WAN without proxy");
        let resp = self.fetch(self.wan_request(None)).await?;

        if resp.status == 200 {
            if self.settings.signature.matches(&resp.body) {
                debug!("WAN check answered by the portal landing page");
                return Some(ProbeOutcome::PortalBlocking);
            }
            return Some(ProbeOutcome::Authenticated);
        }

        if let Some(target) = header_redirect(&resp) {
            if self.settings.topology.is_portal_node(&target) {
                debug!(location = %target, "WAN check redirected to portal");
                return Some(ProbeOutcome::PortalBlocking);
            }
            debug!(location = %target, "WAN check redirected elsewhere");
        }

        debug!(status = resp.status, "WAN check inconclusive");
        None
    }

    async fn proxied_wan(&self) -> bool {
        debug!(proxy = %self.settings.proxy, "checking WAN through proxy");
        let req = self.wan_request(Some(self.settings.proxy.clone()));
        matches!(self.fetch(req).await, Some(resp) if resp.status == 200)
    }

    async fn intranet(&self) -> bool {
        debug!(url = %self.settings.intranet_url, "checking portal landing page");
        let req = PortalRequest::get(self.settings.intranet_url.clone(), self.settings.timeout)
            .header("User-Agent", self.settings.user_agent.clone());
        matches!(self.fetch(req).await, Some(resp) if resp.status == 200)
    }

    async fn fetch(&self, req: PortalRequest) -> Option<PortalResponse> {
        match self.transport.execute(&req).await {
            Ok(resp) => Some(resp),
            Err(e) => {
                warn!(url = %req.url, proxied = req.proxy.is_some(), error = %e, "probe request failed");
                None
            }
        }
    }

    fn wan_request(&self, proxy: Option<String>) -> PortalRequest {
        let url = cache_busted(&self.settings.wan_check_url, chrono::Utc::now().timestamp_millis());
        let host = host_header(&url);
        let mut req = PortalRequest::get(url, self.settings.timeout)
            .header("User-Agent", self.settings.user_agent.clone())
            .proxy(proxy);
        if let Some(host) = host {
            req = req.header("Host", host);
        }
        req
    }
}

fn cache_busted(url: &Url, millis: i64) -> Url {
    let mut url = url.clone();
    url.query_pairs_mut()
        .append_pair("action", "check-wan-connection")
        .append_pair("t", &millis.to_string());
    url
}

fn host_header(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}
