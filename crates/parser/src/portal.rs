use regex::Regex;
use url::Url;

use wlanauth_core::ConfigError;

/// Maps a numbered portal node host (`mcwlct<N>s.<domain>`) to the HTTPS base
/// that accepts the login form for that node.
#[derive(Debug, Clone)]
pub struct PortalTopology {
    node_re: Regex,
    domain: String,
    login_port: u16,
}

impl PortalTopology {
    pub fn new(domain: &str, login_port: u16) -> Result<Self, ConfigError> {
        let domain = domain.trim().trim_matches('.').to_ascii_lowercase();
        let pattern = format!(r"^mcwlct(\d+)s\.{}$", regex::escape(&domain));
        let node_re = Regex::new(&pattern).map_err(|e| ConfigError::InvalidValue {
            field: "portal.domain",
            reason: e.to_string(),
        })?;
        Ok(Self {
            node_re,
            domain,
            login_port,
        })
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Login-submission base for a redirect target, or `None` when the target
    /// is not one of this portal's nodes.
    pub fn login_base(&self, location: &str) -> Option<Url> {
        let target = Url::parse(location.trim()).ok()?;
        self.login_base_for(&target)
    }

    pub fn login_base_for(&self, target: &Url) -> Option<Url> {
        let host = target.host_str()?.to_ascii_lowercase();
        let node = self.node_re.captures(&host)?.get(1)?.as_str().to_string();
        Url::parse(&format!(
            "https://mcwlct{}s.{}:{}",
            node, self.domain, self.login_port
        ))
        .ok()
    }

    pub fn is_portal_node(&self, target: &Url) -> bool {
        self.login_base_for(target).is_some()
    }
}

/// Text that only appears on the portal's own landing page.
#[derive(Debug, Clone)]
pub struct LandingSignature(Regex);

impl LandingSignature {
    pub fn new(pattern: &str) -> Result<Self, ConfigError> {
        Regex::new(pattern)
            .map(Self)
            .map_err(|e| ConfigError::InvalidValue {
                field: "probe.portal_signature",
                reason: e.to_string(),
            })
    }

    pub fn matches(&self, body: &str) -> bool {
        self.0.is_match(body)
    }
}
