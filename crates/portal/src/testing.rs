//! Scripted in-memory transport for exercising the protocol engine.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use url::Url;

use wlanauth_core::config::{
    CredentialsConfig, GeneralConfig, PortalConfig, ProbeConfig, SessionConfig,
};
use wlanauth_core::{AppConfig, HttpTransport, Method, PortalRequest, PortalResponse, TransportError};

pub const WAN: &str = "http://odentools.github.io/online/";
pub const PROXY: &str = "http://172.25.250.41:8080/";
pub const INTRANET: &str = "http://wlanlogin.mc2ed.sjn.osakac.ac.jp/";
pub const BOOTSTRAP: &str = "http://osakac.ac.jp/";

pub fn test_config() -> AppConfig {
    AppConfig {
        general: GeneralConfig {
            user_agent: "wlanauth-test".into(),
            request_timeout_ms: 4000,
            max_body_size_kb: 64,
        },
        credentials: CredentialsConfig {
            username: "mt15a000".into(),
            password: "test".into(),
        },
        probe: ProbeConfig {
            wan_check_url: WAN.into(),
            proxy: PROXY.into(),
            intranet_url: INTRANET.into(),
            portal_signature: "無線LAN 利用者(認証|確認)ページ".into(),
        },
        portal: PortalConfig {
            bootstrap_url: BOOTSTRAP.into(),
            domain: "mc2ed.sjn.osakac.ac.jp".into(),
            login_port: 9998,
            login_path: "/login".into(),
            submit_value: "Login".into(),
            verify_tls: false,
            max_hops: 10,
            failure_marker: "auth=failed".into(),
        },
        session: SessionConfig {
            check_interval_seconds: 2,
            check_loop_timeout_seconds: 60,
            retry_limit: 8,
        },
    }
}

pub type Reply = Result<(u16, Vec<(String, String)>, String), TransportError>;

pub mod reply {
    use super::Reply;

    pub fn ok(body: &str) -> Reply {
        Ok((200, Vec::new(), body.to_string()))
    }

    pub fn redirect(status: u16, location: &str) -> Reply {
        Ok((status, vec![("location".into(), location.to_string())], String::new()))
    }

    pub fn status(status: u16) -> Reply {
        Ok((status, Vec::new(), String::new()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RouteKey {
    method: Method,
    proxied: bool,
    target: String,
}

impl RouteKey {
    fn new(method: Method, proxied: bool, url: &str) -> Self {
        let url = Url::parse(url).expect("route url");
        Self::of(method, proxied, &url)
    }

    fn of(method: Method, proxied: bool, url: &Url) -> Self {
        let mut target = url.clone();
        target.set_query(None);
        target.set_fragment(None);
        Self {
            method,
            proxied,
            target: target.to_string(),
        }
    }
}

/// Replays queued replies per route; the last reply of a route repeats.
/// Unknown routes fail like an unreachable host.
#[derive(Default)]
pub struct ScriptedTransport {
    routes: Mutex<HashMap<RouteKey, VecDeque<Reply>>>,
    requests: Mutex<Vec<PortalRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn on_get(&self, url: &str, reply: Reply) {
        self.push(RouteKey::new(Method::Get, false, url), reply);
    }

    pub fn on_get_via_proxy(&self, url: &str, reply: Reply) {
        self.push(RouteKey::new(Method::Get, true, url), reply);
    }

    pub fn on_post(&self, url: &str, reply: Reply) {
        self.push(RouteKey::new(Method::Post, false, url), reply);
    }

    pub fn requests(&self) -> Vec<PortalRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self, method: Method, url: &str) -> usize {
        let key = RouteKey::new(method, false, url);
        self.requests()
            .iter()
            .filter(|r| RouteKey::of(r.method, r.proxy.is_some(), &r.url) == key)
            .count()
    }

    fn push(&self, key: RouteKey, reply: Reply) {
        self.routes.lock().unwrap().entry(key).or_default().push_back(reply);
    }

    fn next_reply(&self, key: &RouteKey) -> Option<Reply> {
        let mut routes = self.routes.lock().unwrap();
        let queue = routes.get_mut(key)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn execute(&self, request: &PortalRequest) -> Result<PortalResponse, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        let key = RouteKey::of(request.method, request.proxy.is_some(), &request.url);

        let (status, headers, body) = self
            .next_reply(&key)
            .unwrap_or_else(|| Err(TransportError::Connect(format!("no route to {}", key.target))))?;

        Ok(PortalResponse {
            url: request.url.clone(),
            status,
            headers: headers.into_iter().collect(),
            body,
            fetched_at: chrono::Utc::now(),
            response_time_ms: 0,
        })
    }
}
