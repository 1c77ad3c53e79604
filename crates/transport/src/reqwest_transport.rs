use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::{debug, warn};

use wlanauth_core::{HttpTransport, Method, PortalRequest, PortalResponse, TransportError};

/// reqwest fixes proxy, TLS and redirect policy at build time, so one client
/// is kept per combination.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ClientKey {
    proxy: Option<String>,
    verify_tls: bool,
    follow_redirects: bool,
}

impl ClientKey {
    fn of(request: &PortalRequest) -> Self {
        Self {
            proxy: request.proxy.clone(),
            verify_tls: request.verify_tls,
            follow_redirects: request.follow_redirects,
        }
    }
}

pub struct ReqwestTransport {
    clients: DashMap<ClientKey, reqwest::Client>,
    connect_timeout: Duration,
    max_body_size: usize,
}

impl ReqwestTransport {
    pub fn new(connect_timeout: Duration, max_body_size: usize) -> Self {
        Self {
            clients: DashMap::new(),
            connect_timeout,
            max_body_size,
        }
    }

    fn client_for(&self, request: &PortalRequest) -> Result<reqwest::Client, TransportError> {
        let key = ClientKey::of(request);
        if let Some(client) = self.clients.get(&key) {
            return Ok(client.clone());
        }

        let client = build_client(&key, self.connect_timeout)?;
        debug!(proxy = ?key.proxy, verify_tls = key.verify_tls, "built http client");
        self.clients.insert(key, client.clone());
        Ok(client)
    }
}

fn build_client(key: &ClientKey, connect_timeout: Duration) -> Result<reqwest::Client, TransportError> {
    let redirect = if key.follow_redirects {
        reqwest::redirect::Policy::limited(10)
    } else {
        reqwest::redirect::Policy::none()
    };

    // The portal's interception matches header names case-sensitively,
    // so send them as a browser would. No cookie jar and no idle pool:
    // every exchange starts without state from the previous attempt.
    let mut builder = reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .connect_timeout(connect_timeout)
        .http1_title_case_headers()
        .danger_accept_invalid_certs(!key.verify_tls)
        .redirect(redirect);

    builder = match &key.proxy {
        Some(addr) => {
            let proxy = reqwest::Proxy::all(addr.as_str())
                .map_err(|e| TransportError::Proxy(e.to_string()))?;
            builder.proxy(proxy)
        }
        None => builder.no_proxy(),
    };

    builder
        .build()
        .map_err(|e| TransportError::Network(e.to_string()))
}

fn classify_error(error: &reqwest::Error, timeout: Duration) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout(timeout.as_millis() as u64)
    } else if error.is_connect() {
        TransportError::Connect(error.to_string())
    } else {
        TransportError::Network(error.to_string())
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    fn name(&self) -> &str {
        "reqwest"
    }

    async fn execute(&self, request: &PortalRequest) -> Result<PortalResponse, TransportError> {
        let start = Instant::now();
        let client = self.client_for(request)?;
        debug!(method = %request.method, url = %request.url, proxy = ?request.proxy, "sending request");

        let mut builder = match request.method {
            Method::Get => client.get(request.url.as_str()),
            Method::Post => client.post(request.url.as_str()).form(&request.form),
        };
        builder = builder.timeout(request.timeout);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let resp = builder.send().await.map_err(|e| {
            warn!(url = %request.url, error = %e, "request failed");
            classify_error(&e, request.timeout)
        })?;

        let status = resp.status().as_u16();

        let mut headers = HashMap::new();
        for (k, v) in resp.headers() {
            if let Ok(val) = v.to_str() {
                headers.insert(k.as_str().to_string(), val.to_string());
            }
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| classify_error(&e, request.timeout))?;

        if body.len() > self.max_body_size {
            return Err(TransportError::BodyTooLarge {
                size: body.len(),
                max: self.max_body_size,
            });
        }

        let elapsed = start.elapsed();
        debug!(url = %request.url, status, elapsed_ms = elapsed.as_millis() as u64, "response received");

        Ok(PortalResponse {
            url: request.url.clone(),
            status,
            headers,
            body: String::from_utf8_lossy(&body).into_owned(),
            fetched_at: chrono::Utc::now(),
            response_time_ms: elapsed.as_millis() as u64,
        })
    }
}
