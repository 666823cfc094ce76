use std::sync::Arc;
use std::time::Duration;

use harvest_logging::{harvest_debug, harvest_trace};
use reqwest::header::HeaderMap;
use url::Url;

use crate::decode::{decode_body, ContentEncoding};
use crate::transport::{header_pair, ReqwestTransport, Transport};
use crate::{FailureKind, FetchError, FetchOutcome, FetchedPage, Route};

/// Layered timeouts for one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeoutProfile {
    pub connect: Duration,
    pub tls_handshake: Duration,
    pub response_headers: Duration,
    pub overall: Duration,
}

impl TimeoutProfile {
    pub fn direct() -> Self {
        Self {
            connect: Duration::from_secs(2),
            tls_handshake: Duration::from_secs(2),
            response_headers: Duration::from_secs(3),
            overall: Duration::from_secs(5),
        }
    }

    pub fn proxy() -> Self {
        Self {
            connect: Duration::from_secs(1),
            tls_handshake: Duration::from_secs(2),
            response_headers: Duration::from_secs(2),
            overall: Duration::from_secs(3),
        }
    }
}

/// Browser-like request headers sent on every attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderProfile {
    pub user_agent: String,
    pub accept: String,
    pub accept_language: String,
    pub referer: String,
}

impl Default for HeaderProfile {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36".to_string(),
            accept: "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8".to_string(),
            accept_language: "en-US,en;q=0.9".to_string(),
            referer: "https://www.google.com/".to_string(),
        }
    }
}

impl HeaderProfile {
    pub fn to_header_map(&self) -> Result<HeaderMap, FetchError> {
        let pairs = [
            header_pair("user-agent", &self.user_agent)?,
            header_pair("accept", &self.accept)?,
            header_pair("accept-language", &self.accept_language)?,
            header_pair("accept-encoding", "gzip, deflate, br")?,
            header_pair("connection", "keep-alive")?,
            header_pair("referer", &self.referer)?,
            header_pair("upgrade-insecure-requests", "1")?,
            header_pair("cache-control", "max-age=0")?,
            header_pair("pragma", "no-cache")?,
        ];
        Ok(pairs.into_iter().collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyCredential {
    pub username: String,
    pub password: String,
}

/// Where the rotating proxy lives; credentials pick the exit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyEndpoint {
    pub scheme: String,
    pub host: String,
    pub port: u16,
}

impl Default for ProxyEndpoint {
    fn default() -> Self {
        Self {
            scheme: "socks5".to_string(),
            host: "p.webshare.io".to_string(),
            port: 80,
        }
    }
}

impl ProxyEndpoint {
    pub fn url_for(&self, credential: &ProxyCredential) -> String {
        format!(
            "{}://{}:{}@{}:{}",
            self.scheme,
            url_component(&credential.username),
            url_component(&credential.password),
            self.host,
            self.port
        )
    }
}

fn url_component(raw: &str) -> String {
    url::form_urlencoded::byte_serialize(raw.as_bytes()).collect()
}

/// Ordered credentials; order is failover precedence.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProxyPool {
    pub endpoint: ProxyEndpoint,
    pub credentials: Vec<ProxyCredential>,
}

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub headers: HeaderProfile,
    pub direct_timeouts: TimeoutProfile,
    pub proxy_timeouts: TimeoutProfile,
    /// Bound on any single body read while decoding.
    pub read_deadline: Duration,
    pub max_bytes: u64,
    pub proxies: ProxyPool,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            headers: HeaderProfile::default(),
            direct_timeouts: TimeoutProfile::direct(),
            proxy_timeouts: TimeoutProfile::proxy(),
            read_deadline: Duration::from_secs(3),
            max_bytes: 5 * 1024 * 1024,
            proxies: ProxyPool::default(),
        }
    }
}

/// `Direct → Proxy(0) → … → Proxy(n-1) → Exhausted`; every failure moves one
/// step forward, `Exhausted` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailoverState {
    Direct,
    Proxy(usize),
    Exhausted,
}

impl FailoverState {
    pub fn advance(self, proxy_count: usize) -> Self {
        match self {
            FailoverState::Direct if proxy_count > 0 => FailoverState::Proxy(0),
            FailoverState::Proxy(index) if index + 1 < proxy_count => FailoverState::Proxy(index + 1),
            _ => FailoverState::Exhausted,
        }
    }

    pub fn route(self) -> Option<Route> {
        match self {
            FailoverState::Direct => Some(Route::Direct),
            FailoverState::Proxy(index) => Some(Route::Proxy(index)),
            FailoverState::Exhausted => None,
        }
    }
}

pub struct Fetcher {
    settings: FetchSettings,
    transport: Arc<dyn Transport>,
}

impl Fetcher {
    /// Fetcher over the real network.
    pub fn new(settings: FetchSettings) -> Result<Self, FetchError> {
        let transport = Arc::new(ReqwestTransport::new(&settings)?);
        Ok(Self::with_transport(settings, transport))
    }

    pub fn with_transport(settings: FetchSettings, transport: Arc<dyn Transport>) -> Self {
        Self {
            settings,
            transport,
        }
    }

    /// Username behind a route, for log lines.
    pub fn route_label(&self, route: Route) -> String {
        match route {
            Route::Direct => route.to_string(),
            Route::Proxy(index) => match self.settings.proxies.credentials.get(index) {
                Some(credential) => format!("{route} ({})", credential.username),
                None => route.to_string(),
            },
        }
    }

    /// Run the failover chain for `url` until one attempt succeeds.
    ///
    /// Non-200 statuses and network errors advance the chain; a decode error
    /// ends it, since the declared encoding is trusted. With no proxies
    /// configured the direct failure is returned as-is.
    pub async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        let proxy_count = self.settings.proxies.credentials.len();
        let mut state = FailoverState::Direct;
        let mut attempts = 0;
        let mut last_error = None;

        while let Some(route) = state.route() {
            attempts += 1;
            let outcome = self.attempt(url, route).await;
            harvest_trace!("{} via {}: {}", url, self.route_label(route), outcome);
            if !outcome.triggers_failover() {
                return match outcome {
                    FetchOutcome::Success(page) => Ok(page),
                    other => Err(other
                        .into_error()
                        .unwrap_or_else(|| FetchError::new(FailureKind::Decode, "decode failed"))),
                };
            }
            last_error = outcome.into_error();
            state = state.advance(proxy_count);
        }

        let last = last_error
            .unwrap_or_else(|| FetchError::new(FailureKind::Network, "no attempt was made"));
        if proxy_count == 0 {
            return Err(last);
        }
        harvest_debug!("{} exhausted {} attempts, last: {}", url, attempts, last);
        Err(FetchError::new(
            FailureKind::ProxyExhausted { attempts },
            format!("last attempt failed with {last}"),
        ))
    }

    /// One attempt over one route, including decoding of the body.
    pub async fn attempt(&self, url: &Url, route: Route) -> FetchOutcome {
        let response = match self.transport.get(url, route).await {
            Ok(response) => response,
            Err(cause) => return FetchOutcome::NetworkError { cause },
        };
        if response.status != 200 {
            return FetchOutcome::NonSuccessStatus {
                code: response.status,
            };
        }

        let encoding = ContentEncoding::from_header(response.content_encoding.as_deref());
        match decode_body(
            response.body,
            encoding,
            self.settings.read_deadline,
            self.settings.max_bytes,
        )
        .await
        {
            Ok(body) => FetchOutcome::Success(FetchedPage {
                status: response.status,
                body,
                content_encoding: encoding,
                content_type: response.content_type,
                via: route,
            }),
            Err(cause) => FetchOutcome::DecodeError { cause },
        }
    }
}
