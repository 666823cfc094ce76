use std::io;
use std::pin::Pin;

use futures_util::TryStreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_ENCODING, CONTENT_TYPE};
use tokio::io::AsyncRead;
use tokio_util::io::StreamReader;
use url::Url;

use crate::fetch::{FetchSettings, TimeoutProfile};
use crate::{FailureKind, FetchError, Route};

/// Raw, still-encoded response body.
pub type BodyReader = Pin<Box<dyn AsyncRead + Send>>;

pub struct RawResponse {
    pub status: u16,
    pub content_encoding: Option<String>,
    pub content_type: Option<String>,
    pub body: BodyReader,
}

/// Issues one GET over one route. Implementations report connection, TLS and
/// timeout problems as `Err`; any HTTP status is an `Ok` response.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &Url, route: Route) -> Result<RawResponse, FetchError>;
}

/// reqwest-backed transport: one client for the direct path and one per proxy
/// credential, all built up front.
pub struct ReqwestTransport {
    direct: RouteClient,
    proxies: Vec<RouteClient>,
}

struct RouteClient {
    client: reqwest::Client,
    timeouts: TimeoutProfile,
}

impl ReqwestTransport {
    pub fn new(settings: &FetchSettings) -> Result<Self, FetchError> {
        let headers = settings.headers.to_header_map()?;
        let direct = RouteClient {
            client: build_client(&settings.direct_timeouts, headers.clone(), None)?,
            timeouts: settings.direct_timeouts.clone(),
        };

        let proxies = settings
            .proxies
            .credentials
            .iter()
            .map(|credential| {
                let proxy_url = settings.proxies.endpoint.url_for(credential);
                let proxy = reqwest::Proxy::all(proxy_url.as_str()).map_err(|err| {
                    FetchError::new(FailureKind::InvalidUrl, format!("proxy {}: {err}", credential.username))
                })?;
                Ok(RouteClient {
                    client: build_client(&settings.proxy_timeouts, headers.clone(), Some(proxy))?,
                    timeouts: settings.proxy_timeouts.clone(),
                })
            })
            .collect::<Result<Vec<_>, FetchError>>()?;

        Ok(Self { direct, proxies })
    }

    fn route_client(&self, route: Route) -> Result<&RouteClient, FetchError> {
        match route {
            Route::Direct => Ok(&self.direct),
            Route::Proxy(index) => self.proxies.get(index).ok_or_else(|| {
                FetchError::new(FailureKind::Network, format!("no proxy configured at {route}"))
            }),
        }
    }
}

fn build_client(
    timeouts: &TimeoutProfile,
    headers: HeaderMap,
    proxy: Option<reqwest::Proxy>,
) -> Result<reqwest::Client, FetchError> {
    let builder = reqwest::Client::builder()
        .default_headers(headers)
        .connect_timeout(timeouts.connect + timeouts.tls_handshake)
        .timeout(timeouts.overall)
        // Target sites are arbitrary third parties; content is wanted, not trust.
        .danger_accept_invalid_certs(true);
    let builder = match proxy {
        Some(proxy) => builder.proxy(proxy),
        None => builder.no_proxy(),
    };
    builder
        .build()
        .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))
}

#[async_trait::async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, url: &Url, route: Route) -> Result<RawResponse, FetchError> {
        let route_client = self.route_client(route)?;
        let deadline = route_client.timeouts.response_headers;

        let response = tokio::time::timeout(deadline, route_client.client.get(url.clone()).send())
            .await
            .map_err(|_| {
                FetchError::new(
                    FailureKind::Timeout,
                    format!("no response headers within {deadline:?}"),
                )
            })?
            .map_err(map_reqwest_error)?;

        let content_encoding = header_str(response.headers(), CONTENT_ENCODING);
        let content_type = header_str(response.headers(), CONTENT_TYPE);
        let status = response.status().as_u16();

        let stream = response.bytes_stream().map_err(io::Error::other);
        Ok(RawResponse {
            status,
            content_encoding,
            content_type,
            body: Box::pin(StreamReader::new(stream)),
        })
    }
}

fn header_str(headers: &HeaderMap, name: HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

pub(crate) fn header_pair(name: &'static str, value: &str) -> Result<(HeaderName, HeaderValue), FetchError> {
    let value = HeaderValue::from_str(value).map_err(|err| {
        FetchError::new(FailureKind::InvalidUrl, format!("header {name}: {err}"))
    })?;
    Ok((HeaderName::from_static(name), value))
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_builder() {
        return FetchError::new(FailureKind::InvalidUrl, err.to_string());
    }
    FetchError::new(FailureKind::Network, err.to_string())
}
