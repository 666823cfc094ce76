#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Mutex;

use harvester_engine::{
    FailureKind, FetchError, FetchSettings, ProxyCredential, RawResponse, Route, Transport,
};
use url::Url;

/// Canned reply for one (path, route) pair.
#[derive(Clone)]
pub enum Reply {
    Page {
        status: u16,
        body: Vec<u8>,
        content_encoding: Option<String>,
    },
    Fail(FailureKind),
    /// The transport itself panics, standing in for a bug mid-record.
    Panic,
}

impl Reply {
    pub fn html(body: &str) -> Self {
        Reply::Page {
            status: 200,
            body: body.as_bytes().to_vec(),
            content_encoding: None,
        }
    }

    pub fn status(status: u16) -> Self {
        Reply::Page {
            status,
            body: Vec::new(),
            content_encoding: None,
        }
    }
}

/// Transport that answers from a script and records every call. Unscripted
/// calls fail with a network error.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: HashMap<(String, Route), Reply>,
    calls: Mutex<Vec<(String, Route)>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, path: &str, route: Route, reply: Reply) -> Self {
        self.replies.insert((path.to_string(), route), reply);
        self
    }

    pub fn calls(&self) -> Vec<(String, Route)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, path: &str) -> Vec<Route> {
        self.calls()
            .into_iter()
            .filter(|(p, _)| p == path)
            .map(|(_, route)| route)
            .collect()
    }
}

#[async_trait::async_trait]
impl Transport for ScriptedTransport {
    async fn get(&self, url: &Url, route: Route) -> Result<RawResponse, FetchError> {
        let path = url.path().to_string();
        self.calls.lock().unwrap().push((path.clone(), route));
        match self.replies.get(&(path, route)) {
            Some(Reply::Page {
                status,
                body,
                content_encoding,
            }) => Ok(RawResponse {
                status: *status,
                content_encoding: content_encoding.clone(),
                content_type: Some("text/html; charset=utf-8".to_string()),
                body: Box::pin(Cursor::new(body.clone())),
            }),
            Some(Reply::Fail(kind)) => Err(FetchError::new(kind.clone(), "scripted failure")),
            Some(Reply::Panic) => panic!("transport bug while fetching {url}"),
            None => Err(FetchError::new(FailureKind::Network, "connection refused")),
        }
    }
}

/// Default settings with `count` proxy credentials.
pub fn settings_with_proxies(count: usize) -> FetchSettings {
    let mut settings = FetchSettings::default();
    settings.proxies.credentials = (0..count)
        .map(|i| ProxyCredential {
            username: format!("user-{}", i + 1),
            password: "secret".to_string(),
        })
        .collect();
    settings
}
