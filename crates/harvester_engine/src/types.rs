use std::fmt;

use crate::decode::{ContentEncoding, DecodeError};

/// Which network path served (or was tried for) a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Direct,
    /// Index into the configured proxy credential list.
    Proxy(usize),
}

impl Route {
    pub fn is_proxy(&self) -> bool {
        matches!(self, Route::Proxy(_))
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Direct => write!(f, "direct"),
            Route::Proxy(index) => write!(f, "proxy {}", index + 1),
        }
    }
}

/// A successful response with its body already decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub status: u16,
    pub body: Vec<u8>,
    pub content_encoding: ContentEncoding,
    pub content_type: Option<String>,
    pub via: Route,
}

/// Outcome of a single attempt (direct, or one proxy).
#[derive(Debug)]
pub enum FetchOutcome {
    Success(FetchedPage),
    NonSuccessStatus { code: u16 },
    NetworkError { cause: FetchError },
    DecodeError { cause: DecodeError },
}

impl FetchOutcome {
    /// Failed attempts of these kinds move the failover chain forward.
    pub fn triggers_failover(&self) -> bool {
        matches!(
            self,
            FetchOutcome::NonSuccessStatus { .. } | FetchOutcome::NetworkError { .. }
        )
    }

    pub(crate) fn into_error(self) -> Option<FetchError> {
        match self {
            FetchOutcome::Success(_) => None,
            FetchOutcome::NonSuccessStatus { code } => Some(FetchError::new(
                FailureKind::HttpStatus(code),
                format!("http status {code}"),
            )),
            FetchOutcome::NetworkError { cause } => Some(cause),
            FetchOutcome::DecodeError { cause } => {
                Some(FetchError::new(FailureKind::Decode, cause.to_string()))
            }
        }
    }
}

impl fmt::Display for FetchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchOutcome::Success(page) => write!(f, "status {} via {}", page.status, page.via),
            FetchOutcome::NonSuccessStatus { code } => write!(f, "status {code}"),
            FetchOutcome::NetworkError { cause } => write!(f, "{}: {}", cause.kind, cause.message),
            FetchOutcome::DecodeError { cause } => write!(f, "decode error: {cause}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    LinkMissing,
    InvalidUrl,
    Network,
    Timeout,
    HttpStatus(u16),
    Decode,
    Parse,
    ProxyExhausted { attempts: usize },
    /// The record's task panicked.
    Aborted,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::LinkMissing => write!(f, "link missing"),
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Decode => write!(f, "decode error"),
            FailureKind::Parse => write!(f, "parse error"),
            FailureKind::ProxyExhausted { attempts } => {
                write!(f, "all {attempts} attempts failed")
            }
            FailureKind::Aborted => write!(f, "aborted"),
        }
    }
}

/// What one record ended up as. Exactly one staging row is written per outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordOutcome {
    pub index: usize,
    pub identifier: String,
    pub email: String,
    /// Route that served the page, if any page was fetched.
    pub via: Option<Route>,
    pub failure: Option<FailureKind>,
}

impl RecordOutcome {
    pub fn used_proxy(&self) -> bool {
        self.via.is_some_and(|route| route.is_proxy())
    }
}
