//! RON run configuration and its mapping onto the engine settings.
//!
//! Every field is optional in the file; missing ones take the defaults
//! below. CLI flags are applied on top with [`AppConfig::apply_cli`].

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use harvest_logging::{LogDestination, DEFAULT_LOG_FILE};
use harvester_core::LinkColumn;
use harvester_engine::{
    FetchSettings, HeaderProfile, NameSubstitution, PipelineConfig, ProxyCredential,
    ProxyEndpoint, ProxyPool, TimeoutProfile, DEFAULT_SECONDARY_LINK_SELECTOR,
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::cli::Cli;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
pub enum RunMode {
    /// Fetch each company's own website (Link2).
    #[default]
    Contact,
    /// Fetch the listing detail page (Link1) and pick up the website link.
    Detail,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub inputs: Vec<PathBuf>,
    pub output_dir: PathBuf,
    pub max_concurrency: usize,
    pub mode: RunMode,
    pub base_url: Option<String>,
    /// Overrides the mode preset when set.
    pub script_prepass: Option<bool>,
    /// Overrides the mode preset when set.
    pub secondary_link_selector: Option<String>,
    pub placeholder_denylist: Vec<String>,
    pub reject_static_resources: bool,
    pub rename: Option<RenameConfig>,
    pub fetch: FetchConfig,
    pub proxy: ProxyConfig,
    pub log: LogConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            inputs: Vec::new(),
            output_dir: PathBuf::from("output"),
            max_concurrency: 100,
            mode: RunMode::Contact,
            base_url: None,
            script_prepass: None,
            secondary_link_selector: None,
            placeholder_denylist: Vec::new(),
            reject_static_resources: true,
            rename: None,
            fetch: FetchConfig::default(),
            proxy: ProxyConfig::default(),
            log: LogConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameConfig {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub user_agent: Option<String>,
    pub read_deadline_ms: u64,
    pub max_body_bytes: u64,
    #[serde(default = "TimeoutConfig::direct")]
    pub direct: TimeoutConfig,
    #[serde(default = "TimeoutConfig::proxy")]
    pub proxy: TimeoutConfig,
}

impl Default for FetchConfig {
    fn default() -> Self {
        let settings = FetchSettings::default();
        Self {
            user_agent: None,
            read_deadline_ms: millis(settings.read_deadline),
            max_body_bytes: settings.max_bytes,
            direct: TimeoutConfig::direct(),
            proxy: TimeoutConfig::proxy(),
        }
    }
}

/// Timeout profile in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutConfig {
    pub connect_ms: u64,
    pub tls_handshake_ms: u64,
    pub response_headers_ms: u64,
    pub overall_ms: u64,
}

impl TimeoutConfig {
    fn direct() -> Self {
        Self::from_profile(&TimeoutProfile::direct())
    }

    fn proxy() -> Self {
        Self::from_profile(&TimeoutProfile::proxy())
    }

    fn from_profile(profile: &TimeoutProfile) -> Self {
        Self {
            connect_ms: millis(profile.connect),
            tls_handshake_ms: millis(profile.tls_handshake),
            response_headers_ms: millis(profile.response_headers),
            overall_ms: millis(profile.overall),
        }
    }

    fn to_profile(&self) -> TimeoutProfile {
        TimeoutProfile {
            connect: Duration::from_millis(self.connect_ms),
            tls_handshake: Duration::from_millis(self.tls_handshake_ms),
            response_headers: Duration::from_millis(self.response_headers_ms),
            overall: Duration::from_millis(self.overall_ms),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub scheme: String,
    pub host: String,
    pub port: u16,
    /// Tried in this order after the direct attempt fails.
    pub credentials: Vec<CredentialConfig>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        let endpoint = ProxyEndpoint::default();
        Self {
            scheme: endpoint.scheme,
            host: endpoint.host,
            port: endpoint.port,
            credentials: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialConfig {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub file: PathBuf,
    pub to_file: bool,
    pub to_terminal: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from(DEFAULT_LOG_FILE),
            to_file: true,
            to_terminal: true,
        }
    }
}

impl LogConfig {
    pub fn destination(&self) -> LogDestination {
        match (self.to_terminal, self.to_file) {
            (true, true) => LogDestination::Both(self.file.clone()),
            (false, true) => LogDestination::File(self.file.clone()),
            (true, false) => LogDestination::Terminal,
            (false, false) => LogDestination::Off,
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl AppConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("cannot read config file {}", path.display()))?;
        Self::from_ron(&text).with_context(|| format!("cannot parse config file {}", path.display()))
    }

    pub fn from_ron(text: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(text)
    }

    pub fn apply_cli(&mut self, cli: &Cli) {
        self.inputs.extend(cli.inputs.iter().cloned());
        if let Some(dir) = &cli.output_dir {
            self.output_dir = dir.clone();
        }
        if let Some(limit) = cli.max_concurrency {
            self.max_concurrency = limit;
        }
        if let Some(mode) = cli.mode {
            self.mode = mode;
        }
        if let Some(base) = &cli.base_url {
            self.base_url = Some(base.clone());
        }
        if let Some(file) = &cli.log_file {
            self.log.file = file.clone();
        }
        if cli.no_log_file {
            self.log.to_file = false;
        }
        if cli.quiet {
            self.log.to_terminal = false;
        }
    }

    pub fn pipeline_config(&self) -> anyhow::Result<PipelineConfig> {
        let detail = self.mode == RunMode::Detail;
        let base_url = self
            .base_url
            .as_deref()
            .map(Url::parse)
            .transpose()
            .context("invalid base_url")?;
        Ok(PipelineConfig {
            output_dir: self.output_dir.clone(),
            max_concurrency: self.max_concurrency,
            link_column: if detail {
                LinkColumn::Source
            } else {
                LinkColumn::Target
            },
            base_url,
            script_prepass: self.script_prepass.unwrap_or(detail),
            secondary_link_selector: self
                .secondary_link_selector
                .clone()
                .or_else(|| detail.then(|| DEFAULT_SECONDARY_LINK_SELECTOR.to_string())),
            placeholder_denylist: self.placeholder_denylist.clone(),
            reject_static_resources: self.reject_static_resources,
            rename: self.rename.as_ref().map(|rename| NameSubstitution {
                from: rename.from.clone(),
                to: rename.to.clone(),
            }),
        })
    }

    pub fn fetch_settings(&self) -> FetchSettings {
        let mut headers = HeaderProfile::default();
        if let Some(agent) = &self.fetch.user_agent {
            headers.user_agent = agent.clone();
        }
        FetchSettings {
            headers,
            direct_timeouts: self.fetch.direct.to_profile(),
            proxy_timeouts: self.fetch.proxy.to_profile(),
            read_deadline: Duration::from_millis(self.fetch.read_deadline_ms),
            max_bytes: self.fetch.max_body_bytes,
            proxies: ProxyPool {
                endpoint: ProxyEndpoint {
                    scheme: self.proxy.scheme.clone(),
                    host: self.proxy.host.clone(),
                    port: self.proxy.port,
                },
                credentials: self
                    .proxy
                    .credentials
                    .iter()
                    .map(|credential| ProxyCredential {
                        username: credential.username.clone(),
                        password: credential.password.clone(),
                    })
                    .collect(),
            },
        }
    }
}
