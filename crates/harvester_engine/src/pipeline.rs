use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use harvest_logging::{harvest_debug, harvest_info, harvest_warn};
use harvester_core::{
    parse_records, resolve_link, EmailExtractor, ExtractionPlan, LinkColumn, Record, RecordError,
    RunSummary, ScriptObfuscation, StagingRow,
};
use scraper::Selector;
use thiserror::Error;
use url::Url;

use crate::charset::decode_text;
use crate::dispatch::{Dispatcher, RecordJob};
use crate::fetch::{FetchSettings, Fetcher};
use crate::finalize::{finalize, FinalizeError};
use crate::page::{parse_selector, PageDocument};
use crate::persist::{ensure_output_dir, PersistError};
use crate::sink::{SinkError, SinkHandle, StagingSink};
use crate::transport::Transport;
use crate::{FailureKind, FetchError, RecordOutcome, Route};

/// Prefix of the staging artifact next to the final one.
pub const STAGING_PREFIX: &str = "temp_";

/// Replace `from` with `to` (first occurrence) in the input file name to name
/// the output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameSubstitution {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub output_dir: PathBuf,
    pub max_concurrency: usize,
    pub link_column: LinkColumn,
    /// Base for relative links (detail pages are usually site-relative).
    pub base_url: Option<Url>,
    /// Run the `let eee` / `mailto:` pre-pass on the raw markup.
    pub script_prepass: bool,
    /// Selector for the website link on detail pages.
    pub secondary_link_selector: Option<String>,
    pub placeholder_denylist: Vec<String>,
    pub reject_static_resources: bool,
    pub rename: Option<NameSubstitution>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            max_concurrency: 100,
            link_column: LinkColumn::Target,
            base_url: None,
            script_prepass: false,
            secondary_link_selector: None,
            placeholder_denylist: Vec::new(),
            reject_static_resources: true,
            rename: None,
        }
    }
}

impl PipelineConfig {
    fn extraction_plan(&self) -> ExtractionPlan {
        ExtractionPlan {
            extractor: EmailExtractor::new(self.reject_static_resources),
            script: self.script_prepass.then(ScriptObfuscation::default),
            placeholder_denylist: self.placeholder_denylist.clone(),
        }
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("cannot open input {path}: {source}")]
    OpenInput {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot parse input {path}: {source}")]
    ParseInput { path: PathBuf, source: RecordError },
    #[error("input path has no file name: {0}")]
    InputName(PathBuf),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error(transparent)]
    Persist(#[from] PersistError),
    #[error(transparent)]
    Sink(#[from] SinkError),
    #[error(transparent)]
    Finalize(#[from] FinalizeError),
    #[error("staging writer task failed: {0}")]
    Join(String),
}

/// Staging and final artifact locations for one input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub staging: PathBuf,
    pub final_path: PathBuf,
}

impl ArtifactPaths {
    pub fn for_input(input: &Path, config: &PipelineConfig) -> Result<Self, PipelineError> {
        let name = input
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| PipelineError::InputName(input.to_path_buf()))?;
        let name = match &config.rename {
            Some(sub) if !sub.from.is_empty() => name.replacen(&sub.from, &sub.to, 1),
            _ => name.to_string(),
        };
        Ok(Self {
            staging: config.output_dir.join(format!("{STAGING_PREFIX}{name}")),
            final_path: config.output_dir.join(name),
        })
    }
}

#[derive(Debug, Clone)]
pub struct FileReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub summary: RunSummary,
    pub outcomes: Vec<RecordOutcome>,
    pub elapsed: Duration,
}

impl FileReport {
    pub fn proxy_hits(&self) -> usize {
        self.outcomes.iter().filter(|o| o.used_proxy()).count()
    }
}

/// What a successful harvest of one record produced.
struct Harvest {
    email: String,
    website: Option<String>,
    via: Route,
}

/// Fetch → decode → extract for one record, then exactly one staging row.
struct HarvestJob {
    fetcher: Arc<Fetcher>,
    plan: ExtractionPlan,
    link_column: LinkColumn,
    base_url: Option<Url>,
    secondary_link: Option<Selector>,
    sink: SinkHandle,
}

#[async_trait::async_trait]
impl RecordJob for HarvestJob {
    async fn process(&self, record: Record) -> RecordOutcome {
        let result = self.harvest(&record).await;

        let (website, outcome) = match result {
            Ok(harvest) => {
                let website = match harvest.website {
                    Some(found) if record.target_link.trim().is_empty() => found,
                    _ => record.target_link.clone(),
                };
                if harvest.email.is_empty() {
                    harvest_info!(
                        "{} {} {}: no email on page (via {})",
                        record.identifier,
                        record.name,
                        record.link(self.link_column),
                        self.fetcher.route_label(harvest.via)
                    );
                } else {
                    harvest_info!(
                        "{} {} {}: {} (via {})",
                        record.identifier,
                        record.name,
                        record.link(self.link_column),
                        harvest.email,
                        self.fetcher.route_label(harvest.via)
                    );
                }
                let outcome = RecordOutcome {
                    index: record.index,
                    identifier: record.identifier.clone(),
                    email: harvest.email,
                    via: Some(harvest.via),
                    failure: None,
                };
                (website, outcome)
            }
            Err(err) => {
                harvest_info!(
                    "{} {} {}: {}",
                    record.identifier,
                    record.name,
                    record.link(self.link_column),
                    err
                );
                let outcome = RecordOutcome {
                    index: record.index,
                    identifier: record.identifier.clone(),
                    email: String::new(),
                    via: None,
                    failure: Some(err.kind),
                };
                (record.target_link.clone(), outcome)
            }
        };

        self.sink
            .append(StagingRow::for_record(&record, website, outcome.email.clone()));
        outcome
    }

    fn abandoned(&self, record: Record, reason: &str) -> RecordOutcome {
        harvest_info!(
            "{} {} {}: aborted ({})",
            record.identifier,
            record.name,
            record.link(self.link_column),
            reason
        );
        self.sink
            .append(StagingRow::for_record(&record, record.target_link.clone(), ""));
        RecordOutcome {
            index: record.index,
            identifier: record.identifier,
            email: String::new(),
            via: None,
            failure: Some(FailureKind::Aborted),
        }
    }
}

impl HarvestJob {
    async fn harvest(&self, record: &Record) -> Result<Harvest, FetchError> {
        let raw = record.link(self.link_column);
        if raw.trim().is_empty() {
            return Err(FetchError::new(FailureKind::LinkMissing, "no link to fetch"));
        }
        let url = resolve_link(raw, self.base_url.as_ref())
            .map_err(|message| FetchError::new(FailureKind::InvalidUrl, message))?;

        let page = self.fetcher.fetch(&url).await?;

        let decoded = decode_text(&page.body, page.content_type.as_deref())
            .map_err(|err| FetchError::new(FailureKind::Parse, err.to_string()))?;
        let document = PageDocument::parse(&decoded.text);
        let extraction = self.plan.run(&decoded.text, &document.text());
        if let Some(placeholder) = &extraction.discarded {
            harvest_warn!(
                "{} {}: placeholder address {} discarded (rate limited?)",
                record.identifier,
                record.name,
                placeholder
            );
        }
        let website = self
            .secondary_link
            .as_ref()
            .and_then(|selector| document.first_href(selector));

        Ok(Harvest {
            email: extraction.email,
            website,
            via: page.via,
        })
    }
}

/// One parametrized pipeline: load records, run them through the dispatcher
/// into the staging sink, then finalize.
pub struct Pipeline {
    config: PipelineConfig,
    fetcher: Arc<Fetcher>,
    secondary_link: Option<Selector>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig, settings: FetchSettings) -> Result<Self, PipelineError> {
        let fetcher = Fetcher::new(settings).map_err(|err| PipelineError::Config(err.to_string()))?;
        Self::with_fetcher(config, fetcher)
    }

    pub fn with_transport(
        config: PipelineConfig,
        settings: FetchSettings,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, PipelineError> {
        Self::with_fetcher(config, Fetcher::with_transport(settings, transport))
    }

    fn with_fetcher(config: PipelineConfig, fetcher: Fetcher) -> Result<Self, PipelineError> {
        let secondary_link = config
            .secondary_link_selector
            .as_deref()
            .map(parse_selector)
            .transpose()
            .map_err(PipelineError::Config)?;
        Ok(Self {
            config,
            fetcher: Arc::new(fetcher),
            secondary_link,
        })
    }

    pub fn load_records(input: &Path) -> Result<Vec<Record>, PipelineError> {
        let file = File::open(input).map_err(|source| PipelineError::OpenInput {
            path: input.to_path_buf(),
            source,
        })?;
        parse_records(file).map_err(|source| PipelineError::ParseInput {
            path: input.to_path_buf(),
            source,
        })
    }

    pub async fn process_file(&self, input: &Path) -> Result<FileReport, PipelineError> {
        let started = Instant::now();
        let records = Self::load_records(input)?;
        harvest_info!("{}: {} records", input.display(), records.len());

        let paths = ArtifactPaths::for_input(input, &self.config)?;
        ensure_output_dir(&self.config.output_dir)?;
        let sink = StagingSink::create(&paths.staging)?;

        let job = Arc::new(HarvestJob {
            fetcher: Arc::clone(&self.fetcher),
            plan: self.config.extraction_plan(),
            link_column: self.config.link_column,
            base_url: self.config.base_url.clone(),
            secondary_link: self.secondary_link.clone(),
            sink: sink.handle(),
        });
        let dispatcher = Dispatcher::new(self.config.max_concurrency);
        let outcomes = dispatcher.run(records, job).await;

        let report = tokio::task::spawn_blocking(move || sink.finish())
            .await
            .map_err(|err| PipelineError::Join(err.to_string()))??;
        harvest_debug!(
            "{}: {} staging rows, {} failed writes",
            paths.staging.display(),
            report.rows_written,
            report.failed_writes
        );

        let summary = finalize(&paths.staging, &paths.final_path)?;
        Ok(FileReport {
            input: input.to_path_buf(),
            output: paths.final_path,
            summary,
            outcomes,
            elapsed: started.elapsed(),
        })
    }
}
