//! Harvester engine: fetching with proxy failover, bounded dispatch and the
//! crash-safe staging/finalize pair.
mod charset;
mod decode;
mod dispatch;
mod engine;
mod fetch;
mod finalize;
mod page;
mod persist;
mod pipeline;
mod sink;
mod transport;
mod types;

pub use charset::{decode_text, CharsetError, DecodedText};
pub use decode::{decode_body, decoding_reader, ContentEncoding, DeadlineReader, DecodeError};
pub use dispatch::{Dispatcher, RecordJob};
pub use engine::HarvestEngine;
pub use fetch::{
    FailoverState, FetchSettings, Fetcher, HeaderProfile, ProxyCredential, ProxyEndpoint,
    ProxyPool, TimeoutProfile,
};
pub use finalize::{finalize, read_staging_rows, FinalizeError};
pub use page::{parse_selector, PageDocument, DEFAULT_SECONDARY_LINK_SELECTOR};
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use pipeline::{
    ArtifactPaths, FileReport, NameSubstitution, Pipeline, PipelineConfig, PipelineError,
    STAGING_PREFIX,
};
pub use sink::{SinkError, SinkHandle, SinkReport, StagingSink};
pub use transport::{BodyReader, RawResponse, ReqwestTransport, Transport};
pub use types::{FailureKind, FetchError, FetchOutcome, FetchedPage, RecordOutcome, Route};
