//! Harvester core: pure record, extraction and ordering logic.
mod email;
mod extraction;
mod link;
mod record;
mod row;
mod script;
mod summary;

pub use email::{extract_email, is_static_resource, normalize_email, EmailExtractor};
pub use extraction::{Extraction, ExtractionPlan};
pub use link::resolve_link;
pub use record::{parse_records, LinkColumn, Record, RecordError, MIN_INPUT_COLUMNS};
pub use row::{compare_identifiers, sort_rows, StagingRow, OUTPUT_HEADER};
pub use script::{mailto_address, ScriptObfuscation};
pub use summary::RunSummary;
