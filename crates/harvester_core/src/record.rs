use std::io::Read;

use thiserror::Error;

/// Minimum number of columns a data row must carry to become a record.
pub const MIN_INPUT_COLUMNS: usize = 5;

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("failed to read input table: {0}")]
    Csv(#[from] csv::Error),
}

/// Which link column drives the fetch for a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkColumn {
    /// `Link1`, the listing site's detail page.
    Source,
    /// `Link2`, the company's own website.
    #[default]
    Target,
}

/// One input row. `email` starts empty; empty is the "not found" sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Record {
    pub index: usize,
    pub identifier: String,
    pub name: String,
    pub address: String,
    pub source_link: String,
    pub target_link: String,
    pub email: String,
}

impl Record {
    pub fn link(&self, column: LinkColumn) -> &str {
        match column {
            LinkColumn::Source => &self.source_link,
            LinkColumn::Target => &self.target_link,
        }
    }
}

/// Parse a delimited table into records.
///
/// The first row is a header and is skipped. Rows with fewer than
/// [`MIN_INPUT_COLUMNS`] fields are dropped without error; extra columns are
/// ignored. Field values are kept verbatim, except that bytes which are not
/// valid UTF-8 (spreadsheet exports in Latin-1) become U+FFFD instead of
/// failing the whole table.
pub fn parse_records<R: Read>(source: R) -> Result<Vec<Record>, RecordError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(source);

    let mut records = Vec::new();
    for row in reader.byte_records() {
        let row = row?;
        if row.len() < MIN_INPUT_COLUMNS {
            continue;
        }
        let field = |i: usize| String::from_utf8_lossy(&row[i]).into_owned();
        records.push(Record {
            index: records.len(),
            identifier: field(0),
            name: field(1),
            address: field(2),
            source_link: field(3),
            target_link: field(4),
            email: String::new(),
        });
    }
    Ok(records)
}
