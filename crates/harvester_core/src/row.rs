use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::Record;

/// Header shared by the staging and the final artifact.
pub const OUTPUT_HEADER: [&str; 4] = ["Number", "Company Name", "Company Website", "Email"];

/// One output row. Staging and final artifacts share this schema.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StagingRow {
    #[serde(rename = "Number")]
    pub identifier: String,
    #[serde(rename = "Company Name")]
    pub name: String,
    #[serde(rename = "Company Website")]
    pub website: String,
    #[serde(rename = "Email")]
    pub email: String,
}

impl StagingRow {
    pub fn for_record(record: &Record, website: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            identifier: record.identifier.clone(),
            name: record.name.clone(),
            website: website.into(),
            email: email.into(),
        }
    }

    pub fn fields(&self) -> [&str; 4] {
        [&self.identifier, &self.name, &self.website, &self.email]
    }
}

/// Numeric comparison when both identifiers parse as integers, otherwise
/// plain string comparison.
pub fn compare_identifiers(a: &str, b: &str) -> Ordering {
    match (a.parse::<i64>(), b.parse::<i64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        _ => a.cmp(b),
    }
}

/// Stable sort of rows by identifier.
///
/// With mixed numeric and non-numeric identifiers `compare_identifiers` is not
/// transitive, and `slice::sort_by` may panic on such orderings. A plain
/// top-down merge sort never panics and keeps equal rows in input order.
pub fn sort_rows(rows: Vec<StagingRow>) -> Vec<StagingRow> {
    merge_sort(rows, &|a: &StagingRow, b: &StagingRow| {
        compare_identifiers(&a.identifier, &b.identifier)
    })
}

fn merge_sort<T, F>(mut items: Vec<T>, cmp: &F) -> Vec<T>
where
    F: Fn(&T, &T) -> Ordering,
{
    if items.len() <= 1 {
        return items;
    }
    let right = items.split_off(items.len() / 2);
    let left = merge_sort(items, cmp);
    let right = merge_sort(right, cmp);

    let mut merged = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    loop {
        let take_left = match (left.peek(), right.peek()) {
            (Some(l), Some(r)) => cmp(r, l) != Ordering::Less,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => break,
        };
        let next = if take_left { left.next() } else { right.next() };
        merged.extend(next);
    }
    merged
}
