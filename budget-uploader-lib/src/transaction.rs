use std::fmt;

use chrono::{NaiveDate, Utc};
use derive_more::From;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};


/// Where a transaction came from in the uploaded statement
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, From)]
#[serde(untagged)]
pub enum OriginalLine {
    /// Index of the line in the extraction result
    Index(u64),
    /// Raw statement text
    Text(String),
}

impl fmt::Display for OriginalLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OriginalLine::Index(index) => write!(f, "#{index}"),
            OriginalLine::Text(text) => f.write_str(text),
        }
    }
}

/// Transaction
///
/// Descriptions are not unique within a statement, a transaction is identified by its
/// description together with its position in the store.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Transaction {
    /// Date of the transaction, absent when the statement line had none
    pub date: Option<NaiveDate>,
    /// Description of the transaction, used as the category memory key
    pub description: String,
    /// Source line in the statement
    pub original_line: OriginalLine,
}

impl Transaction {
    /// Create a transaction from a bare statement line
    pub fn from_line<S: Into<String>>(index: usize, line: S) -> Self {
        Self {
            date: None,
            description: line.into(),
            original_line: (index as u64).into(),
        }
    }

    /// Build the transaction list from an extraction response, keeping the response order
    pub fn from_raw(raw: Vec<RawTransaction>) -> Vec<Self> {
        raw.into_iter()
            .enumerate()
            .map(|(index, raw)| raw.into_transaction(index))
            .collect()
    }
}

/// Transaction as sent by the extraction endpoint
///
/// Some backends send bare description strings instead of records. Those become transactions
/// without a date.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RawTransaction {
    /// Structured record
    Record {
        #[serde(default)]
        date: Option<String>,
        description: String,
        #[serde(default)]
        original_line: Option<OriginalLine>,
    },
    /// Bare description
    Line(String),
}

impl RawTransaction {
    fn into_transaction(self, index: usize) -> Transaction {
        match self {
            RawTransaction::Record {
                date,
                description,
                original_line,
            } => Transaction {
                date: date.as_deref().and_then(parse_date),
                description,
                original_line: original_line.unwrap_or_else(|| (index as u64).into()),
            },
            RawTransaction::Line(line) => Transaction::from_line(index, line),
        }
    }
}

/// Parse a statement date, ISO first and then any format `dateparser` understands
///
/// Unparseable dates are treated as absent. So are dates without a year, `dateparser` would
/// silently put them in the current year.
pub fn parse_date(date: &str) -> Option<NaiveDate> {
    let date = date.trim();
    if date.is_empty() {
        return None;
    }
    if let Ok(parsed) = NaiveDate::parse_from_str(date, "%Y-%m-%d") {
        return Some(parsed);
    }
    if !names_year(date) {
        warn!("Ignoring transaction date without a year {:?}", date);
        return None;
    }
    match dateparser::parse_with_timezone(date, &Utc) {
        Ok(parsed) => {
            let parsed = parsed.date_naive();
            debug!("Parsed non ISO transaction date {:?} as {}", date, parsed);
            Some(parsed)
        }
        Err(e) => {
            warn!("Ignoring unparseable transaction date {:?}: {}", date, e);
            None
        }
    }
}

/// Whether a date string carries a year: a four digit number, or three numeric fields like
/// `03/01/24`
fn names_year(date: &str) -> bool {
    let groups = date
        .split(|c: char| !c.is_ascii_digit())
        .filter(|group| !group.is_empty())
        .collect::<Vec<_>>();
    if groups.iter().any(|group| group.len() == 4) {
        return true;
    }
    date.chars().all(|c| c.is_ascii_digit() || "/-.".contains(c)) && groups.len() == 3
}
