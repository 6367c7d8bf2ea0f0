use std::{collections::BTreeSet, fmt, str::FromStr};

use chrono::Datelike;
use displaydoc::Display;
use serde_with::{DeserializeFromStr, SerializeDisplay};
use strum::{EnumIter, EnumMessage, EnumString};
use thiserror::Error;

use crate::transaction::Transaction;


/// Filter code matching every transaction
pub const ALL: &str = "all";

#[derive(Error, Debug, Display, PartialEq, Eq)]
pub enum Error {
    /// invalid month filter {0:?}, expected "01" through "12" or "all"
    InvalidMonth(String),
    /// invalid year filter {0:?}, expected a four digit year or "all"
    InvalidYear(String),
}

/// Calendar month, written as its two digit code
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumMessage, EnumString, strum::Display,
)]
pub enum Month {
    #[strum(serialize = "01", message = "January")]
    January,
    #[strum(serialize = "02", message = "February")]
    February,
    #[strum(serialize = "03", message = "March")]
    March,
    #[strum(serialize = "04", message = "April")]
    April,
    #[strum(serialize = "05", message = "May")]
    May,
    #[strum(serialize = "06", message = "June")]
    June,
    #[strum(serialize = "07", message = "July")]
    July,
    #[strum(serialize = "08", message = "August")]
    August,
    #[strum(serialize = "09", message = "September")]
    September,
    #[strum(serialize = "10", message = "October")]
    October,
    #[strum(serialize = "11", message = "November")]
    November,
    #[strum(serialize = "12", message = "December")]
    December,
}

impl Month {
    /// Month number, 1 based
    pub fn number(self) -> u32 {
        self as u32 + 1
    }

    /// English month name
    pub fn name(self) -> &'static str {
        self.get_message().unwrap_or_default()
    }
}

/// Month dimension of a filter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, SerializeDisplay, DeserializeFromStr)]
pub enum MonthFilter {
    #[default]
    All,
    Month(Month),
}

impl FromStr for MonthFilter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == ALL {
            return Ok(MonthFilter::All);
        }
        Month::from_str(s)
            .map(MonthFilter::Month)
            .map_err(|_| Error::InvalidMonth(s.into()))
    }
}

impl fmt::Display for MonthFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonthFilter::All => f.write_str(ALL),
            MonthFilter::Month(month) => write!(f, "{month}"),
        }
    }
}

/// Year dimension of a filter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, SerializeDisplay, DeserializeFromStr)]
pub enum YearFilter {
    #[default]
    All,
    Year(i32),
}

impl FromStr for YearFilter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == ALL {
            return Ok(YearFilter::All);
        }
        if s.len() != 4 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::InvalidYear(s.into()));
        }
        s.parse()
            .map(YearFilter::Year)
            .map_err(|_| Error::InvalidYear(s.into()))
    }
}

impl fmt::Display for YearFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            YearFilter::All => f.write_str(ALL),
            YearFilter::Year(year) => write!(f, "{year:04}"),
        }
    }
}

/// Month and year selection over the transaction store
///
/// Only decides visibility, transactions are never modified.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(deny_unknown_fields)]
pub struct FilterState {
    pub month: MonthFilter,
    pub year: YearFilter,
}

impl FilterState {
    pub fn new(month: MonthFilter, year: YearFilter) -> Self {
        Self { month, year }
    }

    /// Parse both dimensions from their codes
    pub fn from_codes(month: &str, year: &str) -> Result<Self, Error> {
        Ok(Self::new(month.parse()?, year.parse()?))
    }

    /// True when neither dimension restricts anything
    pub fn is_all(&self) -> bool {
        self.month == MonthFilter::All && self.year == YearFilter::All
    }

    /// Check if a transaction is visible
    ///
    /// Undated transactions are only visible when both dimensions are "all".
    pub fn matches(&self, transaction: &Transaction) -> bool {
        if self.is_all() {
            return true;
        }
        let Some(date) = transaction.date else {
            return false;
        };
        let month = match self.month {
            MonthFilter::All => true,
            MonthFilter::Month(month) => date.month() == month.number(),
        };
        let year = match self.year {
            YearFilter::All => true,
            YearFilter::Year(year) => date.year() == year,
        };
        month && year
    }

    /// Visible transactions with their store positions, in store order
    pub fn apply<'a>(&self, transactions: &'a [Transaction]) -> Vec<(usize, &'a Transaction)> {
        transactions
            .iter()
            .enumerate()
            .filter(|(_, t)| self.matches(t))
            .collect()
    }
}

/// Distinct years present in the transactions, ascending
pub fn available_years(transactions: &[Transaction]) -> Vec<i32> {
    transactions
        .iter()
        .filter_map(|t| t.date.map(|d| d.year()))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
