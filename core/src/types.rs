//! Shared primitive types used across the whole pipeline.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A stable, unique identifier for an employee (the tracker's encoded assignee).
pub type EmployeeId = String;

/// The tracker's numeric task identifier.
pub type TaskId = i64;

/// The canonical run identifier.
pub type RunId = String;

/// Calendar month bucket used by the capacity ledger, formatted `YYYY-MM`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MonthKey(String);

impl MonthKey {
    pub fn from_date(date: NaiveDate) -> Self {
        Self(format!("{:04}-{:02}", date.year(), date.month()))
    }

    /// Parse a `YYYY-MM` string. Returns `None` for anything that is not a real month.
    pub fn parse(raw: &str) -> Option<Self> {
        let first = NaiveDate::parse_from_str(&format!("{}-01", raw.trim()), "%Y-%m-%d").ok()?;
        Some(Self::from_date(first))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
