//! Monthly capacity ledger.
//!
//! Owned by one selection run, rebuilt from zero every run, never persisted
//! as authoritative state. Entries only ever grow.

use crate::types::{EmployeeId, MonthKey};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_MONTHLY_QUOTA: f64 = 160.0;

/// Projected effort for a candidate: `max_observed × (1 − score)`, floored at 0.
/// A non-finite score yields a non-finite estimate, which the ledger rejects.
pub fn estimated_hours(max_observed_hours: f64, score: f64) -> f64 {
    if !score.is_finite() {
        return f64::NAN;
    }
    (max_observed_hours * (1.0 - score)).max(0.0)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub employee_id: EmployeeId,
    pub month_key: MonthKey,
    pub hours: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyLedger {
    quota: f64,
    hours: BTreeMap<(EmployeeId, MonthKey), f64>,
}

impl MonthlyLedger {
    pub fn new(quota: f64) -> Self {
        Self {
            quota,
            hours: BTreeMap::new(),
        }
    }

    pub fn quota(&self) -> f64 {
        self.quota
    }

    pub fn hours(&self, employee_id: &str, month: &MonthKey) -> f64 {
        self.hours
            .get(&(employee_id.to_string(), month.clone()))
            .copied()
            .unwrap_or(0.0)
    }

    /// Accept iff the new total stays within quota. A rejection leaves the
    /// ledger untouched.
    pub fn try_accept(&mut self, employee_id: &str, month: &MonthKey, hours: f64) -> bool {
        if !hours.is_finite() {
            log::warn!("non-finite estimate {hours} for {employee_id} rejected");
            return false;
        }
        let hours = hours.max(0.0);
        let key = (employee_id.to_string(), month.clone());
        let current = self.hours.get(&key).copied().unwrap_or(0.0);
        if current + hours > self.quota {
            return false;
        }
        self.hours.insert(key, current + hours);
        true
    }

    pub fn entries(&self) -> Vec<LedgerEntry> {
        self.hours
            .iter()
            .map(|((employee_id, month_key), hours)| LedgerEntry {
                employee_id: employee_id.clone(),
                month_key: month_key.clone(),
                hours: *hours,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.hours.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hours.is_empty()
    }
}

impl Default for MonthlyLedger {
    fn default() -> Self {
        Self::new(DEFAULT_MONTHLY_QUOTA)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn june() -> MonthKey {
        MonthKey::parse("2024-06").unwrap()
    }

    #[test]
    fn estimate_scales_with_score() {
        assert_eq!(estimated_hours(40.0, 0.75), 10.0);
        assert_eq!(estimated_hours(40.0, 1.5), 0.0);
    }

    #[test]
    fn rejection_leaves_ledger_unchanged() {
        let mut ledger = MonthlyLedger::default();
        assert!(ledger.try_accept("e1", &june(), 155.0));
        assert!(!ledger.try_accept("e1", &june(), 10.0));
        assert_eq!(ledger.hours("e1", &june()), 155.0);
        assert!(ledger.try_accept("e1", &june(), 5.0));
        assert_eq!(ledger.hours("e1", &june()), 160.0);
    }

    #[test]
    fn months_and_employees_are_independent() {
        let mut ledger = MonthlyLedger::new(10.0);
        let july = MonthKey::parse("2024-07").unwrap();
        assert!(ledger.try_accept("e1", &june(), 10.0));
        assert!(ledger.try_accept("e1", &july, 10.0));
        assert!(ledger.try_accept("e2", &june(), 10.0));
        assert_eq!(ledger.len(), 3);
    }

    #[test]
    fn non_finite_hours_rejected() {
        let mut ledger = MonthlyLedger::default();
        assert!(!ledger.try_accept("e1", &june(), f64::NAN));
        assert!(ledger.is_empty());
    }
}
