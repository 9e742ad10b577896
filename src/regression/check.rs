// Tolerance-band check of one fresh evaluation against a stored record
//
// Every recorded field is evaluated, in the record's field order, and the
// first violation is reported. Iteration order never depends on hashing, so
// the same inputs always name the same field.

use crate::flatten::FlatResult;
use crate::store::{BenchmarkRecord, FieldStats};
use std::fmt;

/// Field name reported when the fresh evaluation lacks a recorded field
pub const MISSING_FIELD: &str = "<missing>";

/// Why a single field failed its check
#[derive(Debug, Clone, PartialEq)]
pub enum Violation {
    /// Observed value fell outside `[lower_bound, upper_bound]`
    OutOfBounds {
        field: String,
        observed: f64,
        lower_bound: f64,
        upper_bound: f64,
    },
    /// The fresh evaluation did not produce a field present in the record
    MissingField { field: String },
}

impl Violation {
    /// Reported field name; [`MISSING_FIELD`] for missing fields
    pub fn field(&self) -> &str {
        match self {
            Violation::OutOfBounds { field, .. } => field,
            Violation::MissingField { .. } => MISSING_FIELD,
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::OutOfBounds {
                field,
                observed,
                lower_bound,
                upper_bound,
            } if observed < lower_bound => write!(
                f,
                "For key: {} lower bound: {} surpassed by value {}",
                field, lower_bound, observed
            ),
            Violation::OutOfBounds {
                field,
                observed,
                upper_bound,
                ..
            } => write!(
                f,
                "For key: {} upper bound: {} surpassed by value {}",
                field, upper_bound, observed
            ),
            Violation::MissingField { field } => {
                write!(f, "{}: field '{}' not produced by evaluation", MISSING_FIELD, field)
            }
        }
    }
}

/// Outcome of one regression check
#[derive(Debug, Clone, PartialEq)]
pub enum CheckResult {
    Pass,
    Fail(Violation),
}

impl CheckResult {
    pub fn is_pass(&self) -> bool {
        matches!(self, CheckResult::Pass)
    }

    pub fn violation(&self) -> Option<&Violation> {
        match self {
            CheckResult::Pass => None,
            CheckResult::Fail(v) => Some(v),
        }
    }
}

impl fmt::Display for CheckResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckResult::Pass => write!(f, "pass"),
            CheckResult::Fail(v) => write!(f, "fail: {}", v),
        }
    }
}

/// Check one field; NaN observations always fail
pub fn check_field(field: &str, stats: &FieldStats, observed: f64, acceptable_st_devs: f64) -> Option<Violation> {
    let (lower_bound, upper_bound) = stats.bounds(acceptable_st_devs);
    if lower_bound <= observed && observed <= upper_bound {
        None
    } else {
        Some(Violation::OutOfBounds {
            field: field.to_string(),
            observed,
            lower_bound,
            upper_bound,
        })
    }
}

/// All violations, in record field order
pub fn check_all(record: &BenchmarkRecord, fresh: &FlatResult, acceptable_st_devs: f64) -> Vec<Violation> {
    record
        .stats()
        .iter()
        .filter_map(|(field, stats)| match fresh.get(field) {
            None => Some(Violation::MissingField {
                field: field.to_string(),
            }),
            Some(&observed) => check_field(field, stats, observed, acceptable_st_devs),
        })
        .collect()
}

/// Pass, or the first violation in record field order
///
/// # Example
/// ```
/// use trust_random::flatten::{FieldMap, FlatResult};
/// use trust_random::regression::{check, CheckResult};
/// use trust_random::store::{BenchmarkRecord, FieldStats};
///
/// let stats = [("pop".to_string(), FieldStats::new(10.0, 2.0))].into_iter().collect();
/// let record = BenchmarkRecord::new(FieldMap::new(), stats);
///
/// let fresh: FlatResult = [("pop".to_string(), 12.5)].into_iter().collect();
/// assert_eq!(check(&record, &fresh, 1.5), CheckResult::Pass);
///
/// let fresh: FlatResult = [("pop".to_string(), 13.5)].into_iter().collect();
/// assert!(!check(&record, &fresh, 1.5).is_pass());
/// ```
pub fn check(record: &BenchmarkRecord, fresh: &FlatResult, acceptable_st_devs: f64) -> CheckResult {
    match check_all(record, fresh, acceptable_st_devs).into_iter().next() {
        None => CheckResult::Pass,
        Some(v) => CheckResult::Fail(v),
    }
}
