// Per-field statistics over repeated evaluations
//
// The recorded spread is the population standard deviation (divide by n):
// the benchmark records the distribution actually observed, it does not
// estimate a wider population from a sample. For small iteration counts this
// is narrower than the Bessel-corrected estimate.

use crate::error::{Result, TrustRandomError};
use crate::flatten::{FieldMap, FlatResult};
use crate::store::FieldStats;

/// Arithmetic mean; `None` for an empty slice
pub fn mean(samples: &[f64]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    Some(samples.iter().sum::<f64>() / samples.len() as f64)
}

/// Population standard deviation (no Bessel correction)
pub fn population_st_dev(samples: &[f64]) -> Option<f64> {
    let m = mean(samples)?;
    let variance = samples.iter().map(|x| (x - m).powi(2)).sum::<f64>() / samples.len() as f64;
    Some(variance.sqrt())
}

/// Mean and population standard deviation of one field
///
/// Identical samples give exactly that value and a zero spread, so
/// deterministic fields turn into point checks.
pub fn summarize(samples: &[f64]) -> Option<FieldStats> {
    let first = *samples.first()?;
    if samples.iter().all(|&x| x == first) {
        return Some(FieldStats::new(first, 0.0));
    }
    Some(FieldStats::new(mean(samples)?, population_st_dev(samples)?))
}

/// Reduce flattened repetitions to per-field statistics
///
/// Every repetition must carry the same field set as the first one; field
/// order of the result follows the first repetition.
pub fn summarize_fields(repetitions: &[FlatResult]) -> Result<FieldMap<FieldStats>> {
    let Some(first) = repetitions.first() else {
        return Err(TrustRandomError::schema("no repetitions to summarize"));
    };

    for (i, rep) in repetitions.iter().enumerate().skip(1) {
        if !rep.same_keys(first) {
            let field = first
                .first_missing_in(rep)
                .or_else(|| rep.first_missing_in(first))
                .unwrap_or("<unknown>");
            return Err(TrustRandomError::schema(format!(
                "repetition {} has a different field set than repetition 0 (field '{}')",
                i, field
            )));
        }
    }

    let mut out = FieldMap::with_capacity(first.len());
    let mut column = Vec::with_capacity(repetitions.len());
    for field in first.keys() {
        column.clear();
        column.extend(repetitions.iter().filter_map(|rep| rep.get(field).copied()));
        if let Some(stats) = summarize(&column) {
            out.insert(field, stats)?;
        }
    }
    Ok(out)
}
