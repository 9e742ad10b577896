//! Geometric parameter grids under a product ceiling
//!
//! Each parameter is sampled at `step_count` points spaced uniformly in log
//! space between its bounds, so a handful of points covers several orders of
//! magnitude. The Cartesian product of all dimensions is then filtered to the
//! cells whose value product stays strictly below `max_product`; the product
//! doubles as a rough cost of evaluating the target at that cell.

use crate::error::{Result, TrustRandomError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Upper bound on the cells of one full grid, before the product filter
pub const MAX_GRID_CELLS: usize = 1 << 24;

/// Numeric kind of a target parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Integer,
    Real,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Integer => write!(f, "int"),
            ValueKind::Real => write!(f, "float"),
        }
    }
}

/// One concrete parameter value
///
/// Serialized untagged: integers as JSON integers, reals as JSON floats.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Real(f64),
}

impl ParamValue {
    pub fn as_f64(self) -> f64 {
        match self {
            ParamValue::Int(v) => v as f64,
            ParamValue::Real(v) => v,
        }
    }

    pub fn kind(self) -> ValueKind {
        match self {
            ParamValue::Int(_) => ValueKind::Integer,
            ParamValue::Real(_) => ValueKind::Real,
        }
    }

    /// Reinterpret a value loaded from disk as the declared kind
    ///
    /// JSON does not distinguish `2` from `2.0` once a writer drops the
    /// fraction, so an integral real is accepted for an integer parameter
    /// and an integer is widened for a real one.
    pub fn coerce(self, kind: ValueKind) -> Option<ParamValue> {
        match (self, kind) {
            (ParamValue::Int(_), ValueKind::Integer) | (ParamValue::Real(_), ValueKind::Real) => {
                Some(self)
            }
            (ParamValue::Int(v), ValueKind::Real) => Some(ParamValue::Real(v as f64)),
            (ParamValue::Real(v), ValueKind::Integer) => {
                if v.fract() == 0.0 && v.abs() < i64::MAX as f64 {
                    Some(ParamValue::Int(v as i64))
                } else {
                    None
                }
            }
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{}", v),
            // Debug keeps the fraction, so 1.0 never reads as an integer
            ParamValue::Real(v) => write!(f, "{:?}", v),
        }
    }
}

/// Sampling range of one parameter
///
/// Bounds are validated on construction: both must be finite and strictly
/// positive (the log of the bound is taken) and `maximum >= minimum`.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSpec {
    name: String,
    kind: ValueKind,
    minimum: f64,
    maximum: f64,
    step_count: usize,
}

impl ParameterSpec {
    pub fn new(
        name: impl Into<String>,
        kind: ValueKind,
        minimum: f64,
        maximum: f64,
        step_count: usize,
    ) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(TrustRandomError::domain("parameter name must not be empty"));
        }
        if !minimum.is_finite() || !maximum.is_finite() {
            return Err(TrustRandomError::domain(format!(
                "parameter '{}': bounds must be finite, got [{}, {}]",
                name, minimum, maximum
            )));
        }
        if minimum <= 0.0 {
            return Err(TrustRandomError::domain(format!(
                "parameter '{}': geometric spacing needs a positive minimum, got {}",
                name, minimum
            )));
        }
        if maximum < minimum {
            return Err(TrustRandomError::domain(format!(
                "parameter '{}': maximum {} is less than minimum {}",
                name, maximum, minimum
            )));
        }
        if step_count == 0 || step_count > MAX_GRID_CELLS {
            return Err(TrustRandomError::domain(format!(
                "parameter '{}': step count must lie in 1..={}, got {}",
                name, MAX_GRID_CELLS, step_count
            )));
        }
        Ok(Self {
            name,
            kind,
            minimum,
            maximum,
            step_count,
        })
    }

    pub fn integer(name: impl Into<String>, minimum: i64, maximum: i64, steps: usize) -> Result<Self> {
        Self::new(name, ValueKind::Integer, minimum as f64, maximum as f64, steps)
    }

    pub fn real(name: impl Into<String>, minimum: f64, maximum: f64, steps: usize) -> Result<Self> {
        Self::new(name, ValueKind::Real, minimum, maximum, steps)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    pub fn minimum(&self) -> f64 {
        self.minimum
    }

    pub fn maximum(&self) -> f64 {
        self.maximum
    }

    pub fn step_count(&self) -> usize {
        self.step_count
    }

    /// Geometrically spaced points from `minimum` to `maximum`, endpoints exact
    pub fn geometric_points(&self) -> Vec<f64> {
        let n = self.step_count;
        if n == 1 {
            return vec![self.minimum];
        }
        let log_min = self.minimum.ln();
        let log_max = self.maximum.ln();
        let step = (log_max - log_min) / (n - 1) as f64;
        (0..n)
            .map(|i| {
                if i == 0 {
                    self.minimum
                } else if i == n - 1 {
                    self.maximum
                } else {
                    (log_min + step * i as f64).exp()
                }
            })
            .collect()
    }

    /// Sample values of this dimension; integer kinds round half to even
    ///
    /// Duplicates produced by rounding are kept.
    pub fn samples(&self) -> Vec<ParamValue> {
        let points = self.geometric_points();
        match self.kind {
            ValueKind::Real => points.into_iter().map(ParamValue::Real).collect(),
            ValueKind::Integer => points
                .into_iter()
                .map(|p| ParamValue::Int(p.round_ties_even() as i64))
                .collect(),
        }
    }
}

/// Product ceiling and repetition count for one target
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridConstraint {
    max_product: f64,
    iterations_per_point: usize,
}

impl GridConstraint {
    pub fn new(max_product: f64, iterations_per_point: usize) -> Result<Self> {
        // Also rejects NaN
        if !(max_product > 0.0) {
            return Err(TrustRandomError::domain(format!(
                "max_product must be positive, got {}",
                max_product
            )));
        }
        if iterations_per_point == 0 {
            return Err(TrustRandomError::domain(
                "iterations_per_point must be at least 1",
            ));
        }
        Ok(Self {
            max_product,
            iterations_per_point,
        })
    }

    pub fn max_product(&self) -> f64 {
        self.max_product
    }

    pub fn iterations_per_point(&self) -> usize {
        self.iterations_per_point
    }
}

/// Concrete parameter values in declaration order
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterTuple {
    values: Vec<ParamValue>,
}

impl ParameterTuple {
    pub fn new(values: Vec<ParamValue>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[ParamValue] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Product of all values; the empty tuple has product 1
    pub fn product(&self) -> f64 {
        self.values.iter().fold(1.0, |acc, v| acc * v.as_f64())
    }

    /// Render as `(n=10, p=0.5)` for logs and error messages
    pub fn describe<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> String {
        let parts: Vec<String> = names
            .into_iter()
            .zip(&self.values)
            .map(|(name, value)| format!("{}={}", name, value))
            .collect();
        format!("({})", parts.join(", "))
    }
}

impl fmt::Display for ParameterTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.values.iter().map(|v| v.to_string()).collect();
        write!(f, "({})", parts.join(", "))
    }
}

/// Retained grid cells and their summed cost
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    pub tuples: Vec<ParameterTuple>,
    /// Sum of the retained products; only used for runtime estimates
    pub total_cost: f64,
}

impl Grid {
    pub fn len(&self) -> usize {
        self.tuples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }
}

/// Number of cells in the full Cartesian grid
///
/// Grids beyond [`MAX_GRID_CELLS`], including counts that would overflow,
/// are a domain error.
pub fn cell_count(specs: &[ParameterSpec]) -> Result<usize> {
    specs.iter().try_fold(1usize, |acc, spec| {
        acc.checked_mul(spec.step_count())
            .filter(|&n| n <= MAX_GRID_CELLS)
            .ok_or_else(|| {
                TrustRandomError::domain(format!(
                    "grid over {} parameters exceeds {} cells",
                    specs.len(),
                    MAX_GRID_CELLS
                ))
            })
    })
}

/// Enumerate the full Cartesian grid in row-major order (last dimension fastest)
pub fn cartesian(specs: &[ParameterSpec]) -> Result<Vec<ParameterTuple>> {
    let total = cell_count(specs)?;
    let axes: Vec<Vec<ParamValue>> = specs.iter().map(ParameterSpec::samples).collect();
    let mut cells = Vec::with_capacity(total);
    let mut index = vec![0usize; axes.len()];

    for _ in 0..total {
        cells.push(ParameterTuple::new(
            index.iter().zip(&axes).map(|(&i, axis)| axis[i]).collect(),
        ));
        // Odometer increment, last axis first
        for dim in (0..axes.len()).rev() {
            index[dim] += 1;
            if index[dim] < axes[dim].len() {
                break;
            }
            index[dim] = 0;
        }
    }
    Ok(cells)
}

/// Sample the grid and keep cells with product strictly below the ceiling
pub fn sample(specs: &[ParameterSpec], constraint: &GridConstraint) -> Result<Grid> {
    let mut total_cost = 0.0;
    let tuples: Vec<ParameterTuple> = cartesian(specs)?
        .into_iter()
        .filter(|tuple| {
            let product = tuple.product();
            let keep = product < constraint.max_product();
            if keep {
                total_cost += product;
            }
            keep
        })
        .collect();

    tracing::debug!(
        dimensions = specs.len(),
        retained = tuples.len(),
        total_cost,
        "sampled parameter grid"
    );

    Ok(Grid { tuples, total_cost })
}
