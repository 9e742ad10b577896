//! Target functions described as data
//!
//! A target is a name, an ordered list of `(parameter name, kind)` pairs and a
//! closure. The closure receives its arguments by name through [`Arguments`]
//! and returns any serializable structure with numeric leaves; the structure
//! is converted to a JSON value and flattened, so the declared result type
//! never has to be known to the harness.

use crate::error::{Result, TrustRandomError};
use crate::flatten::{flatten, FlatResult};
use crate::grid::{ParamValue, ParameterTuple, ValueKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Key under which statistics sit in a stored record; parameters may not use it
pub const RESERVED_PARAMETER: &str = "stats";

/// Default seconds per unit of grid cost used for runtime estimates
pub const DEFAULT_EST_BASE_TIME: f64 = 0.015;

/// Name and kind of one declared parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterDecl {
    pub name: String,
    pub kind: ValueKind,
}

impl ParameterDecl {
    pub fn integer(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ValueKind::Integer,
        }
    }

    pub fn real(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ValueKind::Real,
        }
    }
}

/// Named view of one parameter tuple, handed to the target closure
#[derive(Debug, Clone, Copy)]
pub struct Arguments<'a> {
    decls: &'a [ParameterDecl],
    values: &'a [ParamValue],
}

impl<'a> Arguments<'a> {
    pub fn get(&self, name: &str) -> anyhow::Result<ParamValue> {
        self.decls
            .iter()
            .position(|d| d.name == name)
            .map(|i| self.values[i])
            .ok_or_else(|| anyhow::anyhow!("no parameter named '{}'", name))
    }

    pub fn int(&self, name: &str) -> anyhow::Result<i64> {
        match self.get(name)? {
            ParamValue::Int(v) => Ok(v),
            ParamValue::Real(v) => anyhow::bail!("parameter '{}' is real ({}), not integer", name, v),
        }
    }

    /// Real value of a parameter; integer parameters are widened
    pub fn real(&self, name: &str) -> anyhow::Result<f64> {
        Ok(self.get(name)?.as_f64())
    }

    pub fn values(&self) -> &'a [ParamValue] {
        self.values
    }
}

type EvalFn = dyn Fn(&Arguments<'_>) -> anyhow::Result<Value> + Send + Sync;

/// A noisy function under test together with its parameter schema
#[derive(Clone)]
pub struct Target {
    name: String,
    parameters: Vec<ParameterDecl>,
    est_base_time: f64,
    func: Arc<EvalFn>,
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Target")
            .field("name", &self.name)
            .field("parameters", &self.parameters)
            .field("est_base_time", &self.est_base_time)
            .finish_non_exhaustive()
    }
}

impl Target {
    /// Declare a target
    ///
    /// Parameter names must be non-empty, unique and different from
    /// [`RESERVED_PARAMETER`].
    ///
    /// # Example
    /// ```
    /// use serde::Serialize;
    /// use trust_random::target::{ParameterDecl, Target};
    ///
    /// #[derive(Serialize)]
    /// struct Count { count: i64 }
    ///
    /// let target = Target::new("identity", vec![ParameterDecl::integer("n")], |args| {
    ///     Ok(Count { count: args.int("n")? })
    /// })
    /// .unwrap();
    /// assert_eq!(target.parameter_names(), vec!["n"]);
    /// ```
    pub fn new<F, T>(name: impl Into<String>, parameters: Vec<ParameterDecl>, func: F) -> Result<Self>
    where
        F: Fn(&Arguments<'_>) -> anyhow::Result<T> + Send + Sync + 'static,
        T: Serialize,
    {
        let name = name.into();
        if name.is_empty() {
            return Err(TrustRandomError::domain("target name must not be empty"));
        }
        for (i, decl) in parameters.iter().enumerate() {
            if decl.name.is_empty() {
                return Err(TrustRandomError::domain(format!(
                    "target '{}': parameter {} has an empty name",
                    name, i
                )));
            }
            if decl.name == RESERVED_PARAMETER {
                return Err(TrustRandomError::domain(format!(
                    "target '{}': parameter name '{}' is reserved",
                    name, RESERVED_PARAMETER
                )));
            }
            if parameters[..i].iter().any(|d| d.name == decl.name) {
                return Err(TrustRandomError::domain(format!(
                    "target '{}': duplicate parameter '{}'",
                    name, decl.name
                )));
            }
        }

        let func: Arc<EvalFn> = Arc::new(move |args: &Arguments<'_>| -> anyhow::Result<Value> {
            let output = func(args)?;
            Ok(serde_json::to_value(output)?)
        });

        Ok(Self {
            name,
            parameters,
            est_base_time: DEFAULT_EST_BASE_TIME,
            func,
        })
    }

    /// Seconds one evaluation takes per unit of grid cost
    pub fn with_est_base_time(mut self, seconds: f64) -> Self {
        self.est_base_time = seconds;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parameters(&self) -> &[ParameterDecl] {
        &self.parameters
    }

    pub fn parameter_names(&self) -> Vec<&str> {
        self.parameters.iter().map(|d| d.name.as_str()).collect()
    }

    pub fn est_base_time(&self) -> f64 {
        self.est_base_time
    }

    /// `(n=10, p=0.5)` rendering of a tuple using this target's names
    pub fn describe(&self, tuple: &ParameterTuple) -> String {
        tuple.describe(self.parameters.iter().map(|d| d.name.as_str()))
    }

    /// Evaluate once and return the raw result structure
    pub fn evaluate(&self, tuple: &ParameterTuple) -> Result<Value> {
        self.check_tuple(tuple)?;
        let args = Arguments {
            decls: &self.parameters,
            values: tuple.values(),
        };
        (self.func)(&args).map_err(|source| TrustRandomError::Computation {
            function: self.name.clone(),
            location: format!(" at {}", self.describe(tuple)),
            source,
        })
    }

    /// Evaluate once and flatten the result
    pub fn evaluate_flat(&self, tuple: &ParameterTuple) -> Result<FlatResult> {
        let value = self.evaluate(tuple)?;
        flatten(&value).map_err(|e| e.at(&self.name, &self.describe(tuple)))
    }

    fn check_tuple(&self, tuple: &ParameterTuple) -> Result<()> {
        if tuple.len() != self.parameters.len() {
            return Err(TrustRandomError::domain(format!(
                "target '{}' takes {} parameters, tuple {} has {}",
                self.name,
                self.parameters.len(),
                tuple,
                tuple.len()
            )));
        }
        for (decl, value) in self.parameters.iter().zip(tuple.values()) {
            if decl.kind != value.kind() {
                return Err(TrustRandomError::domain(format!(
                    "target '{}': parameter '{}' expects {}, got {}",
                    self.name, decl.name, decl.kind, value
                )));
            }
        }
        Ok(())
    }
}
