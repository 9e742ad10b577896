//! Harness configuration and per-function grid settings
//!
//! Two files drive a session:
//!
//! * `trust_random.toml` in the project root ([`TrustRandomConfig`]):
//!   tolerance, retries, where benchmarks live and how many workers to use.
//! * `<benchmark_path>/settings.json` ([`SettingsFile`]): per target function,
//!   the range and step count of every parameter plus the product ceiling and
//!   iteration count.
//!
//! Both are materialized values; how a user produced them (editor, prompt,
//! [`SettingsFile::template`]) is not this module's concern.

use crate::error::{Result, TrustRandomError};
use crate::flatten::FieldMap;
use crate::grid::{cell_count, GridConstraint, ParamValue, ParameterSpec, ValueKind};
use crate::regression::ToleranceConfig;
use crate::target::Target;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Config file looked up in the project root
pub const CONFIG_FILE: &str = "trust_random.toml";
/// Settings file inside the benchmark directory
pub const SETTINGS_FILE: &str = "settings.json";
/// Benchmark file inside the benchmark directory
pub const BENCHMARK_FILE: &str = "benchmark.json";

fn default_acceptable_st_devs() -> f64 {
    2.5
}

fn default_re_runs() -> u32 {
    5
}

fn default_benchmark_path() -> PathBuf {
    PathBuf::from("benchmark")
}

/// Session-wide harness configuration
///
/// # Example
/// ```
/// use trust_random::settings::TrustRandomConfig;
///
/// let config: TrustRandomConfig = toml::from_str(r#"
///     acceptable_st_devs = 1.5
///     re_runs = 3
///     benchmark_path = "benchmarks"
/// "#).unwrap();
/// assert_eq!(config.tolerance().allowed_retries, 3);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustRandomConfig {
    /// Band half-width in standard deviations
    #[serde(default = "default_acceptable_st_devs")]
    pub acceptable_st_devs: f64,
    /// Retries allowed before a grid point fails
    #[serde(default = "default_re_runs")]
    pub re_runs: u32,
    /// Directory holding settings.json and benchmark.json, relative to the root
    #[serde(default = "default_benchmark_path")]
    pub benchmark_path: PathBuf,
    /// Worker threads for benchmark generation; defaults to the CPU count
    #[serde(default)]
    pub workers: Option<usize>,
}

impl Default for TrustRandomConfig {
    fn default() -> Self {
        Self {
            acceptable_st_devs: default_acceptable_st_devs(),
            re_runs: default_re_runs(),
            benchmark_path: default_benchmark_path(),
            workers: None,
        }
    }
}

impl TrustRandomConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `trust_random.toml` from `root`, falling back to defaults
    pub fn discover(root: &Path) -> Result<Self> {
        let path = root.join(CONFIG_FILE);
        if path.exists() {
            tracing::debug!(path = %path.display(), "loading config");
            Self::load(&path)
        } else {
            tracing::debug!(root = %root.display(), "no {} found, using defaults", CONFIG_FILE);
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.tolerance().validate().map_err(TrustRandomError::Config)?;
        if self.benchmark_path.as_os_str().is_empty() {
            return Err(TrustRandomError::Config("benchmark_path must not be empty".into()));
        }
        if self.workers == Some(0) {
            return Err(TrustRandomError::Config("workers must be at least 1".into()));
        }
        Ok(())
    }

    pub fn tolerance(&self) -> ToleranceConfig {
        ToleranceConfig {
            acceptable_st_devs: self.acceptable_st_devs,
            allowed_retries: self.re_runs,
        }
    }

    pub fn benchmark_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.benchmark_path)
    }

    pub fn settings_file(&self, root: &Path) -> PathBuf {
        self.benchmark_dir(root).join(SETTINGS_FILE)
    }

    pub fn benchmark_file(&self, root: &Path) -> PathBuf {
        self.benchmark_dir(root).join(BENCHMARK_FILE)
    }
}

/// Range of one parameter as written in settings.json
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimension {
    pub minimum: ParamValue,
    pub maximum: ParamValue,
    pub steps: usize,
}

/// Grid settings of one target function
///
/// Parameter ranges are stored inline next to `max_product` and
/// `benchmark_iters`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionSettings {
    #[serde(flatten)]
    pub parameters: FieldMap<Dimension>,
    pub max_product: f64,
    pub benchmark_iters: usize,
}

impl FunctionSettings {
    /// Validate against the target's signature and build the sampler inputs
    pub fn resolve(&self, target: &Target) -> Result<(Vec<ParameterSpec>, GridConstraint)> {
        if let Some(extra) = self
            .parameters
            .keys()
            .find(|k| !target.parameters().iter().any(|d| d.name == *k))
        {
            return Err(TrustRandomError::domain(format!(
                "settings for '{}' name unknown parameter '{}'",
                target.name(),
                extra
            )));
        }

        let mut specs = Vec::with_capacity(target.parameters().len());
        for decl in target.parameters() {
            let dim = self.parameters.get(&decl.name).ok_or_else(|| {
                TrustRandomError::domain(format!(
                    "settings for '{}' lack a range for parameter '{}'",
                    target.name(),
                    decl.name
                ))
            })?;
            let bound = |value: ParamValue, which: &str| {
                value.coerce(decl.kind).ok_or_else(|| {
                    TrustRandomError::domain(format!(
                        "settings for '{}': {} of '{}' must be {}, got {}",
                        target.name(),
                        which,
                        decl.name,
                        decl.kind,
                        value
                    ))
                })
            };
            let minimum = bound(dim.minimum, "minimum")?;
            let maximum = bound(dim.maximum, "maximum")?;
            specs.push(ParameterSpec::new(
                decl.name.clone(),
                decl.kind,
                minimum.as_f64(),
                maximum.as_f64(),
                dim.steps,
            )?);
        }

        cell_count(&specs)?;
        let constraint = GridConstraint::new(self.max_product, self.benchmark_iters)?;
        Ok((specs, constraint))
    }

    /// Starting point for a target whose settings have not been written yet
    pub fn template(target: &Target) -> Self {
        let parameters = target
            .parameters()
            .iter()
            .map(|decl| {
                let dim = match decl.kind {
                    ValueKind::Integer => Dimension {
                        minimum: ParamValue::Int(1),
                        maximum: ParamValue::Int(100),
                        steps: 3,
                    },
                    ValueKind::Real => Dimension {
                        minimum: ParamValue::Real(0.1),
                        maximum: ParamValue::Real(1.0),
                        steps: 3,
                    },
                };
                (decl.name.clone(), dim)
            })
            .collect();
        Self {
            parameters,
            max_product: 1000.0,
            benchmark_iters: 100,
        }
    }
}

/// Function name → grid settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SettingsFile {
    functions: FieldMap<FunctionSettings>,
}

impl SettingsFile {
    pub fn get(&self, function: &str) -> Option<&FunctionSettings> {
        self.functions.get(function)
    }

    pub fn insert(&mut self, function: impl Into<String>, settings: FunctionSettings) -> Result<()> {
        self.functions.insert(function, settings)
    }

    /// Template settings for every target
    pub fn template<'a>(targets: impl IntoIterator<Item = &'a Target>) -> Result<Self> {
        let mut file = Self::default();
        for target in targets {
            file.insert(target.name(), FunctionSettings::template(target))?;
        }
        Ok(file)
    }

    /// Settings of `target`, resolved into sampler inputs
    pub fn resolve(&self, target: &Target) -> Result<(Vec<ParameterSpec>, GridConstraint)> {
        self.get(target.name())
            .ok_or_else(|| {
                TrustRandomError::Config(format!("no settings for function '{}'", target.name()))
            })?
            .resolve(target)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}
