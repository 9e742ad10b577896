// Statistical regression checking for noisy functions
//
// A benchmark stores, per grid point and per output field, the mean and the
// population standard deviation of many evaluations. A check evaluates the
// target once more and requires every field to land inside
// `mean ± acceptable_st_devs * st_dev`.
//
// Outputs are assumed roughly Gaussian. There are no p-values and no
// multiple-comparison correction; `failure_probabilities` estimates how often
// a correct implementation fails by chance so the band and retry count can be
// chosen deliberately.

mod check;
mod config;
mod failure_prob;
mod statistics;

pub use check::{check, check_all, check_field, CheckResult, Violation, MISSING_FIELD};
pub use config::ToleranceConfig;
pub use failure_prob::{failure_probabilities, normal_cdf, FailureProbabilities};
pub use statistics::{mean, population_st_dev, summarize, summarize_fields};
