// Expected false-failure rates of a tolerance configuration
//
// A correct implementation still fails a check whenever a Gaussian field
// lands outside the band by chance. With k standard deviations the per-field
// miss rate is p = 2 * Phi(-k); across v independent fields a single attempt
// fails with 1 - (1 - p)^v, and retries multiply that down.

/// False-failure probabilities for a whole test suite
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FailureProbabilities {
    pub per_test_no_reruns: f64,
    pub per_test_reruns: f64,
    pub one_test_from_all_no_reruns: f64,
    pub one_test_from_all_reruns: f64,
}

/// Probabilities of spurious failure
///
/// * `acceptable_st_devs` - band half-width used by the checker
/// * `re_runs` - retries allowed per test
/// * `independent_variables` - number of independent output fields per test;
///   may need to be measured from the observed failure rate
/// * `n_tests` - total number of checks in the suite
pub fn failure_probabilities(
    acceptable_st_devs: f64,
    re_runs: u32,
    independent_variables: u32,
    n_tests: usize,
) -> FailureProbabilities {
    let outside = normal_cdf(-acceptable_st_devs);
    let success = 1.0 - outside * 2.0;
    // Exponents go through f64 so large counts never wrap
    let per_test_no_reruns = 1.0 - success.powf(f64::from(independent_variables));
    let per_test_reruns = per_test_no_reruns.powf(f64::from(re_runs) + 1.0);
    let n = n_tests as f64;

    FailureProbabilities {
        per_test_no_reruns,
        per_test_reruns,
        one_test_from_all_no_reruns: 1.0 - (1.0 - per_test_no_reruns).powf(n),
        one_test_from_all_reruns: 1.0 - (1.0 - per_test_reruns).powf(n),
    }
}

/// Standard normal CDF
pub fn normal_cdf(x: f64) -> f64 {
    0.5 * (1.0 + erf(x / std::f64::consts::SQRT_2))
}

/// Error function, Abramowitz and Stegun 7.1.26 (|error| < 1.5e-7)
fn erf(x: f64) -> f64 {
    let a1 = 0.254829592;
    let a2 = -0.284496736;
    let a3 = 1.421413741;
    let a4 = -1.453152027;
    let a5 = 1.061405429;
    let p = 0.3275911;

    let sign = if x >= 0.0 { 1.0 } else { -1.0 };
    let x = x.abs();

    let t = 1.0 / (1.0 + p * x);
    let y = 1.0 - (((((a5 * t + a4) * t) + a3) * t + a2) * t + a1) * t * (-x * x).exp();

    sign * y
}
