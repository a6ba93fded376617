//! Non-compartmental pharmacokinetic analysis of simulated concentration
//! profiles.
//!
//! Cmax/Tmax, trapezoidal AUC (linear or lin-up/log-down), terminal slope by
//! log-linear curve stripping and the derived parameters thalf, AUC to
//! infinity, clearance and volume of distribution.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AucMethod {
    Linear,
    /// Linear trapezoid on rising segments, log trapezoid on falling ones.
    LinUpLogDown,
}

/// Log-linear segment handling requires a strictly falling positive segment.
#[inline]
fn use_log_linear(c1: f64, c2: f64) -> bool {
    c2 < c1 && c1 > 0.0 && c2 > 0.0 && ((c1 / c2) - 1.0).abs() >= 1e-10
}

#[inline]
fn auc_linear(c1: f64, c2: f64, dt: f64) -> f64 {
    (c1 + c2) / 2.0 * dt
}

#[inline]
fn auc_log(c1: f64, c2: f64, dt: f64) -> f64 {
    (c1 - c2) * dt / (c1 / c2).ln()
}

/// Area under the curve over the full profile.
pub fn auc(times: &[f64], concentrations: &[f64], method: AucMethod) -> f64 {
    let mut total = 0.0;
    for i in 1..times.len().min(concentrations.len()) {
        let dt = times[i] - times[i - 1];
        if dt <= 0.0 {
            continue;
        }
        let (c1, c2) = (concentrations[i - 1], concentrations[i]);
        total += match method {
            AucMethod::Linear => auc_linear(c1, c2, dt),
            AucMethod::LinUpLogDown => {
                if use_log_linear(c1, c2) {
                    auc_log(c1, c2, dt)
                } else {
                    auc_linear(c1, c2, dt)
                }
            }
        };
    }
    total
}

/// Ordinary least squares `y = intercept + slope * x`.
fn linear_regression(xs: &[f64], ys: &[f64]) -> Option<(f64, f64, f64)> {
    let n = xs.len() as f64;
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    let x_mean = xs.iter().sum::<f64>() / n;
    let y_mean = ys.iter().sum::<f64>() / n;
    let mut sxx = 0.0;
    let mut sxy = 0.0;
    let mut syy = 0.0;
    for (&x, &y) in xs.iter().zip(ys) {
        sxx += (x - x_mean) * (x - x_mean);
        sxy += (x - x_mean) * (y - y_mean);
        syy += (y - y_mean) * (y - y_mean);
    }
    if sxx == 0.0 || syy == 0.0 {
        return None;
    }
    let slope = sxy / sxx;
    let intercept = y_mean - slope * x_mean;
    let r_squared = (sxy * sxy) / (sxx * syy);
    Some((slope, intercept, r_squared))
}

/// Terminal slope estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LambdaZ {
    pub lambda_z: f64,
    pub half_life: f64,
    pub r_squared: f64,
    pub adj_r_squared: f64,
    pub n_points: usize,
}

/// Estimate λz by curve stripping: log-linear regressions over growing
/// terminal point sets (excluding Tmax), best adjusted R² wins, more points
/// break ties.
pub fn lambda_z(times: &[f64], concentrations: &[f64]) -> Option<LambdaZ> {
    const MIN_POINTS: usize = 3;
    const MIN_R_SQUARED: f64 = 0.9;
    const R_SQUARED_TOLERANCE: f64 = 1e-4;

    if times.len() != concentrations.len() || times.is_empty() {
        return None;
    }
    let tmax_idx = concentrations
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i)?;
    let tlast_idx = times.len() - 1;
    let start_idx = tmax_idx + 1;
    if tlast_idx < start_idx + MIN_POINTS - 1 {
        return None;
    }

    let mut best: Option<LambdaZ> = None;
    for n_points in MIN_POINTS..=(tlast_idx - start_idx + 1) {
        let first_idx = tlast_idx - n_points + 1;
        if first_idx < start_idx {
            continue;
        }
        let mut reg_times = Vec::with_capacity(n_points);
        let mut reg_log_conc = Vec::with_capacity(n_points);
        for i in first_idx..=tlast_idx {
            if concentrations[i] > 0.0 {
                reg_times.push(times[i]);
                reg_log_conc.push(concentrations[i].ln());
            }
        }
        if reg_times.len() < MIN_POINTS {
            continue;
        }
        let Some((slope, _, r_squared)) = linear_regression(&reg_times, &reg_log_conc) else {
            continue;
        };
        let lambda = -slope;
        if lambda <= 0.0 || r_squared < MIN_R_SQUARED {
            continue;
        }
        let n = reg_times.len() as f64;
        let candidate = LambdaZ {
            lambda_z: lambda,
            half_life: std::f64::consts::LN_2 / lambda,
            r_squared,
            adj_r_squared: 1.0 - (1.0 - r_squared) * (n - 1.0) / (n - 2.0),
            n_points: reg_times.len(),
        };
        match &best {
            None => best = Some(candidate),
            Some(current) => {
                let r_diff = candidate.adj_r_squared - current.adj_r_squared;
                if r_diff > R_SQUARED_TOLERANCE
                    || (r_diff >= -R_SQUARED_TOLERANCE && candidate.n_points > current.n_points)
                {
                    best = Some(candidate);
                }
            }
        }
    }
    best
}

/// Non-compartmental parameters of one concentration profile.
///
/// Terminal-phase parameters are `None` when no acceptable λz regression
/// exists; dose-normalized parameters additionally require a positive dose.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PkParameters {
    pub cmax: f64,
    pub tmax: f64,
    /// AUC to the last time point (lin-up/log-down).
    pub auc: f64,
    pub auc_inf: Option<f64>,
    pub lambda_z: Option<f64>,
    pub thalf: Option<f64>,
    /// Terminal elimination rate constant, identical to λz for NCA.
    pub kel: Option<f64>,
    /// Total clearance dose / AUC∞.
    pub cl: Option<f64>,
    /// Volume of distribution cl / λz.
    pub vd: Option<f64>,
}

/// Full NCA of one profile. `dose` is in amount units consistent with the
/// concentration (mmole for mM profiles); pass 0.0 when no dose applies.
pub fn pk_parameters(times: &[f64], concentrations: &[f64], dose: f64) -> Option<PkParameters> {
    if times.is_empty() || times.len() != concentrations.len() {
        return None;
    }
    let (tmax_idx, &cmax) = concentrations
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))?;
    let auc_last = auc(times, concentrations, AucMethod::LinUpLogDown);

    let terminal = lambda_z(times, concentrations);
    let (lambda, thalf) = match &terminal {
        Some(lz) => (Some(lz.lambda_z), Some(lz.half_life)),
        None => (None, None),
    };
    let clast = *concentrations.last()?;
    let auc_inf = lambda.map(|lz| auc_last + clast / lz);
    let cl = match (auc_inf, dose > 0.0) {
        (Some(auc_inf), true) if auc_inf > 0.0 => Some(dose / auc_inf),
        _ => None,
    };
    let vd = match (cl, lambda) {
        (Some(cl), Some(lz)) => Some(cl / lz),
        _ => None,
    };

    Some(PkParameters {
        cmax,
        tmax: times[tmax_idx],
        auc: auc_last,
        auc_inf,
        lambda_z: lambda,
        thalf,
        kel: lambda,
        cl,
        vd,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn exponential_profile(c0: f64, k: f64, n: usize, dt: f64) -> (Vec<f64>, Vec<f64>) {
        let times: Vec<f64> = (0..n).map(|i| i as f64 * dt).collect();
        let concs: Vec<f64> = times.iter().map(|t| c0 * (-k * t).exp()).collect();
        (times, concs)
    }

    #[test]
    fn test_auc_linear_rectangle() {
        let times = [0.0, 1.0, 2.0];
        let concs = [2.0, 2.0, 2.0];
        assert_relative_eq!(auc(&times, &concs, AucMethod::Linear), 4.0);
        assert_relative_eq!(auc(&times, &concs, AucMethod::LinUpLogDown), 4.0);
    }

    #[test]
    fn test_auc_log_exact_for_exponential() {
        // lin-up/log-down is exact on a mono-exponential decay
        let (times, concs) = exponential_profile(10.0, 0.1, 20, 1.0);
        let exact = 10.0 / 0.1 * (1.0 - (-0.1f64 * 19.0).exp());
        assert_relative_eq!(
            auc(&times, &concs, AucMethod::LinUpLogDown),
            exact,
            max_relative = 1e-12
        );
        // the linear trapezoid overestimates a convex decay
        assert!(auc(&times, &concs, AucMethod::Linear) > exact);
    }

    #[test]
    fn test_lambda_z_recovers_rate() {
        let (times, concs) = exponential_profile(10.0, 0.05, 30, 2.0);
        let lz = lambda_z(&times, &concs).unwrap();
        assert_relative_eq!(lz.lambda_z, 0.05, max_relative = 1e-9);
        assert_relative_eq!(lz.half_life, std::f64::consts::LN_2 / 0.05, max_relative = 1e-9);
        assert!(lz.r_squared > 0.999);
    }

    #[test]
    fn test_pk_parameters_iv_bolus() {
        let (times, concs) = exponential_profile(8.0, 0.2, 50, 0.5);
        let dose = 16.0; // c0 * v with v = 2
        let pk = pk_parameters(&times, &concs, dose).unwrap();
        assert_relative_eq!(pk.cmax, 8.0);
        assert_relative_eq!(pk.tmax, 0.0);
        // AUC∞ = c0/k, cl = dose/AUC∞ = v*k, vd = v
        assert_relative_eq!(pk.auc_inf.unwrap(), 40.0, max_relative = 1e-6);
        assert_relative_eq!(pk.cl.unwrap(), 0.4, max_relative = 1e-6);
        assert_relative_eq!(pk.vd.unwrap(), 2.0, max_relative = 1e-6);
        assert_relative_eq!(pk.kel.unwrap(), 0.2, max_relative = 1e-9);
    }

    #[test]
    fn test_no_terminal_phase() {
        // monotone rising profile has no terminal slope
        let times = [0.0, 1.0, 2.0, 3.0, 4.0];
        let concs = [0.0, 1.0, 2.0, 3.0, 4.0];
        let pk = pk_parameters(&times, &concs, 1.0).unwrap();
        assert!(pk.lambda_z.is_none());
        assert!(pk.cl.is_none());
        assert_relative_eq!(pk.cmax, 4.0);
    }
}
