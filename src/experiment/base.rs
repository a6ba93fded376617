//! Shared definitions for the dulaglutide experiments.
//!
//! Fitted parameter values, healthy baselines, molecular weights, the
//! renal-function and cirrhosis severity maps and the standard output
//! selections used by every study.

use std::collections::BTreeMap;

use lazy_static::lazy_static;

use crate::units::{Quantity, Unit};

pub use crate::models::MR_DUL;

/// Molecular weight of glucose [g/mole].
pub const MR_GLC: f64 = 180.16;

/// Healthy HbA1c fraction (5 %).
pub const HBA1C_HEALTHY: f64 = 0.05;
/// Healthy fasting plasma glucose [mM].
pub const FPG_HEALTHY: f64 = 5.0;

/// Estimated mean plasma glucose [mM] from HbA1c [percent] (Rohlfing2002).
pub fn apg_from_hba1c(hba1c: f64) -> f64 {
    1.98 * hba1c - 4.29
}

/// Convert fasting plasma glucose from mg/dl to mM.
pub fn fpg_from_mg_dl(value: f64) -> f64 {
    value / 18.0182
}

/// Default parameter changes applied to every simulation: the values from
/// the least-squares runs against the pharmacokinetic and pharmacodynamic
/// study data.
pub fn default_changes() -> Vec<(String, Quantity)> {
    vec![
        (
            "Ksc_dul".to_string(),
            Quantity::new(0.00036025565931605973, Unit::PerMin),
        ),
        (
            "DUL2DM_k".to_string(),
            Quantity::new(0.0021305886683688447, Unit::LitrePerMin),
        ),
        (
            "KI__DMEX_k".to_string(),
            Quantity::new(0.049281819602663014, Unit::PerMin),
        ),
        (
            "EC50_FAT".to_string(),
            Quantity::new(121.39836298612472, Unit::MilliMolar),
        ),
        (
            "Emax_FAT".to_string(),
            Quantity::new(9.058086828747667e-05, Unit::PerMin),
        ),
        (
            "k_fpg".to_string(),
            Quantity::new(1.0382112207761474, Unit::LitreSquaredPerMinPerMMole),
        ),
    ]
}

/// Physiological baseline changes for a study arm: bodyweight [kg], HbA1c
/// [percent] and FPG [mM]. HbA1c and FPG are set both as the baseline
/// parameter and the species initial value.
pub fn baseline_changes(bodyweight: f64, hba1c_percent: f64, fpg: f64) -> Vec<(String, Quantity)> {
    vec![
        ("BW0".to_string(), Quantity::new(bodyweight, Unit::Kg)),
        ("hba1c0".to_string(), Quantity::new(hba1c_percent, Unit::Percent)),
        ("hba1c".to_string(), Quantity::new(hba1c_percent, Unit::Percent)),
        ("fpg0".to_string(), Quantity::new(fpg, Unit::MilliMolar)),
        ("[fpg]".to_string(), Quantity::new(fpg, Unit::MilliMolar)),
    ]
}

/// Healthy-subject baseline with the given bodyweight.
pub fn healthy_changes(bodyweight: f64) -> Vec<(String, Quantity)> {
    baseline_changes(bodyweight, 100.0 * HBA1C_HEALTHY, FPG_HEALTHY)
}

/// Standard selections recorded for every experiment.
pub fn selections() -> Vec<String> {
    [
        "IVDOSE_dul",
        "SCDOSE_dul",
        "[Cve_dul]",
        "[Cve_dm]",
        "[Cve_dmtot]",
        "Aurine_dm",
        "Afeces_dm",
        "KI__f_renal_function",
        "f_cirrhosis",
        "BW0",
        "BW",
        "BW_change",
        "BW_ratio",
        "hba1c0",
        "hba1c",
        "hba1c_change",
        "hba1c_ratio",
        "fpg0",
        "[fpg]",
        "fpg_change",
        "fpg_ratio",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

lazy_static! {
    /// Renal function as fraction of the normal eGFR (midpoints of the KDIGO
    /// ranges relative to 101 ml/min).
    pub static ref RENAL_MAP: BTreeMap<&'static str, f64> = BTreeMap::from([
        ("Normal renal function", 1.0),
        ("Mild renal impairment", 50.0 / 101.0),
        ("Moderate renal impairment", 35.0 / 101.0),
        ("Severe renal impairment", 20.0 / 101.0),
        ("End stage renal disease", 10.5 / 101.0),
    ]);

    /// Cirrhosis severity `f_cirrhosis` by Child-Pugh grade.
    pub static ref CIRRHOSIS_MAP: BTreeMap<&'static str, f64> = BTreeMap::from([
        ("Control", 0.0),
        ("Mild cirrhosis", 0.3994897959183674),
        ("Moderate cirrhosis", 0.6979591836734694),
        ("Severe cirrhosis", 0.8127551020408164),
    ]);

    /// Human-readable labels for the standard selections.
    pub static ref LABELS: BTreeMap<&'static str, &'static str> = BTreeMap::from([
        ("time", "time"),
        ("[Cve_dul]", "dulaglutide plasma"),
        ("[Cve_dm]", "dulaglutide metabolites"),
        ("[Cve_dmtot]", "dulaglutide and metabolites"),
        ("Aurine_dm", "dulaglutide metabolites urine"),
        ("Afeces_dm", "dulaglutide metabolites feces"),
        ("BW", "bodyweight"),
        ("BW_change", "bodyweight change"),
        ("BW_ratio", "bodyweight ratio"),
        ("hba1c", "HbA1c"),
        ("hba1c_change", "HbA1c change"),
        ("hba1c_ratio", "HbA1c ratio"),
        ("[fpg]", "FPG"),
        ("fpg_change", "FPG change"),
        ("fpg_ratio", "FPG ratio"),
    ]);

    /// Display units for the standard selections.
    pub static ref UNITS: BTreeMap<&'static str, &'static str> = BTreeMap::from([
        ("time", "week"),
        ("[Cve_dul]", "nM"),
        ("[Cve_dm]", "nM"),
        ("[Cve_dmtot]", "nM"),
        ("Aurine_dm", "µmole"),
        ("Afeces_dm", "µmole"),
        ("BW", "kg"),
        ("BW_change", "kg"),
        ("BW_ratio", "dimensionless"),
        ("hba1c", "percent"),
        ("hba1c_change", "percent"),
        ("hba1c_ratio", "dimensionless"),
        ("[fpg]", "mM"),
        ("fpg_change", "mM"),
        ("fpg_ratio", "dimensionless"),
    ]);
}

/// One week in model time [min].
pub const WEEK: f64 = 7.0 * 24.0 * 60.0;

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_apg_from_hba1c() {
        // Rohlfing regression at typical T2DM baseline
        assert_relative_eq!(apg_from_hba1c(8.1), 11.748, max_relative = 1e-12);
        assert!(apg_from_hba1c(5.0) > 5.0);
    }

    #[test]
    fn test_maps_are_ordered_by_severity() {
        assert_relative_eq!(RENAL_MAP["Normal renal function"], 1.0);
        assert!(RENAL_MAP["Mild renal impairment"] > RENAL_MAP["Severe renal impairment"]);
        assert_relative_eq!(CIRRHOSIS_MAP["Control"], 0.0);
        assert!(CIRRHOSIS_MAP["Severe cirrhosis"] > CIRRHOSIS_MAP["Mild cirrhosis"]);
    }

    #[test]
    fn test_default_changes_complete() {
        let changes = default_changes();
        assert_eq!(changes.len(), 6);
        for key in [
            "Ksc_dul",
            "DUL2DM_k",
            "KI__DMEX_k",
            "EC50_FAT",
            "Emax_FAT",
            "k_fpg",
        ] {
            assert!(changes.iter().any(|(k, _)| k == key));
        }
    }
}
