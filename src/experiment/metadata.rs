//! Metadata attached to fit mappings.
//!
//! Each reference/observable pair is tagged with the clinical context of the
//! underlying measurement. The fitting layer filters mappings on these tags
//! (e.g. pharmacokinetic plasma data in healthy subjects only).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tissue {
    Plasma,
    Serum,
    Urine,
    Feces,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Route {
    Po,
    Im,
    Iv,
    Sc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dosing {
    Single,
    Multiple,
    ConstantInfusion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationForm {
    Tablet,
    Solution,
    Capsule,
    /// Mix of forms, e.g. po and iv.
    Mixed,
    NotReported,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InjectionSite {
    Abdomen,
    Thigh,
    UpperArm,
    NotReported,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Health {
    Healthy,
    T2dm,
    Hypertension,
    Cirrhosis,
    RenalImpairment,
    HepaticImpairment,
    Chf,
    T2dmRenalImpairment,
    Obese,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Fasting {
    NotReported,
    Fasted,
    Fed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Coadministration {
    None,
    Dapagliflozin,
    Gemigliptin,
    Rosuvastatin,
    AntihyperglycemicMedication,
    Metformin,
}

/// Clinical context of a fit mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingMetaData {
    pub tissue: Tissue,
    pub route: Route,
    pub application_form: ApplicationForm,
    pub dosing: Dosing,
    pub health: Health,
    pub fasting: Fasting,
    pub coadministration: Coadministration,
    pub injection_site: InjectionSite,
    pub outlier: bool,
}

impl MappingMetaData {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tissue: Tissue,
        route: Route,
        application_form: ApplicationForm,
        dosing: Dosing,
        health: Health,
        fasting: Fasting,
        coadministration: Coadministration,
    ) -> Self {
        Self {
            tissue,
            route,
            application_form,
            dosing,
            health,
            fasting,
            coadministration,
            injection_site: InjectionSite::NotReported,
            outlier: false,
        }
    }

    pub fn injection_site(mut self, site: InjectionSite) -> Self {
        self.injection_site = site;
        self
    }

    pub fn outlier(mut self) -> Self {
        self.outlier = true;
        self
    }
}
