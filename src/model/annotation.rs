//! Descriptive ontology annotations.
//!
//! Annotations attach biological meaning (tissue, chemical identity, process
//! class) to model elements. They are carried through serialization and have
//! no effect on the mathematics.

use serde::{Deserialize, Serialize};

/// Relation qualifier between a model element and an ontology resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Qualifier {
    Is,
    HasPart,
    IsPartOf,
    IsVersionOf,
    OccursIn,
    HasProperty,
}

/// Ontology cross-reference, e.g. `(OccursIn, "fma/FMA:7203")` for kidney.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub qualifier: Qualifier,
    pub resource: String,
}

impl Annotation {
    pub fn new(qualifier: Qualifier, resource: impl Into<String>) -> Self {
        Self {
            qualifier,
            resource: resource.into(),
        }
    }
}

/// Systems-biology ontology class of a model element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SboTerm {
    PhysicalCompartment,
    SimpleChemical,
    QuantitativeParameter,
    KineticConstant,
    BiochemicalReaction,
    TransportReaction,
}
