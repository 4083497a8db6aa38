//! Data-quality warnings.
//!
//! Corrupt or inconsistent genealogical data never fails a tree request.
//! Each anomaly is resolved deterministically, logged, and carried in the
//! result as a [`DataWarning`].

use serde::{Deserialize, Serialize};
use std::fmt;

use super::family::FamilyId;
use super::person::PersonId;

/// Class of data inconsistency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataWarningKind {
    /// A family references a person the store does not return.
    MissingPerson,
    /// A link contradicts the generation already assigned to a person.
    GenerationMismatch,
    /// An edge references a family with no couple record.
    UnresolvedFamily,
    /// A child qualifies for more than one sibling group.
    AmbiguousMerge,
    /// A family with no partners or more than two.
    MalformedFamily,
}

impl fmt::Display for DataWarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingPerson => write!(f, "missing_person"),
            Self::GenerationMismatch => write!(f, "generation_mismatch"),
            Self::UnresolvedFamily => write!(f, "unresolved_family"),
            Self::AmbiguousMerge => write!(f, "ambiguous_merge"),
            Self::MalformedFamily => write!(f, "malformed_family"),
        }
    }
}

/// A non-fatal data-quality note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataWarning {
    /// Class of inconsistency.
    pub kind: DataWarningKind,
    /// Family involved, if any.
    pub family_id: Option<FamilyId>,
    /// Person involved, if any.
    pub person_id: Option<PersonId>,
    /// Human-readable detail.
    pub message: String,
}

impl DataWarning {
    /// Create a warning and log it.
    pub fn new(
        kind: DataWarningKind,
        family_id: Option<FamilyId>,
        person_id: Option<PersonId>,
        message: impl Into<String>,
    ) -> Self {
        let warning = Self {
            kind,
            family_id,
            person_id,
            message: message.into(),
        };
        tracing::warn!(
            kind = %warning.kind,
            family_id = ?warning.family_id.map(|f| f.get()),
            person_id = ?warning.person_id.map(|p| p.get()),
            "{}",
            warning.message
        );
        warning
    }
}
