//! Family record types.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::person::PersonId;

/// Unique identifier for a family record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FamilyId(i64);

impl FamilyId {
    /// Create a new FamilyId.
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the inner numeric id.
    pub const fn get(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for FamilyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for FamilyId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Kind of union a family record describes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FamilyType {
    /// Marriage (the default when nothing is recorded).
    Marriage,
    /// Adoption.
    Adoption,
    /// Foster care.
    Foster,
    /// Any other recorded type, kept verbatim.
    Other(String),
}

impl FamilyType {
    /// Parse family type from its stored string. Empty or missing means marriage.
    pub fn from_code(code: Option<&str>) -> Self {
        let code = code.map(str::trim).unwrap_or("");
        match code.to_lowercase().as_str() {
            "" | "marriage" => Self::Marriage,
            "adoption" | "adopted" => Self::Adoption,
            "foster" => Self::Foster,
            _ => Self::Other(code.to_string()),
        }
    }

    /// Relationship kind of child edges in a family of this type.
    pub fn relationship(&self) -> Relationship {
        match self {
            Self::Marriage => Relationship::Biological,
            _ => Relationship::NonBiological,
        }
    }
}

impl Default for FamilyType {
    fn default() -> Self {
        Self::Marriage
    }
}

impl fmt::Display for FamilyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Marriage => write!(f, "marriage"),
            Self::Adoption => write!(f, "adoption"),
            Self::Foster => write!(f, "foster"),
            Self::Other(s) => write!(f, "{}", s),
        }
    }
}

/// Relationship kind of a parent→child edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Relationship {
    /// Child of a marriage record.
    Biological,
    /// Child of any other family type.
    NonBiological,
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Biological => write!(f, "biological"),
            Self::NonBiological => write!(f, "non-biological"),
        }
    }
}

/// A family record as returned by the record store.
///
/// `child_ids` arrive already ordered by the store (birth date, approximate
/// date, undated last).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyRecord {
    /// Unique family identifier.
    pub id: FamilyId,
    /// Partners (members) of the family, in store order.
    pub partner_ids: Vec<PersonId>,
    /// Children of the family, in store order.
    pub child_ids: Vec<PersonId>,
    /// Type of union.
    pub family_type: FamilyType,
    /// Exact marriage date.
    pub marriage_date: Option<String>,
    /// Approximate marriage date.
    pub marriage_date_approx: Option<String>,
    /// Exact divorce date.
    pub divorce_date: Option<String>,
}

impl FamilyRecord {
    /// Create a marriage record.
    pub fn new(id: FamilyId, partner_ids: Vec<PersonId>, child_ids: Vec<PersonId>) -> Self {
        Self {
            id,
            partner_ids,
            child_ids,
            family_type: FamilyType::Marriage,
            marriage_date: None,
            marriage_date_approx: None,
            divorce_date: None,
        }
    }

    /// Set the family type.
    pub fn with_type(mut self, family_type: FamilyType) -> Self {
        self.family_type = family_type;
        self
    }

    /// Whether the given person is a partner in this family.
    pub fn has_partner(&self, id: PersonId) -> bool {
        self.partner_ids.contains(&id)
    }

    /// Whether the given person is a child in this family.
    pub fn has_child(&self, id: PersonId) -> bool {
        self.child_ids.contains(&id)
    }

    /// The couple record exposed in tree results.
    pub fn to_unit(&self) -> FamilyUnit {
        FamilyUnit {
            family_id: self.id,
            partner_ids: self.partner_ids.clone(),
            marriage_date: self.marriage_date.clone(),
            marriage_date_approx: self.marriage_date_approx.clone(),
            divorce_date: self.divorce_date.clone(),
            family_type: self.family_type.clone(),
        }
    }
}

/// A couple (or lone parent) and its union metadata.
///
/// All partners share one generation, one less than their children's.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyUnit {
    /// Family this unit was read from.
    pub family_id: FamilyId,
    /// One or two partners, in store order.
    pub partner_ids: Vec<PersonId>,
    /// Exact marriage date.
    pub marriage_date: Option<String>,
    /// Approximate marriage date.
    pub marriage_date_approx: Option<String>,
    /// Exact divorce date.
    pub divorce_date: Option<String>,
    /// Type of union.
    pub family_type: FamilyType,
}

impl FamilyUnit {
    /// Create a marriage unit with no metadata.
    pub fn new(family_id: FamilyId, partner_ids: Vec<PersonId>) -> Self {
        Self {
            family_id,
            partner_ids,
            marriage_date: None,
            marriage_date_approx: None,
            divorce_date: None,
            family_type: FamilyType::Marriage,
        }
    }

    /// Whether this unit has exactly two partners.
    pub fn is_couple(&self) -> bool {
        self.partner_ids.len() == 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_type_defaults_to_marriage() {
        assert_eq!(FamilyType::from_code(None), FamilyType::Marriage);
        assert_eq!(FamilyType::from_code(Some("")), FamilyType::Marriage);
        assert_eq!(FamilyType::from_code(Some("MARRIAGE")), FamilyType::Marriage);
        assert_eq!(
            FamilyType::from_code(Some("civil_union")),
            FamilyType::Other("civil_union".to_string())
        );
    }

    #[test]
    fn test_relationship_kind() {
        assert_eq!(FamilyType::Marriage.relationship(), Relationship::Biological);
        assert_eq!(FamilyType::Adoption.relationship(), Relationship::NonBiological);
        assert_eq!(
            FamilyType::Other("partnership".into()).relationship(),
            Relationship::NonBiological
        );
    }

    #[test]
    fn test_relationship_serializes_kebab_case() {
        let json = serde_json::to_string(&Relationship::NonBiological).unwrap();
        assert_eq!(json, "\"non-biological\"");
    }
}
