//! Person types for the pedigree kernel.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Age at which a photo best represents a person in the tree.
pub const PREFERRED_PHOTO_AGE: i32 = 35;

/// Display name used when a person has no usable name.
pub const UNNAMED: &str = "Unnamed";

/// Unique identifier for a person in the record store.
///
/// Wraps the numeric row id and implements `Ord` for deterministic ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersonId(i64);

impl PersonId {
    /// Create a new PersonId.
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the inner numeric id.
    pub const fn get(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for PersonId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Recorded sex of a person.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    /// Recorded as male.
    Male,
    /// Recorded as female.
    Female,
    /// Unknown or not recorded.
    Unknown,
}

impl Sex {
    /// Parse a GEDCOM-style sex code ("M", "F", anything else is unknown).
    pub fn from_code(code: Option<&str>) -> Self {
        match code.map(|c| c.trim().to_ascii_uppercase()) {
            Some(c) if c == "M" => Self::Male,
            Some(c) if c == "F" => Self::Female,
            _ => Self::Unknown,
        }
    }
}

impl Default for Sex {
    fn default() -> Self {
        Self::Unknown
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Male => write!(f, "M"),
            Self::Female => write!(f, "F"),
            Self::Unknown => write!(f, "U"),
        }
    }
}

/// A recorded name of a person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonName {
    /// Store id of the name row (tie-breaker for equal order).
    pub id: i64,
    /// Given name(s).
    pub given_name: Option<String>,
    /// Family name.
    pub family_name: Option<String>,
    /// Preference order, lowest first. Unordered names sort last.
    pub name_order: Option<i32>,
}

impl PersonName {
    /// Create a name without an explicit order.
    pub fn new(id: i64, given_name: impl Into<String>, family_name: impl Into<String>) -> Self {
        Self {
            id,
            given_name: Some(given_name.into()),
            family_name: Some(family_name.into()),
            name_order: None,
        }
    }

    /// Set the preference order.
    pub fn with_order(mut self, order: i32) -> Self {
        self.name_order = Some(order);
        self
    }

    fn sort_key(&self) -> (i32, i64) {
        (self.name_order.unwrap_or(i32::MAX), self.id)
    }

    fn joined(&self) -> String {
        format!(
            "{} {}",
            self.given_name.as_deref().unwrap_or(""),
            self.family_name.as_deref().unwrap_or("")
        )
        .trim()
        .to_string()
    }
}

/// A photo attached to a person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoRecord {
    /// Store id of the media row.
    pub media_id: i64,
    /// Whether the photo was explicitly chosen as the person's default.
    pub is_default: bool,
    /// Age of the person on the photo, if known.
    pub age_on_photo: Option<i32>,
}

impl PhotoRecord {
    /// URL under which the rendering surface fetches the photo.
    pub fn url(&self) -> String {
        format!("/api/media/{}/file", self.media_id)
    }
}

/// A photo as exposed to the rendering surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreePhoto {
    /// Photo URL.
    pub url: String,
    /// Age of the person on the photo, if known.
    pub age: Option<i32>,
    /// Effective default (explicit, or promoted as closest to the preferred age).
    pub is_default: bool,
}

/// A life event, opaque to the layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonEvent {
    /// Human-readable event type.
    pub event_type: String,
    /// Exact date, as stored.
    pub event_date: Option<String>,
    /// Approximate date, as stored.
    pub event_date_approx: Option<String>,
    /// Place of the event.
    pub event_place: Option<String>,
    /// Free-text description.
    pub description: Option<String>,
}

/// A person as returned by the record store.
///
/// Dates are opaque strings and are never parsed by this crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonRecord {
    /// Unique person identifier.
    pub id: PersonId,
    /// GEDCOM cross-reference id (e.g. "I12"), if imported.
    pub gedcom_id: Option<String>,
    /// Recorded sex.
    pub sex: Sex,
    /// Exact birth date.
    pub birth_date: Option<String>,
    /// Approximate birth date (e.g. "ABT 1970").
    pub birth_date_approx: Option<String>,
    /// Exact death date.
    pub death_date: Option<String>,
    /// Approximate death date.
    pub death_date_approx: Option<String>,
    /// All recorded names.
    pub names: Vec<PersonName>,
    /// Attached photos.
    pub photos: Vec<PhotoRecord>,
    /// Events, already ordered by the store.
    pub events: Vec<PersonEvent>,
}

impl PersonRecord {
    /// Create a record with only an id and sex.
    pub fn new(id: PersonId, sex: Sex) -> Self {
        Self {
            id,
            gedcom_id: None,
            sex,
            birth_date: None,
            birth_date_approx: None,
            death_date: None,
            death_date_approx: None,
            names: Vec::new(),
            photos: Vec::new(),
            events: Vec::new(),
        }
    }

    /// Add a name.
    pub fn with_name(mut self, given: &str, family: &str) -> Self {
        let id = self.names.len() as i64 + 1;
        self.names.push(PersonName::new(id, given, family));
        self
    }

    /// Set the GEDCOM cross-reference id.
    pub fn with_gedcom_id(mut self, gedcom_id: &str) -> Self {
        self.gedcom_id = Some(gedcom_id.to_string());
        self
    }

    /// Set the exact birth date.
    pub fn with_birth_date(mut self, date: &str) -> Self {
        self.birth_date = Some(date.to_string());
        self
    }

    /// Set the approximate birth date.
    pub fn with_birth_date_approx(mut self, date: &str) -> Self {
        self.birth_date_approx = Some(date.to_string());
        self
    }

    /// Add a photo.
    pub fn with_photo(mut self, photo: PhotoRecord) -> Self {
        self.photos.push(photo);
        self
    }

    /// Primary display name: lowest `name_order`, then lowest name id.
    pub fn display_name(&self) -> String {
        self.names
            .iter()
            .min_by_key(|n| n.sort_key())
            .map(PersonName::joined)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| UNNAMED.to_string())
    }

    /// Best photo URL for tree display.
    ///
    /// Explicit default first, then the photo closest to the preferred age,
    /// then the first photo.
    pub fn primary_photo_url(&self) -> Option<String> {
        if let Some(default) = self.photos.iter().find(|p| p.is_default) {
            return Some(default.url());
        }
        self.closest_to_preferred_age()
            .or_else(|| self.photos.first())
            .map(PhotoRecord::url)
    }

    /// Photos ordered by age (unknown last), with an effective default flagged.
    pub fn tree_photos(&self) -> Vec<TreePhoto> {
        let mut photos: Vec<TreePhoto> = self
            .photos
            .iter()
            .map(|p| TreePhoto {
                url: p.url(),
                age: p.age_on_photo,
                is_default: p.is_default,
            })
            .collect();
        // Stable sort keeps store order among equal ages.
        photos.sort_by_key(|p| p.age.unwrap_or(i32::MAX));

        if !photos.is_empty() && !photos.iter().any(|p| p.is_default) {
            let best = photos
                .iter()
                .enumerate()
                .filter_map(|(i, p)| p.age.map(|age| (i, (age - PREFERRED_PHOTO_AGE).abs())))
                .min_by_key(|&(i, diff)| (diff, i))
                .map(|(i, _)| i)
                .unwrap_or(0);
            photos[best].is_default = true;
        }
        photos
    }

    fn closest_to_preferred_age(&self) -> Option<&PhotoRecord> {
        self.photos
            .iter()
            .enumerate()
            .filter_map(|(i, p)| p.age_on_photo.map(|age| (i, (age - PREFERRED_PHOTO_AGE).abs(), p)))
            .min_by_key(|&(i, diff, _)| (diff, i))
            .map(|(_, _, p)| p)
    }
}

/// A person placed in a tree result.
///
/// Created by traversal and immutable afterward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonNode {
    /// Unique person identifier.
    pub id: PersonId,
    /// GEDCOM cross-reference id.
    pub gedcom_id: Option<String>,
    /// Signed distance from the focus (negative = ancestor).
    pub generation: i32,
    /// Recorded sex.
    pub sex: Sex,
    /// Exact birth date.
    pub birth_date: Option<String>,
    /// Approximate birth date.
    pub birth_date_approx: Option<String>,
    /// Exact death date.
    pub death_date: Option<String>,
    /// Approximate death date.
    pub death_date_approx: Option<String>,
    /// Display name.
    pub display_name: String,
    /// Primary photo URL.
    pub photo_url: Option<String>,
    /// All photos, ordered by age.
    pub photos: Vec<TreePhoto>,
    /// Events in store order.
    pub events: Vec<PersonEvent>,
}

impl PersonNode {
    /// Build a node from a store record at the given generation.
    pub fn from_record(record: PersonRecord, generation: i32) -> Self {
        let display_name = record.display_name();
        let photo_url = record.primary_photo_url();
        let photos = record.tree_photos();
        Self {
            id: record.id,
            gedcom_id: record.gedcom_id,
            generation,
            sex: record.sex,
            birth_date: record.birth_date,
            birth_date_approx: record.birth_date_approx,
            death_date: record.death_date,
            death_date_approx: record.death_date_approx,
            display_name,
            photo_url,
            photos,
            events: record.events,
        }
    }

    /// Bare node for layout-only use.
    pub fn bare(id: PersonId, generation: i32) -> Self {
        Self::from_record(PersonRecord::new(id, Sex::Unknown), generation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn photo(media_id: i64, is_default: bool, age: Option<i32>) -> PhotoRecord {
        PhotoRecord { media_id, is_default, age_on_photo: age }
    }

    #[test]
    fn test_sex_from_code() {
        assert_eq!(Sex::from_code(Some("M")), Sex::Male);
        assert_eq!(Sex::from_code(Some(" f ")), Sex::Female);
        assert_eq!(Sex::from_code(Some("X")), Sex::Unknown);
        assert_eq!(Sex::from_code(None), Sex::Unknown);
    }

    #[test]
    fn test_display_name_prefers_lowest_order() {
        let mut record = PersonRecord::new(PersonId::new(1), Sex::Female);
        record.names.push(PersonName::new(1, "Maiden", "Name"));
        record.names.push(PersonName::new(2, "Anna", "Smith").with_order(0));
        assert_eq!(record.display_name(), "Anna Smith");
    }

    #[test]
    fn test_display_name_fallback() {
        let record = PersonRecord::new(PersonId::new(1), Sex::Male);
        assert_eq!(record.display_name(), UNNAMED);

        let blank = PersonRecord::new(PersonId::new(2), Sex::Male).with_name("", " ");
        assert_eq!(blank.display_name(), UNNAMED);
    }

    #[test]
    fn test_primary_photo_priority() {
        let record = PersonRecord::new(PersonId::new(1), Sex::Male)
            .with_photo(photo(10, false, Some(5)))
            .with_photo(photo(11, false, Some(40)))
            .with_photo(photo(12, false, None));
        assert_eq!(record.primary_photo_url().as_deref(), Some("/api/media/11/file"));

        let with_default = record.clone().with_photo(photo(13, true, Some(80)));
        assert_eq!(with_default.primary_photo_url().as_deref(), Some("/api/media/13/file"));

        let undated = PersonRecord::new(PersonId::new(2), Sex::Male)
            .with_photo(photo(20, false, None))
            .with_photo(photo(21, false, None));
        assert_eq!(undated.primary_photo_url().as_deref(), Some("/api/media/20/file"));
    }

    #[test]
    fn test_tree_photos_promote_effective_default() {
        let record = PersonRecord::new(PersonId::new(1), Sex::Male)
            .with_photo(photo(10, false, None))
            .with_photo(photo(11, false, Some(60)))
            .with_photo(photo(12, false, Some(30)));
        let photos = record.tree_photos();

        let ages: Vec<_> = photos.iter().map(|p| p.age).collect();
        assert_eq!(ages, vec![Some(30), Some(60), None]);
        assert!(photos[0].is_default);
        assert_eq!(photos.iter().filter(|p| p.is_default).count(), 1);
    }

    #[test]
    fn test_node_carries_gedcom_id() {
        let record = PersonRecord::new(PersonId::new(7), Sex::Female).with_gedcom_id("I7");
        let node = PersonNode::from_record(record, -1);
        assert_eq!(node.gedcom_id.as_deref(), Some("I7"));

        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["gedcom_id"], "I7");
        assert!(PersonNode::bare(PersonId::new(8), 0).gedcom_id.is_none());
    }
}
