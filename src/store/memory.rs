//! In-memory record store for testing.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use async_trait::async_trait;

use crate::types::{FamilyId, FamilyRecord, PersonId, PersonRecord};
use super::FamilyStore;

/// Error type for in-memory store.
#[derive(Debug, Clone, thiserror::Error)]
pub enum InMemoryError {
    /// Store was switched offline with [`InMemoryFamilyStore::set_unavailable`].
    #[error("Store unavailable")]
    Unavailable,
}

/// In-memory record store for testing.
///
/// Uses BTreeMap/BTreeSet for deterministic iteration order and counts
/// lookups so tests can assert the batching contract.
#[derive(Debug, Default)]
pub struct InMemoryFamilyStore {
    /// People by ID.
    people: BTreeMap<PersonId, PersonRecord>,
    /// Families by ID.
    families: BTreeMap<FamilyId, FamilyRecord>,
    /// Child -> families where the person is a child.
    child_of: BTreeMap<PersonId, BTreeSet<FamilyId>>,
    /// Partner -> families where the person is a partner.
    member_of: BTreeMap<PersonId, BTreeSet<FamilyId>>,
    /// Number of batched family lookups served.
    family_lookups: AtomicUsize,
    /// Number of person lookups served (single or batched).
    person_lookups: AtomicUsize,
    /// When set, every lookup fails.
    unavailable: AtomicBool,
}

impl InMemoryFamilyStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a person to the store.
    pub fn add_person(&mut self, person: PersonRecord) {
        self.people.insert(person.id, person);
    }

    /// Add a family to the store.
    ///
    /// Partners and children need not exist yet; dangling references are
    /// served as-is so callers can exercise corrupt data.
    pub fn add_family(&mut self, family: FamilyRecord) {
        for child in &family.child_ids {
            self.child_of.entry(*child).or_default().insert(family.id);
        }
        for partner in &family.partner_ids {
            self.member_of.entry(*partner).or_default().insert(family.id);
        }
        self.families.insert(family.id, family);
    }

    /// Get number of people.
    pub fn num_people(&self) -> usize {
        self.people.len()
    }

    /// Get number of families.
    pub fn num_families(&self) -> usize {
        self.families.len()
    }

    /// Number of batched family lookups served so far.
    pub fn family_lookups(&self) -> usize {
        self.family_lookups.load(Ordering::Relaxed)
    }

    /// Number of person lookups served so far.
    pub fn person_lookups(&self) -> usize {
        self.person_lookups.load(Ordering::Relaxed)
    }

    /// Reset the lookup counters.
    pub fn reset_counters(&self) {
        self.family_lookups.store(0, Ordering::Relaxed);
        self.person_lookups.store(0, Ordering::Relaxed);
    }

    /// Make every subsequent lookup fail (or succeed again).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::Relaxed);
    }

    fn check_available(&self) -> Result<(), InMemoryError> {
        if self.unavailable.load(Ordering::Relaxed) {
            Err(InMemoryError::Unavailable)
        } else {
            Ok(())
        }
    }

    fn collect_families(
        &self,
        index: &BTreeMap<PersonId, BTreeSet<FamilyId>>,
        ids: &[PersonId],
    ) -> Vec<FamilyRecord> {
        let family_ids: BTreeSet<FamilyId> = ids
            .iter()
            .filter_map(|id| index.get(id))
            .flatten()
            .copied()
            .collect();

        family_ids
            .into_iter()
            .filter_map(|id| self.families.get(&id))
            .map(|family| {
                let mut family = family.clone();
                self.order_children(&mut family.child_ids);
                family
            })
            .collect()
    }

    /// Order children elder-to-younger: exact birth date, then approximate
    /// year, undated last. Stable, so insertion order breaks ties.
    fn order_children(&self, children: &mut [PersonId]) {
        children.sort_by_cached_key(|id| birth_sort_key(self.people.get(id)));
    }
}

/// Sort key used by the store to order siblings.
fn birth_sort_key(person: Option<&PersonRecord>) -> (u8, String) {
    let Some(person) = person else {
        return (1, String::new());
    };
    if let Some(date) = &person.birth_date {
        return (0, date.clone());
    }
    if let Some(approx) = &person.birth_date_approx {
        // "ABT 1970", "BEF 12 MAR 1901" -> the last four-digit token
        if let Some(year) = approx
            .split_whitespace()
            .rev()
            .find(|part| part.len() == 4 && part.chars().all(|c| c.is_ascii_digit()))
        {
            return (0, year.to_string());
        }
    }
    (1, String::new())
}

#[async_trait]
impl FamilyStore for InMemoryFamilyStore {
    type Error = InMemoryError;

    async fn get_person(&self, id: PersonId) -> Result<Option<PersonRecord>, Self::Error> {
        self.check_available()?;
        self.person_lookups.fetch_add(1, Ordering::Relaxed);
        Ok(self.people.get(&id).cloned())
    }

    async fn get_people(&self, ids: &[PersonId]) -> Result<Vec<PersonRecord>, Self::Error> {
        self.check_available()?;
        self.person_lookups.fetch_add(1, Ordering::Relaxed);
        Ok(ids.iter()
            .filter_map(|id| self.people.get(id).cloned())
            .collect())
    }

    async fn get_families_where_child(&self, ids: &[PersonId]) -> Result<Vec<FamilyRecord>, Self::Error> {
        self.check_available()?;
        self.family_lookups.fetch_add(1, Ordering::Relaxed);
        Ok(self.collect_families(&self.child_of, ids))
    }

    async fn get_families_where_member(&self, ids: &[PersonId]) -> Result<Vec<FamilyRecord>, Self::Error> {
        self.check_available()?;
        self.family_lookups.fetch_add(1, Ordering::Relaxed);
        Ok(self.collect_families(&self.member_of, ids))
    }

    async fn is_healthy(&self) -> bool {
        self.check_available().is_ok()
    }
}
