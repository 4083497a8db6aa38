//! PostgreSQL record store for production use.
//!
//! ## Configuration
//!
//! All settings can be configured via environment variables:
//! - `DATABASE_URL`: PostgreSQL connection string (required)
//! - `DB_MAX_CONNECTIONS`: Maximum pool size (default: 10)
//! - `DB_MIN_CONNECTIONS`: Minimum idle connections (default: 2)
//! - `DB_CONNECT_TIMEOUT_SECS`: Connection timeout (default: 10)
//! - `DB_IDLE_TIMEOUT_SECS`: Idle connection timeout (default: 300)
//! - `DB_MAX_LIFETIME_SECS`: Max connection lifetime (default: 1800)
//!
//! ## Schema
//!
//! Reads `main_individuals`, `main_individual_names`, `main_media`,
//! `main_events` (with `lookup_event_types` for labels), `main_families`,
//! `main_family_members` and `main_family_children`. Ids are read as
//! `int8` and dates as text.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;

use crate::types::{
    FamilyId, FamilyRecord, FamilyType, PersonEvent, PersonId, PersonName, PersonRecord,
    PhotoRecord, Sex,
};
use super::FamilyStore;

/// Configuration for PostgreSQL connection pool.
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Database connection URL.
    pub database_url: String,
    /// Maximum connections in pool (default: 10).
    pub max_connections: u32,
    /// Minimum idle connections to keep warm (default: 2).
    pub min_connections: u32,
    /// Connection acquire timeout in seconds (default: 10).
    pub connect_timeout_secs: u64,
    /// Idle connection timeout in seconds (default: 300 = 5 min).
    pub idle_timeout_secs: u64,
    /// Maximum connection lifetime in seconds (default: 1800 = 30 min).
    pub max_lifetime_secs: u64,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl PostgresConfig {
    /// Load configuration from environment variables with production defaults.
    pub fn from_env() -> Self {
        Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgresql://localhost/genealogy".to_string()),
            max_connections: env_or("DB_MAX_CONNECTIONS", 10),
            min_connections: env_or("DB_MIN_CONNECTIONS", 2),
            connect_timeout_secs: env_or("DB_CONNECT_TIMEOUT_SECS", 10),
            idle_timeout_secs: env_or("DB_IDLE_TIMEOUT_SECS", 300),
            max_lifetime_secs: env_or("DB_MAX_LIFETIME_SECS", 1800),
        }
    }
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Error type for PostgreSQL store.
#[derive(Debug, thiserror::Error)]
pub enum PostgresError {
    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Pool statistics for monitoring.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PoolStats {
    /// Current pool size.
    pub size: u32,
    /// Number of idle connections.
    pub idle: usize,
    /// Maximum pool size.
    pub max: u32,
}

/// PostgreSQL record store.
pub struct PostgresFamilyStore {
    pool: PgPool,
}

impl PostgresFamilyStore {
    /// Create a new store with the given configuration.
    pub async fn new(config: PostgresConfig) -> Result<Self, sqlx::Error> {
        tracing::info!(
            max_connections = config.max_connections,
            min_connections = config.min_connections,
            connect_timeout_secs = config.connect_timeout_secs,
            idle_timeout_secs = config.idle_timeout_secs,
            max_lifetime_secs = config.max_lifetime_secs,
            "Initializing PostgreSQL connection pool"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
            .test_before_acquire(true)
            .connect(&config.database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Create a store from environment variables.
    pub async fn from_env() -> Result<Self, sqlx::Error> {
        Self::new(PostgresConfig::from_env()).await
    }

    /// Get the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Get pool statistics for monitoring.
    pub fn pool_stats(&self) -> PoolStats {
        PoolStats {
            size: self.pool.size(),
            idle: self.pool.num_idle(),
            max: self.pool.options().get_max_connections(),
        }
    }

    fn parse_person_row(row: &PgRow) -> Result<PersonRecord, sqlx::Error> {
        let sex: Option<String> = row.try_get("sex_code")?;
        let mut person = PersonRecord::new(PersonId::new(row.try_get("id")?), Sex::from_code(sex.as_deref()));
        person.gedcom_id = row.try_get("gedcom_id")?;
        person.birth_date = row.try_get("birth_date")?;
        person.birth_date_approx = row.try_get("birth_date_approx")?;
        person.death_date = row.try_get("death_date")?;
        person.death_date_approx = row.try_get("death_date_approx")?;
        Ok(person)
    }

    fn parse_family_row(row: &PgRow) -> Result<FamilyRecord, sqlx::Error> {
        let family_type: Option<String> = row.try_get("family_type")?;
        let mut family = FamilyRecord::new(FamilyId::new(row.try_get("id")?), Vec::new(), Vec::new())
            .with_type(FamilyType::from_code(family_type.as_deref()));
        family.marriage_date = row.try_get("marriage_date")?;
        family.marriage_date_approx = row.try_get("marriage_date_approx")?;
        family.divorce_date = row.try_get("divorce_date")?;
        Ok(family)
    }

    /// Load families with their partners and birth-ordered children.
    async fn load_families(&self, family_ids: Vec<i64>) -> Result<Vec<FamilyRecord>, PostgresError> {
        if family_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            r#"
            SELECT id::int8 AS id, family_type,
                   marriage_date::text AS marriage_date, marriage_date_approx,
                   divorce_date::text AS divorce_date
            FROM main_families
            WHERE id = ANY($1)
            ORDER BY id
            "#
        )
        .bind(&family_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut families: BTreeMap<i64, FamilyRecord> = BTreeMap::new();
        for row in &rows {
            let family = Self::parse_family_row(row)?;
            families.insert(family.id.get(), family);
        }

        let members = sqlx::query(
            r#"
            SELECT family_id::int8 AS family_id, individual_id::int8 AS individual_id
            FROM main_family_members
            WHERE family_id = ANY($1)
            ORDER BY family_id, id
            "#
        )
        .bind(&family_ids)
        .fetch_all(&self.pool)
        .await?;

        for row in &members {
            let family_id: i64 = row.try_get("family_id")?;
            if let Some(family) = families.get_mut(&family_id) {
                family.partner_ids.push(PersonId::new(row.try_get("individual_id")?));
            }
        }

        // Elder to younger: exact date, then the last four-digit year of the
        // approximate date, undated last.
        let children = sqlx::query(
            r#"
            SELECT fc.family_id::int8 AS family_id, fc.child_id::int8 AS child_id
            FROM main_family_children fc
            LEFT JOIN main_individuals i ON i.id = fc.child_id
            WHERE fc.family_id = ANY($1)
            ORDER BY fc.family_id,
                     COALESCE(i.birth_date::text, (regexp_match(i.birth_date_approx, '.*(\d{4})'))[1]) IS NULL,
                     COALESCE(i.birth_date::text, (regexp_match(i.birth_date_approx, '.*(\d{4})'))[1]),
                     fc.id
            "#
        )
        .bind(&family_ids)
        .fetch_all(&self.pool)
        .await?;

        for row in &children {
            let family_id: i64 = row.try_get("family_id")?;
            if let Some(family) = families.get_mut(&family_id) {
                family.child_ids.push(PersonId::new(row.try_get("child_id")?));
            }
        }

        Ok(families.into_values().collect())
    }
}

#[async_trait]
impl FamilyStore for PostgresFamilyStore {
    type Error = PostgresError;

    async fn get_person(&self, id: PersonId) -> Result<Option<PersonRecord>, Self::Error> {
        Ok(self.get_people(&[id]).await?.into_iter().next())
    }

    async fn get_people(&self, ids: &[PersonId]) -> Result<Vec<PersonRecord>, Self::Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i64> = ids.iter().map(|id| id.get()).collect();

        let rows = sqlx::query(
            r#"
            SELECT id::int8 AS id, gedcom_id, sex_code,
                   birth_date::text AS birth_date, birth_date_approx,
                   death_date::text AS death_date, death_date_approx
            FROM main_individuals
            WHERE id = ANY($1)
            ORDER BY id
            "#
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut people: BTreeMap<i64, PersonRecord> = BTreeMap::new();
        for row in &rows {
            let person = Self::parse_person_row(row)?;
            people.insert(person.id.get(), person);
        }

        let names = sqlx::query(
            r#"
            SELECT id::int8 AS id, individual_id::int8 AS individual_id,
                   given_name, family_name, name_order
            FROM main_individual_names
            WHERE individual_id = ANY($1)
            ORDER BY individual_id, id
            "#
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        for row in &names {
            let owner: i64 = row.try_get("individual_id")?;
            if let Some(person) = people.get_mut(&owner) {
                person.names.push(PersonName {
                    id: row.try_get("id")?,
                    given_name: row.try_get("given_name")?,
                    family_name: row.try_get("family_name")?,
                    name_order: row.try_get("name_order")?,
                });
            }
        }

        let media = sqlx::query(
            r#"
            SELECT id::int8 AS id, individual_id::int8 AS individual_id,
                   COALESCE(is_default, false) AS is_default, age_on_photo
            FROM main_media
            WHERE individual_id = ANY($1)
              AND media_type_code = 'photo'
              AND file_path IS NOT NULL
            ORDER BY individual_id, id
            "#
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        for row in &media {
            let owner: i64 = row.try_get("individual_id")?;
            if let Some(person) = people.get_mut(&owner) {
                person.photos.push(PhotoRecord {
                    media_id: row.try_get("id")?,
                    is_default: row.try_get("is_default")?,
                    age_on_photo: row.try_get("age_on_photo")?,
                });
            }
        }

        let events = sqlx::query(
            r#"
            SELECT e.individual_id::int8 AS individual_id,
                   COALESCE(t.description, e.event_type_code) AS event_type,
                   e.event_date::text AS event_date, e.event_date_approx,
                   e.event_place, e.description
            FROM main_events e
            LEFT JOIN lookup_event_types t ON t.code = e.event_type_code
            WHERE e.individual_id = ANY($1)
            ORDER BY e.individual_id, COALESCE(e.event_date::text, ''),
                     COALESCE(e.event_date_approx, ''), e.id
            "#
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        for row in &events {
            let owner: i64 = row.try_get("individual_id")?;
            if let Some(person) = people.get_mut(&owner) {
                person.events.push(PersonEvent {
                    event_type: row.try_get("event_type")?,
                    event_date: row.try_get("event_date")?,
                    event_date_approx: row.try_get("event_date_approx")?,
                    event_place: row.try_get("event_place")?,
                    description: row.try_get("description")?,
                });
            }
        }

        Ok(people.into_values().collect())
    }

    async fn get_families_where_child(&self, ids: &[PersonId]) -> Result<Vec<FamilyRecord>, Self::Error> {
        let ids: Vec<i64> = ids.iter().map(|id| id.get()).collect();
        let rows = sqlx::query(
            r#"
            SELECT DISTINCT family_id::int8 AS family_id
            FROM main_family_children
            WHERE child_id = ANY($1)
            ORDER BY 1
            "#
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let family_ids = rows
            .iter()
            .map(|row| row.try_get("family_id"))
            .collect::<Result<Vec<i64>, _>>()?;
        self.load_families(family_ids).await
    }

    async fn get_families_where_member(&self, ids: &[PersonId]) -> Result<Vec<FamilyRecord>, Self::Error> {
        let ids: Vec<i64> = ids.iter().map(|id| id.get()).collect();
        let rows = sqlx::query(
            r#"
            SELECT DISTINCT family_id::int8 AS family_id
            FROM main_family_members
            WHERE individual_id = ANY($1)
            ORDER BY 1
            "#
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let family_ids = rows
            .iter()
            .map(|row| row.try_get("family_id"))
            .collect::<Result<Vec<i64>, _>>()?;
        self.load_families(family_ids).await
    }

    async fn is_healthy(&self) -> bool {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .is_ok()
    }
}
