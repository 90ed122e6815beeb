//! SurrealDB implementation of [`PracticeRepository`].

use chrono::{DateTime, Utc};
use gpm_core::error::GpmResult;
use gpm_core::models::practice::{CreatePractice, Practice, SubscriptionTier, UpdatePractice};
use gpm_core::repository::{PaginatedResult, Pagination, PracticeRepository};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::write_error;
use crate::error::DbError;

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct PracticeRow {
    name: String,
    slug: String,
    is_trial: bool,
    trial_ends_at: Option<DateTime<Utc>>,
    subscription_tier: String,
    is_active: bool,
    metadata: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct PracticeRowWithId {
    record_id: String,
    name: String,
    slug: String,
    is_trial: bool,
    trial_ends_at: Option<DateTime<Utc>>,
    subscription_tier: String,
    is_active: bool,
    metadata: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn parse_tier(s: &str) -> Result<SubscriptionTier, DbError> {
    SubscriptionTier::parse(s)
        .ok_or_else(|| DbError::Corrupt(format!("unknown subscription tier: {s}")))
}

impl PracticeRow {
    fn into_practice(self, id: Uuid) -> Result<Practice, DbError> {
        Ok(Practice {
            id,
            name: self.name,
            slug: self.slug,
            is_trial: self.is_trial,
            trial_ends_at: self.trial_ends_at,
            subscription_tier: parse_tier(&self.subscription_tier)?,
            is_active: self.is_active,
            metadata: self.metadata,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl PracticeRowWithId {
    fn try_into_practice(self) -> Result<Practice, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Corrupt(format!("invalid UUID: {e}")))?;
        Ok(Practice {
            id,
            name: self.name,
            slug: self.slug,
            is_trial: self.is_trial,
            trial_ends_at: self.trial_ends_at,
            subscription_tier: parse_tier(&self.subscription_tier)?,
            is_active: self.is_active,
            metadata: self.metadata,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

/// SurrealDB implementation of the Practice repository.
#[derive(Clone)]
pub struct SurrealPracticeRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealPracticeRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> PracticeRepository for SurrealPracticeRepository<C> {
    async fn create(&self, input: CreatePractice) -> GpmResult<Practice> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();
        let is_trial = input.trial_ends_at.is_some();
        let metadata = input
            .metadata
            .unwrap_or(serde_json::Value::Object(Default::default()));

        let result = self
            .db
            .query(
                "CREATE type::record('practice', $id) SET \
                 name = $name, slug = $slug, \
                 is_trial = $is_trial, \
                 trial_ends_at = $trial_ends_at, \
                 subscription_tier = $subscription_tier, \
                 is_active = true, \
                 metadata = $metadata",
            )
            .bind(("id", id_str.clone()))
            .bind(("name", input.name))
            .bind(("slug", input.slug))
            .bind(("is_trial", is_trial))
            .bind(("trial_ends_at", input.trial_ends_at))
            .bind(("subscription_tier", input.subscription_tier.as_str().to_string()))
            .bind(("metadata", metadata))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| write_error("practice", e))?;

        let rows: Vec<PracticeRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "practice".into(),
            id: id_str,
        })?;

        Ok(row.into_practice(id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> GpmResult<Practice> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('practice', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PracticeRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "practice".into(),
            id: id_str,
        })?;

        Ok(row.into_practice(id)?)
    }

    async fn get_by_slug(&self, slug: &str) -> GpmResult<Practice> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM practice \
                 WHERE slug = $slug",
            )
            .bind(("slug", slug.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PracticeRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "practice".into(),
            id: format!("slug={slug}"),
        })?;

        Ok(row.try_into_practice()?)
    }

    async fn update(&self, id: Uuid, input: UpdatePractice) -> GpmResult<Practice> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.is_trial.is_some() {
            sets.push("is_trial = $is_trial");
        }
        if input.trial_ends_at.is_some() {
            sets.push("trial_ends_at = $trial_ends_at");
        }
        if input.subscription_tier.is_some() {
            sets.push("subscription_tier = $subscription_tier");
        }
        if input.is_active.is_some() {
            sets.push("is_active = $is_active");
        }
        if input.metadata.is_some() {
            sets.push("metadata = $metadata");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('practice', $id) SET {}",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id_str.clone()));

        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(is_trial) = input.is_trial {
            builder = builder.bind(("is_trial", is_trial));
        }
        if let Some(trial_ends_at) = input.trial_ends_at {
            // Option<Option<_>>: Some(None) clears the end date.
            builder = builder.bind(("trial_ends_at", trial_ends_at));
        }
        if let Some(tier) = input.subscription_tier {
            builder = builder.bind(("subscription_tier", tier.as_str().to_string()));
        }
        if let Some(is_active) = input.is_active {
            builder = builder.bind(("is_active", is_active));
        }
        if let Some(metadata) = input.metadata {
            builder = builder.bind(("metadata", metadata));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| write_error("practice", e))?;

        let rows: Vec<PracticeRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "practice".into(),
            id: id_str,
        })?;

        Ok(row.into_practice(id)?)
    }

    async fn list(&self, pagination: Pagination) -> GpmResult<PaginatedResult<Practice>> {
        let mut count_result = self
            .db
            .query("SELECT count() AS total FROM practice GROUP ALL")
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM practice \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PracticeRowWithId> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_practice())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
