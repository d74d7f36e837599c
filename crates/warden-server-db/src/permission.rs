// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Permission catalog repository.

use async_trait::async_trait;
use sqlx::sqlite::SqlitePool;
use tracing::instrument;
use warden_acl_core::{PermissionDefinition, PermissionId, PermissionKey, Site};

use crate::error::{DbError, Result};

#[async_trait]
pub trait PermissionStore: Send + Sync {
	/// Exact match on subject, action, value and site.
	async fn find(&self, key: &PermissionKey) -> Result<Option<PermissionDefinition>>;
	async fn insert(&self, key: &PermissionKey, published: bool) -> Result<PermissionId>;
	/// Deletes by exact match. Returns the number of rows removed.
	async fn delete(&self, key: &PermissionKey) -> Result<u64>;
	async fn published_for_site(&self, site: Site) -> Result<Vec<PermissionDefinition>>;
	/// Every definition, regardless of site or published state.
	async fn list_all(&self) -> Result<Vec<PermissionDefinition>>;
	async fn set_published(&self, id: PermissionId, published: bool) -> Result<bool>;
}

#[derive(Clone)]
pub struct SqlitePermissionRepository {
	pool: SqlitePool,
}

impl SqlitePermissionRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}
}

#[derive(sqlx::FromRow)]
struct PermissionRow {
	id: i64,
	subject: String,
	action: String,
	value: String,
	scope: String,
	published: bool,
}

impl TryFrom<PermissionRow> for PermissionDefinition {
	type Error = DbError;

	fn try_from(row: PermissionRow) -> Result<Self> {
		Ok(PermissionDefinition {
			id: PermissionId::new(row.id),
			subject: row.subject,
			action: row.action,
			value: row.value,
			site: row.scope.parse().map_err(DbError::Internal)?,
			published: row.published,
		})
	}
}

#[async_trait]
impl PermissionStore for SqlitePermissionRepository {
	#[instrument(skip(self), fields(key = %key))]
	async fn find(&self, key: &PermissionKey) -> Result<Option<PermissionDefinition>> {
		let row = sqlx::query_as::<_, PermissionRow>(
			r#"
			SELECT id, subject, action, value, scope, published
			FROM acl_permissions
			WHERE subject = ? AND action = ? AND value = ? AND scope = ?
			"#,
		)
		.bind(&key.subject)
		.bind(&key.action)
		.bind(&key.value)
		.bind(key.site.as_str())
		.fetch_optional(&self.pool)
		.await?;

		row.map(TryInto::try_into).transpose()
	}

	#[instrument(skip(self), fields(key = %key))]
	async fn insert(&self, key: &PermissionKey, published: bool) -> Result<PermissionId> {
		let result = sqlx::query(
			r#"
			INSERT INTO acl_permissions (subject, action, value, scope, published)
			VALUES (?, ?, ?, ?, ?)
			"#,
		)
		.bind(&key.subject)
		.bind(&key.action)
		.bind(&key.value)
		.bind(key.site.as_str())
		.bind(published)
		.execute(&self.pool)
		.await
		.map_err(|e| match e {
			sqlx::Error::Database(ref db) if db.is_unique_violation() => {
				DbError::Conflict(format!("permission {key} already registered"))
			}
			other => DbError::Sqlx(other),
		})?;

		let id = PermissionId::new(result.last_insert_rowid());
		tracing::debug!(permission_id = %id, key = %key, "permission inserted");
		Ok(id)
	}

	#[instrument(skip(self), fields(key = %key))]
	async fn delete(&self, key: &PermissionKey) -> Result<u64> {
		let result = sqlx::query(
			r#"
			DELETE FROM acl_permissions
			WHERE subject = ? AND action = ? AND value = ? AND scope = ?
			"#,
		)
		.bind(&key.subject)
		.bind(&key.action)
		.bind(&key.value)
		.bind(key.site.as_str())
		.execute(&self.pool)
		.await?;

		tracing::debug!(key = %key, rows = result.rows_affected(), "permission deleted");
		Ok(result.rows_affected())
	}

	#[instrument(skip(self), fields(site = %site))]
	async fn published_for_site(&self, site: Site) -> Result<Vec<PermissionDefinition>> {
		let rows = sqlx::query_as::<_, PermissionRow>(
			r#"
			SELECT id, subject, action, value, scope, published
			FROM acl_permissions
			WHERE scope = ? AND published = 1
			ORDER BY id
			"#,
		)
		.bind(site.as_str())
		.fetch_all(&self.pool)
		.await?;

		rows.into_iter().map(TryInto::try_into).collect()
	}

	#[instrument(skip(self))]
	async fn list_all(&self) -> Result<Vec<PermissionDefinition>> {
		let rows = sqlx::query_as::<_, PermissionRow>(
			r#"
			SELECT id, subject, action, value, scope, published
			FROM acl_permissions
			ORDER BY id
			"#,
		)
		.fetch_all(&self.pool)
		.await?;

		rows.into_iter().map(TryInto::try_into).collect()
	}

	#[instrument(skip(self), fields(permission_id = %id))]
	async fn set_published(&self, id: PermissionId, published: bool) -> Result<bool> {
		let result = sqlx::query("UPDATE acl_permissions SET published = ? WHERE id = ?")
			.bind(published)
			.bind(id.get())
			.execute(&self.pool)
			.await?;

		Ok(result.rows_affected() > 0)
	}
}
