// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Group repository.
//!
//! Both hierarchies share the `acl_groups` table; the `namespace` column says
//! which one a row belongs to.

use std::collections::HashSet;

use async_trait::async_trait;
use sqlx::{sqlite::SqlitePool, Row};
use warden_acl_core::{Group, GroupId, GroupKind, GroupRef};

use crate::error::{DbError, Result};

#[async_trait]
pub trait GroupStore: Send + Sync {
	async fn insert_group(&self, group: &Group) -> Result<()>;
	async fn get_group(&self, id: GroupId) -> Result<Option<Group>>;
	async fn list_groups(&self) -> Result<Vec<Group>>;
	/// The parent of `id`, tagged with the parent's own namespace.
	async fn parent_of(&self, id: GroupId) -> Result<Option<GroupRef>>;
	/// `id` and every native ancestor above it, in one lookup.
	async fn native_ancestors(&self, id: GroupId) -> Result<Vec<GroupId>>;
	/// Ids of groups whose name matches one of `names`, ignoring case.
	async fn find_ids_by_names(&self, names: &[String]) -> Result<Vec<GroupId>>;
}

#[derive(Clone)]
pub struct SqliteGroupRepository {
	pool: SqlitePool,
}

impl SqliteGroupRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}
}

fn row_to_group(row: &sqlx::sqlite::SqliteRow) -> Result<Group> {
	let namespace: String = row.get("namespace");
	let kind = namespace
		.parse::<GroupKind>()
		.map_err(DbError::Internal)?;
	let parent_id: Option<i64> = row.get("parent_id");
	let enabled: i64 = row.get("enabled");
	Ok(Group {
		id: GroupId::new(row.get("id")),
		parent_id: parent_id.map(GroupId::new),
		name: row.get("name"),
		enabled: enabled != 0,
		kind,
	})
}

#[async_trait]
impl GroupStore for SqliteGroupRepository {
	#[tracing::instrument(skip(self, group), fields(group_id = %group.id, kind = %group.kind))]
	async fn insert_group(&self, group: &Group) -> Result<()> {
		sqlx::query(
			r#"
			INSERT INTO acl_groups (id, parent_id, name, enabled, namespace)
			VALUES (?, ?, ?, ?, ?)
			"#,
		)
		.bind(group.id.get())
		.bind(group.parent_id.map(GroupId::get))
		.bind(&group.name)
		.bind(group.enabled as i32)
		.bind(group.kind.as_str())
		.execute(&self.pool)
		.await?;

		tracing::debug!(group_id = %group.id, "group inserted");
		Ok(())
	}

	#[tracing::instrument(skip(self), fields(group_id = %id))]
	async fn get_group(&self, id: GroupId) -> Result<Option<Group>> {
		let row = sqlx::query(
			"SELECT id, parent_id, name, enabled, namespace FROM acl_groups WHERE id = ?",
		)
		.bind(id.get())
		.fetch_optional(&self.pool)
		.await?;

		row.as_ref().map(row_to_group).transpose()
	}

	#[tracing::instrument(skip(self))]
	async fn list_groups(&self) -> Result<Vec<Group>> {
		let rows = sqlx::query(
			"SELECT id, parent_id, name, enabled, namespace FROM acl_groups ORDER BY id",
		)
		.fetch_all(&self.pool)
		.await?;

		rows.iter().map(row_to_group).collect()
	}

	#[tracing::instrument(skip(self), fields(group_id = %id))]
	async fn parent_of(&self, id: GroupId) -> Result<Option<GroupRef>> {
		let row = sqlx::query(
			r#"
			SELECT p.id AS id, p.namespace AS namespace
			FROM acl_groups g
			JOIN acl_groups p ON p.id = g.parent_id
			WHERE g.id = ?
			"#,
		)
		.bind(id.get())
		.fetch_optional(&self.pool)
		.await?;

		row
			.map(|r| {
				let namespace: String = r.get("namespace");
				let kind = namespace
					.parse::<GroupKind>()
					.map_err(DbError::Internal)?;
				Ok(GroupRef::new(kind, GroupId::new(r.get("id"))))
			})
			.transpose()
	}

	#[tracing::instrument(skip(self), fields(group_id = %id))]
	async fn native_ancestors(&self, id: GroupId) -> Result<Vec<GroupId>> {
		// UNION drops repeated rows, so a cyclic chain still terminates.
		let rows = sqlx::query(
			r#"
			WITH RECURSIVE ancestors(id, parent_id) AS (
				SELECT id, parent_id FROM acl_groups
				WHERE id = ? AND namespace = 'native'
				UNION
				SELECT g.id, g.parent_id FROM acl_groups g
				JOIN ancestors a ON g.id = a.parent_id
				WHERE g.namespace = 'native'
			)
			SELECT id FROM ancestors
			"#,
		)
		.bind(id.get())
		.fetch_all(&self.pool)
		.await?;

		Ok(rows.iter().map(|r| GroupId::new(r.get("id"))).collect())
	}

	#[tracing::instrument(skip(self), fields(count = names.len()))]
	async fn find_ids_by_names(&self, names: &[String]) -> Result<Vec<GroupId>> {
		if names.is_empty() {
			return Ok(Vec::new());
		}

		// SQLite's LOWER() only folds ASCII, so compare in Rust.
		let wanted: HashSet<String> = names.iter().map(|n| n.to_lowercase()).collect();
		let rows = sqlx::query("SELECT id, name FROM acl_groups ORDER BY id")
			.fetch_all(&self.pool)
			.await?;

		Ok(rows
			.iter()
			.filter(|r| wanted.contains(&r.get::<String, _>("name").to_lowercase()))
			.map(|r| GroupId::new(r.get("id")))
			.collect())
	}
}
