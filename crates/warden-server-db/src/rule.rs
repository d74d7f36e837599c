// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Rule repository.
//!
//! A rule row plus two link tables: `acl_rule_groups` and
//! `acl_rule_section_permissions`. Writes are single statements; callers
//! compose them and accept that a failure midway leaves partial links.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqlitePool, Row};
use tracing::instrument;
use warden_acl_core::{GroupId, PermissionId, Rule, RuleDraft, RuleId, SectionId, ValidityWindow};

use crate::error::{DbError, Result};

#[async_trait]
pub trait RuleStore: Send + Sync {
	async fn insert_rule(&self, draft: &RuleDraft) -> Result<RuleId>;
	/// Overwrites the rule row. Returns false if no row has `id`.
	async fn update_rule(&self, id: RuleId, draft: &RuleDraft) -> Result<bool>;
	async fn get_rule(&self, id: RuleId) -> Result<Option<Rule>>;
	async fn list_rules(&self) -> Result<Vec<Rule>>;
	/// Drops every group and section-permission link of a rule.
	async fn clear_links(&self, id: RuleId) -> Result<()>;
	async fn link_groups(&self, id: RuleId, group_ids: &[GroupId]) -> Result<()>;
	async fn link_section_permissions(
		&self,
		id: RuleId,
		pairs: &[(SectionId, PermissionId)],
	) -> Result<()>;
	async fn rule_groups(&self, id: RuleId) -> Result<Vec<GroupId>>;
	async fn rule_section_permissions(&self, id: RuleId) -> Result<Vec<(SectionId, PermissionId)>>;
	async fn rule_sections(&self, id: RuleId) -> Result<Vec<SectionId>>;
	/// Deletes links and the rule row. Returns false if no row had `id`.
	async fn delete_rule(&self, id: RuleId) -> Result<bool>;
	async fn set_enabled(&self, ids: &[RuleId], enabled: bool) -> Result<u64>;
	/// Enabled rules linked to any of `group_ids`, with their validity windows.
	async fn enabled_rules_for_groups(
		&self,
		group_ids: &[GroupId],
	) -> Result<Vec<(RuleId, ValidityWindow)>>;
	/// Distinct permission ids granted in `section` by any of `rule_ids`.
	async fn section_permission_ids(
		&self,
		section: SectionId,
		rule_ids: &[RuleId],
	) -> Result<Vec<PermissionId>>;
}

#[derive(Clone)]
pub struct SqliteRuleRepository {
	pool: SqlitePool,
}

impl SqliteRuleRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}
}

fn placeholders(count: usize) -> String {
	vec!["?"; count].join(", ")
}

fn to_db_time(value: Option<DateTime<Utc>>) -> Option<String> {
	value.map(|t| t.to_rfc3339())
}

fn parse_db_time(value: Option<String>, column: &str) -> Result<Option<DateTime<Utc>>> {
	value
		.map(|raw| {
			DateTime::parse_from_rfc3339(&raw)
				.map(|t| t.with_timezone(&Utc))
				.map_err(|e| DbError::Internal(format!("Invalid {column}: {e}")))
		})
		.transpose()
}

#[derive(sqlx::FromRow)]
struct RuleRow {
	id: i64,
	name: String,
	alias: String,
	valid_from: Option<String>,
	valid_until: Option<String>,
	note: String,
	enabled: bool,
}

impl RuleRow {
	fn into_rule(self) -> Result<Rule> {
		Ok(Rule {
			id: RuleId::new(self.id),
			name: self.name,
			alias: self.alias,
			window: ValidityWindow::new(
				parse_db_time(self.valid_from, "valid_from")?,
				parse_db_time(self.valid_until, "valid_until")?,
			),
			note: self.note,
			enabled: self.enabled,
		})
	}
}

#[async_trait]
impl RuleStore for SqliteRuleRepository {
	#[instrument(skip(self, draft), fields(name = %draft.name))]
	async fn insert_rule(&self, draft: &RuleDraft) -> Result<RuleId> {
		let result = sqlx::query(
			r#"
			INSERT INTO acl_rules (name, alias, valid_from, valid_until, note, enabled)
			VALUES (?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(&draft.name)
		.bind(draft.effective_alias())
		.bind(to_db_time(draft.window.from))
		.bind(to_db_time(draft.window.until))
		.bind(&draft.note)
		.bind(draft.enabled)
		.execute(&self.pool)
		.await?;

		let id = RuleId::new(result.last_insert_rowid());
		tracing::debug!(rule_id = %id, "rule inserted");
		Ok(id)
	}

	#[instrument(skip(self, draft), fields(rule_id = %id))]
	async fn update_rule(&self, id: RuleId, draft: &RuleDraft) -> Result<bool> {
		let result = sqlx::query(
			r#"
			UPDATE acl_rules
			SET name = ?, alias = ?, valid_from = ?, valid_until = ?, note = ?, enabled = ?
			WHERE id = ?
			"#,
		)
		.bind(&draft.name)
		.bind(draft.effective_alias())
		.bind(to_db_time(draft.window.from))
		.bind(to_db_time(draft.window.until))
		.bind(&draft.note)
		.bind(draft.enabled)
		.bind(id.get())
		.execute(&self.pool)
		.await?;

		tracing::debug!(rule_id = %id, rows = result.rows_affected(), "rule updated");
		Ok(result.rows_affected() > 0)
	}

	#[instrument(skip(self), fields(rule_id = %id))]
	async fn get_rule(&self, id: RuleId) -> Result<Option<Rule>> {
		let row = sqlx::query_as::<_, RuleRow>(
			r#"
			SELECT id, name, alias, valid_from, valid_until, note, enabled
			FROM acl_rules
			WHERE id = ?
			"#,
		)
		.bind(id.get())
		.fetch_optional(&self.pool)
		.await?;

		row.map(RuleRow::into_rule).transpose()
	}

	#[instrument(skip(self))]
	async fn list_rules(&self) -> Result<Vec<Rule>> {
		let rows = sqlx::query_as::<_, RuleRow>(
			r#"
			SELECT id, name, alias, valid_from, valid_until, note, enabled
			FROM acl_rules
			ORDER BY id ASC
			"#,
		)
		.fetch_all(&self.pool)
		.await?;

		rows.into_iter().map(RuleRow::into_rule).collect()
	}

	#[instrument(skip(self), fields(rule_id = %id))]
	async fn clear_links(&self, id: RuleId) -> Result<()> {
		sqlx::query("DELETE FROM acl_rule_groups WHERE rule_id = ?")
			.bind(id.get())
			.execute(&self.pool)
			.await?;
		sqlx::query("DELETE FROM acl_rule_section_permissions WHERE rule_id = ?")
			.bind(id.get())
			.execute(&self.pool)
			.await?;

		tracing::debug!(rule_id = %id, "rule links cleared");
		Ok(())
	}

	#[instrument(skip(self, group_ids), fields(rule_id = %id, count = group_ids.len()))]
	async fn link_groups(&self, id: RuleId, group_ids: &[GroupId]) -> Result<()> {
		for group_id in group_ids {
			sqlx::query("INSERT OR IGNORE INTO acl_rule_groups (rule_id, group_id) VALUES (?, ?)")
				.bind(id.get())
				.bind(group_id.get())
				.execute(&self.pool)
				.await?;
		}
		Ok(())
	}

	#[instrument(skip(self, pairs), fields(rule_id = %id, count = pairs.len()))]
	async fn link_section_permissions(
		&self,
		id: RuleId,
		pairs: &[(SectionId, PermissionId)],
	) -> Result<()> {
		for (section_id, permission_id) in pairs {
			sqlx::query(
				r#"
				INSERT OR IGNORE INTO acl_rule_section_permissions (rule_id, section_id, permission_id)
				VALUES (?, ?, ?)
				"#,
			)
			.bind(id.get())
			.bind(section_id.get())
			.bind(permission_id.get())
			.execute(&self.pool)
			.await?;
		}
		Ok(())
	}

	#[instrument(skip(self), fields(rule_id = %id))]
	async fn rule_groups(&self, id: RuleId) -> Result<Vec<GroupId>> {
		let rows = sqlx::query(
			"SELECT group_id FROM acl_rule_groups WHERE rule_id = ? ORDER BY group_id",
		)
		.bind(id.get())
		.fetch_all(&self.pool)
		.await?;

		Ok(rows.iter().map(|r| GroupId::new(r.get("group_id"))).collect())
	}

	#[instrument(skip(self), fields(rule_id = %id))]
	async fn rule_section_permissions(&self, id: RuleId) -> Result<Vec<(SectionId, PermissionId)>> {
		let rows = sqlx::query(
			r#"
			SELECT section_id, permission_id
			FROM acl_rule_section_permissions
			WHERE rule_id = ?
			ORDER BY section_id, permission_id
			"#,
		)
		.bind(id.get())
		.fetch_all(&self.pool)
		.await?;

		Ok(rows
			.iter()
			.map(|r| {
				(
					SectionId::new(r.get("section_id")),
					PermissionId::new(r.get("permission_id")),
				)
			})
			.collect())
	}

	#[instrument(skip(self), fields(rule_id = %id))]
	async fn rule_sections(&self, id: RuleId) -> Result<Vec<SectionId>> {
		let rows = sqlx::query(
			r#"
			SELECT DISTINCT section_id
			FROM acl_rule_section_permissions
			WHERE rule_id = ?
			ORDER BY section_id
			"#,
		)
		.bind(id.get())
		.fetch_all(&self.pool)
		.await?;

		Ok(rows.iter().map(|r| SectionId::new(r.get("section_id"))).collect())
	}

	#[instrument(skip(self), fields(rule_id = %id))]
	async fn delete_rule(&self, id: RuleId) -> Result<bool> {
		self.clear_links(id).await?;
		let result = sqlx::query("DELETE FROM acl_rules WHERE id = ?")
			.bind(id.get())
			.execute(&self.pool)
			.await?;

		tracing::debug!(rule_id = %id, rows = result.rows_affected(), "rule deleted");
		Ok(result.rows_affected() > 0)
	}

	#[instrument(skip(self, ids), fields(count = ids.len()))]
	async fn set_enabled(&self, ids: &[RuleId], enabled: bool) -> Result<u64> {
		if ids.is_empty() {
			return Ok(0);
		}

		let sql = format!(
			"UPDATE acl_rules SET enabled = ? WHERE id IN ({})",
			placeholders(ids.len())
		);
		let mut query = sqlx::query(&sql).bind(enabled);
		for id in ids {
			query = query.bind(id.get());
		}
		let result = query.execute(&self.pool).await?;

		tracing::debug!(rows = result.rows_affected(), enabled, "rules toggled");
		Ok(result.rows_affected())
	}

	#[instrument(skip(self, group_ids), fields(groups = group_ids.len()))]
	async fn enabled_rules_for_groups(
		&self,
		group_ids: &[GroupId],
	) -> Result<Vec<(RuleId, ValidityWindow)>> {
		if group_ids.is_empty() {
			return Ok(Vec::new());
		}

		let sql = format!(
			r#"
			SELECT DISTINCT r.id AS id, r.valid_from AS valid_from, r.valid_until AS valid_until
			FROM acl_rules r
			JOIN acl_rule_groups rg ON rg.rule_id = r.id
			WHERE r.enabled = 1 AND rg.group_id IN ({})
			ORDER BY r.id
			"#,
			placeholders(group_ids.len())
		);
		let mut query = sqlx::query(&sql);
		for group_id in group_ids {
			query = query.bind(group_id.get());
		}
		let rows = query.fetch_all(&self.pool).await?;

		// A rule with an unreadable window grants nothing; the others still apply.
		Ok(rows
			.iter()
			.filter_map(|r| {
				let id = RuleId::new(r.get("id"));
				let window = parse_db_time(r.get("valid_from"), "valid_from").and_then(|from| {
					Ok(ValidityWindow::new(
						from,
						parse_db_time(r.get("valid_until"), "valid_until")?,
					))
				});
				match window {
					Ok(window) => Some((id, window)),
					Err(e) => {
						tracing::warn!(rule_id = %id, error = %e, "skipping rule with unreadable validity window");
						None
					}
				}
			})
			.collect())
	}

	#[instrument(skip(self, rule_ids), fields(section = %section, rules = rule_ids.len()))]
	async fn section_permission_ids(
		&self,
		section: SectionId,
		rule_ids: &[RuleId],
	) -> Result<Vec<PermissionId>> {
		if rule_ids.is_empty() {
			return Ok(Vec::new());
		}

		let sql = format!(
			r#"
			SELECT DISTINCT permission_id
			FROM acl_rule_section_permissions
			WHERE section_id = ? AND rule_id IN ({})
			ORDER BY permission_id
			"#,
			placeholders(rule_ids.len())
		);
		let mut query = sqlx::query(&sql).bind(section.get());
		for rule_id in rule_ids {
			query = query.bind(rule_id.get());
		}
		let rows = query.fetch_all(&self.pool).await?;

		Ok(rows
			.iter()
			.map(|r| PermissionId::new(r.get("permission_id")))
			.collect())
	}
}
