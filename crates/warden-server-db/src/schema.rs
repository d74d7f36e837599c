// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Table definitions for the access-rule store and the audit log.

use sqlx::sqlite::SqlitePool;

use crate::error::Result;

const MIGRATIONS: &[&str] = &[
	r#"
	CREATE TABLE IF NOT EXISTS acl_groups (
		id INTEGER PRIMARY KEY,
		parent_id INTEGER,
		name TEXT NOT NULL,
		enabled INTEGER NOT NULL DEFAULT 1,
		namespace TEXT NOT NULL DEFAULT 'native'
	)
	"#,
	"CREATE INDEX IF NOT EXISTS idx_acl_groups_parent ON acl_groups(parent_id)",
	r#"
	CREATE TABLE IF NOT EXISTS acl_rules (
		id INTEGER PRIMARY KEY AUTOINCREMENT,
		name TEXT NOT NULL,
		alias TEXT NOT NULL,
		valid_from TEXT,
		valid_until TEXT,
		note TEXT NOT NULL DEFAULT '',
		enabled INTEGER NOT NULL DEFAULT 1
	)
	"#,
	r#"
	CREATE TABLE IF NOT EXISTS acl_rule_groups (
		rule_id INTEGER NOT NULL,
		group_id INTEGER NOT NULL,
		PRIMARY KEY (rule_id, group_id)
	)
	"#,
	"CREATE INDEX IF NOT EXISTS idx_acl_rule_groups_group ON acl_rule_groups(group_id)",
	r#"
	CREATE TABLE IF NOT EXISTS acl_rule_section_permissions (
		rule_id INTEGER NOT NULL,
		section_id INTEGER NOT NULL,
		permission_id INTEGER NOT NULL,
		PRIMARY KEY (rule_id, section_id, permission_id)
	)
	"#,
	"CREATE INDEX IF NOT EXISTS idx_acl_rsp_section ON acl_rule_section_permissions(section_id)",
	r#"
	CREATE TABLE IF NOT EXISTS acl_permissions (
		id INTEGER PRIMARY KEY AUTOINCREMENT,
		subject TEXT NOT NULL,
		action TEXT NOT NULL,
		value TEXT NOT NULL,
		scope TEXT NOT NULL DEFAULT 'front',
		published INTEGER NOT NULL DEFAULT 1,
		UNIQUE (subject, action, value, scope)
	)
	"#,
	r#"
	CREATE TABLE IF NOT EXISTS audit_logs (
		id TEXT PRIMARY KEY,
		timestamp TEXT NOT NULL,
		event_type TEXT NOT NULL,
		severity TEXT NOT NULL,
		actor_user_id INTEGER,
		object_type TEXT NOT NULL,
		object_id INTEGER,
		section_id INTEGER NOT NULL DEFAULT 0,
		note TEXT NOT NULL DEFAULT '',
		params TEXT NOT NULL,
		created_at TEXT NOT NULL
	)
	"#,
	"CREATE INDEX IF NOT EXISTS idx_audit_logs_object ON audit_logs(object_type, object_id)",
];

/// Creates every table and index. Safe to run repeatedly.
#[tracing::instrument(skip(pool))]
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
	for statement in MIGRATIONS {
		sqlx::query(statement).execute(pool).await?;
	}
	tracing::debug!(statements = MIGRATIONS.len(), "migrations applied");
	Ok(())
}
