// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqlitePool, Row};
use uuid::Uuid;
use warden_server_audit::{AuditEventType, AuditLogEntry, AuditSeverity};

use crate::error::Result;

#[async_trait]
pub trait AuditStore: Send + Sync {
	/// History of one object, newest first.
	async fn list_for_object(
		&self,
		object_type: &str,
		object_id: Option<i64>,
		limit: Option<i64>,
	) -> Result<Vec<AuditLogEntry>>;
}

pub struct AuditRepository {
	pool: SqlitePool,
}

impl AuditRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}
}

#[async_trait]
impl AuditStore for AuditRepository {
	#[tracing::instrument(skip(self))]
	async fn list_for_object(
		&self,
		object_type: &str,
		object_id: Option<i64>,
		limit: Option<i64>,
	) -> Result<Vec<AuditLogEntry>> {
		let limit = limit.unwrap_or(50).min(1000);

		let mut conditions = vec!["object_type = ?"];
		if object_id.is_some() {
			conditions.push("object_id = ?");
		}
		let sql = format!(
			"SELECT id, timestamp, event_type, severity, actor_user_id, object_type, object_id, \
			 section_id, note, params FROM audit_logs WHERE {} \
			 ORDER BY timestamp DESC, rowid DESC LIMIT ?",
			conditions.join(" AND ")
		);

		let mut query = sqlx::query(&sql).bind(object_type);
		if let Some(id) = object_id {
			query = query.bind(id);
		}
		let rows = query.bind(limit).fetch_all(&self.pool).await?;

		// Rows written by another schema version are skipped rather than failing the read.
		let entries = rows
			.into_iter()
			.filter_map(|row| {
				let id_str: String = row.get("id");
				let id = Uuid::parse_str(&id_str).ok()?;

				let ts_str: String = row.get("timestamp");
				let timestamp = DateTime::parse_from_rfc3339(&ts_str)
					.map(|dt| dt.with_timezone(&Utc))
					.unwrap_or_else(|_| Utc::now());

				let event_type_str: String = row.get("event_type");
				let event_type = event_type_str.parse::<AuditEventType>().ok()?;

				let severity_str: String = row.get("severity");
				let severity = severity_str
					.parse::<AuditSeverity>()
					.unwrap_or_else(|_| event_type.default_severity());

				let params_str: String = row.get("params");
				let params = serde_json::from_str(&params_str).unwrap_or(serde_json::Value::Null);

				Some(AuditLogEntry {
					id,
					timestamp,
					event_type,
					severity,
					actor_user_id: row.get("actor_user_id"),
					object_type: row.get("object_type"),
					object_id: row.get("object_id"),
					section_id: row.get("section_id"),
					note: row.get("note"),
					params,
				})
			})
			.collect();

		Ok(entries)
	}
}
