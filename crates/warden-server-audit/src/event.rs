// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core event types for audit logging.
//!
//! - [`AuditEventType`]: every auditable rule and catalog change
//! - [`AuditSeverity`]: RFC 5424-compatible severity levels
//! - [`AuditLogEntry`]: one history record
//! - [`AuditLogBuilder`]: fluent API for constructing entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Types of events recorded in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
	// Rule events
	RuleCreated,
	RuleUpdated,
	RuleDeleted,
	RuleEnabled,
	RuleDisabled,

	// Catalog events
	PermissionAdded,
	PermissionRemoved,
}

impl AuditEventType {
	pub fn all() -> &'static [AuditEventType] {
		&[
			AuditEventType::RuleCreated,
			AuditEventType::RuleUpdated,
			AuditEventType::RuleDeleted,
			AuditEventType::RuleEnabled,
			AuditEventType::RuleDisabled,
			AuditEventType::PermissionAdded,
			AuditEventType::PermissionRemoved,
		]
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			AuditEventType::RuleCreated => "rule_created",
			AuditEventType::RuleUpdated => "rule_updated",
			AuditEventType::RuleDeleted => "rule_deleted",
			AuditEventType::RuleEnabled => "rule_enabled",
			AuditEventType::RuleDisabled => "rule_disabled",
			AuditEventType::PermissionAdded => "permission_added",
			AuditEventType::PermissionRemoved => "permission_removed",
		}
	}

	/// Returns the default severity level for this event type.
	pub fn default_severity(&self) -> AuditSeverity {
		match self {
			// Destructive changes
			AuditEventType::RuleDeleted | AuditEventType::PermissionRemoved => AuditSeverity::Notice,
			_ => AuditSeverity::Info,
		}
	}
}

impl fmt::Display for AuditEventType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for AuditEventType {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		AuditEventType::all()
			.iter()
			.copied()
			.find(|t| t.as_str() == s)
			.ok_or_else(|| format!("unknown audit event type '{s}'"))
	}
}

/// Severity levels following RFC 5424 syslog conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuditSeverity {
	Debug = 7,
	#[default]
	Info = 6,
	Notice = 5,
	Warning = 4,
}

impl PartialOrd for AuditSeverity {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl Ord for AuditSeverity {
	fn cmp(&self, other: &Self) -> Ordering {
		// Lower numeric value = higher severity
		(*other as u8).cmp(&(*self as u8))
	}
}

impl fmt::Display for AuditSeverity {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			AuditSeverity::Debug => "debug",
			AuditSeverity::Info => "info",
			AuditSeverity::Notice => "notice",
			AuditSeverity::Warning => "warning",
		};
		write!(f, "{s}")
	}
}

impl FromStr for AuditSeverity {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"debug" => Ok(AuditSeverity::Debug),
			"info" => Ok(AuditSeverity::Info),
			"notice" => Ok(AuditSeverity::Notice),
			"warning" => Ok(AuditSeverity::Warning),
			other => Err(format!("unknown audit severity '{other}'")),
		}
	}
}

/// An entry in the history log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLogEntry {
	pub id: Uuid,
	pub timestamp: DateTime<Utc>,
	pub event_type: AuditEventType,
	pub severity: AuditSeverity,

	/// The user who performed the change, when known.
	pub actor_user_id: Option<i64>,

	/// Kind of object affected (`rule`, `permission`).
	pub object_type: String,
	pub object_id: Option<i64>,
	/// Section the change applies to; 0 when global.
	pub section_id: i64,

	/// Free-form note, usually the object's display name.
	pub note: String,
	/// Event-specific parameters.
	pub params: serde_json::Value,
}

impl AuditLogEntry {
	pub fn builder(event_type: AuditEventType) -> AuditLogBuilder {
		AuditLogBuilder::new(event_type)
	}
}

/// Builder for constructing audit log entries with a fluent API.
#[derive(Debug, Clone)]
pub struct AuditLogBuilder {
	event_type: AuditEventType,
	severity: Option<AuditSeverity>,
	actor_user_id: Option<i64>,
	object_type: Option<String>,
	object_id: Option<i64>,
	section_id: i64,
	note: String,
	params: serde_json::Value,
}

impl AuditLogBuilder {
	pub fn new(event_type: AuditEventType) -> Self {
		Self {
			event_type,
			severity: None,
			actor_user_id: None,
			object_type: None,
			object_id: None,
			section_id: 0,
			note: String::new(),
			params: serde_json::Value::Null,
		}
	}

	/// Set the severity level. Defaults to the event type's default severity.
	pub fn severity(mut self, severity: AuditSeverity) -> Self {
		self.severity = Some(severity);
		self
	}

	pub fn actor(mut self, user_id: i64) -> Self {
		self.actor_user_id = Some(user_id);
		self
	}

	/// Set the affected object's type and id.
	pub fn object(mut self, object_type: impl Into<String>, object_id: i64) -> Self {
		self.object_type = Some(object_type.into());
		self.object_id = Some(object_id);
		self
	}

	/// Set the affected object's type when it has no numeric id.
	pub fn object_type(mut self, object_type: impl Into<String>) -> Self {
		self.object_type = Some(object_type.into());
		self
	}

	pub fn section(mut self, section_id: i64) -> Self {
		self.section_id = section_id;
		self
	}

	pub fn note(mut self, note: impl Into<String>) -> Self {
		self.note = note.into();
		self
	}

	pub fn params(mut self, params: serde_json::Value) -> Self {
		self.params = params;
		self
	}

	pub fn build(self) -> AuditLogEntry {
		AuditLogEntry {
			id: Uuid::new_v4(),
			timestamp: Utc::now(),
			event_type: self.event_type,
			severity: self
				.severity
				.unwrap_or_else(|| self.event_type.default_severity()),
			actor_user_id: self.actor_user_id,
			object_type: self.object_type.unwrap_or_default(),
			object_id: self.object_id,
			section_id: self.section_id,
			note: self.note,
			params: self.params,
		}
	}
}
