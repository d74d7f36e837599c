// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::AuditSinkError;
use crate::event::AuditLogEntry;
use crate::sink::AuditSink;

/// Emits each entry as a structured `info` event on the `audit` target.
pub struct TracingAuditSink {
	name: String,
}

impl TracingAuditSink {
	pub fn new() -> Self {
		Self {
			name: "tracing".to_string(),
		}
	}
}

impl Default for TracingAuditSink {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl AuditSink for TracingAuditSink {
	fn name(&self) -> &str {
		&self.name
	}

	async fn publish(&self, event: Arc<AuditLogEntry>) -> Result<(), AuditSinkError> {
		::tracing::info!(
			target: "audit",
			audit_id = %event.id,
			event_type = %event.event_type,
			severity = %event.severity,
			actor_user_id = ?event.actor_user_id,
			object_type = %event.object_type,
			object_id = ?event.object_id,
			section_id = event.section_id,
			note = %event.note,
			params = %event.params,
			"audit event"
		);
		Ok(())
	}
}
