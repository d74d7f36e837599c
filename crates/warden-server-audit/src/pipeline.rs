// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use tracing::{instrument, warn};

use crate::error::{AuditError, AuditResult};
use crate::event::AuditLogEntry;
use crate::sink::AuditSink;

/// Fans audit entries out to every registered sink.
///
/// Sinks are called one after another in registration order. A failing sink
/// is logged and skipped; the caller never sees the error.
#[derive(Clone, Default)]
pub struct AuditService {
	sinks: Vec<Arc<dyn AuditSink>>,
}

impl AuditService {
	pub fn new(sinks: Vec<Arc<dyn AuditSink>>) -> Self {
		Self { sinks }
	}

	/// A service that drops every entry.
	pub fn disabled() -> Self {
		Self::default()
	}

	pub fn is_enabled(&self) -> bool {
		!self.sinks.is_empty()
	}

	pub fn sink_names(&self) -> Vec<&str> {
		self.sinks.iter().map(|s| s.name()).collect()
	}

	/// Publishes `entry` to every sink. Returns the number of sinks that
	/// accepted it.
	#[instrument(skip(self, entry), fields(event_type = %entry.event_type))]
	pub async fn log(&self, entry: AuditLogEntry) -> usize {
		let event = Arc::new(entry);
		let mut delivered = 0;
		for sink in &self.sinks {
			match sink.publish(Arc::clone(&event)).await {
				Ok(()) => delivered += 1,
				Err(e) => {
					warn!(sink = sink.name(), error = %e, "audit sink publish failed");
				}
			}
		}
		delivered
	}

	/// Checks every sink, stopping at the first failure.
	pub async fn health_check(&self) -> AuditResult<()> {
		for sink in &self.sinks {
			sink
				.health_check()
				.await
				.map_err(|source| AuditError::SinkError {
					sink: sink.name().to_string(),
					source,
				})?;
		}
		Ok(())
	}
}
