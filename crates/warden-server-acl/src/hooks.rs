// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Extension points: the host identity provider, decision observers and rule
//! lifecycle listeners.

use async_trait::async_trait;
use warden_acl_core::{RuleId, SectionId};

/// Host-side authorization for queries the engine does not answer itself.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
	/// Whether the current user may perform `action` (e.g. `core.manage`) in
	/// `namespace`.
	async fn authorize(&self, action: &str, namespace: &str) -> bool;
}

/// An identity provider that answers every request the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedAuthorization(pub bool);

#[async_trait]
impl IdentityProvider for FixedAuthorization {
	async fn authorize(&self, _action: &str, _namespace: &str) -> bool {
		self.0
	}
}

/// Gets the final say on rule-based decisions.
///
/// Observers run in registration order; each receives the previous result
/// and returns the replacement.
pub trait DecisionObserver: Send + Sync {
	fn adjust_decision(
		&self,
		result: bool,
		section: SectionId,
		subject: &str,
		action: &str,
		value: &str,
	) -> bool;
}

/// Notified after successful rule writes.
pub trait RuleLifecycleListener: Send + Sync {
	fn rule_saved(&self, _id: RuleId, _created: bool) {}

	fn rules_deleted(&self, _ids: &[RuleId]) {}

	fn rules_toggled(&self, _ids: &[RuleId], _enabled: bool) {}
}
