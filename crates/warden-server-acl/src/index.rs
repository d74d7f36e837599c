// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Builds the [`PermissionIndex`] for one `(site, section)` pair.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, instrument, warn};
use warden_acl_core::{GroupId, PermissionId, PermissionIndex, RuleId, SectionId, Site};
use warden_server_db::{PermissionStore, RuleStore};

/// Materializes permission indexes from the rule store and catalog.
///
/// Each step that fails is logged and contributes nothing, so a broken store
/// yields an empty index rather than an error.
#[derive(Clone)]
pub struct IndexBuilder {
	rules: Arc<dyn RuleStore>,
	permissions: Arc<dyn PermissionStore>,
}

impl IndexBuilder {
	pub fn new(rules: Arc<dyn RuleStore>, permissions: Arc<dyn PermissionStore>) -> Self {
		Self { rules, permissions }
	}

	pub async fn build(
		&self,
		groups: &HashSet<GroupId>,
		section: SectionId,
		site: Site,
	) -> PermissionIndex {
		self.build_at(groups, section, site, Utc::now()).await
	}

	/// Same as [`IndexBuilder::build`] with an explicit clock.
	#[instrument(skip(self, groups, now), fields(groups = groups.len(), section = %section, site = %site))]
	pub async fn build_at(
		&self,
		groups: &HashSet<GroupId>,
		section: SectionId,
		site: Site,
		now: DateTime<Utc>,
	) -> PermissionIndex {
		let mut index = PermissionIndex::new();

		let rule_ids = self.active_rules(groups, now).await;
		if rule_ids.is_empty() {
			return index;
		}

		let granted: HashSet<PermissionId> =
			match self.rules.section_permission_ids(section, &rule_ids).await {
				Ok(ids) => ids.into_iter().collect(),
				Err(e) => {
					warn!(section = %section, error = %e, "failed to load section grants");
					return index;
				}
			};
		if granted.is_empty() {
			return index;
		}

		let catalog = match self.permissions.published_for_site(site).await {
			Ok(definitions) => definitions,
			Err(e) => {
				warn!(site = %site, error = %e, "failed to load permission catalog");
				return index;
			}
		};

		for definition in catalog.iter().filter(|d| granted.contains(&d.id)) {
			index.grant(&definition.subject, &definition.action, &definition.value);
		}

		debug!(rules = rule_ids.len(), grants = index.len(), "permission index built");
		index
	}

	async fn active_rules(&self, groups: &HashSet<GroupId>, now: DateTime<Utc>) -> Vec<RuleId> {
		let mut group_ids: Vec<GroupId> = groups.iter().copied().collect();
		group_ids.sort();

		match self.rules.enabled_rules_for_groups(&group_ids).await {
			Ok(rules) => rules
				.into_iter()
				.filter(|(_, window)| window.contains(now))
				.map(|(id, _)| id)
				.collect(),
			Err(e) => {
				warn!(error = %e, "failed to load rules for groups");
				Vec::new()
			}
		}
	}
}
