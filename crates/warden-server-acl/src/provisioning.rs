// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Rule and catalog provisioning.
//!
//! Every write goes through [`RuleService`], which records an audit entry and
//! notifies lifecycle listeners. Store failures are logged and turn into
//! `None` or zero counts; multi-step writes are not transactional.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info, instrument, warn};
use warden_acl_core::{
	implied_by, PermissionDefinition, PermissionId, PermissionKey, RuleDraft, RuleId, SectionId,
	Site,
};
use warden_server_audit::{AuditEventType, AuditLogBuilder, AuditLogEntry, AuditService};
use warden_server_db::{DbError, GroupStore, PermissionStore, RuleStore};

use crate::hooks::RuleLifecycleListener;

const RULE_OBJECT: &str = "rule";
const PERMISSION_OBJECT: &str = "permission";

/// Administrative API over rules and the permission catalog.
#[derive(Clone)]
pub struct RuleService {
	groups: Arc<dyn GroupStore>,
	rules: Arc<dyn RuleStore>,
	permissions: Arc<dyn PermissionStore>,
	audit: AuditService,
	listeners: Vec<Arc<dyn RuleLifecycleListener>>,
	actor: Option<i64>,
}

impl RuleService {
	pub fn new(
		groups: Arc<dyn GroupStore>,
		rules: Arc<dyn RuleStore>,
		permissions: Arc<dyn PermissionStore>,
		audit: AuditService,
	) -> Self {
		Self {
			groups,
			rules,
			permissions,
			audit,
			listeners: Vec::new(),
			actor: None,
		}
	}

	pub fn with_listener(mut self, listener: Arc<dyn RuleLifecycleListener>) -> Self {
		self.listeners.push(listener);
		self
	}

	/// Attributes subsequent audit entries to `user_id`.
	pub fn with_actor(mut self, user_id: i64) -> Self {
		self.actor = Some(user_id);
		self
	}

	/// Creates an enabled, unbounded rule from permission keys and group names.
	///
	/// Keys are `subject.action.value[.site]`; unknown or malformed keys are
	/// skipped. Groups are matched by name ignoring case. Every section is
	/// linked to every resolved permission.
	#[instrument(skip_all, fields(name = %name, sections = section_ids.len()))]
	pub async fn create_rule(
		&self,
		name: &str,
		section_ids: &[SectionId],
		permission_keys: &[String],
		group_names: &[String],
		note: &str,
	) -> Option<RuleId> {
		let mut permission_ids = Vec::new();
		for raw in permission_keys {
			if let Some(id) = self.resolve_key(raw).await {
				permission_ids.push(id);
			}
		}

		let mut draft = RuleDraft::new(name);
		draft.note = note.to_string();
		let id = match self.rules.insert_rule(&draft).await {
			Ok(id) => id,
			Err(e) => {
				warn!(error = %e, "failed to insert rule");
				return None;
			}
		};

		let group_ids = match self.groups.find_ids_by_names(group_names).await {
			Ok(ids) => ids,
			Err(e) => {
				warn!(rule_id = %id, error = %e, "failed to look up groups by name");
				Vec::new()
			}
		};
		if let Err(e) = self.rules.link_groups(id, &group_ids).await {
			warn!(rule_id = %id, error = %e, "failed to link groups");
		}

		let pairs: Vec<(SectionId, PermissionId)> = section_ids
			.iter()
			.flat_map(|section| permission_ids.iter().map(move |p| (*section, *p)))
			.collect();
		if let Err(e) = self.rules.link_section_permissions(id, &pairs).await {
			warn!(rule_id = %id, error = %e, "failed to link section permissions");
		}

		self
			.record(
				AuditLogEntry::builder(AuditEventType::RuleCreated)
					.object(RULE_OBJECT, id.get())
					.section(first_section(section_ids))
					.note(note)
					.params(json!({
						"name": name,
						"sections": section_ids,
						"permissions": permission_ids,
						"groups": group_ids,
					})),
			)
			.await;
		for listener in &self.listeners {
			listener.rule_saved(id, true);
		}

		info!(rule_id = %id, groups = group_ids.len(), grants = pairs.len(), "rule created");
		Some(id)
	}

	/// Inserts or replaces a rule with its group and section-permission links.
	///
	/// Replacing drops every existing link first. Derived grants (publishing
	/// implies viewing unpublished, managing implies viewing unapproved) are
	/// added automatically. With no sections, admin-site permissions are
	/// linked to the global section and front-site permissions are dropped.
	/// Returns `None` if the rule row could not be written or does not exist.
	#[instrument(skip_all, fields(rule_id = ?draft.id, name = %draft.name))]
	pub async fn save_rule(&self, draft: RuleDraft) -> Option<RuleId> {
		// Classification reads the whole catalog, published or not.
		let catalog: HashMap<PermissionId, PermissionDefinition> =
			match self.permissions.list_all().await {
				Ok(definitions) => definitions.into_iter().map(|d| (d.id, d)).collect(),
				Err(e) => {
					warn!(error = %e, "failed to read permission catalog");
					HashMap::new()
				}
			};

		let permission_ids = with_implied_grants(&draft.permission_ids, &catalog);
		let pairs = section_pairs(&draft.section_ids, &permission_ids, &catalog);

		let (id, created) = match draft.id {
			Some(id) => match self.rules.update_rule(id, &draft).await {
				Ok(true) => {
					if let Err(e) = self.rules.clear_links(id).await {
						warn!(rule_id = %id, error = %e, "failed to clear rule links");
					}
					(id, false)
				}
				Ok(false) => {
					warn!(rule_id = %id, "rule not found, nothing saved");
					return None;
				}
				Err(e) => {
					warn!(rule_id = %id, error = %e, "failed to update rule");
					return None;
				}
			},
			None => match self.rules.insert_rule(&draft).await {
				Ok(id) => (id, true),
				Err(e) => {
					warn!(error = %e, "failed to insert rule");
					return None;
				}
			},
		};

		if let Err(e) = self.rules.link_groups(id, &draft.group_ids).await {
			warn!(rule_id = %id, error = %e, "failed to link groups");
		}
		if let Err(e) = self.rules.link_section_permissions(id, &pairs).await {
			warn!(rule_id = %id, error = %e, "failed to link section permissions");
		}

		let event_type = if created {
			AuditEventType::RuleCreated
		} else {
			AuditEventType::RuleUpdated
		};
		self
			.record(
				AuditLogEntry::builder(event_type)
					.object(RULE_OBJECT, id.get())
					.section(first_section(&draft.section_ids))
					.note(draft.note.as_str())
					.params(json!({
						"name": draft.name,
						"alias": draft.effective_alias(),
						"enabled": draft.enabled,
						"sections": draft.section_ids,
						"permissions": permission_ids,
						"groups": draft.group_ids,
					})),
			)
			.await;
		for listener in &self.listeners {
			listener.rule_saved(id, created);
		}

		info!(rule_id = %id, created, grants = pairs.len(), "rule saved");
		Some(id)
	}

	/// Deletes rules and their links. Unknown ids are skipped. Returns the
	/// number of rules deleted.
	#[instrument(skip_all, fields(count = ids.len()))]
	pub async fn delete_rules(&self, ids: &[RuleId]) -> usize {
		let mut deleted = Vec::new();
		for &id in ids {
			let rule = match self.rules.get_rule(id).await {
				Ok(Some(rule)) => rule,
				Ok(None) => {
					debug!(rule_id = %id, "rule already gone");
					continue;
				}
				Err(e) => {
					warn!(rule_id = %id, error = %e, "failed to load rule");
					continue;
				}
			};
			let sections = self.rules.rule_sections(id).await.unwrap_or_else(|e| {
				warn!(rule_id = %id, error = %e, "failed to load rule sections");
				Vec::new()
			});

			match self.rules.delete_rule(id).await {
				Ok(true) => {
					self
						.record(
							AuditLogEntry::builder(AuditEventType::RuleDeleted)
								.object(RULE_OBJECT, id.get())
								.section(first_section(&sections))
								.note(rule.note.as_str())
								.params(json!({ "name": rule.name, "sections": sections })),
						)
						.await;
					deleted.push(id);
				}
				Ok(false) => debug!(rule_id = %id, "rule already gone"),
				Err(e) => warn!(rule_id = %id, error = %e, "failed to delete rule"),
			}
		}

		if !deleted.is_empty() {
			for listener in &self.listeners {
				listener.rules_deleted(&deleted);
			}
		}
		info!(deleted = deleted.len(), "rules deleted");
		deleted.len()
	}

	/// Enables or disables rules. Returns the number of rules changed.
	#[instrument(skip_all, fields(count = ids.len(), enabled = enabled))]
	pub async fn set_rule_enabled(&self, ids: &[RuleId], enabled: bool) -> u64 {
		let event_type = if enabled {
			AuditEventType::RuleEnabled
		} else {
			AuditEventType::RuleDisabled
		};

		let mut toggled = Vec::new();
		for &id in ids {
			match self.rules.set_enabled(&[id], enabled).await {
				Ok(0) => debug!(rule_id = %id, "rule not found"),
				Ok(_) => {
					self
						.record(
							AuditLogEntry::builder(event_type)
								.object(RULE_OBJECT, id.get())
								.params(json!({ "enabled": enabled })),
						)
						.await;
					toggled.push(id);
				}
				Err(e) => warn!(rule_id = %id, error = %e, "failed to toggle rule"),
			}
		}

		if !toggled.is_empty() {
			for listener in &self.listeners {
				listener.rules_toggled(&toggled, enabled);
			}
		}
		toggled.len() as u64
	}

	/// Registers a catalog entry unless an identical one exists. Returns the
	/// id of the new or existing definition.
	#[instrument(skip_all, fields(key = %key, published = published))]
	pub async fn add_permission(&self, key: &PermissionKey, published: bool) -> Option<PermissionId> {
		match self.permissions.find(key).await {
			Ok(Some(existing)) => {
				debug!(permission_id = %existing.id, "permission already registered");
				return Some(existing.id);
			}
			Ok(None) => {}
			Err(e) => {
				warn!(error = %e, "failed to look up permission");
				return None;
			}
		}

		let id = match self.permissions.insert(key, published).await {
			Ok(id) => id,
			Err(DbError::Conflict(_)) => {
				// Registered concurrently.
				return self.permissions.find(key).await.ok().flatten().map(|d| d.id);
			}
			Err(e) => {
				warn!(error = %e, "failed to register permission");
				return None;
			}
		};

		self
			.record(
				AuditLogEntry::builder(AuditEventType::PermissionAdded)
					.object(PERMISSION_OBJECT, id.get())
					.params(json!({ "key": key.to_string(), "published": published })),
			)
			.await;
		info!(permission_id = %id, "permission registered");
		Some(id)
	}

	/// Deletes the catalog entry matching `key` exactly. Returns the number of
	/// rows removed.
	#[instrument(skip_all, fields(key = %key))]
	pub async fn remove_permission(&self, key: &PermissionKey) -> u64 {
		let existing = match self.permissions.find(key).await {
			Ok(existing) => existing,
			Err(e) => {
				warn!(error = %e, "failed to look up permission");
				return 0;
			}
		};

		let removed = match self.permissions.delete(key).await {
			Ok(removed) => removed,
			Err(e) => {
				warn!(error = %e, "failed to remove permission");
				return 0;
			}
		};

		if removed > 0 {
			let mut entry = AuditLogEntry::builder(AuditEventType::PermissionRemoved)
				.params(json!({ "key": key.to_string() }));
			entry = match existing {
				Some(definition) => entry.object(PERMISSION_OBJECT, definition.id.get()),
				None => entry.object_type(PERMISSION_OBJECT),
			};
			self.record(entry).await;
			info!(removed, "permission removed");
		}
		removed
	}

	async fn resolve_key(&self, raw: &str) -> Option<PermissionId> {
		let key: PermissionKey = match raw.parse() {
			Ok(key) => key,
			Err(e) => {
				warn!(key = raw, error = %e, "skipping malformed permission key");
				return None;
			}
		};
		match self.permissions.find(&key).await {
			Ok(Some(definition)) => Some(definition.id),
			Ok(None) => {
				warn!(key = %key, "skipping unknown permission key");
				None
			}
			Err(e) => {
				warn!(key = %key, error = %e, "failed to look up permission key");
				None
			}
		}
	}

	async fn record(&self, builder: AuditLogBuilder) {
		let builder = match self.actor {
			Some(user_id) => builder.actor(user_id),
			None => builder,
		};
		self.audit.log(builder.build()).await;
	}
}

fn first_section(sections: &[SectionId]) -> i64 {
	sections.first().map_or(SectionId::GLOBAL.get(), |s| s.get())
}

/// `ids` plus the definitions implied by any of them, without duplicates.
fn with_implied_grants(
	ids: &[PermissionId],
	catalog: &HashMap<PermissionId, PermissionDefinition>,
) -> Vec<PermissionId> {
	let mut result: Vec<PermissionId> = Vec::with_capacity(ids.len());
	for id in ids {
		if !result.contains(id) {
			result.push(*id);
		}
	}

	let implied: Vec<PermissionKey> = ids
		.iter()
		.filter_map(|id| catalog.get(id))
		.flat_map(|definition| implied_by(&definition.key()))
		.collect();
	for key in implied {
		let found = catalog.values().find(|d| d.key() == key);
		match found {
			Some(definition) if !result.contains(&definition.id) => result.push(definition.id),
			Some(_) => {}
			None => debug!(key = %key, "implied permission not in catalog"),
		}
	}
	result
}

fn section_pairs(
	sections: &[SectionId],
	ids: &[PermissionId],
	catalog: &HashMap<PermissionId, PermissionDefinition>,
) -> Vec<(SectionId, PermissionId)> {
	if sections.is_empty() {
		return ids
			.iter()
			.filter(|id| catalog.get(*id).is_some_and(|d| d.site == Site::Admin))
			.map(|id| (SectionId::GLOBAL, *id))
			.collect();
	}

	sections
		.iter()
		.flat_map(|section| ids.iter().map(move |id| (*section, *id)))
		.collect()
}
