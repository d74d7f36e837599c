// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Shared fixtures for acl integration tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use warden_acl_core::{
	Group, GroupId, GroupKind, PermissionId, PermissionKey, Rule, RuleDraft, RuleId, SectionId,
	ValidityWindow,
};
use warden_server_acl::{AccessEngine, IdentityProvider, RuleService};
use warden_server_audit::{AuditService, AuditSink, SqliteAuditSink};
use warden_server_config::AclConfig;
use warden_server_db::testing::create_acl_test_pool;
use warden_server_db::{
	AuditRepository, GroupStore, PermissionStore, Result, RuleStore, SqliteGroupRepository,
	SqlitePermissionRepository, SqlitePool, SqliteRuleRepository,
};

/// Delegates to SQLite and counts index-building reads.
pub struct CountingRuleStore {
	inner: SqliteRuleRepository,
	rule_reads: AtomicUsize,
}

impl CountingRuleStore {
	pub fn rule_reads(&self) -> usize {
		self.rule_reads.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl RuleStore for CountingRuleStore {
	async fn insert_rule(&self, draft: &RuleDraft) -> Result<RuleId> {
		self.inner.insert_rule(draft).await
	}

	async fn update_rule(&self, id: RuleId, draft: &RuleDraft) -> Result<bool> {
		self.inner.update_rule(id, draft).await
	}

	async fn get_rule(&self, id: RuleId) -> Result<Option<Rule>> {
		self.inner.get_rule(id).await
	}

	async fn list_rules(&self) -> Result<Vec<Rule>> {
		self.inner.list_rules().await
	}

	async fn clear_links(&self, id: RuleId) -> Result<()> {
		self.inner.clear_links(id).await
	}

	async fn link_groups(&self, id: RuleId, group_ids: &[GroupId]) -> Result<()> {
		self.inner.link_groups(id, group_ids).await
	}

	async fn link_section_permissions(
		&self,
		id: RuleId,
		pairs: &[(SectionId, PermissionId)],
	) -> Result<()> {
		self.inner.link_section_permissions(id, pairs).await
	}

	async fn rule_groups(&self, id: RuleId) -> Result<Vec<GroupId>> {
		self.inner.rule_groups(id).await
	}

	async fn rule_section_permissions(&self, id: RuleId) -> Result<Vec<(SectionId, PermissionId)>> {
		self.inner.rule_section_permissions(id).await
	}

	async fn rule_sections(&self, id: RuleId) -> Result<Vec<SectionId>> {
		self.inner.rule_sections(id).await
	}

	async fn delete_rule(&self, id: RuleId) -> Result<bool> {
		self.inner.delete_rule(id).await
	}

	async fn set_enabled(&self, ids: &[RuleId], enabled: bool) -> Result<u64> {
		self.inner.set_enabled(ids, enabled).await
	}

	async fn enabled_rules_for_groups(
		&self,
		group_ids: &[GroupId],
	) -> Result<Vec<(RuleId, ValidityWindow)>> {
		self.rule_reads.fetch_add(1, Ordering::SeqCst);
		self.inner.enabled_rules_for_groups(group_ids).await
	}

	async fn section_permission_ids(
		&self,
		section: SectionId,
		rule_ids: &[RuleId],
	) -> Result<Vec<PermissionId>> {
		self.inner.section_permission_ids(section, rule_ids).await
	}
}

/// Host identity provider that records what it was asked.
pub struct RecordingHost {
	allow: bool,
	pub calls: Mutex<Vec<(String, String)>>,
}

impl RecordingHost {
	pub fn new(allow: bool) -> Self {
		Self {
			allow,
			calls: Mutex::new(Vec::new()),
		}
	}
}

#[async_trait]
impl IdentityProvider for RecordingHost {
	async fn authorize(&self, action: &str, namespace: &str) -> bool {
		self
			.calls
			.lock()
			.unwrap()
			.push((action.to_string(), namespace.to_string()));
		self.allow
	}
}

pub struct World {
	pub pool: SqlitePool,
	pub groups: Arc<SqliteGroupRepository>,
	pub rules: Arc<CountingRuleStore>,
	pub permissions: Arc<SqlitePermissionRepository>,
	pub host: Arc<RecordingHost>,
}

impl World {
	pub async fn new() -> Self {
		Self::with_host(false).await
	}

	pub async fn with_host(allow: bool) -> Self {
		let pool = create_acl_test_pool().await.unwrap();
		Self {
			groups: Arc::new(SqliteGroupRepository::new(pool.clone())),
			rules: Arc::new(CountingRuleStore {
				inner: SqliteRuleRepository::new(pool.clone()),
				rule_reads: AtomicUsize::new(0),
			}),
			permissions: Arc::new(SqlitePermissionRepository::new(pool.clone())),
			host: Arc::new(RecordingHost::new(allow)),
			pool,
		}
	}

	pub fn engine(&self) -> AccessEngine {
		AccessEngine::new(
			self.groups.clone(),
			self.rules.clone(),
			self.permissions.clone(),
			self.host.clone(),
			AclConfig::default(),
		)
	}

	pub fn service(&self) -> RuleService {
		let sink = Arc::new(SqliteAuditSink::new(self.pool.clone())) as Arc<dyn AuditSink>;
		RuleService::new(
			self.groups.clone(),
			self.rules.clone(),
			self.permissions.clone(),
			AuditService::new(vec![sink]),
		)
	}

	pub fn history(&self) -> AuditRepository {
		AuditRepository::new(self.pool.clone())
	}

	pub async fn group(&self, id: i64, name: &str, kind: GroupKind, parent: Option<i64>) {
		let mut group = Group::new(GroupId::new(id), name, kind);
		if let Some(parent) = parent {
			group = group.with_parent(GroupId::new(parent));
		}
		self.groups.insert_group(&group).await.unwrap();
	}

	/// Registers `key` if needed and returns its id.
	pub async fn permission(&self, key: &PermissionKey) -> PermissionId {
		match self.permissions.find(key).await.unwrap() {
			Some(existing) => existing.id,
			None => self.permissions.insert(key, true).await.unwrap(),
		}
	}

	/// A rule linking `group` to `key` in `section`.
	pub async fn grant(
		&self,
		group: i64,
		section: i64,
		key: &PermissionKey,
		window: ValidityWindow,
	) -> RuleId {
		let permission = self.permission(key).await;
		let mut draft = RuleDraft::new(format!("Grant {key}"));
		draft.window = window;
		let rule = self.rules.insert_rule(&draft).await.unwrap();
		self.rules.link_groups(rule, &[GroupId::new(group)]).await.unwrap();
		self
			.rules
			.link_section_permissions(rule, &[(SectionId::new(section), permission)])
			.await
			.unwrap();
		rule
	}
}
