// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Access decision engine.
//!
//! [`AccessEngine::can`] evaluates a query in this order:
//!
//! 1. Super-admins are always allowed
//! 2. `cms` queries are delegated to the host [`IdentityProvider`]
//! 3. Request verbs are normalized (`cancel` is always allowed)
//! 4. Global-scope subjects are checked as `manage` in section 0; other
//!    sectionless queries use the `global` value and honor public tasks
//! 5. The `(site, section)` index is probed with wildcard fallbacks
//! 6. Observers adjust the result, which is memoized for the request

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, instrument};
use warden_acl_core::{
	normalize_action, AccessQuery, GroupId, NormalizedAction, PermissionIndex, SectionId, Site,
	GLOBAL_VALUE, MANAGE_ACTION,
};
use warden_server_config::AclConfig;
use warden_server_db::{GroupStore, PermissionStore, RuleStore};

use crate::context::{DecisionKey, RequestContext};
use crate::groups::GroupResolver;
use crate::hooks::{DecisionObserver, IdentityProvider};
use crate::index::IndexBuilder;

/// Subject whose queries are answered by the host.
pub const HOST_SUBJECT: &str = "cms";

/// Answers boolean access queries for a principal.
///
/// The engine is stateless across requests; everything request-scoped lives
/// in the [`RequestContext`] passed to each call.
pub struct AccessEngine {
	resolver: GroupResolver,
	builder: IndexBuilder,
	identity: Arc<dyn IdentityProvider>,
	observers: Vec<Arc<dyn DecisionObserver>>,
	config: AclConfig,
}

impl AccessEngine {
	pub fn new(
		groups: Arc<dyn GroupStore>,
		rules: Arc<dyn RuleStore>,
		permissions: Arc<dyn PermissionStore>,
		identity: Arc<dyn IdentityProvider>,
		config: AclConfig,
	) -> Self {
		Self {
			resolver: GroupResolver::new(groups, config.max_group_depth),
			builder: IndexBuilder::new(rules, permissions),
			identity,
			observers: Vec::new(),
			config,
		}
	}

	/// Appends an observer; observers run in the order they were added.
	pub fn with_observer(mut self, observer: Arc<dyn DecisionObserver>) -> Self {
		self.observers.push(observer);
		self
	}

	pub fn config(&self) -> &AclConfig {
		&self.config
	}

	/// The principal's resolved groups, computed on first use per request.
	pub async fn resolved_groups<'c>(&self, ctx: &'c mut RequestContext) -> &'c HashSet<GroupId> {
		if ctx.groups.is_none() {
			let resolved = self.resolver.resolve(ctx.principal()).await;
			ctx.groups = Some(resolved);
		}
		ctx.groups.get_or_insert_with(HashSet::new)
	}

	#[instrument(skip(self, ctx, query), fields(user_id = ctx.principal().user_id, subject = query.subject()))]
	pub async fn can(&self, ctx: &mut RequestContext, query: &AccessQuery) -> bool {
		let (subject, action, mut value) = query.parts();

		if ctx.principal().is_super_admin {
			debug!(subject = %subject, action = %action, "super-admin, access granted");
			return true;
		}

		if subject == HOST_SUBJECT {
			let host_action = format!("core.{action}");
			let allowed = self
				.identity
				.authorize(&host_action, &self.config.namespace)
				.await;
			debug!(action = %host_action, namespace = %self.config.namespace, allowed, "delegated to host");
			return allowed;
		}

		let mut action = match normalize_action(&action, ctx.request().target_exists()) {
			NormalizedAction::Allow => {
				debug!(subject = %subject, "cancel is always allowed");
				return true;
			}
			NormalizedAction::Check(action) => action,
		};

		let mut section = query
			.requested_section()
			.unwrap_or(ctx.request().section);

		if self.config.global_subjects.iter().any(|s| *s == subject) {
			action = MANAGE_ACTION.to_string();
			section = SectionId::GLOBAL;
		} else if section.is_global() {
			value = GLOBAL_VALUE.to_string();
			if let Some(task) = ctx.request().task.as_deref() {
				if self.config.public_tasks.iter().any(|t| t == task) {
					debug!(task, "public task, access granted");
					return true;
				}
			}
		}

		let site = ctx.request().site;
		let key = DecisionKey {
			site,
			section,
			subject,
			action,
			value,
		};
		if let Some(&cached) = ctx.decisions.get(&key) {
			return cached;
		}

		let index = self.index_for(ctx, key.site, key.section).await;
		let matched = index.matching_key(&key.subject, &key.action, &key.value);
		let mut allowed = matched.is_some();

		for observer in &self.observers {
			allowed = observer.adjust_decision(allowed, section, &key.subject, &key.action, &key.value);
		}

		debug!(
			site = %key.site,
			section = %key.section,
			subject = %key.subject,
			action = %key.action,
			value = %key.value,
			matched = ?matched,
			allowed,
			"access decision"
		);

		ctx.decisions.insert(key, allowed);
		allowed
	}

	async fn index_for<'c>(
		&self,
		ctx: &'c mut RequestContext,
		site: Site,
		section: SectionId,
	) -> &'c PermissionIndex {
		if !ctx.indexes.contains_key(&(site, section)) {
			let index = {
				let groups = self.resolved_groups(ctx).await;
				self.builder.build(groups, section, site).await
			};
			ctx.indexes.insert((site, section), index);
		}
		ctx.indexes.entry((site, section)).or_default()
	}
}
