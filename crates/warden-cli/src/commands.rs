// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use anyhow::{Context, Result};
use warden_acl_core::{
	AccessQuery, GroupId, GroupRef, PermissionKey, Principal, RuleId, SectionId,
};
use warden_server_acl::{
	AccessEngine, FixedAuthorization, RequestContext, RequestInfo, RuleService,
};
use warden_server_audit::{AuditService, AuditSink, SqliteAuditSink, TracingAuditSink};
use warden_server_config::{AclConfig, AuditConfig, WardenConfig};
use warden_server_db::{
	create_pool, run_migrations, AuditRepository, AuditStore, RuleStore, SqliteGroupRepository,
	SqlitePermissionRepository, SqlitePool, SqliteRuleRepository,
};

use crate::Command;

/// Repositories and services shared by every subcommand.
pub struct Services {
	pool: SqlitePool,
	groups: Arc<SqliteGroupRepository>,
	rules: Arc<SqliteRuleRepository>,
	permissions: Arc<SqlitePermissionRepository>,
	audit: AuditService,
	acl: AclConfig,
	actor: Option<i64>,
}

impl Services {
	pub async fn connect(config: &WardenConfig, actor: Option<i64>) -> Result<Self> {
		let pool = create_pool(&config.database.url)
			.await
			.with_context(|| format!("failed to open database {}", config.database.url))?;
		Ok(Self::from_pool(pool, &config.audit, config.acl.clone(), actor))
	}

	pub fn from_pool(
		pool: SqlitePool,
		audit: &AuditConfig,
		acl: AclConfig,
		actor: Option<i64>,
	) -> Self {
		let mut sinks: Vec<Arc<dyn AuditSink>> = Vec::new();
		if audit.enabled {
			sinks.push(Arc::new(SqliteAuditSink::new(pool.clone())));
			if audit.tracing_sink {
				sinks.push(Arc::new(TracingAuditSink::new()));
			}
		}

		Self {
			groups: Arc::new(SqliteGroupRepository::new(pool.clone())),
			rules: Arc::new(SqliteRuleRepository::new(pool.clone())),
			permissions: Arc::new(SqlitePermissionRepository::new(pool.clone())),
			audit: AuditService::new(sinks),
			pool,
			acl,
			actor,
		}
	}

	fn engine(&self, host_allows: bool) -> AccessEngine {
		AccessEngine::new(
			self.groups.clone(),
			self.rules.clone(),
			self.permissions.clone(),
			Arc::new(FixedAuthorization(host_allows)),
			self.acl.clone(),
		)
	}

	fn rule_service(&self) -> RuleService {
		let service = RuleService::new(
			self.groups.clone(),
			self.rules.clone(),
			self.permissions.clone(),
			self.audit.clone(),
		);
		match self.actor {
			Some(user_id) => service.with_actor(user_id),
			None => service,
		}
	}
}

fn rule_ids(raw: &[i64]) -> Vec<RuleId> {
	raw.iter().copied().map(RuleId::new).collect()
}

pub(crate) async fn run(services: &Services, command: Command) -> Result<()> {
	match command {
		Command::Migrate => {
			run_migrations(&services.pool)
				.await
				.context("failed to run migrations")?;
			println!("schema up to date");
		}
		Command::Check {
			subject_path,
			action,
			value,
			section,
			request_section,
			groups,
			custom_groups,
			site,
			super_admin,
			task,
			target_id,
			host_allows,
		} => {
			let mut principal = Principal::new(services.actor.unwrap_or(0));
			principal.is_super_admin = super_admin;
			principal.groups.extend(
				groups
					.into_iter()
					.map(|id| GroupRef::Native(GroupId::new(id))),
			);
			principal.groups.extend(
				custom_groups
					.into_iter()
					.map(|id| GroupRef::Custom(GroupId::new(id))),
			);

			let mut request = RequestInfo::new(site)
				.with_section(SectionId::new(request_section))
				.with_target_id(target_id);
			if let Some(task) = task {
				request = request.with_task(task);
			}

			let mut query = AccessQuery::new(&subject_path);
			if let Some(action) = action {
				query = query.action(action);
			}
			if let Some(value) = value {
				query = query.value(value);
			}
			if let Some(section) = section {
				query = query.section(SectionId::new(section));
			}

			let mut ctx = RequestContext::new(principal, request);
			let allowed = services.engine(host_allows).can(&mut ctx, &query).await;
			println!("{}", if allowed { "allowed" } else { "denied" });
		}
		Command::AddPermission { key, unpublished } => {
			let key: PermissionKey = key.parse()?;
			let id = services
				.rule_service()
				.add_permission(&key, !unpublished)
				.await
				.with_context(|| format!("failed to register {key}"))?;
			println!("{id}\t{key}");
		}
		Command::RemovePermission { key } => {
			let key: PermissionKey = key.parse()?;
			let removed = services.rule_service().remove_permission(&key).await;
			println!("removed {removed}");
		}
		Command::CreateRule {
			name,
			sections,
			permissions,
			groups,
			note,
		} => {
			let sections: Vec<SectionId> = sections.into_iter().map(SectionId::new).collect();
			let id = services
				.rule_service()
				.create_rule(&name, &sections, &permissions, &groups, &note)
				.await
				.with_context(|| format!("failed to create rule {name}"))?;
			println!("{id}");
		}
		Command::EnableRules { ids } => {
			let changed = services
				.rule_service()
				.set_rule_enabled(&rule_ids(&ids), true)
				.await;
			println!("enabled {changed}");
		}
		Command::DisableRules { ids } => {
			let changed = services
				.rule_service()
				.set_rule_enabled(&rule_ids(&ids), false)
				.await;
			println!("disabled {changed}");
		}
		Command::DeleteRules { ids } => {
			let deleted = services.rule_service().delete_rules(&rule_ids(&ids)).await;
			println!("deleted {deleted}");
		}
		Command::ListRules => {
			let rules = services
				.rules
				.list_rules()
				.await
				.context("failed to list rules")?;
			for rule in rules {
				println!(
					"{}\t{}\t{}\t{}",
					rule.id,
					if rule.enabled { "enabled" } else { "disabled" },
					rule.alias,
					rule.name
				);
			}
		}
		Command::History {
			object_type,
			id,
			limit,
		} => {
			let entries = AuditRepository::new(services.pool.clone())
				.list_for_object(&object_type, id, Some(limit))
				.await
				.context("failed to read audit history")?;
			for entry in entries {
				println!(
					"{}\t{}\t{}\t{}",
					entry.timestamp.to_rfc3339(),
					entry.event_type,
					entry.object_id.map(|id| id.to_string()).unwrap_or_default(),
					serde_json::to_string(&entry.params)?
				);
			}
		}
	}
	Ok(())
}
