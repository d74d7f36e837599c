// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Rule service writes, audit history and lifecycle notifications.

use std::sync::{Arc, Mutex};

use warden_acl_core::{
	AccessQuery, GroupId, GroupKind, GroupRef, PermissionKey, Principal, RuleDraft, RuleId,
	SectionId, Site,
};
use warden_server_acl::{RequestContext, RequestInfo, RuleLifecycleListener};
use warden_server_audit::AuditEventType;
use warden_server_db::{AuditStore, PermissionStore, RuleStore};

use super::support::World;

#[derive(Default)]
struct Events(Mutex<Vec<String>>);

impl RuleLifecycleListener for Events {
	fn rule_saved(&self, id: RuleId, created: bool) {
		self.0.lock().unwrap().push(format!("saved {id} {created}"));
	}

	fn rules_deleted(&self, ids: &[RuleId]) {
		self.0.lock().unwrap().push(format!("deleted {}", ids.len()));
	}

	fn rules_toggled(&self, ids: &[RuleId], enabled: bool) {
		self
			.0
			.lock()
			.unwrap()
			.push(format!("toggled {} {enabled}", ids.len()));
	}
}

fn keys(raw: &[&str]) -> Vec<String> {
	raw.iter().map(|s| s.to_string()).collect()
}

fn member_in(group: i64, section: i64) -> RequestContext {
	RequestContext::new(
		Principal::new(42).with_group(GroupRef::Native(GroupId::new(group))),
		RequestInfo::new(Site::Front).with_section(SectionId::new(section)),
	)
}

// ============================================================================
// Catalog
// ============================================================================

#[tokio::test]
async fn test_add_permission_is_idempotent() {
	let world = World::new().await;
	let service = world.service();
	let key = PermissionKey::front("widget", "configure", "*");

	let first = service.add_permission(&key, true).await;
	let second = service.add_permission(&key, true).await;
	assert!(first.is_some());
	assert_eq!(first, second);

	let matching: Vec<_> = world
		.permissions
		.list_all()
		.await
		.unwrap()
		.into_iter()
		.filter(|d| d.key() == key)
		.collect();
	assert_eq!(matching.len(), 1);

	let history = world.history().list_for_object("permission", None, None).await.unwrap();
	assert_eq!(history.len(), 1);
	assert_eq!(history[0].event_type, AuditEventType::PermissionAdded);
}

#[tokio::test]
async fn test_remove_permission_matches_site() {
	let world = World::new().await;
	let service = world.service();
	let front = PermissionKey::front("widget", "configure", "*");
	let admin = PermissionKey::new("widget", "configure", "*", Site::Admin);
	service.add_permission(&front, true).await;
	service.add_permission(&admin, true).await;

	assert_eq!(service.remove_permission(&front).await, 1);
	assert_eq!(service.remove_permission(&front).await, 0);
	assert!(world.permissions.find(&admin).await.unwrap().is_some());

	let removals: Vec<_> = world
		.history()
		.list_for_object("permission", None, None)
		.await
		.unwrap()
		.into_iter()
		.filter(|e| e.event_type == AuditEventType::PermissionRemoved)
		.collect();
	assert_eq!(removals.len(), 1);
}

// ============================================================================
// Rule creation
// ============================================================================

#[tokio::test]
async fn test_create_rule_wires_groups_sections_and_keys() {
	let world = World::new().await;
	world.group(7, "Authors", GroupKind::Native, None).await;
	world.group(8, "Reviewers", GroupKind::Native, None).await;
	let service = world.service();
	service
		.add_permission(&PermissionKey::front("entry", "edit", "own"), true)
		.await;

	let id = service
		.create_rule(
			"Authors edit",
			&[SectionId::new(3), SectionId::new(4)],
			&keys(&["entry.edit.own", "entry.edit.unknown", "not-a-key"]),
			&keys(&["AUTHORS", "Nobody"]),
			"seeded",
		)
		.await
		.unwrap();

	assert_eq!(world.rules.rule_groups(id).await.unwrap(), vec![GroupId::new(7)]);
	assert_eq!(world.rules.rule_section_permissions(id).await.unwrap().len(), 2);

	let engine = world.engine();
	let mut ctx = member_in(7, 4);
	assert!(engine.can(&mut ctx, &AccessQuery::new("entry.edit.own")).await);
	let mut reviewer = member_in(8, 4);
	assert!(!engine.can(&mut reviewer, &AccessQuery::new("entry.edit.own")).await);

	let history = world
		.history()
		.list_for_object("rule", Some(id.get()), None)
		.await
		.unwrap();
	assert_eq!(history.len(), 1);
	assert_eq!(history[0].event_type, AuditEventType::RuleCreated);
	assert_eq!(history[0].note, "seeded");
	assert_eq!(history[0].section_id, 3);
}

// ============================================================================
// Rule saving
// ============================================================================

#[tokio::test]
async fn test_save_rule_replaces_links() {
	let world = World::new().await;
	let service = world.service();
	let own = world.permission(&PermissionKey::front("entry", "edit", "own")).await;
	let any = world.permission(&PermissionKey::front("entry", "edit", "any")).await;

	let mut draft = RuleDraft::new("Editors");
	draft.group_ids = vec![GroupId::new(7), GroupId::new(8)];
	draft.section_ids = vec![SectionId::new(3)];
	draft.permission_ids = vec![own];
	let id = service.save_rule(draft.clone()).await.unwrap();

	draft.id = Some(id);
	draft.group_ids = vec![GroupId::new(9)];
	draft.permission_ids = vec![any];
	assert_eq!(service.save_rule(draft).await, Some(id));

	assert_eq!(world.rules.rule_groups(id).await.unwrap(), vec![GroupId::new(9)]);
	assert_eq!(
		world.rules.rule_section_permissions(id).await.unwrap(),
		vec![(SectionId::new(3), any)]
	);

	let history = world
		.history()
		.list_for_object("rule", Some(id.get()), None)
		.await
		.unwrap();
	let kinds: Vec<_> = history.iter().map(|e| e.event_type).collect();
	assert!(kinds.contains(&AuditEventType::RuleCreated));
	assert!(kinds.contains(&AuditEventType::RuleUpdated));
}

#[tokio::test]
async fn test_save_rule_adds_implied_grants() {
	let world = World::new().await;
	let service = world.service();
	let publish = world.permission(&PermissionKey::front("entry", "publish", "any")).await;
	let view = world
		.permission(&PermissionKey::front("entry", "access", "unpublished_any"))
		.await;

	let mut draft = RuleDraft::new("Publishers");
	draft.group_ids = vec![GroupId::new(7)];
	draft.section_ids = vec![SectionId::new(3)];
	draft.permission_ids = vec![publish];
	let id = service.save_rule(draft).await.unwrap();

	let pairs = world.rules.rule_section_permissions(id).await.unwrap();
	assert!(pairs.contains(&(SectionId::new(3), publish)));
	assert!(pairs.contains(&(SectionId::new(3), view)));

	let engine = world.engine();
	let mut ctx = member_in(7, 3);
	assert!(
		engine
			.can(&mut ctx, &AccessQuery::new("entry.view.unpublished_any"))
			.await
	);
	assert!(
		!engine
			.can(&mut ctx, &AccessQuery::new("entry.view.unpublished_own"))
			.await
	);
}

#[tokio::test]
async fn test_save_rule_without_sections_keeps_admin_grants_global() {
	let world = World::new().await;
	let service = world.service();
	let admin = world
		.permission(&PermissionKey::new("acl", "manage", "valid", Site::Admin))
		.await;
	let front = world.permission(&PermissionKey::front("entry", "edit", "own")).await;

	let mut draft = RuleDraft::new("Administrators");
	draft.group_ids = vec![GroupId::new(7)];
	draft.permission_ids = vec![admin, front];
	let id = service.save_rule(draft).await.unwrap();

	assert_eq!(
		world.rules.rule_section_permissions(id).await.unwrap(),
		vec![(SectionId::GLOBAL, admin)]
	);
}

#[tokio::test]
async fn test_save_unknown_rule_returns_none() {
	let world = World::new().await;
	let service = world.service();
	let mut draft = RuleDraft::new("Ghost");
	draft.id = Some(RuleId::new(404));
	assert_eq!(service.save_rule(draft).await, None);
	assert!(world.rules.list_rules().await.unwrap().is_empty());
}

// ============================================================================
// Deletion and toggling
// ============================================================================

#[tokio::test]
async fn test_delete_rules_skips_unknown_ids() {
	let world = World::new().await;
	let events = Arc::new(Events::default());
	let service = world.service().with_listener(events.clone()).with_actor(5);

	let mut draft = RuleDraft::new("Temporary");
	draft.section_ids = vec![SectionId::new(3)];
	let id = service.save_rule(draft).await.unwrap();

	assert_eq!(service.delete_rules(&[id, RuleId::new(404)]).await, 1);
	assert!(world.rules.get_rule(id).await.unwrap().is_none());
	assert_eq!(service.delete_rules(&[id]).await, 0);

	let history = world
		.history()
		.list_for_object("rule", Some(id.get()), None)
		.await
		.unwrap();
	let deleted = history
		.iter()
		.find(|e| e.event_type == AuditEventType::RuleDeleted)
		.unwrap();
	assert_eq!(deleted.actor_user_id, Some(5));
	assert_eq!(deleted.params["name"], "Temporary");

	let seen = events.0.lock().unwrap();
	assert_eq!(
		seen.as_slice(),
		&[format!("saved {id} true"), "deleted 1".to_string()]
	);
}

#[tokio::test]
async fn test_disabled_rule_stops_granting() {
	let world = World::new().await;
	world.group(7, "Authors", GroupKind::Native, None).await;
	let events = Arc::new(Events::default());
	let service = world.service().with_listener(events.clone());
	service
		.add_permission(&PermissionKey::front("entry", "edit", "own"), true)
		.await;
	let id = service
		.create_rule(
			"Authors edit",
			&[SectionId::new(3)],
			&keys(&["entry.edit.own"]),
			&keys(&["authors"]),
			"",
		)
		.await
		.unwrap();

	let engine = world.engine();
	let query = AccessQuery::new("entry.edit.own");
	let mut ctx = member_in(7, 3);
	assert!(engine.can(&mut ctx, &query).await);

	assert_eq!(service.set_rule_enabled(&[id, RuleId::new(404)], false).await, 1);
	ctx.invalidate();
	assert!(!engine.can(&mut ctx, &query).await);

	assert_eq!(service.set_rule_enabled(&[id], true).await, 1);
	ctx.invalidate();
	assert!(engine.can(&mut ctx, &query).await);

	let history = world
		.history()
		.list_for_object("rule", Some(id.get()), None)
		.await
		.unwrap();
	let kinds: Vec<_> = history.iter().map(|e| e.event_type).collect();
	assert!(kinds.contains(&AuditEventType::RuleDisabled));
	assert!(kinds.contains(&AuditEventType::RuleEnabled));

	let seen = events.0.lock().unwrap();
	assert!(seen.contains(&"toggled 1 false".to_string()));
	assert!(seen.contains(&"toggled 1 true".to_string()));
}
