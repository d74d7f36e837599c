// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Reference access scenarios.

use chrono::{Duration, Utc};
use warden_acl_core::{
	AccessQuery, GroupId, GroupKind, GroupRef, PermissionKey, Principal, SectionId, Site,
	ValidityWindow,
};
use warden_server_acl::{RequestContext, RequestInfo};

use super::support::World;

fn member_of(group: i64, site: Site) -> RequestContext {
	RequestContext::new(
		Principal::new(42).with_group(GroupRef::Native(GroupId::new(group))),
		RequestInfo::new(site),
	)
}

fn query(subject: &str, action: &str, value: &str, section: i64) -> AccessQuery {
	AccessQuery::new(subject)
		.action(action)
		.value(value)
		.section(SectionId::new(section))
}

// ============================================================================
// Rule windows
// ============================================================================

#[tokio::test]
async fn test_member_gets_exactly_the_granted_value() {
	let world = World::new().await;
	world.group(7, "Authors", GroupKind::Native, None).await;
	world
		.grant(7, 3, &PermissionKey::front("entry", "edit", "own"), ValidityWindow::unbounded())
		.await;

	let engine = world.engine();
	let mut ctx = member_of(7, Site::Front);
	assert!(engine.can(&mut ctx, &query("entry", "edit", "own", 3)).await);
	assert!(!engine.can(&mut ctx, &query("entry", "edit", "any", 3)).await);
}

#[tokio::test]
async fn test_expired_rule_grants_nothing() {
	let world = World::new().await;
	world.group(7, "Authors", GroupKind::Native, None).await;
	let yesterday = Utc::now() - Duration::days(1);
	world
		.grant(
			7,
			3,
			&PermissionKey::front("entry", "edit", "own"),
			ValidityWindow::new(None, Some(yesterday)),
		)
		.await;

	let engine = world.engine();
	let mut ctx = member_of(7, Site::Front);
	assert!(!engine.can(&mut ctx, &query("entry", "edit", "own", 3)).await);
}

#[tokio::test]
async fn test_rule_starting_tomorrow_grants_nothing_yet() {
	let world = World::new().await;
	world.group(7, "Authors", GroupKind::Native, None).await;
	let tomorrow = Utc::now() + Duration::days(1);
	world
		.grant(
			7,
			3,
			&PermissionKey::front("entry", "edit", "own"),
			ValidityWindow::new(Some(tomorrow), None),
		)
		.await;

	let engine = world.engine();
	let mut ctx = member_of(7, Site::Front);
	assert!(!engine.can(&mut ctx, &query("entry", "edit", "own", 3)).await);
}

// ============================================================================
// Host delegation
// ============================================================================

#[tokio::test]
async fn test_cms_subject_follows_host_denial_over_local_rules() {
	let world = World::with_host(false).await;
	world.group(7, "Authors", GroupKind::Native, None).await;
	world
		.grant(7, 0, &PermissionKey::front("cms", "manage", "global"), ValidityWindow::unbounded())
		.await;
	world
		.grant(7, 0, &PermissionKey::front("cms", "manage", "valid"), ValidityWindow::unbounded())
		.await;

	let engine = world.engine();
	let mut ctx = member_of(7, Site::Front);
	assert!(!engine.can(&mut ctx, &AccessQuery::new("cms").action("manage")).await);

	let calls = world.host.calls.lock().unwrap();
	assert_eq!(
		calls.as_slice(),
		&[("core.manage".to_string(), "com_warden".to_string())]
	);
}

#[tokio::test]
async fn test_cms_subject_follows_host_approval() {
	let world = World::with_host(true).await;
	let engine = world.engine();
	let mut ctx = RequestContext::new(Principal::visitor(), RequestInfo::default());
	assert!(engine.can(&mut ctx, &AccessQuery::new("cms.manage")).await);
}

// ============================================================================
// Global-scope subjects
// ============================================================================

#[tokio::test]
async fn test_global_subject_ignores_requested_section() {
	let world = World::new().await;
	world.group(7, "Administrators", GroupKind::Native, None).await;
	world.group(8, "Section editors", GroupKind::Native, None).await;
	let key = PermissionKey::new("acl", "manage", "anything", Site::Admin);
	world.grant(7, 0, &key, ValidityWindow::unbounded()).await;
	world.grant(8, 3, &key, ValidityWindow::unbounded()).await;

	let engine = world.engine();

	let mut global_admin = member_of(7, Site::Admin);
	assert!(
		engine
			.can(&mut global_admin, &query("acl", "manage", "anything", 3))
			.await
	);

	let mut section_editor = member_of(8, Site::Admin);
	assert!(
		!engine
			.can(&mut section_editor, &query("acl", "manage", "anything", 3))
			.await
	);
}

#[tokio::test]
async fn test_global_subject_is_checked_as_manage() {
	let world = World::new().await;
	world.group(7, "Administrators", GroupKind::Native, None).await;
	world
		.grant(
			7,
			0,
			&PermissionKey::new("config", "manage", "valid", Site::Admin),
			ValidityWindow::unbounded(),
		)
		.await;

	let engine = world.engine();
	let mut ctx = member_of(7, Site::Admin);
	assert!(engine.can(&mut ctx, &AccessQuery::new("config.edit")).await);
	assert!(engine.can(&mut ctx, &AccessQuery::new("config")).await);
}
