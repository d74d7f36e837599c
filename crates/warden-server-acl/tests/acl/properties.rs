// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Engine-wide properties: memoization, group resolution, wildcard fallback
//! and short-circuits.

use std::collections::HashSet;

use warden_acl_core::{
	AccessQuery, GroupId, GroupKind, GroupRef, PermissionKey, Principal, SectionId, Site,
	ValidityWindow,
};
use warden_server_acl::{GroupResolver, RequestContext, RequestInfo};
use warden_server_db::PermissionStore;

use super::support::World;

fn in_section(principal: Principal, section: i64) -> RequestContext {
	RequestContext::new(
		principal,
		RequestInfo::new(Site::Front).with_section(SectionId::new(section)),
	)
}

fn native_member(group: i64) -> Principal {
	Principal::new(42).with_group(GroupRef::Native(GroupId::new(group)))
}

// ============================================================================
// Request purity
// ============================================================================

#[tokio::test]
async fn test_repeated_query_does_not_rebuild_index() {
	let world = World::new().await;
	world
		.grant(7, 3, &PermissionKey::front("entry", "edit", "own"), ValidityWindow::unbounded())
		.await;

	let engine = world.engine();
	let mut ctx = in_section(native_member(7), 3);
	let query = AccessQuery::new("entry.edit.own");

	let first = engine.can(&mut ctx, &query).await;
	let second = engine.can(&mut ctx, &query).await;
	assert!(first);
	assert_eq!(first, second);
	assert_eq!(world.rules.rule_reads(), 1);
	assert_eq!(ctx.cached_decisions(), 1);
}

#[tokio::test]
async fn test_index_is_shared_by_queries_in_one_section() {
	let world = World::new().await;
	let engine = world.engine();
	let mut ctx = in_section(native_member(7), 3);

	engine.can(&mut ctx, &AccessQuery::new("entry.edit.own")).await;
	engine.can(&mut ctx, &AccessQuery::new("entry.delete.any")).await;
	assert_eq!(world.rules.rule_reads(), 1);

	engine
		.can(&mut ctx, &AccessQuery::new("entry.edit.own").section(SectionId::new(4)))
		.await;
	assert_eq!(world.rules.rule_reads(), 2);
	assert_eq!(ctx.cached_indexes(), 2);
}

#[tokio::test]
async fn test_new_request_sees_new_rules() {
	let world = World::new().await;
	let engine = world.engine();
	let query = AccessQuery::new("entry.edit.own");

	let mut before = in_section(native_member(7), 3);
	assert!(!engine.can(&mut before, &query).await);

	world
		.grant(7, 3, &PermissionKey::front("entry", "edit", "own"), ValidityWindow::unbounded())
		.await;

	assert!(!engine.can(&mut before, &query).await);
	let mut after = in_section(native_member(7), 3);
	assert!(engine.can(&mut after, &query).await);
}

#[tokio::test]
async fn test_invalidate_picks_up_mid_request_writes() {
	let world = World::new().await;
	let engine = world.engine();
	let query = AccessQuery::new("entry.edit.own");
	let mut ctx = in_section(native_member(7), 3);
	assert!(!engine.can(&mut ctx, &query).await);

	world
		.grant(7, 3, &PermissionKey::front("entry", "edit", "own"), ValidityWindow::unbounded())
		.await;
	ctx.invalidate();

	assert!(engine.can(&mut ctx, &query).await);
	assert_eq!(world.rules.rule_reads(), 2);
}

// ============================================================================
// Group resolution
// ============================================================================

#[tokio::test]
async fn test_group_resolution_is_idempotent_and_includes_visitor() {
	let world = World::new().await;
	world.group(1, "Public", GroupKind::Native, None).await;
	world.group(2, "Registered", GroupKind::Native, Some(1)).await;
	world.group(101, "Reviewers", GroupKind::Custom, Some(2)).await;
	world.group(102, "Night shift", GroupKind::Custom, Some(101)).await;

	let resolver = GroupResolver::new(world.groups.clone(), 64);
	let principal = Principal::new(42)
		.with_group(GroupRef::Custom(GroupId::new(102)))
		.with_group(GroupRef::Native(GroupId::new(2)));

	let first = resolver.resolve(&principal).await;
	let second = resolver.resolve(&principal).await;
	let expected: HashSet<GroupId> = [0, 1, 2, 101, 102].into_iter().map(GroupId::new).collect();
	assert_eq!(first, expected);
	assert_eq!(first, second);
}

#[tokio::test]
async fn test_inherited_group_grants_apply() {
	let world = World::new().await;
	world.group(2, "Registered", GroupKind::Native, None).await;
	world.group(101, "Reviewers", GroupKind::Custom, Some(2)).await;
	world
		.grant(2, 3, &PermissionKey::front("entry", "edit", "own"), ValidityWindow::unbounded())
		.await;

	let engine = world.engine();
	let principal = Principal::new(42).with_group(GroupRef::Custom(GroupId::new(101)));
	let mut ctx = in_section(principal, 3);
	assert!(engine.can(&mut ctx, &AccessQuery::new("entry.edit.own")).await);
}

#[tokio::test]
async fn test_visitor_grants_apply_to_everyone() {
	let world = World::new().await;
	world
		.grant(0, 3, &PermissionKey::front("entry", "access", "valid"), ValidityWindow::unbounded())
		.await;

	let engine = world.engine();
	let mut ctx = in_section(Principal::visitor(), 3);
	assert!(engine.can(&mut ctx, &AccessQuery::new("entry")).await);
}

#[tokio::test]
async fn test_custom_group_cycle_still_answers() {
	let world = World::new().await;
	world.group(101, "Loop A", GroupKind::Custom, Some(102)).await;
	world.group(102, "Loop B", GroupKind::Custom, Some(101)).await;
	world
		.grant(102, 3, &PermissionKey::front("entry", "edit", "own"), ValidityWindow::unbounded())
		.await;

	let engine = world.engine();
	let principal = Principal::new(42).with_group(GroupRef::Custom(GroupId::new(101)));
	let mut ctx = in_section(principal, 3);
	assert!(engine.can(&mut ctx, &AccessQuery::new("entry.edit.own")).await);
	assert!(!engine.can(&mut ctx, &AccessQuery::new("entry.edit.any")).await);
}

// ============================================================================
// Wildcard fallback
// ============================================================================

#[tokio::test]
async fn test_subject_wildcard_grants_every_action() {
	let world = World::new().await;
	world
		.grant(7, 3, &PermissionKey::front("entry", "*", "*"), ValidityWindow::unbounded())
		.await;

	let engine = world.engine();
	let mut ctx = in_section(native_member(7), 3);
	assert!(engine.can(&mut ctx, &AccessQuery::new("entry.edit.own")).await);
	assert!(engine.can(&mut ctx, &AccessQuery::new("entry.delete.any")).await);
	assert!(!engine.can(&mut ctx, &AccessQuery::new("widget.edit.own")).await);
}

#[tokio::test]
async fn test_value_wildcard_is_limited_to_its_action() {
	let world = World::new().await;
	world
		.grant(7, 3, &PermissionKey::front("entry", "edit", "*"), ValidityWindow::unbounded())
		.await;

	let engine = world.engine();
	let mut ctx = in_section(native_member(7), 3);
	assert!(engine.can(&mut ctx, &AccessQuery::new("entry.edit.any")).await);
	assert!(!engine.can(&mut ctx, &AccessQuery::new("entry.delete.any")).await);
}

#[tokio::test]
async fn test_scalar_action_wildcard_grants_every_action() {
	let world = World::new().await;
	world
		.grant(7, 3, &PermissionKey::front("entry", "*", ""), ValidityWindow::unbounded())
		.await;

	let engine = world.engine();
	let mut ctx = in_section(native_member(7), 3);
	assert!(engine.can(&mut ctx, &AccessQuery::new("entry.publish.own")).await);
}

#[tokio::test]
async fn test_any_subject_grant_covers_everything() {
	let world = World::new().await;
	world
		.grant(7, 3, &PermissionKey::front("*", "*", "*"), ValidityWindow::unbounded())
		.await;

	let engine = world.engine();
	let mut ctx = in_section(native_member(7), 3);
	assert!(engine.can(&mut ctx, &AccessQuery::new("widget.configure.all")).await);
}

// ============================================================================
// Short-circuits
// ============================================================================

#[tokio::test]
async fn test_super_admin_needs_no_rules() {
	let world = World::new().await;
	let engine = world.engine();
	let mut ctx = in_section(Principal::new(1).super_admin(), 3);

	for path in ["entry.edit.own", "acl.manage", "widget.delete.any", "anything"] {
		assert!(engine.can(&mut ctx, &AccessQuery::new(path)).await, "{path}");
	}
	assert_eq!(world.rules.rule_reads(), 0);
}

#[tokio::test]
async fn test_unpublished_definition_grants_nothing() {
	let world = World::new().await;
	let key = PermissionKey::front("entry", "edit", "own");
	world.grant(7, 3, &key, ValidityWindow::unbounded()).await;
	let id = world.permission(&key).await;
	world.permissions.set_published(id, false).await.unwrap();

	let engine = world.engine();
	let mut ctx = in_section(native_member(7), 3);
	assert!(!engine.can(&mut ctx, &AccessQuery::new("entry.edit.own")).await);
}
