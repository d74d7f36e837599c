// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Request-scoped state for the decision engine.
//!
//! A [`RequestContext`] is created by the caller at request start, passed by
//! `&mut` into every [`crate::AccessEngine::can`] call and dropped at request
//! end. Nothing in it outlives the request.

use std::collections::{HashMap, HashSet};

use warden_acl_core::{GroupId, PermissionIndex, Principal, SectionId, Site};

/// Ambient request attributes the engine consults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestInfo {
	pub site: Site,
	/// Section used when a query names none.
	pub section: SectionId,
	/// Task name of the current request, if any.
	pub task: Option<String>,
	/// Id of the object the request addresses; 0 when none.
	pub target_id: i64,
}

impl RequestInfo {
	pub fn new(site: Site) -> Self {
		Self {
			site,
			section: SectionId::GLOBAL,
			task: None,
			target_id: 0,
		}
	}

	pub fn with_section(mut self, section: SectionId) -> Self {
		self.section = section;
		self
	}

	pub fn with_task(mut self, task: impl Into<String>) -> Self {
		self.task = Some(task.into());
		self
	}

	pub fn with_target_id(mut self, target_id: i64) -> Self {
		self.target_id = target_id;
		self
	}

	pub fn target_exists(&self) -> bool {
		self.target_id != 0
	}
}

impl Default for RequestInfo {
	fn default() -> Self {
		Self::new(Site::Front)
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct DecisionKey {
	pub site: Site,
	pub section: SectionId,
	pub subject: String,
	pub action: String,
	pub value: String,
}

/// Resolved groups, built indexes and memoized decisions for one request.
#[derive(Debug, Clone)]
pub struct RequestContext {
	principal: Principal,
	request: RequestInfo,
	pub(crate) groups: Option<HashSet<GroupId>>,
	pub(crate) indexes: HashMap<(Site, SectionId), PermissionIndex>,
	pub(crate) decisions: HashMap<DecisionKey, bool>,
}

impl RequestContext {
	pub fn new(principal: Principal, request: RequestInfo) -> Self {
		Self {
			principal,
			request,
			groups: None,
			indexes: HashMap::new(),
			decisions: HashMap::new(),
		}
	}

	pub fn principal(&self) -> &Principal {
		&self.principal
	}

	pub fn request(&self) -> &RequestInfo {
		&self.request
	}

	/// The resolved group set, once the first query has needed it.
	pub fn resolved_groups(&self) -> Option<&HashSet<GroupId>> {
		self.groups.as_ref()
	}

	/// Number of `(site, section)` indexes built so far.
	pub fn cached_indexes(&self) -> usize {
		self.indexes.len()
	}

	/// Number of memoized decisions.
	pub fn cached_decisions(&self) -> usize {
		self.decisions.len()
	}

	/// Drops built indexes and memoized decisions. Call after writing rules or
	/// catalog entries mid-request.
	pub fn invalidate(&mut self) {
		self.indexes.clear();
		self.decisions.clear();
	}

	/// Like [`RequestContext::invalidate`], and also forgets the resolved
	/// group set.
	pub fn invalidate_groups(&mut self) {
		self.invalidate();
		self.groups = None;
	}
}
