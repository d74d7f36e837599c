// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Access queries and request-verb normalization.

use serde::{Deserialize, Serialize};

use crate::types::SectionId;

/// Action checked when the caller gives none.
pub const DEFAULT_ACTION: &str = "access";
/// Value checked when the caller gives none.
pub const DEFAULT_VALUE: &str = "valid";
/// Value substituted for sectionless queries.
pub const GLOBAL_VALUE: &str = "global";
/// Action forced for global-scope subjects.
pub const MANAGE_ACTION: &str = "manage";

/// A question put to the decision engine.
///
/// `subject` may be a dotted path (`entry.edit.own`); parts found in the path
/// take precedence over [`AccessQuery::action`] and [`AccessQuery::value`].
/// Segments past the third are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AccessQuery {
	subject: String,
	path_action: Option<String>,
	path_value: Option<String>,
	action: Option<String>,
	value: Option<String>,
	section: Option<SectionId>,
}

impl AccessQuery {
	pub fn new(subject_path: &str) -> Self {
		let mut parts = subject_path.split('.');
		let subject = parts.next().unwrap_or_default().to_string();
		let path_action = parts.next().filter(|s| !s.is_empty()).map(str::to_string);
		let path_value = parts.next().filter(|s| !s.is_empty()).map(str::to_string);
		Self {
			subject,
			path_action,
			path_value,
			..Self::default()
		}
	}

	pub fn action(mut self, action: impl Into<String>) -> Self {
		self.action = Some(action.into());
		self
	}

	pub fn value(mut self, value: impl Into<String>) -> Self {
		self.value = Some(value.into());
		self
	}

	/// Overrides the request's current section.
	pub fn section(mut self, section: SectionId) -> Self {
		self.section = Some(section);
		self
	}

	pub fn subject(&self) -> &str {
		&self.subject
	}

	pub fn requested_section(&self) -> Option<SectionId> {
		self.section
	}

	/// Resolves `(subject, action, value)` with path parts first, then
	/// explicit arguments, then defaults.
	pub fn parts(&self) -> (String, String, String) {
		let action = self
			.path_action
			.as_deref()
			.or(self.action.as_deref())
			.unwrap_or(DEFAULT_ACTION);
		let value = self
			.path_value
			.as_deref()
			.or(self.value.as_deref())
			.unwrap_or(DEFAULT_VALUE);
		(self.subject.clone(), action.to_string(), value.to_string())
	}
}

/// Outcome of mapping a request verb onto the permission vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizedAction {
	/// Granted without consulting any rule.
	Allow,
	/// Look this action up.
	Check(String),
}

/// Maps ambient request verbs to canonical actions.
///
/// `target_exists` is true when the request addresses an existing object
/// (non-zero id), which turns `save`/`submit` into `edit` instead of `add`.
pub fn normalize_action(action: &str, target_exists: bool) -> NormalizedAction {
	let canonical = match action {
		"cancel" => return NormalizedAction::Allow,
		"save" | "submit" if target_exists => "edit",
		"save" | "submit" => "add",
		"enable" | "hide" | "disable" => MANAGE_ACTION,
		"apply" => "edit",
		"details" | "view" => DEFAULT_ACTION,
		other => other,
	};
	NormalizedAction::Check(canonical.to_string())
}
