// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Access rules.
//!
//! A [`Rule`] bundles groups with `(section, permission)` grants and is only
//! effective while enabled and inside its [`ValidityWindow`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{GroupId, PermissionId, RuleId, SectionId};

/// The period during which a rule is effective. Either bound may be open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValidityWindow {
	pub from: Option<DateTime<Utc>>,
	pub until: Option<DateTime<Utc>>,
}

impl ValidityWindow {
	/// A window open on both ends.
	pub fn unbounded() -> Self {
		Self::default()
	}

	pub fn new(from: Option<DateTime<Utc>>, until: Option<DateTime<Utc>>) -> Self {
		Self { from, until }
	}

	/// Returns true if `now` falls inside the window (bounds inclusive).
	pub fn contains(&self, now: DateTime<Utc>) -> bool {
		if let Some(from) = self.from {
			if now < from {
				return false;
			}
		}
		if let Some(until) = self.until {
			if now > until {
				return false;
			}
		}
		true
	}
}

/// A persisted rule row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
	pub id: RuleId,
	pub name: String,
	pub alias: String,
	pub window: ValidityWindow,
	pub note: String,
	pub enabled: bool,
}

/// Input for inserting or replacing a rule together with its links.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RuleDraft {
	/// `None` inserts a new rule; `Some` replaces the existing one.
	pub id: Option<RuleId>,
	pub name: String,
	pub alias: String,
	pub window: ValidityWindow,
	pub note: String,
	pub enabled: bool,
	pub group_ids: Vec<GroupId>,
	pub section_ids: Vec<SectionId>,
	pub permission_ids: Vec<PermissionId>,
}

impl RuleDraft {
	/// A new, enabled, unbounded rule.
	pub fn new(name: impl Into<String>) -> Self {
		let name = name.into();
		Self {
			alias: alias_from_name(&name),
			name,
			enabled: true,
			..Self::default()
		}
	}

	/// The alias to persist, derived from the name when left empty.
	pub fn effective_alias(&self) -> String {
		if self.alias.trim().is_empty() {
			alias_from_name(&self.name)
		} else {
			alias_from_name(&self.alias)
		}
	}
}

/// Builds a machine-safe alias: lowercase ASCII alphanumerics separated by
/// single dashes.
pub fn alias_from_name(name: &str) -> String {
	let mut alias = String::with_capacity(name.len());
	let mut pending_dash = false;
	for c in name.chars() {
		if c.is_ascii_alphanumeric() {
			if pending_dash && !alias.is_empty() {
				alias.push('-');
			}
			pending_dash = false;
			alias.push(c.to_ascii_lowercase());
		} else {
			pending_dash = true;
		}
	}
	alias
}
