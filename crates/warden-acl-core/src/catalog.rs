// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Permission catalog vocabulary.
//!
//! A [`PermissionDefinition`] names one checkable `(subject, action, value,
//! site)` capability. Extensions register definitions at install time and
//! rules reference them by id. Textual references use the
//! `subject.action.value[.site]` form parsed by [`PermissionKey`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::PermissionKeyError;
use crate::types::{PermissionId, Site};

/// Matches any action or value in a definition.
pub const WILDCARD: &str = "*";

/// A registered catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionDefinition {
	pub id: PermissionId,
	pub subject: String,
	pub action: String,
	pub value: String,
	pub site: Site,
	pub published: bool,
}

impl PermissionDefinition {
	pub fn key(&self) -> PermissionKey {
		PermissionKey {
			subject: self.subject.clone(),
			action: self.action.clone(),
			value: self.value.clone(),
			site: self.site,
		}
	}
}

/// The natural key of a catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PermissionKey {
	pub subject: String,
	pub action: String,
	pub value: String,
	pub site: Site,
}

impl PermissionKey {
	pub fn new(
		subject: impl Into<String>,
		action: impl Into<String>,
		value: impl Into<String>,
		site: Site,
	) -> Self {
		Self {
			subject: subject.into(),
			action: action.into(),
			value: value.into(),
			site,
		}
	}

	/// Shorthand for a front-site key.
	pub fn front(
		subject: impl Into<String>,
		action: impl Into<String>,
		value: impl Into<String>,
	) -> Self {
		Self::new(subject, action, value, Site::Front)
	}
}

impl fmt::Display for PermissionKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"{}.{}.{}.{}",
			self.subject, self.action, self.value, self.site
		)
	}
}

impl FromStr for PermissionKey {
	type Err = PermissionKeyError;

	/// Parses `subject.action.value` or `subject.action.value.site`.
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let parts: Vec<&str> = s.split('.').collect();
		if parts.len() != 3 && parts.len() != 4 {
			return Err(PermissionKeyError::WrongArity(s.to_string()));
		}
		if parts.iter().any(|p| p.trim().is_empty()) {
			return Err(PermissionKeyError::EmptyPart(s.to_string()));
		}

		let site = match parts.get(3) {
			Some(raw) => raw
				.trim()
				.parse::<Site>()
				.map_err(|message| PermissionKeyError::UnknownSite {
					key: s.to_string(),
					message,
				})?,
			None => Site::Front,
		};

		Ok(PermissionKey::new(
			parts[0].trim(),
			parts[1].trim(),
			parts[2].trim(),
			site,
		))
	}
}

type Triple = (&'static str, &'static str, &'static str);

/// Grants that are always added alongside another grant when a rule is saved.
///
/// Each pair is `(trigger, implied)` compared on subject/action/value; the
/// implied definition is looked up on the trigger's site. Implied actions are
/// canonical (`view` queries are checked as `access`).
const IMPLIED_GRANTS: &[(Triple, Triple)] = &[
	(("entry", "publish", "any"), ("entry", "access", "unpublished_any")),
	(("entry", "publish", "own"), ("entry", "access", "unpublished_own")),
	(("entry", "manage", "any"), ("entry", "access", "unapproved_any")),
];

/// Returns the keys implied by granting `key`.
pub fn implied_by(key: &PermissionKey) -> Vec<PermissionKey> {
	IMPLIED_GRANTS
		.iter()
		.filter(|((subject, action, value), _)| {
			key.subject == *subject && key.action == *action && key.value == *value
		})
		.map(|(_, (subject, action, value))| PermissionKey::new(*subject, *action, *value, key.site))
		.collect()
}
