// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core type definitions for access control.
//!
//! - **ID newtypes**: Type-safe wrappers around the integer row ids used for
//!   groups, rules, sections and permission definitions
//! - **Groups**: [`Group`] rows and the [`GroupRef`] tag that selects an
//!   ancestor-resolution strategy
//! - **Sites**: the [`Site`] a permission definition applies to
//! - **Principals**: the acting user for an access query ([`Principal`])

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// ID Newtypes
// =============================================================================

macro_rules! define_id_type {
	($name:ident, $doc:expr) => {
		#[doc = $doc]
		#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(transparent)]
		pub struct $name(i64);

		impl $name {
			/// Create a new ID from a raw row id.
			pub const fn new(id: i64) -> Self {
				Self(id)
			}

			/// Get the raw row id.
			pub const fn get(self) -> i64 {
				self.0
			}
		}

		impl fmt::Display for $name {
			fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				write!(f, "{}", self.0)
			}
		}

		impl From<i64> for $name {
			fn from(id: i64) -> Self {
				Self(id)
			}
		}

		impl From<$name> for i64 {
			fn from(id: $name) -> Self {
				id.0
			}
		}
	};
}

define_id_type!(GroupId, "Identifier of a user group.");
define_id_type!(RuleId, "Identifier of an access rule.");
define_id_type!(SectionId, "Identifier of a section (0 is the global section).");
define_id_type!(PermissionId, "Identifier of a permission definition in the catalog.");

impl GroupId {
	/// The implicit visitor group every principal belongs to.
	pub const VISITOR: GroupId = GroupId(0);
}

impl SectionId {
	/// The global, unscoped section.
	pub const GLOBAL: SectionId = SectionId(0);

	/// Returns true for the global section.
	pub const fn is_global(self) -> bool {
		self.0 == 0
	}
}

// =============================================================================
// Sites
// =============================================================================

/// The site a permission definition (and a request) belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Site {
	/// End-user facing site.
	#[default]
	Front,
	/// Administration site.
	Admin,
}

impl Site {
	pub fn as_str(&self) -> &'static str {
		match self {
			Site::Front => "front",
			Site::Admin => "admin",
		}
	}
}

impl fmt::Display for Site {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for Site {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"front" | "site" => Ok(Site::Front),
			"admin" | "administrator" => Ok(Site::Admin),
			other => Err(format!("unknown site '{other}'")),
		}
	}
}

// =============================================================================
// Groups
// =============================================================================

/// Which hierarchy a group lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupKind {
	/// Host-provided hierarchy, resolved with a single ancestor-path lookup.
	Native,
	/// Extension-managed hierarchy, resolved by following parent pointers.
	Custom,
}

impl GroupKind {
	pub fn as_str(&self) -> &'static str {
		match self {
			GroupKind::Native => "native",
			GroupKind::Custom => "custom",
		}
	}
}

impl fmt::Display for GroupKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for GroupKind {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"native" => Ok(GroupKind::Native),
			"custom" => Ok(GroupKind::Custom),
			other => Err(format!("unknown group namespace '{other}'")),
		}
	}
}

/// A group id tagged with the hierarchy it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum GroupRef {
	Native(GroupId),
	Custom(GroupId),
}

impl GroupRef {
	pub fn new(kind: GroupKind, id: GroupId) -> Self {
		match kind {
			GroupKind::Native => GroupRef::Native(id),
			GroupKind::Custom => GroupRef::Custom(id),
		}
	}

	pub fn id(&self) -> GroupId {
		match self {
			GroupRef::Native(id) | GroupRef::Custom(id) => *id,
		}
	}

	pub fn kind(&self) -> GroupKind {
		match self {
			GroupRef::Native(_) => GroupKind::Native,
			GroupRef::Custom(_) => GroupKind::Custom,
		}
	}
}

/// A persisted group row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
	pub id: GroupId,
	pub parent_id: Option<GroupId>,
	pub name: String,
	pub enabled: bool,
	pub kind: GroupKind,
}

impl Group {
	/// Creates an enabled group without a parent.
	pub fn new(id: GroupId, name: impl Into<String>, kind: GroupKind) -> Self {
		Self {
			id,
			parent_id: None,
			name: name.into(),
			enabled: true,
			kind,
		}
	}

	pub fn with_parent(mut self, parent_id: GroupId) -> Self {
		self.parent_id = Some(parent_id);
		self
	}

	pub fn group_ref(&self) -> GroupRef {
		GroupRef::new(self.kind, self.id)
	}
}

// =============================================================================
// Principals
// =============================================================================

/// The acting user for an access query.
///
/// Created once at request start by the host identity provider and not
/// modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Principal {
	pub user_id: i64,
	pub is_super_admin: bool,
	pub groups: Vec<GroupRef>,
}

impl Principal {
	/// An anonymous visitor with no direct group memberships.
	pub fn visitor() -> Self {
		Self::default()
	}

	pub fn new(user_id: i64) -> Self {
		Self {
			user_id,
			..Self::default()
		}
	}

	pub fn with_group(mut self, group: GroupRef) -> Self {
		self.groups.push(group);
		self
	}

	pub fn super_admin(mut self) -> Self {
		self.is_super_admin = true;
		self
	}
}
