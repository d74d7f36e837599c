// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core types for Warden rule-based access control.
//!
//! This crate holds the storage-independent pieces of the permission engine.
//! It is used by the repositories (`warden-server-db`) and by the decision
//! engine (`warden-server-acl`).
//!
//! # Overview
//!
//! - Groups live in two hierarchies, tagged with [`GroupRef`]
//! - The catalog names `(subject, action, value, site)` capabilities
//! - Rules link groups to `(section, permission)` grants inside a
//!   [`ValidityWindow`]
//! - A [`PermissionIndex`] answers queries through ordered
//!   [`candidate_keys`] fallbacks
//!
//! # Example
//!
//! ```
//! use warden_acl_core::{AccessQuery, PermissionIndex};
//!
//! let mut index = PermissionIndex::new();
//! index.grant("entry", "*", "*");
//!
//! let (subject, action, value) = AccessQuery::new("entry.edit.own").parts();
//! assert!(index.allows(&subject, &action, &value));
//! ```

pub mod catalog;
pub mod error;
pub mod index;
pub mod query;
pub mod rule;
pub mod types;

pub use catalog::{implied_by, PermissionDefinition, PermissionKey, WILDCARD};
pub use error::PermissionKeyError;
pub use index::{candidate_keys, LookupKey, PermissionIndex};
pub use query::{
	normalize_action, AccessQuery, NormalizedAction, DEFAULT_ACTION, DEFAULT_VALUE, GLOBAL_VALUE,
	MANAGE_ACTION,
};
pub use rule::{alias_from_name, Rule, RuleDraft, ValidityWindow};
pub use types::{
	Group, GroupId, GroupKind, GroupRef, PermissionId, Principal, RuleId, SectionId, Site,
};
