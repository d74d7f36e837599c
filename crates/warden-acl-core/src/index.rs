// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Materialized permission index for one `(site, section)` pair.
//!
//! The index is a `subject -> action -> value` tree built from the rules a
//! principal can reach. Queries walk an ordered list of [`LookupKey`]s from
//! most to least specific; the first key present grants access.

use std::collections::{HashMap, HashSet};

use crate::catalog::WILDCARD;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct ActionEntry {
	/// Set by a definition with an empty value: the action itself is granted.
	flag: bool,
	values: HashSet<String>,
}

/// Lookup table derived from active rules. Rebuilt per request, never patched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionIndex {
	entries: HashMap<String, HashMap<String, ActionEntry>>,
}

/// One probe into a [`PermissionIndex`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupKey<'a> {
	/// `index[subject][action][value]`
	Exact {
		subject: &'a str,
		action: &'a str,
		value: &'a str,
	},
	/// `index[subject][action]` holding a scalar grant rather than values.
	Flag { subject: &'a str, action: &'a str },
	/// `index["*"]`: a grant on every subject.
	AnySubject,
}

/// Produces the fallback probes for a query, most specific first.
pub fn candidate_keys<'a>(subject: &'a str, action: &'a str, value: &'a str) -> Vec<LookupKey<'a>> {
	vec![
		LookupKey::Exact {
			subject,
			action,
			value,
		},
		LookupKey::Exact {
			subject,
			action: WILDCARD,
			value: WILDCARD,
		},
		LookupKey::Exact {
			subject,
			action,
			value: WILDCARD,
		},
		LookupKey::Flag {
			subject,
			action: WILDCARD,
		},
		LookupKey::AnySubject,
	]
}

impl PermissionIndex {
	pub fn new() -> Self {
		Self::default()
	}

	/// Records a grant. An empty `value` records a scalar grant on the action.
	pub fn grant(&mut self, subject: &str, action: &str, value: &str) {
		let entry = self
			.entries
			.entry(subject.to_string())
			.or_default()
			.entry(action.to_string())
			.or_default();
		if value.is_empty() {
			entry.flag = true;
		} else {
			entry.values.insert(value.to_string());
		}
	}

	pub fn contains(&self, key: &LookupKey<'_>) -> bool {
		match key {
			LookupKey::Exact {
				subject,
				action,
				value,
			} => self
				.entries
				.get(*subject)
				.and_then(|actions| actions.get(*action))
				.is_some_and(|entry| entry.values.contains(*value)),
			LookupKey::Flag { subject, action } => self
				.entries
				.get(*subject)
				.and_then(|actions| actions.get(*action))
				.is_some_and(|entry| entry.flag),
			LookupKey::AnySubject => self.entries.contains_key(WILDCARD),
		}
	}

	/// Returns the first key that grants the query, if any.
	pub fn matching_key<'a>(
		&self,
		subject: &'a str,
		action: &'a str,
		value: &'a str,
	) -> Option<LookupKey<'a>> {
		candidate_keys(subject, action, value)
			.into_iter()
			.find(|key| self.contains(key))
	}

	pub fn allows(&self, subject: &str, action: &str, value: &str) -> bool {
		self.matching_key(subject, action, value).is_some()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Number of `(subject, action, value)` grants, counting scalar grants once.
	pub fn len(&self) -> usize {
		self
			.entries
			.values()
			.flat_map(|actions| actions.values())
			.map(|entry| entry.values.len() + usize::from(entry.flag))
			.sum()
	}
}
