// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Access-control engine configuration.

use serde::Deserialize;

pub const DEFAULT_NAMESPACE: &str = "com_warden";
pub const DEFAULT_GLOBAL_SUBJECTS: &[&str] = &["acl", "config", "extension"];
pub const DEFAULT_PUBLIC_TASKS: &[&str] = &[
	"progress",
	"js_text",
	"api.list",
	"api.search",
	"api.details",
];
pub const DEFAULT_MAX_GROUP_DEPTH: usize = 64;

/// Access-control configuration (runtime, fully resolved).
#[derive(Debug, Clone, PartialEq)]
pub struct AclConfig {
	/// Namespace passed to the host when delegating `cms` queries.
	pub namespace: String,
	/// Subjects always checked as `manage` in the global section.
	pub global_subjects: Vec<String>,
	/// Request tasks granted to everyone in the global section.
	pub public_tasks: Vec<String>,
	/// Upper bound on parent-pointer steps when resolving custom groups.
	pub max_group_depth: usize,
}

impl Default for AclConfig {
	fn default() -> Self {
		AclConfigLayer::default().finalize()
	}
}

fn owned(list: &[&str]) -> Vec<String> {
	list.iter().map(|s| s.to_string()).collect()
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct AclConfigLayer {
	#[serde(default)]
	pub namespace: Option<String>,
	#[serde(default)]
	pub global_subjects: Option<Vec<String>>,
	#[serde(default)]
	pub public_tasks: Option<Vec<String>>,
	#[serde(default)]
	pub max_group_depth: Option<usize>,
}

impl AclConfigLayer {
	pub fn merge(&mut self, other: AclConfigLayer) {
		if other.namespace.is_some() {
			self.namespace = other.namespace;
		}
		if other.global_subjects.is_some() {
			self.global_subjects = other.global_subjects;
		}
		if other.public_tasks.is_some() {
			self.public_tasks = other.public_tasks;
		}
		if other.max_group_depth.is_some() {
			self.max_group_depth = other.max_group_depth;
		}
	}

	pub fn finalize(self) -> AclConfig {
		AclConfig {
			namespace: self
				.namespace
				.unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()),
			global_subjects: self
				.global_subjects
				.unwrap_or_else(|| owned(DEFAULT_GLOBAL_SUBJECTS)),
			public_tasks: self
				.public_tasks
				.unwrap_or_else(|| owned(DEFAULT_PUBLIC_TASKS)),
			max_group_depth: self.max_group_depth.unwrap_or(DEFAULT_MAX_GROUP_DEPTH),
		}
	}
}
