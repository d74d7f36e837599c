// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Expands direct group memberships into the full ancestor set.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{instrument, warn};
use warden_acl_core::{GroupId, GroupRef, Principal};
use warden_server_db::GroupStore;

/// Resolves a principal's groups across the native and custom hierarchies.
///
/// Native groups are expanded with a single ancestor-path lookup. Custom
/// groups are walked one parent at a time until the chain ends or reaches a
/// native group, which is then expanded natively.
#[derive(Clone)]
pub struct GroupResolver {
	store: Arc<dyn GroupStore>,
	max_depth: usize,
}

impl GroupResolver {
	pub fn new(store: Arc<dyn GroupStore>, max_depth: usize) -> Self {
		Self { store, max_depth }
	}

	/// The deduplicated set of direct and inherited group ids, always
	/// including [`GroupId::VISITOR`].
	///
	/// Store failures end the affected walk; groups found before the failure
	/// are kept.
	#[instrument(skip(self, principal), fields(user_id = principal.user_id, direct = principal.groups.len()))]
	pub async fn resolve(&self, principal: &Principal) -> HashSet<GroupId> {
		let mut resolved = HashSet::from([GroupId::VISITOR]);
		for group in &principal.groups {
			match *group {
				GroupRef::Native(id) => self.extend_native(id, &mut resolved).await,
				GroupRef::Custom(id) => self.extend_custom(id, &mut resolved).await,
			}
		}
		resolved
	}

	async fn extend_native(&self, id: GroupId, resolved: &mut HashSet<GroupId>) {
		resolved.insert(id);
		match self.store.native_ancestors(id).await {
			Ok(ancestors) => resolved.extend(ancestors),
			Err(e) => {
				warn!(group_id = %id, error = %e, "native ancestor lookup failed, treating as no ancestors");
			}
		}
	}

	async fn extend_custom(&self, start: GroupId, resolved: &mut HashSet<GroupId>) {
		resolved.insert(start);
		let mut visited = HashSet::from([start]);
		let mut current = start;

		for _ in 0..self.max_depth {
			let parent = match self.store.parent_of(current).await {
				Ok(parent) => parent,
				Err(e) => {
					warn!(group_id = %current, error = %e, "custom parent lookup failed, treating as no ancestors");
					return;
				}
			};

			match parent {
				None => return,
				Some(GroupRef::Native(id)) => {
					self.extend_native(id, resolved).await;
					return;
				}
				Some(GroupRef::Custom(id)) => {
					if !visited.insert(id) {
						warn!(group_id = %start, repeated = %id, "cycle in custom group chain, stopping walk");
						return;
					}
					resolved.insert(id);
					current = id;
				}
			}
		}

		warn!(
			group_id = %start,
			max_depth = self.max_depth,
			"custom group chain exceeds depth limit, stopping walk"
		);
	}
}
