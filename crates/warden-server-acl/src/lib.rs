// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Rule-based permission resolution for Warden.
//!
//! - [`GroupResolver`] expands a principal's groups across both hierarchies
//! - [`IndexBuilder`] materializes the permission index for a site and section
//! - [`AccessEngine`] answers `can` queries against a [`RequestContext`]
//! - [`RuleService`] provisions rules and catalog entries with audit records

pub mod context;
pub mod engine;
pub mod groups;
pub mod hooks;
pub mod index;
pub mod provisioning;

pub use context::{RequestContext, RequestInfo};
pub use engine::{AccessEngine, HOST_SUBJECT};
pub use groups::GroupResolver;
pub use hooks::{DecisionObserver, FixedAuthorization, IdentityProvider, RuleLifecycleListener};
pub use index::IndexBuilder;
pub use provisioning::RuleService;
