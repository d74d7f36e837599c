// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! SQLite persistence for Warden.
//!
//! Each table family has an `#[async_trait]` store trait and a
//! `Sqlite*Repository` implementation that owns a [`sqlx::SqlitePool`].

pub mod audit;
pub mod error;
pub mod group;
pub mod permission;
pub mod pool;
pub mod rule;
pub mod schema;
pub mod testing;

pub use audit::{AuditRepository, AuditStore};
pub use error::{DbError, Result};
pub use group::{GroupStore, SqliteGroupRepository};
pub use permission::{PermissionStore, SqlitePermissionRepository};
pub use pool::create_pool;
pub use rule::{RuleStore, SqliteRuleRepository};
pub use schema::run_migrations;
pub use sqlx::SqlitePool;
