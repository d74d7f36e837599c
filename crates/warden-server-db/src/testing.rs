// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-memory pools for tests in this and downstream crates.

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::error::Result;
use crate::schema::run_migrations;

/// An empty in-memory database. A single connection keeps every query on the
/// same database.
pub async fn create_test_pool() -> Result<SqlitePool> {
	let pool = SqlitePoolOptions::new()
		.max_connections(1)
		.connect("sqlite::memory:")
		.await?;
	Ok(pool)
}

/// An in-memory database with every table created.
pub async fn create_acl_test_pool() -> Result<SqlitePool> {
	let pool = create_test_pool().await?;
	run_migrations(&pool).await?;
	Ok(pool)
}
