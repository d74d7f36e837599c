// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

/// Errors produced by the Warden repositories.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
	#[error("Database error: {0}")]
	Sqlx(#[from] sqlx::Error),

	/// A unique key already exists, e.g. a duplicate permission definition.
	#[error("Conflict: {0}")]
	Conflict(String),

	/// A stored row could not be mapped back onto a domain type.
	#[error("Corrupt row: {0}")]
	Internal(String),
}

pub type Result<T> = std::result::Result<T, DbError>;
