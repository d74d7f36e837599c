// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;

/// Errors produced while parsing textual permission keys.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PermissionKeyError {
	#[error("permission key '{0}' must have 3 or 4 dot-separated parts")]
	WrongArity(String),

	#[error("permission key '{0}' has an empty part")]
	EmptyPart(String),

	#[error("permission key '{key}' has unknown site: {message}")]
	UnknownSite { key: String, message: String },
}
