// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! End-to-end access-control tests over an in-memory SQLite database.
//!
//! This module collects every acl test as a single integration test binary.

mod acl;
