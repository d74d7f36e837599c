// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

mod acl;
mod audit;
mod database;
mod logging;

pub use acl::*;
pub use audit::*;
pub use database::*;
pub use logging::*;
