// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! `warden` administrative binary.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use warden_acl_core::Site;
use warden_server_config::{load_config, load_config_with_file, LoggingConfig};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "warden", version, about = "Rule-based access control administration")]
struct Args {
	/// Path to a TOML configuration file
	#[arg(short, long, global = true)]
	config: Option<PathBuf>,

	/// User id recorded as the actor in audit history
	#[arg(long, global = true)]
	actor: Option<i64>,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Create or upgrade the database schema
	Migrate,
	/// Evaluate an access query
	Check {
		/// Subject, optionally dotted as subject.action.value
		subject_path: String,
		#[arg(long)]
		action: Option<String>,
		#[arg(long)]
		value: Option<String>,
		/// Section to check in (defaults to the request section)
		#[arg(long)]
		section: Option<i64>,
		/// Current request section
		#[arg(long, default_value_t = 0)]
		request_section: i64,
		/// Direct native group membership (repeatable)
		#[arg(long = "group")]
		groups: Vec<i64>,
		/// Direct custom group membership (repeatable)
		#[arg(long = "custom-group")]
		custom_groups: Vec<i64>,
		#[arg(long, default_value = "front", value_parser = parse_site)]
		site: Site,
		#[arg(long)]
		super_admin: bool,
		/// Task name of the simulated request
		#[arg(long)]
		task: Option<String>,
		/// Id of the object the simulated request addresses
		#[arg(long, default_value_t = 0)]
		target_id: i64,
		/// Answer delegated `cms` queries with "allowed"
		#[arg(long)]
		host_allows: bool,
	},
	/// Register a permission definition (subject.action.value[.site])
	AddPermission {
		key: String,
		#[arg(long)]
		unpublished: bool,
	},
	/// Remove a permission definition (subject.action.value[.site])
	RemovePermission { key: String },
	/// Create a rule from permission keys and group names
	CreateRule {
		#[arg(long)]
		name: String,
		#[arg(long = "section")]
		sections: Vec<i64>,
		#[arg(long = "permission")]
		permissions: Vec<String>,
		#[arg(long = "group")]
		groups: Vec<String>,
		#[arg(long, default_value = "")]
		note: String,
	},
	/// Enable rules
	EnableRules {
		#[arg(required = true)]
		ids: Vec<i64>,
	},
	/// Disable rules
	DisableRules {
		#[arg(required = true)]
		ids: Vec<i64>,
	},
	/// Delete rules and their links
	DeleteRules {
		#[arg(required = true)]
		ids: Vec<i64>,
	},
	/// List every rule
	ListRules,
	/// Show audit history for an object
	History {
		#[arg(long, default_value = "rule")]
		object_type: String,
		#[arg(long)]
		id: Option<i64>,
		#[arg(short, long, default_value_t = 50)]
		limit: i64,
	},
}

fn parse_site(raw: &str) -> Result<Site, String> {
	raw.parse()
}

fn init_tracing(logging: &LoggingConfig) {
	let filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(logging.level.as_str()));

	if logging.json {
		tracing_subscriber::registry()
			.with(filter)
			.with(fmt::layer().json().with_writer(std::io::stderr))
			.init();
	} else {
		tracing_subscriber::registry()
			.with(filter)
			.with(fmt::layer().with_writer(std::io::stderr))
			.init();
	}
}

#[tokio::main]
async fn main() -> Result<()> {
	let args = Args::parse();

	let config = match &args.config {
		Some(path) => load_config_with_file(path),
		None => load_config(),
	}
	.context("failed to load configuration")?;

	init_tracing(&config.logging);
	info!(database = %config.database.url, "starting warden");

	let services = commands::Services::connect(&config, args.actor).await?;
	commands::run(&services, args.command).await
}
