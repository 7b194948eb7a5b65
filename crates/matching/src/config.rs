// Copyright 2025 itscheems
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{engine::EngineConfig, snapshot::SnapshotConfig};

// Logging configuration constants
/// Default log level (can be overridden by RUST_LOG environment variable)
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Default log directory component name
pub const LOG_COMPONENT_NAME: &str = "matching";

/// Default console output enabled (can be overridden by LOG_TO_CONSOLE environment variable)
pub const DEFAULT_LOG_TO_CONSOLE: bool = false;

/// Prefix of every configuration environment variable
pub const ENV_PREFIX: &str = "AEROMATCH";

/// Matching engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
	/// Instruments registered at startup
	pub instruments: Vec<String>,
	/// Capacity of each instrument's ingress queue
	pub ingress_queue_size: usize,
	/// Capacity of the engine-wide trade buffer
	pub trade_buffer_size: usize,
	/// Interval between snapshot cycles (milliseconds)
	pub snapshot_interval_ms: u64,
	/// Price levels per side captured in snapshots
	pub max_depth_levels: usize,
	/// Snapshots kept per instrument by the storage sink
	pub max_snapshots_to_keep: usize,
	pub trade_id_start: u64,
	pub execution_id_start: u64,
	/// Log every processed order at debug level
	pub verbose_logging: bool,
}

impl Default for MatchingConfig {
	fn default() -> Self {
		Self {
			instruments: vec!["BTC-USD".to_string()],
			ingress_queue_size: 10_000,
			trade_buffer_size: 20_000,
			snapshot_interval_ms: 100,
			max_depth_levels: 100,
			max_snapshots_to_keep: 10,
			trade_id_start: 1,
			execution_id_start: 1,
			verbose_logging: false,
		}
	}
}

impl MatchingConfig {
	/// Load configuration from environment variables
	///
	/// `AEROMATCH_INSTRUMENTS` takes a comma-separated list.
	pub fn from_env() -> Result<Self, config::ConfigError> {
		config::Config::builder()
			.add_source(Self::environment())
			.build()?
			.try_deserialize()
	}

	/// Load configuration from file, with environment variables on top
	pub fn from_file(path: &str) -> Result<Self, config::ConfigError> {
		config::Config::builder()
			.add_source(config::File::with_name(path))
			.add_source(Self::environment())
			.build()?
			.try_deserialize()
	}

	fn environment() -> config::Environment {
		config::Environment::with_prefix(ENV_PREFIX)
			.try_parsing(true)
			.list_separator(",")
			.with_list_parse_key("instruments")
	}

	/// Reject configurations the engine cannot run with
	pub fn validate(&self) -> Result<(), config::ConfigError> {
		let invalid = |msg: &str| Err(config::ConfigError::Message(msg.to_string()));

		if self.instruments.is_empty() {
			return invalid("at least one instrument must be configured");
		}
		if self.instruments.iter().any(|i| i.trim().is_empty()) {
			return invalid("instrument names must not be empty");
		}
		if self.ingress_queue_size == 0 {
			return invalid("ingress_queue_size must be greater than zero");
		}
		if self.trade_buffer_size == 0 {
			return invalid("trade_buffer_size must be greater than zero");
		}
		if self.snapshot_interval_ms == 0 {
			return invalid("snapshot_interval_ms must be greater than zero");
		}
		if self.max_depth_levels == 0 {
			return invalid("max_depth_levels must be greater than zero");
		}
		Ok(())
	}

	pub fn engine_config(&self) -> EngineConfig {
		EngineConfig {
			ingress_queue_size: self.ingress_queue_size,
			trade_buffer_size: self.trade_buffer_size,
			verbose_logging: self.verbose_logging,
		}
	}

	pub fn snapshot_config(&self) -> SnapshotConfig {
		SnapshotConfig {
			interval: Duration::from_millis(self.snapshot_interval_ms),
			depth_levels: self.max_depth_levels,
			max_snapshots_to_keep: self.max_snapshots_to_keep,
		}
	}
}
