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

//! Integration tests for the logging system
//!
//! A global subscriber can only be installed once per process, so every
//! check that needs it lives in a single test.

use std::{
	fs,
	path::{Path, PathBuf},
	thread,
	time::{Duration, Instant},
};

use aeromatch_matching::{
	EngineConfig, MatchingEngine, OrderBook,
	config::{DEFAULT_LOG_LEVEL, DEFAULT_LOG_TO_CONSOLE, LOG_COMPONENT_NAME},
	logging,
};
use aeromatch_sdk::types::{Order, Side};

fn read_logs(log_dir: &Path) -> String {
	let Ok(entries) = fs::read_dir(log_dir) else {
		return String::new();
	};
	entries
		.filter_map(|e| e.ok())
		.map(|e| e.path())
		.filter(|p| p.extension().and_then(|ext| ext.to_str()) == Some("log"))
		.filter_map(|p| fs::read_to_string(p).ok())
		.collect()
}

fn wait_for_logs(log_dir: &Path, needle: &str) -> String {
	let deadline = Instant::now() + Duration::from_secs(5);
	loop {
		let content = read_logs(log_dir);
		if content.contains(needle) || Instant::now() > deadline {
			return content;
		}
		thread::sleep(Duration::from_millis(20));
	}
}

#[test]
fn test_log_constants() {
	assert_eq!(LOG_COMPONENT_NAME, "matching");
	assert_eq!(DEFAULT_LOG_LEVEL, "info");
	const _: () = {
		assert!(!DEFAULT_LOG_TO_CONSOLE);
	};
}

#[test]
fn test_logging_writes_structured_file_output() {
	let log_root: PathBuf =
		std::env::temp_dir().join(format!("aeromatch-logging-test-{}", std::process::id()));
	unsafe {
		std::env::set_var("LOG_DIR", &log_root);
		std::env::set_var("LOG_TO_CONSOLE", "false");
		std::env::set_var("RUST_LOG", "debug");
	}

	logging::init_logging().unwrap();
	let log_dir = logging::log_dir();
	assert_eq!(log_dir, log_root.join(LOG_COMPONENT_NAME));
	assert!(log_dir.is_dir());

	// The global subscriber is already installed.
	assert!(logging::init_logging().is_err());

	let engine = MatchingEngine::new(EngineConfig {
		verbose_logging: true,
		..EngineConfig::default()
	});
	engine.register_book(OrderBook::new("BTC-USD")).unwrap();
	engine
		.submit(Order::limit(1, "BTC-USD", Side::Sell, 100.0, 1.0))
		.unwrap();
	engine
		.submit(Order::limit(2, "BTC-USD", Side::Buy, 100.0, 1.0))
		.unwrap();
	engine.shutdown();

	let content = wait_for_logs(&log_dir, "Book worker stopped");
	assert!(content.contains("Log level"));
	assert!(content.contains("Order book registered"));
	assert!(content.contains("Processing order"));
	assert!(content.contains("order_id=2"));
	assert!(content.contains("Book worker stopped"));
	assert!(content.contains("ThreadId("));

	let file_names: Vec<String> = fs::read_dir(&log_dir)
		.unwrap()
		.filter_map(|e| e.ok())
		.map(|e| e.file_name().to_string_lossy().into_owned())
		.collect();
	assert!(
		file_names
			.iter()
			.any(|name| name.starts_with("matching.") && name.ends_with(".log"))
	);

	let _ = fs::remove_dir_all(&log_root);
}
