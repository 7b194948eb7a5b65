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

use std::sync::atomic::{AtomicU64, Ordering};

/// Source of trade and execution identifiers
///
/// One generator is shared by every book of an engine, so identifiers are
/// unique and increasing across instruments. Tests inject their own
/// generator to get a predictable id sequence.
pub trait IdGenerator: Send + Sync {
	/// Allocate the next trade id
	fn next_trade_id(&self) -> u64;

	/// Allocate the next execution id
	fn next_execution_id(&self) -> u64;
}

/// Atomic counter based id generator
///
/// Each call returns the current value and advances the counter, so the
/// first id handed out is the configured start value.
#[derive(Debug)]
pub struct SequentialIds {
	trade: AtomicU64,
	execution: AtomicU64,
}

impl SequentialIds {
	pub fn new() -> Self {
		Self::starting_at(1, 1)
	}

	/// Resume from previously issued ids (e.g. loaded from a store)
	pub fn starting_at(trade_start: u64, execution_start: u64) -> Self {
		Self {
			trade: AtomicU64::new(trade_start),
			execution: AtomicU64::new(execution_start),
		}
	}

	/// Next trade id that will be issued, without consuming it
	pub fn peek_trade_id(&self) -> u64 {
		self.trade.load(Ordering::Acquire)
	}
}

impl Default for SequentialIds {
	fn default() -> Self {
		Self::new()
	}
}

impl IdGenerator for SequentialIds {
	fn next_trade_id(&self) -> u64 {
		self.trade.fetch_add(1, Ordering::AcqRel)
	}

	fn next_execution_id(&self) -> u64 {
		self.execution.fetch_add(1, Ordering::AcqRel)
	}
}
